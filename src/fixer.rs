use crate::codes::EntryCategory;
use crate::errors::ImportError;
use crate::registry::EntityRegistry;

const KYIV_NAME: &str = "Київ";
const KYIV_REGION_NAME: &str = "Київська";
const CRIMEA_NAME_ORIGINAL: &str = "Автономна Республіка Крим";
const CRIMEA_NAME_OVERRIDE: &str = "АР Крим";

/// Appended to a region's trimmed code to re-key a capital as a city: the
/// source's own tail (`00000000`) marks a region-level entity.
const HIERARCHY_TAIL_OVERRIDE: &str = "99999999";

/// Repairs source irregularities the raw format cannot express. Works on
/// a clone; the parsed registry is never mutated.
pub fn fix(parsed: &EntityRegistry) -> Result<EntityRegistry, ImportError> {
    let mut fixed = parsed.clone();
    override_crimea(&mut fixed)?;
    fix_capitals(&mut fixed)?;
    Ok(fixed)
}

/// The autonomous republic's official long name is replaced with the
/// short display alias used everywhere downstream.
fn override_crimea(registry: &mut EntityRegistry) -> Result<(), ImportError> {
    let code = registry
        .search_by_name(CRIMEA_NAME_ORIGINAL, EntryCategory::Region)
        .first()
        .map(|linked| linked.entry.full_code.clone())
        .ok_or_else(|| ImportError::FixupTargetNotFound {
            name: CRIMEA_NAME_ORIGINAL.to_string(),
        })?;

    if let Some(crimea) = registry.linked_mut(&code) {
        crimea.entry.name = CRIMEA_NAME_OVERRIDE.to_string();
    }
    Ok(())
}

/// Capitals arrive encoded as region-level entities. Each one is turned
/// into a city nested under its true geographic region, and its districts
/// are re-parented along with it.
fn fix_capitals(registry: &mut EntityRegistry) -> Result<(), ImportError> {
    let capital_codes: Vec<String> = registry
        .entries(EntryCategory::Capital)
        .map(|linked| linked.entry.full_code.clone())
        .collect();

    for capital_code in capital_codes {
        let Some(capital_name) = registry.resolve(&capital_code).map(|e| e.name.clone()) else {
            continue;
        };

        let region_search_name = if capital_name == KYIV_NAME {
            KYIV_REGION_NAME
        } else {
            CRIMEA_NAME_OVERRIDE
        };
        let (region_code, region_trimmed) = {
            let matches = registry.search_by_name(region_search_name, EntryCategory::Region);
            let region = matches
                .first()
                .ok_or_else(|| ImportError::FixupTargetNotFound {
                    name: region_search_name.to_string(),
                })?;
            (
                region.entry.full_code.clone(),
                region.entry.trimmed_hierarchy().unwrap_or_default(),
            )
        };
        let proper_hierarchy = format!("{region_trimmed}{HIERARCHY_TAIL_OVERRIDE}");

        if let Some(capital) = registry.linked_mut(&capital_code) {
            // Levels between region and the capital collapse onto the
            // capital itself; the region slot gets the true region.
            capital.subregion = Some(capital_code.clone());
            capital.hromada = Some(capital_code.clone());
            capital.ppl = Some(capital_code.clone());
            capital.region = Some(region_code.clone());
            capital.entry.hierarchy_code = proper_hierarchy.clone();
        }

        let district_codes: Vec<String> = registry
            .entries(EntryCategory::CityDistrict)
            .filter(|district| district.ppl.as_deref() == Some(capital_code.as_str()))
            .map(|district| district.entry.full_code.clone())
            .collect();
        for district_code in district_codes {
            let Some(district) = registry.linked_mut(&district_code) else {
                continue;
            };
            district.region = Some(region_code.clone());
            let tail: String = district
                .entry
                .hierarchy_code
                .chars()
                .skip(crate::codes::HIERARCHY_CODE_LEN - 2)
                .collect();
            district.entry.hierarchy_code = format!("{proper_hierarchy}{tail}");
        }
    }
    Ok(())
}
