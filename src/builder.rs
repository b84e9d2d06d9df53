use std::collections::BTreeMap;

use crate::codes::EntryCategory;
use crate::models::{Category, LocationRecord};
use crate::registry::{EntityRegistry, LinkedEntry};

/// Cities must be built before their districts: district records carry
/// the already-built city's autocode.
const BUILD_ORDER: [EntryCategory; 4] = [
    EntryCategory::Region,
    EntryCategory::Capital,
    EntryCategory::OtherPpl,
    EntryCategory::CityDistrict,
];

/// Flattens the fixed registry into storage-ready records keyed by
/// autocode, sentinel included. Two phases: emit provisional records,
/// then promote settlements that turned out to own districts.
pub fn build_records(registry: &EntityRegistry) -> BTreeMap<String, LocationRecord> {
    let mut records = BTreeMap::new();
    let sentinel = LocationRecord::whole_country();
    records.insert(sentinel.autocode.clone(), sentinel);

    for category in BUILD_ORDER {
        for linked in registry.entries(category) {
            if let Some(record) = build_record(registry, linked) {
                records.insert(record.autocode.clone(), record);
            }
        }
    }

    finalize_cities(&mut records);
    records
}

fn build_record(registry: &EntityRegistry, linked: &LinkedEntry) -> Option<LocationRecord> {
    let category = linked.entry.category.persisted()?;
    let entry = &linked.entry;

    let resolve_name = |link: &Option<String>| {
        link.as_deref()
            .and_then(|code| registry.resolve(code))
            .map(|ancestor| ancestor.name.clone())
    };

    let region_name = resolve_name(&linked.region);
    let mut subregion_name = None;
    let mut ppl_name = None;
    let mut district_name = None;
    let mut city_autocode = None;

    if matches!(category, Category::City | Category::OtherPpl | Category::CityDistrict) {
        subregion_name = resolve_name(&linked.subregion);
        ppl_name = resolve_name(&linked.ppl);
    }
    if category == Category::CityDistrict {
        district_name = Some(entry.name.clone());
        city_autocode = linked
            .ppl
            .as_deref()
            .and_then(|code| registry.resolve(code))
            .map(|city| city.autocode.clone());
    }

    Some(LocationRecord {
        autocode: entry.autocode.clone(),
        hierarchy: entry
            .trimmed_hierarchy()
            .unwrap_or_else(|| entry.hierarchy_code.clone()),
        category,
        region_name,
        subregion_name,
        ppl_name,
        district_name,
        search_name: entry.name.clone(),
        city_autocode,
    })
}

/// Owning at least one district is what makes a settlement a city:
/// promote the referenced settlement's category and align each district's
/// region with its city's (the fixer may have moved the city).
fn finalize_cities(records: &mut BTreeMap<String, LocationRecord>) {
    let district_autocodes: Vec<String> = records
        .values()
        .filter(|record| record.category == Category::CityDistrict)
        .map(|record| record.autocode.clone())
        .collect();

    for autocode in district_autocodes {
        let Some(city_autocode) = records
            .get(&autocode)
            .and_then(|district| district.city_autocode.clone())
        else {
            continue;
        };
        let Some(city) = records.get_mut(&city_autocode) else {
            continue;
        };
        city.category = Category::City;
        let region_name = city.region_name.clone();
        if let Some(district) = records.get_mut(&autocode) {
            district.region_name = region_name;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::RawRow;
    use crate::fixer;
    use crate::models::WHOLE_COUNTRY_AUTOCODE;

    const CRIMEA: &str = "UA01000000000020001";
    const REGION: &str = "UA05000000000010001";
    const SUBREGION: &str = "UA05020000000010002";
    const HROMADA: &str = "UA05020030000010003";
    const PPL: &str = "UA05020030040010004";
    const DISTRICT: &str = "UA05020030040510005";
    const VILLAGE: &str = "UA05020030070010006";

    fn raw(
        region: &str,
        subregion: &str,
        hromada: &str,
        ppl: &str,
        district: &str,
        category: &str,
        name: &str,
    ) -> RawRow {
        RawRow {
            region_code: region.to_string(),
            subregion_code: subregion.to_string(),
            hromada_code: hromada.to_string(),
            ppl_code: ppl.to_string(),
            city_dist_code: district.to_string(),
            category: category.to_string(),
            name: name.to_string(),
        }
    }

    fn fixed_registry() -> EntityRegistry {
        let mut registry = EntityRegistry::new();
        registry
            .register(&raw(CRIMEA, "", "", "", "", "O", "Автономна Республіка Крим"))
            .expect("crimea");
        registry
            .register(&raw(REGION, "", "", "", "", "O", "Вінницька"))
            .expect("region");
        registry
            .register(&raw(REGION, SUBREGION, "", "", "", "P", "Вінницький"))
            .expect("subregion");
        registry
            .register(&raw(REGION, SUBREGION, HROMADA, "", "", "H", "Вінницька"))
            .expect("hromada");
        registry
            .register(&raw(REGION, SUBREGION, HROMADA, PPL, "", "M", "Вінниця"))
            .expect("ppl");
        registry
            .register(&raw(REGION, SUBREGION, HROMADA, PPL, DISTRICT, "B", "Старе місто"))
            .expect("district");
        registry
            .register(&raw(REGION, SUBREGION, HROMADA, VILLAGE, "", "C", "Агрономічне"))
            .expect("village");
        fixer::fix(&registry).expect("fix")
    }

    #[test]
    fn sentinel_is_always_emitted() {
        let records = build_records(&EntityRegistry::new());
        assert_eq!(records.len(), 1);
        let sentinel = &records[WHOLE_COUNTRY_AUTOCODE];
        assert_eq!(sentinel.hierarchy, "UA");
        assert_eq!(sentinel.category, Category::WholeCountry);
        assert!(sentinel.region_name.is_none());
    }

    #[test]
    fn region_record_has_only_region_name() {
        let records = build_records(&fixed_registry());
        let region = &records["10001"];
        assert_eq!(region.category, Category::Region);
        assert_eq!(region.hierarchy, "UA05");
        assert_eq!(region.region_name.as_deref(), Some("Вінницька"));
        assert!(region.subregion_name.is_none());
        assert!(region.ppl_name.is_none());
        assert!(region.district_name.is_none());
        assert!(region.city_autocode.is_none());
        assert_eq!(region.search_name, "Вінницька");
    }

    #[test]
    fn intermediate_levels_are_not_emitted() {
        let records = build_records(&fixed_registry());
        // Subregion and hromada entries resolve names only.
        assert!(!records.contains_key("10002"));
        assert!(!records.contains_key("10003"));
    }

    #[test]
    fn settlement_with_district_becomes_a_city() {
        let records = build_records(&fixed_registry());

        let city = &records["10004"];
        assert_eq!(city.category, Category::City);
        assert_eq!(city.hierarchy, "UA0502003004");
        assert_eq!(city.ppl_name.as_deref(), Some("Вінниця"));
        assert_eq!(city.subregion_name.as_deref(), Some("Вінницький"));
        assert_eq!(city.region_name.as_deref(), Some("Вінницька"));

        let district = &records["10005"];
        assert_eq!(district.category, Category::CityDistrict);
        assert_eq!(district.city_autocode.as_deref(), Some("10004"));
        assert_eq!(district.district_name.as_deref(), Some("Старе місто"));
        assert_eq!(district.ppl_name.as_deref(), Some("Вінниця"));
        assert_eq!(district.region_name.as_deref(), Some("Вінницька"));
        assert_eq!(district.hierarchy, "UA050200300405");
    }

    #[test]
    fn settlement_without_districts_stays_a_settlement() {
        let records = build_records(&fixed_registry());
        let village = &records["10006"];
        assert_eq!(village.category, Category::OtherPpl);
        assert_eq!(village.ppl_name.as_deref(), Some("Агрономічне"));
        assert!(village.city_autocode.is_none());
    }

    #[test]
    fn capital_districts_carry_the_rewritten_paths() {
        const KYIV_REGION: &str = "UA07000000000020002";
        const KYIV: &str = "UA80000000000030001";
        const KYIV_DISTRICT: &str = "UA80000000000130002";

        let mut registry = EntityRegistry::new();
        registry
            .register(&raw(CRIMEA, "", "", "", "", "O", "Автономна Республіка Крим"))
            .expect("crimea");
        registry
            .register(&raw(KYIV_REGION, "", "", "", "", "O", "Київська"))
            .expect("kyiv region");
        registry
            .register(&raw(KYIV, "", "", "", "", "K", "Київ"))
            .expect("kyiv");
        registry
            .register(&raw(KYIV, "", "", KYIV, KYIV_DISTRICT, "B", "Подільський"))
            .expect("kyiv district");
        let records = build_records(&fixer::fix(&registry).expect("fix"));

        let kyiv = &records["30001"];
        assert_eq!(kyiv.category, Category::City);
        assert_eq!(kyiv.hierarchy, "UA0799999999");
        assert_eq!(kyiv.region_name.as_deref(), Some("Київська"));
        // Collapsed intermediate levels all resolve to the capital itself.
        assert_eq!(kyiv.subregion_name.as_deref(), Some("Київ"));
        assert_eq!(kyiv.ppl_name.as_deref(), Some("Київ"));

        let district = &records["30002"];
        assert_eq!(district.hierarchy, "UA079999999901");
        assert_eq!(district.city_autocode.as_deref(), Some("30001"));
        assert_eq!(district.region_name.as_deref(), Some("Київська"));
        assert_eq!(district.ppl_name.as_deref(), Some("Київ"));
    }
}
