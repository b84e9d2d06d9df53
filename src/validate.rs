use crate::errors::ValidationError;
use crate::store::LocationStore;

/// Cap on a preferred-location set; keeps the pairwise overlap check
/// trivially cheap.
pub const MAX_PREFERRED_LOCATIONS: usize = 30;

/// Checks a candidate preferred-location set (hierarchy paths) against
/// cardinality, existence and hierarchical-overlap rules, in that order.
/// An empty set is valid: the caller falls back to the whole-country
/// default.
pub fn validate_preferred_locations(
    store: &LocationStore,
    paths: &[String],
) -> Result<(), ValidationError> {
    if paths.len() > MAX_PREFERRED_LOCATIONS {
        return Err(ValidationError::TooManyLocations {
            count: paths.len(),
            max: MAX_PREFERRED_LOCATIONS,
        });
    }

    let existing = store.existing_hierarchies(paths)?;
    let mut missing: Vec<String> = paths
        .iter()
        .filter(|path| !existing.contains(*path))
        .cloned()
        .collect();
    if !missing.is_empty() {
        missing.sort();
        missing.dedup();
        return Err(ValidationError::NonexistentLocations { missing });
    }

    validate_no_overlap(paths)
}

/// A hierarchy path structurally encodes containment: one path being a
/// prefix of another means one location already includes the other.
pub fn validate_no_overlap(paths: &[String]) -> Result<(), ValidationError> {
    for (i, first) in paths.iter().enumerate() {
        for second in paths.iter().skip(i + 1) {
            if first.starts_with(second.as_str()) || second.starts_with(first.as_str()) {
                return Err(ValidationError::OverlappingLocations {
                    first: first.clone(),
                    second: second.clone(),
                });
            }
        }
    }
    Ok(())
}
