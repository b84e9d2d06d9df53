use thiserror::Error;

/// Import-time failures. Both mean the source file no longer matches the
/// expected KATOTTG format; the whole import run is aborted with no
/// partial changes.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("unknown KATOTTG category \"{indicator}\" in entry \"{name}\"")]
    UnknownCategory { indicator: String, name: String },
    #[error("fixup target \"{name}\" not found among regions")]
    FixupTargetNotFound { name: String },
}

/// Request-time failures for preferred-location sets. Recovered at the
/// request boundary as a rejected request naming the offending paths.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("too many locations: {count}, the maximum is {max}")]
    TooManyLocations { count: usize, max: usize },
    #[error("locations with these hierarchies do not exist: {missing:?}")]
    NonexistentLocations { missing: Vec<String> },
    #[error("location {first} overlaps with {second}")]
    OverlappingLocations { first: String, second: String },
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::TooManyLocations { .. } => "TOO_MANY_LOCATIONS",
            Self::NonexistentLocations { .. } => "NONEXISTENT_LOCATIONS",
            Self::OverlappingLocations { .. } => "OVERLAPPING_LOCATIONS",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }
}
