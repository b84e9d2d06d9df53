use serde::Deserialize;

use crate::errors::ImportError;
use crate::models::Category;

/// KATOTTG codes look like `UA01050651270051902`: country tag, region,
/// subregion, hromada, populated place and city-district fragments,
/// followed by a randomly assigned 5-digit tail. The first 14 characters
/// encode the hierarchy and may change between source revisions; the last
/// 5 never change and identify the entity across re-imports.
pub const HIERARCHY_CODE_LEN: usize = 14;
pub const AUTOCODE_LEN: usize = 5;

/// Entry types as they appear in the source file. `Subregion` and
/// `Hromada` are intermediate levels used only to resolve ancestor names;
/// they are never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryCategory {
    Region,
    Subregion,
    Hromada,
    Capital,
    OtherPpl,
    CityDistrict,
}

impl EntryCategory {
    /// Latin-transliterated indicator alphabet. Historical revisions of
    /// the source also shipped a Cyrillic alphabet; this deployment pins
    /// the Latin one, anything else fails the import.
    pub fn from_indicator(indicator: &str) -> Option<Self> {
        match indicator {
            "O" => Some(Self::Region),
            "P" => Some(Self::Subregion),
            "H" => Some(Self::Hromada),
            "K" => Some(Self::Capital),
            "B" => Some(Self::CityDistrict),
            "C" | "T" | "X" | "M" => Some(Self::OtherPpl),
            _ => None,
        }
    }

    pub fn persisted(self) -> Option<Category> {
        match self {
            Self::Region => Some(Category::Region),
            Self::Capital => Some(Category::City),
            Self::OtherPpl => Some(Category::OtherPpl),
            Self::CityDistrict => Some(Category::CityDistrict),
            Self::Subregion | Self::Hromada => None,
        }
    }

    /// Stored hierarchy codes are trimmed to the defining level.
    pub fn trimmed_hierarchy_len(self) -> Option<usize> {
        match self {
            Self::Region => Some(4),
            Self::Capital | Self::OtherPpl => Some(12),
            Self::CityDistrict => Some(14),
            Self::Subregion | Self::Hromada => None,
        }
    }
}

/// One source row, column order fixed by the external file format. The
/// code columns carry full 19-character codes of the row's ancestors (or
/// are empty above the row's own level).
#[derive(Debug, Clone, Deserialize)]
pub struct RawRow {
    pub region_code: String,
    pub subregion_code: String,
    pub hromada_code: String,
    pub ppl_code: String,
    pub city_dist_code: String,
    pub category: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatEntry {
    pub region_code: String,
    pub subregion_code: String,
    pub hromada_code: String,
    pub ppl_code: String,
    pub city_dist_code: String,
    pub name: String,
    pub category: EntryCategory,
    pub full_code: String,
    pub hierarchy_code: String,
    pub autocode: String,
}

impl FlatEntry {
    pub fn parse(row: &RawRow) -> Result<Self, ImportError> {
        let category = EntryCategory::from_indicator(row.category.trim()).ok_or_else(|| {
            ImportError::UnknownCategory {
                indicator: row.category.clone(),
                name: row.name.clone(),
            }
        })?;

        let full_code = defining_code(row, category).to_string();
        let hierarchy_code: String = full_code.chars().take(HIERARCHY_CODE_LEN).collect();
        let autocode: String = full_code
            .chars()
            .skip(full_code.chars().count().saturating_sub(AUTOCODE_LEN))
            .collect();

        Ok(Self {
            region_code: row.region_code.clone(),
            subregion_code: row.subregion_code.clone(),
            hromada_code: row.hromada_code.clone(),
            ppl_code: row.ppl_code.clone(),
            city_dist_code: row.city_dist_code.clone(),
            name: row.name.clone(),
            category,
            full_code,
            hierarchy_code,
            autocode,
        })
    }

    pub fn trimmed_hierarchy(&self) -> Option<String> {
        self.category
            .trimmed_hierarchy_len()
            .map(|len| self.hierarchy_code.chars().take(len).collect())
    }
}

/// The column that identifies the row's own entity depends on its
/// category: capitals arrive encoded at region level.
fn defining_code(row: &RawRow, category: EntryCategory) -> &str {
    match category {
        EntryCategory::Region | EntryCategory::Capital => &row.region_code,
        EntryCategory::Subregion => &row.subregion_code,
        EntryCategory::Hromada => &row.hromada_code,
        EntryCategory::OtherPpl => &row.ppl_code,
        EntryCategory::CityDistrict => &row.city_dist_code,
    }
}
