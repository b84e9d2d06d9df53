use serde::{Deserialize, Serialize};

/// The sentinel record representing the whole country. It is part of
/// every import batch and is never deleted by pruning.
pub const WHOLE_COUNTRY_AUTOCODE: &str = "00000";
pub const WHOLE_COUNTRY_HIERARCHY: &str = "UA";
pub const WHOLE_COUNTRY_NAME: &str = "Вся Україна";

/// Persisted location categories, stored as single-character codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    WholeCountry,
    Region,
    City,
    OtherPpl,
    CityDistrict,
}

impl Category {
    pub fn as_code(self) -> &'static str {
        match self {
            Self::WholeCountry => "a",
            Self::Region => "r",
            Self::City => "c",
            Self::OtherPpl => "p",
            Self::CityDistrict => "d",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "a" => Some(Self::WholeCountry),
            "r" => Some(Self::Region),
            "c" => Some(Self::City),
            "p" => Some(Self::OtherPpl),
            "d" => Some(Self::CityDistrict),
            _ => None,
        }
    }
}

/// One storable location row. Which name fields are set is determined by
/// the category and enforced by the table's check constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationRecord {
    pub autocode: String,
    pub hierarchy: String,
    pub category: Category,
    pub region_name: Option<String>,
    pub subregion_name: Option<String>,
    pub ppl_name: Option<String>,
    pub district_name: Option<String>,
    pub search_name: String,
    pub city_autocode: Option<String>,
}

impl LocationRecord {
    pub fn whole_country() -> Self {
        Self {
            autocode: WHOLE_COUNTRY_AUTOCODE.to_string(),
            hierarchy: WHOLE_COUNTRY_HIERARCHY.to_string(),
            category: Category::WholeCountry,
            region_name: None,
            subregion_name: None,
            ppl_name: None,
            district_name: None,
            search_name: WHOLE_COUNTRY_NAME.to_string(),
            city_autocode: None,
        }
    }

    pub fn to_response(&self) -> LocationResponse {
        LocationResponse {
            autocode: self.autocode.clone(),
            hierarchy: self.hierarchy.clone(),
            category: self.category.as_code().to_string(),
            search_name: self.search_name.clone(),
            region_name: self.region_name.clone(),
            subregion_name: self.subregion_name.clone(),
            ppl_name: self.ppl_name.clone(),
            district_name: self.district_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationResponse {
    pub autocode: String,
    pub hierarchy: String,
    pub category: String,
    pub search_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subregion_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ppl_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RegionMatch {
    pub autocode: String,
    pub region_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DistrictMatch {
    pub autocode: String,
    pub district_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CityMatch {
    pub autocode: String,
    pub ppl_name: String,
    pub region_name: String,
    pub districts: Vec<DistrictMatch>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PplMatch {
    pub autocode: String,
    pub ppl_name: String,
    pub region_name: String,
    pub subregion_name: String,
}

/// Prefix-search hits, scoped per category. Cities carry their nested
/// district lists. An empty result is a valid state, not an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub regions: Vec<RegionMatch>,
    pub cities: Vec<CityMatch>,
    pub other_ppls: Vec<PplMatch>,
}

impl SearchResult {
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty() && self.cities.is_empty() && self.other_ppls.is_empty()
    }
}
