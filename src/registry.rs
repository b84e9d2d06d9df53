use std::collections::{BTreeMap, HashMap};

use crate::codes::{EntryCategory, FlatEntry, RawRow};
use crate::errors::ImportError;

/// A parsed entry plus its resolved ancestor chain. Links are held as
/// full-code strings rather than live references so the registry stays a
/// plain value and clones cheaply for the fixer.
#[derive(Debug, Clone)]
pub struct LinkedEntry {
    pub entry: FlatEntry,
    pub region: Option<String>,
    pub subregion: Option<String>,
    pub hromada: Option<String>,
    pub ppl: Option<String>,
    pub city_dist: Option<String>,
}

/// Import-scoped index of all source entries, organized per category and
/// keyed by full code. Discarded once records are built.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    by_category: HashMap<EntryCategory, BTreeMap<String, LinkedEntry>>,
    code_index: HashMap<String, EntryCategory>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a row and links it to already-registered ancestors. Source
    /// order guarantees ancestors precede descendants; an unresolved link
    /// stays `None`, which is valid only at region level. Re-registering
    /// a full code is last-write-wins.
    pub fn register(&mut self, row: &RawRow) -> Result<(), ImportError> {
        let entry = FlatEntry::parse(row)?;

        let mut linked = LinkedEntry {
            region: self.registered_code(&entry.region_code),
            subregion: self.registered_code(&entry.subregion_code),
            hromada: self.registered_code(&entry.hromada_code),
            ppl: self.registered_code(&entry.ppl_code),
            city_dist: None,
            entry,
        };

        // The entry's own level always points at itself.
        let own_code = linked.entry.full_code.clone();
        match linked.entry.category {
            EntryCategory::Region | EntryCategory::Capital => linked.region = Some(own_code.clone()),
            EntryCategory::Subregion => linked.subregion = Some(own_code.clone()),
            EntryCategory::Hromada => linked.hromada = Some(own_code.clone()),
            EntryCategory::OtherPpl => linked.ppl = Some(own_code.clone()),
            EntryCategory::CityDistrict => linked.city_dist = Some(own_code.clone()),
        }

        self.code_index.insert(own_code.clone(), linked.entry.category);
        self.by_category
            .entry(linked.entry.category)
            .or_default()
            .insert(own_code, linked);
        Ok(())
    }

    /// The defining entry registered under a full code, if any.
    pub fn resolve(&self, code: &str) -> Option<&FlatEntry> {
        self.linked(code).map(|linked| &linked.entry)
    }

    pub fn linked(&self, code: &str) -> Option<&LinkedEntry> {
        let category = self.code_index.get(code)?;
        self.by_category.get(category)?.get(code)
    }

    pub fn linked_mut(&mut self, code: &str) -> Option<&mut LinkedEntry> {
        let category = *self.code_index.get(code)?;
        self.by_category.get_mut(&category)?.get_mut(code)
    }

    pub fn entries(&self, category: EntryCategory) -> impl Iterator<Item = &LinkedEntry> {
        self.by_category.get(&category).into_iter().flat_map(|m| m.values())
    }

    /// Exact-name matches within one category. Name collisions across
    /// categories are expected in the source; category scoping
    /// disambiguates.
    pub fn search_by_name(&self, name: &str, category: EntryCategory) -> Vec<&LinkedEntry> {
        self.entries(category)
            .filter(|linked| linked.entry.name == name)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.code_index.len()
    }

    fn registered_code(&self, code: &str) -> Option<String> {
        if !code.is_empty() && self.code_index.contains_key(code) {
            Some(code.to_string())
        } else {
            None
        }
    }
}
