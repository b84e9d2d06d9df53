use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::models::{
    Category, CityMatch, DistrictMatch, LocationRecord, PplMatch, RegionMatch, SearchResult,
    WHOLE_COUNTRY_AUTOCODE,
};

/// Which name fields must be set is a function of the category; the
/// check constraints keep a bad import from ever landing.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS locations (
    autocode         TEXT PRIMARY KEY,
    hierarchy        TEXT NOT NULL UNIQUE,
    category         TEXT NOT NULL,
    region_name      TEXT,
    subregion_name   TEXT,
    ppl_name         TEXT,
    district_name    TEXT,
    search_name      TEXT NOT NULL,
    search_name_norm TEXT NOT NULL,
    city_autocode    TEXT REFERENCES locations(autocode),
    CHECK (category IN ('a', 'r', 'c', 'p', 'd')),
    CHECK (category != 'd' OR (
        city_autocode IS NOT NULL
        AND district_name IS NOT NULL
        AND ppl_name IS NOT NULL
        AND subregion_name IS NOT NULL
        AND region_name IS NOT NULL)),
    CHECK ((category != 'c' AND category != 'p') OR (
        city_autocode IS NULL
        AND district_name IS NULL
        AND ppl_name IS NOT NULL
        AND subregion_name IS NOT NULL
        AND region_name IS NOT NULL)),
    CHECK (category != 'r' OR (
        city_autocode IS NULL
        AND district_name IS NULL
        AND ppl_name IS NULL
        AND subregion_name IS NULL
        AND region_name IS NOT NULL)),
    CHECK (category != 'a' OR (
        city_autocode IS NULL
        AND district_name IS NULL
        AND ppl_name IS NULL
        AND subregion_name IS NULL
        AND region_name IS NULL))
);
CREATE INDEX IF NOT EXISTS idx_locations_search ON locations (category, search_name_norm);
CREATE INDEX IF NOT EXISTS idx_locations_city ON locations (city_autocode);
";

#[derive(Debug, Clone, Copy)]
pub struct ReplaceSummary {
    pub upserted: usize,
    pub deleted: usize,
}

pub struct LocationStore {
    conn: Connection,
}

impl LocationStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed opening location database {}", path.display()))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory().context("Failed opening in-memory database")?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA).context("Failed creating locations schema")?;
        Ok(Self { conn })
    }

    /// Full-refresh import: upsert every record by autocode, then prune
    /// everything absent from the batch except the whole-country
    /// sentinel. One transaction, so a failed import leaves the previous
    /// dataset fully intact.
    pub fn replace_all(&mut self, records: &BTreeMap<String, LocationRecord>) -> Result<ReplaceSummary> {
        let tx = self.conn.transaction().context("Failed starting replace transaction")?;

        {
            let mut upsert = tx.prepare(
                "INSERT INTO locations (
                    autocode, hierarchy, category, region_name, subregion_name,
                    ppl_name, district_name, search_name, search_name_norm, city_autocode
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ON CONFLICT(autocode) DO UPDATE SET
                    hierarchy = excluded.hierarchy,
                    category = excluded.category,
                    region_name = excluded.region_name,
                    subregion_name = excluded.subregion_name,
                    ppl_name = excluded.ppl_name,
                    district_name = excluded.district_name,
                    search_name = excluded.search_name,
                    search_name_norm = excluded.search_name_norm,
                    city_autocode = excluded.city_autocode",
            )?;
            for record in records.values() {
                upsert
                    .execute(params![
                        record.autocode,
                        record.hierarchy,
                        record.category.as_code(),
                        record.region_name,
                        record.subregion_name,
                        record.ppl_name,
                        record.district_name,
                        record.search_name,
                        normalize_term(&record.search_name),
                        record.city_autocode,
                    ])
                    .with_context(|| format!("Failed upserting location {}", record.autocode))?;
            }
        }

        // A NOT IN over a key table sidesteps the host-parameter limit
        // the full batch (~30k rows) would blow through.
        tx.execute_batch(
            "CREATE TEMP TABLE IF NOT EXISTS import_keys (autocode TEXT PRIMARY KEY);
             DELETE FROM import_keys;",
        )?;
        {
            let mut insert_key = tx.prepare("INSERT INTO import_keys (autocode) VALUES (?1)")?;
            for autocode in records.keys() {
                insert_key.execute(params![autocode])?;
            }
        }
        let deleted = tx
            .execute(
                "DELETE FROM locations
                 WHERE autocode NOT IN (SELECT autocode FROM import_keys)
                   AND autocode != ?1",
                params![WHOLE_COUNTRY_AUTOCODE],
            )
            .context("Failed pruning absent locations")?;
        tx.execute("DELETE FROM import_keys", [])?;

        tx.commit().context("Failed committing location replace")?;
        Ok(ReplaceSummary {
            upserted: records.len(),
            deleted,
        })
    }

    /// Case-insensitive starts-with match over search names, scoped per
    /// category. The term is lowercased in Rust since SQLite's LIKE only
    /// folds ASCII.
    pub fn prefix_search(&self, term: &str) -> Result<SearchResult> {
        let pattern = format!("{}%", escape_like(&normalize_term(term)));

        let mut regions = Vec::new();
        {
            let mut stmt = self.conn.prepare(
                "SELECT autocode, region_name FROM locations
                 WHERE category = 'r' AND search_name_norm LIKE ?1 ESCAPE '\\'
                 ORDER BY search_name",
            )?;
            let rows = stmt.query_map(params![pattern], |row| {
                Ok(RegionMatch {
                    autocode: row.get(0)?,
                    region_name: row.get(1)?,
                })
            })?;
            for row in rows {
                regions.push(row?);
            }
        }

        let mut cities = Vec::new();
        {
            let mut stmt = self.conn.prepare(
                "SELECT autocode, ppl_name, region_name FROM locations
                 WHERE category = 'c' AND search_name_norm LIKE ?1 ESCAPE '\\'
                 ORDER BY search_name",
            )?;
            let rows = stmt.query_map(params![pattern], |row| {
                Ok(CityMatch {
                    autocode: row.get(0)?,
                    ppl_name: row.get(1)?,
                    region_name: row.get(2)?,
                    districts: Vec::new(),
                })
            })?;
            for row in rows {
                cities.push(row?);
            }
        }
        for city in &mut cities {
            city.districts = self.districts_of(&city.autocode)?;
        }

        let mut other_ppls = Vec::new();
        {
            let mut stmt = self.conn.prepare(
                "SELECT autocode, ppl_name, region_name, subregion_name FROM locations
                 WHERE category = 'p' AND search_name_norm LIKE ?1 ESCAPE '\\'
                 ORDER BY search_name",
            )?;
            let rows = stmt.query_map(params![pattern], |row| {
                Ok(PplMatch {
                    autocode: row.get(0)?,
                    ppl_name: row.get(1)?,
                    region_name: row.get(2)?,
                    subregion_name: row.get(3)?,
                })
            })?;
            for row in rows {
                other_ppls.push(row?);
            }
        }

        Ok(SearchResult {
            regions,
            cities,
            other_ppls,
        })
    }

    pub fn whole_country(&self) -> Result<LocationRecord> {
        self.get(WHOLE_COUNTRY_AUTOCODE)?
            .context("Whole-country sentinel missing, run the import first")
    }

    pub fn get(&self, autocode: &str) -> Result<Option<LocationRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT autocode, hierarchy, category, region_name, subregion_name,
                    ppl_name, district_name, search_name, city_autocode
             FROM locations WHERE autocode = ?1",
        )?;
        let mut rows = stmt.query_map(params![autocode], record_from_row)?;
        rows.next().transpose().map_err(Into::into)
    }

    /// Which of the given hierarchy paths exist in the store.
    pub fn existing_hierarchies(&self, paths: &[String]) -> Result<HashSet<String>> {
        let mut existing = HashSet::new();
        let mut stmt = self
            .conn
            .prepare("SELECT 1 FROM locations WHERE hierarchy = ?1")?;
        for path in paths {
            if stmt.exists(params![path])? {
                existing.insert(path.clone());
            }
        }
        Ok(existing)
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM locations", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn districts_of(&self, city_autocode: &str) -> Result<Vec<DistrictMatch>> {
        let mut districts = Vec::new();
        let mut stmt = self.conn.prepare(
            "SELECT autocode, district_name FROM locations
             WHERE category = 'd' AND city_autocode = ?1
             ORDER BY search_name",
        )?;
        let rows = stmt.query_map(params![city_autocode], |row| {
            Ok(DistrictMatch {
                autocode: row.get(0)?,
                district_name: row.get(1)?,
            })
        })?;
        for row in rows {
            districts.push(row?);
        }
        Ok(districts)
    }
}

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LocationRecord> {
    let category_code: String = row.get(2)?;
    let category = Category::from_code(&category_code).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown category code \"{category_code}\"").into(),
        )
    })?;
    Ok(LocationRecord {
        autocode: row.get(0)?,
        hierarchy: row.get(1)?,
        category,
        region_name: row.get(3)?,
        subregion_name: row.get(4)?,
        ppl_name: row.get(5)?,
        district_name: row.get(6)?,
        search_name: row.get(7)?,
        city_autocode: row.get(8)?,
    })
}

/// Full Unicode lowercasing; Cyrillic search names would fall through
/// SQLite's ASCII-only folding.
fn normalize_term(term: &str) -> String {
    term.to_lowercase()
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{WHOLE_COUNTRY_HIERARCHY, WHOLE_COUNTRY_NAME};

    fn region(autocode: &str, hierarchy: &str, name: &str) -> LocationRecord {
        LocationRecord {
            autocode: autocode.to_string(),
            hierarchy: hierarchy.to_string(),
            category: Category::Region,
            region_name: Some(name.to_string()),
            subregion_name: None,
            ppl_name: None,
            district_name: None,
            search_name: name.to_string(),
            city_autocode: None,
        }
    }

    fn city(autocode: &str, hierarchy: &str, name: &str, region_name: &str) -> LocationRecord {
        LocationRecord {
            autocode: autocode.to_string(),
            hierarchy: hierarchy.to_string(),
            category: Category::City,
            region_name: Some(region_name.to_string()),
            subregion_name: Some(format!("{name}ський")),
            ppl_name: Some(name.to_string()),
            district_name: None,
            search_name: name.to_string(),
            city_autocode: None,
        }
    }

    fn district(
        autocode: &str,
        hierarchy: &str,
        name: &str,
        city: &LocationRecord,
    ) -> LocationRecord {
        LocationRecord {
            autocode: autocode.to_string(),
            hierarchy: hierarchy.to_string(),
            category: Category::CityDistrict,
            region_name: city.region_name.clone(),
            subregion_name: city.subregion_name.clone(),
            ppl_name: city.ppl_name.clone(),
            district_name: Some(name.to_string()),
            search_name: name.to_string(),
            city_autocode: Some(city.autocode.clone()),
        }
    }

    fn batch(records: &[LocationRecord]) -> BTreeMap<String, LocationRecord> {
        let mut map = BTreeMap::new();
        map.insert(WHOLE_COUNTRY_AUTOCODE.to_string(), LocationRecord::whole_country());
        for record in records {
            map.insert(record.autocode.clone(), record.clone());
        }
        map
    }

    fn seeded_store() -> (LocationStore, BTreeMap<String, LocationRecord>) {
        let mut store = LocationStore::open_in_memory().expect("open");
        let kyiv = city("30001", "UA0799999999", "Київ", "Київська");
        let records = batch(&[
            region("20001", "UA01", "АР Крим"),
            region("20002", "UA07", "Київська"),
            kyiv.clone(),
            district("30002", "UA079999999901", "Подільський", &kyiv),
            city("10004", "UA0502003004", "Київець", "Вінницька"),
        ]);
        store.replace_all(&records).expect("seed");
        (store, records)
    }

    #[test]
    fn replace_is_idempotent() {
        let (mut store, records) = seeded_store();
        let before = store.count().expect("count");

        let summary = store.replace_all(&records).expect("second import");
        assert_eq!(summary.deleted, 0);
        assert_eq!(store.count().expect("count"), before);
        assert_eq!(
            store.get("30002").expect("get").expect("district"),
            records["30002"]
        );
    }

    #[test]
    fn renumbered_hierarchy_updates_in_place() {
        let (mut store, mut records) = seeded_store();
        let before = store.count().expect("count");

        if let Some(record) = records.get_mut("10004") {
            record.hierarchy = "UA0502003099".to_string();
        }
        store.replace_all(&records).expect("renumbered import");

        assert_eq!(store.count().expect("count"), before);
        let updated = store.get("10004").expect("get").expect("still present");
        assert_eq!(updated.hierarchy, "UA0502003099");
    }

    #[test]
    fn absent_records_are_pruned_but_sentinel_survives() {
        let (mut store, mut records) = seeded_store();

        records.remove("10004");
        let summary = store.replace_all(&records).expect("pruning import");
        assert_eq!(summary.deleted, 1);
        assert!(store.get("10004").expect("get").is_none());

        let sentinel = store.whole_country().expect("sentinel");
        assert_eq!(sentinel.hierarchy, WHOLE_COUNTRY_HIERARCHY);
        assert_eq!(sentinel.search_name, WHOLE_COUNTRY_NAME);
    }

    #[test]
    fn constraint_violation_rolls_back_the_whole_replace() {
        let (mut store, records) = seeded_store();
        let before = store.count().expect("count");

        let mut bad = records.clone();
        bad.insert(
            "66666".to_string(),
            LocationRecord {
                // A region with a district name violates the category
                // field pattern.
                district_name: Some("Зайвий".to_string()),
                ..region("66666", "UA66", "Хибна")
            },
        );
        bad.remove("10004");

        assert!(store.replace_all(&bad).is_err());
        assert_eq!(store.count().expect("count"), before);
        assert!(store.get("10004").expect("get").is_some(), "prune must roll back too");
    }

    #[test]
    fn prefix_search_is_case_insensitive_for_cyrillic() {
        let (store, _) = seeded_store();

        let lower = store.prefix_search("ки").expect("search lower");
        let upper = store.prefix_search("КИ").expect("search upper");
        assert_eq!(lower, upper);

        assert_eq!(lower.regions.len(), 1);
        assert_eq!(lower.regions[0].region_name, "Київська");
        assert_eq!(lower.cities.len(), 2);
        assert_eq!(lower.cities[0].ppl_name, "Київ");
        assert_eq!(lower.cities[0].districts.len(), 1);
        assert_eq!(lower.cities[0].districts[0].district_name, "Подільський");
        assert_eq!(lower.cities[1].ppl_name, "Київець");
        assert!(lower.cities[1].districts.is_empty());
        assert!(lower.other_ppls.is_empty());
    }

    #[test]
    fn search_is_prefix_only() {
        let (store, _) = seeded_store();
        // "крим" matches АР Крим only as a substring, not a prefix.
        let result = store.prefix_search("крим").expect("search");
        assert!(result.is_empty());
    }

    #[test]
    fn like_metacharacters_match_literally() {
        let (store, _) = seeded_store();
        let result = store.prefix_search("%").expect("search");
        assert!(result.is_empty());
        let result = store.prefix_search("К_").expect("search");
        assert!(result.is_empty());
    }

    #[test]
    fn existing_hierarchies_reports_only_known_paths() {
        let (store, _) = seeded_store();
        let paths = vec![
            "UA07".to_string(),
            "UA0799999999".to_string(),
            "UA99".to_string(),
        ];
        let existing = store.existing_hierarchies(&paths).expect("existing");
        assert!(existing.contains("UA07"));
        assert!(existing.contains("UA0799999999"));
        assert!(!existing.contains("UA99"));
    }

    #[test]
    fn whole_country_requires_an_import() {
        let store = LocationStore::open_in_memory().expect("open");
        assert!(store.whole_country().is_err());
    }
}
