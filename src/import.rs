use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::builder;
use crate::codes::RawRow;
use crate::fixer;
use crate::registry::EntityRegistry;
use crate::store::LocationStore;

#[derive(Debug, Clone, Copy)]
pub struct ImportSummary {
    pub rows: usize,
    pub upserted: usize,
    pub deleted: usize,
}

/// Full KATOTTG refresh from a CSV file: parse, link, fix, build,
/// replace. Any format break aborts the run before the store is touched;
/// the replace itself is one transaction.
pub fn run_import(store: &mut LocationStore, csv_path: &Path) -> Result<ImportSummary> {
    let file = File::open(csv_path)
        .with_context(|| format!("Failed opening KATOTTG csv {}", csv_path.display()))?;
    import_from_reader(store, file)
}

pub fn import_from_reader<R: Read>(store: &mut LocationStore, reader: R) -> Result<ImportSummary> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(reader);

    let mut registry = EntityRegistry::new();
    let mut rows = 0usize;
    for (idx, result) in csv_reader.deserialize::<RawRow>().enumerate() {
        // The first row carries the source's own column names.
        if idx == 0 {
            result.context("Failed reading KATOTTG csv header")?;
            continue;
        }
        let row = result.with_context(|| format!("Failed reading KATOTTG csv row {}", idx + 1))?;
        registry.register(&row)?;
        rows += 1;
    }
    info!(rows, entries = registry.len(), "Parsed KATOTTG csv");

    let fixed = fixer::fix(&registry)?;
    let records = builder::build_records(&fixed);
    info!(records = records.len(), "Built location records");

    let summary = store.replace_all(&records)?;
    info!(
        upserted = summary.upserted,
        deleted = summary.deleted,
        "Location table replaced"
    );

    Ok(ImportSummary {
        rows,
        upserted: summary.upserted,
        deleted: summary.deleted,
    })
}
