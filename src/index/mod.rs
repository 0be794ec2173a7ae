// src/index/mod.rs
pub mod lookup;

use serde::Serialize;
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, instrument};

use crate::process::{
    columns::ColumnRoles,
    utils::{clean_field, clean_vin, trailing},
    Dataset,
};

/// Length of the primary lookup key.
pub const KEY_LEN: usize = 8;

/// One operational record, built from a single source row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Record {
    /// Cleaned VIN: uppercase, `A-Z0-9` only.
    pub vin: String,
    pub unit: String,
    pub ds: String,
    pub dsp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plate: Option<String>,
}

/// Normalised key -> records in source order. Collisions are expected.
pub type Index = HashMap<String, Vec<Arc<Record>>>;

#[derive(Clone, Debug, Default)]
pub struct Indexes {
    pub by_last8: Index,
    pub by_unit: Index,
    pub by_plate: Index,
}

impl Indexes {
    /// Distinct primary keys.
    pub fn key_count(&self) -> usize {
        self.by_last8.len()
    }
}

#[derive(Clone, Debug, Default)]
pub struct BuildOutcome {
    pub indexes: Indexes,
    /// Rows that produced a primary-index entry.
    pub accepted: usize,
}

/// Primary key for a cleaned VIN, or `None` when it is shorter than 8.
pub fn last8_key(vin: &str) -> Option<&str> {
    (vin.len() >= KEY_LEN).then(|| trailing(vin, KEY_LEN))
}

/// Secondary key: trimmed and upper-cased, `None` when empty.
fn secondary_key(value: &str) -> Option<String> {
    let key = value.trim().to_uppercase();
    (!key.is_empty()).then_some(key)
}

fn push(index: &mut Index, key: String, record: &Arc<Record>) {
    index.entry(key).or_default().push(Arc::clone(record));
}

/// Build fresh indexes from a decoded dataset. Entries are only ever
/// appended, so a key maps to its records in row order.
#[instrument(level = "debug", skip_all, fields(rows = dataset.len()))]
pub fn build(dataset: &Dataset, roles: &ColumnRoles) -> BuildOutcome {
    let mut indexes = Indexes::default();
    let mut accepted = 0usize;

    for row in 0..dataset.len() {
        let vin = clean_vin(dataset.field(row, roles.vin));
        let plate = roles
            .plate
            .map(|col| clean_field(dataset.field(row, col)))
            .filter(|p| !p.is_empty());
        let record = Arc::new(Record {
            unit: clean_field(dataset.field(row, roles.unit)),
            ds: clean_field(dataset.field(row, roles.ds)),
            dsp: clean_field(dataset.field(row, roles.dsp)),
            plate,
            vin,
        });

        if let Some(key) = last8_key(&record.vin) {
            push(&mut indexes.by_last8, key.to_string(), &record);
            accepted += 1;
        }
        if let Some(key) = secondary_key(&record.unit) {
            push(&mut indexes.by_unit, key, &record);
        }
        if let Some(key) = record.plate.as_deref().and_then(secondary_key) {
            push(&mut indexes.by_plate, key, &record);
        }
    }

    debug!(
        accepted,
        keys = indexes.by_last8.len(),
        units = indexes.by_unit.len(),
        plates = indexes.by_plate.len(),
        "index built"
    );
    BuildOutcome { indexes, accepted }
}
