// src/app.rs
//! Wires the load cycle to the live index and renders lookups.

use anyhow::Result;
use serde::Serialize;
use std::{
    fmt,
    sync::{Arc, PoisonError, RwLock},
};
use tracing::{info, instrument};

use crate::{
    config::Config,
    fetch::HttpFetcher,
    freshness::{Coordinator, LoadOutcome, Tier},
    index::{build, lookup::LookupService, Record},
    normalize::{normalize, Mode},
    process::{columns::resolve, utils::group_thousands},
    recognize::{Recognition, RecognitionGate, RecognizeError},
    snapshot::{SnapshotStore, Version},
};

/// What the last load cycle produced, for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Status {
    pub tier: Tier,
    pub version: String,
    pub message: String,
    /// Rows with a primary-index entry.
    pub accepted: usize,
    /// Distinct primary keys.
    pub keys: usize,
}

impl Status {
    fn initial() -> Self {
        Self {
            tier: Tier::NoDataset,
            version: Version::none().to_string(),
            message: "Loading dataset…".to_string(),
            accepted: 0,
            keys: 0,
        }
    }

    fn describe(outcome: &LoadOutcome, accepted: usize, keys: usize) -> Self {
        let rows = group_thousands(accepted);
        let message = match outcome.tier {
            Tier::NetworkFresh => format!("Loaded {} rows · {} keys", rows, group_thousands(keys)),
            Tier::DurableCache => format!("Loaded {} rows from device storage", rows),
            Tier::EmbeddedFallback => format!("Demo: {} sample rows loaded offline", rows),
            Tier::NoDataset => {
                "Could not load dataset (check it exists at the configured location).".to_string()
            }
        };
        Self {
            tier: outcome.tier,
            version: outcome.version.to_string(),
            message,
            accepted,
            keys,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}\n{}", self.tier, self.version, self.message)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    Last8,
    Unit,
    Plate,
}

/// Outcome of one lookup. Zero records is a normal answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LookupReport {
    pub kind: QueryKind,
    pub key: String,
    pub records: Vec<Record>,
}

impl LookupReport {
    fn new(kind: QueryKind, key: String, hits: Vec<Arc<Record>>) -> Self {
        Self {
            kind,
            key,
            records: hits.iter().map(|r| (**r).clone()).collect(),
        }
    }

    pub fn is_match(&self) -> bool {
        !self.records.is_empty()
    }
}

impl fmt::Display for LookupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.key.is_empty() {
            return Ok(());
        }
        if self.records.is_empty() {
            return write!(f, "Results for {}\nNo match, do not install.", self.key);
        }
        let n = self.records.len();
        write!(
            f,
            "{} match{} for {}",
            n,
            if n > 1 { "es" } else { "" },
            self.key
        )?;
        for r in &self.records {
            let unit = if r.unit.is_empty() { "(blank)" } else { &r.unit };
            write!(f, "\nVIN: {}\n  Unit: {}", r.vin, unit)?;
            if !r.ds.is_empty() {
                write!(f, "\n  DS: {}", r.ds)?;
            }
            if !r.dsp.is_empty() {
                write!(f, "\n  DSP: {}", r.dsp)?;
            }
            if let Some(plate) = &r.plate {
                write!(f, "\n  Plate: {}", plate)?;
            }
        }
        Ok(())
    }
}

/// Result of a recognize-and-lookup cycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub recognition: Recognition,
    /// `None` when recognition fell back to manual entry.
    pub lookup: Option<LookupReport>,
}

pub struct App {
    coordinator: Coordinator,
    lookup: LookupService,
    status: RwLock<Status>,
}

impl App {
    pub fn new(coordinator: Coordinator) -> Self {
        Self {
            coordinator,
            lookup: LookupService::new(),
            status: RwLock::new(Status::initial()),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let store = SnapshotStore::open(&config.storage_dir)?;
        let mut coordinator = Coordinator::new(store, config.build_version.clone());
        if config.network_enabled() {
            if let Some(url) = &config.dataset_url {
                let fetcher = HttpFetcher::new(
                    url,
                    &config.build_version,
                    config.timeout(),
                    &config.user_agent,
                )?;
                info!(url = %fetcher.url(), "network tier enabled");
                coordinator = coordinator.with_fetcher(Arc::new(fetcher));
            }
        } else {
            info!("network tier disabled");
        }
        Ok(Self::new(coordinator))
    }

    /// Run a load cycle (or join the running one) and swap in the result.
    #[instrument(level = "info", skip(self))]
    pub async fn refresh(&self) -> Status {
        let outcome = self.coordinator.load().await;
        let roles = resolve(&outcome.dataset.headers);
        let built = build(&outcome.dataset, &roles);
        let keys = built.indexes.key_count();
        self.lookup.replace(built.indexes);

        let status = Status::describe(&outcome, built.accepted, keys);
        info!(tier = %status.tier, version = %status.version, "{}", status.message);
        *self.status.write().unwrap_or_else(PoisonError::into_inner) = status.clone();
        status
    }

    pub fn status(&self) -> Status {
        self.status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Normalise `raw` in `mode` and query the primary index.
    pub fn lookup(&self, raw: &str, mode: Mode) -> LookupReport {
        let key = normalize(raw, mode);
        self.lookup_key(key)
    }

    fn lookup_key(&self, key: String) -> LookupReport {
        let hits = self.lookup.query_by_last8(&key);
        LookupReport::new(QueryKind::Last8, key, hits)
    }

    pub fn lookup_unit(&self, value: &str) -> LookupReport {
        let key = value.trim().to_uppercase();
        let hits = self.lookup.query_by_unit(&key);
        LookupReport::new(QueryKind::Unit, key, hits)
    }

    pub fn lookup_plate(&self, value: &str) -> LookupReport {
        let key = value.trim().to_uppercase();
        let hits = self.lookup.query_by_plate(&key);
        LookupReport::new(QueryKind::Plate, key, hits)
    }

    /// Recognize an identifier in `image` and look it up.
    pub async fn scan(&self, gate: &RecognitionGate, image: &[u8]) -> Result<ScanReport, RecognizeError> {
        let recognition = gate.run(image).await?;
        let lookup = recognition.key().map(|k| self.lookup_key(k.to_string()));
        Ok(ScanReport { recognition, lookup })
    }
}
