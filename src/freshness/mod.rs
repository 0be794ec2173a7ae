// src/freshness/mod.rs
//! Chooses which dataset snapshot gets indexed: a fresh network copy, the
//! last durable copy, or the compiled-in sample.

pub mod embedded;

pub use embedded::EMBEDDED_CSV;

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
};
use tracing::{debug, info, instrument, warn};

use crate::{
    fetch::DatasetFetcher,
    process::{decode, Dataset},
    snapshot::{SnapshotStore, Version},
};

/// Where the indexed snapshot came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    NetworkFresh,
    DurableCache,
    EmbeddedFallback,
    NoDataset,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::NetworkFresh => "network-fresh",
            Tier::DurableCache => "durable-cache",
            Tier::EmbeddedFallback => "embedded-fallback",
            Tier::NoDataset => "no-dataset",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct LoadOutcome {
    pub dataset: Arc<Dataset>,
    pub version: Version,
    pub tier: Tier,
}

impl LoadOutcome {
    fn from_text(text: &str, version: Version, tier: Tier) -> Self {
        Self {
            dataset: Arc::new(decode(text)),
            version,
            tier,
        }
    }

    fn empty() -> Self {
        Self {
            dataset: Arc::new(Dataset::default()),
            version: Version::none(),
            tier: Tier::NoDataset,
        }
    }
}

type Flight = Shared<BoxFuture<'static, LoadOutcome>>;

struct Inner {
    fetcher: Option<Arc<dyn DatasetFetcher>>,
    store: SnapshotStore,
    build_version: String,
    embedded: Option<&'static str>,
}

/// Runs the tiered load. Concurrent `load` calls share one in-flight
/// cycle, so at most one network retrieval is outstanding.
pub struct Coordinator {
    inner: Arc<Inner>,
    inflight: Mutex<Option<Flight>>,
}

impl Coordinator {
    /// A coordinator with no network tier and the built-in sample enabled.
    pub fn new(store: SnapshotStore, build_version: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetcher: None,
                store,
                build_version: build_version.into(),
                embedded: Some(EMBEDDED_CSV),
            }),
            inflight: Mutex::new(None),
        }
    }

    pub fn with_fetcher(self, fetcher: Arc<dyn DatasetFetcher>) -> Self {
        self.map_inner(|inner| inner.fetcher = Some(fetcher))
    }

    pub fn with_embedded(self, embedded: Option<&'static str>) -> Self {
        self.map_inner(|inner| inner.embedded = embedded)
    }

    fn map_inner(self, f: impl FnOnce(&mut Inner)) -> Self {
        let mut inner = match Arc::try_unwrap(self.inner) {
            Ok(inner) => inner,
            Err(shared) => Inner {
                fetcher: shared.fetcher.clone(),
                store: shared.store.clone(),
                build_version: shared.build_version.clone(),
                embedded: shared.embedded,
            },
        };
        f(&mut inner);
        Self {
            inner: Arc::new(inner),
            inflight: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.inner.store
    }

    /// Run one load cycle, or join the one already running.
    pub async fn load(&self) -> LoadOutcome {
        let flight = {
            let mut slot = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(running) => {
                    debug!("joining in-flight load");
                    running.clone()
                }
                None => {
                    let started = run_tiers(Arc::clone(&self.inner)).boxed().shared();
                    *slot = Some(started.clone());
                    started
                }
            }
        };

        let outcome = flight.clone().await;

        let mut slot = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|running| running.ptr_eq(&flight)) {
            *slot = None;
        }
        outcome
    }
}

#[instrument(level = "info", skip_all, fields(build = %inner.build_version))]
async fn run_tiers(inner: Arc<Inner>) -> LoadOutcome {
    // 1) network-fresh
    match &inner.fetcher {
        Some(fetcher) => match fetcher.fetch().await {
            Ok(text) => {
                let version = Version::fetched(&inner.build_version, Utc::now());
                if let Err(e) = inner.store.persist(&text, &version) {
                    warn!(error = %format!("{e:#}"), "could not persist fresh dataset");
                }
                info!(bytes = text.len(), tier = %Tier::NetworkFresh, "dataset loaded");
                return LoadOutcome::from_text(&text, version, Tier::NetworkFresh);
            }
            Err(e) => {
                warn!(error = %format!("{e:#}"), "network retrieval failed; trying durable storage");
            }
        },
        None => debug!("network tier unavailable"),
    }

    // 2) durable-cache
    match inner.store.load() {
        Ok(Some(snap)) => {
            let version = snap
                .version
                .unwrap_or_else(|| Version::label(&inner.build_version));
            info!(bytes = snap.text.len(), tier = %Tier::DurableCache, "dataset loaded");
            return LoadOutcome::from_text(&snap.text, version, Tier::DurableCache);
        }
        Ok(None) => debug!("no durable snapshot"),
        Err(e) => warn!(error = %format!("{e:#}"), "durable snapshot unreadable"),
    }

    // 3) embedded fallback
    if let Some(text) = inner.embedded {
        info!(tier = %Tier::EmbeddedFallback, "dataset loaded");
        return LoadOutcome::from_text(text, Version::demo(), Tier::EmbeddedFallback);
    }

    // 4) nothing
    warn!("no dataset available");
    LoadOutcome::empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::build;
    use crate::process::columns::resolve;
    use anyhow::{anyhow, Result};
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };
    use tempfile::tempdir;

    struct StaticFetcher(&'static str);

    impl DatasetFetcher for StaticFetcher {
        fn fetch(&self) -> BoxFuture<'_, Result<String>> {
            let text = self.0.to_string();
            async move { Ok(text) }.boxed()
        }
    }

    struct FailingFetcher;

    impl DatasetFetcher for FailingFetcher {
        fn fetch(&self) -> BoxFuture<'_, Result<String>> {
            async { Err(anyhow!("offline")) }.boxed()
        }
    }

    struct SlowFetcher {
        calls: AtomicUsize,
    }

    impl DatasetFetcher for SlowFetcher {
        fn fetch(&self) -> BoxFuture<'_, Result<String>> {
            async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok("VIN,Unit\n1FDDF6P84MKA55412,503006\n".to_string())
            }
            .boxed()
        }
    }

    const FRESH: &str = "VIN,Unit,DS,DSP\nJHHRDM2H1LK008183,700030,D1,X\n";

    #[tokio::test]
    async fn network_success_persists_and_wins() -> Result<()> {
        let tmp = tempdir()?;
        let store = SnapshotStore::open(tmp.path())?;
        let c = Coordinator::new(store.clone(), "v13").with_fetcher(Arc::new(StaticFetcher(FRESH)));

        let out = c.load().await;
        assert_eq!(out.tier, Tier::NetworkFresh);
        assert_eq!(out.version.source, "v13");
        assert!(out.version.fetched_at.is_some());
        assert_eq!(out.dataset.len(), 1);

        let snap = store.load()?.expect("persisted");
        assert_eq!(snap.text, FRESH);
        assert_eq!(snap.version.expect("version").source, "v13");
        Ok(())
    }

    #[tokio::test]
    async fn network_success_overwrites_valid_snapshot() -> Result<()> {
        let tmp = tempdir()?;
        let store = SnapshotStore::open(tmp.path())?;
        store.persist("VIN,Unit\nOLDOLDOLD12345678,1\n", &Version::fetched("v12", Utc::now()))?;

        let c = Coordinator::new(store.clone(), "v13").with_fetcher(Arc::new(StaticFetcher(FRESH)));
        assert_eq!(c.load().await.tier, Tier::NetworkFresh);
        assert_eq!(store.load()?.expect("persisted").text, FRESH);
        Ok(())
    }

    #[tokio::test]
    async fn network_failure_falls_back_to_unchanged_snapshot() -> Result<()> {
        let tmp = tempdir()?;
        let store = SnapshotStore::open(tmp.path())?;

        let online = Coordinator::new(store.clone(), "v13").with_fetcher(Arc::new(StaticFetcher(FRESH)));
        let first = online.load().await;

        let offline = Coordinator::new(store.clone(), "v13").with_fetcher(Arc::new(FailingFetcher));
        let out = offline.load().await;
        assert_eq!(out.tier, Tier::DurableCache);
        assert_eq!(*out.dataset, *first.dataset);
        assert_eq!(out.version.source, "v13");
        assert_eq!(store.load()?.expect("snapshot").text, FRESH);
        Ok(())
    }

    #[tokio::test]
    async fn offline_mode_skips_network() -> Result<()> {
        let tmp = tempdir()?;
        let store = SnapshotStore::open(tmp.path())?;
        store.persist(FRESH, &Version::label("v11"))?;

        let out = Coordinator::new(store, "v13").load().await;
        assert_eq!(out.tier, Tier::DurableCache);
        assert_eq!(out.version, Version::label("v11"));
        Ok(())
    }

    #[tokio::test]
    async fn snapshot_without_version_uses_build_version() -> Result<()> {
        let tmp = tempdir()?;
        let store = SnapshotStore::open(tmp.path())?;
        store.set(crate::snapshot::DATASET_KEY, FRESH)?;

        let out = Coordinator::new(store, "v13").load().await;
        assert_eq!(out.tier, Tier::DurableCache);
        assert_eq!(out.version, Version::label("v13"));
        Ok(())
    }

    #[tokio::test]
    async fn embedded_fallback_has_nine_demo_records() -> Result<()> {
        let tmp = tempdir()?;
        let c = Coordinator::new(SnapshotStore::open(tmp.path())?, "v13")
            .with_fetcher(Arc::new(FailingFetcher));

        let out = c.load().await;
        assert_eq!(out.tier, Tier::EmbeddedFallback);
        assert!(out.version.is_demo());
        assert_eq!(out.dataset.len(), embedded::EMBEDDED_ROWS);

        let built = build(&out.dataset, &resolve(&out.dataset.headers));
        assert_eq!(built.accepted, 9);
        assert_eq!(built.indexes.by_last8["MKA55412"][0].unit, "503006");
        // fallback never writes to durable storage
        assert_eq!(c.store().load()?, None);
        Ok(())
    }

    #[tokio::test]
    async fn nothing_available_reports_no_dataset() -> Result<()> {
        let tmp = tempdir()?;
        let c = Coordinator::new(SnapshotStore::open(tmp.path())?, "v13")
            .with_fetcher(Arc::new(FailingFetcher))
            .with_embedded(None);

        let out = c.load().await;
        assert_eq!(out.tier, Tier::NoDataset);
        assert_eq!(out.version.to_string(), "No dataset");
        assert!(out.dataset.is_empty());
        assert!(out.dataset.headers.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_loads_share_one_fetch() -> Result<()> {
        let tmp = tempdir()?;
        let fetcher = Arc::new(SlowFetcher {
            calls: AtomicUsize::new(0),
        });
        let c = Coordinator::new(SnapshotStore::open(tmp.path())?, "v13")
            .with_fetcher(fetcher.clone());

        let (a, b, d) = tokio::join!(c.load(), c.load(), c.load());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        for out in [&a, &b, &d] {
            assert_eq!(out.tier, Tier::NetworkFresh);
        }
        assert!(Arc::ptr_eq(&a.dataset, &b.dataset));

        // once finished, the next trigger starts a new cycle
        c.load().await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        Ok(())
    }
}
