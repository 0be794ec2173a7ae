// src/fetch/mod.rs
use anyhow::{Context, Result};
use futures::future::{BoxFuture, FutureExt};
use reqwest::{
    header::{CACHE_CONTROL, PRAGMA},
    Client,
};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Query parameter carrying the build version.
pub const CACHE_BUST_PARAM: &str = "v";

/// Network retrieval of the raw dataset text.
pub trait DatasetFetcher: Send + Sync {
    fn fetch(&self) -> BoxFuture<'_, Result<String>>;
}

/// `base` with `v=<build_version>` set, replacing any existing `v`.
pub fn cache_busted_url(base: &Url, build_version: &str) -> Url {
    let kept: Vec<(String, String)> = base
        .query_pairs()
        .filter(|(k, _)| k != CACHE_BUST_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut url = base.clone();
    url.set_query(None);
    {
        let mut pairs = url.query_pairs_mut();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
        pairs.append_pair(CACHE_BUST_PARAM, build_version);
    }
    url
}

/// Fetches the dataset over HTTP(S) with intermediary caching disabled.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: Client,
    url: Url,
}

impl HttpFetcher {
    pub fn new(
        dataset_url: &str,
        build_version: &str,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self> {
        let base =
            Url::parse(dataset_url).with_context(|| format!("parsing dataset URL {}", dataset_url))?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            url: cache_busted_url(&base, build_version),
        })
    }

    /// The URL actually requested, cache-busting parameter included.
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[instrument(level = "info", skip(self), fields(url = %self.url))]
    async fn get_text(&self) -> Result<String> {
        let text = self
            .client
            .get(self.url.clone())
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .send()
            .await
            .with_context(|| format!("GET {} failed", self.url))?
            .error_for_status()
            .with_context(|| format!("Non-success status {}", self.url))?
            .text()
            .await
            .with_context(|| format!("Reading text from {}", self.url))?;
        debug!(bytes = text.len(), "dataset body received");
        Ok(text)
    }
}

impl DatasetFetcher for HttpFetcher {
    fn fetch(&self) -> BoxFuture<'_, Result<String>> {
        self.get_text().boxed()
    }
}
