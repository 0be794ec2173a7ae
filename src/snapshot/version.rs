use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fmt;

/// Separator between the source label and the fetch timestamp in a tag.
const TAG_SEP: &str = " • ";

/// Label shown for the compiled-in sample set.
pub const DEMO_LABEL: &str = "Demo Data";
/// Label shown when nothing could be loaded.
pub const NO_DATASET_LABEL: &str = "No dataset";

/// Opaque tag for the snapshot that is currently indexed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Version {
    pub source: String,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl Version {
    pub fn fetched(build_version: &str, at: DateTime<Utc>) -> Self {
        Self {
            source: build_version.to_string(),
            fetched_at: Some(at),
        }
    }

    pub fn label(source: &str) -> Self {
        Self {
            source: source.to_string(),
            fetched_at: None,
        }
    }

    pub fn demo() -> Self {
        Self::label(DEMO_LABEL)
    }

    pub fn none() -> Self {
        Self::label(NO_DATASET_LABEL)
    }

    /// Parse a stored tag. A tag without a readable timestamp is kept
    /// whole as the source label.
    pub fn parse(tag: &str) -> Self {
        if let Some((source, ts)) = tag.rsplit_once(TAG_SEP) {
            if let Ok(at) = DateTime::parse_from_rfc3339(ts.trim()) {
                return Self::fetched(source, at.with_timezone(&Utc));
            }
        }
        Self::label(tag)
    }

    pub fn is_demo(&self) -> bool {
        self.fetched_at.is_none() && self.source == DEMO_LABEL
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.fetched_at {
            Some(at) => write!(
                f,
                "{}{}{}",
                self.source,
                TAG_SEP,
                at.to_rfc3339_opts(SecondsFormat::Millis, true)
            ),
            None => f.write_str(&self.source),
        }
    }
}
