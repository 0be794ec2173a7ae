// src/recognize/mod.rs
//! "Recognize identifier from image": two interchangeable implementations
//! (barcode detection and character recognition) behind one type, picked
//! from what the device offers.

use futures::future::BoxFuture;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::index::KEY_LEN;
use crate::normalize::{barcode_key, normalize, Mode, MIN_RUN_LEN};

/// What a character-recognition engine hands back.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OcrOutput {
    pub text: String,
    pub confidence: Option<f32>,
}

/// Character recognition over an encoded image. Not safe to call
/// concurrently on one engine instance; see [`RecognitionGate`].
pub trait OcrEngine: Send + Sync {
    fn recognize<'a>(&'a self, image: &'a [u8]) -> BoxFuture<'a, anyhow::Result<OcrOutput>>;
}

/// Barcode detection over an encoded image; returns raw payloads.
pub trait BarcodeDetector: Send + Sync {
    fn detect<'a>(&'a self, image: &'a [u8]) -> BoxFuture<'a, anyhow::Result<Vec<String>>>;
}

#[derive(Debug, Error)]
pub enum RecognizeError {
    /// A recognition cycle is already running.
    #[error("recognition already in progress")]
    Busy,

    #[error("recognition engine failed: {0:#}")]
    Engine(#[from] anyhow::Error),
}

/// Recognition engines available on this device.
#[derive(Clone, Default)]
pub struct Capabilities {
    pub barcode: Option<Arc<dyn BarcodeDetector>>,
    pub ocr: Option<Arc<dyn OcrEngine>>,
}

#[derive(Clone)]
pub enum Recognizer {
    Barcode(Arc<dyn BarcodeDetector>),
    Text(Arc<dyn OcrEngine>),
}

impl Recognizer {
    /// Barcode detection when present, else character recognition.
    pub fn select(caps: &Capabilities) -> Option<Self> {
        if let Some(detector) = &caps.barcode {
            return Some(Recognizer::Barcode(Arc::clone(detector)));
        }
        caps.ocr.as_ref().map(|ocr| Recognizer::Text(Arc::clone(ocr)))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Recognizer::Barcode(_) => "barcode",
            Recognizer::Text(_) => "ocr",
        }
    }

    #[instrument(level = "debug", skip_all, fields(kind = self.kind(), bytes = image.len()))]
    pub async fn identify(&self, image: &[u8]) -> Result<Recognition, RecognizeError> {
        let (raw, key) = match self {
            Recognizer::Barcode(detector) => {
                let codes = detector.detect(image).await?;
                match codes.into_iter().next() {
                    Some(raw) => {
                        let key = barcode_key(&raw);
                        (raw, key)
                    }
                    None => (String::new(), String::new()),
                }
            }
            Recognizer::Text(ocr) => {
                let out = ocr.recognize(image).await?;
                debug!(confidence = ?out.confidence, "ocr finished");
                let key = normalize(&out.text, Mode::RecognizedText);
                (out.text, key)
            }
        };
        Ok(Recognition::new(raw, key))
    }
}

/// Result of one recognition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Recognition {
    /// A usable key was extracted.
    Key { raw: String, key: String },
    /// Nothing usable was read; the caller should offer manual entry.
    ManualEntry { raw: String },
}

impl Recognition {
    fn new(raw: String, key: String) -> Self {
        if key.len() < MIN_RUN_LEN {
            Recognition::ManualEntry { raw }
        } else {
            Recognition::Key { raw, key }
        }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            Recognition::Key { key, .. } => Some(key),
            Recognition::ManualEntry { .. } => None,
        }
    }

    /// True for keys that are shorter than a full last-8 key.
    pub fn is_partial(&self) -> bool {
        self.key().is_some_and(|k| k.len() < KEY_LEN)
    }
}

/// Serializes recognition: while one cycle runs, further triggers are
/// rejected with [`RecognizeError::Busy`] instead of queueing.
pub struct RecognitionGate {
    recognizer: Recognizer,
    busy: Mutex<()>,
}

impl RecognitionGate {
    pub fn new(recognizer: Recognizer) -> Self {
        Self {
            recognizer,
            busy: Mutex::new(()),
        }
    }

    pub fn recognizer(&self) -> &Recognizer {
        &self.recognizer
    }

    /// Whether a cycle is currently running (the trigger is disabled).
    pub fn is_busy(&self) -> bool {
        self.busy.try_lock().is_err()
    }

    pub async fn run(&self, image: &[u8]) -> Result<Recognition, RecognizeError> {
        let _cycle = self.busy.try_lock().map_err(|_| {
            warn!("recognition trigger ignored while busy");
            RecognizeError::Busy
        })?;
        let recognition = self.recognizer.identify(image).await?;
        info!(kind = self.recognizer.kind(), key = ?recognition.key(), "recognition finished");
        Ok(recognition)
    }
}
