// src/normalize.rs
//! Turns raw input (typed text, OCR output, barcode payloads) into a
//! lookup key for the primary index.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::index::KEY_LEN;
use crate::process::utils::{clean_vin, trailing};

/// VIN alphabet: digits and letters minus I, O and Q.
static VIN_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-HJ-NPR-Z0-9]+").unwrap());
static VIN17_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-HJ-NPR-Z0-9]{17}").unwrap());

/// Length of a full VIN.
pub const VIN_LEN: usize = 17;
/// Shortest run accepted from recognized text.
pub const MIN_RUN_LEN: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// User-typed text.
    Direct,
    /// Output of a character-recognition engine.
    RecognizedText,
}

/// Canonical lookup key for `raw`. Deterministic per `(raw, mode)`.
///
/// The key may be shorter than 8 characters (or empty) when the input has
/// no long enough run; it is still a literal key for the lookup service.
pub fn normalize(raw: &str, mode: Mode) -> String {
    match mode {
        Mode::Direct => direct_key(raw),
        Mode::RecognizedText => recognized_key(raw),
    }
}

fn direct_key(raw: &str) -> String {
    let mut key = clean_vin(raw);
    key.truncate(KEY_LEN);
    key
}

fn recognized_key(raw: &str) -> String {
    let compact: String = raw
        .to_uppercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let runs: Vec<&str> = VIN_RUN_RE.find_iter(&compact).map(|m| m.as_str()).collect();

    if let Some(full) = runs.iter().find(|r| r.len() == VIN_LEN) {
        return trailing(full, KEY_LEN).to_string();
    }

    // Longest run of at least MIN_RUN_LEN; the earliest wins a tie.
    let mut best: Option<&str> = None;
    for &run in runs.iter().filter(|r| r.len() >= MIN_RUN_LEN) {
        if best.map_or(true, |b| run.len() > b.len()) {
            best = Some(run);
        }
    }
    best.map(|run| trailing(run, KEY_LEN).to_string())
        .unwrap_or_default()
}

/// Key from a barcode payload: trailing 8 of the first 17-character VIN
/// match, else trailing 8 of the cleaned payload.
pub fn barcode_key(raw: &str) -> String {
    let upper = raw.to_uppercase();
    match VIN17_RE.find(&upper) {
        Some(m) => trailing(m.as_str(), KEY_LEN).to_string(),
        None => trailing(&clean_vin(&upper), KEY_LEN).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_mode_cleans_and_truncates() {
        assert_eq!(normalize("mka-55412", Mode::Direct), "MKA55412");
        assert_eq!(normalize("1FDDF6P84MKA55412", Mode::Direct), "1FDDF6P8");
        assert_eq!(normalize("  a5 54 ", Mode::Direct), "A554");
        assert_eq!(normalize("", Mode::Direct), "");
        assert_eq!(normalize("--//", Mode::Direct), "");
    }

    #[test]
    fn direct_mode_is_idempotent() {
        let samples = [
            "",
            "mka55412",
            "1FDDF6P84MKA55412",
            "  x y z 1 2 3 4 5 6 7 ",
            "ÅÄÖ-ſ-ß-123",
            "\u{1F697} car 42",
            "ioq IOQ 000",
        ];
        for s in samples {
            let once = normalize(s, Mode::Direct);
            assert_eq!(normalize(&once, Mode::Direct), once, "input {s:?}");
        }
    }

    #[test]
    fn recognized_clean_vin_yields_trailing_eight() {
        assert_eq!(
            normalize("1FDDF6P84MKA55412", Mode::RecognizedText),
            "MKA55412"
        );
    }

    #[test]
    fn recognized_ignores_whitespace_and_case() {
        assert_eq!(
            normalize(" 1fdd f6p8\n4mka 55412 ", Mode::RecognizedText),
            "MKA55412"
        );
    }

    #[test]
    fn recognized_prefers_exact_seventeen_run() {
        // a longer 20-char run exists, but the 17-char run wins
        let text = "ABCDEFGH1234567890XY:JHHRDM2H1LK008183";
        assert_eq!(normalize(text, Mode::RecognizedText), "LK008183");
    }

    #[test]
    fn recognized_falls_back_to_longest_run() {
        // ambiguous letters split the text into runs
        assert_eq!(
            normalize("VIN:1FDDF6P8O4MKA55412", Mode::RecognizedText),
            "MKA55412"
        );
        assert_eq!(normalize("ABC:12345678901", Mode::RecognizedText), "45678901");
        assert_eq!(normalize("XX|A55412|YY", Mode::RecognizedText), "A55412");
    }

    #[test]
    fn recognized_tie_goes_to_first_run() {
        assert_eq!(normalize("AAAAAA-BBBBBB", Mode::RecognizedText), "AAAAAA");
    }

    #[test]
    fn recognized_without_usable_run_is_empty() {
        assert_eq!(normalize("", Mode::RecognizedText), "");
        assert_eq!(normalize("AB-12-CD", Mode::RecognizedText), "");
        assert_eq!(normalize("OOOOOOOOOO", Mode::RecognizedText), "");
    }

    #[test]
    fn recognized_is_deterministic() {
        let raw = "noise 1FDDF6P84MKA55412 more | noise";
        assert_eq!(
            normalize(raw, Mode::RecognizedText),
            normalize(raw, Mode::RecognizedText)
        );
    }

    #[test]
    fn barcode_key_uses_embedded_vin() {
        assert_eq!(barcode_key("I1FDDF6P84MKA55412"), "MKA55412");
        assert_eq!(barcode_key("jhhrdm2h1lk008183"), "LK008183");
        assert_eq!(barcode_key("unit-12"), "UNIT12");
        assert_eq!(barcode_key("x JALE5W160N7303550 y"), "N7303550");
    }
}
