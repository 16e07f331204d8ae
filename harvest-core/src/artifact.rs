//! Artifact reference extraction
//!
//! Agents report result files as URLs buried somewhere in their
//! output: a plain log blob, an array of URL strings, an array of
//! objects with a `url` field, or a single value of either kind.
//! Extraction tries the structural interpretations first and only
//! falls back to scanning the text rendering for URL-shaped
//! substrings. It never fails; a reference that cannot be found is
//! simply absent, and the caller decides which kinds are mandatory.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::output::OutputShape;

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s"'<>\\]+"#).expect("static URL pattern compiles")
});

/// Kind of result file an artifact URL points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Json,
    Csv,
    Unknown,
}

impl ArtifactKind {
    /// Classify a URL by the extension of its path component
    /// (query string and fragment ignored).
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        if path.ends_with(".json") {
            ArtifactKind::Json
        } else if path.ends_with(".csv") {
            ArtifactKind::Csv
        } else {
            ArtifactKind::Unknown
        }
    }
}

/// A result-file URL discovered in agent output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactReference {
    pub url: String,
    pub kind: ArtifactKind,
}

impl ArtifactReference {
    fn new(url: String, kind: ArtifactKind) -> Self {
        Self { url, kind }
    }
}

/// References discovered in one output, at most one per kind.
///
/// Absent entries are not errors at this level; whether a missing
/// JSON reference fails the run is the orchestrator's call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedReferences {
    pub json: Option<ArtifactReference>,
    pub csv: Option<ArtifactReference>,
}

impl ExtractedReferences {
    pub fn is_empty(&self) -> bool {
        self.json.is_none() && self.csv.is_none()
    }
}

/// Extract artifact references from the polymorphic `output` value.
///
/// Interpretation order: array of strings, array of objects with a
/// `url` field, bare string (taken whole when it is itself a URL,
/// otherwise scanned), bare object with a `url` field. When the
/// structural pass finds nothing, the JSON rendering of the whole
/// value is scanned as a last resort. The first URL of each kind in
/// scan order wins; later ones are ignored.
pub fn extract_references(output: &Value) -> ExtractedReferences {
    let candidates: Vec<String> = match OutputShape::classify(output) {
        OutputShape::ArrayOfStrings(urls) => urls,
        OutputShape::ArrayOfObjects(objects) => objects
            .iter()
            .filter_map(|obj| obj.get("url").and_then(Value::as_str))
            .map(str::to_owned)
            .collect(),
        OutputShape::Text(text) => {
            let trimmed = text.trim();
            if is_bare_url(trimmed) {
                vec![trimmed.to_owned()]
            } else {
                scan_urls(&text)
            }
        }
        OutputShape::Object(map) => map
            .get("url")
            .and_then(Value::as_str)
            .map(|url| vec![url.to_owned()])
            .unwrap_or_default(),
        OutputShape::Other => Vec::new(),
    };

    let refs = select_first_per_kind(candidates);
    if !refs.is_empty() {
        return refs;
    }

    // Structural pass came up empty; scan the rendered value so URLs
    // nested in unexpected fields are still found.
    select_first_per_kind(scan_urls(&output.to_string()))
}

/// Whole-string URL test for the bare-string interpretation.
fn is_bare_url(text: &str) -> bool {
    (text.starts_with("http://") || text.starts_with("https://"))
        && !text.contains(char::is_whitespace)
}

/// Scan free-form text for URL-shaped substrings, in order of
/// occurrence. Matches need not start at a line boundary; trailing
/// sentence punctuation is stripped.
fn scan_urls(text: &str) -> Vec<String> {
    URL_RE
        .find_iter(text)
        .map(|m| {
            m.as_str()
                .trim_end_matches(['.', ',', ';', ':', '!', ')', ']', '}'])
                .to_owned()
        })
        .collect()
}

/// First URL of each kind wins; `Unknown` URLs are skipped.
fn select_first_per_kind(urls: Vec<String>) -> ExtractedReferences {
    let mut refs = ExtractedReferences::default();
    for url in urls {
        match ArtifactKind::from_url(&url) {
            ArtifactKind::Json if refs.json.is_none() => {
                refs.json = Some(ArtifactReference::new(url, ArtifactKind::Json));
            }
            ArtifactKind::Csv if refs.csv.is_none() => {
                refs.csv = Some(ArtifactReference::new(url, ArtifactKind::Csv));
            }
            _ => {}
        }
    }
    refs
}
