//! Raw agent output and poll-attempt results
//!
//! The fetch-output endpoint returns a JSON document whose `output`
//! field is polymorphic: the platform may report a log string, an
//! array of URL strings, an array of objects, or a single object.
//! The full response is kept verbatim so it can be persisted exactly
//! as received.

use serde_json::{Map, Value};

/// Full fetch-output response, kept verbatim for persistence.
pub type RawOutput = Value;

/// Result of a single poll attempt against the fetch-output endpoint.
#[derive(Debug)]
pub enum PollResult {
    /// Output not yet available; the attempt is consumed.
    Pending,
    /// Output is available; carries the full response verbatim.
    Ready(RawOutput),
    /// The fetch itself failed (network/parse); the attempt is
    /// consumed and polling continues.
    TransientError(String),
}

/// Structural classification of the polymorphic `output` field.
///
/// Classified once, then matched; extraction never probes the value
/// ad hoc.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputShape {
    /// `["https://…", …]`
    ArrayOfStrings(Vec<String>),
    /// `[{"url": "https://…", …}, …]`
    ArrayOfObjects(Vec<Map<String, Value>>),
    /// A bare string: a single URL or a free-form log blob.
    Text(String),
    /// A single object, possibly carrying a `url` field.
    Object(Map<String, Value>),
    /// Null, numbers, mixed arrays, anything else.
    Other,
}

impl OutputShape {
    /// Classify an `output` value into its structural shape.
    ///
    /// An array is `ArrayOfStrings` only when every element is a
    /// string, and `ArrayOfObjects` only when every element is an
    /// object; mixed arrays fall through to `Other` and are handled
    /// by the text-scan fallback.
    pub fn classify(output: &Value) -> Self {
        match output {
            Value::Array(items) => {
                if items.iter().all(Value::is_string) {
                    OutputShape::ArrayOfStrings(
                        items
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_owned)
                            .collect(),
                    )
                } else if items.iter().all(Value::is_object) {
                    OutputShape::ArrayOfObjects(
                        items
                            .iter()
                            .filter_map(Value::as_object)
                            .cloned()
                            .collect(),
                    )
                } else {
                    OutputShape::Other
                }
            }
            Value::String(s) => OutputShape::Text(s.clone()),
            Value::Object(map) => OutputShape::Object(map.clone()),
            _ => OutputShape::Other,
        }
    }
}

/// Readiness predicate over a full fetch-output response.
///
/// The `output` field must be present and non-null; when it is an
/// array it must also be non-empty. An empty string or empty object
/// still counts as ready, matching the platform's behavior for
/// agents that produce no log lines.
pub fn output_ready(raw: &RawOutput) -> bool {
    match raw.get("output") {
        None | Some(Value::Null) => false,
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}
