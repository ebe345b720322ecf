//! Row and value types passed between readers and writers.

use chrono::{DateTime, Local};

/// One source row, every column decoded as a nullable string.
pub type SourceRow = Vec<Option<String>>;

/// A value bound to a target insert parameter.
///
/// Writers coerce each variant to the column type the target reports for
/// the parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetValue {
    Text(String),
    Integer(i64),
    Timestamp(DateTime<Local>),
}

impl TargetValue {
    /// Map a nullable source value to text. NULL becomes the empty string.
    pub fn text_or_empty(value: Option<String>) -> Self {
        TargetValue::Text(value.unwrap_or_default())
    }

    /// Returns the text if this is a `Text` value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TargetValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for TargetValue {
    fn from(s: &str) -> Self {
        TargetValue::Text(s.to_string())
    }
}
