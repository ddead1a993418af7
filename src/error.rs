use thiserror::Error;

/// Convenience result type for dataset operations.
pub type LabResult<T> = Result<T, LabError>;

/// Error type shared by the store, both producer pipelines, the command interpreter and
/// persistence.
///
/// Cancellation of a remote aggregation is not an error: it is reported as
/// [`crate::aggregation::AggregationOutcome::Cancelled`].
#[derive(Debug, Error)]
pub enum LabError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV input.
    #[error("csv parse error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encode/decode failure (snapshots, remote payloads).
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The input does not conform to the provided mapping (e.g. a mapped header is missing).
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// The CSV input has no discoverable header row.
    #[error("could not detect CSV headers")]
    HeaderDetection,

    /// Command text did not match any known command shape.
    #[error("couldn't understand command '{input}'. Try: {hint}")]
    CommandParse { input: String, hint: &'static str },

    /// A remote call failed.
    #[error("fetch failed{}: {message}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Fetch { status: Option<u16>, message: String },

    /// A store mutation referenced a row id that is not present.
    #[error("row {id} not found")]
    NotFound { id: i64 },

    /// A mutation attempted to overwrite a row's id.
    #[error("row id is immutable")]
    ImmutableId,
}

#[cfg(test)]
mod tests {
    use super::LabError;

    #[test]
    fn fetch_error_mentions_status_when_known() {
        let e = LabError::Fetch {
            status: Some(404),
            message: "List fetch failed".to_string(),
        };
        assert_eq!(e.to_string(), "fetch failed (status 404): List fetch failed");

        let e = LabError::Fetch {
            status: None,
            message: "connection reset".to_string(),
        };
        assert_eq!(e.to_string(), "fetch failed: connection reset");
    }
}
