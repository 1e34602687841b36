//! Error types for the scanning pipeline.

use thiserror::Error;

/// Errors that can surface from the scanning core.
///
/// A missed decode on a single frame is not an error (the next frame is the
/// retry), and a degenerate scan window recovers locally by falling back to
/// the full preview. Nothing here is fatal to the process.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The camera could not be opened or failed mid-session. Transient;
    /// the session may be retried.
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),
    /// Capture permission is not granted. The surrounding application is
    /// responsible for prompting and re-opening on grant.
    #[error("camera permission not granted")]
    PermissionDenied,
    /// A raw enum value crossing the engine boundary has no mapping on
    /// this side. Never silently defaulted.
    #[error("no {kind} mapping for raw value {value}")]
    UnknownRawValue { kind: &'static str, value: i32 },
}
