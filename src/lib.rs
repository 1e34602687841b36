//! Live-camera QR scanning pipeline.
//!
//! Frames arrive from a capture backend as grayscale planes, get decoded
//! inside a view-derived region of interest, and the first accepted symbol
//! is handed back to the caller exactly once. The crate is split along the
//! pipeline stages:
//!
//! - [`geometry`]: region-of-interest computation and the frame-to-view
//!   mapping used to draw overlays.
//! - [`engine`]: the decode-engine abstraction and its option/result types,
//!   with an `rqrr`-backed implementation.
//! - [`scan`]: the per-frame strategy controller (binarizer alternation,
//!   duplicate suppression, single-shot acceptance).
//! - [`camera`]: capture backends and their lifecycle events.
//! - [`session`]: the state machine tying permissions, camera, controller
//!   and overlay geometry together.
//! - [`feedback`]: result delivery plus haptic/audible confirmation.

pub mod camera;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod geometry;
pub mod scan;
pub mod session;

pub use camera::{Camera, CameraEvent, CameraInfo, Facing, FrameSink, NokhwaCamera};
pub use engine::rqrr::RqrrEngine;
pub use engine::{
    BarcodeFormat, Binarizer, DecodeEngine, DecodeOptions, DecodedSymbol, Point, Position,
};
pub use error::ScanError;
pub use feedback::{FeedbackDevice, Reporter, RingerMode};
pub use geometry::{
    compute_frame_to_view, compute_roi, FrameMetrics, FrameOrientation, FrameToViewMatrix, Rect,
};
pub use scan::{ScanController, SessionState};
pub use session::{
    AlwaysGranted, PermissionGate, ScanSession, SessionConfig, SessionEvent, SessionPhase,
};
