//! Camera session manager.
//!
//! [`ScanSession`] owns the camera lifecycle around the scan controller:
//! permission gating, the open/ready/close state machine, wiring the
//! frame sink when the camera reports ready, and the one-way handoff of
//! the accepted symbol from the camera-callback context to the caller's
//! context.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::camera::{Camera, CameraEvent, Facing};
use crate::engine::{DecodeEngine, DecodedSymbol};
use crate::error::ScanError;
use crate::feedback::Reporter;
use crate::geometry::{compute_frame_to_view, compute_roi, FrameToViewMatrix, Rect};
use crate::scan::ScanController;

/// Capture permission, consumed from the surrounding application.
pub trait PermissionGate {
    /// Whether camera capture is currently permitted. When
    /// `request_if_missing` is set and permission is absent, a request is
    /// issued to the platform; the grant arrives asynchronously and the
    /// caller re-opens the session then.
    fn has_camera_permission(&mut self, request_if_missing: bool) -> bool;
}

/// Permission gate for platforms that handle camera consent at the OS
/// level, outside the process.
pub struct AlwaysGranted;

impl PermissionGate for AlwaysGranted {
    fn has_camera_permission(&mut self, _request_if_missing: bool) -> bool {
        true
    }
}

/// Session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub facing: Facing,
    /// Delay between the open request and the driver open. Some devices
    /// fail to start the preview while the hosting view is still laying
    /// out; a view-ready signal can set this to zero instead.
    pub open_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            facing: Facing::Back,
            open_delay: Duration::from_millis(150),
        }
    }
}

/// Camera resource states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Closed,
    Opening,
    Ready,
    /// Open or mid-session failure; retryable by re-opening.
    Error,
}

/// Events the session surfaces to the caller's context.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The camera is streaming and decoding has started.
    Ready,
    /// Transient, user-visible notice. Never fatal.
    Notice(String),
    /// The camera stopped delivering frames.
    Stopped,
}

/// One continuous camera-open-to-result (or cancellation) lifetime.
pub struct ScanSession<C: Camera> {
    camera: C,
    controller: Arc<Mutex<ScanController>>,
    permissions: Box<dyn PermissionGate>,
    config: SessionConfig,
    phase: SessionPhase,
    /// Visible scan-window rectangle in view coordinates, as reported by
    /// the view layer. Degenerate until the layout pass runs.
    visible_rect: Rect,
    matrix: Option<FrameToViewMatrix>,
    accepted_tx: Sender<DecodedSymbol>,
    accepted_rx: Option<Receiver<DecodedSymbol>>,
}

impl<C: Camera> ScanSession<C> {
    pub fn new(
        camera: C,
        engine: Box<dyn DecodeEngine>,
        permissions: Box<dyn PermissionGate>,
        config: SessionConfig,
    ) -> Self {
        let (accepted_tx, accepted_rx) = crossbeam_channel::bounded(1);
        Self {
            camera,
            controller: Arc::new(Mutex::new(ScanController::new(engine))),
            permissions,
            config,
            phase: SessionPhase::Closed,
            visible_rect: Rect::default(),
            matrix: None,
            accepted_tx,
            accepted_rx: Some(accepted_rx),
        }
    }

    /// Take the receiving end of the result handoff. Yields at most one
    /// symbol per camera-open cycle; a session that closes without
    /// sending means cancellation, not an error.
    pub fn accepted(&mut self) -> Option<Receiver<DecodedSymbol>> {
        self.accepted_rx.take()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Frame-to-view transform for overlay drawing, available once ready.
    pub fn overlay_matrix(&self) -> Option<FrameToViewMatrix> {
        self.matrix
    }

    /// Update the visible scan window. Takes effect at the next
    /// camera-ready event; geometry is fixed while the camera is open.
    pub fn set_visible_rect(&mut self, rect: Rect) {
        self.visible_rect = rect;
    }

    /// Ignore further decodes of `text` for the rest of this session.
    pub fn suppress(&mut self, text: impl Into<String>) {
        self.controller.lock().suppress(text);
    }

    /// Request a camera open. Completion is asynchronous; poll
    /// [`Self::poll_events`] for `Ready`.
    pub fn open(&mut self) -> Result<(), ScanError> {
        if matches!(self.phase, SessionPhase::Opening | SessionPhase::Ready) {
            return Ok(());
        }
        if !self.permissions.has_camera_permission(true) {
            log::info!("camera permission missing, open deferred");
            return Err(ScanError::PermissionDenied);
        }
        log::info!("opening camera ({:?})", self.config.facing);
        self.phase = SessionPhase::Opening;
        self.camera.open(self.config.facing, self.config.open_delay);
        Ok(())
    }

    /// Drain camera events, drive the state machine, and report what the
    /// caller should surface. Runs on the caller's context.
    pub fn poll_events(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.camera.try_event() {
            match event {
                CameraEvent::Ready => {
                    if self.phase != SessionPhase::Opening {
                        // A close request beat the open completion; the
                        // camera must not come up.
                        log::info!("ignoring ready event for a closed session");
                        continue;
                    }
                    match self.wire_ready() {
                        Ok(()) => {
                            self.phase = SessionPhase::Ready;
                            events.push(SessionEvent::Ready);
                        }
                        Err(e) => {
                            self.phase = SessionPhase::Error;
                            events.push(SessionEvent::Notice(e.to_string()));
                        }
                    }
                }
                CameraEvent::Error(message) => {
                    log::warn!("camera error: {}", message);
                    self.camera.set_frame_sink(None);
                    self.phase = SessionPhase::Error;
                    events.push(SessionEvent::Notice(message));
                }
                CameraEvent::Stopping => {
                    self.camera.set_frame_sink(None);
                    events.push(SessionEvent::Stopped);
                }
            }
        }
        events
    }

    /// Camera came up: compute geometry once, re-arm the controller, and
    /// register the frame sink.
    fn wire_ready(&mut self) -> Result<(), ScanError> {
        let metrics = self.camera.frame_metrics().ok_or_else(|| {
            ScanError::CameraUnavailable("camera ready without frame geometry".to_string())
        })?;
        let preview = self
            .camera
            .preview_rect()
            .unwrap_or_else(|| metrics.frame_rect());

        let roi = compute_roi(&metrics, preview, self.visible_rect);
        self.matrix = Some(compute_frame_to_view(&metrics, preview));
        self.controller.lock().configure(metrics, roi);

        let controller = Arc::clone(&self.controller);
        let accepted_tx = self.accepted_tx.clone();
        self.camera.set_frame_sink(Some(Box::new(move |luma| {
            let symbol = controller.lock().on_frame(luma);
            if let Some(symbol) = symbol {
                // One-way handoff to the caller's context; the camera
                // thread never waits on delivery.
                let _ = accepted_tx.try_send(symbol);
            }
        })));

        log::info!(
            "camera ready: {}x{} @{}, roi {:?}",
            metrics.width,
            metrics.height,
            metrics.orientation.degrees(),
            roi
        );
        Ok(())
    }

    /// Close the camera. Unregisters the frame sink before releasing the
    /// resource, returns only once the camera is released, and is safe to
    /// call repeatedly or before a pending open completes.
    pub fn close(&mut self) {
        self.camera.set_frame_sink(None);
        self.camera.close();
        self.matrix = None;
        self.phase = SessionPhase::Closed;
    }

    /// Finalize an accepted result: feedback, result delivery, and
    /// session teardown.
    pub fn finish(&mut self, reporter: &mut Reporter, symbol: &DecodedSymbol) -> String {
        let text = reporter.on_accepted(symbol);
        self.close();
        text
    }
}
