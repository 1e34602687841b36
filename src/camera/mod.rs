//! Camera boundary and the nokhwa capture backend.
//!
//! The pipeline consumes cameras through the [`Camera`] trait: an
//! asynchronous open, a synchronous close, and a registered frame sink
//! that receives grayscale planes sequentially, one in-flight callback at
//! a time. [`NokhwaCamera`] implements it over the nokhwa crate with a
//! dedicated capture thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraIndex, ControlValueSetter, KnownCameraControl, RequestedFormat, RequestedFormatType,
    Resolution,
};
use nokhwa::Camera as CaptureDevice;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::geometry::{FrameMetrics, FrameOrientation, Rect};

/// Which camera to prefer when opening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Facing {
    #[default]
    Back,
    Front,
}

/// Lifecycle events a camera reports back to the session manager.
#[derive(Debug, Clone, PartialEq)]
pub enum CameraEvent {
    /// The camera is streaming and frame geometry is available.
    Ready,
    /// Open failed or the hardware failed mid-session.
    Error(String),
    /// The camera is shutting down; the sink should be detached.
    Stopping,
}

/// Receives the grayscale plane of each preview frame. Called from the
/// camera-callback context, strictly sequentially.
pub type FrameSink = Box<dyn FnMut(&[u8]) + Send>;

/// The camera subsystem as the session manager consumes it.
pub trait Camera {
    /// Request an open. Completion is asynchronous: a `Ready` or `Error`
    /// event follows. `warmup` delays the driver open, working around
    /// preview-start failures while the hosting view is still laying out.
    fn open(&mut self, facing: Facing, warmup: Duration);

    /// Close synchronously. Must unregister the frame sink before
    /// releasing the camera, must be idempotent, and must win against a
    /// pending open: no frame is delivered after `close` returns.
    fn close(&mut self);

    fn set_frame_sink(&mut self, sink: Option<FrameSink>);

    fn try_event(&mut self) -> Option<CameraEvent>;

    /// Frame geometry, available once the camera is ready.
    fn frame_metrics(&self) -> Option<FrameMetrics>;

    /// The full preview rectangle in view coordinates.
    fn preview_rect(&self) -> Option<Rect>;
}

/// Information about an available camera.
#[derive(Clone, Debug)]
pub struct CameraInfo {
    pub index: u32,
    pub name: String,
}

/// Real capture backend over nokhwa.
///
/// Frames are converted to a tightly-packed luma plane on the capture
/// thread and handed to the sink one at a time, so the sink never sees
/// concurrent frames.
pub struct NokhwaCamera {
    /// Pinned device index, if the caller chose one explicitly.
    pinned_index: Option<u32>,
    sink: Arc<Mutex<Option<FrameSink>>>,
    running: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
    metrics: Arc<Mutex<Option<FrameMetrics>>>,
    event_tx: Sender<CameraEvent>,
    event_rx: Receiver<CameraEvent>,
}

impl NokhwaCamera {
    pub fn new() -> Self {
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        Self {
            pinned_index: None,
            sink: Arc::new(Mutex::new(None)),
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
            metrics: Arc::new(Mutex::new(None)),
            event_tx,
            event_rx,
        }
    }

    /// Pin a specific device instead of resolving one from the facing
    /// preference.
    pub fn with_index(index: u32) -> Self {
        let mut camera = Self::new();
        camera.pinned_index = Some(index);
        camera
    }

    /// List available cameras.
    pub fn list_cameras() -> Vec<CameraInfo> {
        match nokhwa::query(nokhwa::utils::ApiBackend::Auto) {
            Ok(list) => list
                .iter()
                .enumerate()
                .map(|(index, info)| CameraInfo {
                    index: index as u32,
                    name: info.human_name().to_string(),
                })
                .collect(),
            Err(e) => {
                log::warn!("Failed to enumerate cameras: {:?}", e);
                Vec::new()
            }
        }
    }

    /// Pick a device index for a facing preference. Desktop drivers do
    /// not report facing, so this matches on the device name and falls
    /// back to the first camera.
    fn resolve_index(&self, facing: Facing) -> u32 {
        if let Some(index) = self.pinned_index {
            return index;
        }
        let needle = match facing {
            Facing::Back => "back",
            Facing::Front => "front",
        };
        Self::list_cameras()
            .iter()
            .find(|c| c.name.to_lowercase().contains(needle))
            .map(|c| c.index)
            .unwrap_or(0)
    }

    /// Capture thread: open the device, publish geometry, then pump
    /// frames into the sink until the run flag drops.
    fn capture_thread(
        index: u32,
        warmup: Duration,
        sink: Arc<Mutex<Option<FrameSink>>>,
        metrics: Arc<Mutex<Option<FrameMetrics>>>,
        running: Arc<AtomicBool>,
        event_tx: Sender<CameraEvent>,
    ) {
        log::info!("Starting camera capture thread (camera {})", index);

        if !warmup.is_zero() {
            std::thread::sleep(warmup);
        }
        if !running.load(Ordering::Acquire) {
            // Closed while warming up; never touch the driver.
            let _ = event_tx.send(CameraEvent::Stopping);
            return;
        }

        let mut device = match Self::open_device(index) {
            Ok(device) => device,
            Err(message) => {
                log::error!("{}", message);
                running.store(false, Ordering::Release);
                let _ = event_tx.send(CameraEvent::Error(message));
                return;
            }
        };

        if let Err(e) = device.open_stream() {
            let message = format!("Failed to open camera stream: {:?}", e);
            log::error!("{}", message);
            running.store(false, Ordering::Release);
            let _ = event_tx.send(CameraEvent::Error(message));
            return;
        }

        // Close-up symbols need continuous autofocus; a hint only, not
        // every driver exposes the control.
        if let Err(e) =
            device.set_camera_control(KnownCameraControl::Focus, ControlValueSetter::Boolean(true))
        {
            log::debug!("Autofocus not supported: {:?}", e);
        }

        let resolution = device.resolution();
        log::info!(
            "Camera opened: {} ({}x{})",
            device.info().human_name(),
            resolution.width(),
            resolution.height()
        );

        // Desktop sensors deliver frames unrotated; the preview rect
        // equals the frame rect.
        *metrics.lock() = Some(FrameMetrics::new(
            resolution.width() as i32,
            resolution.height() as i32,
            FrameOrientation::Deg0,
        ));

        if !running.load(Ordering::Acquire) {
            // close() raced the open; drop the device without going ready.
            let _ = event_tx.send(CameraEvent::Stopping);
            return;
        }
        let _ = event_tx.send(CameraEvent::Ready);

        while running.load(Ordering::Acquire) {
            match device.frame() {
                Ok(frame) => match frame.decode_image::<RgbFormat>() {
                    Ok(image) => {
                        let resolution = frame.resolution();
                        let luma = rgb_to_luma(
                            &image.into_raw(),
                            resolution.width() as usize,
                            resolution.height() as usize,
                        );
                        if let Some(sink) = sink.lock().as_mut() {
                            sink(&luma);
                        }
                    }
                    Err(e) => {
                        log::warn!("Failed to decode frame: {:?}", e);
                    }
                },
                Err(e) => {
                    log::warn!("Failed to capture frame: {:?}", e);
                    std::thread::sleep(Duration::from_millis(10));
                }
            }
        }

        let _ = event_tx.send(CameraEvent::Stopping);
        log::info!("Camera capture thread stopped");
    }

    /// Open the device, stepping down through format requests until one
    /// the hardware accepts.
    fn open_device(index: u32) -> Result<CaptureDevice, String> {
        let camera_index = CameraIndex::Index(index);

        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);
        match CaptureDevice::new(camera_index.clone(), requested) {
            Ok(device) => return Ok(device),
            Err(e) => log::warn!("Failed to open camera with highest resolution: {:?}", e),
        }

        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::HighestResolution(
            Resolution::new(640, 480),
        ));
        match CaptureDevice::new(camera_index.clone(), requested) {
            Ok(device) => return Ok(device),
            Err(e) => log::warn!("Failed with HighestResolution: {:?}", e),
        }

        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::None);
        CaptureDevice::new(camera_index, requested)
            .map_err(|e| format!("Failed to open camera with all format attempts: {:?}", e))
    }
}

impl Default for NokhwaCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera for NokhwaCamera {
    fn open(&mut self, facing: Facing, warmup: Duration) {
        if self.running.load(Ordering::Acquire) {
            return;
        }
        let index = self.resolve_index(facing);
        self.running.store(true, Ordering::Release);

        let sink = Arc::clone(&self.sink);
        let metrics = Arc::clone(&self.metrics);
        let running = Arc::clone(&self.running);
        let event_tx = self.event_tx.clone();

        match std::thread::Builder::new()
            .name("camera-capture".to_string())
            .spawn(move || {
                Self::capture_thread(index, warmup, sink, metrics, running, event_tx);
            }) {
            Ok(handle) => self.thread = Some(handle),
            Err(e) => {
                self.running.store(false, Ordering::Release);
                let _ = self
                    .event_tx
                    .send(CameraEvent::Error(format!("Failed to spawn capture thread: {}", e)));
            }
        }
    }

    fn close(&mut self) {
        // Unregister the sink first so no callback fires into a
        // torn-down session, then stop and release the device.
        *self.sink.lock() = None;
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
        *self.metrics.lock() = None;
    }

    fn set_frame_sink(&mut self, sink: Option<FrameSink>) {
        *self.sink.lock() = sink;
    }

    fn try_event(&mut self) -> Option<CameraEvent> {
        self.event_rx.try_recv().ok()
    }

    fn frame_metrics(&self) -> Option<FrameMetrics> {
        *self.metrics.lock()
    }

    fn preview_rect(&self) -> Option<Rect> {
        let metrics = *self.metrics.lock();
        metrics.map(|m| Rect::new(0, 0, m.width, m.height))
    }
}

impl Drop for NokhwaCamera {
    fn drop(&mut self) {
        self.close();
    }
}

/// Convert a tightly-packed RGB buffer to a luma plane using ITU-R BT.601
/// weights, integer math: (77R + 150G + 29B) >> 8.
fn rgb_to_luma(rgb: &[u8], width: usize, height: usize) -> Vec<u8> {
    let pixels = width * height;
    let mut luma = Vec::with_capacity(pixels);
    for chunk in rgb.chunks_exact(3).take(pixels) {
        let (r, g, b) = (chunk[0] as u32, chunk[1] as u32, chunk[2] as u32);
        luma.push(((77 * r + 150 * g + 29 * b) >> 8) as u8);
    }
    luma
}
