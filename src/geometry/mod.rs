//! Frame geometry: metrics, rectangles, ROI mapping and the
//! frame-to-view transform.
//!
//! All of this is computed once per camera-ready event. Frame geometry and
//! the visible scan window cannot change while the camera is open, so
//! nothing in here runs on the per-frame hot path.

use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// Sensor rotation of delivered frames relative to the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FrameOrientation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl FrameOrientation {
    /// Map a driver-reported rotation to the enum. Anything outside the
    /// four right angles is rejected rather than defaulted.
    pub fn from_degrees(degrees: i32) -> Result<Self, ScanError> {
        match degrees {
            0 => Ok(Self::Deg0),
            90 => Ok(Self::Deg90),
            180 => Ok(Self::Deg180),
            270 => Ok(Self::Deg270),
            value => Err(ScanError::UnknownRawValue {
                kind: "orientation",
                value,
            }),
        }
    }

    pub fn degrees(self) -> i32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Whether the frame's width axis runs along the view's vertical axis.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

/// Axis-aligned rectangle, used for both view space and frame pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.top + self.height
    }

    /// A rectangle the layout pass has not filled in yet.
    pub fn is_degenerate(&self) -> bool {
        self.width < 1 || self.height < 1
    }
}

/// Immutable snapshot of a camera session's frame geometry.
///
/// Built once per successful camera open and discarded on close; never
/// shared across sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameMetrics {
    /// Frame width in pixels, also the row stride of the luma plane.
    pub width: i32,
    /// Frame height in pixels.
    pub height: i32,
    /// Sensor rotation of delivered frames.
    pub orientation: FrameOrientation,
}

impl FrameMetrics {
    pub fn new(width: i32, height: i32, orientation: FrameOrientation) -> Self {
        Self {
            width,
            height,
            orientation,
        }
    }

    /// The full frame as a rectangle in frame pixel space.
    pub fn frame_rect(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }
}

/// Compute the decode region-of-interest in frame pixel space.
///
/// `preview` is the full camera preview rectangle in view coordinates and
/// `visible` the caller-visible scan window in the same coordinates. A
/// degenerate `visible` means the window has not been laid out yet; the
/// whole frame is searched in that case.
pub fn compute_roi(metrics: &FrameMetrics, preview: Rect, visible: Rect) -> Rect {
    if visible.is_degenerate() || preview.is_degenerate() {
        return metrics.frame_rect();
    }

    let rx = (visible.left - preview.left) as f64 / preview.width as f64;
    let ry = (visible.top - preview.top) as f64 / preview.height as f64;
    let rw = visible.width as f64 / preview.width as f64;
    let rh = visible.height as f64 / preview.height as f64;

    // When the sensor is rotated a quarter turn, the view's horizontal
    // axis runs along the frame's height.
    let (rx, ry, rw, rh) = if metrics.orientation.swaps_axes() {
        (ry, rx, rh, rw)
    } else {
        (rx, ry, rw, rh)
    };

    let left = ((rx * metrics.width as f64).round() as i32).clamp(0, metrics.width);
    let top = ((ry * metrics.height as f64).round() as i32).clamp(0, metrics.height);
    let width = ((rw * metrics.width as f64).round() as i32).clamp(0, metrics.width - left);
    let height = ((rh * metrics.height as f64).round() as i32).clamp(0, metrics.height - top);

    Rect::new(left, top, width, height)
}

/// Affine transform mapping frame-space points to view-space points, for
/// drawing overlays over decoded symbol positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameToViewMatrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    tx: f32,
    ty: f32,
}

impl FrameToViewMatrix {
    pub fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            tx: 0.0,
            ty: 0.0,
        }
    }

    pub fn map_point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.b * y + self.tx,
            self.c * x + self.d * y + self.ty,
        )
    }
}

/// Compute the frame-to-view transform inverting the ROI mapping.
///
/// The transform depends only on the preview rectangle and the frame
/// geometry; cropping to a scan window does not change where a frame-space
/// point lands in the view.
pub fn compute_frame_to_view(metrics: &FrameMetrics, preview: Rect) -> FrameToViewMatrix {
    if preview.is_degenerate() || metrics.width < 1 || metrics.height < 1 {
        return FrameToViewMatrix::identity();
    }

    let tx = preview.left as f32;
    let ty = preview.top as f32;
    if metrics.orientation.swaps_axes() {
        FrameToViewMatrix {
            a: 0.0,
            b: preview.width as f32 / metrics.height as f32,
            c: preview.height as f32 / metrics.width as f32,
            d: 0.0,
            tx,
            ty,
        }
    } else {
        FrameToViewMatrix {
            a: preview.width as f32 / metrics.width as f32,
            b: 0.0,
            c: 0.0,
            d: preview.height as f32 / metrics.height as f32,
            tx,
            ty,
        }
    }
}
