//! Pure-Rust QR engine backed by the `rqrr` crate.
//!
//! Adapts `rqrr`'s prepared-image pipeline to the [`DecodeEngine`]
//! boundary so the demo binary can scan without a native decoder. `rqrr`
//! performs its own adaptive binarization, so the `LocalAverage` and
//! `GlobalHistogram` hints both run through that pipeline; the threshold
//! binarizers are honored with a fixed cut at mid-gray.

use ::rqrr::PreparedImage;

use crate::engine::{
    BarcodeFormat, Binarizer, DecodeEngine, DecodeOptions, DecodedSymbol, Point, Position,
};
use crate::geometry::{FrameOrientation, Rect};

const FIXED_THRESHOLD: u8 = 128;

/// Engine adapter around `rqrr`. Stateless between invocations.
#[derive(Debug, Default)]
pub struct RqrrEngine;

impl RqrrEngine {
    pub fn new() -> Self {
        Self
    }

    /// Copy the ROI out of the strided luma plane into a tight buffer.
    fn crop(luma: &[u8], row_stride: i32, roi: Rect) -> Option<Vec<u8>> {
        let stride = row_stride as usize;
        let (left, top) = (roi.left as usize, roi.top as usize);
        let (width, height) = (roi.width as usize, roi.height as usize);
        if width == 0 || height == 0 {
            return None;
        }
        let end = (top + height - 1) * stride + left + width;
        if left + width > stride || end > luma.len() {
            log::warn!(
                "frame buffer too small for roi {:?} at stride {}",
                roi,
                row_stride
            );
            return None;
        }
        let mut out = Vec::with_capacity(width * height);
        for row in 0..height {
            let start = (top + row) * stride + left;
            out.extend_from_slice(&luma[start..start + width]);
        }
        Some(out)
    }
}

impl DecodeEngine for RqrrEngine {
    fn decode(
        &mut self,
        luma: &[u8],
        row_stride: i32,
        roi: Rect,
        _orientation: FrameOrientation,
        options: &DecodeOptions,
    ) -> Option<Vec<DecodedSymbol>> {
        if !options.formats.contains(&BarcodeFormat::QrCode) {
            return None;
        }

        let crop = Self::crop(luma, row_stride, roi)?;
        let (width, height) = (roi.width as usize, roi.height as usize);

        let mut prepared = match options.binarizer {
            Binarizer::FixedThreshold | Binarizer::BoolCast => {
                PreparedImage::prepare_from_bitmap(width, height, |x, y| {
                    crop[y * width + x] < FIXED_THRESHOLD
                })
            }
            Binarizer::LocalAverage | Binarizer::GlobalHistogram => {
                PreparedImage::prepare_from_greyscale(width, height, |x, y| crop[y * width + x])
            }
        };

        let mut symbols = Vec::new();
        for grid in prepared.detect_grids() {
            if symbols.len() >= options.max_number_of_symbols as usize {
                break;
            }
            let content = match grid.decode() {
                Ok((_meta, content)) => content,
                Err(e) => {
                    log::debug!("grid failed to decode: {:?}", e);
                    continue;
                }
            };
            // Grid corners are relative to the cropped image; shift them
            // back into frame pixel space.
            let corner = |i: usize| Point {
                x: grid.bounds[i].x as f32 + roi.left as f32,
                y: grid.bounds[i].y as f32 + roi.top as f32,
            };
            symbols.push(DecodedSymbol {
                format: BarcodeFormat::QrCode,
                raw_bytes: content.as_bytes().to_vec(),
                text: content,
                position: Position {
                    top_left: corner(0),
                    top_right: corner(1),
                    bottom_right: corner(2),
                    bottom_left: corner(3),
                    orientation: 0.0,
                },
            });
        }

        if symbols.is_empty() {
            None
        } else {
            Some(symbols)
        }
    }
}
