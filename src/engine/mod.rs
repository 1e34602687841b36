//! Decode-engine boundary.
//!
//! The barcode decoding engine itself is an external collaborator; this
//! module defines the call surface the pipeline drives it through, the
//! per-invocation options, and the result types. The enums mirror the
//! engine's own enums through explicit mapping tables so an unexpected
//! engine-side value is an error, never a silent default.

pub mod rqrr;

use serde::{Deserialize, Serialize};

use crate::error::ScanError;
use crate::geometry::{FrameOrientation, Rect};

/// Algorithm converting a grayscale frame into black/white before symbol
/// detection.
///
/// `LocalAverage` is robust against uneven lighting; `GlobalHistogram`
/// reads inverted symbols on low-contrast backgrounds better. The scan
/// controller alternates between the two across frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Binarizer {
    LocalAverage,
    GlobalHistogram,
    FixedThreshold,
    BoolCast,
}

impl Binarizer {
    pub fn from_raw(value: i32) -> Result<Self, ScanError> {
        match value {
            0 => Ok(Self::LocalAverage),
            1 => Ok(Self::GlobalHistogram),
            2 => Ok(Self::FixedThreshold),
            3 => Ok(Self::BoolCast),
            value => Err(ScanError::UnknownRawValue {
                kind: "binarizer",
                value,
            }),
        }
    }

    pub fn as_raw(self) -> i32 {
        match self {
            Self::LocalAverage => 0,
            Self::GlobalHistogram => 1,
            Self::FixedThreshold => 2,
            Self::BoolCast => 3,
        }
    }
}

/// Symbol formats the engine knows about, mirrored one-to-one against the
/// engine-side enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarcodeFormat {
    None,
    Aztec,
    Codabar,
    Code39,
    Code93,
    Code128,
    DataBar,
    DataBarExpanded,
    DataMatrix,
    DxFilmEdge,
    Ean8,
    Ean13,
    Itf,
    MaxiCode,
    Pdf417,
    QrCode,
    MicroQrCode,
    RmqrCode,
    UpcA,
    UpcE,
}

impl BarcodeFormat {
    pub fn from_raw(value: i32) -> Result<Self, ScanError> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Aztec),
            2 => Ok(Self::Codabar),
            3 => Ok(Self::Code39),
            4 => Ok(Self::Code93),
            5 => Ok(Self::Code128),
            6 => Ok(Self::DataBar),
            7 => Ok(Self::DataBarExpanded),
            8 => Ok(Self::DataMatrix),
            9 => Ok(Self::DxFilmEdge),
            10 => Ok(Self::Ean8),
            11 => Ok(Self::Ean13),
            12 => Ok(Self::Itf),
            13 => Ok(Self::MaxiCode),
            14 => Ok(Self::Pdf417),
            15 => Ok(Self::QrCode),
            16 => Ok(Self::MicroQrCode),
            17 => Ok(Self::RmqrCode),
            18 => Ok(Self::UpcA),
            19 => Ok(Self::UpcE),
            value => Err(ScanError::UnknownRawValue {
                kind: "barcode format",
                value,
            }),
        }
    }

    pub fn as_raw(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Aztec => 1,
            Self::Codabar => 2,
            Self::Code39 => 3,
            Self::Code93 => 4,
            Self::Code128 => 5,
            Self::DataBar => 6,
            Self::DataBarExpanded => 7,
            Self::DataMatrix => 8,
            Self::DxFilmEdge => 9,
            Self::Ean8 => 10,
            Self::Ean13 => 11,
            Self::Itf => 12,
            Self::MaxiCode => 13,
            Self::Pdf417 => 14,
            Self::QrCode => 15,
            Self::MicroQrCode => 16,
            Self::RmqrCode => 17,
            Self::UpcA => 18,
            Self::UpcE => 19,
        }
    }
}

/// Decoder behavior for one invocation.
///
/// Immutable per invocation; only the binarizer differs between
/// consecutive frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeOptions {
    /// Symbol format allow-list.
    pub formats: Vec<BarcodeFormat>,
    pub binarizer: Binarizer,
    pub try_harder: bool,
    pub try_rotate: bool,
    pub try_invert: bool,
    pub try_downscale: bool,
    pub max_number_of_symbols: u32,
}

impl DecodeOptions {
    /// Options for the live scan loop: QR only, first symbol wins, and the
    /// cheap search effort that keeps per-frame latency bounded.
    pub fn single_qr(binarizer: Binarizer) -> Self {
        Self {
            formats: vec![BarcodeFormat::QrCode],
            binarizer,
            try_harder: false,
            try_rotate: true,
            try_invert: true,
            try_downscale: true,
            max_number_of_symbols: 1,
        }
    }
}

/// A point in frame pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Corner positions of a decoded symbol in frame pixel space.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Position {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_left: Point,
    pub bottom_right: Point,
    /// Symbol rotation in degrees, as reported by the engine.
    pub orientation: f64,
}

/// One decoded symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSymbol {
    pub format: BarcodeFormat,
    pub text: String,
    pub raw_bytes: Vec<u8>,
    pub position: Position,
}

/// The native image-to-text decoder, called once per delivered frame.
///
/// `luma` is the frame's grayscale plane, `row_stride` the number of bytes
/// per row, and `roi` the sub-rectangle actually searched. Implementations
/// must be safe to call repeatedly at camera frame rate.
pub trait DecodeEngine: Send {
    fn decode(
        &mut self,
        luma: &[u8],
        row_stride: i32,
        roi: Rect,
        orientation: FrameOrientation,
        options: &DecodeOptions,
    ) -> Option<Vec<DecodedSymbol>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_qr_options() {
        let options = DecodeOptions::single_qr(Binarizer::GlobalHistogram);
        assert_eq!(options.formats, vec![BarcodeFormat::QrCode]);
        assert_eq!(options.max_number_of_symbols, 1);
        assert!(!options.try_harder);
        assert!(options.try_rotate && options.try_invert && options.try_downscale);

        // The alternate invocation differs only in the binarizer.
        let alternate = DecodeOptions::single_qr(Binarizer::LocalAverage);
        assert_eq!(alternate.binarizer, Binarizer::LocalAverage);
        assert_eq!(
            DecodeOptions {
                binarizer: options.binarizer,
                ..alternate
            },
            options
        );
    }

    #[test]
    fn test_binarizer_raw_mapping_round_trips() {
        for raw in 0..4 {
            assert_eq!(Binarizer::from_raw(raw).unwrap().as_raw(), raw);
        }
        assert!(Binarizer::from_raw(4).is_err());
        assert!(Binarizer::from_raw(-1).is_err());
    }

    #[test]
    fn test_format_raw_mapping_round_trips() {
        for raw in 0..20 {
            assert_eq!(BarcodeFormat::from_raw(raw).unwrap().as_raw(), raw);
        }
        assert_eq!(BarcodeFormat::from_raw(15).unwrap(), BarcodeFormat::QrCode);
        assert!(matches!(
            BarcodeFormat::from_raw(20),
            Err(ScanError::UnknownRawValue {
                kind: "barcode format",
                value: 20
            })
        ));
    }
}
