//! Per-frame decode strategy.
//!
//! [`ScanController`] owns everything that used to be implicit per-frame
//! state: the alternating binarizer bit, the debounced text, and the
//! accepted/awaiting flag. It runs on the camera-callback context, which
//! delivers frames strictly sequentially; the surrounding session wraps it
//! in a mutex so a multi-worker camera pipeline would still get
//! exactly-once acceptance.

use crate::engine::{Binarizer, DecodeEngine, DecodeOptions, DecodedSymbol};
use crate::geometry::{FrameMetrics, Rect};

/// Whether the session has produced its single result yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    AwaitingResult,
    /// Terminal until the next camera-open cycle; no frame is decoded
    /// past this point.
    ResultAccepted,
}

/// Drives one decode attempt per delivered camera frame.
pub struct ScanController {
    engine: Box<dyn DecodeEngine>,
    /// Frame geometry and ROI, set once per camera-ready event.
    geometry: Option<(FrameMetrics, Rect)>,
    /// Flipped on every decoding invocation. One binarizer favors noisy
    /// low-contrast scenes, the other inverted symbols; alternating trades
    /// a 2x worst-case frame cost for a higher read rate without scene
    /// classification.
    use_local_average: bool,
    /// Text of the last result the caller rejected; a repeat decode of it
    /// is ignored rather than re-reported.
    suppressed_text: Option<String>,
    state: SessionState,
}

impl ScanController {
    pub fn new(engine: Box<dyn DecodeEngine>) -> Self {
        Self {
            engine,
            geometry: None,
            use_local_average: false,
            suppressed_text: None,
            state: SessionState::AwaitingResult,
        }
    }

    /// Install the geometry for a new camera session and re-arm the
    /// controller. Called once per camera-ready event.
    pub fn configure(&mut self, metrics: FrameMetrics, roi: Rect) {
        self.geometry = Some((metrics, roi));
        self.reset();
    }

    /// Re-arm for the next camera-open cycle. Clears the suppressed text:
    /// the debounce protects a single physical scan attempt, a text
    /// rejected in an earlier session scans normally in the next one.
    pub fn reset(&mut self) {
        self.state = SessionState::AwaitingResult;
        self.suppressed_text = None;
        self.use_local_average = false;
    }

    /// Ignore the next decodes of `text`, used when the caller rejected a
    /// symbol that is still in front of the camera.
    pub fn suppress(&mut self, text: impl Into<String>) {
        self.suppressed_text = Some(text.into());
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn roi(&self) -> Option<Rect> {
        self.geometry.map(|(_, roi)| roi)
    }

    /// Run one decode attempt against a delivered frame.
    ///
    /// Returns the accepted symbol exactly once per session; every later
    /// call is a no-op that never reaches the engine. A miss, or a decode
    /// of the suppressed text, returns `None` with the state unchanged.
    pub fn on_frame(&mut self, luma: &[u8]) -> Option<DecodedSymbol> {
        if self.state == SessionState::ResultAccepted {
            return None;
        }
        let (metrics, roi) = self.geometry?;

        self.use_local_average = !self.use_local_average;
        let binarizer = if self.use_local_average {
            Binarizer::LocalAverage
        } else {
            Binarizer::GlobalHistogram
        };
        let options = DecodeOptions::single_qr(binarizer);

        let results = self
            .engine
            .decode(luma, metrics.width, roi, metrics.orientation, &options)?;
        let symbol = results.into_iter().next()?;

        if self.suppressed_text.as_deref() == Some(symbol.text.as_str()) {
            log::debug!("ignoring repeat decode of rejected symbol");
            return None;
        }

        self.state = SessionState::ResultAccepted;
        log::debug!("accepted {:?} symbol", symbol.format);
        Some(symbol)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::engine::{BarcodeFormat, DecodeEngine, Position};
    use crate::geometry::FrameOrientation;

    /// Engine fake that replays a script of per-call outcomes and records
    /// every invocation.
    struct ScriptEngine {
        script: Vec<Option<&'static str>>,
        call: usize,
        calls: Arc<AtomicUsize>,
        binarizers: Arc<parking_lot::Mutex<Vec<Binarizer>>>,
    }

    impl ScriptEngine {
        fn boxed(
            script: Vec<Option<&'static str>>,
        ) -> (
            Box<dyn DecodeEngine>,
            Arc<AtomicUsize>,
            Arc<parking_lot::Mutex<Vec<Binarizer>>>,
        ) {
            let calls = Arc::new(AtomicUsize::new(0));
            let binarizers = Arc::new(parking_lot::Mutex::new(Vec::new()));
            let engine = Box::new(ScriptEngine {
                script,
                call: 0,
                calls: Arc::clone(&calls),
                binarizers: Arc::clone(&binarizers),
            });
            (engine, calls, binarizers)
        }
    }

    impl DecodeEngine for ScriptEngine {
        fn decode(
            &mut self,
            _luma: &[u8],
            _row_stride: i32,
            _roi: Rect,
            _orientation: FrameOrientation,
            options: &DecodeOptions,
        ) -> Option<Vec<DecodedSymbol>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.binarizers.lock().push(options.binarizer);
            let outcome = self.script.get(self.call).copied().flatten();
            self.call += 1;
            outcome.map(|text| {
                vec![DecodedSymbol {
                    format: BarcodeFormat::QrCode,
                    text: text.to_string(),
                    raw_bytes: text.as_bytes().to_vec(),
                    position: Position::default(),
                }]
            })
        }
    }

    fn configured(engine: Box<dyn DecodeEngine>) -> ScanController {
        let mut controller = ScanController::new(engine);
        controller.configure(
            FrameMetrics::new(640, 480, FrameOrientation::Deg0),
            Rect::new(160, 120, 320, 240),
        );
        controller
    }

    #[test]
    fn test_binarizer_strictly_alternates_across_misses() {
        let (engine, _, binarizers) = ScriptEngine::boxed(vec![None; 6]);
        let mut controller = configured(engine);
        let frame = [0u8; 16];
        for _ in 0..6 {
            assert!(controller.on_frame(&frame).is_none());
        }
        assert_eq!(
            *binarizers.lock(),
            vec![
                Binarizer::LocalAverage,
                Binarizer::GlobalHistogram,
                Binarizer::LocalAverage,
                Binarizer::GlobalHistogram,
                Binarizer::LocalAverage,
                Binarizer::GlobalHistogram,
            ]
        );
    }

    #[test]
    fn test_exactly_once_acceptance() {
        let (engine, calls, _) = ScriptEngine::boxed(vec![
            None,
            None,
            Some("T"),
            Some("U"),
            Some("V"),
        ]);
        let mut controller = configured(engine);
        let frame = [0u8; 16];

        assert!(controller.on_frame(&frame).is_none());
        assert!(controller.on_frame(&frame).is_none());
        let accepted = controller.on_frame(&frame).expect("frame 3 accepts");
        assert_eq!(accepted.text, "T");
        assert_eq!(controller.state(), SessionState::ResultAccepted);

        // Every later frame is a no-op that never reaches the engine.
        let calls_at_accept = calls.load(Ordering::SeqCst);
        for _ in 0..4 {
            assert!(controller.on_frame(&frame).is_none());
        }
        assert_eq!(calls.load(Ordering::SeqCst), calls_at_accept);
    }

    #[test]
    fn test_suppressed_text_is_debounced() {
        let (engine, _, _) = ScriptEngine::boxed(vec![Some("X"), Some("X"), Some("Y")]);
        let mut controller = configured(engine);
        controller.suppress("X");
        let frame = [0u8; 16];

        assert!(controller.on_frame(&frame).is_none());
        assert_eq!(controller.state(), SessionState::AwaitingResult);
        assert!(controller.on_frame(&frame).is_none());

        let accepted = controller.on_frame(&frame).expect("new text accepts");
        assert_eq!(accepted.text, "Y");
    }

    #[test]
    fn test_reset_clears_suppression() {
        let (engine, _, _) = ScriptEngine::boxed(vec![Some("X")]);
        let mut controller = configured(engine);
        controller.suppress("X");
        controller.reset();
        let accepted = controller.on_frame(&[0u8; 16]);
        assert_eq!(accepted.expect("suppression cleared").text, "X");
    }

    #[test]
    fn test_unconfigured_controller_never_decodes() {
        let (engine, calls, _) = ScriptEngine::boxed(vec![Some("T")]);
        let mut controller = ScanController::new(engine);
        assert!(controller.on_frame(&[0u8; 16]).is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
