//! Result reporting and scan feedback.
//!
//! The haptic/audible hardware is an external collaborator behind
//! [`FeedbackDevice`]. The [`Reporter`] creates the device lazily on
//! first use and releases it on teardown, so no tone-generator handle
//! outlives the session.

use crossbeam_channel::Sender;

use crate::engine::DecodedSymbol;

/// Device ringer state, queried before playing tones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RingerMode {
    #[default]
    Normal,
    Silent,
    Vibrate,
}

impl RingerMode {
    /// Tones are suppressed in both silent and vibrate-only modes.
    pub fn suppresses_tones(self) -> bool {
        matches!(self, Self::Silent | Self::Vibrate)
    }
}

/// Haptic and audible confirmation hardware.
pub trait FeedbackDevice: Send {
    fn vibrate(&mut self);
    fn play_confirm_tone(&mut self);
    fn play_error_tone(&mut self);
    fn ringer_mode(&self) -> RingerMode;
}

type DeviceFactory = Box<dyn FnMut() -> Box<dyn FeedbackDevice> + Send>;

/// Optional cosmetic hook applied when a session terminates, forcing a
/// fixed display orientation on platforms where returning to the caller
/// otherwise flips orientation several times. A no-op elsewhere.
pub type OrientationLock = Box<dyn FnMut() + Send>;

/// Packages the accepted symbol for the caller and plays confirmation
/// feedback. Runs on the caller's context, never on the camera thread.
pub struct Reporter {
    factory: DeviceFactory,
    device: Option<Box<dyn FeedbackDevice>>,
    orientation_lock: Option<OrientationLock>,
    result_tx: Option<Sender<String>>,
}

impl Reporter {
    pub fn new(factory: impl FnMut() -> Box<dyn FeedbackDevice> + Send + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            device: None,
            orientation_lock: None,
            result_tx: None,
        }
    }

    /// Deliver the decoded text over a channel in addition to returning
    /// it from [`Self::on_accepted`].
    pub fn with_result_channel(mut self, result_tx: Sender<String>) -> Self {
        self.result_tx = Some(result_tx);
        self
    }

    pub fn with_orientation_lock(mut self, lock: impl FnMut() + Send + 'static) -> Self {
        self.orientation_lock = Some(Box::new(lock));
        self
    }

    fn device(&mut self) -> &mut dyn FeedbackDevice {
        let factory = &mut self.factory;
        self.device.get_or_insert_with(|| factory()).as_mut()
    }

    /// Finalize an accepted result: confirmation feedback, result
    /// delivery, and the orientation-lock override.
    pub fn on_accepted(&mut self, symbol: &DecodedSymbol) -> String {
        self.scan_feedback();
        if let Some(result_tx) = &self.result_tx {
            let _ = result_tx.try_send(symbol.text.clone());
        }
        if let Some(lock) = &mut self.orientation_lock {
            lock();
        }
        symbol.text.clone()
    }

    /// Vibrate, and beep unless the ringer is silenced.
    pub fn scan_feedback(&mut self) {
        let device = self.device();
        device.vibrate();
        if !device.ringer_mode().suppresses_tones() {
            device.play_confirm_tone();
        }
    }

    /// Feedback for a rejected or unusable symbol.
    pub fn error_feedback(&mut self) {
        let device = self.device();
        device.vibrate();
        if !device.ringer_mode().suppresses_tones() {
            device.play_error_tone();
        }
    }

    /// Release the feedback hardware. Called automatically on drop; safe
    /// to call early and repeatedly.
    pub fn release(&mut self) {
        if self.device.take().is_some() {
            log::debug!("released feedback device");
        }
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::engine::{BarcodeFormat, Position};

    #[derive(Default)]
    struct Counters {
        created: AtomicUsize,
        dropped: AtomicUsize,
        vibrations: AtomicUsize,
        confirms: AtomicUsize,
        errors: AtomicUsize,
    }

    struct RecordingDevice {
        counters: Arc<Counters>,
        ringer: RingerMode,
    }

    impl FeedbackDevice for RecordingDevice {
        fn vibrate(&mut self) {
            self.counters.vibrations.fetch_add(1, Ordering::SeqCst);
        }
        fn play_confirm_tone(&mut self) {
            self.counters.confirms.fetch_add(1, Ordering::SeqCst);
        }
        fn play_error_tone(&mut self) {
            self.counters.errors.fetch_add(1, Ordering::SeqCst);
        }
        fn ringer_mode(&self) -> RingerMode {
            self.ringer
        }
    }

    impl Drop for RecordingDevice {
        fn drop(&mut self) {
            self.counters.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn reporter_with(ringer: RingerMode) -> (Reporter, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let factory_counters = Arc::clone(&counters);
        let reporter = Reporter::new(move || {
            factory_counters.created.fetch_add(1, Ordering::SeqCst);
            Box::new(RecordingDevice {
                counters: Arc::clone(&factory_counters),
                ringer,
            }) as Box<dyn FeedbackDevice>
        });
        (reporter, counters)
    }

    fn symbol(text: &str) -> DecodedSymbol {
        DecodedSymbol {
            format: BarcodeFormat::QrCode,
            text: text.to_string(),
            raw_bytes: text.as_bytes().to_vec(),
            position: Position::default(),
        }
    }

    #[test]
    fn test_device_created_lazily_and_released_on_drop() {
        let (mut reporter, counters) = reporter_with(RingerMode::Normal);
        assert_eq!(counters.created.load(Ordering::SeqCst), 0);
        reporter.scan_feedback();
        assert_eq!(counters.created.load(Ordering::SeqCst), 1);
        // Reuse, not re-create.
        reporter.scan_feedback();
        assert_eq!(counters.created.load(Ordering::SeqCst), 1);
        drop(reporter);
        assert_eq!(counters.dropped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_silent_ringer_suppresses_tone_but_not_vibration() {
        for ringer in [RingerMode::Silent, RingerMode::Vibrate] {
            let (mut reporter, counters) = reporter_with(ringer);
            reporter.scan_feedback();
            assert_eq!(counters.vibrations.load(Ordering::SeqCst), 1);
            assert_eq!(counters.confirms.load(Ordering::SeqCst), 0);
        }
        let (mut reporter, counters) = reporter_with(RingerMode::Normal);
        reporter.scan_feedback();
        assert_eq!(counters.confirms.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_error_feedback_plays_error_tone() {
        let (mut reporter, counters) = reporter_with(RingerMode::Normal);
        reporter.error_feedback();
        assert_eq!(counters.vibrations.load(Ordering::SeqCst), 1);
        assert_eq!(counters.errors.load(Ordering::SeqCst), 1);
        assert_eq!(counters.confirms.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_on_accepted_delivers_text_and_applies_lock() {
        let (reporter, counters) = reporter_with(RingerMode::Normal);
        let (result_tx, result_rx) = crossbeam_channel::bounded(1);
        let locks = Arc::new(AtomicUsize::new(0));
        let lock_count = Arc::clone(&locks);
        let mut reporter = reporter
            .with_result_channel(result_tx)
            .with_orientation_lock(move || {
                lock_count.fetch_add(1, Ordering::SeqCst);
            });

        let text = reporter.on_accepted(&symbol("hello"));
        assert_eq!(text, "hello");
        assert_eq!(result_rx.try_recv().unwrap(), "hello");
        assert_eq!(locks.load(Ordering::SeqCst), 1);
        assert_eq!(counters.vibrations.load(Ordering::SeqCst), 1);
    }
}
