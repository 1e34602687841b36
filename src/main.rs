//! Scan the first QR symbol a connected camera sees and print its text.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use camera_scan::{
    AlwaysGranted, FeedbackDevice, NokhwaCamera, Reporter, RingerMode, RqrrEngine, ScanSession,
    SessionConfig, SessionEvent, SessionPhase,
};

/// Headless stand-in for vibration and tone hardware.
struct LogFeedback;

impl FeedbackDevice for LogFeedback {
    fn vibrate(&mut self) {
        log::info!("bzzt");
    }
    fn play_confirm_tone(&mut self) {
        log::info!("beep");
    }
    fn play_error_tone(&mut self) {
        log::info!("bonk");
    }
    fn ringer_mode(&self) -> RingerMode {
        RingerMode::Normal
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    for info in NokhwaCamera::list_cameras() {
        log::info!("camera {}: {}", info.index, info.name);
    }

    let mut session = ScanSession::new(
        NokhwaCamera::new(),
        Box::new(RqrrEngine::new()),
        Box::new(AlwaysGranted),
        SessionConfig::default(),
    );
    let accepted = session
        .accepted()
        .context("result channel already taken")?;
    let mut reporter = Reporter::new(|| Box::new(LogFeedback) as Box<dyn FeedbackDevice>);

    session.open()?;
    loop {
        for event in session.poll_events() {
            match event {
                SessionEvent::Ready => log::info!("point the camera at a QR code"),
                SessionEvent::Notice(message) => log::warn!("{}", message),
                SessionEvent::Stopped => log::info!("camera stopped"),
            }
        }
        if session.phase() == SessionPhase::Error {
            session.close();
            bail!("camera failed, see log for details");
        }
        if let Ok(symbol) = accepted.recv_timeout(Duration::from_millis(50)) {
            let text = session.finish(&mut reporter, &symbol);
            println!("{text}");
            return Ok(());
        }
    }
}
