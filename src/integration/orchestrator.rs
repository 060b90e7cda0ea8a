//! Session orchestrator
//!
//! Runs the three producers of a joystick session as independent tasks:
//!
//! - the tick loop: loudness sample, gate, click, throttled dispatch
//! - the pitch loop: one estimate request after another
//! - the classification loop: one classification after another
//!
//! All of them write through [`SharedEngineState`]. Each loop re-arms after
//! every result, error included, until the session is stopped.

use crate::audio::LoudnessMonitor;
use crate::channels::{PitchEstimator, PitchSample, VowelClassifier};
use crate::control::{EngineSnapshot, SharedEngineState};
use crate::integration::config::JoystickConfig;
use crate::messages::{ActiveCommand, ConnectionState, OutboundCommand};
use crate::remote::CommandSink;
use crate::{Result, VocalJoystickError};
use crossbeam_channel::Receiver;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

/// Lifecycle of a session as shown to the user
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    /// Capture and models are being set up
    Booting,
    Online,
    /// Setup failed; the message is meant for the user
    Failed(String),
    Stopped,
}

impl SessionStatus {
    pub fn from_error(error: &VocalJoystickError) -> Self {
        SessionStatus::Failed(error.user_message())
    }

    pub fn is_online(&self) -> bool {
        matches!(self, SessionStatus::Online)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Booting => write!(f, "Booting voice models..."),
            SessionStatus::Online => write!(f, "System online"),
            SessionStatus::Failed(message) => write!(f, "Error: {}", message),
            SessionStatus::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Engine state plus transport connectivity
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionSnapshot {
    pub engine: EngineSnapshot,
    pub connection: ConnectionState,
}

/// Handle for observing and stopping a running session
pub struct SessionHandle {
    state: SharedEngineState,
    sink: Arc<dyn CommandSink>,
    shutdown_tx: watch::Sender<bool>,
    status_tx: watch::Sender<SessionStatus>,
    tasks: Vec<JoinHandle<()>>,
}

impl SessionHandle {
    /// Shared engine state, for direct queries
    pub fn state(&self) -> &SharedEngineState {
        &self.state
    }

    pub fn active(&self) -> ActiveCommand {
        self.state.active()
    }

    pub fn connection(&self) -> ConnectionState {
        if self.sink.is_ready() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            engine: self.state.snapshot(),
            connection: self.connection(),
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status_tx.borrow().clone()
    }

    /// Watch status changes
    pub fn subscribe_status(&self) -> watch::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }

    /// Stop all loops and wait for them to finish
    ///
    /// The liveness flag drops first so that any result still in flight is
    /// discarded instead of written.
    pub async fn stop(mut self) {
        if let Some(transition) = self.state.shutdown() {
            debug!("Session stop: {} -> {}", transition.from, transition.to);
        }
        let _ = self.shutdown_tx.send(true);

        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!("Session task ended abnormally: {}", e);
            }
        }

        self.status_tx.send_replace(SessionStatus::Stopped);
        info!("Session stopped");
    }
}

/// Builder for a joystick session
pub struct SessionBuilder {
    config: JoystickConfig,
    frames: Option<Receiver<Vec<f32>>>,
    pitch: Option<Box<dyn PitchEstimator>>,
    classifier: Option<Box<dyn VowelClassifier>>,
    sink: Option<Arc<dyn CommandSink>>,
}

impl SessionBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: JoystickConfig::default(),
            frames: None,
            pitch: None,
            classifier: None,
            sink: None,
        }
    }

    /// Set the complete configuration
    pub fn with_config(mut self, config: JoystickConfig) -> Self {
        self.config = config;
        self
    }

    /// Audio frames for the loudness monitor
    pub fn with_frames(mut self, frames: Receiver<Vec<f32>>) -> Self {
        self.frames = Some(frames);
        self
    }

    pub fn with_pitch_estimator(mut self, pitch: impl PitchEstimator + 'static) -> Self {
        self.pitch = Some(Box::new(pitch));
        self
    }

    pub fn with_classifier(mut self, classifier: impl VowelClassifier + 'static) -> Self {
        self.classifier = Some(Box::new(classifier));
        self
    }

    /// Where commands go
    pub fn with_sink(mut self, sink: Arc<dyn CommandSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Validate and spawn the session loops
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(self) -> Result<SessionHandle> {
        self.config.validate()?;

        let frames = self.frames.ok_or_else(|| {
            VocalJoystickError::AudioDeviceError("No audio frame source".to_string())
        })?;
        let pitch = self
            .pitch
            .ok_or_else(|| VocalJoystickError::ModelLoadError("No pitch estimator".to_string()))?;
        let classifier = self.classifier.ok_or_else(|| {
            VocalJoystickError::ModelLoadError("No vowel classifier".to_string())
        })?;
        let sink = self
            .sink
            .ok_or_else(|| VocalJoystickError::TransportError("No command sink".to_string()))?;

        let config = self.config;
        let state = SharedEngineState::new(&config);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (status_tx, _) = watch::channel(SessionStatus::Booting);

        let monitor = LoudnessMonitor::new(frames, config.stale_frame_ticks());

        let tasks = vec![
            tokio::spawn(run_tick_loop(
                monitor,
                state.clone(),
                Arc::clone(&sink),
                config.tick_interval(),
                config.display_reset(),
                shutdown_rx.clone(),
            )),
            tokio::spawn(run_pitch_loop(pitch, state.clone(), shutdown_rx.clone())),
            tokio::spawn(run_classification_loop(
                classifier,
                state.clone(),
                shutdown_rx,
            )),
        ];

        status_tx.send_replace(SessionStatus::Online);
        info!(
            "Session online: gate {:.2}, click {:.2}, pitch {}-{} Hz, speed {}",
            config.noise_gate, config.click_threshold, config.pitch_low, config.pitch_high, config.speed
        );

        Ok(SessionHandle {
            state,
            sink,
            shutdown_tx,
            status_tx,
            tasks,
        })
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    // A dropped sender also ends the session
    let _ = shutdown.wait_for(|stop| *stop).await;
}

async fn run_tick_loop(
    mut monitor: LoudnessMonitor,
    state: SharedEngineState,
    sink: Arc<dyn CommandSink>,
    tick: Duration,
    display_reset: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    debug!("Tick loop started at {:?}", tick);

    loop {
        tokio::select! {
            biased;
            _ = cancelled(&mut shutdown) => break,
            _ = interval.tick() => {
                let level = monitor.sample();
                let now = tokio::time::Instant::now().into_std();
                let output = state.on_tick(level, now);

                if let Some(transition) = output.transition {
                    info!("Silence: {} -> {}", transition.from, transition.to);
                }

                for command in output.commands() {
                    deliver(command, sink.as_ref(), &state, display_reset);
                }
            }
        }
    }

    debug!("Tick loop finished");
}

/// Send one command and arm its display reset
fn deliver(
    command: OutboundCommand,
    sink: &dyn CommandSink,
    state: &SharedEngineState,
    display_reset: Duration,
) {
    if !sink.send(command) {
        trace!("Dropped {:?}", command);
        return;
    }

    debug!("Sent {:?}", command);

    if let Some(armed) = state.show_action(&command) {
        let state = state.clone();
        tokio::spawn(async move {
            tokio::time::sleep(display_reset).await;
            state.expire_action(armed);
        });
    }
}

async fn run_pitch_loop(
    mut pitch: Box<dyn PitchEstimator>,
    state: SharedEngineState,
    mut shutdown: watch::Receiver<bool>,
) {
    debug!("Pitch loop started");

    loop {
        tokio::select! {
            biased;
            _ = cancelled(&mut shutdown) => break,
            result = pitch.get_pitch() => {
                let mut failed = false;
                let sample = match result {
                    Ok(sample) => sample,
                    Err(e) => {
                        debug!("Pitch estimate failed: {}", e);
                        failed = true;
                        PitchSample::Absent
                    }
                };

                if let Some(transition) = state.on_pitch(sample) {
                    info!("Pitch: {} -> {}", transition.from, transition.to);
                }

                // An estimator that fails without awaiting must not starve the runtime
                if failed {
                    tokio::task::yield_now().await;
                }
            }
        }
    }

    debug!("Pitch loop finished");
}

async fn run_classification_loop(
    mut classifier: Box<dyn VowelClassifier>,
    state: SharedEngineState,
    mut shutdown: watch::Receiver<bool>,
) {
    debug!("Classification loop started");

    loop {
        tokio::select! {
            biased;
            _ = cancelled(&mut shutdown) => break,
            result = classifier.classify() => {
                match result {
                    Ok(results) => {
                        if let Some(transition) = state.on_classification(&results) {
                            info!("Vowel: {} -> {}", transition.from, transition.to);
                        }
                    }
                    Err(e) => {
                        debug!("Classification failed: {}", e);
                        tokio::task::yield_now().await;
                    }
                }
            }
        }
    }

    debug!("Classification loop finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::frame_channel;
    use crate::channels::ModelFeed;

    struct NullSink;

    impl CommandSink for NullSink {
        fn is_ready(&self) -> bool {
            false
        }

        fn send(&self, _command: OutboundCommand) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_missing_parts_are_setup_errors() {
        let result = SessionBuilder::new().start();
        assert!(matches!(
            result,
            Err(VocalJoystickError::AudioDeviceError(_))
        ));

        let (_tx, rx) = frame_channel();
        let result = SessionBuilder::new().with_frames(rx).start();
        assert!(matches!(result, Err(VocalJoystickError::ModelLoadError(_))));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let feed = ModelFeed::new();
        let (_tx, rx) = frame_channel();
        let result = SessionBuilder::new()
            .with_config(JoystickConfig::default().with_speed(0))
            .with_frames(rx)
            .with_pitch_estimator(feed.pitch)
            .with_classifier(feed.classifier)
            .with_sink(Arc::new(NullSink))
            .start();

        assert!(matches!(result, Err(VocalJoystickError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let feed = ModelFeed::new();
        let (_tx, rx) = frame_channel();
        let handle = SessionBuilder::new()
            .with_frames(rx)
            .with_pitch_estimator(feed.pitch)
            .with_classifier(feed.classifier)
            .with_sink(Arc::new(NullSink))
            .start()
            .unwrap();

        assert!(handle.status().is_online());
        assert_eq!(handle.connection(), ConnectionState::Disconnected);
        assert_eq!(handle.active(), ActiveCommand::Idle);

        let status = handle.subscribe_status();
        handle.stop().await;
        assert_eq!(*status.borrow(), SessionStatus::Stopped);
    }

    struct FailingEstimator;

    #[async_trait::async_trait]
    impl PitchEstimator for FailingEstimator {
        async fn get_pitch(&mut self) -> Result<PitchSample> {
            Err(VocalJoystickError::InferenceError("no model".to_string()))
        }
    }

    struct ClickCounter(parking_lot::Mutex<usize>);

    impl CommandSink for ClickCounter {
        fn is_ready(&self) -> bool {
            true
        }

        fn send(&self, command: OutboundCommand) -> bool {
            if command == OutboundCommand::click() {
                *self.0.lock() += 1;
            }
            true
        }
    }

    #[tokio::test]
    async fn test_instantly_failing_estimator_leaves_ticks_running() {
        let feed = ModelFeed::new();
        let (tx, rx) = frame_channel();
        let sink = Arc::new(ClickCounter(parking_lot::Mutex::new(0)));

        let handle = SessionBuilder::new()
            .with_frames(rx)
            .with_pitch_estimator(FailingEstimator)
            .with_classifier(feed.classifier)
            .with_sink(Arc::clone(&sink) as Arc<dyn CommandSink>)
            .start()
            .unwrap();

        tx.send(vec![0.4; 256]).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(*sink.0.lock(), 1);
        assert_eq!(handle.active(), ActiveCommand::Idle);
        handle.stop().await;
    }

    #[test]
    fn test_status_messages() {
        let error = VocalJoystickError::AudioDeviceError("denied".into());
        let status = SessionStatus::from_error(&error);
        assert!(status.to_string().starts_with("Error: Microphone unavailable"));
        assert_eq!(SessionStatus::Online.to_string(), "System online");
    }
}
