use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vocal_joystick::audio::frame_channel;
use vocal_joystick::channels::ModelFeed;
use vocal_joystick::integration::{JoystickConfig, SessionBuilder, SessionStatus};
use vocal_joystick::remote::{CommandSink, RemoteChannel};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vocal_joystick=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting vocal joystick");

    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading configuration from {}", path);
            JoystickConfig::load(&path)?
        }
        None => JoystickConfig::default(),
    };
    config.validate()?;

    let remote = Arc::new(RemoteChannel::connect(config.remote_url.clone()));
    info!("{}", SessionStatus::Booting);

    let (frame_tx, frame_rx) = frame_channel();
    let mut capture = match start_capture(frame_tx, config.tick_interval()) {
        Ok(capture) => capture,
        Err(e) => {
            error!("{}", SessionStatus::from_error(&e));
            remote.close().await;
            return Err(e.into());
        }
    };

    let feed = ModelFeed::new();
    let _reader = ModelFeed::spawn_stdin_reader(feed.sender.clone());

    let session = SessionBuilder::new()
        .with_config(config)
        .with_frames(frame_rx)
        .with_pitch_estimator(feed.pitch)
        .with_classifier(feed.classifier)
        .with_sink(Arc::clone(&remote) as Arc<dyn CommandSink>)
        .start()?;
    info!("{}", session.status());

    let mut status_interval = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = status_interval.tick() => {
                let snapshot = session.snapshot();
                if snapshot.connection.is_connected() {
                    info!(
                        "REMOTE ACTIVE | {} | last {} | volume {}% | pitch {} Hz",
                        snapshot.engine.active,
                        snapshot.engine.last_action,
                        snapshot.engine.level_percent,
                        snapshot.engine.pitch_hz
                    );
                } else {
                    info!("WAITING FOR DRIVER at {}", remote.url());
                }
            }
        }
    }

    info!("Shutting down");
    session.stop().await;
    stop_capture(&mut capture);
    remote.close().await;

    Ok(())
}

#[cfg(feature = "audio-io")]
fn start_capture(
    frame_tx: crossbeam_channel::Sender<Vec<f32>>,
    frame_period: Duration,
) -> vocal_joystick::Result<vocal_joystick::audio::AudioInput> {
    let mut input = vocal_joystick::audio::AudioInput::open(frame_period)?;
    input.start_capture(frame_tx)?;
    Ok(input)
}

#[cfg(feature = "audio-io")]
fn stop_capture(capture: &mut vocal_joystick::audio::AudioInput) {
    capture.stop_capture();
}

#[cfg(not(feature = "audio-io"))]
fn start_capture(
    _frame_tx: crossbeam_channel::Sender<Vec<f32>>,
    _frame_period: Duration,
) -> vocal_joystick::Result<()> {
    Err(vocal_joystick::VocalJoystickError::AudioDeviceError(
        "Built without the audio-io feature".to_string(),
    ))
}

#[cfg(not(feature = "audio-io"))]
fn stop_capture(_capture: &mut ()) {}
