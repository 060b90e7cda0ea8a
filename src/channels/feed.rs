//! Latest-value model adapters
//!
//! The models run outside this crate. A [`ModelFeedSender`] publishes their
//! results; [`FeedPitchEstimator`] and [`FeedClassifier`] hand them to the
//! session loops one request at a time. Each feed holds a single slot: a
//! result that has not been picked up yet is overwritten by the next one,
//! so a loop only ever sees the newest estimate.

use crate::channels::{Classification, PitchEstimator, PitchSample, VowelClassifier};
use crate::{Result, VocalJoystickError};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type Slot<T> = Option<Result<T>>;

/// Wait for a fresh value in `rx`; never resolves once the producer is gone
async fn next_result<T: Clone>(rx: &mut watch::Receiver<Slot<T>>) -> Result<T> {
    loop {
        if rx.changed().await.is_err() {
            return std::future::pending().await;
        }
        let latest = rx.borrow_and_update().clone();
        if let Some(result) = latest {
            return result;
        }
    }
}

/// Pitch estimator fed from the latest published result
pub struct FeedPitchEstimator {
    rx: watch::Receiver<Slot<PitchSample>>,
}

#[async_trait]
impl PitchEstimator for FeedPitchEstimator {
    async fn get_pitch(&mut self) -> Result<PitchSample> {
        next_result(&mut self.rx).await
    }
}

/// Vowel classifier fed from the latest published result
pub struct FeedClassifier {
    rx: watch::Receiver<Slot<Vec<Classification>>>,
}

#[async_trait]
impl VowelClassifier for FeedClassifier {
    async fn classify(&mut self) -> Result<Vec<Classification>> {
        next_result(&mut self.rx).await
    }
}

/// Producer half of both feeds
#[derive(Clone)]
pub struct ModelFeedSender {
    pitch_tx: Arc<watch::Sender<Slot<PitchSample>>>,
    vowel_tx: Arc<watch::Sender<Slot<Vec<Classification>>>>,
}

impl ModelFeedSender {
    /// Publish a pitch estimate; `None` means no pitch heard
    ///
    /// Returns false once the estimator is gone.
    pub fn push_pitch(&self, frequency: Option<f32>) -> bool {
        self.pitch_tx
            .send(Some(Ok(PitchSample::from_frequency(frequency))))
            .is_ok()
    }

    pub fn push_pitch_error(&self, message: impl Into<String>) -> bool {
        self.pitch_tx
            .send(Some(Err(VocalJoystickError::InferenceError(message.into()))))
            .is_ok()
    }

    /// Publish a best-first result list
    pub fn push_classification(&self, results: Vec<Classification>) -> bool {
        self.vowel_tx.send(Some(Ok(results))).is_ok()
    }

    pub fn push_classification_error(&self, message: impl Into<String>) -> bool {
        self.vowel_tx
            .send(Some(Err(VocalJoystickError::InferenceError(message.into()))))
            .is_ok()
    }

    fn push_line(&self, line: FeedLine) -> bool {
        match line {
            FeedLine::Pitch(frequency) => self.push_pitch(frequency),
            FeedLine::Classification(results) => self.push_classification(results),
            FeedLine::PitchError(message) => self.push_pitch_error(message),
            FeedLine::ClassificationError(message) => self.push_classification_error(message),
        }
    }
}

/// Both feeds plus their producer handle
pub struct ModelFeed {
    pub sender: ModelFeedSender,
    pub pitch: FeedPitchEstimator,
    pub classifier: FeedClassifier,
}

impl ModelFeed {
    pub fn new() -> Self {
        let (pitch_tx, pitch_rx) = watch::channel(None);
        let (vowel_tx, vowel_rx) = watch::channel(None);

        Self {
            sender: ModelFeedSender {
                pitch_tx: Arc::new(pitch_tx),
                vowel_tx: Arc::new(vowel_tx),
            },
            pitch: FeedPitchEstimator { rx: pitch_rx },
            classifier: FeedClassifier { rx: vowel_rx },
        }
    }

    /// Read JSON lines from stdin into the feeds
    pub fn spawn_stdin_reader(sender: ModelFeedSender) -> JoinHandle<()> {
        Self::spawn_reader(sender, tokio::io::stdin())
    }

    /// Read JSON lines from any async reader into the feeds
    ///
    /// Accepted lines:
    /// `{"pitch": 412.0}`, `{"pitch": null}`,
    /// `{"label": "Class 2", "confidence": 0.91}`,
    /// `{"results": [{"label": ..., "confidence": ...}, ...]}`,
    /// `{"error": "...", "model": "pitch"|"vowel"}`.
    pub fn spawn_reader<R>(sender: ModelFeedSender, reader: R) -> JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            info!("Model feed reader started");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        match parse_feed_line(&line) {
                            Ok(parsed) => {
                                if !sender.push_line(parsed) {
                                    debug!("Model feed has no consumer; stopping");
                                    break;
                                }
                            }
                            Err(e) => warn!("Ignoring model feed line: {}", e),
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Model feed read failed: {}", e);
                        break;
                    }
                }
            }

            info!("Model feed reader finished");
        })
    }
}

impl Default for ModelFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// One decoded feed line
#[derive(Clone, Debug, PartialEq)]
pub enum FeedLine {
    Pitch(Option<f32>),
    Classification(Vec<Classification>),
    PitchError(String),
    ClassificationError(String),
}

/// Decode one JSON feed line
pub fn parse_feed_line(line: &str) -> Result<FeedLine> {
    let value: Value = serde_json::from_str(line)
        .map_err(|e| VocalJoystickError::InferenceError(format!("Invalid JSON: {}", e)))?;

    let Value::Object(map) = value else {
        return Err(VocalJoystickError::InferenceError(
            "Feed line must be a JSON object".to_string(),
        ));
    };

    if let Some(error) = map.get("error") {
        let message = error
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return match map.get("model").and_then(Value::as_str) {
            Some("vowel") => Ok(FeedLine::ClassificationError(message)),
            _ => Ok(FeedLine::PitchError(message)),
        };
    }

    if let Some(pitch) = map.get("pitch") {
        return match pitch {
            Value::Null => Ok(FeedLine::Pitch(None)),
            Value::Number(n) => Ok(FeedLine::Pitch(n.as_f64().map(|hz| hz as f32))),
            other => Err(VocalJoystickError::InferenceError(format!(
                "Pitch must be a number or null, got {}",
                other
            ))),
        };
    }

    if let Some(results) = map.get("results") {
        let results: Vec<Classification> = serde_json::from_value(results.clone())
            .map_err(|e| VocalJoystickError::InferenceError(format!("Invalid results: {}", e)))?;
        return Ok(FeedLine::Classification(results));
    }

    if map.contains_key("label") {
        let entry: Classification = serde_json::from_value(Value::Object(map))
            .map_err(|e| VocalJoystickError::InferenceError(format!("Invalid label: {}", e)))?;
        return Ok(FeedLine::Classification(vec![entry]));
    }

    Err(VocalJoystickError::InferenceError(
        "Feed line has no pitch, label, results or error".to_string(),
    ))
}
