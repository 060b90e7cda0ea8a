pub mod audio;
pub mod channels;
pub mod control;
pub mod integration;
pub mod messages;
pub mod remote;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum VocalJoystickError {
    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    #[error("Model load error: {0}")]
    ModelLoadError(String),

    #[error("Inference error: {0}")]
    InferenceError(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for VocalJoystickError {
    fn from(e: std::io::Error) -> Self {
        VocalJoystickError::IOError(e.to_string())
    }
}

impl VocalJoystickError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Capture and model setup failures end the session before it starts
            VocalJoystickError::AudioDeviceError(_) => false,
            VocalJoystickError::ModelLoadError(_) => false,
            // A failed estimate is the same as no estimate this tick
            VocalJoystickError::InferenceError(_) => true,
            // Sends are dropped while the actuator is away
            VocalJoystickError::TransportError(_) => true,
            VocalJoystickError::ConfigError(_) => false,
            VocalJoystickError::IOError(_) => false,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            VocalJoystickError::AudioDeviceError(_) => {
                "Microphone unavailable. Please check permissions and the input device.".to_string()
            }
            VocalJoystickError::ModelLoadError(_) => {
                "Failed to load the voice models.".to_string()
            }
            VocalJoystickError::InferenceError(_) => {
                "Voice analysis skipped a sample.".to_string()
            }
            VocalJoystickError::TransportError(_) => {
                "Waiting for the pointer driver.".to_string()
            }
            VocalJoystickError::ConfigError(_) => {
                "Configuration error. Please check settings.".to_string()
            }
            VocalJoystickError::IOError(_) => "File system error occurred.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, VocalJoystickError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(!VocalJoystickError::AudioDeviceError("denied".into()).is_recoverable());
        assert!(!VocalJoystickError::ModelLoadError("missing".into()).is_recoverable());
        assert!(VocalJoystickError::InferenceError("nan".into()).is_recoverable());
        assert!(VocalJoystickError::TransportError("closed".into()).is_recoverable());
    }

    #[test]
    fn test_io_error_conversion() {
        let err: VocalJoystickError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, VocalJoystickError::IOError(_)));
        assert_eq!(err.user_message(), "File system error occurred.");
    }
}
