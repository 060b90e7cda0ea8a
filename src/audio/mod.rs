pub mod frames;
#[cfg(feature = "audio-io")]
pub mod input;
pub mod loudness;

pub use frames::{frame_channel, frame_len, FrameAssembler, FRAME_CHANNEL_CAPACITY};
#[cfg(feature = "audio-io")]
pub use input::AudioInput;
pub use loudness::{frame_level, LoudnessMonitor, NoiseGate};
