use crate::utils::audio::{decode_clip, AudioClip, CodecError};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error(transparent)]
    Decode(#[from] CodecError),
    #[error("unsupported audio format: {0}")]
    Unsupported(&'static str),
    #[error("playback refused: {0}")]
    Device(String),
}

/// A clip that is currently playing.
pub trait ActivePlayback: Send {
    fn stop(&mut self);

    fn is_finished(&self) -> bool;
}

/// Somewhere decoded audio can be played. `start` must return without waiting
/// for the clip to finish.
pub trait AudioSink: Send + Sync {
    fn start(&self, clip: AudioClip) -> Result<Box<dyn ActivePlayback>, PlaybackError>;
}

/// Sink for sessions without an output device: clips are dropped.
#[derive(Debug, Default)]
pub struct NullSink;

struct Finished;

impl ActivePlayback for Finished {
    fn stop(&mut self) {}

    fn is_finished(&self) -> bool {
        true
    }
}

impl AudioSink for NullSink {
    fn start(&self, clip: AudioClip) -> Result<Box<dyn ActivePlayback>, PlaybackError> {
        tracing::debug!("no audio output configured, dropping {} byte clip", clip.bytes().len());
        Ok(Box::new(Finished))
    }
}

/// Plays assistant audio, one clip at a time.
pub struct PlaybackController {
    sink: Arc<dyn AudioSink>,
    current: Mutex<Option<Box<dyn ActivePlayback>>>,
}

impl PlaybackController {
    pub fn new(sink: Arc<dyn AudioSink>) -> Self {
        Self {
            sink,
            current: Mutex::new(None),
        }
    }

    /// Decodes `transport` and starts playing it, stopping whatever was
    /// playing before.
    pub fn play(&self, transport: &str) -> Result<(), PlaybackError> {
        let clip = decode_clip(transport)?;
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut previous) = current.take() {
            previous.stop();
        }
        *current = Some(self.sink.start(clip)?);
        Ok(())
    }

    pub fn stop_all(&self) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut playback) = current.take() {
            tracing::debug!("stopping playback");
            playback.stop();
        }
    }

    pub fn is_playing(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|playback| !playback.is_finished())
    }
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new(Arc::new(NullSink))
    }
}

#[cfg(feature = "device")]
pub use cpal_sink::CpalSink;

#[cfg(feature = "device")]
mod cpal_sink {
    use super::{ActivePlayback, AudioSink, PlaybackError};
    use crate::utils::audio::{AudioClip, CaptureFormat};
    use crate::utils::device::PlaybackStream;

    /// Plays wav clips on an output device.
    #[derive(Debug, Default)]
    pub struct CpalSink {
        device_name: Option<String>,
    }

    impl CpalSink {
        pub fn new(device_name: Option<String>) -> Self {
            Self { device_name }
        }
    }

    impl ActivePlayback for PlaybackStream {
        fn stop(&mut self) {
            PlaybackStream::stop(self);
        }

        fn is_finished(&self) -> bool {
            PlaybackStream::is_finished(self)
        }
    }

    impl AudioSink for CpalSink {
        fn start(&self, clip: AudioClip) -> Result<Box<dyn ActivePlayback>, PlaybackError> {
            if clip.format() != CaptureFormat::Wav {
                return Err(PlaybackError::Unsupported(clip.format().mime()));
            }
            let stream = PlaybackStream::start(self.device_name.clone(), clip.bytes())
                .map_err(|e| PlaybackError::Device(e.to_string()))?;
            Ok(Box::new(stream))
        }
    }
}
