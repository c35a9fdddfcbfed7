/// Microphone recording used by voice turns.
pub trait AudioCapture: Send {
    /// Begins recording. Permission or device failures are reported here.
    fn start(&mut self) -> Result<(), CaptureError>;

    /// Ends recording and returns the captured clip (wav or webm bytes).
    fn stop(&mut self) -> Result<Vec<u8>, CaptureError>;

    /// Ends recording and throws the clip away.
    fn cancel(&mut self) {
        if let Err(e) = self.stop() {
            tracing::debug!("discarding recording: {}", e);
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("microphone unavailable: {0}")]
    Unavailable(String),
    #[error("recording failed: {0}")]
    Failed(String),
    #[error("not recording")]
    NotRecording,
}

#[cfg(feature = "device")]
pub use cpal_capture::CpalCapture;

#[cfg(feature = "device")]
mod cpal_capture {
    use super::{AudioCapture, CaptureError};
    use crate::utils::device::CaptureStream;

    /// Records the input device into a wav clip.
    #[derive(Default)]
    pub struct CpalCapture {
        device_name: Option<String>,
        stream: Option<CaptureStream>,
    }

    impl CpalCapture {
        pub fn new(device_name: Option<String>) -> Self {
            Self {
                device_name,
                stream: None,
            }
        }
    }

    impl AudioCapture for CpalCapture {
        fn start(&mut self) -> Result<(), CaptureError> {
            if self.stream.is_some() {
                return Ok(());
            }
            let stream = CaptureStream::start(self.device_name.clone())
                .map_err(|e| CaptureError::Unavailable(e.to_string()))?;
            self.stream = Some(stream);
            Ok(())
        }

        fn stop(&mut self) -> Result<Vec<u8>, CaptureError> {
            let stream = self.stream.take().ok_or(CaptureError::NotRecording)?;
            stream.stop().map_err(|e| CaptureError::Failed(e.to_string()))
        }
    }
}
