use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::io::Cursor;

pub const WAV_DATA_URL_PREFIX: &str = "data:audio/wav;base64,";
pub const WEBM_DATA_URL_PREFIX: &str = "data:audio/webm;base64,";

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("not a wav or webm audio data URL")]
    UnsupportedDataUrl,
    #[error("invalid base64 audio: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("audio clip is empty")]
    Empty,
    #[error("invalid wav data: {0}")]
    Wav(#[from] hound::Error),
}

/// Containers the capture side can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFormat {
    Wav,
    WebM,
}

impl CaptureFormat {
    const ALL: [CaptureFormat; 2] = [CaptureFormat::Wav, CaptureFormat::WebM];

    pub fn mime(&self) -> &'static str {
        match self {
            CaptureFormat::Wav => "audio/wav",
            CaptureFormat::WebM => "audio/webm",
        }
    }

    pub fn data_url_prefix(&self) -> &'static str {
        match self {
            CaptureFormat::Wav => WAV_DATA_URL_PREFIX,
            CaptureFormat::WebM => WEBM_DATA_URL_PREFIX,
        }
    }

    /// Identifies the container from its magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
            Some(CaptureFormat::Wav)
        } else if bytes.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
            Some(CaptureFormat::WebM)
        } else {
            None
        }
    }
}

/// Decoded audio ready to hand to an output device.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    format: CaptureFormat,
    bytes: Vec<u8>,
}

impl AudioClip {
    pub fn new(format: CaptureFormat, bytes: Vec<u8>) -> Self {
        Self { format, bytes }
    }

    pub fn format(&self) -> CaptureFormat {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

fn strip_data_url_prefix(s: &str) -> Option<&str> {
    CaptureFormat::ALL
        .iter()
        .find_map(|format| s.strip_prefix(format.data_url_prefix()))
}

/// Encodes captured audio into a transport string.
pub fn encode(raw: &[u8]) -> String {
    STANDARD.encode(raw)
}

/// Turns a browser-style `data:audio/...;base64,` URL into a transport string.
pub fn encode_data_url(url: &str) -> Result<String, CodecError> {
    let payload = strip_data_url_prefix(url.trim()).ok_or(CodecError::UnsupportedDataUrl)?;
    STANDARD.decode(payload)?;
    Ok(payload.to_string())
}

/// Decodes a transport string back to raw bytes. A leading wav/webm data-URI
/// prefix is tolerated.
pub fn decode(transport: &str) -> Result<Vec<u8>, CodecError> {
    let trimmed = transport.trim();
    let payload = strip_data_url_prefix(trimmed).unwrap_or(trimmed);
    Ok(STANDARD.decode(payload)?)
}

/// Decodes a transport string into a playable clip. Unrecognised containers
/// are treated as wav, which is what the backend replies with.
pub fn decode_clip(transport: &str) -> Result<AudioClip, CodecError> {
    let bytes = decode(transport)?;
    if bytes.is_empty() {
        return Err(CodecError::Empty);
    }
    let format = CaptureFormat::sniff(&bytes).unwrap_or(CaptureFormat::Wav);
    Ok(AudioClip::new(format, bytes))
}

/// Writes mono or interleaved f32 samples as a 16-bit PCM wav file.
pub fn wav_from_samples(samples: &[f32], sample_rate: u32, channels: u16) -> Result<Vec<u8>, CodecError> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            let pcm16 = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer.write_sample(pcm16)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Reads a wav file into f32 samples in `[-1.0, 1.0]`, interleaved when the
/// file has more than one channel.
pub fn wav_to_samples(bytes: &[u8]) -> Result<(Vec<f32>, hound::WavSpec), CodecError> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| (v as f32 / scale).clamp(-1.0, 1.0)))
                .collect::<Result<Vec<_>, _>>()?
        }
    };
    tracing::debug!(
        "decoded wav: {} samples, {}hz, {}ch",
        samples.len(),
        spec.sample_rate,
        spec.channels
    );
    Ok((samples, spec))
}
