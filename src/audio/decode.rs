//! Audio decoding using symphonia
//!
//! Decodes an uploaded file (MP3, FLAC, AAC, M4A, Vorbis, WAV) from memory to
//! mono f32 PCM at the file's native sample rate. Multi-channel sources are
//! downmixed by averaging channels; the analysis pipeline is mono-only.

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;
use tracing::{debug, warn};

/// Audio decode errors
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unrecognized or unsupported audio format: {0}")]
    Probe(String),

    #[error("no audio track found")]
    NoTrack,

    #[error("sample rate not found")]
    MissingSampleRate,

    #[error("channel count not found")]
    MissingChannels,

    #[error("audio stream reports zero channels")]
    NoChannels,

    #[error("failed to create decoder: {0}")]
    Codec(String),

    #[error("no samples could be decoded")]
    Empty,
}

/// Decoded audio: mono samples at the source's native rate
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Mono f32 samples, normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Native sample rate in Hz
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Total duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decode an in-memory audio file to mono f32 samples.
///
/// `extension` is an optional format hint taken from the uploaded filename.
pub fn decode_bytes(data: Vec<u8>, extension: Option<&str>) -> Result<DecodedAudio, DecodeError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(data)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| DecodeError::Probe(e.to_string()))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoTrack)?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let sample_rate = codec_params
        .sample_rate
        .ok_or(DecodeError::MissingSampleRate)?;

    let channels = codec_params
        .channels
        .map(|c| c.count())
        .ok_or(DecodeError::MissingChannels)?;
    if channels == 0 {
        // An empty channel bitmask would make the downmix divide by zero
        return Err(DecodeError::NoChannels);
    }

    debug!(
        "Audio format: sample_rate={}, channels={}",
        sample_rate, channels
    );

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| DecodeError::Codec(e.to_string()))?;

    let mut samples = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break; // end of stream
            }
            Err(e) => {
                warn!("Error reading packet: {}", e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                if sample_buf.is_none() {
                    let spec = *decoded.spec();
                    let capacity = decoded.capacity() as u64;
                    sample_buf = Some(SampleBuffer::new(capacity, spec));
                }

                if let Some(buf) = sample_buf.as_mut() {
                    buf.copy_interleaved_ref(decoded);

                    // Downmix interleaved frames to mono
                    for frame in buf.samples().chunks_exact(channels) {
                        samples.push(frame.iter().sum::<f32>() / channels as f32);
                    }
                }
            }
            Err(e) => {
                warn!("Decode error: {}", e);
                continue;
            }
        }
    }

    if samples.is_empty() {
        return Err(DecodeError::Empty);
    }

    debug!(
        "Decoded {} mono samples ({:.2}s)",
        samples.len(),
        samples.len() as f64 / sample_rate as f64
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
    })
}
