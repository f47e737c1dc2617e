use base64::prelude::*;
use std::time::Duration;

use crate::Result;

/// Sample rate of the speech synthesis output and of every WAV we write
pub const SAMPLE_RATE: u32 = 24_000;

/// Narration is always mono
pub const CHANNELS: u16 = 1;

pub const BITS_PER_SAMPLE: u16 = 16;

/// Size of the canonical RIFF/WAVE header preceding the sample data
pub const WAV_HEADER_LEN: usize = 44;

/// Encode raw bytes as standard padded base64
pub fn encode_base64(bytes: &[u8]) -> String {
    BASE64_STANDARD.encode(bytes)
}

/// Decode a standard padded base64 payload into raw bytes
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    Ok(BASE64_STANDARD.decode(data.trim())?)
}

/// Convert interleaved signed 16-bit little-endian PCM into one normalized
/// sample vector per channel.
///
/// Each sample is divided by 32768, so the result lies in [-1, 1). A dangling
/// odd byte or an incomplete trailing frame is dropped.
pub fn pcm16_to_f32(data: &[u8], channels: usize) -> Vec<Vec<f32>> {
    let channels = channels.max(1);
    let samples: Vec<i16> = data
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let frame_count = samples.len() / channels;

    (0..channels)
        .map(|channel| {
            (0..frame_count)
                .map(|frame| samples[frame * channels + channel] as f32 / 32768.0)
                .collect()
        })
        .collect()
}

/// Re-quantize a normalized sample to signed 16-bit.
///
/// Negative values scale by 32768 and non-negative values by 32767, so -1.0
/// maps to i16::MIN and 1.0 to i16::MAX.
fn quantize(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    let scaled = if clamped < 0.0 {
        clamped * 32768.0
    } else {
        clamped * 32767.0
    };
    scaled.round() as i16
}

fn write_wav_header(out: &mut Vec<u8>, data_len: u32) {
    let block_align = CHANNELS * BITS_PER_SAMPLE / 8;
    let byte_rate = SAMPLE_RATE * block_align as u32;

    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(32 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&CHANNELS.to_le_bytes());
    out.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
}

/// Encode mono normalized samples as a 24kHz 16-bit PCM WAV file.
///
/// The RIFF chunk size field holds `32 + 2N` rather than the usual `36 + 2N`;
/// players accept it and existing clips were written this way.
pub fn encode_wav(samples: &[f32]) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let mut out = Vec::with_capacity(WAV_HEADER_LEN + samples.len() * 2);

    write_wav_header(&mut out, data_len);
    for &sample in samples {
        out.extend_from_slice(&quantize(sample).to_le_bytes());
    }

    out
}

/// Wrap raw mono PCM from the speech backend into a playable WAV container
pub fn pcm16_to_wav(data: &[u8]) -> Vec<u8> {
    let mut channels = pcm16_to_f32(data, CHANNELS as usize);
    let mono = channels.pop().unwrap_or_default();
    encode_wav(&mono)
}

/// Number of samples carried by a WAV produced by [`encode_wav`]
pub fn wav_sample_count(wav_len: usize) -> usize {
    wav_len.saturating_sub(WAV_HEADER_LEN) / 2
}

/// Playback length of `sample_count` mono samples at [`SAMPLE_RATE`]
pub fn wav_duration(sample_count: usize) -> Duration {
    Duration::from_secs_f64(sample_count as f64 / SAMPLE_RATE as f64)
}
