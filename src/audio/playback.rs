//! Audio playback to speakers
//!
//! Clips arrive as encoded bytes (MP3 from the speech API, WAV for local
//! files such as ack clips). Decoding happens here; playback runs on a
//! blocking thread because cpal streams are not `Send`.

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleRate;

use crate::engines::Player;
use crate::{Error, Result};

/// Fallback sample rate when a clip does not advertise one
const DEFAULT_SAMPLE_RATE: u32 = 24000;

/// Plays audio clips on the default output device
pub struct CpalPlayer {
    _priv: (),
}

impl CpalPlayer {
    /// Create a new player, verifying an output device exists
    ///
    /// # Errors
    ///
    /// Returns error if no output device is available
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            "audio playback initialized"
        );

        Ok(Self { _priv: () })
    }

    /// Play raw f32 samples at the given rate, blocking until done
    ///
    /// # Errors
    ///
    /// Returns error if the output stream cannot be built or started
    pub async fn play_samples(&self, samples: Vec<f32>, sample_rate: u32) -> Result<()> {
        tokio::task::spawn_blocking(move || play_samples_blocking(&samples, sample_rate))
            .await
            .map_err(|e| Error::Playback(format!("playback task failed: {e}")))?
    }
}

#[async_trait]
impl Player for CpalPlayer {
    async fn play(&self, audio: &[u8]) -> Result<()> {
        let (samples, sample_rate) = decode_clip(audio)?;
        self.play_samples(samples, sample_rate).await
    }
}

/// Decode an encoded clip to mono f32 samples plus its sample rate
///
/// WAV is detected by the RIFF magic; everything else is treated as MP3.
fn decode_clip(audio: &[u8]) -> Result<(Vec<f32>, u32)> {
    if audio.starts_with(b"RIFF") {
        decode_wav(audio)
    } else {
        decode_mp3(audio)
    }
}

/// Decode WAV bytes to f32 samples
fn decode_wav(data: &[u8]) -> Result<(Vec<f32>, u32)> {
    let mut reader = hound::WavReader::new(Cursor::new(data))
        .map_err(|e| Error::Audio(format!("WAV decode error: {e}")))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max = f32::from(i16::MAX);
            reader
                .samples::<i16>()
                .map(|s| s.map(|v| f32::from(v) / max))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::Audio(format!("WAV decode error: {e}")))?
        }
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::Audio(format!("WAV decode error: {e}")))?,
    };

    let mono = if spec.channels == 2 {
        samples
            .chunks(2)
            .map(|c| f32::midpoint(c[0], c.get(1).copied().unwrap_or(c[0])))
            .collect()
    } else {
        samples
    };

    Ok((mono, spec.sample_rate))
}

/// Decode MP3 bytes to f32 samples
fn decode_mp3(mp3_data: &[u8]) -> Result<(Vec<f32>, u32)> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();
    let mut sample_rate = DEFAULT_SAMPLE_RATE;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                #[allow(clippy::cast_sign_loss)]
                {
                    sample_rate = frame.sample_rate.max(8000) as u32;
                }

                // Convert i16 samples to f32 and handle stereo to mono
                let frame_samples: Vec<f32> = if frame.channels == 2 {
                    // Stereo: average channels
                    frame
                        .data
                        .chunks(2)
                        .map(|chunk| {
                            let left = f32::from(chunk[0]) / 32768.0;
                            let right =
                                f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                            f32::midpoint(left, right)
                        })
                        .collect()
                } else {
                    // Mono
                    frame.data.iter().map(|&s| f32::from(s) / 32768.0).collect()
                };

                samples.extend(frame_samples);
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    Ok((samples, sample_rate))
}

/// Play samples on the default output device, blocking until complete
fn play_samples_blocking(samples: &[f32], sample_rate: u32) -> Result<()> {
    if samples.is_empty() {
        return Ok(());
    }

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device".to_string()))?;

    let supported_config = device
        .supported_output_configs()
        .map_err(|e| Error::Audio(e.to_string()))?
        .find(|c| {
            c.channels() == 1
                && c.min_sample_rate() <= SampleRate(sample_rate)
                && c.max_sample_rate() >= SampleRate(sample_rate)
        })
        .or_else(|| {
            // Fallback: try stereo
            device.supported_output_configs().ok()?.find(|c| {
                c.channels() == 2
                    && c.min_sample_rate() <= SampleRate(sample_rate)
                    && c.max_sample_rate() >= SampleRate(sample_rate)
            })
        })
        .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

    let config = supported_config
        .with_sample_rate(SampleRate(sample_rate))
        .config();
    let channels = config.channels as usize;

    let samples = Arc::new(Mutex::new(samples.to_vec()));
    let position = Arc::new(Mutex::new(0usize));
    let finished = Arc::new(Mutex::new(false));
    let finished_clone = Arc::clone(&finished);

    let samples_clone = Arc::clone(&samples);
    let position_clone = Arc::clone(&position);

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let Ok(samples) = samples_clone.lock() else {
                    return;
                };
                let Ok(mut pos) = position_clone.lock() else {
                    return;
                };

                for frame in data.chunks_mut(channels) {
                    let sample = if *pos < samples.len() {
                        samples[*pos]
                    } else {
                        if let Ok(mut done) = finished_clone.lock() {
                            *done = true;
                        }
                        0.0
                    };

                    for out in frame.iter_mut() {
                        *out = sample;
                    }

                    if *pos < samples.len() {
                        *pos += 1;
                    }
                }
            },
            |err| {
                tracing::error!(error = %err, "audio playback error");
            },
            None,
        )
        .map_err(|e| Error::Playback(e.to_string()))?;

    stream.play().map_err(|e| Error::Playback(e.to_string()))?;

    // Wait for playback to finish
    let sample_count = samples.lock().map(|s| s.len()).unwrap_or(0);
    let duration_ms = (sample_count as u64 * 1000) / u64::from(sample_rate);

    // Poll for completion with timeout
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(duration_ms + 500);

    while !finished.lock().map(|f| *f).unwrap_or(true) {
        if start.elapsed() > timeout {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(50));
    }

    // Small delay to let the device drain
    std::thread::sleep(std::time::Duration::from_millis(100));

    drop(stream);
    tracing::debug!(samples = sample_count, sample_rate, "playback complete");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a small mono 16-bit WAV in memory
    fn wav_bytes(sample_rate: u32, samples: &[i16]) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    // ---- decode_clip ----

    #[test]
    fn decodes_wav_with_rate() {
        let data = wav_bytes(16000, &[0, i16::MAX / 2, i16::MIN / 2, 0]);
        let (samples, rate) = decode_clip(&data).unwrap();
        assert_eq!(rate, 16000);
        assert_eq!(samples.len(), 4);
        assert!((samples[1] - 0.5).abs() < 0.01);
    }

    #[test]
    fn rejects_garbage_mp3() {
        // Not RIFF, not MP3 frames — decodes to zero samples
        let (samples, _) = decode_clip(&[0x00, 0x01, 0x02, 0x03]).unwrap();
        assert!(samples.is_empty());
    }

    #[test]
    fn stereo_wav_averaged_to_mono() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for s in [1000i16, 3000, -1000, -3000] {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        let (samples, rate) = decode_clip(&cursor.into_inner()).unwrap();
        assert_eq!(rate, 22050);
        assert_eq!(samples.len(), 2);
    }
}
