//! Sample sinks.
//!
//! Where a finished output buffer goes: a WAV file via hound, or memory.

use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::error::{ExportError, Result};

/// Bit depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitDepth {
    Int16,
    Int24,
    #[default]
    Float32,
}

impl BitDepth {
    /// Bits per sample.
    pub fn bits(&self) -> u16 {
        match self {
            BitDepth::Int16 => 16,
            BitDepth::Int24 => 24,
            BitDepth::Float32 => 32,
        }
    }
}

/// Receives finished, non-interleaved output buffers.
pub trait SampleSink {
    fn write(&mut self, path: &Path, samplerate: u32, channels: &[Vec<f32>]) -> Result<()>;
}

/// Writes WAV files.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavSink {
    bit_depth: BitDepth,
}

impl WavSink {
    pub fn new(bit_depth: BitDepth) -> Self {
        Self { bit_depth }
    }

    pub fn bit_depth(&self) -> BitDepth {
        self.bit_depth
    }

    fn spec(&self, channels: u16, samplerate: u32) -> WavSpec {
        WavSpec {
            channels,
            sample_rate: samplerate,
            bits_per_sample: self.bit_depth.bits(),
            sample_format: match self.bit_depth {
                BitDepth::Float32 => SampleFormat::Float,
                _ => SampleFormat::Int,
            },
        }
    }
}

impl SampleSink for WavSink {
    fn write(&mut self, path: &Path, samplerate: u32, channels: &[Vec<f32>]) -> Result<()> {
        let frames = check_shape(channels)?;
        let count = u16::try_from(channels.len())
            .map_err(|_| ExportError::InvalidBuffer(format!("{} channels", channels.len())))?;

        let mut writer = WavWriter::create(path, self.spec(count, samplerate))?;
        for frame in 0..frames {
            for channel in channels {
                let sample = channel[frame];
                match self.bit_depth {
                    BitDepth::Int16 => writer.write_sample(float_to_i16(sample))?,
                    BitDepth::Int24 => writer.write_sample(float_to_i24(sample))?,
                    BitDepth::Float32 => writer.write_sample(sample)?,
                }
            }
        }
        writer.finalize()?;

        tracing::info!(path = %path.display(), channels = channels.len(), frames, "wrote output");
        Ok(())
    }
}

/// Keeps written buffers in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub written: Vec<(PathBuf, u32, Vec<Vec<f32>>)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SampleSink for MemorySink {
    fn write(&mut self, path: &Path, samplerate: u32, channels: &[Vec<f32>]) -> Result<()> {
        check_shape(channels)?;
        self.written
            .push((path.to_path_buf(), samplerate, channels.to_vec()));
        Ok(())
    }
}

/// Frames per channel; every channel must have the same length.
fn check_shape(channels: &[Vec<f32>]) -> Result<usize> {
    let frames = channels
        .first()
        .map(Vec::len)
        .ok_or_else(|| ExportError::InvalidBuffer("no channels".into()))?;
    if channels.iter().any(|c| c.len() != frames) {
        return Err(ExportError::InvalidBuffer(
            "channels have different lengths".into(),
        ));
    }
    Ok(frames)
}

/// Convert float sample to 16-bit integer
#[inline]
fn float_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0) as i16
}

/// Convert float sample to 24-bit integer (stored in i32)
#[inline]
fn float_to_i24(sample: f32) -> i32 {
    (sample.clamp(-1.0, 1.0) * 8_388_607.0) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    #[test]
    fn test_float_wav_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let channels = vec![vec![0.0, 0.5, -0.5], vec![0.25, -0.25, 1.0]];

        WavSink::default().write(&path, 22050, &channels).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 22050);
        assert_eq!(spec.sample_format, SampleFormat::Float);

        let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0.0, 0.25, 0.5, -0.25, -0.5, 1.0]);
    }

    #[test]
    fn test_int16_wav() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out16.wav");

        WavSink::new(BitDepth::Int16)
            .write(&path, 8000, &[vec![0.5, -1.0, 2.0]])
            .unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().bits_per_sample, 16);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![16383, -32767, 32767]);
    }

    #[test]
    fn test_ragged_buffer_rejected() {
        let mut sink = MemorySink::new();
        let result = sink.write(Path::new("x.wav"), 8000, &[vec![0.0; 3], vec![0.0; 2]]);
        assert!(matches!(result, Err(ExportError::InvalidBuffer(_))));
        assert!(sink.write(Path::new("x.wav"), 8000, &[]).is_err());
        assert!(sink.written.is_empty());
    }

    #[test]
    fn test_sample_conversion() {
        assert_eq!(float_to_i16(0.0), 0);
        assert_eq!(float_to_i16(1.0), 32767);
        assert_eq!(float_to_i16(-1.0), -32767);
        assert_relative_eq!(float_to_i24(0.5) as f32, 4_194_303.5, epsilon = 1.0);
    }
}
