//! Random-access audio sources.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavReader};

use consyn_core::{Error, Result};

/// A multichannel recording that can be read from any frame.
pub trait AudioSource {
    fn path(&self) -> &Path;

    fn channels(&self) -> usize;

    fn samplerate(&self) -> u32;

    /// Length of each channel in samples.
    fn duration(&self) -> usize;

    /// Move the read cursor to `frame`.
    fn seek(&mut self, frame: usize) -> Result<()>;

    /// Read up to `frames` frames from the cursor, one vector per channel.
    ///
    /// Vectors are shorter than `frames` only at the end of the source, and
    /// empty once it is exhausted.
    fn read(&mut self, frames: usize) -> Result<Vec<Vec<f32>>>;
}

/// WAV file source (integer or float samples, normalized to `-1.0..1.0`).
pub struct WavSource {
    path: PathBuf,
    reader: WavReader<BufReader<File>>,
    channels: usize,
    samplerate: u32,
    duration: usize,
    format: SampleFormat,
    bits_per_sample: u16,
    cursor: usize,
}

impl WavSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let reader = WavReader::open(&path).map_err(|e| Error::unreadable(&path, e))?;
        let spec = reader.spec();

        if spec.channels == 0 {
            return Err(Error::unreadable(&path, "no channels"));
        }

        tracing::debug!(
            path = %path.display(),
            channels = spec.channels,
            samplerate = spec.sample_rate,
            frames = reader.duration(),
            "opened wav source"
        );

        Ok(Self {
            channels: spec.channels as usize,
            samplerate: spec.sample_rate,
            duration: reader.duration() as usize,
            format: spec.sample_format,
            bits_per_sample: spec.bits_per_sample,
            cursor: 0,
            reader,
            path,
        })
    }

    fn read_interleaved(&mut self, count: usize) -> Result<Vec<f32>> {
        let path = &self.path;
        match self.format {
            SampleFormat::Float => self
                .reader
                .samples::<f32>()
                .take(count)
                .map(|s| s.map_err(|e| Error::unreadable(path, e)))
                .collect(),
            SampleFormat::Int => {
                let scale = 1.0 / (1u64 << (self.bits_per_sample.clamp(1, 32) - 1)) as f32;
                self.reader
                    .samples::<i32>()
                    .take(count)
                    .map(|s| {
                        s.map(|v| v as f32 * scale)
                            .map_err(|e| Error::unreadable(path, e))
                    })
                    .collect()
            }
        }
    }
}

impl AudioSource for WavSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn samplerate(&self) -> u32 {
        self.samplerate
    }

    fn duration(&self) -> usize {
        self.duration
    }

    fn seek(&mut self, frame: usize) -> Result<()> {
        let frame = frame.min(self.duration);
        let target = u32::try_from(frame)
            .map_err(|_| Error::unreadable(&self.path, format!("cannot seek to frame {}", frame)))?;
        self.reader
            .seek(target)
            .map_err(|e| Error::unreadable(&self.path, e))?;
        self.cursor = frame;
        Ok(())
    }

    fn read(&mut self, frames: usize) -> Result<Vec<Vec<f32>>> {
        let frames = frames.min(self.duration - self.cursor);
        let interleaved = self.read_interleaved(frames * self.channels)?;
        self.cursor += interleaved.len() / self.channels;
        Ok(deinterleave(&interleaved, self.channels))
    }
}

/// Source backed by per-channel sample vectors.
///
/// Useful for synthetic corpora and tests; `path` is only an identifier.
#[derive(Debug, Clone)]
pub struct MemorySource {
    path: PathBuf,
    channels: Vec<Vec<f32>>,
    samplerate: u32,
    cursor: usize,
}

impl MemorySource {
    /// Channels must be non-empty and of equal length.
    pub fn new(path: impl Into<PathBuf>, channels: Vec<Vec<f32>>, samplerate: u32) -> Result<Self> {
        let path = path.into();
        let Some(first) = channels.first() else {
            return Err(Error::unreadable(&path, "no channels"));
        };
        if channels.iter().any(|c| c.len() != first.len()) {
            return Err(Error::unreadable(&path, "channels differ in length"));
        }
        Ok(Self {
            path,
            channels,
            samplerate,
            cursor: 0,
        })
    }

    pub fn mono(path: impl Into<PathBuf>, samples: Vec<f32>, samplerate: u32) -> Self {
        Self {
            path: path.into(),
            channels: vec![samples],
            samplerate,
            cursor: 0,
        }
    }
}

impl AudioSource for MemorySource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn channels(&self) -> usize {
        self.channels.len()
    }

    fn samplerate(&self) -> u32 {
        self.samplerate
    }

    fn duration(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    fn seek(&mut self, frame: usize) -> Result<()> {
        self.cursor = frame.min(self.duration());
        Ok(())
    }

    fn read(&mut self, frames: usize) -> Result<Vec<Vec<f32>>> {
        let end = (self.cursor + frames).min(self.duration());
        let start = self.cursor;
        self.cursor = end;
        Ok(self
            .channels
            .iter()
            .map(|c| c[start..end].to_vec())
            .collect())
    }
}

fn deinterleave(interleaved: &[f32], channels: usize) -> Vec<Vec<f32>> {
    let frames = interleaved.len() / channels;
    let mut out = vec![Vec::with_capacity(frames); channels];
    for frame in interleaved.chunks_exact(channels) {
        for (channel, &sample) in out.iter_mut().zip(frame) {
            channel.push(sample);
        }
    }
    out
}
