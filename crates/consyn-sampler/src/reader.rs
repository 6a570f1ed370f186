//! Block streaming and unit reads.

use std::path::Path;

use consyn_core::{AudioBlock, Error, MediaFile, Result, Unit};

use crate::cache::SourceCache;
use crate::source::{AudioSource, WavSource};

/// Streams a source as consecutive blocks of `bufsize` frames.
///
/// Each read yields one block per channel, in channel order, so blocks of a
/// channel arrive with non-decreasing positions starting at 0. The last read
/// may be short; a read that returns nothing ends the stream. After an error
/// the reader yields nothing further.
pub struct FrameReader {
    source: Box<dyn AudioSource>,
    bufsize: usize,
    position: usize,
    ready: std::vec::IntoIter<AudioBlock>,
    done: bool,
}

impl FrameReader {
    /// Stream a WAV file.
    pub fn open(path: impl AsRef<Path>, bufsize: usize) -> Result<Self> {
        Ok(Self::new(Box::new(WavSource::open(path)?), bufsize))
    }

    pub fn new(source: Box<dyn AudioSource>, bufsize: usize) -> Self {
        Self {
            source,
            bufsize: bufsize.max(1),
            position: 0,
            ready: Vec::new().into_iter(),
            done: false,
        }
    }

    pub fn channels(&self) -> usize {
        self.source.channels()
    }

    pub fn samplerate(&self) -> u32 {
        self.source.samplerate()
    }

    /// Frames per channel in the underlying source.
    pub fn duration(&self) -> usize {
        self.source.duration()
    }

    pub fn path(&self) -> &Path {
        self.source.path()
    }

    fn fill(&mut self) -> Result<bool> {
        let channels = self.source.read(self.bufsize)?;
        let frames = channels.first().map_or(0, Vec::len);
        if frames == 0 {
            return Ok(false);
        }

        let samplerate = self.source.samplerate();
        let position = self.position;
        self.position += frames;
        self.ready = channels
            .into_iter()
            .enumerate()
            .map(|(channel, samples)| AudioBlock::new(samples, channel, position, samplerate))
            .collect::<Vec<_>>()
            .into_iter();
        Ok(true)
    }
}

impl Iterator for FrameReader {
    type Item = Result<AudioBlock>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(block) = self.ready.next() {
            return Some(Ok(block));
        }
        if self.done {
            return None;
        }

        match self.fill() {
            Ok(true) => self.ready.next().map(Ok),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Samples of `unit` read from its media file.
///
/// Exactly `unit.duration` samples are returned; reads past the end of the
/// file are zero-filled.
pub fn read_unit(cache: &mut SourceCache, media: &MediaFile, unit: &Unit) -> Result<Vec<f32>> {
    let source = cache.get(&media.path)?;
    if unit.channel >= source.channels() {
        return Err(Error::unreadable(
            &media.path,
            format!(
                "{} reads channel {} of a {}-channel file",
                unit.id,
                unit.channel,
                source.channels()
            ),
        ));
    }

    source.seek(unit.position)?;
    let mut samples = source
        .read(unit.duration)?
        .into_iter()
        .nth(unit.channel)
        .unwrap_or_default();

    if samples.len() < unit.duration {
        tracing::trace!(
            unit = %unit.id,
            short = unit.duration - samples.len(),
            "zero-filling unit read past end of file"
        );
        samples.resize(unit.duration, 0.0);
    }
    Ok(samples)
}
