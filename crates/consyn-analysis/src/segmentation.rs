//! Unit segmentation.
//!
//! The [`Segmenter`] consumes per-channel audio blocks in stream order and
//! emits one block per slice; a single block may complete several. Each
//! channel keeps its own [`SliceBuffer`]: the samples since the last emitted slice, the pending onsets, and the
//! boundary detector watching that channel.
//!
//! Onset `0` is seeded when a channel first appears, and when the input runs
//! out every channel flushes up to its last observed position. Emitted slices
//! of a channel are therefore contiguous and cover it exactly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use consyn_core::{AudioBlock, Error, Result, Stage};

use crate::detector::{BeatDetector, BoundaryDetector, RegularDetector};
use crate::onset::{OnsetConfig, OnsetDetector};

/// Slicing strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SlicerKind {
    /// Slice at detected onsets
    Onsets(OnsetConfig),
    /// Slice every `size` samples
    Regular { size: usize },
    /// Slice every `interval` of a bar at `bpm`
    Beats { bpm: f64, interval: String },
}

impl Default for SlicerKind {
    fn default() -> Self {
        SlicerKind::Onsets(OnsetConfig::default())
    }
}

impl SlicerKind {
    /// Build a fresh detector for one channel.
    pub fn detector(&self, samplerate: u32) -> Result<Box<dyn BoundaryDetector>> {
        Ok(match self {
            SlicerKind::Onsets(config) => {
                config.validate()?;
                Box::new(OnsetDetector::with_config(samplerate, config))
            }
            SlicerKind::Regular { size } => {
                if *size == 0 {
                    return Err(Error::InvalidConfig("regular slice size must be > 0".into()));
                }
                Box::new(RegularDetector::new(*size))
            }
            SlicerKind::Beats { bpm, interval } => {
                Box::new(BeatDetector::new(*bpm, interval, samplerate)?)
            }
        })
    }

    pub fn validate(&self) -> Result<()> {
        // Beat windows depend on the samplerate; any positive rate exposes bad input.
        self.detector(44100).map(|_| ())
    }
}

/// Settings for [`Segmenter`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    pub slicer: SlicerKind,
    /// A detected onset is accepted only if it lies more than this many
    /// samples after the first pending onset
    pub min_slice_size: usize,
}

impl SegmentationConfig {
    pub fn validate(&self) -> Result<()> {
        self.slicer.validate()
    }
}

type DetectorFactory = Box<dyn FnMut(u32) -> Result<Box<dyn BoundaryDetector>> + Send>;

/// Per-channel slicing state.
pub struct SliceBuffer {
    channel: usize,
    samplerate: u32,
    /// Samples from `onsets[0]` up to `last_position`
    buffer: Vec<f32>,
    /// Pending onsets; never more than two
    onsets: Vec<usize>,
    /// Position of the first sample the detector saw
    origin: usize,
    /// Position one past the last observed sample
    last_position: usize,
    detector: Box<dyn BoundaryDetector>,
}

impl SliceBuffer {
    fn new(channel: usize, position: usize, samplerate: u32, detector: Box<dyn BoundaryDetector>) -> Self {
        Self {
            channel,
            samplerate,
            buffer: Vec::new(),
            onsets: vec![position],
            origin: position,
            last_position: position,
            detector,
        }
    }

    pub fn channel(&self) -> usize {
        self.channel
    }

    pub fn pending_onsets(&self) -> &[usize] {
        &self.onsets
    }

    pub fn last_position(&self) -> usize {
        self.last_position
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Append a block; returns the absolute positions of the boundaries the
    /// detector found in it.
    fn append(&mut self, block: &AudioBlock) -> Vec<usize> {
        let mut boundaries = Vec::new();
        if block.position() > self.last_position {
            // A gap in the stream reads as silence.
            let gap = block.position() - self.last_position;
            tracing::warn!(channel = self.channel, gap, "gap in block stream; zero-filling");
            let silence = vec![0.0; gap];
            self.buffer.extend_from_slice(&silence);
            boundaries.extend(self.detector.observe(&silence));
            self.last_position = block.position();
        }

        self.buffer.extend_from_slice(block.samples());
        self.last_position = block.end();
        boundaries.extend(self.detector.observe(block.samples()));

        let origin = self.origin;
        boundaries.into_iter().map(|b| origin + b).collect()
    }

    /// Record a candidate onset unless it is too close to the first pending one.
    fn add_onset(&mut self, position: usize, min_slice_size: usize) {
        if position > self.last_position {
            return;
        }
        match self.onsets.first() {
            None => self.onsets.push(position),
            Some(&first) => {
                if position > first && position - first > min_slice_size {
                    self.onsets.push(position);
                }
            }
        }
    }

    /// Emit the slice between the two pending onsets, keeping the second.
    fn flush(&mut self) -> Option<AudioBlock> {
        if self.onsets.len() < 2 {
            return None;
        }
        let start = self.onsets[0];
        let end = self.onsets[1];
        let duration = (end - start).min(self.buffer.len());
        let samples: Vec<f32> = self.buffer.drain(..duration).collect();
        self.onsets.remove(0);

        Some(AudioBlock::new(samples, self.channel, start, self.samplerate))
    }

    /// Close the channel: the remainder becomes the last slice.
    fn finalize(mut self) -> Option<AudioBlock> {
        let end = self.last_position;
        self.onsets.truncate(1);
        self.onsets.push(end);
        let slice = self.flush()?;

        if slice.is_empty() {
            let err = Error::DegenerateUnit {
                channel: slice.channel(),
                position: slice.position(),
            };
            tracing::trace!("{}", err);
            return None;
        }
        Some(slice)
    }
}

/// Slicing engine over a stream of per-channel blocks.
pub struct Segmenter {
    min_slice_size: usize,
    factory: DetectorFactory,
    channels: BTreeMap<usize, SliceBuffer>,
}

impl Segmenter {
    pub fn new(config: SegmentationConfig) -> Self {
        let slicer = config.slicer;
        Self::with_factory(config.min_slice_size, move |samplerate| {
            slicer.detector(samplerate)
        })
    }

    /// Use a custom detector; `factory` is called once per channel with the
    /// channel's samplerate.
    pub fn with_factory<F>(min_slice_size: usize, factory: F) -> Self
    where
        F: FnMut(u32) -> Result<Box<dyn BoundaryDetector>> + Send + 'static,
    {
        Self {
            min_slice_size,
            factory: Box::new(factory),
            channels: BTreeMap::new(),
        }
    }

    pub fn min_slice_size(&self) -> usize {
        self.min_slice_size
    }

    /// Slicing state of `channel`, if it has been seen since the last finish.
    pub fn channel_state(&self, channel: usize) -> Option<&SliceBuffer> {
        self.channels.get(&channel)
    }

    /// Feed one block; returns the slices it completed, in position order.
    pub fn observe(&mut self, block: AudioBlock) -> Result<Vec<AudioBlock>> {
        let channel = block.channel();

        if !self.channels.contains_key(&channel) {
            let detector = (self.factory)(block.samplerate())?;
            tracing::debug!(channel, position = block.position(), "opening channel");
            self.channels.insert(
                channel,
                SliceBuffer::new(channel, block.position(), block.samplerate(), detector),
            );
        }

        let min_slice_size = self.min_slice_size;
        let Some(slice) = self.channels.get_mut(&channel) else {
            return Ok(Vec::new());
        };

        if block.position() < slice.last_position() {
            return Err(Error::InvalidConfig(format!(
                "block at {} on channel {} overlaps samples already seen (up to {})",
                block.position(),
                channel,
                slice.last_position()
            )));
        }

        let mut slices = Vec::new();
        for position in slice.append(&block) {
            slice.add_onset(position, min_slice_size);
            slices.extend(slice.flush());
        }
        Ok(slices)
    }

    /// Drop all channel state without emitting anything.
    pub fn reset(&mut self) {
        self.channels.clear();
    }

    /// End of input: close every open channel in channel order.
    ///
    /// Zero-length remainders are dropped. The segmenter is empty afterwards
    /// and can slice the next file.
    pub fn finish(&mut self) -> Vec<AudioBlock> {
        std::mem::take(&mut self.channels)
            .into_values()
            .filter_map(SliceBuffer::finalize)
            .collect()
    }
}

struct Slices<'a, I> {
    segmenter: &'a mut Segmenter,
    input: I,
    ready: std::vec::IntoIter<AudioBlock>,
    done: bool,
}

impl<'a, I> Iterator for Slices<'a, I>
where
    I: Iterator<Item = Result<AudioBlock>>,
{
    type Item = Result<AudioBlock>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(slice) = self.ready.next() {
                return Some(Ok(slice));
            }
            if self.done {
                return None;
            }

            match self.input.next() {
                Some(Ok(block)) => match self.segmenter.observe(block) {
                    Ok(slices) => self.ready = slices.into_iter(),
                    Err(e) => return Some(Err(e)),
                },
                Some(Err(e)) => return Some(Err(e)),
                None => {
                    self.done = true;
                    self.ready = self.segmenter.finish().into_iter();
                }
            }
        }
    }
}

impl Stage for Segmenter {
    type Input = Result<AudioBlock>;
    type Output = Result<AudioBlock>;

    fn transform<'a, I>(&'a mut self, input: I) -> Box<dyn Iterator<Item = Self::Output> + 'a>
    where
        I: Iterator<Item = Self::Input> + 'a,
    {
        Box::new(Slices {
            segmenter: self,
            input,
            ready: Vec::new().into_iter(),
            done: false,
        })
    }
}
