//! Audio blocks, units and media files.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Catalog identifier of a [`Unit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct UnitId(pub u64);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit#{}", self.0)
    }
}

/// Catalog identifier of a [`MediaFile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct MediaFileId(pub u64);

impl fmt::Display for MediaFileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mediafile#{}", self.0)
    }
}

/// A contiguous run of samples from one channel of a recording.
///
/// Produced by frame sources (fixed-size reads) and by the segmentation
/// engine (one block per emitted slice). Never mutated once built.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBlock {
    samples: Vec<f32>,
    channel: usize,
    position: usize,
    samplerate: u32,
}

impl AudioBlock {
    pub fn new(samples: Vec<f32>, channel: usize, position: usize, samplerate: u32) -> Self {
        Self {
            samples,
            channel,
            position,
            samplerate,
        }
    }

    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    #[inline]
    pub fn channel(&self) -> usize {
        self.channel
    }

    /// Absolute sample offset of the first sample within its channel.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    #[inline]
    pub fn samplerate(&self) -> u32 {
        self.samplerate
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Position one past the last sample.
    #[inline]
    pub fn end(&self) -> usize {
        self.position + self.samples.len()
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

/// A recording known to the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaFile {
    pub id: MediaFileId,
    /// Absolute path of the audio file
    pub path: PathBuf,
    pub channels: usize,
    pub samplerate: u32,
    /// Length of each channel in samples
    pub duration: usize,
}

impl MediaFile {
    /// File stem, used in log output and listings.
    pub fn name(&self) -> Option<&str> {
        self.path.file_stem().and_then(|s| s.to_str())
    }

    pub fn is_at(&self, path: &Path) -> bool {
        self.path == path
    }
}

/// A slice of one channel of a [`MediaFile`]; the atomic element of synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub media_file: MediaFileId,
    pub channel: usize,
    /// Absolute sample offset within the channel
    pub position: usize,
    /// Length in samples (always > 0 once catalogued)
    pub duration: usize,
    /// Cluster assigned by the most recent clustering run
    #[serde(default)]
    pub cluster: Option<usize>,
}

impl Unit {
    /// Position one past the last sample.
    #[inline]
    pub fn end(&self) -> usize {
        self.position + self.duration
    }
}

/// A target unit together with the unit chosen to replace it and the samples
/// being reshaped to fit.
///
/// Owned by exactly one synthesis run; each resynthesis stage consumes and
/// returns it.
#[derive(Debug, Clone)]
pub struct SynthesisContext {
    /// The unit of the target recording being replaced
    pub target: Unit,
    /// The corpus unit chosen to replace it
    pub selected: Unit,
    /// Working samples, initially the selected unit's audio
    pub samples: Vec<f32>,
    pub samplerate: u32,
}

impl SynthesisContext {
    pub fn new(target: Unit, selected: Unit) -> Self {
        Self {
            target,
            selected,
            samples: Vec::new(),
            samplerate: 0,
        }
    }

    pub fn with_samples(mut self, samples: Vec<f32>, samplerate: u32) -> Self {
        self.samples = samples;
        self.samplerate = samplerate;
        self
    }

    /// Whether the working samples exactly fill the target's slot.
    #[inline]
    pub fn fits_target(&self) -> bool {
        self.samples.len() == self.target.duration
    }
}
