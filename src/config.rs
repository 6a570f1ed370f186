//! Engine configuration.
//!
//! Every knob has a default, so a JSON file only needs the values it changes:
//!
//! ```json
//! {
//!   "bufsize": 2048,
//!   "segmentation": { "slicer": { "kind": "regular", "size": 4410 } },
//!   "resynthesis": { "stages": [ { "stage": "time_stretch" }, { "stage": "envelope", "fade": 64 } ] }
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use consyn_analysis::SegmentationConfig;
use consyn_catalog::ClusterConfig;
use consyn_core::{Error as CoreError, DEFAULT_FEATURE_SLOTS};
use consyn_dsp::ResynthesisConfig;
use consyn_sampler::DEFAULT_MAX_OPEN_FILES;

use crate::Result;

/// How corpus units are chosen for each target unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SelectionMode {
    /// Closest features by L1 distance
    #[default]
    Nearest,
    /// Uniformly random corpus unit
    Random {
        #[serde(default)]
        seed: Option<u64>,
    },
}

/// Configuration for the synthesis engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsynConfig {
    /// Maximum slots per feature vector
    pub feature_slots: usize,
    /// Frames per block read from a source; also the feature analysis window
    pub bufsize: usize,
    /// Feature analysis hop
    pub hopsize: usize,
    /// Sources kept open at once during synthesis
    pub max_open_files: usize,
    pub segmentation: SegmentationConfig,
    pub selection: SelectionMode,
    pub resynthesis: ResynthesisConfig,
    pub clustering: ClusterConfig,
}

impl Default for ConsynConfig {
    fn default() -> Self {
        Self {
            feature_slots: DEFAULT_FEATURE_SLOTS,
            bufsize: 1024,
            hopsize: 512,
            max_open_files: DEFAULT_MAX_OPEN_FILES,
            segmentation: SegmentationConfig::default(),
            selection: SelectionMode::default(),
            resynthesis: ResynthesisConfig::default(),
            clustering: ClusterConfig::default(),
        }
    }
}

impl ConsynConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CoreError::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)
            .map_err(|e| CoreError::Serialization(e.to_string()))?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.feature_slots == 0 {
            return Err(invalid("feature_slots must be > 0".into()));
        }
        if self.bufsize == 0 {
            return Err(invalid("bufsize must be > 0".into()));
        }
        if self.hopsize == 0 || self.hopsize > self.bufsize {
            return Err(invalid(format!(
                "hopsize {} out of range (1-{})",
                self.hopsize, self.bufsize
            )));
        }
        if self.max_open_files == 0 {
            return Err(invalid("max_open_files must be > 0".into()));
        }
        self.segmentation.validate()?;
        self.resynthesis.validate()?;
        self.clustering.validate()?;
        Ok(())
    }
}

fn invalid(message: String) -> crate::Error {
    CoreError::InvalidConfig(message).into()
}
