//! Builder for configuring and constructing a `ConsynEngine`.

use std::path::Path;

use consyn_analysis::{BoundaryDetector, FeatureExtractor, Segmenter, SpectralExtractor};
use consyn_catalog::{Catalog, MemoryCatalog};
use consyn_dsp::{ResynthesisPipeline, Resynthesizer};
use consyn_export::{SampleSink, WavSink};
use consyn_sampler::{AudioSource, SourceCache};

use crate::config::ConsynConfig;
use crate::{ConsynEngine, Result};

type DetectorFactory =
    Box<dyn FnMut(u32) -> consyn_core::Result<Box<dyn BoundaryDetector>> + Send>;
type SourceOpener = Box<dyn FnMut(&Path) -> consyn_core::Result<Box<dyn AudioSource>>>;

/// Every collaborator has a default: an in-memory catalog, the spectral
/// feature extractor, WAV sources and a 32-bit float WAV sink. Replace any of
/// them before calling [`build`](Self::build).
///
/// # Example
///
/// ```ignore
/// use consyn::prelude::*;
///
/// let engine = ConsynEngine::builder()
///     .config(ConsynConfig::load("consyn.json")?)
///     .catalog(MemoryCatalog::load_json("catalog.json")?)
///     .sink(WavSink::new(BitDepth::Int16))
///     .build()?;
/// ```
#[derive(Default)]
pub struct ConsynEngineBuilder {
    config: ConsynConfig,
    catalog: Option<Box<dyn Catalog>>,
    extractor: Option<Box<dyn FeatureExtractor>>,
    sink: Option<Box<dyn SampleSink>>,
    opener: Option<SourceOpener>,
    detector: Option<DetectorFactory>,
    stages: Vec<Box<dyn Resynthesizer>>,
}

impl ConsynEngineBuilder {
    pub fn config(mut self, config: ConsynConfig) -> Self {
        self.config = config;
        self
    }

    /// Default: 1024
    pub fn bufsize(mut self, frames: usize) -> Self {
        self.config.bufsize = frames;
        self
    }

    pub fn catalog<C: Catalog + 'static>(mut self, catalog: C) -> Self {
        self.catalog = Some(Box::new(catalog));
        self
    }

    pub fn extractor<E: FeatureExtractor + 'static>(mut self, extractor: E) -> Self {
        self.extractor = Some(Box::new(extractor));
        self
    }

    pub fn sink<S: SampleSink + 'static>(mut self, sink: S) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Open sources with `opener` instead of reading WAV files.
    pub fn source_opener<F>(mut self, opener: F) -> Self
    where
        F: FnMut(&Path) -> consyn_core::Result<Box<dyn AudioSource>> + 'static,
    {
        self.opener = Some(Box::new(opener));
        self
    }

    /// Slice with a custom detector instead of the configured slicer.
    /// `factory` is called once per channel with the channel's samplerate.
    pub fn boundary_detector<F>(mut self, factory: F) -> Self
    where
        F: FnMut(u32) -> consyn_core::Result<Box<dyn BoundaryDetector>> + Send + 'static,
    {
        self.detector = Some(Box::new(factory));
        self
    }

    /// Append a resynthesis stage after the configured ones.
    pub fn resynthesizer<R: Resynthesizer + 'static>(mut self, stage: R) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn build(self) -> Result<ConsynEngine> {
        let config = self.config;
        config.validate()?;

        let segmenter = match self.detector {
            Some(factory) => Segmenter::with_factory(config.segmentation.min_slice_size, factory),
            None => Segmenter::new(config.segmentation.clone()),
        };

        let mut resynthesis = ResynthesisPipeline::from_config(&config.resynthesis)?;
        for stage in self.stages {
            resynthesis.push(stage);
        }

        let cache = match self.opener {
            Some(opener) => SourceCache::with_opener(config.max_open_files, opener),
            None => SourceCache::new(config.max_open_files),
        };

        let extractor = self.extractor.unwrap_or_else(|| {
            Box::new(
                SpectralExtractor::new(config.bufsize, config.hopsize)
                    .with_max_slots(config.feature_slots),
            )
        });

        tracing::debug!(
            bufsize = config.bufsize,
            stages = ?resynthesis.stage_names(),
            "engine built"
        );

        Ok(ConsynEngine::from_parts(
            config,
            self.catalog
                .unwrap_or_else(|| Box::new(MemoryCatalog::new())),
            extractor,
            segmenter,
            cache,
            resynthesis,
            self.sink.unwrap_or_else(|| Box::new(WavSink::default())),
        ))
    }
}
