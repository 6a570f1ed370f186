//! ConsynEngine that coordinates ingest and synthesis

use std::path::Path;

use consyn_analysis::{FeatureExtractor, Segmenter};
use consyn_catalog::{
    Catalog, ClusterReport, NearestSelector, RandomSelector, Selection, Selector, UnitFilter,
};
use consyn_core::{Error as CoreError, MediaFile, MediaFileId, Stage, Unit, UnitId};
use consyn_dsp::ResynthesisPipeline;
use consyn_export::{Assembler, CompletedOutput, ExportError, SampleSink};
use consyn_sampler::{FrameReader, SourceCache};

use crate::config::{ConsynConfig, SelectionMode};
use crate::loader::UnitLoader;
use crate::Result;

/// Units saved and skipped while ingesting one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct IngestCounts {
    saved: usize,
    skipped: usize,
}

/// Concatenative synthesis engine.
///
/// Owns the catalog and every piece of per-run machinery:
/// - `ingest` slices a recording into units and catalogues their features
/// - `mosaic` rebuilds a target recording from corpus units
/// - `cluster` groups catalogued units by feature similarity
///
/// # Example
///
/// ```ignore
/// use consyn::prelude::*;
///
/// let mut engine = ConsynEngine::builder().build()?;
///
/// let target = engine.ingest("voice.wav")?;
/// let corpus = engine.ingest("drums.wav")?;
///
/// engine.mosaic(target.id, &[corpus.id], "out.wav")?;
/// ```
pub struct ConsynEngine {
    config: ConsynConfig,
    catalog: Box<dyn Catalog>,
    extractor: Box<dyn FeatureExtractor>,
    segmenter: Segmenter,
    cache: SourceCache,
    resynthesis: ResynthesisPipeline,
    sink: Box<dyn SampleSink>,
}

impl ConsynEngine {
    /// Create a new engine builder
    pub fn builder() -> crate::ConsynEngineBuilder {
        crate::ConsynEngineBuilder::default()
    }

    pub(crate) fn from_parts(
        config: ConsynConfig,
        catalog: Box<dyn Catalog>,
        extractor: Box<dyn FeatureExtractor>,
        segmenter: Segmenter,
        cache: SourceCache,
        resynthesis: ResynthesisPipeline,
        sink: Box<dyn SampleSink>,
    ) -> Self {
        Self {
            config,
            catalog,
            extractor,
            segmenter,
            cache,
            resynthesis,
            sink,
        }
    }

    pub fn config(&self) -> &ConsynConfig {
        &self.config
    }

    pub fn catalog(&self) -> &dyn Catalog {
        self.catalog.as_ref()
    }

    pub fn catalog_mut(&mut self) -> &mut dyn Catalog {
        self.catalog.as_mut()
    }

    pub fn source_cache(&self) -> &SourceCache {
        &self.cache
    }

    /// Names of the resynthesis stages, in order.
    pub fn resynthesis_stages(&self) -> Vec<&'static str> {
        self.resynthesis.stage_names()
    }

    // =========================================================================
    // Ingest
    // =========================================================================

    /// Slice `path` into units and catalogue each with its features.
    ///
    /// A file already in the catalog is returned as is. Paths are compared
    /// after canonicalization; a path that cannot be canonicalized is used
    /// as given. If reading fails part way, the file and the units saved so
    /// far are removed again.
    pub fn ingest(&mut self, path: impl AsRef<Path>) -> Result<MediaFile> {
        let path = path.as_ref();
        let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let path = canonical.as_path();
        if let Some(existing) = self.catalog.media_file_by_path(path) {
            tracing::info!(path = %path.display(), id = %existing.id, "already ingested");
            return Ok(existing.clone());
        }

        let source = self.cache.open(path)?;
        let media = self.catalog.add_media_file(
            path,
            source.channels(),
            source.samplerate(),
            source.duration(),
        )?;
        let reader = FrameReader::new(source, self.config.bufsize);

        match self.ingest_units(&media, reader) {
            Ok(counts) => {
                tracing::info!(
                    path = %path.display(),
                    id = %media.id,
                    units = counts.saved,
                    skipped = counts.skipped,
                    "ingested"
                );
                Ok(media)
            }
            Err(e) => {
                if let Err(cleanup) = self.catalog.remove_media_file(media.id) {
                    tracing::warn!("failed to roll back {}: {}", media.id, cleanup);
                }
                Err(e)
            }
        }
    }

    fn ingest_units(&mut self, media: &MediaFile, reader: FrameReader) -> Result<IngestCounts> {
        let mut counts = IngestCounts::default();
        // A previous ingest that failed part way may have left channels open.
        self.segmenter.reset();

        for slice in self.segmenter.transform(reader) {
            let slice = slice?;
            if slice.is_empty() {
                continue;
            }

            let Some(features) = self.extractor.extract(slice.samples(), slice.samplerate())
            else {
                let skipped = CoreError::FeatureUnavailable {
                    channel: slice.channel(),
                    position: slice.position(),
                };
                tracing::warn!("{}; skipping unit", skipped);
                counts.skipped += 1;
                continue;
            };

            let unit = Unit {
                id: UnitId::default(),
                media_file: media.id,
                channel: slice.channel(),
                position: slice.position(),
                duration: slice.len(),
                cluster: None,
            };
            let unit = self.catalog.save(unit, features)?;
            tracing::trace!(unit = %unit.id, position = unit.position, duration = unit.duration, "saved");
            counts.saved += 1;
        }

        Ok(counts)
    }

    /// Drop a media file, its units, and any open handle to it.
    pub fn remove(&mut self, media: MediaFileId) -> Result<MediaFile> {
        let removed = self.catalog.remove_media_file(media)?;
        self.cache.remove(&removed.path);
        tracing::info!(id = %removed.id, path = %removed.path.display(), "removed");
        Ok(removed)
    }

    // =========================================================================
    // Clustering
    // =========================================================================

    /// Group every catalogued unit into `k` clusters.
    pub fn cluster(&mut self, k: usize) -> Result<ClusterReport> {
        let report = consyn_catalog::cluster(self.catalog.as_mut(), k, &self.config.clustering)?;
        Ok(report)
    }

    // =========================================================================
    // Synthesis
    // =========================================================================

    /// Rebuild `target` from units of `corpora` and write it to `output`.
    pub fn mosaic(
        &mut self,
        target: MediaFileId,
        corpora: &[MediaFileId],
        output: impl AsRef<Path>,
    ) -> Result<CompletedOutput> {
        let completed = self.mosaic_buffer(target, corpora)?;
        self.sink
            .write(output.as_ref(), completed.samplerate, &completed.buffer)?;
        Ok(completed)
    }

    /// Rebuild `target` from units of `corpora` without writing it anywhere.
    ///
    /// Each target unit is replaced by a selected corpus unit, resynthesized
    /// to fit the target slot and written there. An error aborts this output
    /// only; the catalog is left untouched.
    pub fn mosaic_buffer(
        &mut self,
        target: MediaFileId,
        corpora: &[MediaFileId],
    ) -> Result<CompletedOutput> {
        let target_file = self
            .catalog
            .media_file(target)
            .cloned()
            .ok_or_else(|| CoreError::MediaFileNotFound(target.to_string()))?;
        if let Some(missing) = corpora.iter().find(|id| self.catalog.media_file(**id).is_none()) {
            return Err(CoreError::MediaFileNotFound(missing.to_string()).into());
        }

        let targets = self.catalog.query(&UnitFilter::all().media_file(target));
        if targets.is_empty() {
            tracing::debug!(target = %target, "target has no units; output is silent");
            return Ok(CompletedOutput::silent(&target_file));
        }
        tracing::info!(
            target = %target,
            units = targets.len(),
            corpora = corpora.len(),
            "synthesizing"
        );

        let catalog: &dyn Catalog = self.catalog.as_ref();
        let selector: Box<dyn Selector + '_> = match self.config.selection {
            SelectionMode::Nearest => Box::new(NearestSelector::new(catalog, corpora.iter().copied())),
            SelectionMode::Random { seed: Some(seed) } => {
                Box::new(RandomSelector::seeded(catalog, corpora.iter().copied(), seed))
            }
            SelectionMode::Random { seed: None } => {
                Box::new(RandomSelector::new(catalog, corpora.iter().copied()))
            }
        };

        let mut assembler = Assembler::new();
        assembler.register(&target_file, targets.len());

        let mut prepare = Selection::new(selector).then(UnitLoader::new(catalog, &mut self.cache));
        let contexts = prepare.transform(targets.into_iter().map(Ok));
        let resynthesized = self.resynthesis.transform(contexts);

        let mut completed = None;
        for output in assembler.transform(resynthesized) {
            completed = Some(output?);
        }

        completed.ok_or_else(|| {
            ExportError::InvalidBuffer(format!("{} finished without completing", target)).into()
        })
    }
}

impl std::fmt::Debug for ConsynEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsynEngine")
            .field("config", &self.config)
            .field("media_files", &self.catalog.media_files().len())
            .field("cache", &self.cache)
            .field("resynthesis", &self.resynthesis.stage_names())
            .finish()
    }
}
