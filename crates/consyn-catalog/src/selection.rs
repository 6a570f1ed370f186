//! Unit selection.
//!
//! A selector maps each target unit to a corpus unit. [`Selection`] runs a
//! selector as a pipeline stage, producing the [`SynthesisContext`] the
//! resynthesis stages work on.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use consyn_core::{Error, MediaFileId, Result, Stage, SynthesisContext, Unit};

use crate::catalog::{Catalog, UnitFilter};

/// Picks a replacement for a target unit.
pub trait Selector {
    fn select(&mut self, target: &Unit) -> Result<Unit>;
}

impl<S: Selector + ?Sized> Selector for Box<S> {
    fn select(&mut self, target: &Unit) -> Result<Unit> {
        (**self).select(target)
    }
}

/// Closest unit by L1 feature distance, restricted to a set of media files.
pub struct NearestSelector<'c, C: Catalog + ?Sized> {
    catalog: &'c C,
    sources: Vec<MediaFileId>,
}

impl<'c, C: Catalog + ?Sized> NearestSelector<'c, C> {
    pub fn new(catalog: &'c C, sources: impl IntoIterator<Item = MediaFileId>) -> Self {
        Self {
            catalog,
            sources: sources.into_iter().collect(),
        }
    }
}

impl<C: Catalog + ?Sized> Selector for NearestSelector<'_, C> {
    fn select(&mut self, target: &Unit) -> Result<Unit> {
        let features = self
            .catalog
            .features(target.id)
            .ok_or(Error::FeatureUnavailable {
                channel: target.channel,
                position: target.position,
            })?;
        self.catalog.nearest(features, &self.sources)
    }
}

/// Uniformly random unit from a set of media files.
///
/// Candidates are fetched from the catalog once, at construction.
pub struct RandomSelector {
    candidates: Vec<Unit>,
    rng: StdRng,
}

impl RandomSelector {
    pub fn new<C>(catalog: &C, sources: impl IntoIterator<Item = MediaFileId>) -> Self
    where
        C: Catalog + ?Sized,
    {
        Self::with_rng(catalog, sources, StdRng::from_entropy())
    }

    /// Reproducible selection.
    pub fn seeded<C>(catalog: &C, sources: impl IntoIterator<Item = MediaFileId>, seed: u64) -> Self
    where
        C: Catalog + ?Sized,
    {
        Self::with_rng(catalog, sources, StdRng::seed_from_u64(seed))
    }

    fn with_rng<C>(catalog: &C, sources: impl IntoIterator<Item = MediaFileId>, rng: StdRng) -> Self
    where
        C: Catalog + ?Sized,
    {
        Self {
            candidates: catalog.query(&UnitFilter::all().media_files(sources)),
            rng,
        }
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }
}

impl Selector for RandomSelector {
    fn select(&mut self, _target: &Unit) -> Result<Unit> {
        self.candidates
            .choose(&mut self.rng)
            .cloned()
            .ok_or(Error::NoCandidates)
    }
}

/// Runs a [`Selector`] over a stream of target units.
pub struct Selection<S> {
    selector: S,
    selected: usize,
}

impl<S: Selector> Selection<S> {
    pub fn new(selector: S) -> Self {
        Self {
            selector,
            selected: 0,
        }
    }

    /// Targets matched so far.
    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn into_inner(self) -> S {
        self.selector
    }

    fn select(&mut self, target: Unit) -> Result<SynthesisContext> {
        let chosen = self.selector.select(&target)?;
        tracing::trace!(target_unit = %target.id, selected = %chosen.id, "selected");
        self.selected += 1;
        Ok(SynthesisContext::new(target, chosen))
    }
}

impl<S: Selector> Stage for Selection<S> {
    type Input = Result<Unit>;
    type Output = Result<SynthesisContext>;

    fn transform<'a, I>(&'a mut self, input: I) -> Box<dyn Iterator<Item = Self::Output> + 'a>
    where
        I: Iterator<Item = Self::Input> + 'a,
    {
        Box::new(input.map(move |target| target.and_then(|target| self.select(target))))
    }
}
