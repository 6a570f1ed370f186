//! Fills synthesis contexts with the selected unit's audio.

use consyn_catalog::Catalog;
use consyn_core::{Error, Result, Stage, SynthesisContext};
use consyn_sampler::{read_unit, SourceCache};

/// Reads each selected unit through the source cache.
pub struct UnitLoader<'a> {
    catalog: &'a dyn Catalog,
    cache: &'a mut SourceCache,
}

impl<'a> UnitLoader<'a> {
    pub fn new(catalog: &'a dyn Catalog, cache: &'a mut SourceCache) -> Self {
        Self { catalog, cache }
    }

    fn load(&mut self, ctx: SynthesisContext) -> Result<SynthesisContext> {
        let media = self
            .catalog
            .media_file(ctx.selected.media_file)
            .ok_or_else(|| Error::MediaFileNotFound(ctx.selected.media_file.to_string()))?;
        let samples = read_unit(self.cache, media, &ctx.selected)?;
        let samplerate = media.samplerate;
        Ok(ctx.with_samples(samples, samplerate))
    }
}

impl Stage for UnitLoader<'_> {
    type Input = Result<SynthesisContext>;
    type Output = Result<SynthesisContext>;

    fn transform<'s, I>(&'s mut self, input: I) -> Box<dyn Iterator<Item = Self::Output> + 's>
    where
        I: Iterator<Item = Self::Input> + 's,
    {
        Box::new(input.map(move |ctx| ctx.and_then(|ctx| self.load(ctx))))
    }
}
