//! Resynthesis pipeline.
//!
//! An ordered list of stages applied to each [`SynthesisContext`]. The
//! pipeline guarantees that every context it returns exactly fits its target:
//! if no conforming stage runs after the last stage that changes the length,
//! a [`DurationClipper`] is inserted there.

use serde::{Deserialize, Serialize};

use consyn_core::{Result, SynthesisContext, Stage};

use crate::clipper::DurationClipper;
use crate::envelope::{Envelope, DEFAULT_FADE};
use crate::time_stretch::{TimeStretch, TimeStretchParams};

/// How a stage affects the length of the working samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthEffect {
    /// Output length equals input length
    Preserves,
    /// Output length equals the target's duration
    Conforms,
    /// Output length is arbitrary
    Changes,
}

/// One resynthesis step.
pub trait Resynthesizer {
    fn process(&mut self, ctx: SynthesisContext) -> Result<SynthesisContext>;

    fn length_effect(&self) -> LengthEffect {
        LengthEffect::Changes
    }

    /// Short name used in logs.
    fn name(&self) -> &'static str {
        "custom"
    }
}

fn default_fade() -> usize {
    DEFAULT_FADE
}

/// Serializable stage description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageConfig {
    TimeStretch(TimeStretchParams),
    Envelope {
        #[serde(default = "default_fade")]
        fade: usize,
    },
    Clip,
}

impl StageConfig {
    pub fn validate(&self) -> Result<()> {
        match self {
            StageConfig::TimeStretch(params) => params.validate(),
            StageConfig::Envelope { .. } | StageConfig::Clip => Ok(()),
        }
    }

    pub fn build(&self) -> Box<dyn Resynthesizer> {
        match self {
            StageConfig::TimeStretch(params) => Box::new(TimeStretch::new(*params)),
            StageConfig::Envelope { fade } => Box::new(Envelope::new(*fade)),
            StageConfig::Clip => Box::new(DurationClipper),
        }
    }
}

/// Stage list for [`ResynthesisPipeline::from_config`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResynthesisConfig {
    pub stages: Vec<StageConfig>,
}

impl Default for ResynthesisConfig {
    fn default() -> Self {
        Self {
            stages: vec![
                StageConfig::Clip,
                StageConfig::Envelope { fade: DEFAULT_FADE },
            ],
        }
    }
}

impl ResynthesisConfig {
    pub fn validate(&self) -> Result<()> {
        self.stages.iter().try_for_each(StageConfig::validate)
    }
}

/// Ordered resynthesis stages.
#[derive(Default)]
pub struct ResynthesisPipeline {
    stages: Vec<Box<dyn Resynthesizer>>,
    conformed: bool,
}

impl ResynthesisPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ResynthesisConfig) -> Result<Self> {
        config.validate()?;
        let mut pipeline = Self::new();
        for stage in &config.stages {
            pipeline.stages.push(stage.build());
        }
        pipeline.ensure_conform();
        Ok(pipeline)
    }

    /// Append a stage.
    pub fn with_stage<R: Resynthesizer + 'static>(mut self, stage: R) -> Self {
        self.push(Box::new(stage));
        self
    }

    pub fn push(&mut self, stage: Box<dyn Resynthesizer>) {
        self.stages.push(stage);
        self.conformed = false;
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Insert a clipper after the last length-changing stage unless a
    /// conforming stage already follows it.
    fn ensure_conform(&mut self) {
        if self.conformed {
            return;
        }
        let mut insert_at = Some(0);
        for (i, stage) in self.stages.iter().enumerate() {
            match stage.length_effect() {
                LengthEffect::Preserves => {}
                LengthEffect::Conforms => insert_at = None,
                LengthEffect::Changes => insert_at = Some(i + 1),
            }
        }
        if let Some(index) = insert_at {
            tracing::debug!(index, "no conforming stage; inserting clipper");
            self.stages.insert(index, Box::new(DurationClipper));
        }
        self.conformed = true;
    }

    /// Run every stage on `ctx`.
    pub fn process(&mut self, ctx: SynthesisContext) -> Result<SynthesisContext> {
        self.ensure_conform();

        let mut ctx = ctx;
        for stage in self.stages.iter_mut() {
            ctx = stage.process(ctx)?;
        }

        if !ctx.fits_target() {
            // A custom stage misreported its length effect.
            tracing::warn!(
                target_unit = %ctx.target.id,
                len = ctx.samples.len(),
                expected = ctx.target.duration,
                "resynthesized unit does not fit its target; clipping"
            );
            ctx.samples = DurationClipper::clip(&ctx.samples, ctx.target.duration);
        }
        Ok(ctx)
    }
}

impl Stage for ResynthesisPipeline {
    type Input = Result<SynthesisContext>;
    type Output = Result<SynthesisContext>;

    fn transform<'a, I>(&'a mut self, input: I) -> Box<dyn Iterator<Item = Self::Output> + 'a>
    where
        I: Iterator<Item = Self::Input> + 'a,
    {
        Box::new(input.map(move |ctx| ctx.and_then(|ctx| self.process(ctx))))
    }
}
