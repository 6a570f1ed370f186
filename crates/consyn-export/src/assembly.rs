//! Output assembly.
//!
//! Resynthesized units are written back into the slot their target unit
//! occupied. Each output is a `(channels × duration)` buffer owned by one
//! [`OutputAssembly`]; once as many units as the target has have arrived,
//! the buffer is handed out exactly once as a [`CompletedOutput`].

use std::collections::HashMap;

use consyn_core::{MediaFile, MediaFileId, Stage, SynthesisContext};

use crate::error::{ExportError, Result};

/// A finished output buffer, one sample vector per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedOutput {
    /// Target recording this output replaces
    pub target: MediaFileId,
    pub samplerate: u32,
    pub buffer: Vec<Vec<f32>>,
}

impl CompletedOutput {
    /// Zero-filled output for a target that has no units.
    pub fn silent(target: &MediaFile) -> Self {
        Self {
            target: target.id,
            samplerate: target.samplerate,
            buffer: vec![vec![0.0; target.duration]; target.channels],
        }
    }

    pub fn channels(&self) -> usize {
        self.buffer.len()
    }

    /// Samples per channel.
    pub fn duration(&self) -> usize {
        self.buffer.first().map_or(0, Vec::len)
    }
}

/// Buffer and progress of one output.
#[derive(Debug)]
pub struct OutputAssembly {
    target: MediaFileId,
    channels: usize,
    duration: usize,
    samplerate: u32,
    expected: usize,
    written: usize,
    buffer: Option<Vec<Vec<f32>>>,
    completed: bool,
}

impl OutputAssembly {
    /// Output shaped like `target`, complete after `expected` units.
    pub fn new(target: &MediaFile, expected: usize) -> Self {
        Self {
            target: target.id,
            channels: target.channels,
            duration: target.duration,
            samplerate: target.samplerate,
            expected,
            written: 0,
            buffer: None,
            completed: false,
        }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    /// Copy `ctx.samples` into the target unit's slot.
    ///
    /// Returns the finished buffer when this write completes the output.
    /// Writes after completion are dropped.
    pub fn write(&mut self, ctx: &SynthesisContext) -> Result<Option<CompletedOutput>> {
        if self.completed {
            tracing::trace!(
                output = %self.target,
                unit = %ctx.target.id,
                "output already complete; dropping write"
            );
            return Ok(None);
        }

        let target = &ctx.target;
        if target.channel >= self.channels {
            return Err(ExportError::InvalidBuffer(format!(
                "{} is on channel {} of a {}-channel output",
                target.id, target.channel, self.channels
            )));
        }
        if target.end() > self.duration {
            return Err(ExportError::InvalidBuffer(format!(
                "{} ends at {} past output length {}",
                target.id,
                target.end(),
                self.duration
            )));
        }
        if ctx.samples.len() != target.duration {
            return Err(ExportError::InvalidBuffer(format!(
                "{} has {} samples for a {}-sample slot",
                target.id,
                ctx.samples.len(),
                target.duration
            )));
        }

        let (channels, duration) = (self.channels, self.duration);
        let buffer = self
            .buffer
            .get_or_insert_with(|| vec![vec![0.0; duration]; channels]);
        buffer[target.channel][target.position..target.end()].copy_from_slice(&ctx.samples);
        self.written += 1;

        if self.written < self.expected {
            return Ok(None);
        }

        self.completed = true;
        tracing::debug!(output = %self.target, units = self.written, "output complete");
        Ok(Some(CompletedOutput {
            target: self.target,
            samplerate: self.samplerate,
            buffer: self.buffer.take().unwrap_or_default(),
        }))
    }
}

/// Routes resynthesized units to their outputs by target media file.
#[derive(Debug, Default)]
pub struct Assembler {
    outputs: HashMap<MediaFileId, OutputAssembly>,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an output for `target`, complete after `units` writes.
    pub fn register(&mut self, target: &MediaFile, units: usize) {
        self.outputs
            .insert(target.id, OutputAssembly::new(target, units));
    }

    pub fn output(&self, target: MediaFileId) -> Option<&OutputAssembly> {
        self.outputs.get(&target)
    }

    /// Write one resynthesized unit.
    pub fn write(&mut self, ctx: &SynthesisContext) -> Result<Option<CompletedOutput>> {
        let output = self
            .outputs
            .get_mut(&ctx.target.media_file)
            .ok_or(ExportError::UnknownOutput(ctx.target.media_file))?;
        output.write(ctx)
    }
}

impl Stage for Assembler {
    type Input = consyn_core::Result<SynthesisContext>;
    type Output = Result<CompletedOutput>;

    fn transform<'a, I>(&'a mut self, input: I) -> Box<dyn Iterator<Item = Self::Output> + 'a>
    where
        I: Iterator<Item = Self::Input> + 'a,
    {
        Box::new(input.filter_map(move |ctx| match ctx {
            Ok(ctx) => self.write(&ctx).transpose(),
            Err(e) => Some(Err(e.into())),
        }))
    }
}
