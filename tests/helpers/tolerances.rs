//! Comparison tolerances for mosaic output.

/// Samples copied unchanged through a float WAV and the clipper.
pub const FLOAT_EPSILON: f32 = 1e-6;

/// Samples shaped by an envelope or the phase vocoder.
pub const DSP_EPSILON: f32 = 1e-4;

/// Peak below which an output counts as silent (about -80 dBFS).
pub const SILENCE_THRESHOLD: f32 = 0.0001;

/// One step of a 16-bit WAV sink.
pub const INT16_EPSILON: f32 = 1.0 / 32768.0;
