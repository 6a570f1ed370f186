//! Test helpers and fixtures for Consyn integration tests
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `FLOAT_EPSILON` (1e-6): Exact operations (passthrough, clipping)
//! - `DSP_EPSILON` (1e-4): DSP processing (envelopes, stretching)
//! - `SILENCE_THRESHOLD` (0.0001): Silence detection (-80dB)

#![allow(dead_code)]

pub mod tolerances;

use std::path::{Path, PathBuf};

use consyn::prelude::*;

/// Default test sample rate
pub const TEST_SAMPLE_RATE: u32 = 8000;

/// Slice length used by the regular-slicing fixtures
pub const TEST_SLICE: usize = 1000;

/// Engine that slices every `TEST_SLICE` samples and only clips on resynthesis,
/// so a self-mosaic reproduces its input exactly.
pub fn regular_config() -> ConsynConfig {
    ConsynConfig {
        bufsize: TEST_SLICE,
        hopsize: TEST_SLICE / 2,
        segmentation: SegmentationConfig {
            slicer: SlicerKind::Regular { size: TEST_SLICE },
            min_slice_size: 0,
        },
        resynthesis: ResynthesisConfig {
            stages: vec![StageConfig::Clip],
        },
        ..Default::default()
    }
}

pub fn test_engine() -> ConsynEngine {
    test_engine_with(regular_config())
}

pub fn test_engine_with(config: ConsynConfig) -> ConsynEngine {
    ConsynEngine::builder()
        .config(config)
        .build()
        .expect("Failed to create test engine")
}

/// Generate a test signal: sine wave at given frequency for specified samples.
pub fn generate_sine(frequency: f32, sample_rate: u32, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.5
        })
        .collect()
}

/// Consecutive `TEST_SLICE`-long sine segments, one per frequency.
///
/// Every segment has a different spectrum, so each regular slice has
/// distinct features.
pub fn generate_steps(frequencies: &[f32]) -> Vec<f32> {
    frequencies
        .iter()
        .flat_map(|&f| generate_sine(f, TEST_SAMPLE_RATE, TEST_SLICE))
        .collect()
}

/// Generate silence (zero samples).
pub fn generate_silence(num_samples: usize) -> Vec<f32> {
    vec![0.0; num_samples]
}

/// Short decaying noise bursts at the given times (seconds).
pub fn generate_clicks(times: &[f32], sample_rate: u32, num_samples: usize) -> Vec<f32> {
    let mut samples = vec![0.0; num_samples];
    let mut rng: u64 = 0x2545_f491_4f6c_dd1d;
    for &time in times {
        let start = (time * sample_rate as f32) as usize;
        for (i, sample) in samples.iter_mut().skip(start).take(400).enumerate() {
            rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1);
            let noise = ((rng >> 33) as f32 / u32::MAX as f32) * 2.0 - 1.0;
            *sample = noise * (-(i as f32) / 80.0).exp();
        }
    }
    samples
}

/// Write non-interleaved channels as a 32-bit float WAV.
pub fn write_wav(path: &Path, channels: &[Vec<f32>], sample_rate: u32) {
    let spec = hound::WavSpec {
        channels: channels.len() as u16,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("Failed to create WAV");
    let frames = channels.first().map_or(0, Vec::len);
    for frame in 0..frames {
        for channel in channels {
            writer.write_sample(channel[frame]).unwrap();
        }
    }
    writer.finalize().unwrap();
}

/// Write a mono fixture into `dir` and return its path.
pub fn mono_fixture(dir: &Path, name: &str, samples: &[f32]) -> PathBuf {
    let path = dir.join(name);
    write_wav(&path, &[samples.to_vec()], TEST_SAMPLE_RATE);
    path
}

/// Read a WAV back as non-interleaved float channels.
pub fn read_wav(path: &Path) -> (u32, Vec<Vec<f32>>) {
    let mut reader = hound::WavReader::open(path).expect("Failed to open WAV");
    let spec = reader.spec();
    let channels = spec.channels as usize;
    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().map(|s| s.unwrap()).collect(),
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1u32 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.unwrap() as f32 * scale)
                .collect()
        }
    };

    let mut out = vec![Vec::new(); channels];
    for (i, sample) in interleaved.into_iter().enumerate() {
        out[i % channels].push(sample);
    }
    (spec.sample_rate, out)
}

/// Calculate RMS of a signal.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Calculate peak amplitude of a signal.
pub fn peak(samples: &[f32]) -> f32 {
    samples
        .iter()
        .map(|s| s.abs())
        .fold(0.0_f32, |a, b| a.max(b))
}

/// Check if two signals are approximately equal within tolerance.
pub fn signals_approx_equal(a: &[f32], b: &[f32], tolerance: f32) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() <= tolerance)
}

/// Assert that a signal is approximately silent (all values near zero).
pub fn assert_silence(samples: &[f32], tolerance: f32) {
    let max = peak(samples);
    assert!(
        max <= tolerance,
        "Expected silence, but peak amplitude was {}",
        max
    );
}

/// Assert that a signal has content (not silent).
pub fn assert_has_audio(samples: &[f32], min_rms: f32) {
    let r = rms(samples);
    assert!(
        r >= min_rms,
        "Expected audio content with RMS >= {}, but RMS was {}",
        min_rms,
        r
    );
}

/// Units of `media` on `channel`, in position order.
pub fn channel_units(engine: &ConsynEngine, media: MediaFileId, channel: usize) -> Vec<Unit> {
    let mut units = engine
        .catalog()
        .query(&UnitFilter::all().media_file(media).channel(channel));
    units.sort_by_key(|u| u.position);
    units
}

/// Assert that `units` tile `[0, duration)` with no gaps or overlaps.
pub fn assert_covers(units: &[Unit], duration: usize) {
    let mut expected = 0;
    for unit in units {
        assert_eq!(unit.position, expected, "gap or overlap before {}", unit.id);
        assert!(unit.duration > 0, "{} is empty", unit.id);
        expected = unit.end();
    }
    assert_eq!(expected, duration, "units cover {} of {} samples", expected, duration);
}
