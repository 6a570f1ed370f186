//! Ingest integration tests
//!
//! Tests recordings becoming catalogued units: coverage of every channel,
//! feature vectors, repeated ingest, and cleanup after failures.

use std::path::Path;

use consyn::core::Error as CoreError;
use consyn::prelude::*;
use consyn::{AudioSource, MemorySource};

use crate::helpers::*;

#[test]
fn test_regular_units_cover_file() {
    let dir = tempfile::tempdir().unwrap();
    let samples = generate_sine(440.0, TEST_SAMPLE_RATE, 4500);
    let path = mono_fixture(dir.path(), "sine.wav", &samples);

    let mut engine = test_engine();
    let media = engine.ingest(&path).unwrap();

    assert_eq!(media.channels, 1);
    assert_eq!(media.samplerate, TEST_SAMPLE_RATE);
    assert_eq!(media.duration, 4500);

    let units = channel_units(&engine, media.id, 0);
    assert_eq!(units.len(), 5);
    assert_covers(&units, 4500);
    assert_eq!(units[4].duration, 500);
}

#[test]
fn test_slices_shorter_than_read_block() {
    let dir = tempfile::tempdir().unwrap();
    let path = mono_fixture(dir.path(), "sine.wav", &generate_sine(440.0, TEST_SAMPLE_RATE, 4096));

    let mut config = regular_config();
    config.bufsize = 1024;
    config.hopsize = 512;
    config.segmentation.slicer = SlicerKind::Regular { size: 256 };
    let mut engine = test_engine_with(config);
    let media = engine.ingest(&path).unwrap();

    let units = channel_units(&engine, media.id, 0);
    assert_eq!(units.len(), 16);
    assert!(units.iter().all(|u| u.duration == 256));
    assert_covers(&units, 4096);
}

#[test]
fn test_every_unit_has_features() {
    let dir = tempfile::tempdir().unwrap();
    let path = mono_fixture(dir.path(), "steps.wav", &generate_steps(&[220.0, 440.0, 880.0]));

    let mut engine = test_engine();
    let media = engine.ingest(&path).unwrap();

    let slots = engine.config().feature_slots;
    for unit in channel_units(&engine, media.id, 0) {
        let features = engine.catalog().features(unit.id).expect("unit without features");
        assert!(!features.is_empty());
        assert!(features.len() <= slots);
        assert!(features.values().all(f32::is_finite));
    }
}

#[test]
fn test_stereo_channels_are_sliced_independently() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stereo.wav");
    let left = generate_sine(330.0, TEST_SAMPLE_RATE, 3500);
    let right = generate_clicks(&[0.1, 0.25], TEST_SAMPLE_RATE, 3500);
    write_wav(&path, &[left, right], TEST_SAMPLE_RATE);

    let mut engine = test_engine();
    let media = engine.ingest(&path).unwrap();
    assert_eq!(media.channels, 2);

    for channel in 0..2 {
        let units = channel_units(&engine, media.id, channel);
        assert_eq!(units.len(), 4, "channel {}", channel);
        assert_covers(&units, 3500);
    }
}

#[test]
fn test_onset_units_cover_file() {
    let dir = tempfile::tempdir().unwrap();
    let samples = generate_clicks(&[0.1, 0.3, 0.5, 0.7], TEST_SAMPLE_RATE, 8000);
    let path = mono_fixture(dir.path(), "clicks.wav", &samples);

    let mut engine = test_engine_with(ConsynConfig::default());
    let media = engine.ingest(&path).unwrap();

    let units = channel_units(&engine, media.id, 0);
    assert!(!units.is_empty());
    assert_covers(&units, 8000);
}

#[test]
fn test_min_slice_size_merges_slices() {
    let dir = tempfile::tempdir().unwrap();
    let path = mono_fixture(dir.path(), "sine.wav", &generate_sine(440.0, TEST_SAMPLE_RATE, 4000));

    let mut config = regular_config();
    config.segmentation.min_slice_size = 1500;
    let mut engine = test_engine_with(config);
    let media = engine.ingest(&path).unwrap();

    let units = channel_units(&engine, media.id, 0);
    assert_covers(&units, 4000);
    assert!(units.iter().all(|u| u.duration > 1000));
}

#[test]
fn test_ingest_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = mono_fixture(dir.path(), "sine.wav", &generate_sine(440.0, TEST_SAMPLE_RATE, 3000));

    let mut engine = test_engine();
    let first = engine.ingest(&path).unwrap();
    let second = engine.ingest(&path).unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(engine.catalog().media_files().len(), 1);
    assert_eq!(channel_units(&engine, first.id, 0).len(), 3);
}

#[test]
fn test_equivalent_paths_are_one_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = mono_fixture(dir.path(), "sine.wav", &generate_sine(440.0, TEST_SAMPLE_RATE, 3000));
    let dotted = dir.path().join(".").join("sine.wav");

    let mut engine = test_engine();
    let first = engine.ingest(&path).unwrap();
    let second = engine.ingest(&dotted).unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(engine.catalog().media_files().len(), 1);
    assert_eq!(engine.catalog().query(&UnitFilter::all()).len(), 3);
}

#[test]
fn test_missing_file_is_unreadable() {
    let mut engine = test_engine();
    let result = engine.ingest("/definitely/not/here.wav");

    assert!(matches!(
        result,
        Err(Error::Core(CoreError::SourceUnreadable { .. }))
    ));
    assert!(engine.catalog().media_files().is_empty());
}

/// Serves a few good blocks, then fails.
struct FailingSource {
    inner: MemorySource,
    reads_left: usize,
}

impl AudioSource for FailingSource {
    fn path(&self) -> &Path {
        self.inner.path()
    }

    fn channels(&self) -> usize {
        self.inner.channels()
    }

    fn samplerate(&self) -> u32 {
        self.inner.samplerate()
    }

    fn duration(&self) -> usize {
        self.inner.duration()
    }

    fn seek(&mut self, frame: usize) -> consyn::core::Result<()> {
        self.inner.seek(frame)
    }

    fn read(&mut self, frames: usize) -> consyn::core::Result<Vec<Vec<f32>>> {
        if self.reads_left == 0 {
            return Err(CoreError::unreadable(self.path(), "device went away"));
        }
        self.reads_left -= 1;
        self.inner.read(frames)
    }
}

#[test]
fn test_failed_ingest_rolls_back() {
    let mut engine = ConsynEngine::builder()
        .config(regular_config())
        .source_opener(|path| {
            let inner = MemorySource::mono(path, vec![0.25; 6000], TEST_SAMPLE_RATE);
            Ok(Box::new(FailingSource {
                inner,
                reads_left: 3,
            }) as Box<dyn AudioSource>)
        })
        .build()
        .unwrap();

    let result = engine.ingest("mem://flaky");
    assert!(matches!(
        result,
        Err(Error::Core(CoreError::SourceUnreadable { .. }))
    ));
    assert!(engine.catalog().media_files().is_empty());
    assert!(engine.catalog().query(&UnitFilter::all()).is_empty());
}

#[test]
fn test_memory_sources() {
    let mut engine = ConsynEngine::builder()
        .config(regular_config())
        .source_opener(|path| {
            let left = generate_sine(200.0, TEST_SAMPLE_RATE, 2000);
            let right = generate_sine(300.0, TEST_SAMPLE_RATE, 2000);
            Ok(Box::new(MemorySource::new(path, vec![left, right], TEST_SAMPLE_RATE)?)
                as Box<dyn AudioSource>)
        })
        .build()
        .unwrap();

    let media = engine.ingest("mem://pair").unwrap();
    assert_eq!(media.channels, 2);
    assert_eq!(engine.catalog().query(&UnitFilter::all()).len(), 4);
}

#[test]
fn test_remove_drops_units() {
    let dir = tempfile::tempdir().unwrap();
    let path = mono_fixture(dir.path(), "sine.wav", &generate_sine(440.0, TEST_SAMPLE_RATE, 3000));

    let mut engine = test_engine();
    let media = engine.ingest(&path).unwrap();
    let removed = engine.remove(media.id).unwrap();

    assert_eq!(removed.path, std::fs::canonicalize(&path).unwrap());
    assert!(engine.catalog().query(&UnitFilter::all()).is_empty());
    assert!(engine.remove(media.id).is_err());

    // The file can be ingested again from scratch.
    let again = engine.ingest(&path).unwrap();
    assert_ne!(again.id, media.id);
    assert_eq!(channel_units(&engine, again.id, 0).len(), 3);
}
