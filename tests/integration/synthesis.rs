//! Synthesis integration tests
//!
//! Tests whole mosaics: selection over real corpora, resynthesis into the
//! target slots, and the assembled output on disk.

use approx::assert_abs_diff_eq;
use consyn::core::Error as CoreError;
use consyn::prelude::*;

use crate::helpers::tolerances::*;
use crate::helpers::*;

const STEPS: [f32; 4] = [220.0, 440.0, 880.0, 1760.0];

#[test]
fn test_self_mosaic_reproduces_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = generate_steps(&STEPS);
    let path = mono_fixture(dir.path(), "steps.wav", &input);

    let mut engine = test_engine();
    let media = engine.ingest(&path).unwrap();
    let output = engine.mosaic_buffer(media.id, &[media.id]).unwrap();

    assert_eq!(output.target, media.id);
    assert_eq!(output.samplerate, TEST_SAMPLE_RATE);
    assert_eq!(output.channels(), 1);
    assert!(signals_approx_equal(&output.buffer[0], &input, FLOAT_EPSILON));
}

#[test]
fn test_cross_corpus_mosaic_matches_target_shape() {
    let dir = tempfile::tempdir().unwrap();
    let target_path = mono_fixture(
        dir.path(),
        "target.wav",
        &generate_sine(300.0, TEST_SAMPLE_RATE, 4500),
    );
    let corpus_path = mono_fixture(dir.path(), "corpus.wav", &generate_steps(&STEPS));

    for selection in [SelectionMode::Nearest, SelectionMode::Random { seed: Some(7) }] {
        let mut config = regular_config();
        config.selection = selection;
        let mut engine = test_engine_with(config);
        let target = engine.ingest(&target_path).unwrap();
        let corpus = engine.ingest(&corpus_path).unwrap();

        let output = engine.mosaic_buffer(target.id, &[corpus.id]).unwrap();
        assert_eq!(output.channels(), 1, "{:?}", selection);
        assert_eq!(output.duration(), 4500, "{:?}", selection);
        assert_has_audio(&output.buffer[0], 0.1);
    }
}

#[test]
fn test_seeded_random_mosaic_is_repeatable() {
    let dir = tempfile::tempdir().unwrap();
    let target_path = mono_fixture(
        dir.path(),
        "target.wav",
        &generate_sine(300.0, TEST_SAMPLE_RATE, 6000),
    );
    let corpus_path = mono_fixture(dir.path(), "corpus.wav", &generate_steps(&STEPS));

    let run = || {
        let mut config = regular_config();
        config.selection = SelectionMode::Random { seed: Some(42) };
        let mut engine = test_engine_with(config);
        let target = engine.ingest(&target_path).unwrap();
        let corpus = engine.ingest(&corpus_path).unwrap();
        engine.mosaic_buffer(target.id, &[corpus.id]).unwrap()
    };

    assert_eq!(run().buffer, run().buffer);
}

#[test]
fn test_stereo_mosaic_fills_each_channel() {
    let dir = tempfile::tempdir().unwrap();
    let target_path = dir.path().join("stereo.wav");
    write_wav(
        &target_path,
        &[
            generate_sine(250.0, TEST_SAMPLE_RATE, 3000),
            generate_sine(500.0, TEST_SAMPLE_RATE, 3000),
        ],
        TEST_SAMPLE_RATE,
    );
    let corpus_path = mono_fixture(dir.path(), "corpus.wav", &generate_steps(&STEPS));

    let mut engine = test_engine();
    let target = engine.ingest(&target_path).unwrap();
    let corpus = engine.ingest(&corpus_path).unwrap();
    let output = engine.mosaic_buffer(target.id, &[corpus.id]).unwrap();

    assert_eq!(output.channels(), 2);
    for channel in &output.buffer {
        assert_eq!(channel.len(), 3000);
        assert_has_audio(channel, 0.1);
    }
}

#[test]
fn test_mosaic_writes_wav() {
    let dir = tempfile::tempdir().unwrap();
    let input = generate_steps(&STEPS);
    let path = mono_fixture(dir.path(), "steps.wav", &input);
    let out_path = dir.path().join("mosaic.wav");

    let mut engine = test_engine();
    let media = engine.ingest(&path).unwrap();
    let output = engine.mosaic(media.id, &[media.id], &out_path).unwrap();

    let (samplerate, channels) = read_wav(&out_path);
    assert_eq!(samplerate, TEST_SAMPLE_RATE);
    assert_eq!(channels.len(), 1);
    assert!(signals_approx_equal(&channels[0], &output.buffer[0], FLOAT_EPSILON));
}

#[test]
fn test_int16_sink_quantizes() {
    let dir = tempfile::tempdir().unwrap();
    let input = generate_steps(&STEPS);
    let path = mono_fixture(dir.path(), "steps.wav", &input);
    let out_path = dir.path().join("mosaic16.wav");

    let mut engine = ConsynEngine::builder()
        .config(regular_config())
        .sink(WavSink::new(BitDepth::Int16))
        .build()
        .unwrap();
    let media = engine.ingest(&path).unwrap();
    engine.mosaic(media.id, &[media.id], &out_path).unwrap();

    let (_, channels) = read_wav(&out_path);
    assert!(signals_approx_equal(&channels[0], &input, 2.0 * INT16_EPSILON));
}

#[test]
fn test_time_stretch_fits_target() {
    let dir = tempfile::tempdir().unwrap();
    let target_path = mono_fixture(
        dir.path(),
        "target.wav",
        &generate_sine(300.0, TEST_SAMPLE_RATE, 4500),
    );
    let corpus_path = mono_fixture(dir.path(), "corpus.wav", &generate_steps(&STEPS));

    let mut config = regular_config();
    config.resynthesis.stages = vec![
        StageConfig::TimeStretch(TimeStretchParams {
            factor: None,
            winsize: 256,
            overlap: 4,
        }),
        StageConfig::Envelope { fade: 30 },
    ];
    let mut engine = test_engine_with(config);
    assert_eq!(
        engine.resynthesis_stages(),
        vec!["time_stretch", "envelope"]
    );

    let target = engine.ingest(&target_path).unwrap();
    let corpus = engine.ingest(&corpus_path).unwrap();
    let output = engine.mosaic_buffer(target.id, &[corpus.id]).unwrap();

    assert_eq!(output.duration(), 4500);
    assert!(output.buffer[0].iter().all(|s| s.is_finite()));
    assert_has_audio(&output.buffer[0], 0.05);
    // Every unit fades out to silence at its end.
    for end in [1000, 2000, 3000, 4000, 4500] {
        assert_abs_diff_eq!(output.buffer[0][end - 1], 0.0, epsilon = DSP_EPSILON);
    }
}

#[test]
fn test_no_corpora_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = mono_fixture(dir.path(), "steps.wav", &generate_steps(&STEPS));

    let mut engine = test_engine();
    let media = engine.ingest(&path).unwrap();
    let before = engine.catalog().query(&UnitFilter::all());

    let result = engine.mosaic_buffer(media.id, &[]);
    assert!(matches!(result, Err(Error::Core(CoreError::NoCandidates))));
    assert_eq!(engine.catalog().query(&UnitFilter::all()), before);
}

#[test]
fn test_unknown_media_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = mono_fixture(dir.path(), "steps.wav", &generate_steps(&STEPS));

    let mut engine = test_engine();
    let media = engine.ingest(&path).unwrap();

    let missing_target = engine.mosaic_buffer(MediaFileId(99), &[media.id]);
    assert!(matches!(
        missing_target,
        Err(Error::Core(CoreError::MediaFileNotFound(_)))
    ));

    let missing_corpus = engine.mosaic_buffer(media.id, &[MediaFileId(99)]);
    assert!(matches!(
        missing_corpus,
        Err(Error::Core(CoreError::MediaFileNotFound(_)))
    ));
}

#[test]
fn test_target_without_units_is_silent() {
    let dir = tempfile::tempdir().unwrap();
    let path = mono_fixture(dir.path(), "steps.wav", &generate_steps(&STEPS));

    let mut engine = test_engine();
    let media = engine.ingest(&path).unwrap();
    for unit in channel_units(&engine, media.id, 0) {
        engine.catalog_mut().delete(unit.id).unwrap();
    }

    let output = engine.mosaic_buffer(media.id, &[media.id]).unwrap();
    assert_eq!(output.duration(), 4000);
    assert_silence(&output.buffer[0], SILENCE_THRESHOLD);
}
