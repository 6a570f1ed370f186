//! Clustering integration tests

use consyn::prelude::*;
use consyn::ClusterConfig;

use crate::helpers::*;

fn ingested_engine(dir: &std::path::Path) -> (ConsynEngine, MediaFile) {
    let path = mono_fixture(
        dir,
        "steps.wav",
        &generate_steps(&[110.0, 120.0, 1800.0, 1900.0, 110.0, 1850.0]),
    );
    let mut config = regular_config();
    config.clustering = ClusterConfig {
        seed: Some(3),
        ..ClusterConfig::default()
    };
    let mut engine = test_engine_with(config);
    let media = engine.ingest(&path).unwrap();
    (engine, media)
}

#[test]
fn test_cluster_annotates_every_unit() {
    let dir = tempfile::tempdir().unwrap();
    let (mut engine, media) = ingested_engine(dir.path());

    let report = engine.cluster(2).unwrap();
    assert_eq!(report.sizes.len(), 2);
    assert_eq!(report.centroids.len(), 2);
    assert_eq!(report.sizes.iter().sum::<usize>(), 6);

    let units = channel_units(&engine, media.id, 0);
    assert!(units.iter().all(|u| matches!(u.cluster, Some(c) if c < 2)));

    for (cluster, size) in report.sizes.iter().enumerate() {
        let members = engine
            .catalog()
            .query(&UnitFilter::all().cluster(cluster));
        assert_eq!(members.len(), *size);
    }
}

#[test]
fn test_cluster_is_repeatable_with_seed() {
    let dir = tempfile::tempdir().unwrap();
    let (mut first, _) = ingested_engine(dir.path());
    let (mut second, _) = ingested_engine(dir.path());

    assert_eq!(first.cluster(3).unwrap(), second.cluster(3).unwrap());
}

#[test]
fn test_one_cluster_holds_everything() {
    let dir = tempfile::tempdir().unwrap();
    let (mut engine, _) = ingested_engine(dir.path());

    let report = engine.cluster(1).unwrap();
    assert!(report.converged);
    assert_eq!(report.sizes, vec![6]);
}

#[test]
fn test_too_many_clusters() {
    let dir = tempfile::tempdir().unwrap();
    let (mut engine, media) = ingested_engine(dir.path());

    assert!(engine.cluster(7).is_err());
    assert!(engine.cluster(0).is_err());
    // A failed run leaves the units unannotated.
    let units = channel_units(&engine, media.id, 0);
    assert!(units.iter().all(|u| u.cluster.is_none()));
}

#[test]
fn test_empty_catalog_cannot_cluster() {
    let mut engine = test_engine();
    assert!(engine.cluster(1).is_err());
}
