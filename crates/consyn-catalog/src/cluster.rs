//! K-means clustering over catalogued feature vectors.
//!
//! Centroids start as the features of `k` distinct units drawn uniformly at
//! random. Each iteration assigns every unit to its nearest centroid by L1
//! distance, then moves each centroid to the per-slot mean of its members. A
//! centroid with no members stays where it was.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use consyn_core::features::manhattan;
use consyn_core::{Error, FeatureVector, Result, UnitId};

use crate::catalog::{Catalog, UnitFilter};

/// Clustering parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Iteration cap
    pub max_iterations: usize,
    /// Largest per-slot centroid movement still counted as settled.
    /// Zero requires bit-exact equality.
    pub epsilon: f32,
    /// Seed for centroid initialization; `None` draws from entropy
    pub seed: Option<u64>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            epsilon: 0.0,
            seed: None,
        }
    }
}

impl ClusterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(Error::InvalidConfig(
                "clustering needs at least one iteration".into(),
            ));
        }
        if !(self.epsilon.is_finite() && self.epsilon >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "clustering epsilon must be non-negative, got {}",
                self.epsilon
            )));
        }
        Ok(())
    }
}

/// Outcome of a clustering run.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterReport {
    /// Assignment/update rounds performed
    pub iterations: usize,
    /// False when the iteration cap was reached first
    pub converged: bool,
    /// Member count per cluster id
    pub sizes: Vec<usize>,
    pub centroids: Vec<FeatureVector>,
}

/// Partition every unit in `catalog` into `k` clusters and annotate each unit
/// with its cluster id.
///
/// Hitting the iteration cap is not an error: the last assignment is kept and
/// the report says `converged: false`.
pub fn cluster<C>(catalog: &mut C, k: usize, config: &ClusterConfig) -> Result<ClusterReport>
where
    C: Catalog + ?Sized,
{
    config.validate()?;

    let mut ids: Vec<UnitId> = Vec::new();
    let mut points: Vec<Vec<f32>> = Vec::new();
    for unit in catalog.query(&UnitFilter::all()) {
        if let Some(features) = catalog.features(unit.id) {
            ids.push(unit.id);
            points.push(features.to_values());
        }
    }

    if points.is_empty() {
        return Err(Error::NoCandidates);
    }
    if k == 0 || k > points.len() {
        return Err(Error::InvalidConfig(format!(
            "cannot form {} clusters from {} units",
            k,
            points.len()
        )));
    }

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut centroids: Vec<Vec<f32>> = rand::seq::index::sample(&mut rng, points.len(), k)
        .into_iter()
        .map(|i| points[i].clone())
        .collect();

    let mut assignment = vec![0usize; points.len()];
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iterations {
        iterations += 1;
        assign(&points, &centroids, &mut assignment);

        let previous = centroids.clone();
        update_centroids(&points, &assignment, &mut centroids);

        let moved = max_movement(&previous, &centroids);
        tracing::trace!(iteration = iterations, moved, "k-means iteration");
        if settled(&previous, &centroids, config.epsilon) {
            converged = true;
            break;
        }
    }

    for (&id, &cluster) in ids.iter().zip(&assignment) {
        catalog.set_cluster(id, Some(cluster))?;
    }

    let mut sizes = vec![0usize; k];
    for &cluster in &assignment {
        sizes[cluster] += 1;
    }

    if converged {
        tracing::debug!(k, iterations, ?sizes, "clustering converged");
    } else {
        tracing::warn!("{}", Error::ClusteringNonConvergent { iterations });
    }

    Ok(ClusterReport {
        iterations,
        converged,
        sizes,
        centroids: centroids
            .iter()
            .map(|c| FeatureVector::from_values(c))
            .collect(),
    })
}

/// Nearest centroid per point; ties go to the lowest centroid index.
fn assign(points: &[Vec<f32>], centroids: &[Vec<f32>], assignment: &mut [usize]) {
    for (point, slot) in points.iter().zip(assignment.iter_mut()) {
        let mut best = 0;
        let mut best_distance = f32::INFINITY;
        for (index, centroid) in centroids.iter().enumerate() {
            let distance = manhattan(point, centroid);
            if distance < best_distance {
                best = index;
                best_distance = distance;
            }
        }
        *slot = best;
    }
}

/// Move each centroid to the mean of its members. Empty clusters keep their centroid.
fn update_centroids(points: &[Vec<f32>], assignment: &[usize], centroids: &mut [Vec<f32>]) {
    for (index, centroid) in centroids.iter_mut().enumerate() {
        let members: Vec<&Vec<f32>> = points
            .iter()
            .zip(assignment)
            .filter(|(_, a)| **a == index)
            .map(|(p, _)| p)
            .collect();
        if members.is_empty() {
            continue;
        }

        let slots = members.iter().map(|m| m.len()).max().unwrap_or(0);
        let mut sum = vec![0.0f32; slots];
        for member in &members {
            for (s, v) in sum.iter_mut().zip(member.iter()) {
                *s += v;
            }
        }
        let count = members.len() as f32;
        *centroid = sum.into_iter().map(|s| s / count).collect();
    }
}

fn max_movement(previous: &[Vec<f32>], current: &[Vec<f32>]) -> f32 {
    previous
        .iter()
        .zip(current)
        .flat_map(|(p, c)| p.iter().zip(c).map(|(a, b)| (a - b).abs()))
        .fold(0.0, f32::max)
}

fn settled(previous: &[Vec<f32>], current: &[Vec<f32>], epsilon: f32) -> bool {
    if epsilon == 0.0 {
        previous == current
    } else {
        previous.iter().zip(current).all(|(p, c)| {
            p.len() == c.len() && p.iter().zip(c).all(|(a, b)| (a - b).abs() <= epsilon)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use consyn_core::Unit;
    use std::collections::HashMap;
    use std::path::Path;

    /// Units whose single feature lies in tight groups around `centers`.
    fn grouped_catalog(centers: &[f32]) -> (MemoryCatalog, HashMap<UnitId, usize>) {
        let mut catalog = MemoryCatalog::new();
        let media = catalog
            .add_media_file(Path::new("/corpus.wav"), 1, 44100, 100_000)
            .unwrap()
            .id;
        let mut groups = HashMap::new();
        let mut position = 0;

        for (group, center) in centers.iter().enumerate() {
            for offset in [0.0f32, 0.1, 0.2, 0.3] {
                let unit = Unit {
                    id: UnitId(0),
                    media_file: media,
                    channel: 0,
                    position,
                    duration: 100,
                    cluster: None,
                };
                position += 100;
                let saved = catalog
                    .save(unit, FeatureVector::from_values(&[center + offset]))
                    .unwrap();
                groups.insert(saved.id, group);
            }
        }
        (catalog, groups)
    }

    fn seeded(seed: u64) -> ClusterConfig {
        ClusterConfig {
            seed: Some(seed),
            ..Default::default()
        }
    }

    #[test]
    fn test_separated_groups_give_k_nonempty_clusters() {
        for seed in 0..16 {
            let (mut catalog, _) = grouped_catalog(&[0.0, 100.0, 1000.0]);
            let report = cluster(&mut catalog, 3, &seeded(seed)).unwrap();

            assert!(report.converged, "seed {} did not converge", seed);
            assert!(report.iterations <= 10);
            assert_eq!(report.sizes.len(), 3);
            assert!(report.sizes.iter().all(|&n| n > 0), "seed {}: {:?}", seed, report.sizes);
            assert_eq!(report.sizes.iter().sum::<usize>(), 12);

            let annotated = catalog.query(&UnitFilter::all());
            assert!(annotated.iter().all(|u| matches!(u.cluster, Some(c) if c < 3)));
        }
    }

    #[test]
    fn test_two_groups_are_recovered() {
        for seed in 0..16 {
            let (mut catalog, groups) = grouped_catalog(&[0.0, 100.0]);
            let report = cluster(&mut catalog, 2, &seeded(seed)).unwrap();
            assert!(report.converged);
            assert_eq!(report.sizes, vec![4, 4]);

            let units = catalog.query(&UnitFilter::all());
            for a in &units {
                for b in &units {
                    assert_eq!(groups[&a.id] == groups[&b.id], a.cluster == b.cluster);
                }
            }
        }
    }

    #[test]
    fn test_cluster_filter_after_run() {
        let (mut catalog, _) = grouped_catalog(&[0.0, 100.0]);
        cluster(&mut catalog, 2, &seeded(3)).unwrap();
        let first = catalog.query(&UnitFilter::all())[0].cluster.unwrap();
        assert_eq!(catalog.query(&UnitFilter::all().cluster(first)).len(), 4);
    }

    #[test]
    fn test_empty_cluster_keeps_centroid() {
        let points = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let mut centroids = vec![vec![0.0, 0.0], vec![9.0, 9.0]];
        update_centroids(&points, &[0, 0], &mut centroids);
        assert_eq!(centroids[0], vec![2.0, 3.0]);
        assert_eq!(centroids[1], vec![9.0, 9.0]);
    }

    #[test]
    fn test_assignment_tie_goes_to_lowest_centroid() {
        let points = vec![vec![5.0]];
        let centroids = vec![vec![4.0], vec![6.0]];
        let mut assignment = vec![9];
        assign(&points, &centroids, &mut assignment);
        assert_eq!(assignment, vec![0]);
    }

    #[test]
    fn test_iteration_cap_is_not_an_error() {
        // One centroid starts on a unit and must move to the mean, which no
        // unit sits on, so a single round cannot settle.
        let (mut catalog, _) = grouped_catalog(&[0.0, 100.0]);
        let config = ClusterConfig {
            max_iterations: 1,
            ..seeded(0)
        };
        let report = cluster(&mut catalog, 1, &config).unwrap();
        assert_eq!(report.iterations, 1);
        assert!(!report.converged);
        assert_eq!(report.sizes, vec![8]);
        assert!(catalog
            .query(&UnitFilter::all())
            .iter()
            .all(|u| u.cluster == Some(0)));

        let config = ClusterConfig {
            max_iterations: 2,
            ..seeded(0)
        };
        let report = cluster(&mut catalog, 1, &config).unwrap();
        assert_eq!(report.iterations, 2);
        assert!(report.converged);
    }

    #[test]
    fn test_bad_k() {
        let (mut catalog, _) = grouped_catalog(&[0.0]);
        assert!(matches!(
            cluster(&mut catalog, 0, &ClusterConfig::default()),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            cluster(&mut catalog, 5, &ClusterConfig::default()),
            Err(Error::InvalidConfig(_))
        ));

        let mut empty = MemoryCatalog::new();
        assert!(matches!(
            cluster(&mut empty, 1, &ClusterConfig::default()),
            Err(Error::NoCandidates)
        ));
    }

    #[test]
    fn test_config_validation() {
        assert!(ClusterConfig::default().validate().is_ok());
        let bad = ClusterConfig {
            max_iterations: 0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
