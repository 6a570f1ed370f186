//! Labelled feature vectors and the distances between them.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Slot count used when nothing else is configured.
pub const DEFAULT_FEATURE_SLOTS: usize = 29;

/// Fixed-capacity list of `(label, value)` slots describing one unit.
///
/// Slots are positional: two vectors produced by the same extractor hold the
/// same label at the same index, so distances compare slot-by-slot. Lookup by
/// label is a linear scan over at most `max_slots` entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    slots: Vec<(String, f32)>,
    max_slots: usize,
}

impl FeatureVector {
    pub fn new(max_slots: usize) -> Self {
        Self {
            slots: Vec::with_capacity(max_slots),
            max_slots,
        }
    }

    /// Build a vector from labelled values, failing if they overflow `max_slots`.
    pub fn from_pairs<I, S>(pairs: I, max_slots: usize) -> Result<Self>
    where
        I: IntoIterator<Item = (S, f32)>,
        S: Into<String>,
    {
        let mut vector = Self::new(max_slots);
        for (label, value) in pairs {
            vector.push(label, value)?;
        }
        Ok(vector)
    }

    /// Unlabelled vector, used for cluster centroids.
    pub fn from_values(values: &[f32]) -> Self {
        Self {
            slots: values
                .iter()
                .enumerate()
                .map(|(i, &v)| (format!("feat_{}", i), v))
                .collect(),
            max_slots: values.len(),
        }
    }

    pub fn push(&mut self, label: impl Into<String>, value: f32) -> Result<()> {
        if self.slots.len() >= self.max_slots {
            return Err(Error::FeatureSlotsExceeded {
                max: self.max_slots,
            });
        }
        self.slots.push((label.into(), value));
        Ok(())
    }

    pub fn get(&self, label: &str) -> Option<f32> {
        self.slots
            .iter()
            .find(|(l, _)| l == label)
            .map(|&(_, v)| v)
    }

    pub fn value(&self, index: usize) -> Option<f32> {
        self.slots.get(index).map(|&(_, v)| v)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|(l, _)| l.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = f32> + '_ {
        self.slots.iter().map(|&(_, v)| v)
    }

    pub fn to_values(&self) -> Vec<f32> {
        self.values().collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn max_slots(&self) -> usize {
        self.max_slots
    }

    /// Sum of absolute slot differences.
    ///
    /// Slots populated on only one side compare against zero, matching how an
    /// unset catalog column reads back.
    pub fn manhattan(&self, other: &FeatureVector) -> f32 {
        manhattan(&self.to_values(), &other.to_values())
    }

    /// Euclidean distance over the same slot pairing as [`Self::manhattan`].
    pub fn euclidean(&self, other: &FeatureVector) -> f32 {
        euclidean(&self.to_values(), &other.to_values())
    }
}

/// L1 distance between two slot arrays, padding the shorter with zeros.
pub fn manhattan(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            let x = a.get(i).copied().unwrap_or(0.0);
            let y = b.get(i).copied().unwrap_or(0.0);
            (x - y).abs()
        })
        .sum()
}

/// L2 distance between two slot arrays, padding the shorter with zeros.
pub fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            let x = a.get(i).copied().unwrap_or(0.0);
            let y = b.get(i).copied().unwrap_or(0.0);
            (x - y) * (x - y)
        })
        .sum::<f32>()
        .sqrt()
}
