//! Unit storage.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use consyn_core::{Error, FeatureVector, MediaFile, MediaFileId, Result, Unit, UnitId};

/// Restricts a unit query. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitFilter {
    pub media_files: Option<Vec<MediaFileId>>,
    pub channel: Option<usize>,
    pub cluster: Option<usize>,
}

impl UnitFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn media_files(mut self, ids: impl IntoIterator<Item = MediaFileId>) -> Self {
        self.media_files = Some(ids.into_iter().collect());
        self
    }

    pub fn media_file(self, id: MediaFileId) -> Self {
        self.media_files([id])
    }

    pub fn channel(mut self, channel: usize) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn cluster(mut self, cluster: usize) -> Self {
        self.cluster = Some(cluster);
        self
    }

    pub fn matches(&self, unit: &Unit) -> bool {
        self.media_files
            .as_ref()
            .map_or(true, |ids| ids.contains(&unit.media_file))
            && self.channel.map_or(true, |c| c == unit.channel)
            && self.cluster.map_or(true, |c| unit.cluster == Some(c))
    }
}

/// Storage for media files, units and their feature vectors.
///
/// Queries return units in ascending id order.
pub trait Catalog {
    /// Register a recording; returns the stored record with its new id.
    fn add_media_file(
        &mut self,
        path: &Path,
        channels: usize,
        samplerate: u32,
        duration: usize,
    ) -> Result<MediaFile>;

    fn media_file(&self, id: MediaFileId) -> Option<&MediaFile>;

    fn media_file_by_path(&self, path: &Path) -> Option<&MediaFile>;

    fn media_files(&self) -> Vec<MediaFile>;

    /// Forget a recording and every unit cut from it.
    fn remove_media_file(&mut self, id: MediaFileId) -> Result<MediaFile>;

    /// Store a unit with its features.
    ///
    /// A unit whose id is `UnitId(0)` is new and gets the next free id; any
    /// other id must already exist and is overwritten.
    fn save(&mut self, unit: Unit, features: FeatureVector) -> Result<Unit>;

    fn delete(&mut self, id: UnitId) -> Result<Unit>;

    fn unit(&self, id: UnitId) -> Option<&Unit>;

    fn features(&self, id: UnitId) -> Option<&FeatureVector>;

    fn query(&self, filter: &UnitFilter) -> Vec<Unit>;

    /// Record the cluster a unit belongs to.
    fn set_cluster(&mut self, id: UnitId, cluster: Option<usize>) -> Result<()>;

    /// The unit from `sources` whose features are closest to `query` by L1
    /// distance, ties going to the lowest id.
    fn nearest(&self, query: &FeatureVector, sources: &[MediaFileId]) -> Result<Unit>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredUnit {
    unit: Unit,
    features: FeatureVector,
}

/// On-disk layout of a [`MemoryCatalog`].
#[derive(Serialize, Deserialize)]
struct Snapshot {
    next_media_file: u64,
    next_unit: u64,
    media_files: Vec<MediaFile>,
    units: Vec<StoredUnit>,
}

/// Catalog held in memory, saved and restored as JSON.
#[derive(Debug, Clone)]
pub struct MemoryCatalog {
    media_files: BTreeMap<MediaFileId, MediaFile>,
    units: BTreeMap<UnitId, StoredUnit>,
    next_media_file: u64,
    next_unit: u64,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self {
            media_files: BTreeMap::new(),
            units: BTreeMap::new(),
            next_media_file: 1,
            next_unit: 1,
        }
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Write the catalog to `path` as JSON.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let snapshot = Snapshot {
            next_media_file: self.next_media_file,
            next_unit: self.next_unit,
            media_files: self.media_files.values().cloned().collect(),
            units: self.units.values().cloned().collect(),
        };
        let writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(writer, &snapshot)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        tracing::debug!(
            path = %path.as_ref().display(),
            units = self.units.len(),
            "catalog saved"
        );
        Ok(())
    }

    /// Read a catalog written by [`Self::save_json`].
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let snapshot: Snapshot =
            serde_json::from_reader(reader).map_err(|e| Error::Serialization(e.to_string()))?;

        let catalog = Self {
            media_files: snapshot
                .media_files
                .into_iter()
                .map(|m| (m.id, m))
                .collect(),
            units: snapshot
                .units
                .into_iter()
                .map(|s| (s.unit.id, s))
                .collect(),
            next_media_file: snapshot.next_media_file,
            next_unit: snapshot.next_unit,
        };
        tracing::debug!(
            path = %path.as_ref().display(),
            units = catalog.units.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog for MemoryCatalog {
    fn add_media_file(
        &mut self,
        path: &Path,
        channels: usize,
        samplerate: u32,
        duration: usize,
    ) -> Result<MediaFile> {
        let media = MediaFile {
            id: MediaFileId(self.next_media_file),
            path: PathBuf::from(path),
            channels,
            samplerate,
            duration,
        };
        self.next_media_file += 1;
        self.media_files.insert(media.id, media.clone());
        Ok(media)
    }

    fn media_file(&self, id: MediaFileId) -> Option<&MediaFile> {
        self.media_files.get(&id)
    }

    fn media_file_by_path(&self, path: &Path) -> Option<&MediaFile> {
        self.media_files.values().find(|m| m.is_at(path))
    }

    fn media_files(&self) -> Vec<MediaFile> {
        self.media_files.values().cloned().collect()
    }

    fn remove_media_file(&mut self, id: MediaFileId) -> Result<MediaFile> {
        let media = self
            .media_files
            .remove(&id)
            .ok_or_else(|| Error::MediaFileNotFound(id.to_string()))?;
        let before = self.units.len();
        self.units.retain(|_, stored| stored.unit.media_file != id);
        tracing::debug!(
            media_file = %id,
            units = before - self.units.len(),
            "removed media file"
        );
        Ok(media)
    }

    fn save(&mut self, mut unit: Unit, features: FeatureVector) -> Result<Unit> {
        if !self.media_files.contains_key(&unit.media_file) {
            return Err(Error::MediaFileNotFound(unit.media_file.to_string()));
        }
        if unit.id == UnitId(0) {
            unit.id = UnitId(self.next_unit);
            self.next_unit += 1;
        } else if !self.units.contains_key(&unit.id) {
            return Err(Error::UnitNotFound(unit.id));
        }

        self.units.insert(
            unit.id,
            StoredUnit {
                unit: unit.clone(),
                features,
            },
        );
        Ok(unit)
    }

    fn delete(&mut self, id: UnitId) -> Result<Unit> {
        self.units
            .remove(&id)
            .map(|stored| stored.unit)
            .ok_or(Error::UnitNotFound(id))
    }

    fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id).map(|s| &s.unit)
    }

    fn features(&self, id: UnitId) -> Option<&FeatureVector> {
        self.units.get(&id).map(|s| &s.features)
    }

    fn query(&self, filter: &UnitFilter) -> Vec<Unit> {
        self.units
            .values()
            .filter(|s| filter.matches(&s.unit))
            .map(|s| s.unit.clone())
            .collect()
    }

    fn set_cluster(&mut self, id: UnitId, cluster: Option<usize>) -> Result<()> {
        let stored = self.units.get_mut(&id).ok_or(Error::UnitNotFound(id))?;
        stored.unit.cluster = cluster;
        Ok(())
    }

    fn nearest(&self, query: &FeatureVector, sources: &[MediaFileId]) -> Result<Unit> {
        let mut best: Option<(&StoredUnit, f32)> = None;

        for stored in self
            .units
            .values()
            .filter(|s| sources.contains(&s.unit.media_file))
        {
            let distance = query.manhattan(&stored.features);
            // Ascending id order; strict comparison keeps the lowest id on ties.
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((stored, distance));
            }
        }

        best.map(|(stored, _)| stored.unit.clone())
            .ok_or(Error::NoCandidates)
    }
}
