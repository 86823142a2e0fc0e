//! In-memory catalog of datasets and the jobs run over them.
//!
//! # Snapshot Format
//!
//! The catalog persists as a single binary record with three independently
//! counted sections, each in ascending id order:
//!
//! ```text
//! +-----------------+-------------+
//! | next_dataset_id | next_job_id |                 i32, i32
//! +-----------------+-------------+
//! | count | (dataset_id, name)*   |                 dataset names
//! +-------------------------------+
//! | (dataset_id, count, job_id*)* |                 one per dataset, same count
//! +-------------------------------+
//! | count | (job_id, name)*       |                 job names
//! +-------------------------------+
//! ```
//!
//! # Job Removal
//!
//! `remove_job` detaches a job from its dataset but leaves its entry in the
//! name table. Such a job is no longer *live*: `has_job_id`, `has_job` and
//! `get_job_id` ignore it, while `get_job_name` still resolves the stale name
//! and snapshots keep carrying it. Removing the owning dataset drops the
//! stale name only if the job was still attached, so stale names can outlive
//! their dataset.
//!
//! Ids are never reused, including the ids of removed datasets and jobs.

mod shared;

pub use shared::SharedCatalog;

use std::collections::{BTreeMap, BTreeSet};

use crate::codec::{Binary, BinaryRecord, Decoder, Encoder, Record};
use crate::error::{Error, Result};
use crate::storage::ReadStream;

pub type DatasetId = i32;
pub type JobId = i32;

/// The dataset and job registry.
///
/// All mutation goes through `&mut self`; share one catalog between threads
/// through [`SharedCatalog`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseMetadata {
    next_dataset_id: DatasetId,
    next_job_id: JobId,
    dataset_names: BTreeMap<DatasetId, String>,
    dataset_job_ids: BTreeMap<DatasetId, BTreeSet<JobId>>,
    job_names: BTreeMap<JobId, String>,
}

impl DatabaseMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_dataset_id(&self) -> DatasetId {
        self.next_dataset_id
    }

    pub fn next_job_id(&self) -> JobId {
        self.next_job_id
    }

    /// Linear scan over dataset names.
    pub fn has_dataset(&self, name: &str) -> bool {
        self.dataset_names.values().any(|n| n == name)
    }

    pub fn has_dataset_id(&self, dataset_id: DatasetId) -> bool {
        self.dataset_names.contains_key(&dataset_id)
    }

    /// Id of the first dataset, in id order, named `name`.
    pub fn get_dataset_id(&self, name: &str) -> Result<DatasetId> {
        self.dataset_names
            .iter()
            .find(|&(_, n)| n.as_str() == name)
            .map(|(&id, _)| id)
            .ok_or_else(|| Error::DatasetNotFound(name.to_string()))
    }

    pub fn get_dataset_name(&self, dataset_id: DatasetId) -> Result<&str> {
        self.dataset_names
            .get(&dataset_id)
            .map(String::as_str)
            .ok_or(Error::UnknownDataset(dataset_id))
    }

    /// Jobs attached to a dataset.
    pub fn job_ids(&self, dataset_id: DatasetId) -> Result<&BTreeSet<JobId>> {
        self.dataset_job_ids
            .get(&dataset_id)
            .ok_or(Error::UnknownDataset(dataset_id))
    }

    pub fn dataset_ids(&self) -> impl Iterator<Item = DatasetId> + '_ {
        self.dataset_names.keys().copied()
    }

    pub fn dataset_count(&self) -> usize {
        self.dataset_names.len()
    }

    /// Registers a dataset with no jobs and returns its id.
    pub fn add_dataset(&mut self, name: impl Into<String>) -> Result<DatasetId> {
        let dataset_id = self.next_dataset_id;
        self.next_dataset_id = dataset_id
            .checked_add(1)
            .ok_or(Error::IdExhausted("dataset"))?;
        self.dataset_names.insert(dataset_id, name.into());
        self.dataset_job_ids.insert(dataset_id, BTreeSet::new());
        tracing::debug!(dataset_id, "Added dataset");
        Ok(dataset_id)
    }

    /// Removes a dataset together with the names of the jobs attached to it.
    pub fn remove_dataset(&mut self, dataset_id: DatasetId) -> Result<()> {
        let job_ids = self
            .dataset_job_ids
            .remove(&dataset_id)
            .ok_or(Error::UnknownDataset(dataset_id))?;
        for job_id in &job_ids {
            self.job_names.remove(job_id);
        }
        self.dataset_names.remove(&dataset_id);
        tracing::debug!(dataset_id, jobs = job_ids.len(), "Removed dataset");
        Ok(())
    }

    /// Whether a live job is named `name`.
    pub fn has_job(&self, name: &str) -> bool {
        self.get_job_id(name).is_ok()
    }

    /// Whether `job_id` is attached to some dataset. Scans every dataset's
    /// job set.
    pub fn has_job_id(&self, job_id: JobId) -> bool {
        self.dataset_job_ids
            .values()
            .any(|jobs| jobs.contains(&job_id))
    }

    /// Id of the first live job, in id order, named `name`.
    pub fn get_job_id(&self, name: &str) -> Result<JobId> {
        self.job_names
            .iter()
            .find(|&(&id, n)| n.as_str() == name && self.has_job_id(id))
            .map(|(&id, _)| id)
            .ok_or_else(|| Error::JobNotFound(name.to_string()))
    }

    /// Name of a job, including jobs detached by [`remove_job`](Self::remove_job).
    pub fn get_job_name(&self, job_id: JobId) -> Result<&str> {
        self.job_names
            .get(&job_id)
            .map(String::as_str)
            .ok_or(Error::UnknownJob(job_id))
    }

    /// Jobs whose names are still recorded but that belong to no dataset.
    pub fn stale_job_ids(&self) -> impl Iterator<Item = JobId> + '_ {
        self.job_names
            .keys()
            .copied()
            .filter(|&id| !self.has_job_id(id))
    }

    /// Registers a job on `dataset_id` and returns its id. An unknown dataset
    /// leaves the job counter untouched.
    pub fn add_job(&mut self, dataset_id: DatasetId, name: impl Into<String>) -> Result<JobId> {
        let next_job_id = self
            .next_job_id
            .checked_add(1)
            .ok_or(Error::IdExhausted("job"))?;
        let jobs = self
            .dataset_job_ids
            .get_mut(&dataset_id)
            .ok_or(Error::UnknownDataset(dataset_id))?;

        let job_id = self.next_job_id;
        jobs.insert(job_id);
        self.next_job_id = next_job_id;
        self.job_names.insert(job_id, name.into());
        tracing::debug!(dataset_id, job_id, "Added job");
        Ok(job_id)
    }

    /// Detaches `job_id` from every dataset. The name entry stays behind.
    /// Returns whether any dataset held the job.
    pub fn remove_job(&mut self, job_id: JobId) -> bool {
        let mut removed = false;
        for jobs in self.dataset_job_ids.values_mut() {
            removed |= jobs.remove(&job_id);
        }
        if removed {
            tracing::debug!(job_id, "Detached job");
        }
        removed
    }

    /// Panicking lookups for call sites where a miss is a programming error.
    pub fn expect_dataset_id(&self, name: &str) -> DatasetId {
        match self.get_dataset_id(name) {
            Ok(id) => id,
            Err(e) => panic!("catalog inconsistency: {}", e),
        }
    }

    pub fn expect_dataset_name(&self, dataset_id: DatasetId) -> &str {
        match self.get_dataset_name(dataset_id) {
            Ok(name) => name,
            Err(e) => panic!("catalog inconsistency: {}", e),
        }
    }

    pub fn expect_job_id(&self, name: &str) -> JobId {
        match self.get_job_id(name) {
            Ok(id) => id,
            Err(e) => panic!("catalog inconsistency: {}", e),
        }
    }

    pub fn expect_job_name(&self, job_id: JobId) -> &str {
        match self.get_job_name(job_id) {
            Ok(name) => name,
            Err(e) => panic!("catalog inconsistency: {}", e),
        }
    }

    /// Checks the structural invariants of the catalog.
    pub fn validate(&self) -> Result<()> {
        if !self.dataset_names.keys().eq(self.dataset_job_ids.keys()) {
            return Err(Error::InvalidState(
                "dataset name table and job set table cover different datasets".to_string(),
            ));
        }
        for (dataset_id, jobs) in &self.dataset_job_ids {
            if let Some(job_id) = jobs.iter().find(|&id| !self.job_names.contains_key(id)) {
                return Err(Error::InvalidState(format!(
                    "job {} of dataset {} has no name",
                    job_id, dataset_id
                )));
            }
        }
        if let Some(&max) = self.dataset_names.keys().next_back() {
            if max >= self.next_dataset_id {
                return Err(Error::InvalidState(format!(
                    "dataset id {} not below next dataset id {}",
                    max, self.next_dataset_id
                )));
            }
        }
        if let Some(&max) = self.job_names.keys().next_back() {
            if max >= self.next_job_id {
                return Err(Error::InvalidState(format!(
                    "job id {} not below next job id {}",
                    max, self.next_job_id
                )));
            }
        }
        Ok(())
    }
}

impl Record for DatabaseMetadata {
    const NAME: &'static str = "catalog snapshot";
    type Format = Binary;
}

impl BinaryRecord for DatabaseMetadata {
    fn validate(&self) -> Result<()> {
        DatabaseMetadata::validate(self)
    }

    fn encode_into(&self, enc: &mut Encoder) {
        enc.write_i32(self.next_dataset_id);
        enc.write_i32(self.next_job_id);

        enc.write_len(self.dataset_names.len());
        for (&dataset_id, name) in &self.dataset_names {
            enc.write_i32(dataset_id);
            enc.write_str(name);
        }
        for (&dataset_id, jobs) in &self.dataset_job_ids {
            enc.write_i32(dataset_id);
            enc.write_len(jobs.len());
            for &job_id in jobs {
                enc.write_i32(job_id);
            }
        }

        enc.write_len(self.job_names.len());
        for (&job_id, name) in &self.job_names {
            enc.write_i32(job_id);
            enc.write_str(name);
        }
    }

    fn decode_from<R: ReadStream>(dec: &mut Decoder<'_, R>) -> Result<Self> {
        let mut meta = DatabaseMetadata {
            next_dataset_id: dec.read_i32("next dataset id")?,
            next_job_id: dec.read_i32("next job id")?,
            ..Default::default()
        };

        // Each dataset appears in both of the first two sections
        let num_datasets = dec.read_len("dataset count", 24)?;
        for _ in 0..num_datasets {
            let dataset_id = dec.read_i32("dataset id")?;
            let name = dec.read_string("dataset name")?;
            if meta.dataset_names.insert(dataset_id, name).is_some() {
                return Err(duplicate("dataset id", dataset_id));
            }
        }
        for _ in 0..num_datasets {
            let dataset_id = dec.read_i32("dataset id")?;
            let num_jobs = dec.read_len("dataset job count", 4)?;
            let mut jobs = BTreeSet::new();
            for _ in 0..num_jobs {
                let job_id = dec.read_i32("job id")?;
                if !jobs.insert(job_id) {
                    return Err(duplicate("job id in dataset job set", job_id));
                }
            }
            if meta.dataset_job_ids.insert(dataset_id, jobs).is_some() {
                return Err(duplicate("dataset job set", dataset_id));
            }
        }

        let num_jobs = dec.read_len("job count", 12)?;
        for _ in 0..num_jobs {
            let job_id = dec.read_i32("job id")?;
            let name = dec.read_string("job name")?;
            if meta.job_names.insert(job_id, name).is_some() {
                return Err(duplicate("job id", job_id));
            }
        }

        meta.validate()?;
        Ok(meta)
    }
}

fn duplicate(what: &str, id: i32) -> Error {
    Error::InvalidState(format!("duplicate {} {} in catalog snapshot", what, id))
}
