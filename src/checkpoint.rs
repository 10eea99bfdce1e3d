//! Durable result set
//!
//! Accepted candidates are kept in memory and the whole set is rewritten to the
//! output file after every acceptance. Each write goes to a temporary file in
//! the destination directory and is renamed over the previous file, so the file
//! on disk is always a complete result set.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::github::RawCandidate;

const INDENT: &[u8] = b"    ";

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("failed to serialize candidates: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to replace {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One accepted candidate as written to the output file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    #[serde(flatten)]
    pub candidate: RawCandidate,
    #[serde(rename = "num_contributors")]
    pub contributor_count: usize,
}

impl CandidateRecord {
    pub fn from_candidate(candidate: &RawCandidate, contributor_count: usize) -> Self {
        Self {
            candidate: candidate.clone(),
            contributor_count,
        }
    }
}

#[derive(Debug)]
pub struct CheckpointStore {
    path: PathBuf,
    records: Vec<CandidateRecord>,
}

impl CheckpointStore {
    /// An empty store writing to `path`; the parent directory is created if missing
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, CheckpointError> {
        let path = path.into();
        if let Some(parent) = parent_dir(&path) {
            fs::create_dir_all(parent).map_err(|source| CheckpointError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Ok(Self {
            path,
            records: Vec::new(),
        })
    }

    /// Read a previously written result set
    pub fn load(path: &Path) -> Result<Vec<CandidateRecord>, CheckpointError> {
        let content = fs::read_to_string(path).map_err(|source| CheckpointError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[CandidateRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Add `record` and rewrite the whole set
    ///
    /// If the write fails the record is dropped again, so memory and disk keep
    /// agreeing on the last successfully written set.
    pub fn append(&mut self, record: CandidateRecord) -> Result<(), CheckpointError> {
        self.records.push(record);
        if let Err(e) = self.write() {
            self.records.pop();
            return Err(e);
        }
        debug!("Saved {} candidates to {}", self.records.len(), self.path.display());
        Ok(())
    }

    fn write(&self) -> Result<(), CheckpointError> {
        let dir = parent_dir(&self.path).unwrap_or_else(|| Path::new("."));
        let io_err = |source: std::io::Error| CheckpointError::Io {
            path: self.path.clone(),
            source,
        };

        let tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            let mut serializer =
                serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(INDENT));
            self.records.serialize(&mut serializer)?;
            writer.flush().map_err(io_err)?;
        }
        tmp.as_file().sync_all().map_err(io_err)?;

        tmp.persist(&self.path).map_err(|e| CheckpointError::Persist {
            path: self.path.clone(),
            source: e.error,
        })?;
        Ok(())
    }
}

fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}
