//! Content fingerprints for staleness checks
//!
//! A checksum covers any mix of files, directory trees and in-memory
//! snapshots (such as captured tool output). Same inputs = same checksum.

use crate::error::{NpmError, NpmResult};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// A single checksum input
#[derive(Debug, Clone, Copy)]
pub enum SumInput<'a> {
    /// A file or directory on disk
    Path(&'a Path),
    /// Bytes captured in memory
    Bytes(&'a [u8]),
}

/// Computes a stable fingerprint over one or more inputs
pub trait Summer: Send + Sync {
    fn sum(&self, inputs: &[SumInput<'_>]) -> NpmResult<String>;
}

/// SHA256 checksum calculator
#[derive(Debug, Clone, Copy, Default)]
pub struct ChecksumCalculator;

impl ChecksumCalculator {
    pub fn new() -> Self {
        Self
    }

    fn sum_input(input: &SumInput<'_>) -> NpmResult<String> {
        match input {
            SumInput::Path(path) => Self::sum_path(path),
            SumInput::Bytes(bytes) => Ok(hex::encode(Sha256::digest(bytes))),
        }
    }

    fn sum_path(path: &Path) -> NpmResult<String> {
        let metadata = fs::metadata(path)
            .map_err(|e| NpmError::io(format!("checksumming {}", path.display()), e))?;

        if !metadata.is_dir() {
            let contents = fs::read(path)
                .map_err(|e| NpmError::io(format!("reading {}", path.display()), e))?;
            return Ok(hex::encode(Sha256::digest(&contents)));
        }

        let mut hasher = Sha256::new();
        for entry in WalkDir::new(path).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                NpmError::io(format!("walking {}", path.display()), std::io::Error::from(e))
            })?;
            if entry.depth() == 0 {
                continue;
            }

            let relative = entry.path().strip_prefix(path).unwrap_or(entry.path());
            hasher.update(relative.to_string_lossy().as_bytes());
            hasher.update([0]);

            let file_type = entry.file_type();
            if file_type.is_symlink() {
                let target = fs::read_link(entry.path()).map_err(|e| {
                    NpmError::io(format!("reading link {}", entry.path().display()), e)
                })?;
                hasher.update(b"l");
                hasher.update(target.to_string_lossy().as_bytes());
            } else if file_type.is_file() {
                let contents = fs::read(entry.path()).map_err(|e| {
                    NpmError::io(format!("reading {}", entry.path().display()), e)
                })?;
                hasher.update(b"f");
                hasher.update(Sha256::digest(&contents));
            } else {
                hasher.update(b"d");
            }
            hasher.update([0]);
        }

        Ok(hex::encode(hasher.finalize()))
    }
}

impl Summer for ChecksumCalculator {
    fn sum(&self, inputs: &[SumInput<'_>]) -> NpmResult<String> {
        let sums = inputs
            .iter()
            .map(Self::sum_input)
            .collect::<NpmResult<Vec<_>>>()?;

        if sums.len() == 1 {
            return Ok(sums.into_iter().next().unwrap_or_default());
        }

        let mut hasher = Sha256::new();
        for sum in &sums {
            hasher.update(sum.as_bytes());
        }
        Ok(hex::encode(hasher.finalize()))
    }
}
