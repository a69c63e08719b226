//! Instrumentation Metadata
//!
//! Durable map from counter id to block, written once per instrumentation
//! run and read by every later aggregation. The file is JSON with a small
//! header followed by one record per unit in counter order.

use super::block::{Block, BlockId, DecisionPoint};
use super::extractor::ExtractionOutcome;
use crate::result::{ProfError, ProfResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Current metadata format version
pub const METADATA_FORMAT_VERSION: u32 = 1;

/// Default metadata file name inside an output directory
pub const METADATA_FILE: &str = "metadata.json";

/// Hex-encoded SHA-256 of a source text
#[must_use]
pub fn source_hash(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Metadata for one instrumented compilation unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitMetadata {
    /// Source path relative to the instrumentation root
    pub path: PathBuf,
    /// Declared package
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    /// SHA-256 of the original source
    pub source_hash: String,
    /// First global counter id of the unit
    pub counter_base: u32,
    /// Number of counters the unit owns
    pub counter_count: u32,
    /// Blocks in id order
    pub blocks: Vec<Block>,
    /// Decisions in id order
    #[serde(default)]
    pub decisions: Vec<DecisionPoint>,
}

impl UnitMetadata {
    /// Build from an extraction whose ids are already global
    #[must_use]
    pub fn from_outcome(outcome: &ExtractionOutcome, source_hash: String) -> Self {
        Self {
            path: outcome.path.clone(),
            package: outcome.package.clone(),
            source_hash,
            counter_base: outcome.blocks.first().map_or(0, |b| b.id.as_u32()),
            counter_count: outcome.blocks.len() as u32,
            blocks: outcome.blocks.clone(),
            decisions: outcome.decisions.clone(),
        }
    }

    /// Global counter ids owned by the unit
    #[must_use]
    pub fn counter_range(&self) -> Range<usize> {
        let start = self.counter_base as usize;
        start..start + self.counter_count as usize
    }

    /// Block by global id
    #[must_use]
    pub fn block(&self, id: BlockId) -> Option<&Block> {
        let index = id.as_u32().checked_sub(self.counter_base)?;
        self.blocks.get(index as usize)
    }

    /// Package name, empty for the default package
    #[must_use]
    pub fn package_name(&self) -> &str {
        self.package.as_deref().unwrap_or("")
    }
}

/// Whole-program instrumentation metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentationMetadata {
    /// File format version
    pub format_version: u32,
    /// Total counters across all units
    pub counter_count: u32,
    /// Hash over every unit's path and source hash
    pub source_identity: String,
    /// Counter class referenced by the instrumented sources
    pub counter_class: String,
    /// Units in counter order
    pub units: Vec<UnitMetadata>,
}

impl InstrumentationMetadata {
    /// Assemble metadata from units already in counter order
    #[must_use]
    pub fn from_units(units: Vec<UnitMetadata>, counter_class: &str) -> Self {
        let counter_count = units.iter().map(|u| u.counter_count).sum();
        let mut hasher = Sha256::new();
        for unit in &units {
            hasher.update(unit.path.to_string_lossy().as_bytes());
            hasher.update(b"\0");
            hasher.update(unit.source_hash.as_bytes());
            hasher.update(b"\n");
        }
        Self {
            format_version: METADATA_FORMAT_VERSION,
            counter_count,
            source_identity: format!("{:x}", hasher.finalize()),
            counter_class: counter_class.to_string(),
            units,
        }
    }

    /// Total counters as a length
    #[must_use]
    pub fn len(&self) -> usize {
        self.counter_count as usize
    }

    /// Whether no block was instrumented
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counter_count == 0
    }

    /// All blocks in id order
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.units.iter().flat_map(|u| u.blocks.iter())
    }

    /// All decisions in id order
    pub fn decisions(&self) -> impl Iterator<Item = &DecisionPoint> {
        self.units.iter().flat_map(|u| u.decisions.iter())
    }

    /// Unit owning a counter id
    #[must_use]
    pub fn unit_for(&self, id: BlockId) -> Option<&UnitMetadata> {
        let index = id.index();
        let pos = self
            .units
            .partition_point(|u| u.counter_range().end <= index);
        self.units
            .get(pos)
            .filter(|u| u.counter_range().contains(&index))
    }

    /// Block by global id
    #[must_use]
    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.unit_for(id)?.block(id)
    }

    /// Check header and id consistency.
    ///
    /// Units must own consecutive counter ranges that add up to the header
    /// count, and every block must sit at its own id.
    pub fn validate(&self) -> ProfResult<()> {
        if self.format_version != METADATA_FORMAT_VERSION {
            return Err(ProfError::metadata(format!(
                "unsupported format version {} (expected {METADATA_FORMAT_VERSION})",
                self.format_version
            )));
        }
        let mut next = 0u32;
        for unit in &self.units {
            if unit.blocks.len() != unit.counter_count as usize {
                return Err(ProfError::metadata(format!(
                    "{}: declares {} counters but lists {} blocks",
                    unit.path.display(),
                    unit.counter_count,
                    unit.blocks.len()
                )));
            }
            if unit.counter_count > 0 && unit.counter_base != next {
                return Err(ProfError::metadata(format!(
                    "{}: counter base {} does not follow previous unit ending at {next}",
                    unit.path.display(),
                    unit.counter_base
                )));
            }
            for (offset, block) in unit.blocks.iter().enumerate() {
                if block.id.as_u32() != unit.counter_base + offset as u32 {
                    return Err(ProfError::metadata(format!(
                        "{}: block {} out of order",
                        unit.path.display(),
                        block.id
                    )));
                }
            }
            next += unit.counter_count;
        }
        if next != self.counter_count {
            return Err(ProfError::metadata(format!(
                "header declares {} counters but units own {next}",
                self.counter_count
            )));
        }
        Ok(())
    }

    /// Write atomically: a temp file in the target directory is renamed over
    /// the destination, so readers never see a partial document.
    pub fn save(&self, path: &Path) -> ProfResult<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, self)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        debug!(path = %path.display(), counters = self.counter_count, "Wrote metadata");
        Ok(())
    }

    /// Read and validate a metadata file
    pub fn load(path: &Path) -> ProfResult<Self> {
        if !path.is_file() {
            return Err(ProfError::MissingInput {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path)?;
        let metadata: Self = serde_json::from_str(&text)?;
        metadata.validate()?;
        Ok(metadata)
    }
}
