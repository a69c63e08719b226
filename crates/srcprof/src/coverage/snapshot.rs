//! Counts Snapshot
//!
//! Counter values recorded by one execution. The on-disk form is a
//! big-endian `u32` counter count followed by that many big-endian `u64`
//! values, matching what the generated counter class writes.

use super::metadata::InstrumentationMetadata;
use crate::result::{ProfError, ProfResult};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Per-counter execution counts
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CountsSnapshot {
    counts: Vec<u64>,
}

impl CountsSnapshot {
    /// Wrap counter values
    #[must_use]
    pub fn new(counts: Vec<u64>) -> Self {
        Self { counts }
    }

    /// All-zero snapshot of a given length
    #[must_use]
    pub fn zeroed(len: usize) -> Self {
        Self {
            counts: vec![0; len],
        }
    }

    /// Number of counters
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether there are no counters
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Count for one counter slot
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> u64 {
        self.counts.get(index).copied().unwrap_or(0)
    }

    /// Raw counter values
    #[must_use]
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Sum of all counters
    #[must_use]
    pub fn total_hits(&self) -> u64 {
        self.counts.iter().fold(0u64, |acc, c| acc.saturating_add(*c))
    }

    /// Add another snapshot element-wise.
    ///
    /// Addition saturates, so merging is commutative and associative even
    /// at the numeric limit.
    pub fn merge(&mut self, other: &Self) -> ProfResult<()> {
        if other.len() != self.len() {
            return Err(ProfError::CountMismatch {
                expected: self.len(),
                actual: other.len(),
            });
        }
        for (mine, theirs) in self.counts.iter_mut().zip(&other.counts) {
            *mine = mine.saturating_add(*theirs);
        }
        Ok(())
    }

    /// Merge many snapshots of equal length
    pub fn merge_all<'a>(snapshots: impl IntoIterator<Item = &'a Self>) -> ProfResult<Option<Self>> {
        let mut iter = snapshots.into_iter();
        let Some(first) = iter.next() else {
            return Ok(None);
        };
        let mut merged = first.clone();
        for snapshot in iter {
            merged.merge(snapshot)?;
        }
        Ok(Some(merged))
    }

    /// Check the length against paired metadata
    pub fn validate_against(&self, metadata: &InstrumentationMetadata) -> ProfResult<()> {
        if self.len() != metadata.len() {
            return Err(ProfError::CountMismatch {
                expected: metadata.len(),
                actual: self.len(),
            });
        }
        Ok(())
    }

    // =========================================================================
    // Wire format
    // =========================================================================

    /// Encode into a writer
    pub fn write_to(&self, writer: &mut impl Write) -> ProfResult<()> {
        let len = u32::try_from(self.counts.len())
            .map_err(|_| ProfError::snapshot("too many counters for the snapshot format"))?;
        writer.write_all(&len.to_be_bytes())?;
        for count in &self.counts {
            writer.write_all(&count.to_be_bytes())?;
        }
        Ok(())
    }

    /// Decode from a reader, rejecting truncated bodies and trailing bytes
    pub fn read_from(reader: &mut impl Read) -> ProfResult<Self> {
        let mut header = [0u8; 4];
        read_exact(reader, &mut header, "header")?;
        let len = u32::from_be_bytes(header) as usize;

        let mut counts = Vec::with_capacity(len.min(1 << 20));
        let mut word = [0u8; 8];
        for i in 0..len {
            read_exact(reader, &mut word, &format!("counter {i} of {len}"))?;
            counts.push(u64::from_be_bytes(word));
        }

        let mut extra = [0u8; 1];
        if reader.read(&mut extra)? != 0 {
            return Err(ProfError::snapshot(format!(
                "trailing data after {len} counters"
            )));
        }
        Ok(Self { counts })
    }

    /// Write to a file atomically through a temp file in the same directory
    pub fn save(&self, path: &Path) -> ProfResult<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let tmp = NamedTempFile::new_in(dir)?;
        let mut writer = BufWriter::new(tmp);
        self.write_to(&mut writer)?;
        let tmp = writer.into_inner().map_err(|e| ProfError::Io(e.into_error()))?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Read from a file
    pub fn load(path: &Path) -> ProfResult<Self> {
        if !path.is_file() {
            return Err(ProfError::MissingInput {
                path: path.to_path_buf(),
            });
        }
        let mut reader = BufReader::new(std::fs::File::open(path)?);
        Self::read_from(&mut reader)
    }
}

fn read_exact(reader: &mut impl Read, buf: &mut [u8], what: &str) -> ProfResult<()> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ProfError::snapshot(format!("truncated {what}"))
        } else {
            ProfError::Io(e)
        }
    })
}

impl From<Vec<u64>> for CountsSnapshot {
    fn from(counts: Vec<u64>) -> Self {
        Self::new(counts)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_adds_elementwise() {
        let mut a = CountsSnapshot::new(vec![1, 0, 2]);
        a.merge(&CountsSnapshot::new(vec![0, 3, 0])).unwrap();
        assert_eq!(a.counts(), &[1, 3, 2]);
    }

    #[test]
    fn test_merge_length_mismatch() {
        let mut a = CountsSnapshot::zeroed(10);
        let err = a.merge(&CountsSnapshot::zeroed(12)).unwrap_err();
        assert!(matches!(
            err,
            ProfError::CountMismatch {
                expected: 10,
                actual: 12
            }
        ));
    }

    #[test]
    fn test_merge_saturates() {
        let mut a = CountsSnapshot::new(vec![u64::MAX - 1]);
        a.merge(&CountsSnapshot::new(vec![5])).unwrap();
        assert_eq!(a.get(0), u64::MAX);
    }

    #[test]
    fn test_merge_all() {
        let parts = [
            CountsSnapshot::new(vec![1, 1]),
            CountsSnapshot::new(vec![2, 0]),
            CountsSnapshot::new(vec![0, 4]),
        ];
        let merged = CountsSnapshot::merge_all(&parts).unwrap().unwrap();
        assert_eq!(merged.counts(), &[3, 5]);
        assert!(CountsSnapshot::merge_all(&[]).unwrap().is_none());
    }

    #[test]
    fn test_wire_layout_is_big_endian() {
        let mut bytes = Vec::new();
        CountsSnapshot::new(vec![1, 258]).write_to(&mut bytes).unwrap();
        assert_eq!(
            bytes,
            vec![0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 1, 2]
        );
        let back = CountsSnapshot::read_from(&mut bytes.as_slice()).unwrap();
        assert_eq!(back.counts(), &[1, 258]);
    }

    #[test]
    fn test_truncated_body_rejected() {
        let bytes = [0u8, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0];
        let err = CountsSnapshot::read_from(&mut bytes.as_slice()).unwrap_err();
        assert!(err.to_string().contains("truncated counter 1 of 2"));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let bytes = [0u8, 0, 0, 0, 9];
        let err = CountsSnapshot::read_from(&mut bytes.as_slice()).unwrap_err();
        assert!(matches!(err, ProfError::Snapshot { .. }));
    }

    #[test]
    fn test_empty_input_rejected() {
        let err = CountsSnapshot::read_from(&mut [].as_slice()).unwrap_err();
        assert!(err.to_string().contains("truncated header"));
    }

    #[test]
    fn test_file_round_trip_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counts.dat");
        let snapshot = CountsSnapshot::new(vec![7, 0, 42]);
        snapshot.save(&path).unwrap();
        assert_eq!(CountsSnapshot::load(&path).unwrap(), snapshot);
        let err = CountsSnapshot::load(&dir.path().join("none.dat")).unwrap_err();
        assert!(matches!(err, ProfError::MissingInput { .. }));
    }

    #[test]
    fn test_save_replaces_existing_file_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counts.dat");
        CountsSnapshot::new(vec![1; 64]).save(&path).unwrap();
        let shorter = CountsSnapshot::new(vec![5, 6]);
        shorter.save(&path).unwrap();
        assert_eq!(CountsSnapshot::load(&path).unwrap(), shorter);
        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("counts.dat")]);
    }

    #[test]
    fn test_save_into_missing_directory_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent/counts.dat");
        assert!(matches!(
            CountsSnapshot::new(vec![1]).save(&path),
            Err(ProfError::Io(_))
        ));
        assert!(!path.exists());
    }
}
