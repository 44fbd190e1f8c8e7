//! Segment plan persistence: a compact, sorted, deterministic on-disk record
//! of one download's byte ranges and their completion state.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::range::Segment;

/// The persisted state of one in-progress (or just-finished) download.
///
/// Field order is fixed by declaration order, and `serde_json`'s default
/// struct serialization writes them in that order with no extra
/// whitespace — this keeps the file byte-for-byte deterministic given the
/// same plan contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub url: String,
    pub total_size: u64,
    pub segment_size: u64,
    pub ranges: Vec<Segment>,
}

#[derive(Debug)]
pub enum PlanError {
    Io(std::io::Error),
    Malformed(String),
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::Io(e) => write!(f, "plan I/O error: {e}"),
            PlanError::Malformed(msg) => write!(f, "malformed plan: {msg}"),
        }
    }
}

impl std::error::Error for PlanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlanError::Io(e) => Some(e),
            PlanError::Malformed(_) => None,
        }
    }
}

impl From<std::io::Error> for PlanError {
    fn from(e: std::io::Error) -> Self {
        PlanError::Io(e)
    }
}

impl Plan {
    /// Builds a fresh plan from a known total size and segment size.
    pub fn new(url: impl Into<String>, total_size: u64, segment_size: u64) -> Self {
        Plan {
            url: url.into(),
            total_size,
            segment_size,
            ranges: super::range::build_ranges(total_size, segment_size),
        }
    }

    /// Sum of the lengths of segments marked `done`.
    pub fn completed_bytes(&self) -> u64 {
        self.ranges.iter().filter(|s| s.done).map(Segment::len).sum()
    }

    /// True once every segment is marked done.
    pub fn is_complete(&self) -> bool {
        !self.ranges.is_empty() && self.ranges.iter().all(|s| s.done)
    }

    /// Validates structural invariants: ranges sorted, contiguous, disjoint,
    /// `start <= end` throughout, and the first/last bounds matching
    /// `total_size`.
    fn validate(&self) -> Result<(), PlanError> {
        if self.ranges.is_empty() {
            return if self.total_size == 0 {
                Ok(())
            } else {
                Err(PlanError::Malformed("empty ranges for nonzero total_size".into()))
            };
        }
        let mut expected_start = 0u64;
        for seg in &self.ranges {
            if seg.end < seg.start {
                return Err(PlanError::Malformed(format!(
                    "range end {} < start {}",
                    seg.end, seg.start
                )));
            }
            if seg.start != expected_start {
                return Err(PlanError::Malformed(format!(
                    "range gap or overlap: expected start {}, got {}",
                    expected_start, seg.start
                )));
            }
            expected_start = seg.end + 1;
        }
        if expected_start != self.total_size {
            return Err(PlanError::Malformed(format!(
                "ranges cover {} bytes, expected total_size {}",
                expected_start, self.total_size
            )));
        }
        Ok(())
    }

    /// Loads and validates a plan file.
    pub fn load(path: &Path) -> Result<Self, PlanError> {
        let data = std::fs::read(path)?;
        let plan: Plan = serde_json::from_slice(&data)
            .map_err(|e| PlanError::Malformed(e.to_string()))?;
        plan.validate()?;
        Ok(plan)
    }

    /// Atomically persists the plan: write to `<path>.tmp`, then rename over
    /// `path`.
    pub fn save(&self, path: &Path) -> Result<(), PlanError> {
        let tmp_path = path.with_extension("parts.tmp");
        let body = serde_json::to_vec(self).map_err(|e| PlanError::Malformed(e.to_string()))?;
        std::fs::write(&tmp_path, body)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

/// Read-only status report, computed entirely from a plan file (no network
/// I/O) — what `--status` prints.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanStatus {
    pub total_size: u64,
    pub completed_bytes: u64,
    pub segment_size: u64,
    pub segments_done: usize,
    pub segments_total: usize,
    pub percent: f64,
}

impl From<&Plan> for PlanStatus {
    fn from(plan: &Plan) -> Self {
        let completed_bytes = plan.completed_bytes();
        let segments_done = plan.ranges.iter().filter(|s| s.done).count();
        let percent = if plan.total_size == 0 {
            100.0
        } else {
            (completed_bytes as f64 / plan.total_size as f64) * 100.0
        };
        PlanStatus {
            total_size: plan.total_size,
            completed_bytes,
            segment_size: plan.segment_size,
            segments_done,
            segments_total: plan.ranges.len(),
            percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn new_plan_validates() {
        let plan = Plan::new("https://h/f", 10, 4);
        assert!(plan.validate().is_ok());
        assert_eq!(plan.ranges.len(), 3);
    }

    #[test]
    fn completed_bytes_sums_done_segments() {
        let mut plan = Plan::new("https://h/f", 10, 4);
        plan.ranges[0].done = true;
        assert_eq!(plan.completed_bytes(), 4);
        plan.ranges[1].done = true;
        assert_eq!(plan.completed_bytes(), 8);
        assert!(!plan.is_complete());
        plan.ranges[2].done = true;
        assert!(plan.is_complete());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file.par.parts");
        let mut plan = Plan::new("https://h/f", 100, 30);
        plan.ranges[0].done = true;
        plan.save(&path).unwrap();
        assert!(path.exists());
        assert!(!dir.path().join("file.par.parts.tmp").exists());

        let loaded = Plan::load(&path).unwrap();
        assert_eq!(loaded, plan);
    }

    #[test]
    fn save_is_deterministic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.parts");
        let plan = Plan::new("https://h/f", 100, 30);
        plan.save(&path).unwrap();
        let first = std::fs::read(&path).unwrap();
        plan.save(&path).unwrap();
        let second = std::fs::read(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn load_rejects_gap_or_overlap() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.parts");
        let bad = Plan {
            url: "https://h/f".into(),
            total_size: 10,
            segment_size: 5,
            ranges: vec![
                Segment { start: 0, end: 3, done: false },
                Segment { start: 5, end: 9, done: false },
            ],
        };
        std::fs::write(&path, serde_json::to_vec(&bad).unwrap()).unwrap();
        assert!(Plan::load(&path).is_err());
    }

    #[test]
    fn load_rejects_end_before_start() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad2.parts");
        let bad = Plan {
            url: "https://h/f".into(),
            total_size: 10,
            segment_size: 5,
            ranges: vec![Segment { start: 5, end: 2, done: false }],
        };
        std::fs::write(&path, serde_json::to_vec(&bad).unwrap()).unwrap();
        assert!(Plan::load(&path).is_err());
    }

    #[test]
    fn status_reports_percent() {
        let mut plan = Plan::new("https://h/f", 100, 25);
        plan.ranges[0].done = true;
        let status = PlanStatus::from(&plan);
        assert_eq!(status.completed_bytes, 25);
        assert_eq!(status.percent, 25.0);
        assert_eq!(status.segments_done, 1);
        assert_eq!(status.segments_total, 4);
    }
}
