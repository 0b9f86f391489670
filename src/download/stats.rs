//! Download statistics shared by concurrent transfers.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::download::manager::DownloadOutcome;
use crate::media::MediaKind;

/// Outcome counters of one media kind.
#[derive(Debug, Default)]
pub struct KindCounters {
    passed: AtomicU64,
    downloaded: AtomicU64,
    errors: AtomicU64,
}

impl KindCounters {
    /// Count one item outcome. Incomplete files count as passed: they were not re-fetched.
    pub fn record(&self, outcome: DownloadOutcome) {
        let counter = match outcome {
            DownloadOutcome::Downloaded => &self.downloaded,
            DownloadOutcome::Passed | DownloadOutcome::Incomplete => &self.passed,
            DownloadOutcome::Error => &self.errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> KindStats {
        KindStats {
            passed: self.passed.load(Ordering::Relaxed),
            downloaded: self.downloaded.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time counters of one kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindStats {
    pub passed: u64,
    pub downloaded: u64,
    pub errors: u64,
}

/// Thread-safe accumulator injected into every download manager of a run.
#[derive(Debug, Default)]
pub struct SyncStats {
    kinds: [KindCounters; 4],
    incomplete_files: Mutex<Vec<PathBuf>>,
}

impl SyncStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters bound to one media kind.
    pub fn counters(&self, kind: MediaKind) -> &KindCounters {
        &self.kinds[kind.index()]
    }

    /// Remember a file that looks truncated, for later remediation.
    pub fn add_incomplete_file(&self, path: PathBuf) {
        let mut files = self.incomplete_files.lock().unwrap_or_else(|e| e.into_inner());
        if !files.contains(&path) {
            files.push(path);
        }
    }

    pub fn incomplete_files(&self) -> Vec<PathBuf> {
        self.incomplete_files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn clear_incomplete_files(&self) {
        self.incomplete_files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            kinds: MediaKind::ALL.map(|kind| (kind, self.counters(kind).snapshot())),
            incomplete_files: self.incomplete_files(),
        }
    }
}

/// Point-in-time copy of a run's statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub kinds: [(MediaKind, KindStats); 4],
    pub incomplete_files: Vec<PathBuf>,
}

impl StatsSnapshot {
    pub fn kind(&self, kind: MediaKind) -> KindStats {
        self.kinds[kind.index()].1
    }

    pub fn total_downloaded(&self) -> u64 {
        self.kinds.iter().map(|(_, s)| s.downloaded).sum()
    }

    pub fn total_passed(&self) -> u64 {
        self.kinds.iter().map(|(_, s)| s.passed).sum()
    }

    pub fn total_errors(&self) -> u64 {
        self.kinds.iter().map(|(_, s)| s.errors).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_per_kind() {
        let stats = SyncStats::new();
        stats.counters(MediaKind::Image).record(DownloadOutcome::Downloaded);
        stats.counters(MediaKind::Image).record(DownloadOutcome::Passed);
        stats.counters(MediaKind::Video).record(DownloadOutcome::Error);
        stats.counters(MediaKind::File).record(DownloadOutcome::Incomplete);

        let snap = stats.snapshot();
        assert_eq!(
            snap.kind(MediaKind::Image),
            KindStats { passed: 1, downloaded: 1, errors: 0 }
        );
        assert_eq!(snap.kind(MediaKind::Video).errors, 1);
        assert_eq!(snap.kind(MediaKind::File).passed, 1);
        assert_eq!(snap.total_downloaded(), 1);
        assert_eq!(snap.total_passed(), 2);
        assert_eq!(snap.total_errors(), 1);
    }

    #[test]
    fn test_incomplete_files_are_deduplicated() {
        let stats = SyncStats::new();
        stats.add_incomplete_file(PathBuf::from("/a"));
        stats.add_incomplete_file(PathBuf::from("/a"));
        stats.add_incomplete_file(PathBuf::from("/b"));
        assert_eq!(stats.incomplete_files().len(), 2);

        stats.clear_incomplete_files();
        assert!(stats.snapshot().incomplete_files.is_empty());
    }
}
