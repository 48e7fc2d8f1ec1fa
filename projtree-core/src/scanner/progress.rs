use std::path::PathBuf;

/// Messages sent from a background scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanMessage {
    /// Started scanning a project directory
    Started(PathBuf),
    /// Progress update
    Progress(ScanProgress),
    /// Scan completed
    Completed,
    /// Scan was cancelled; the worker returns what it found so far
    Cancelled,
}

/// Position of a scan within its progress range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanProgress {
    pub value: u64,
    pub maximum: u64,
}

impl ScanProgress {
    /// Completed share of the range, between 0 and 1
    pub fn fraction(&self) -> f64 {
        if self.maximum == 0 {
            return 1.0;
        }
        (self.value.min(self.maximum) as f64) / (self.maximum as f64)
    }

    pub fn percent(&self) -> u8 {
        (self.fraction() * 100.0).round() as u8
    }

    pub fn is_done(&self) -> bool {
        self.value >= self.maximum
    }
}
