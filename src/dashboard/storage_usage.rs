use chrono::{DateTime, Duration, Utc};

use crate::models::StorageInfo;

pub const RETENTION_DAYS: i64 = 7;
pub const WARNING_PERCENT: f64 = 80.0;
pub const FULL_PERCENT: f64 = 100.0;

pub const STORAGE_FULL_NOTICE: &str =
    "Storage full. Archive or delete old tracks to generate new ones.";
pub const RETENTION_NOTICE: &str =
    "Files auto-delete after 7 days. Download your tracks to keep them forever!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageLevel {
    Normal,
    Warning,
    Full,
}

impl UsageLevel {
    pub fn css_class(&self) -> &'static str {
        match self {
            Self::Normal => "bg-indigo-500",
            Self::Warning => "bg-yellow-500",
            Self::Full => "bg-red-600",
        }
    }
}

/// Display model for the storage bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StorageUsage {
    pub info: StorageInfo,
}

impl StorageUsage {
    pub fn new(info: StorageInfo) -> Self {
        Self { info }
    }

    pub fn bar_percent(&self) -> f64 {
        self.info.used_percentage.clamp(0.0, FULL_PERCENT)
    }

    pub fn level(&self) -> UsageLevel {
        let used = self.info.used_percentage;
        if used >= FULL_PERCENT {
            UsageLevel::Full
        } else if used >= WARNING_PERCENT {
            UsageLevel::Warning
        } else {
            UsageLevel::Normal
        }
    }

    pub fn notice(&self) -> &'static str {
        match self.level() {
            UsageLevel::Full => STORAGE_FULL_NOTICE,
            _ => RETENTION_NOTICE,
        }
    }

    pub fn can_generate(&self) -> bool {
        self.level() != UsageLevel::Full
    }

    /// "`<used>` / `<limit>` used"
    pub fn summary(&self) -> String {
        format!(
            "{} / {} used",
            format_bytes(self.info.used_bytes),
            format_bytes(self.info.limit_bytes)
        )
    }
}

/// Whole days until a completed file is removed, rounded up, never negative.
pub fn days_remaining(completed_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let expires_at = completed_at + Duration::days(RETENTION_DAYS);
    let left_ms = (expires_at - now).num_milliseconds();
    if left_ms <= 0 {
        return 0;
    }

    let day_ms = Duration::days(1).num_milliseconds();
    (left_ms + day_ms - 1) / day_ms
}

pub fn format_bytes(bytes: i64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    if bytes <= 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} B", bytes)
    } else {
        let rounded = (value * 10.0).round() / 10.0;
        format!("{} {}", rounded, UNITS[unit])
    }
}
