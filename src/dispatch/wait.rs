use chrono::{DateTime, Utc};

/// Minutes a request has been waiting since creation. Never negative.
pub fn wait_minutes(created: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - created).num_minutes().max(0)
}

/// Format a wait time as a short human-readable string.
pub fn format_wait(minutes: i64) -> String {
    if minutes < 1 {
        "agora".to_string()
    } else if minutes < 60 {
        format!("{minutes} min")
    } else {
        format!("{}h {}min", minutes / 60, minutes % 60)
    }
}

/// Elapsed-wait buckets used by the list view filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitBucket {
    UpTo5,
    FiveTo15,
    FifteenTo30,
    Over30,
}

impl WaitBucket {
    pub const ALL: [WaitBucket; 4] = [
        Self::UpTo5,
        Self::FiveTo15,
        Self::FifteenTo30,
        Self::Over30,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::UpTo5 => "0-5 min",
            Self::FiveTo15 => "5-15 min",
            Self::FifteenTo30 => "15-30 min",
            Self::Over30 => "30+ min",
        }
    }

    /// Whether a wait of `minutes` falls in this bucket.
    pub fn contains(&self, minutes: i64) -> bool {
        match self {
            Self::UpTo5 => minutes < 5,
            Self::FiveTo15 => (5..15).contains(&minutes),
            Self::FifteenTo30 => (15..30).contains(&minutes),
            Self::Over30 => minutes >= 30,
        }
    }
}
