use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Inactivity scheduler
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "d_true")]
    pub enabled: bool,
    /// Period between sweeps.
    #[serde(default = "d_300")]
    pub interval_secs: u64,
    /// Delay before the first sweep after boot.
    #[serde(default = "d_30")]
    pub startup_delay_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: d_true(),
            interval_secs: d_300(),
            startup_delay_secs: d_30(),
        }
    }
}

fn d_true() -> bool {
    true
}
fn d_300() -> u64 {
    300
}
fn d_30() -> u64 {
    30
}
