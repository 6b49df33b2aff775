//! Sweep Config

use std::time::Duration;

use clap::Args;

/// Background sweep settings.
#[derive(Debug, Args)]
pub struct SweepConfig {
    /// Seconds between sweeps of lapsed consents; 0 disables the sweeper
    #[arg(long, env = "SWEEP_INTERVAL_SECONDS", default_value_t = 60_u64)]
    pub sweep_interval_seconds: u64,
}

impl SweepConfig {
    /// The sweep period, or `None` when sweeping is disabled.
    #[must_use]
    pub fn interval(&self) -> Option<Duration> {
        (self.sweep_interval_seconds > 0).then(|| Duration::from_secs(self.sweep_interval_seconds))
    }
}
