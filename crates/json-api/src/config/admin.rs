//! Admin Config

use clap::Args;

/// Admin route settings.
#[derive(Debug, Args)]
pub struct AdminConfig {
    /// Key required in `x-api-key` for audit routes; unset locks them entirely
    #[arg(long, env = "ADMIN_API_KEY", hide_env_values = true)]
    pub admin_api_key: Option<String>,
}

impl AdminConfig {
    /// The configured key, ignoring blank values.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.admin_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}
