use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CRM (relational lead store)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmConfig {
    /// Postgres connection URL.
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "d_5")]
    pub max_connections: u32,
    /// Apply the bundled schema on startup.
    #[serde(default = "d_true")]
    pub auto_migrate: bool,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: d_5(),
            auto_migrate: d_true(),
        }
    }
}

impl CrmConfig {
    /// The database URL when it points at a real database.
    ///
    /// Blank URLs and the `your_project` placeholder from the sample env file
    /// count as "not configured".
    pub fn database_url(&self) -> Option<&str> {
        self.database_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.contains("your_project"))
    }

    pub fn is_configured(&self) -> bool {
        self.database_url().is_some()
    }
}

fn d_5() -> u32 {
    5
}
fn d_true() -> bool {
    true
}
