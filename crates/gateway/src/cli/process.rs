//! `leadqual process-sessions`: one inactivity sweep, then exit.

use std::sync::Arc;

use lq_domain::config::Config;

use crate::bootstrap;
use crate::runtime::sweeper::process_inactive_sessions;

pub async fn run(config: Config) -> anyhow::Result<()> {
    let state = bootstrap::build_app_state(Arc::new(config)).await?;
    let report = process_inactive_sessions(&state).await;

    println!(
        "inactive: {}  extracted: {}  failed: {}",
        report.inactive, report.extracted, report.failed
    );
    if report.failed > 0 {
        anyhow::bail!("{} session(s) could not be saved", report.failed);
    }
    Ok(())
}
