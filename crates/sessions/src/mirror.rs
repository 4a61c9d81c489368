use lq_domain::error::Result;

use crate::session::SessionData;

/// Relational copy of live sessions.
///
/// Consulted on cache miss and written after every turn. Implementations own
/// lead creation: the returned session's `lead_id` is the lead row's id.
#[async_trait::async_trait]
pub trait SessionMirror: Send + Sync {
    /// Latest mirrored session for `external_user_id`, creating the lead and
    /// an empty session row when none exist. The flag is `true` when a new
    /// lead was created.
    async fn load_or_create(&self, external_user_id: &str) -> Result<(SessionData, bool)>;

    /// Upsert the lead's latest session row from `session`.
    async fn sync(&self, session: &SessionData) -> Result<()>;
}
