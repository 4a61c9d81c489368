use lq_domain::error::Result;

use crate::record::ExtractedData;

/// Previously persisted attributes the responder folds into its context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadContext {
    pub name: Option<String>,
    pub budget: Option<i64>,
    pub location: Option<String>,
}

/// Lead records keyed by external user id (unique).
///
/// Every write creates the lead when it does not exist yet.
#[async_trait::async_trait]
pub trait LeadStore: Send + Sync {
    /// Known name/budget/location, `None` when there is no lead yet.
    async fn lead_context(&self, user_id: &str) -> Result<Option<LeadContext>>;

    /// Write every field of `data` (update-if-exists, create otherwise).
    async fn upsert_extracted(&self, user_id: &str, data: &ExtractedData) -> Result<()>;

    /// Record contact details supplied by the messaging platform. `None`
    /// leaves the stored value unchanged.
    async fn update_contact(&self, user_id: &str, name: Option<&str>, phone: Option<&str>) -> Result<()>;

    /// Raise intent flags. A flag already set stays set.
    async fn update_intents(&self, user_id: &str, ready_to_pay: bool, wants_call: bool) -> Result<()>;

    /// Log a question redirected to the compliance-screening app.
    async fn log_compliance_query(&self, user_id: &str, query: &str, topic: &str) -> Result<()>;

    /// Backend name for logs.
    fn name(&self) -> &str;
}
