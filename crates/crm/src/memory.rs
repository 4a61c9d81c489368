use std::collections::HashMap;

use chrono::{DateTime, Utc};
use lq_domain::error::Result;
use parking_lot::Mutex;

use crate::record::ExtractedData;
use crate::store::{LeadContext, LeadStore};

/// One lead as held by [`MemoryLeadStore`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredLead {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub budget: Option<i64>,
    pub ready_to_pay: bool,
    pub wants_call: bool,
    /// Last full record written by the extractor.
    pub extracted: Option<ExtractedData>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Compliance-screening redirect as held by [`MemoryLeadStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct ComplianceQuery {
    pub user_id: String,
    pub query: String,
    pub topic: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Process-local lead store used when no database is configured.
#[derive(Default)]
pub struct MemoryLeadStore {
    leads: Mutex<HashMap<String, StoredLead>>,
    queries: Mutex<Vec<ComplianceQuery>>,
}

impl MemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user_id: &str) -> Option<StoredLead> {
        self.leads.lock().get(user_id).cloned()
    }

    pub fn compliance_queries(&self) -> Vec<ComplianceQuery> {
        self.queries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.leads.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_lead<F: FnOnce(&mut StoredLead)>(&self, user_id: &str, f: F) {
        let mut leads = self.leads.lock();
        let lead = leads.entry(user_id.to_owned()).or_default();
        f(lead);
        lead.updated_at = Some(Utc::now());
    }
}

#[async_trait::async_trait]
impl LeadStore for MemoryLeadStore {
    async fn lead_context(&self, user_id: &str) -> Result<Option<LeadContext>> {
        Ok(self.leads.lock().get(user_id).map(|l| LeadContext {
            name: l.name.clone(),
            budget: l.budget,
            location: l.location.clone(),
        }))
    }

    async fn upsert_extracted(&self, user_id: &str, data: &ExtractedData) -> Result<()> {
        self.with_lead(user_id, |lead| {
            lead.name = data.name.clone();
            lead.phone = data.phone.clone();
            lead.location = data.location.clone();
            lead.budget = data.budget;
            lead.ready_to_pay = data.ready_to_pay;
            lead.wants_call = data.wants_call;
            lead.extracted = Some(data.clone());
        });
        Ok(())
    }

    async fn update_contact(&self, user_id: &str, name: Option<&str>, phone: Option<&str>) -> Result<()> {
        self.with_lead(user_id, |lead| {
            if let Some(name) = name {
                lead.name = Some(name.to_owned());
            }
            if let Some(phone) = phone {
                lead.phone = Some(phone.to_owned());
            }
        });
        Ok(())
    }

    async fn update_intents(&self, user_id: &str, ready_to_pay: bool, wants_call: bool) -> Result<()> {
        self.with_lead(user_id, |lead| {
            lead.ready_to_pay |= ready_to_pay;
            lead.wants_call |= wants_call;
        });
        Ok(())
    }

    async fn log_compliance_query(&self, user_id: &str, query: &str, topic: &str) -> Result<()> {
        self.with_lead(user_id, |_| {});
        self.queries.lock().push(ComplianceQuery {
            user_id: user_id.to_owned(),
            query: query.to_owned(),
            topic: topic.to_owned(),
            status: "Redirected".into(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
