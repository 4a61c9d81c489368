use chrono::{DateTime, Utc};
use lq_domain::config::CrmConfig;
use lq_domain::error::{Error, Result};
use lq_domain::LeadPath;
use lq_sessions::{Message, SessionData, SessionMirror};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::Row;

use crate::record::ExtractedData;
use crate::store::{LeadContext, LeadStore};

fn from_sqlx(e: sqlx::Error) -> Error {
    Error::Database(e.to_string())
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Postgres-backed lead store and session mirror.
#[derive(Clone)]
pub struct PgLeadStore {
    pool: PgPool,
}

impl PgLeadStore {
    /// Connect using `config.database_url()` and apply bundled migrations
    /// when `auto_migrate` is on.
    pub async fn connect(config: &CrmConfig) -> Result<Self> {
        let url = config
            .database_url()
            .ok_or_else(|| Error::Config("crm.database_url is not set".into()))?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect(url)
            .await
            .map_err(from_sqlx)?;

        if config.auto_migrate {
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|e| Error::Database(format!("migration failed: {e}")))?;
        }

        tracing::info!(max_connections = config.max_connections, "crm database connected");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lead id for `user_id`, inserting a bare lead row if needed.
    async fn ensure_lead(&self, user_id: &str) -> Result<String> {
        let row = sqlx::query(
            "INSERT INTO leads (id, manychat_id) VALUES ($1, $2) \
             ON CONFLICT (manychat_id) DO UPDATE SET manychat_id = EXCLUDED.manychat_id \
             RETURNING id",
        )
        .bind(new_id())
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(from_sqlx)?;
        Ok(row.get("id"))
    }

    async fn insert_session_row(&self, lead_id: &str, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("INSERT INTO lead_sessions (id, lead_id, last_activity) VALUES ($1, $2, $3)")
            .bind(new_id())
            .bind(lead_id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(from_sqlx)?;
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LeadStore
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl LeadStore for PgLeadStore {
    async fn lead_context(&self, user_id: &str) -> Result<Option<LeadContext>> {
        let row = sqlx::query("SELECT name, budget, location FROM leads WHERE manychat_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(from_sqlx)?;
        Ok(row.map(|r| LeadContext {
            name: r.get("name"),
            budget: r.get("budget"),
            location: r.get("location"),
        }))
    }

    async fn upsert_extracted(&self, user_id: &str, data: &ExtractedData) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO leads (
                id, manychat_id, name, location, phone, instagram_handle, is_important,
                path, interest, niche, budget, budget_tier, age, age_bracket, gender,
                occupation, experience_level, product_category, request_type, target_price,
                status, wants_call, ready_to_pay, compliance_risk, ai_context, bot_score
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26
            )
            ON CONFLICT (manychat_id) DO UPDATE SET
                name = EXCLUDED.name,
                location = EXCLUDED.location,
                phone = EXCLUDED.phone,
                instagram_handle = EXCLUDED.instagram_handle,
                is_important = EXCLUDED.is_important,
                path = EXCLUDED.path,
                interest = EXCLUDED.interest,
                niche = EXCLUDED.niche,
                budget = EXCLUDED.budget,
                budget_tier = EXCLUDED.budget_tier,
                age = EXCLUDED.age,
                age_bracket = EXCLUDED.age_bracket,
                gender = EXCLUDED.gender,
                occupation = EXCLUDED.occupation,
                experience_level = EXCLUDED.experience_level,
                product_category = EXCLUDED.product_category,
                request_type = EXCLUDED.request_type,
                target_price = EXCLUDED.target_price,
                status = EXCLUDED.status,
                wants_call = EXCLUDED.wants_call,
                ready_to_pay = EXCLUDED.ready_to_pay,
                compliance_risk = EXCLUDED.compliance_risk,
                ai_context = EXCLUDED.ai_context,
                bot_score = EXCLUDED.bot_score,
                updated_at = now()
            "#,
        )
        .bind(new_id())
        .bind(user_id)
        .bind(&data.name)
        .bind(&data.location)
        .bind(&data.phone)
        .bind(&data.instagram_handle)
        .bind(data.is_important)
        .bind(&data.path)
        .bind(&data.interest)
        .bind(&data.niche)
        .bind(data.budget)
        .bind(&data.budget_tier)
        .bind(data.age)
        .bind(&data.age_bracket)
        .bind(&data.gender)
        .bind(&data.occupation)
        .bind(&data.experience_level)
        .bind(&data.product_category)
        .bind(&data.request_type)
        .bind(data.target_price)
        .bind(&data.status)
        .bind(data.wants_call)
        .bind(data.ready_to_pay)
        .bind(data.compliance_risk)
        .bind(&data.ai_context)
        .bind(i32::from(data.bot_score))
        .execute(&self.pool)
        .await
        .map_err(from_sqlx)?;
        Ok(())
    }

    async fn update_contact(&self, user_id: &str, name: Option<&str>, phone: Option<&str>) -> Result<()> {
        sqlx::query(
            "INSERT INTO leads (id, manychat_id, name, phone) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (manychat_id) DO UPDATE SET \
               name = COALESCE(EXCLUDED.name, leads.name), \
               phone = COALESCE(EXCLUDED.phone, leads.phone), \
               updated_at = now()",
        )
        .bind(new_id())
        .bind(user_id)
        .bind(name)
        .bind(phone)
        .execute(&self.pool)
        .await
        .map_err(from_sqlx)?;
        Ok(())
    }

    async fn update_intents(&self, user_id: &str, ready_to_pay: bool, wants_call: bool) -> Result<()> {
        sqlx::query(
            "INSERT INTO leads (id, manychat_id, ready_to_pay, wants_call) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (manychat_id) DO UPDATE SET \
               ready_to_pay = leads.ready_to_pay OR EXCLUDED.ready_to_pay, \
               wants_call = leads.wants_call OR EXCLUDED.wants_call, \
               updated_at = now()",
        )
        .bind(new_id())
        .bind(user_id)
        .bind(ready_to_pay)
        .bind(wants_call)
        .execute(&self.pool)
        .await
        .map_err(from_sqlx)?;
        Ok(())
    }

    async fn log_compliance_query(&self, user_id: &str, query: &str, topic: &str) -> Result<()> {
        let lead_id = self.ensure_lead(user_id).await?;
        sqlx::query(
            "INSERT INTO compliance_queries (id, lead_id, query, topic, status) \
             VALUES ($1, $2, $3, $4, 'Redirected')",
        )
        .bind(new_id())
        .bind(&lead_id)
        .bind(query)
        .bind(topic)
        .execute(&self.pool)
        .await
        .map_err(from_sqlx)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "postgres"
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SessionMirror
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Latest session row joined onto its lead, as read back from Postgres.
struct MirroredRow {
    lead_id: String,
    messages: Option<Vec<Message>>,
    current_path: Option<String>,
    last_activity: Option<DateTime<Utc>>,
    is_processed: Option<bool>,
}

impl MirroredRow {
    /// `None` when the lead has no session row yet.
    fn into_session(self, external_user_id: &str) -> Option<SessionData> {
        let messages = self.messages?;
        let last_activity = self.last_activity?;
        Some(SessionData {
            lead_id: self.lead_id,
            external_user_id: external_user_id.to_owned(),
            current_path: self.current_path.as_deref().and_then(LeadPath::parse),
            messages,
            last_activity,
            is_processed: self.is_processed.unwrap_or(false),
        })
    }
}

#[async_trait::async_trait]
impl SessionMirror for PgLeadStore {
    async fn load_or_create(&self, external_user_id: &str) -> Result<(SessionData, bool)> {
        let row = sqlx::query(
            r#"
            SELECT l.id AS lead_id, s.messages, s.current_path, s.last_activity, s.is_processed
            FROM leads l
            LEFT JOIN LATERAL (
                SELECT messages, current_path, last_activity, is_processed
                FROM lead_sessions
                WHERE lead_id = l.id
                ORDER BY updated_at DESC
                LIMIT 1
            ) s ON TRUE
            WHERE l.manychat_id = $1
            "#,
        )
        .bind(external_user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(from_sqlx)?;

        let now = Utc::now();
        match row {
            Some(r) => {
                let messages: Option<Json<Vec<Message>>> = r.try_get("messages").map_err(from_sqlx)?;
                let mirrored = MirroredRow {
                    lead_id: r.get("lead_id"),
                    messages: messages.map(|m| m.0),
                    current_path: r.get("current_path"),
                    last_activity: r.get("last_activity"),
                    is_processed: r.get("is_processed"),
                };
                let lead_id = mirrored.lead_id.clone();
                match mirrored.into_session(external_user_id) {
                    Some(session) => Ok((session, false)),
                    None => {
                        self.insert_session_row(&lead_id, now).await?;
                        Ok((SessionData::new(external_user_id, lead_id, now), false))
                    }
                }
            }
            None => {
                let lead_id = self.ensure_lead(external_user_id).await?;
                self.insert_session_row(&lead_id, now).await?;
                Ok((SessionData::new(external_user_id, lead_id, now), true))
            }
        }
    }

    async fn sync(&self, session: &SessionData) -> Result<()> {
        let path = session.current_path.map(|p| p.letter().to_string());
        let updated = sqlx::query(
            r#"
            UPDATE lead_sessions
            SET messages = $1, current_path = $2, last_activity = $3,
                is_processed = $4, updated_at = now()
            WHERE id = (
                SELECT id FROM lead_sessions
                WHERE lead_id = $5
                ORDER BY updated_at DESC
                LIMIT 1
            )
            "#,
        )
        .bind(Json(&session.messages))
        .bind(&path)
        .bind(session.last_activity)
        .bind(session.is_processed)
        .bind(&session.lead_id)
        .execute(&self.pool)
        .await
        .map_err(from_sqlx)?;

        if updated.rows_affected() == 0 {
            sqlx::query(
                "INSERT INTO lead_sessions (id, lead_id, messages, current_path, last_activity, is_processed) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(new_id())
            .bind(&session.lead_id)
            .bind(Json(&session.messages))
            .bind(&path)
            .bind(session.last_activity)
            .bind(session.is_processed)
            .execute(&self.pool)
            .await
            .map_err(from_sqlx)?;
        }
        Ok(())
    }
}
