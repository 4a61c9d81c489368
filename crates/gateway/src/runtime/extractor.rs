//! Extractor: transcript → validated [`ExtractedData`] via a JSON-mode LLM call.
//!
//! The model's JSON is never trusted structurally. Every field goes through
//! [`validate_and_clean`], which coerces types and applies the lead rules
//! (phone normalization, lakh budgets, canonical path labels).

use std::time::Instant;

use lq_crm::{budget_tier, ExtractedData, LeadStore};
use lq_domain::chat::ChatMessage;
use lq_domain::config::BrandConfig;
use lq_domain::error::{Error, Result};
use lq_domain::trace::TraceEvent;
use lq_domain::LeadPath;
use lq_prompts::extraction_prompt;
use lq_providers::registry::ROLE_EXTRACTOR;
use lq_providers::{ChatRequest, ProviderRegistry};
use lq_sessions::{Message, SessionData};
use serde_json::{Map, Value};

const EXTRACT_INSTRUCTION: &str = "Extract the data from the conversation above.";

/// Budgets below this are read as lakhs.
const LAKH_THRESHOLD: f64 = 1000.0;
const LAKH: f64 = 100_000.0;

static NULL: Value = Value::Null;

/// `ROLE: content` lines separated by blank lines.
pub fn format_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str().to_uppercase(), m.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Run extraction for one session. `None` for an empty transcript or on any
/// LLM / parse failure.
pub async fn extract_data(
    llm: &ProviderRegistry,
    brand: &BrandConfig,
    session: &SessionData,
) -> Option<ExtractedData> {
    if session.messages.is_empty() {
        tracing::info!(user_id = %session.external_user_id, "no messages, skipping extraction");
        return None;
    }

    match request_extraction(llm, session).await {
        Ok(raw) => {
            let data = validate_and_clean(&raw, brand);
            TraceEvent::ExtractionCompleted {
                user_id: session.external_user_id.clone(),
                path: data.path.clone(),
                bot_score: data.bot_score,
                is_important: data.is_important,
            }
            .emit();
            Some(data)
        }
        Err(e) => {
            tracing::error!(
                user_id = %session.external_user_id,
                stage = "extractor",
                error = %e,
                "extraction failed"
            );
            None
        }
    }
}

async fn request_extraction(llm: &ProviderRegistry, session: &SessionData) -> Result<Value> {
    let provider = llm
        .for_role(ROLE_EXTRACTOR)
        .ok_or_else(|| Error::Config("no provider available for the extractor role".into()))?;
    let role = llm
        .role(ROLE_EXTRACTOR)
        .ok_or_else(|| Error::Config("extractor role is not configured".into()))?;

    let transcript = format_transcript(&session.messages);
    let req = ChatRequest {
        messages: vec![
            ChatMessage::system(extraction_prompt(&transcript)),
            ChatMessage::user(EXTRACT_INSTRUCTION),
        ],
        temperature: Some(role.temperature),
        max_tokens: Some(role.max_tokens),
        json_mode: true,
        model: Some(role.model_name().to_string()),
    };

    let started = Instant::now();
    let resp = provider.chat(&req).await?;
    TraceEvent::LlmRequest {
        provider: provider.provider_id().to_string(),
        model: resp.model.clone(),
        role: ROLE_EXTRACTOR.into(),
        duration_ms: started.elapsed().as_millis() as u64,
        prompt_tokens: resp.usage.map(|u| u.prompt_tokens),
        completion_tokens: resp.usage.map(|u| u.completion_tokens),
    }
    .emit();

    let body = strip_code_fence(&resp.content);
    if body.is_empty() {
        return Err(Error::Provider {
            provider: provider.provider_id().to_string(),
            message: "empty response from extractor".into(),
        });
    }
    let value: Value = serde_json::from_str(body)?;
    if !value.is_object() {
        return Err(Error::Other("extractor returned non-object JSON".into()));
    }
    Ok(value)
}

/// Upsert the record into the CRM, keyed by the external user id.
pub async fn save_to_database(leads: &dyn LeadStore, user_id: &str, data: &ExtractedData) -> Result<()> {
    leads.upsert_extracted(user_id, data).await?;
    tracing::info!(user_id, store = leads.name(), "upserted lead with extracted data");
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Coerce the raw model JSON into a well-formed record.
pub fn validate_and_clean(raw: &Value, brand: &BrandConfig) -> ExtractedData {
    let empty = Map::new();
    let obj = raw.as_object().unwrap_or(&empty);
    let field = |key: &str| -> &Value { obj.get(key).unwrap_or(&NULL) };
    let text = |key: &str| opt_string(field(key));

    let phone = clean_phone(text("phone").as_deref(), &brand.default_country_code);
    let budget = normalize_budget(field("budget"));
    let budget_tier_label = text("budget_tier").or_else(|| budget.map(|b| budget_tier(b).to_string()));
    let defaults = ExtractedData::default();

    ExtractedData {
        name: text("name"),
        location: text("location"),
        is_important: phone.is_some(),
        phone,
        instagram_handle: clean_instagram(text("instagram_handle").as_deref()),
        path: normalize_path(text("path").as_deref()),
        interest: text("interest"),
        niche: text("niche"),
        budget,
        budget_tier: budget_tier_label,
        age: field("age").as_f64().map(|a| a.round() as i32),
        age_bracket: text("age_bracket"),
        gender: text("gender"),
        occupation: text("occupation"),
        experience_level: text("experience_level"),
        product_category: text("product_category"),
        request_type: text("request_type"),
        target_price: field("target_price").as_f64(),
        status: text("status").unwrap_or(defaults.status),
        wants_call: truthy(field("wants_call")),
        ready_to_pay: truthy(field("ready_to_pay")),
        compliance_risk: truthy(field("compliance_risk")),
        ai_context: text("ai_context").unwrap_or(defaults.ai_context),
        bot_score: bot_score(field("bot_score")),
    }
}

/// Keep digits and `+`; prefix the country code when there is no `+`.
pub fn clean_phone(phone: Option<&str>, country_code: &str) -> Option<String> {
    let cleaned: String = phone?.chars().filter(|c| c.is_ascii_digit() || *c == '+').collect();
    if cleaned.is_empty() {
        None
    } else if cleaned.starts_with('+') {
        Some(cleaned)
    } else {
        Some(format!("{country_code}{cleaned}"))
    }
}

/// Strip a leading `@` and any instagram.com profile prefix.
pub fn clean_instagram(handle: Option<&str>) -> Option<String> {
    let handle = handle?.trim();
    let handle = handle.strip_prefix('@').unwrap_or(handle);

    let lower = handle.to_ascii_lowercase();
    let mut skip = 0;
    for scheme in ["https://", "http://"] {
        if lower.starts_with(scheme) {
            skip = scheme.len();
            break;
        }
    }
    if lower[skip..].starts_with("www.") {
        skip += 4;
    }
    let handle = if lower[skip..].starts_with("instagram.com/") {
        &handle[skip + "instagram.com/".len()..]
    } else {
        handle
    };

    let handle = handle.trim_end_matches('/');
    (!handle.is_empty()).then(|| handle.to_string())
}

/// Canonical `"Path X"`. Accepts anything [`LeadPath::parse`] does, or a
/// standalone A-E token inside a longer string; otherwise `"Path E"`.
///
/// Letters embedded in words are ignored on purpose, so `"Path Z"` and
/// `"sourcing"` fall back to `"Path E"` instead of picking up an `A` or `C`.
pub fn normalize_path(raw: Option<&str>) -> String {
    let parsed = raw.and_then(|r| {
        LeadPath::parse(r).or_else(|| {
            r.split(|c: char| !c.is_ascii_alphanumeric())
                .filter(|token| token.len() == 1)
                .find_map(|token| token.chars().next().and_then(LeadPath::from_letter))
        })
    });
    parsed.unwrap_or(LeadPath::E).label()
}

/// Numbers only. Non-positive becomes `None`; under 1000 is lakhs.
pub fn normalize_budget(raw: &Value) -> Option<i64> {
    let budget = raw.as_f64()?;
    if !budget.is_finite() || budget <= 0.0 {
        return None;
    }
    let rupees = if budget < LAKH_THRESHOLD { budget * LAKH } else { budget };
    Some(rupees.round() as i64)
}

/// JavaScript-style truthiness.
pub fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn bot_score(v: &Value) -> u8 {
    let score = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    score
        .filter(|s| s.is_finite())
        .map(|s| s.clamp(0.0, 100.0).round() as u8)
        .unwrap_or(0)
}

/// Trimmed non-empty string; numbers are stringified; `"null"` is absent.
fn opt_string(v: &Value) -> Option<String> {
    let s = match v {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty() && !s.eq_ignore_ascii_case("null")).then_some(s)
}

fn strip_code_fence(content: &str) -> &str {
    let body = content.trim();
    let Some(rest) = body.strip_prefix("```") else {
        return body;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
