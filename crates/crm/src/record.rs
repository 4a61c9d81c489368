use serde::{Deserialize, Serialize};

/// Status given to records that carry none.
pub const DEFAULT_STATUS: &str = "New";
/// `ai_context` placeholder when the model gave no summary.
pub const NO_SUMMARY: &str = "No summary available";

/// Validated lead record produced by the extractor.
///
/// Field names match the JSON the extraction prompt asks for and the
/// `leads` table columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedData {
    pub name: Option<String>,
    pub location: Option<String>,
    pub phone: Option<String>,
    pub instagram_handle: Option<String>,
    /// Derived: true iff `phone` is present.
    pub is_important: bool,
    /// Canonical `"Path A"` .. `"Path E"`.
    pub path: String,
    pub interest: Option<String>,
    pub niche: Option<String>,
    /// Rupees.
    pub budget: Option<i64>,
    pub budget_tier: Option<String>,
    pub age: Option<i32>,
    pub age_bracket: Option<String>,
    pub gender: Option<String>,
    pub occupation: Option<String>,
    pub experience_level: Option<String>,
    pub product_category: Option<String>,
    pub request_type: Option<String>,
    pub target_price: Option<f64>,
    pub status: String,
    pub wants_call: bool,
    pub ready_to_pay: bool,
    pub compliance_risk: bool,
    pub ai_context: String,
    /// 0..=100.
    pub bot_score: u8,
}

impl Default for ExtractedData {
    fn default() -> Self {
        Self {
            name: None,
            location: None,
            phone: None,
            instagram_handle: None,
            is_important: false,
            path: "Path E".into(),
            interest: None,
            niche: None,
            budget: None,
            budget_tier: None,
            age: None,
            age_bracket: None,
            gender: None,
            occupation: None,
            experience_level: None,
            product_category: None,
            request_type: None,
            target_price: None,
            status: DEFAULT_STATUS.into(),
            wants_call: false,
            ready_to_pay: false,
            compliance_risk: false,
            ai_context: NO_SUMMARY.into(),
            bot_score: 0,
        }
    }
}

/// Budget tier label: `VIP` from 8 lakh, `Mid` from 1 lakh, else `Low Cap`.
pub fn budget_tier(budget: i64) -> &'static str {
    if budget >= 800_000 {
        "VIP"
    } else if budget >= 100_000 {
        "Mid"
    } else {
        "Low Cap"
    }
}
