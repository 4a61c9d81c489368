use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Brand / output sanitation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandConfig {
    /// The only phone number the bot may show to users.
    #[serde(default = "d_contact")]
    pub official_contact: String,
    /// Prepended to phone numbers that lack a `+` prefix.
    #[serde(default = "d_country_code")]
    pub default_country_code: String,
    /// Staff names replaced with "our team" in bot replies.
    #[serde(default = "d_staff")]
    pub staff_names: Vec<String>,
}

impl Default for BrandConfig {
    fn default() -> Self {
        Self {
            official_contact: d_contact(),
            default_country_code: d_country_code(),
            staff_names: d_staff(),
        }
    }
}

impl BrandConfig {
    /// Digits of the official contact without the country code.
    pub fn official_local_digits(&self) -> String {
        let digits: String = self.official_contact.chars().filter(char::is_ascii_digit).collect();
        let cc: String = self.default_country_code.chars().filter(char::is_ascii_digit).collect();
        match digits.strip_prefix(cc.as_str()) {
            Some(local) if digits.len() > 10 => local.to_string(),
            _ => digits,
        }
    }
}

fn d_contact() -> String {
    "+91 8828888664".into()
}
fn d_country_code() -> String {
    "+91".into()
}
fn d_staff() -> Vec<String> {
    ["Anwar", "Moiz", "Fatima", "Ahmed"].iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_digits_strip_country_code() {
        assert_eq!(BrandConfig::default().official_local_digits(), "8828888664");
    }
}
