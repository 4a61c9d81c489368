use serde::{Deserialize, Serialize};
use std::fmt;

/// Conversational path a lead is routed into.
///
/// `E` is the triage/default path. Stored as the bare letter in session
/// JSON (`"currentPath": "B"`) and rendered as `"Path B"` in CRM records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadPath {
    A,
    B,
    C,
    D,
    E,
}

impl LeadPath {
    pub const ALL: [LeadPath; 5] = [LeadPath::A, LeadPath::B, LeadPath::C, LeadPath::D, LeadPath::E];

    pub fn letter(self) -> char {
        match self {
            LeadPath::A => 'A',
            LeadPath::B => 'B',
            LeadPath::C => 'C',
            LeadPath::D => 'D',
            LeadPath::E => 'E',
        }
    }

    /// Case-insensitive letter lookup.
    pub fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(LeadPath::A),
            'B' => Some(LeadPath::B),
            'C' => Some(LeadPath::C),
            'D' => Some(LeadPath::D),
            'E' => Some(LeadPath::E),
            _ => None,
        }
    }

    /// Parse the forms a path key shows up in: `"A"`, `"Path A"`,
    /// `"PATH_A"`, `"path a"`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let rest = match trimmed.get(..4) {
            Some(prefix) if prefix.eq_ignore_ascii_case("path") => &trimmed[4..],
            _ => trimmed,
        };
        let rest = rest.trim_start_matches(|c: char| c == '_' || c == ' ' || c == '-');
        let mut chars = rest.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_letter(c),
            _ => None,
        }
    }

    /// CRM label, e.g. `"Path C"`.
    pub fn label(self) -> String {
        format!("Path {}", self.letter())
    }
}

impl fmt::Display for LeadPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_known_forms() {
        assert_eq!(LeadPath::parse("A"), Some(LeadPath::A));
        assert_eq!(LeadPath::parse("path b"), Some(LeadPath::B));
        assert_eq!(LeadPath::parse("PATH_C"), Some(LeadPath::C));
        assert_eq!(LeadPath::parse(" Path D "), Some(LeadPath::D));
    }

    #[test]
    fn parse_rejects_unknown_letters_and_words() {
        assert_eq!(LeadPath::parse("F"), None);
        assert_eq!(LeadPath::parse("BOOK"), None);
        assert_eq!(LeadPath::parse(""), None);
    }

    #[test]
    fn serializes_as_bare_letter() {
        let json = serde_json::to_string(&Some(LeadPath::D)).unwrap();
        assert_eq!(json, r#""D""#);
        let none: Option<LeadPath> = serde_json::from_str("null").unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn label_is_canonical() {
        assert_eq!(LeadPath::E.label(), "Path E");
    }
}
