//! Context memory: what the bot already knows about the user, rendered into
//! the prompt so the model stops asking for it again.
//!
//! The heuristics here read the raw transcript on every turn. They are
//! deliberately independent of the background extractor, which only runs
//! once a conversation goes idle.

use lq_crm::LeadContext;
use lq_sessions::Message;
use regex::{Regex, RegexSet};

const CITIES: &[&str] = &[
    "delhi", "mumbai", "bangalore", "hyderabad", "chennai", "kolkata", "pune", "indore",
    "ahmedabad", "jaipur", "lucknow", "kanpur", "nagpur", "patna", "bhopal", "ludhiana", "agra",
    "vadodara", "coimbatore", "madurai",
];

/// Words that follow "I am" / "name" but are not names.
const NOT_NAMES: &[&str] = &[
    "a", "an", "the", "is", "from", "in", "not", "interested", "looking", "ready", "here",
    "student", "working", "salaried", "investor", "business", "new", "also", "very", "just",
    "planning", "trying", "currently",
];

const TOPICS: &[(&str, &str)] = &[
    ("Sourcing", r"sourc|import|china|factory|t-?shirt|product"),
    ("FBA", r"amazon|fba|private label|brand"),
    ("Trading", r"trad|stock|crypto|invest|mentor"),
    ("Hudood", r"halal|haram|hudood"),
    ("Book", r"book|guide"),
];

/// Attributes recovered from the transcript.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserInfo {
    pub name: Option<String>,
    pub location: Option<String>,
    pub phone: Option<String>,
    pub occupation: Option<String>,
}

/// Merged view handed to the prompt assembler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnownUser {
    pub name: Option<String>,
    pub location: Option<String>,
    pub budget: Option<i64>,
    pub phone: Option<String>,
    pub occupation: Option<String>,
}

impl KnownUser {
    /// Fresh transcript values win over previously persisted ones.
    pub fn merge(fresh: UserInfo, persisted: Option<LeadContext>) -> Self {
        let persisted = persisted.unwrap_or_default();
        Self {
            name: fresh.name.or(persisted.name),
            location: fresh.location.or(persisted.location),
            budget: persisted.budget,
            phone: fresh.phone,
            occupation: fresh.occupation,
        }
    }

    fn known_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push("name");
        }
        if self.location.is_some() {
            fields.push("city");
        }
        if self.budget.is_some() {
            fields.push("budget");
        }
        if self.occupation.is_some() {
            fields.push("occupation");
        }
        if self.phone.is_some() {
            fields.push("phone number");
        }
        fields
    }
}

/// Compiled heuristics. Built once at startup.
pub struct ContextHeuristics {
    name_patterns: Vec<Regex>,
    phone: Regex,
    student: Regex,
    business: Regex,
    salaried: Regex,
    investor: Regex,
    topics: RegexSet,
}

impl ContextHeuristics {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            name_patterns: vec![
                Regex::new(r"(?i)(?:mera naam|my name is|i am|i'm|naam)\s+([a-zA-Z]+)")?,
                Regex::new(r"(?i)(?:naam|name)\s*:?\s*([a-zA-Z]+)")?,
            ],
            phone: Regex::new(r"(\+91\s*)?[6-9][0-9]{9}")?,
            student: Regex::new(r"(?i)student")?,
            business: Regex::new(r"(?i)business|businessman|entrepreneur|online sell|seller")?,
            salaried: Regex::new(r"(?i)salaried|job|employee|working")?,
            investor: Regex::new(r"(?i)investor")?,
            topics: RegexSet::new(TOPICS.iter().map(|(_, p)| format!("(?i){p}")))?,
        })
    }

    /// Pull name, city, phone and occupation out of the whole transcript.
    pub fn extract_user_info(&self, messages: &[Message]) -> UserInfo {
        let text = messages.iter().map(|m| m.content.as_str()).collect::<Vec<_>>().join(" ");
        let lower = text.to_lowercase();

        let name = self.name_patterns.iter().find_map(|re| {
            re.captures_iter(&text)
                .filter_map(|c| c.get(1))
                .map(|m| m.as_str())
                .find(|w| w.len() > 1 && !NOT_NAMES.contains(&w.to_lowercase().as_str()))
                .map(capitalize)
        });

        let location = CITIES.iter().find(|c| lower.contains(*c)).map(|c| capitalize(c));

        let phone = self.phone.find_iter(&text).last().map(|m| {
            let compact: String = m.as_str().chars().filter(|c| !c.is_whitespace()).collect();
            if compact.starts_with("+91") {
                compact
            } else {
                format!("+91{compact}")
            }
        });

        let occupation = if self.student.is_match(&text) {
            Some("Student")
        } else if self.business.is_match(&text) {
            Some("Business")
        } else if self.salaried.is_match(&text) {
            Some("Salaried")
        } else if self.investor.is_match(&text) {
            Some("Investor")
        } else {
            None
        };

        UserInfo {
            name,
            location,
            phone,
            occupation: occupation.map(str::to_string),
        }
    }

    /// Comma-separated topic buckets, or "General inquiry".
    pub fn summarize_topics(&self, messages: &[Message]) -> String {
        let text = messages.iter().map(|m| m.content.as_str()).collect::<Vec<_>>().join(" ");
        let hits: Vec<&str> = self
            .topics
            .matches(&text)
            .iter()
            .map(|i| TOPICS[i].0)
            .collect();
        if hits.is_empty() {
            "General inquiry".into()
        } else {
            hits.join(", ")
        }
    }

    /// The context-memory line, `None` for a brand-new conversation.
    ///
    /// Lists known attributes, message count and topics, then tells the
    /// model which fields it must not ask for again.
    pub fn context_line(&self, messages: &[Message], known: &KnownUser) -> Option<String> {
        if messages.is_empty() {
            return None;
        }

        let mut parts = Vec::new();
        if let Some(name) = &known.name {
            parts.push(format!("User name: {name}"));
        }
        if let Some(location) = &known.location {
            parts.push(format!("Location: {location}"));
        }
        if let Some(phone) = &known.phone {
            parts.push(format!("Phone: {phone}"));
        }
        if let Some(occupation) = &known.occupation {
            parts.push(format!("Occupation: {occupation}"));
        }
        parts.push(format!("Messages: {}", messages.len()));
        parts.push(format!("Topics: {}", self.summarize_topics(messages)));

        let fields = known.known_fields();
        if !fields.is_empty() {
            parts.push(format!(
                "Already known, do NOT ask again for: {}",
                fields.join(", ")
            ));
        }

        Some(parts.join(". "))
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn h() -> ContextHeuristics {
        ContextHeuristics::new().unwrap()
    }

    fn user(text: &str) -> Message {
        Message::user(text, Utc::now())
    }

    #[test]
    fn finds_name_city_phone_occupation() {
        let msgs = vec![
            user("Assalamu alaikum, my name is aMIR"),
            user("I live in Pune and I'm a student"),
            user("number is 98765 43210? no wait 9876543210"),
        ];
        let info = h().extract_user_info(&msgs);
        assert_eq!(info.name.as_deref(), Some("Amir"));
        assert_eq!(info.location.as_deref(), Some("Pune"));
        assert_eq!(info.phone.as_deref(), Some("+919876543210"));
        assert_eq!(info.occupation.as_deref(), Some("Student"));
    }

    #[test]
    fn hindi_name_pattern() {
        let info = h().extract_user_info(&[user("mera naam salman hai")]);
        assert_eq!(info.name.as_deref(), Some("Salman"));
    }

    #[test]
    fn filler_words_are_not_names() {
        let info = h().extract_user_info(&[user("I am interested in FBA")]);
        assert_eq!(info.name, None);
    }

    #[test]
    fn keeps_prefixed_phone() {
        let info = h().extract_user_info(&[user("call +91 9123456789")]);
        assert_eq!(info.phone.as_deref(), Some("+919123456789"));
    }

    #[test]
    fn topics_bucketed_in_fixed_order() {
        let msgs = vec![user("I want to import from China"), user("and learn crypto trading")];
        assert_eq!(h().summarize_topics(&msgs), "Sourcing, Trading");
        assert_eq!(h().summarize_topics(&[user("hello")]), "General inquiry");
    }

    #[test]
    fn fresh_values_win_over_persisted() {
        let fresh = UserInfo {
            name: Some("Amir".into()),
            ..UserInfo::default()
        };
        let persisted = LeadContext {
            name: Some("Old".into()),
            budget: Some(500_000),
            location: Some("Delhi".into()),
        };
        let known = KnownUser::merge(fresh, Some(persisted));
        assert_eq!(known.name.as_deref(), Some("Amir"));
        assert_eq!(known.location.as_deref(), Some("Delhi"));
        assert_eq!(known.budget, Some(500_000));
    }

    #[test]
    fn context_line_forbids_re_asking() {
        let msgs = vec![user("my name is Sara, from Mumbai")];
        let heur = h();
        let known = KnownUser::merge(heur.extract_user_info(&msgs), None);
        let line = heur.context_line(&msgs, &known).unwrap();
        assert!(line.starts_with("User name: Sara. Location: Mumbai"));
        assert!(line.contains("Messages: 1"));
        assert!(line.contains("do NOT ask again for: name, city"));
    }

    #[test]
    fn no_line_for_new_conversation() {
        assert_eq!(h().context_line(&[], &KnownUser::default()), None);
    }
}
