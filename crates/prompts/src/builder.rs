use lq_domain::LeadPath;

use crate::script::Script;
use crate::template::{format_rupees, render};

const CORE: &str = include_str!("../templates/core.md");
const EXTRACTOR: &str = include_str!("../templates/extractor.md");

const UNKNOWN: &str = "Unknown";
const NO_PATH: &str = "Not detected";
const NEW_CONVERSATION: &str = "New conversation";

/// Known user attributes rendered into the core template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserMemory {
    pub name: Option<String>,
    /// Rupees.
    pub budget: Option<i64>,
    pub location: Option<String>,
    /// Context-memory line built by the responder.
    pub conversation_summary: Option<String>,
}

fn or_placeholder<'a>(value: Option<&'a str>, placeholder: &'a str) -> &'a str {
    value.map(str::trim).filter(|v| !v.is_empty()).unwrap_or(placeholder)
}

/// Core rules with the user context filled in, followed by the script for
/// `current_path` (triage when `None`, book when `user_message` asks about it).
pub fn build_system_prompt(current_path: Option<LeadPath>, memory: &UserMemory, user_message: &str) -> String {
    let script = Script::for_turn(current_path, user_message);
    let budget = memory.budget.filter(|b| *b > 0).map(format_rupees);
    let path = current_path.map(|p| p.letter().to_string());

    let core = render(
        CORE,
        &[
            ("user_name", or_placeholder(memory.name.as_deref(), UNKNOWN)),
            ("user_budget", or_placeholder(budget.as_deref(), UNKNOWN)),
            ("user_location", or_placeholder(memory.location.as_deref(), UNKNOWN)),
            ("current_path", or_placeholder(path.as_deref(), NO_PATH)),
            (
                "conversation_summary",
                or_placeholder(memory.conversation_summary.as_deref(), NEW_CONVERSATION),
            ),
        ],
    );

    let prompt = format!("{core}\n\n{}", script.text());
    tracing::debug!(script = script.name(), chars = prompt.len(), "system prompt assembled");
    prompt
}

/// Extraction instructions with `transcript` embedded.
pub fn extraction_prompt(transcript: &str) -> String {
    render(EXTRACTOR, &[("conversation_history", transcript)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_memory_uses_placeholders() {
        let prompt = build_system_prompt(None, &UserMemory::default(), "hi");
        assert!(prompt.contains("Name: Unknown"));
        assert!(prompt.contains("Budget: Unknown"));
        assert!(prompt.contains("Location: Unknown"));
        assert!(prompt.contains("Current Path: Not detected"));
        assert!(prompt.contains("Conversation Summary: New conversation"));
        assert!(!prompt.contains("{{"));
        assert!(prompt.ends_with(Script::Triage.text()));
    }

    #[test]
    fn known_values_are_rendered() {
        let memory = UserMemory {
            name: Some("Sara".into()),
            budget: Some(800_000),
            location: Some("Pune".into()),
            conversation_summary: Some("Messages: 4".into()),
        };
        let prompt = build_system_prompt(Some(LeadPath::B), &memory, "course fees?");
        assert!(prompt.contains("Name: Sara"));
        assert!(prompt.contains("Budget: ₹800,000"));
        assert!(prompt.contains("Location: Pune"));
        assert!(prompt.contains("Current Path: B"));
        assert!(prompt.contains("Conversation Summary: Messages: 4"));
        assert!(prompt.ends_with(Script::Fba.text()));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let memory = UserMemory {
            name: Some("  ".into()),
            budget: Some(0),
            ..UserMemory::default()
        };
        let prompt = build_system_prompt(Some(LeadPath::D), &memory, "is TCS halal");
        assert!(prompt.contains("Name: Unknown"));
        assert!(prompt.contains("Budget: Unknown"));
        assert!(prompt.ends_with(Script::Hudood.text()));
    }

    #[test]
    fn core_rules_carry_the_path_marker_instruction() {
        let prompt = build_system_prompt(Some(LeadPath::A), &UserMemory::default(), "");
        assert!(prompt.contains("[PATH: A|B|C|D|E]"));
    }

    #[test]
    fn book_question_on_trading_path_layers_book_script() {
        let prompt = build_system_prompt(Some(LeadPath::C), &UserMemory::default(), "is the book in Urdu?");
        assert!(prompt.ends_with(Script::Book.text()));
        assert!(prompt.contains("Current Path: C"));
    }

    #[test]
    fn transcript_is_embedded_in_extraction_prompt() {
        let prompt = extraction_prompt("USER: hi\n\nASSISTANT: hello");
        assert!(prompt.contains("USER: hi\n\nASSISTANT: hello"));
        assert!(!prompt.contains("{{conversation_history}}"));
    }
}
