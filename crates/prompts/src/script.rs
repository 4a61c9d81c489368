use lq_domain::LeadPath;

const TRIAGE: &str = include_str!("../templates/triage.md");
const SOURCING: &str = include_str!("../templates/sourcing.md");
const FBA: &str = include_str!("../templates/fba.md");
const TRADING: &str = include_str!("../templates/trading.md");
const HUDOOD: &str = include_str!("../templates/hudood.md");
const BOOK: &str = include_str!("../templates/book.md");

/// Path-specific script layered after the core rules.
///
/// Closed set: every key maps to exactly one script, and anything
/// unrecognised lands on [`Script::Triage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Triage,
    Sourcing,
    Fba,
    Trading,
    Hudood,
    Book,
}

impl Script {
    pub fn for_path(path: Option<LeadPath>) -> Self {
        match path {
            Some(LeadPath::A) => Script::Sourcing,
            Some(LeadPath::B) => Script::Fba,
            Some(LeadPath::C) => Script::Trading,
            Some(LeadPath::D) => Script::Hudood,
            Some(LeadPath::E) | None => Script::Triage,
        }
    }

    /// Script for a turn: the path's script, except that a question about
    /// the guidebook on the trading or triage path gets the book script.
    pub fn for_turn(path: Option<LeadPath>, user_message: &str) -> Self {
        let base = Self::for_path(path);
        if matches!(base, Script::Trading | Script::Triage) && asks_about_book(user_message) {
            Script::Book
        } else {
            base
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            Script::Triage => TRIAGE,
            Script::Sourcing => SOURCING,
            Script::Fba => FBA,
            Script::Trading => TRADING,
            Script::Hudood => HUDOOD,
            Script::Book => BOOK,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Script::Triage => "triage",
            Script::Sourcing => "sourcing",
            Script::Fba => "fba",
            Script::Trading => "trading",
            Script::Hudood => "hudood",
            Script::Book => "book",
        }
    }
}

/// "book" or "guidebook" as a word, but not "book a call" / "book call".
fn asks_about_book(message: &str) -> bool {
    let lower = message.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    words.iter().enumerate().any(|(i, w)| match *w {
        "guidebook" | "guide" => true,
        "book" => !matches!(words.get(i + 1), Some(&"a") | Some(&"call")),
        _ => false,
    })
}
