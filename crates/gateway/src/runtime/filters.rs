//! Intent / safety filter: pure pattern checks over the raw user message.

use regex::{Regex, RegexSet};
use serde::Serialize;

/// Requests the bot must refuse outright.
const BANNED: &[&str] = &[
    r"(?i)\breplica\b",
    r"(?i)\bfirst\s*copy\b",
    r"(?i)\bfake\b",
    r"(?i)\bcounterfeit\b",
    r"(?i)\bduplicate\s*(brand|product)\b",
    r"(?i)\bbuy\s+(this\s+)?stock\b",
    r"(?i)\bshould\s+i\s+invest\s+in\b",
    r"(?i)\bgive\s+(me\s+)?(a\s+)?tip\b",
    r"(?i)\bstock\s+tip\b",
    r"(?i)\btrade\s+call\b",
];

/// Secondary test deciding a banned message is about counterfeit goods.
const COUNTERFEIT_KEYWORDS: &str = r"(?i)replica|copy|fake|counterfeit|duplicate";

const READY_TO_PAY: &[&str] = &[
    r"(?i)\bready\s+to\s+pay\b",
    r"(?i)\bhow\s+(do\s+i\s+|to\s+)?pay\b",
    r"(?i)\blet('s|us)?\s+start\b",
    r"(?i)\bi\s+want\s+to\s+join\b",
    r"(?i)\benroll\s+me\b",
    r"(?i)\bpayment\s+(link|process)\b",
];

const WANTS_CALL: &[&str] = &[
    r"(?i)\bcall\s+me\b",
    r"(?i)\bspeak\s+to\s+(someone|you|team)\b",
    r"(?i)\btalk\s+to\s+(someone|mentor|expert)\b",
    r"(?i)\bphone\s+(call|consultation)\b",
    r"(?i)\bbook\s+(a\s+)?call\b",
];

const REPLICA_REFUSAL: &str = "Our mission is to help the Ummah build Barakah-filled, legal businesses. \
Sourcing replicas is illegal and violates Shariah principles of honesty. \
We only source original, high-quality products for your own brand.";

const TRADING_TIP_REFUSAL: &str = "We believe in 'Teaching a man to fish rather than giving him a fish.' \
Giving calls makes you dependent; learning technical analysis makes you free. \
Our Halal Trading Mentorship teaches you the skills to make independent decisions. \
For Halal/Haram status of any stock, check our Hudood App (@hudood.official).";

/// Refusal bucket for a banned message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefusalCategory {
    Replica,
    TradingTip,
}

impl RefusalCategory {
    /// Canned reply for this category.
    pub fn reply(self) -> &'static str {
        match self {
            RefusalCategory::Replica => REPLICA_REFUSAL,
            RefusalCategory::TradingTip => TRADING_TIP_REFUSAL,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RefusalCategory::Replica => "replica",
            RefusalCategory::TradingTip => "trading_tip",
        }
    }
}

/// Intent flags derived from one user message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Intents {
    pub ready_to_pay: bool,
    pub wants_call: bool,
    pub compliance_risk: bool,
}

impl Intents {
    /// Whether any lead-facing intent fired.
    pub fn any_lead_intent(&self) -> bool {
        self.ready_to_pay || self.wants_call
    }
}

/// Compiled pattern sets. Built once at startup.
pub struct IntentFilter {
    banned: RegexSet,
    counterfeit: Regex,
    ready_to_pay: RegexSet,
    wants_call: RegexSet,
}

impl IntentFilter {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            banned: RegexSet::new(BANNED)?,
            counterfeit: Regex::new(COUNTERFEIT_KEYWORDS)?,
            ready_to_pay: RegexSet::new(READY_TO_PAY)?,
            wants_call: RegexSet::new(WANTS_CALL)?,
        })
    }

    /// Refusal category when the message must not reach the LLM.
    ///
    /// Every banned match lands in exactly one bucket: counterfeit wording
    /// means [`RefusalCategory::Replica`], anything else is a tip request.
    pub fn check_banned(&self, message: &str) -> Option<RefusalCategory> {
        if !self.banned.is_match(message) {
            return None;
        }
        if self.counterfeit.is_match(message) {
            Some(RefusalCategory::Replica)
        } else {
            Some(RefusalCategory::TradingTip)
        }
    }

    pub fn detect_intents(&self, message: &str) -> Intents {
        Intents {
            ready_to_pay: self.ready_to_pay.is_match(message),
            wants_call: self.wants_call.is_match(message),
            compliance_risk: self.banned.is_match(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> IntentFilter {
        IntentFilter::new().unwrap()
    }

    #[test]
    fn counterfeit_requests_get_replica_refusal() {
        let f = filter();
        assert_eq!(
            f.check_banned("can I get a first copy of this bag"),
            Some(RefusalCategory::Replica)
        );
        assert_eq!(f.check_banned("Do you source REPLICA watches?"), Some(RefusalCategory::Replica));
        assert_eq!(f.check_banned("need a duplicate brand supplier"), Some(RefusalCategory::Replica));
    }

    #[test]
    fn tip_requests_get_trading_refusal() {
        let f = filter();
        assert_eq!(f.check_banned("give me a tip for tomorrow"), Some(RefusalCategory::TradingTip));
        assert_eq!(f.check_banned("should I invest in Tata?"), Some(RefusalCategory::TradingTip));
        assert_eq!(f.check_banned("any trade call today"), Some(RefusalCategory::TradingTip));
    }

    #[test]
    fn ordinary_questions_pass() {
        let f = filter();
        assert_eq!(f.check_banned("I want to learn Amazon FBA"), None);
        assert_eq!(f.check_banned("is trading halal?"), None);
    }

    #[test]
    fn intents_from_user_message() {
        let f = filter();
        let i = f.detect_intents("I'm ready to pay, please call me");
        assert!(i.ready_to_pay);
        assert!(i.wants_call);
        assert!(!i.compliance_risk);
        assert!(i.any_lead_intent());

        let i = f.detect_intents("how do I pay for the course");
        assert!(i.ready_to_pay);

        let i = f.detect_intents("tell me more");
        assert_eq!(i, Intents::default());
    }

    #[test]
    fn compliance_risk_tracks_banned_patterns() {
        let i = filter().detect_intents("stock tip please");
        assert!(i.compliance_risk);
    }

    #[test]
    fn refusal_texts_are_fixed() {
        assert!(RefusalCategory::Replica.reply().contains("replicas is illegal"));
        assert!(RefusalCategory::TradingTip.reply().contains("@hudood.official"));
    }
}
