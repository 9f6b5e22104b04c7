//! Panel rule data models and matching.

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Which address field a rule tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleField {
    /// Test the sender (`From:`) value.
    Sender,
    /// Test the recipient (`To:`) value.
    Recipient,
}

impl RuleField {
    /// Parse from string representation.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "recipient" | "to" => Self::Recipient,
            _ => Self::Sender,
        }
    }

    /// String representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sender => "sender",
            Self::Recipient => "recipient",
        }
    }
}

/// What a matching rule decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    /// The panel claims the thread.
    Accept,
    /// The panel refuses the thread.
    Reject,
}

impl RuleAction {
    /// Parse from string representation.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "reject" => Self::Reject,
            _ => Self::Accept,
        }
    }

    /// String representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
        }
    }
}

/// A rule's match expression, in one of the two config dialects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RuleMatcher {
    /// Literal dialect: matches when any listed address or domain
    /// fragment is a case-insensitive substring of the value. The
    /// default dialect for new configurations.
    Substring {
        /// Address or domain fragments, e.g. `@example.com`.
        addresses: Vec<String>,
    },
    /// Pattern dialect: a single regex, applied case-insensitively.
    Pattern {
        /// The regex source.
        expression: String,
    },
}

impl RuleMatcher {
    /// Test a value against this matcher, case-insensitively.
    ///
    /// An invalid regex in the pattern dialect matches nothing; the
    /// broken expression is logged rather than surfaced, since a bad
    /// rule must never take the whole panel evaluation down.
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Substring { addresses } => {
                let value = value.to_lowercase();
                addresses
                    .iter()
                    .any(|address| value.contains(&address.to_lowercase()))
            }
            Self::Pattern { expression } => {
                match RegexBuilder::new(expression).case_insensitive(true).build() {
                    Ok(pattern) => pattern.is_match(value),
                    Err(e) => {
                        warn!("Invalid panel rule pattern {expression:?}: {e}");
                        false
                    }
                }
            }
        }
    }
}

/// One ordered rule within a panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelRule {
    /// Which address field to test.
    pub field: RuleField,
    /// The match expression.
    pub matcher: RuleMatcher,
    /// Decision when the expression matches.
    pub action: RuleAction,
}

impl PanelRule {
    /// Test this rule against a thread's sender and recipient values.
    #[must_use]
    pub fn matches(&self, from: &str, to: &str) -> bool {
        let value = match self.field {
            RuleField::Sender => from,
            RuleField::Recipient => to,
        };
        self.matcher.matches(value)
    }
}

/// A named panel with its ordered rule list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Panel {
    /// Display name.
    pub name: String,
    /// Rules in evaluation order.
    pub rules: Vec<PanelRule>,
}

impl Panel {
    /// Decide whether this panel claims a thread.
    ///
    /// A panel with zero rules matches unconditionally (the catch-all
    /// case). Otherwise rules are evaluated in order and the first
    /// match decides: accept claims the thread, reject refuses it. A
    /// thread no rule matches is not claimed.
    #[must_use]
    pub fn matches_thread(&self, from: &str, to: &str) -> bool {
        if self.rules.is_empty() {
            return true;
        }
        for rule in &self.rules {
            if rule.matches(from, to) {
                return matches!(rule.action, RuleAction::Accept);
            }
        }
        false
    }
}
