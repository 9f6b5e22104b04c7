//! Translation of panel rules into provider search queries.
//!
//! The provider can only estimate counts for a search query, so panel
//! rules are translated into its query grammar: accept rules become
//! OR'd field-scoped terms, reject rules become negated terms. The
//! translation is lossy for pattern rules and is used for count
//! estimation only; the authoritative membership decision is always
//! [`Panel::matches_thread`].

use super::model::{Panel, RuleAction, RuleField, RuleMatcher};

impl Panel {
    /// The accept side of this panel as a provider query term.
    ///
    /// A single term is returned bare (`from:a@x.com`); multiple terms
    /// are wrapped in the provider's OR grouping (`{from:a to:b}`).
    /// Empty when the panel has no translatable accept rules.
    #[must_use]
    pub fn accept_query(&self) -> String {
        let terms = self.terms_for(RuleAction::Accept);
        match terms.len() {
            0 => String::new(),
            1 => terms.into_iter().next().unwrap_or_default(),
            _ => format!("{{{}}}", terms.join(" ")),
        }
    }

    /// Translate this panel into a provider search query.
    ///
    /// Accept rules are OR'd, reject rules appended as negations. For
    /// the designated catch-all panel, pass the other panels' accept
    /// queries as `catch_all_negations`: the result approximates
    /// "nothing else claimed this thread". A panel with no rules and
    /// no negations yields an empty string, which callers treat as
    /// "fall back to exact counting".
    #[must_use]
    pub fn to_provider_query(&self, catch_all_negations: Option<&[String]>) -> String {
        let mut parts: Vec<String> = Vec::new();

        let accept = self.accept_query();
        if !accept.is_empty() {
            parts.push(accept);
        }

        for term in self.terms_for(RuleAction::Reject) {
            parts.push(format!("-{term}"));
        }

        if let Some(negations) = catch_all_negations {
            for negation in negations {
                let negation = negation.trim();
                if !negation.is_empty() {
                    parts.push(format!("-{negation}"));
                }
            }
        }

        parts.join(" ")
    }

    /// Collect the query terms for all rules with the given action.
    fn terms_for(&self, action: RuleAction) -> Vec<String> {
        let mut terms = Vec::new();
        for rule in &self.rules {
            if rule.action != action {
                continue;
            }
            let prefix = match rule.field {
                RuleField::Sender => "from",
                RuleField::Recipient => "to",
            };
            match &rule.matcher {
                RuleMatcher::Substring { addresses } => {
                    for address in addresses {
                        let address = address.trim();
                        if !address.is_empty() {
                            terms.push(format!("{prefix}:{address}"));
                        }
                    }
                }
                RuleMatcher::Pattern { expression } => {
                    // Lossy: only a pattern that is really a literal
                    // address fragment survives the translation.
                    if let Some(literal) = pattern_literal(expression) {
                        terms.push(format!("{prefix}:{literal}"));
                    }
                }
            }
        }
        terms
    }
}

/// Best-effort literal extraction from a pattern expression.
///
/// Accepts expressions that are address fragments at heart: escaped
/// dots are unescaped, and anything still containing regex syntax
/// contributes nothing to the query.
fn pattern_literal(expression: &str) -> Option<String> {
    let unescaped = expression.trim().replace("\\.", ".");
    let is_literal = !unescaped.is_empty()
        && unescaped
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '_' | '-' | '+'));
    is_literal.then_some(unescaped)
}
