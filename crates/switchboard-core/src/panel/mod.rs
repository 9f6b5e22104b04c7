//! Panel rule engine.
//!
//! A panel is a named, ordered list of accept/reject rules that decide
//! which threads it claims. Rule evaluation is first-match-wins, and a
//! panel with no rules at all is the catch-all that claims everything.
//!
//! Two rule dialects exist side by side: a literal substring list and
//! a regex pattern. Both shapes occur in migrated configuration data,
//! so the matcher is an internally tagged enum and the stored `kind`
//! field disambiguates. New configurations default to the substring
//! dialect.

mod model;
mod query;

pub use model::{Panel, PanelRule, RuleAction, RuleField, RuleMatcher};
