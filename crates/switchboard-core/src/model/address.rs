//! Email address parsing.

use serde::{Deserialize, Serialize};

/// An email address with an optional display name.
///
/// Parsed from header forms like `John Doe <john@example.com>`,
/// `"Doe, John" <john@example.com>`, or a bare `john@example.com`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    /// Display name, if the header carried one.
    pub name: Option<String>,
    /// The address itself.
    pub address: String,
}

impl EmailAddress {
    /// Parse a single address from its header representation.
    ///
    /// Never fails: input that does not look like `name <addr>` is
    /// treated as a bare address.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let input = input.trim();

        if let (Some(lt), Some(gt)) = (input.rfind('<'), input.rfind('>'))
            && lt < gt
        {
            let address = input[lt + 1..gt].trim().to_string();
            let name = input[..lt].trim().trim_matches('"').trim();
            return Self {
                name: (!name.is_empty()).then(|| name.to_string()),
                address,
            };
        }

        Self {
            name: None,
            address: input.trim_matches('"').to_string(),
        }
    }

    /// Parse a comma-separated address list, as found in `To:` headers.
    ///
    /// Commas inside quoted display names do not split.
    #[must_use]
    pub fn parse_list(input: &str) -> Vec<Self> {
        let mut addresses = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;

        for c in input.chars() {
            match c {
                '"' => {
                    in_quotes = !in_quotes;
                    current.push(c);
                }
                ',' if !in_quotes => {
                    if !current.trim().is_empty() {
                        addresses.push(Self::parse(&current));
                    }
                    current.clear();
                }
                _ => current.push(c),
            }
        }
        if !current.trim().is_empty() {
            addresses.push(Self::parse(&current));
        }

        addresses
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} <{}>", self.address),
            None => f.write_str(&self.address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_and_address() {
        let addr = EmailAddress::parse("John Doe <john@example.com>");
        assert_eq!(addr.name.as_deref(), Some("John Doe"));
        assert_eq!(addr.address, "john@example.com");
    }

    #[test]
    fn test_parse_quoted_name() {
        let addr = EmailAddress::parse("\"Doe, John\" <john@example.com>");
        assert_eq!(addr.name.as_deref(), Some("Doe, John"));
        assert_eq!(addr.address, "john@example.com");
    }

    #[test]
    fn test_parse_bare_address() {
        let addr = EmailAddress::parse("john@example.com");
        assert_eq!(addr.name, None);
        assert_eq!(addr.address, "john@example.com");
    }

    #[test]
    fn test_parse_empty() {
        let addr = EmailAddress::parse("");
        assert_eq!(addr.name, None);
        assert_eq!(addr.address, "");
    }

    #[test]
    fn test_parse_list_respects_quotes() {
        let list =
            EmailAddress::parse_list("\"Doe, John\" <john@example.com>, jane@example.com");
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].address, "john@example.com");
        assert_eq!(list[1].address, "jane@example.com");
    }

    #[test]
    fn test_display_round_trip() {
        let addr = EmailAddress::parse("John Doe <john@example.com>");
        assert_eq!(addr.to_string(), "John Doe <john@example.com>");
        let bare = EmailAddress::parse("jane@example.com");
        assert_eq!(bare.to_string(), "jane@example.com");
    }
}
