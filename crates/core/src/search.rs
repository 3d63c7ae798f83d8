//! Free-text recipe search.
//!
//! Input is split on whitespace, each token is reduced to its alphanumeric
//! characters and lowercased, and the tokens are OR-combined as prefix
//! matches. The same query renders to a PostgreSQL `tsquery` string for the
//! database store and evaluates directly against titles for the in-memory
//! store, so both stores agree on what matches.

/// A tokenized search. Empty means "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    tokens: Vec<String>,
}

impl SearchQuery {
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let mut tokens: Vec<String> = Vec::new();
        for raw in input.split_whitespace() {
            let token: String = raw
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect();
            if !token.is_empty() && !tokens.contains(&token) {
                tokens.push(token);
            }
        }
        Self { tokens }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Render as a `to_tsquery` argument, e.g. `apple:* | pear:*`.
    #[must_use]
    pub fn to_tsquery(&self) -> Option<String> {
        if self.tokens.is_empty() {
            return None;
        }
        Some(
            self.tokens
                .iter()
                .map(|t| format!("{t}:*"))
                .collect::<Vec<_>>()
                .join(" | "),
        )
    }

    /// True when any word of `title` starts with any token.
    #[must_use]
    pub fn matches(&self, title: &str) -> bool {
        if self.tokens.is_empty() {
            return true;
        }
        let lowered = title.to_lowercase();
        lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .any(|word| self.tokens.iter().any(|t| word.starts_with(t.as_str())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_cleaned_and_deduplicated() {
        let q = SearchQuery::parse("  Apple!  pear's apple ?? ");
        assert_eq!(q.tokens(), ["apple", "pears"]);
    }

    #[test]
    fn test_empty_search_has_no_tsquery() {
        assert!(SearchQuery::parse("   ").to_tsquery().is_none());
        assert!(SearchQuery::parse("!!").is_empty());
    }

    #[test]
    fn test_tsquery_is_or_of_prefixes() {
        let q = SearchQuery::parse("apple pear");
        assert_eq!(q.to_tsquery().as_deref(), Some("apple:* | pear:*"));
    }

    #[test]
    fn test_multi_word_search_is_or_combined() {
        let q = SearchQuery::parse("apple pear");
        let titles = ["apple", "pear", "orange"];
        let hits = titles.iter().filter(|t| q.matches(t)).count();
        assert_eq!(hits, 2);
    }

    #[test]
    fn test_match_is_prefix_per_word_and_case_insensitive() {
        let q = SearchQuery::parse("BOLO");
        assert!(q.matches("Spagetti bolognese sauce"));
        assert!(!q.matches("Carbonara"));
        assert!(!SearchQuery::parse("ognese").matches("Spagetti bolognese sauce"));
    }
}
