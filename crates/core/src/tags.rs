//! Tag reconciliation.
//!
//! Client tag objects may arrive without ids, so the difference between the
//! stored and submitted tag sets is always taken by name.

use std::collections::BTreeSet;

use crate::types::tag::normalize_tag_name;

/// Names to connect-or-create and names to disconnect for one recipe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagChanges {
    pub connect: Vec<String>,
    pub disconnect: Vec<String>,
}

impl TagChanges {
    /// Diff two tag name sets. Names are trimmed, blanks dropped and
    /// duplicates collapsed; output is sorted.
    #[must_use]
    pub fn between<'a, P, N>(previous: P, next: N) -> Self
    where
        P: IntoIterator<Item = &'a str>,
        N: IntoIterator<Item = &'a str>,
    {
        let previous = normalized_set(previous);
        let next = normalized_set(next);

        Self {
            connect: next.difference(&previous).map(|s| (*s).to_owned()).collect(),
            disconnect: previous.difference(&next).map(|s| (*s).to_owned()).collect(),
        }
    }

    /// Every submitted name is connect-or-created; used on create.
    #[must_use]
    pub fn connect_all<'a, I>(names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self::between(std::iter::empty(), names)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connect.is_empty() && self.disconnect.is_empty()
    }
}

fn normalized_set<'a, I>(names: I) -> BTreeSet<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    names.into_iter().filter_map(normalize_tag_name).collect()
}
