use std::collections::HashSet;

/// Lowercased, whitespace-split tokens of a piece of text.
///
/// Duplicates are dropped but first-seen order is kept, so callers that need
/// the original word order still have it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSet {
    ordered: Vec<String>,
    members: HashSet<String>,
}

impl TokenSet {
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.members.contains(token)
    }

    /// Tokens in the order they first appeared.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }

    /// Number of tokens shared with `other`.
    pub fn overlap(&self, other: &TokenSet) -> usize {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.iter().filter(|t| large.contains(t)).count()
    }

    pub fn union_len(&self, other: &TokenSet) -> usize {
        self.len() + other.len() - self.overlap(other)
    }

    fn insert(&mut self, token: String) {
        if self.members.insert(token.clone()) {
            self.ordered.push(token);
        }
    }
}

impl<S: Into<String>> FromIterator<S> for TokenSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = TokenSet::default();
        for token in iter {
            set.insert(token.into());
        }
        set
    }
}

/// Lowercases `text` and splits it on whitespace.
///
/// No stemming and no stop-word removal. Empty input gives an empty set.
pub fn normalize(text: &str) -> TokenSet {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}
