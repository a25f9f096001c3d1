//! Aggregate tag-key filter shared by all active layers.

use std::collections::BTreeSet;

/// Union of the tag keys every active layer is interested in.
///
/// An element passes when at least one of its tag keys is in the set.
/// Untagged elements never pass. Layers still re-check relevance themselves;
/// the filter only lets the source skip elements early.
///
/// # Examples
/// ```
/// use strata_core::InterestFilter;
///
/// let mut filter = InterestFilter::new();
/// filter.extend(["boundary"]);
/// filter.extend(["boundary", "leisure"]);
///
/// assert_eq!(filter.keys().count(), 2);
/// assert!(filter.accepts([("boundary", "administrative")]));
/// assert!(!filter.accepts([("natural", "water")]));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterestFilter {
    keys: BTreeSet<String>,
}

impl InterestFilter {
    /// Create an empty filter that accepts nothing.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            keys: BTreeSet::new(),
        }
    }

    /// Add interest keys.
    pub fn extend<I, K>(&mut self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.keys.extend(keys.into_iter().map(Into::into));
    }

    /// Interest keys in lexical order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.keys.iter().map(String::as_str)
    }

    /// Whether `key` is one of the interest keys.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Whether the filter has no keys at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Whether an element with these tags should be forwarded.
    #[must_use]
    pub fn accepts<'a, I>(&self, tags: I) -> bool
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        tags.into_iter().any(|(key, _)| self.contains_key(key))
    }
}
