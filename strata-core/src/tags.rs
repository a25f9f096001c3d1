//! Ordered OpenStreetMap tag sets.
//!
//! Tags keep the order in which the producer emitted them. Keys are unique
//! within one element: inserting an existing key replaces its value instead of
//! appending a duplicate.

/// Ordered key/value tags attached to an element.
///
/// # Examples
/// ```
/// use strata_core::Tags;
///
/// let mut tags = Tags::from([("addr:housenumber", "12")]);
/// tags.insert("addr:street", "Main St");
///
/// assert_eq!(tags.get("addr:street"), Some("Main St"));
/// assert_eq!(tags.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags {
    pairs: Vec<(String, String)>,
}

impl Tags {
    /// Create an empty tag set.
    #[must_use]
    pub const fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Collect borrowed key/value pairs, as yielded by the PBF decoder.
    #[must_use]
    pub fn from_borrowed<'a, T>(tags: T) -> Self
    where
        T: IntoIterator<Item = (&'a str, &'a str)>,
    {
        tags.into_iter().collect()
    }

    /// Value stored for `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value.as_str())
    }

    /// Whether the tag set carries `key`, regardless of its value.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.iter().any(|(candidate, _)| candidate == key)
    }

    /// Set `key` to `value`, replacing an existing value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(candidate, _)| *candidate == key) {
            Some((_, existing)) => *existing = value,
            None => self.pairs.push((key, value)),
        }
    }

    /// Iterate over the tags in producer order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.pairs
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Number of tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the element is untagged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Tags
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tags = Self::new();
        for (key, value) in iter {
            tags.insert(key, value);
        }
        tags
    }
}

impl<const N: usize> From<[(&str, &str); N]> for Tags {
    fn from(pairs: [(&str, &str); N]) -> Self {
        pairs.into_iter().collect()
    }
}
