//! Project element tags onto a layer's fixed column schema.
//!
//! Each layer declares an ordered list of [`Column`]s. A column pairs the
//! output field name with a [`ColumnRule`] describing how its value is derived
//! from the element's tags. Projection always yields exactly one value slot per
//! declared column, in declaration order.

use std::collections::BTreeMap;

use crate::Tags;

/// Output type of a projected column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// Nullable UTF-8 string.
    Text,
    /// Nullable list of strings.
    TextList,
    /// Nullable map from string to string.
    TextMap,
    /// Nullable map from string to a list of strings.
    TextListMap,
    /// Nullable unsigned 32-bit integer.
    UInt32,
}

/// Derivation rule for one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRule {
    /// Copy the tag named after the column.
    Text,
    /// Split the tag named after the column on `;`.
    Split,
    /// Collect every tag starting with the prefix, keyed by the remainder.
    PrefixMap(&'static str),
    /// As [`ColumnRule::PrefixMap`], splitting each value on `;`.
    PrefixMapSplit(&'static str),
    /// Parse the tag named after the column as a `u32`; invalid input is null.
    UInt32,
}

impl ColumnRule {
    /// Output type produced by the rule.
    #[must_use]
    pub const fn column_type(self) -> ColumnType {
        match self {
            Self::Text => ColumnType::Text,
            Self::Split => ColumnType::TextList,
            Self::PrefixMap(_) => ColumnType::TextMap,
            Self::PrefixMapSplit(_) => ColumnType::TextListMap,
            Self::UInt32 => ColumnType::UInt32,
        }
    }
}

/// A named output column and the rule that fills it.
///
/// # Examples
/// ```
/// use strata_core::{Column, ColumnType};
///
/// let column = Column::prefix_map("names", "name:");
/// assert_eq!(column.name, "names");
/// assert_eq!(column.column_type(), ColumnType::TextMap);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Column {
    /// Output field name; also the source tag key for non-map rules.
    pub name: &'static str,
    /// Derivation rule.
    pub rule: ColumnRule,
}

impl Column {
    /// A directly copied text column.
    #[must_use]
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            rule: ColumnRule::Text,
        }
    }

    /// A multi-value list column.
    #[must_use]
    pub const fn split(name: &'static str) -> Self {
        Self {
            name,
            rule: ColumnRule::Split,
        }
    }

    /// A prefix map column.
    #[must_use]
    pub const fn prefix_map(name: &'static str, prefix: &'static str) -> Self {
        Self {
            name,
            rule: ColumnRule::PrefixMap(prefix),
        }
    }

    /// A prefix map column whose values are multi-value lists.
    #[must_use]
    pub const fn prefix_map_split(name: &'static str, prefix: &'static str) -> Self {
        Self {
            name,
            rule: ColumnRule::PrefixMapSplit(prefix),
        }
    }

    /// An unsigned integer column.
    #[must_use]
    pub const fn uint32(name: &'static str) -> Self {
        Self {
            name,
            rule: ColumnRule::UInt32,
        }
    }

    /// Output type of the column.
    #[must_use]
    pub const fn column_type(&self) -> ColumnType {
        self.rule.column_type()
    }
}

/// A projected, non-null column value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnValue {
    /// Text value.
    Text(String),
    /// List of strings.
    TextList(Vec<String>),
    /// Map of strings, ordered by key.
    TextMap(BTreeMap<String, String>),
    /// Map of string lists, ordered by key.
    TextListMap(BTreeMap<String, Vec<String>>),
    /// Unsigned integer.
    UInt32(u32),
}

impl ColumnValue {
    /// Output type of the value.
    #[must_use]
    pub const fn column_type(&self) -> ColumnType {
        match self {
            Self::Text(_) => ColumnType::Text,
            Self::TextList(_) => ColumnType::TextList,
            Self::TextMap(_) => ColumnType::TextMap,
            Self::TextListMap(_) => ColumnType::TextListMap,
            Self::UInt32(_) => ColumnType::UInt32,
        }
    }
}

/// Split a `;`-delimited tag value into trimmed, non-empty items.
///
/// An absent value stays absent rather than becoming an empty list.
///
/// # Examples
/// ```
/// use strata_core::split_multi_value;
///
/// assert_eq!(
///     split_multi_value(Some("Hyde Park; Park ;")),
///     Some(vec!["Hyde Park".to_owned(), "Park".to_owned()])
/// );
/// assert_eq!(split_multi_value(None), None);
/// ```
#[must_use]
pub fn split_multi_value(value: Option<&str>) -> Option<Vec<String>> {
    value.map(|raw| {
        raw.split(';')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_owned)
            .collect()
    })
}

/// Collect every tag whose key starts with `prefix` into a map keyed by the
/// remainder of the key. Entries for which `transform` yields `None` are left
/// out.
#[must_use]
pub fn tags_with_prefix<T, F>(prefix: &str, tags: &Tags, mut transform: F) -> BTreeMap<String, T>
where
    F: FnMut(&str) -> Option<T>,
{
    tags.iter()
        .filter_map(|(key, value)| {
            let suffix = key.strip_prefix(prefix)?;
            transform(value).map(|mapped| (suffix.to_owned(), mapped))
        })
        .collect()
}

/// Project `tags` onto `columns`.
///
/// The result has exactly `columns.len()` entries. Prefix maps with no
/// matching tags project as empty maps; every other rule yields `None` when
/// its source tag is missing.
///
/// # Examples
/// ```
/// use strata_core::{Column, ColumnValue, Tags, project};
///
/// let columns = [Column::text("highway"), Column::text("name")];
/// let tags = Tags::from([("highway", "residential"), ("surface", "asphalt")]);
/// let row = project(&columns, &tags);
///
/// assert_eq!(row, vec![Some(ColumnValue::Text("residential".into())), None]);
/// ```
#[must_use]
pub fn project(columns: &[Column], tags: &Tags) -> Vec<Option<ColumnValue>> {
    columns.iter().map(|column| project_one(column, tags)).collect()
}

fn project_one(column: &Column, tags: &Tags) -> Option<ColumnValue> {
    match column.rule {
        ColumnRule::Text => tags
            .get(column.name)
            .map(|value| ColumnValue::Text(value.to_owned())),
        ColumnRule::Split => split_multi_value(tags.get(column.name)).map(ColumnValue::TextList),
        ColumnRule::PrefixMap(prefix) => Some(ColumnValue::TextMap(tags_with_prefix(
            prefix,
            tags,
            |value| Some(value.to_owned()),
        ))),
        ColumnRule::PrefixMapSplit(prefix) => Some(ColumnValue::TextListMap(tags_with_prefix(
            prefix,
            tags,
            |value| split_multi_value(Some(value)),
        ))),
        ColumnRule::UInt32 => tags
            .get(column.name)
            .and_then(|value| value.trim().parse().ok())
            .map(ColumnValue::UInt32),
    }
}
