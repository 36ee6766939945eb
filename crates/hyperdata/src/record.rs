use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

/// A record as extracted by a [FormatParser](crate::FormatParser).
///
/// The keys are format specific and the values carry no normalization
/// guarantees. Repeated fields are already joined into one delimited
/// string.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RawRecord(BTreeMap<String, String>);

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value` unless the value is blank.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: AsRef<str>,
    {
        let value = value.as_ref().trim();
        if !value.is_empty() {
            self.0.insert(key.into(), value.to_string());
        }
    }
}

impl Deref for RawRecord {
    type Target = BTreeMap<String, String>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for RawRecord {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<K, V> FromIterator<(K, V)> for RawRecord
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<HyperdataRecord> for RawRecord {
    fn from(record: HyperdataRecord) -> Self {
        Self(record.0)
    }
}

/// The normalized attribute set of one document.
///
/// Every `<prefix>_date` field comes with consistent `_year`, `_month`,
/// `_day`, `_hour`, `_minute` and `_second` fields, and `language_iso2`
/// is set whenever the language could be resolved.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HyperdataRecord(BTreeMap<String, String>);

impl HyperdataRecord {
    #[inline]
    pub(crate) fn from_raw(raw: RawRecord) -> Self {
        Self(raw.0)
    }

    #[inline]
    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl Deref for HyperdataRecord {
    type Target = BTreeMap<String, String>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Accumulates the occurrences of a repeatable field in order.
///
/// Primary occurrences are kept ahead of all secondary occurrences,
/// each group in the order they were pushed.
#[derive(Debug, Default, Clone)]
pub(crate) struct MultiValue {
    primary: Vec<String>,
    secondary: Vec<String>,
}

impl MultiValue {
    pub(crate) fn push_primary<S: Into<String>>(&mut self, value: S) {
        self.primary.push(value.into());
    }

    pub(crate) fn push<S: Into<String>>(&mut self, value: S) {
        self.secondary.push(value.into());
    }

    pub(crate) fn join(&self, sep: &str) -> String {
        self.primary
            .iter()
            .chain(self.secondary.iter())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(sep)
    }
}
