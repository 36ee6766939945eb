//! Shared reader for tag-per-line formats (RIS, ISI).

use std::collections::BTreeMap;

use log::debug;

use crate::error::{HyperdataError, HyperdataResult};
use crate::record::{MultiValue, RawRecord};

/// A classified input line.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Line<'a> {
    Tag(&'a str, &'a str),
    Continuation(&'a str),
    Blank,
    Malformed,
}

/// Describes the syntax and the field table of a tagged format.
pub(crate) struct Dialect {
    pub(crate) name: &'static str,

    /// Classifies a single line (without line terminator).
    pub(crate) split: fn(&str) -> Line<'_>,

    /// The tag which closes a record.
    pub(crate) end: &'static str,

    /// Maps a tag to the record key.
    pub(crate) fields: &'static [(&'static str, &'static str)],

    /// Keys which can occur multiple times, with the separator used to
    /// join them.
    pub(crate) lists: &'static [(&'static str, &'static str)],
}

impl Dialect {
    fn key(&self, tag: &str) -> Option<&'static str> {
        self.fields
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, key)| *key)
    }

    fn separator(&self, key: &str) -> Option<&'static str> {
        self.lists
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, sep)| *sep)
    }
}

#[inline]
pub(crate) fn is_tag(bytes: &[u8]) -> bool {
    bytes.len() >= 2
        && bytes[0].is_ascii_uppercase()
        && (bytes[1].is_ascii_uppercase() || bytes[1].is_ascii_digit())
}

#[derive(Default)]
struct Builder {
    scalars: BTreeMap<&'static str, String>,
    lists: BTreeMap<&'static str, MultiValue>,
    last: Option<&'static str>,
    tags: usize,
}

impl Builder {
    fn is_empty(&self) -> bool {
        self.tags == 0
    }

    fn push(&mut self, dialect: &Dialect, key: &'static str, value: &str) {
        if dialect.separator(key).is_some() {
            self.lists.entry(key).or_default().push(value);
        } else {
            self.scalars.entry(key).or_insert_with(|| value.to_string());
        }

        self.last = Some(key);
    }

    fn extend(&mut self, dialect: &Dialect, value: &str) {
        let Some(key) = self.last else {
            return;
        };

        if dialect.separator(key).is_some() {
            self.lists.entry(key).or_default().push(value);
        } else {
            self.scalars
                .entry(key)
                .and_modify(|scalar| {
                    scalar.push(' ');
                    scalar.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }
    }

    fn finish(self, dialect: &Dialect) -> HyperdataResult<RawRecord> {
        let mut record = RawRecord::new();

        for (key, value) in self.scalars.into_iter() {
            record.set(key, value);
        }

        for (key, values) in self.lists.into_iter() {
            let sep = dialect.separator(key).unwrap_or(", ");
            record.set(key, values.join(sep));
        }

        if record.is_empty() {
            return Err(HyperdataError::parse(format!(
                "{} record without any known field",
                dialect.name
            )));
        }

        Ok(record)
    }
}

/// Lazily splits a tagged text into records.
pub(crate) struct TaggedRecords {
    dialect: &'static Dialect,
    text: String,
    pos: usize,
}

impl TaggedRecords {
    pub(crate) fn new(dialect: &'static Dialect, text: String) -> Self {
        Self {
            dialect,
            text,
            pos: 0,
        }
    }

    fn next_line(&mut self) -> Option<(usize, usize)> {
        if self.pos >= self.text.len() {
            return None;
        }

        let start = self.pos;
        let end = match self.text[start..].find('\n') {
            Some(offset) => start + offset,
            None => self.text.len(),
        };

        self.pos = end + 1;
        Some((start, end))
    }
}

impl Iterator for TaggedRecords {
    type Item = HyperdataResult<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let dialect = self.dialect;
        let mut builder = Builder::default();

        while let Some((start, end)) = self.next_line() {
            let line = self.text[start..end].trim_end_matches('\r');

            match (dialect.split)(line) {
                Line::Tag(tag, _) if tag == dialect.end => {
                    if builder.is_empty() {
                        continue;
                    }

                    return Some(builder.finish(dialect));
                }
                Line::Tag(tag, value) => match dialect.key(tag) {
                    Some(key) => {
                        builder.tags += 1;
                        if value.is_empty() {
                            builder.last = Some(key);
                        } else {
                            builder.push(dialect, key, value);
                        }
                    }
                    None => {
                        debug!("{}: ignore tag '{tag}'", dialect.name);
                        builder.last = None;
                    }
                },
                Line::Continuation(value) => builder.extend(dialect, value),
                Line::Blank => {}
                Line::Malformed => {
                    debug!("{}: ignore malformed line '{line}'", dialect.name);
                }
            }
        }

        // The last record may lack its end tag.
        if builder.is_empty() {
            None
        } else {
            Some(builder.finish(dialect))
        }
    }
}
