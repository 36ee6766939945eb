use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::error::{bail, HyperdataResult};

const BUILTIN: &str = include_str!("../data/languages.csv");

/// A language as known to the [LanguageCatalog].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageEntry {
    /// The ISO 639-1 code, if the language has one.
    pub iso2: Option<String>,

    /// The ISO 639-2 (bibliographic) code.
    pub iso3: String,

    /// The ISO 639-2 terminology code, if it differs from the
    /// bibliographic one.
    #[serde(default)]
    pub iso3t: Option<String>,

    #[serde(rename = "name")]
    pub fullname: String,

    #[serde(default)]
    pub implemented: bool,
}

/// Read-only reference table of languages.
///
/// Entries can be looked up (case-insensitive) by their two-letter
/// code, either of their three-letter codes or their full name.
#[derive(Debug, Default)]
pub struct LanguageCatalog {
    entries: Vec<LanguageEntry>,
    iso2: HashMap<String, usize>,
    iso3: HashMap<String, usize>,
    names: HashMap<String, usize>,
}

#[inline]
fn key<S: AsRef<str>>(s: S) -> String {
    s.as_ref().trim().to_lowercase()
}

impl LanguageCatalog {
    /// Creates a catalog from the given entries.
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = LanguageEntry>,
    {
        let mut catalog = Self::default();

        for entry in entries.into_iter() {
            let idx = catalog.entries.len();

            if let Some(ref iso2) = entry.iso2 {
                catalog.iso2.insert(key(iso2), idx);
            }

            catalog.iso3.insert(key(&entry.iso3), idx);
            if let Some(ref iso3t) = entry.iso3t {
                catalog.iso3.entry(key(iso3t)).or_insert(idx);
            }

            catalog.names.entry(key(&entry.fullname)).or_insert(idx);
            catalog.entries.push(entry);
        }

        catalog
    }

    /// Returns the catalog shipped with the crate.
    ///
    /// The catalog is parsed on first access and shared for the rest of
    /// the process.
    pub fn builtin() -> &'static Self {
        static CATALOG: OnceLock<LanguageCatalog> = OnceLock::new();
        CATALOG.get_or_init(|| {
            Self::from_reader(BUILTIN.as_bytes())
                .expect("valid builtin language catalog")
        })
    }

    /// Loads a catalog in CSV format (`iso2,iso3,iso3t,name,implemented`).
    pub fn from_reader<R: Read>(reader: R) -> HyperdataResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let entries = reader
            .deserialize::<LanguageEntry>()
            .collect::<Result<Vec<_>, _>>()?;

        if entries.is_empty() {
            bail!("empty language catalog");
        }

        Ok(Self::new(entries))
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> HyperdataResult<Self> {
        Self::from_reader(File::open(path)?)
    }

    pub fn by_iso2(&self, code: &str) -> Option<&LanguageEntry> {
        self.iso2.get(&key(code)).map(|idx| &self.entries[*idx])
    }

    pub fn by_iso3(&self, code: &str) -> Option<&LanguageEntry> {
        self.iso3.get(&key(code)).map(|idx| &self.entries[*idx])
    }

    pub fn by_name(&self, name: &str) -> Option<&LanguageEntry> {
        self.names.get(&key(name)).map(|idx| &self.entries[*idx])
    }

    /// Looks up a symbol of unknown kind: full name, then three-letter
    /// code, then two-letter code.
    pub fn lookup(&self, symbol: &str) -> Option<&LanguageEntry> {
        self.by_name(symbol)
            .or_else(|| self.by_iso3(symbol))
            .or_else(|| self.by_iso2(symbol))
    }

    pub fn iter(&self) -> impl Iterator<Item = &LanguageEntry> {
        self.entries.iter()
    }

    /// Returns the languages with a text-processing implementation.
    pub fn implemented(&self) -> impl Iterator<Item = &LanguageEntry> {
        self.entries.iter().filter(|entry| entry.implemented)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = anyhow::Result<()>;

    #[test]
    fn builtin_catalog() {
        let catalog = LanguageCatalog::builtin();
        assert!(catalog.len() > 100);

        let french = catalog.by_iso2("fr").unwrap();
        assert_eq!(french.fullname, "French");
        assert_eq!(french.iso3, "fre");
        assert!(french.implemented);

        assert_eq!(catalog.by_iso3("fra").unwrap(), french);
        assert_eq!(catalog.by_iso3("FRE").unwrap(), french);
        assert_eq!(catalog.by_name("french").unwrap(), french);

        let dan = catalog.by_iso3("dnj").unwrap();
        assert_eq!(dan.iso2, None);
        assert!(!dan.implemented);

        let implemented: Vec<_> = catalog
            .implemented()
            .filter_map(|entry| entry.iso2.as_deref())
            .collect();
        assert_eq!(implemented, vec!["en", "fr"]);
    }

    #[test]
    fn lookup_any_symbol() {
        let catalog = LanguageCatalog::builtin();
        assert_eq!(catalog.lookup("German").unwrap().iso3, "ger");
        assert_eq!(catalog.lookup("deu").unwrap().iso3, "ger");
        assert_eq!(catalog.lookup("de").unwrap().iso3, "ger");
        assert!(catalog.lookup("klingon").is_none());
    }

    #[test]
    fn from_reader() -> TestResult {
        let data = "iso2,iso3,iso3t,name,implemented\n\
            en,eng,,English,true\n\
            ,dnj,,Dan,false\n";

        let catalog = LanguageCatalog::from_reader(data.as_bytes())?;
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.by_iso2("en").unwrap().iso3, "eng");
        assert_eq!(catalog.by_iso3("dnj").unwrap().iso2, None);
        assert!(catalog.by_iso2("").is_none());

        Ok(())
    }

    #[test]
    fn from_reader_empty() {
        let data = "iso2,iso3,iso3t,name,implemented\n";
        assert!(LanguageCatalog::from_reader(data.as_bytes()).is_err());
    }
}
