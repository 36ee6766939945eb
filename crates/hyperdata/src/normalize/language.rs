use log::warn;

use crate::language::{LanguageCatalog, LanguageEntry};
use crate::record::RawRecord;

/// Placeholder for the two-letter code of a language that has none.
pub const UNKNOWN_ISO2: &str = "__unknown__";

const LANGUAGE_KEYS: [&str; 3] = ["name", "iso3", "iso2"];

fn apply(record: &mut RawRecord, entry: &LanguageEntry) {
    record.insert("language_name".into(), entry.fullname.clone());
    record.insert("language_iso3".into(), entry.iso3.clone());
    record.insert(
        "language_iso2".into(),
        entry.iso2.clone().unwrap_or_else(|| UNKNOWN_ISO2.into()),
    );
}

/// Resolves the language fields of a record.
///
/// The values of `language_name`, `language_iso3` and `language_iso2`
/// are looked up in this order; the first match sets all three fields.
/// If none matches, the fields are left untouched.
pub(crate) fn format_hyperdata_languages(
    record: &mut RawRecord,
    catalog: &LanguageCatalog,
) {
    let mut unresolved = vec![];

    for key in LANGUAGE_KEYS {
        let Some(symbol) = record.get(&format!("language_{key}")) else {
            continue;
        };

        match catalog.lookup(symbol) {
            Some(entry) => {
                apply(record, entry);
                return;
            }
            None => unresolved.push(format!("{key}=\"{symbol}\"")),
        }
    }

    if !unresolved.is_empty() {
        warn!("unrecognized language: {}", unresolved.join(", "));
    }
}
