//! Normalization of raw records into hyperdata.
//!
//! Dates are resolved into canonical `<prefix>_date` fields (see
//! [parse_datetime] and [DateStrategy]), and language fields are
//! resolved against a [LanguageCatalog]. Normalization never fails:
//! unresolvable fields are reported with a warning and left as they
//! are.

use chrono::{Local, NaiveDateTime};

use crate::language::LanguageCatalog;
use crate::record::{HyperdataRecord, RawRecord};

mod date;
mod language;

pub use date::{
    parse_datetime, resolve_date, strip_placeholders, DateStrategy,
    ASSEMBLED_STRATEGIES, DATE_FORMAT,
};
pub use language::UNKNOWN_ISO2;

/// Returns the current local time.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Turns raw records into hyperdata.
///
/// The clock is consulted whenever a record has no usable date. It
/// defaults to [local_now]; tests pin it with [with_clock].
///
/// [with_clock]: HyperdataNormalizer::with_clock
#[derive(Debug, Clone, Copy)]
pub struct HyperdataNormalizer<'a> {
    catalog: &'a LanguageCatalog,
    clock: fn() -> NaiveDateTime,
}

impl<'a> HyperdataNormalizer<'a> {
    pub fn new(catalog: &'a LanguageCatalog) -> Self {
        Self {
            catalog,
            clock: local_now,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn catalog(&self) -> &'a LanguageCatalog {
        self.catalog
    }

    /// Resolves and expands the date fields of the record.
    pub fn normalize_dates(&self, record: &mut RawRecord) {
        date::format_hyperdata_dates(record, (self.clock)());
    }

    /// Resolves the language fields of the record.
    pub fn normalize_language(&self, record: &mut RawRecord) {
        language::format_hyperdata_languages(record, self.catalog);
    }

    /// Applies date and language normalization. Normalizing a record
    /// twice yields the same result as normalizing it once.
    pub fn normalize(&self, mut record: RawRecord) -> HyperdataRecord {
        self.normalize_dates(&mut record);
        self.normalize_language(&mut record);
        HyperdataRecord::from_raw(record)
    }
}
