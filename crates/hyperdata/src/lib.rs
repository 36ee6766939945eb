//! # Hyperdata
//!
//! Ingestion of bibliographic export files and termhood scoring.
//!
//! A [ParsingPipeline] walks an input (possibly nested zip, gzip and
//! tar archives), parses every leaf file with the [FormatParser] of the
//! declared [ResourceType] and normalizes each record into a
//! [HyperdataRecord]: dates are resolved into canonical `<prefix>_date`
//! fields with consistent components, and languages are resolved
//! against a [LanguageCatalog].
//!
//! ```ignore
//! use hyperdata::{LanguageCatalog, ParsingPipeline, ResourceType};
//!
//! let catalog = LanguageCatalog::builtin();
//! let pipeline = ParsingPipeline::new(ResourceType::Ris, catalog);
//!
//! let mut records = pipeline.records(File::open(path)?, "export.zip")?;
//! for record in records.by_ref() {
//!     println!("{}", record["publication_date"]);
//! }
//!
//! eprintln!("{:?}", records.stats());
//! ```
//!
//! The [CValueScorer] ranks multi-word terms of a corpus by their
//! C-value, given the aggregate frequencies of a
//! [NgramFrequencyIndex].

pub use cvalue::{
    CValueScorer, FrequencyEntry, NgramFrequencyIndex, ScoreTable,
    ScoredTerm,
};
pub use error::{HyperdataError, HyperdataResult};
pub use language::{LanguageCatalog, LanguageEntry};
pub use normalize::{
    parse_datetime, DateStrategy, HyperdataNormalizer, DATE_FORMAT,
    UNKNOWN_ISO2,
};
pub use parser::{
    CsvParser, FormatParser, IsiParser, MarcXmlParser, RawRecords,
    ResourceType, RisParser,
};
pub use pipeline::{ParsingPipeline, PipelineStats, Records};
pub use record::{HyperdataRecord, RawRecord};
pub use walker::{ArchiveWalker, Leaf, WalkStats, WalkerOptions};

mod cvalue;
mod error;
mod language;
pub mod normalize;
mod parser;
mod pipeline;
mod record;
mod walker;
