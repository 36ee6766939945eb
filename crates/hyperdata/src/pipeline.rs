use std::io::Read;
use std::ops::{Add, AddAssign};

use chrono::NaiveDateTime;
use log::warn;
use rayon::prelude::*;

use crate::error::HyperdataResult;
use crate::language::LanguageCatalog;
use crate::normalize::HyperdataNormalizer;
use crate::parser::{FormatParser, RawRecords, ResourceType};
use crate::record::HyperdataRecord;
use crate::walker::{ArchiveWalker, Leaf, WalkerOptions};

/// Counters of a pipeline run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStats {
    /// Number of leaf files handed to the parser.
    pub files: usize,

    /// Number of normalized records.
    pub records: usize,

    /// Number of records the parser could not extract.
    pub skipped_records: usize,

    /// Number of container entries that could not be read.
    pub skipped_entries: usize,
}

impl Add for PipelineStats {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            files: self.files + rhs.files,
            records: self.records + rhs.records,
            skipped_records: self.skipped_records + rhs.skipped_records,
            skipped_entries: self.skipped_entries + rhs.skipped_entries,
        }
    }
}

impl AddAssign for PipelineStats {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Walks an input, parses every leaf file with the parser of the
/// declared resource type and normalizes the records.
pub struct ParsingPipeline<'a> {
    resource_type: ResourceType,
    parser: Box<dyn FormatParser>,
    normalizer: HyperdataNormalizer<'a>,
    options: WalkerOptions,
}

impl<'a> ParsingPipeline<'a> {
    pub fn new(
        resource_type: ResourceType,
        catalog: &'a LanguageCatalog,
    ) -> Self {
        Self {
            resource_type,
            parser: resource_type.parser(),
            normalizer: HyperdataNormalizer::new(catalog),
            options: WalkerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: WalkerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.normalizer = self.normalizer.with_clock(clock);
        self
    }

    #[inline]
    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    fn walker<R: Read>(
        &self,
        reader: R,
        name: String,
    ) -> HyperdataResult<ArchiveWalker> {
        Ok(ArchiveWalker::new(reader, name)?.with_options(self.options))
    }

    /// Returns the lazy sequence of normalized records of the input.
    ///
    /// Reading the input is the only failure; skipped entries and
    /// records are logged and counted in [Records::stats].
    pub fn records<R, N>(
        &self,
        reader: R,
        name: N,
    ) -> HyperdataResult<Records<'_>>
    where
        R: Read,
        N: Into<String>,
    {
        Ok(Records {
            walker: self.walker(reader, name.into())?,
            parser: self.parser.as_ref(),
            normalizer: self.normalizer,
            current: None,
            stats: PipelineStats::default(),
        })
    }

    /// Processes the leaf files of the input in parallel and passes
    /// every normalized record to `sink`. Records of different files
    /// arrive in no particular order.
    pub fn par_records<R, N, F>(
        &self,
        reader: R,
        name: N,
        sink: F,
    ) -> HyperdataResult<PipelineStats>
    where
        R: Read,
        N: Into<String>,
        F: Fn(HyperdataRecord) + Sync + Send,
    {
        let mut walker = self.walker(reader, name.into())?;

        let mut stats = walker
            .by_ref()
            .par_bridge()
            .map(|leaf| self.process_leaf(leaf, &sink))
            .reduce(PipelineStats::default, |a, b| a + b);

        stats.skipped_entries = walker.stats().skipped;
        Ok(stats)
    }

    fn process_leaf<F>(&self, leaf: Leaf, sink: &F) -> PipelineStats
    where
        F: Fn(HyperdataRecord),
    {
        let mut stats = PipelineStats {
            files: 1,
            ..Default::default()
        };

        let path = leaf.path().to_string();
        for result in self.parser.parse(leaf.into_bytes()) {
            match result {
                Ok(raw) => {
                    sink(self.normalizer.normalize(raw));
                    stats.records += 1;
                }
                Err(e) => {
                    warn!("skip record of '{path}': {e}");
                    stats.skipped_records += 1;
                }
            }
        }

        stats
    }
}

/// The lazy record sequence of a [ParsingPipeline] run.
pub struct Records<'a> {
    walker: ArchiveWalker,
    parser: &'a dyn FormatParser,
    normalizer: HyperdataNormalizer<'a>,
    current: Option<(String, RawRecords)>,
    stats: PipelineStats,
}

impl Records<'_> {
    /// Returns the counters of the records pulled so far.
    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            skipped_entries: self.walker.stats().skipped,
            ..self.stats
        }
    }
}

impl Iterator for Records<'_> {
    type Item = HyperdataRecord;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((path, records)) = &mut self.current {
                match records.next() {
                    Some(Ok(raw)) => {
                        self.stats.records += 1;
                        return Some(self.normalizer.normalize(raw));
                    }
                    Some(Err(e)) => {
                        warn!("skip record of '{path}': {e}");
                        self.stats.skipped_records += 1;
                    }
                    None => self.current = None,
                }

                continue;
            }

            let leaf = self.walker.next()?;
            self.stats.files += 1;

            let path = leaf.path().to_string();
            self.current = Some((path, self.parser.parse(leaf.into_bytes())));
        }
    }
}
