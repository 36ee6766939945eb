use std::fs::File;
use std::io::{self, stdout, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use clap::Parser;
use glob::glob;
use hyperdata::{
    HyperdataRecord, LanguageCatalog, ParsingPipeline, PipelineStats,
    ResourceType,
};
use indicatif::ProgressBar;
use log::info;

use crate::prelude::*;

const PBAR_PARSE: &str = "Parsing {prefix}: {human_pos} records | \
        elapsed: {elapsed_precise}";

/// Parse export files into normalized records.
///
/// Every input may be a single export file or a (nested) zip, gzip or
/// tar archive of export files. The records are written as JSON lines;
/// the number of normalized and skipped records of each input is
/// reported on the standard error stream.
#[derive(Debug, Parser)]
pub(crate) struct Parse {
    /// Run verbosely. Print additional progress information to the
    /// standard error stream. This option conflicts with the
    /// `--quiet` option.
    #[arg(short, long, conflicts_with = "quiet")]
    pub(crate) verbose: bool,

    /// Operate quietly; do not show progress. This option conflicts
    /// with the `--verbose` option.
    #[arg(short, long, conflicts_with = "verbose")]
    pub(crate) quiet: bool,

    /// The format of the export files (marc, ris, isi or csv).
    #[arg(short = 't', long = "type", default_value_t = ResourceType::Ris)]
    resource_type: ResourceType,

    /// Process the files of an archive in parallel. The order of the
    /// records isn't preserved.
    #[arg(long)]
    parallel: bool,

    /// Write the records into `filename`. By default output will be
    /// written to the standard output (`stdout`).
    #[arg(short, long, value_name = "filename")]
    output: Option<PathBuf>,

    /// The input files; glob patterns are expanded.
    #[arg(required = true, value_name = "PATH")]
    paths: Vec<String>,
}

fn expand(patterns: &[String]) -> CorpusResult<Vec<PathBuf>> {
    let mut paths = vec![];

    for pattern in patterns {
        let matches: Vec<PathBuf> = glob(pattern)
            .map_err(CorpusError::other)?
            .filter_map(Result::ok)
            .filter(|path| path.is_file())
            .collect();

        if matches.is_empty() {
            bail!("no input matches '{pattern}'");
        }

        paths.extend(matches);
    }

    Ok(paths)
}

fn write_record<W: Write>(
    writer: &mut W,
    record: &HyperdataRecord,
) -> io::Result<()> {
    serde_json::to_writer(&mut *writer, record)?;
    writer.write_all(b"\n")
}

fn parse<W: Write>(
    pipeline: &ParsingPipeline,
    path: &Path,
    writer: &mut W,
    pbar: &ProgressBar,
) -> CorpusResult<PipelineStats> {
    let name = path.display().to_string();
    let mut records = pipeline.records(File::open(path)?, name)?;

    for record in records.by_ref() {
        write_record(writer, &record)?;
        pbar.inc(1);
    }

    Ok(records.stats())
}

fn par_parse<W: Write + Send>(
    pipeline: &ParsingPipeline,
    path: &Path,
    writer: &mut W,
    pbar: &ProgressBar,
) -> CorpusResult<PipelineStats> {
    let name = path.display().to_string();
    let writer = Mutex::new(writer);
    let failed: Mutex<Option<io::Error>> = Mutex::new(None);

    let stats =
        pipeline.par_records(File::open(path)?, name, |record| {
            let mut writer =
                writer.lock().unwrap_or_else(PoisonError::into_inner);

            if let Err(e) = write_record(&mut *writer, &record) {
                let mut failed =
                    failed.lock().unwrap_or_else(PoisonError::into_inner);
                if failed.is_none() {
                    *failed = Some(e);
                }
            }

            pbar.inc(1);
        })?;

    match failed.into_inner().unwrap_or_else(PoisonError::into_inner) {
        Some(e) => Err(e.into()),
        None => Ok(stats),
    }
}

impl Parse {
    pub(crate) fn execute(self, config: &Config) -> CorpusResult<()> {
        let loaded = config.catalog()?;
        let catalog = match loaded {
            Some(ref catalog) => catalog,
            None => LanguageCatalog::builtin(),
        };

        let pipeline = ParsingPipeline::new(self.resource_type, catalog)
            .with_options(config.walker_options());

        let paths = expand(&self.paths)?;
        let output: Box<dyn Write + Send> = match self.output {
            Some(ref path) => Box::new(File::create(path)?),
            None => Box::new(stdout()),
        };

        let mut writer = BufWriter::new(output);
        let mut total = PipelineStats::default();

        for path in paths.iter() {
            let pbar = ProgressBarBuilder::new(PBAR_PARSE, self.quiet).build();
            pbar.set_prefix(path.display().to_string());

            let stats = if self.parallel {
                par_parse(&pipeline, path, &mut writer, &pbar)?
            } else {
                parse(&pipeline, path, &mut writer, &pbar)?
            };

            pbar.finish_and_clear();

            if !self.quiet {
                eprintln!(
                    "{}: {} normalized, {} skipped",
                    path.display(),
                    stats.records,
                    stats.skipped_records + stats.skipped_entries
                );
            }

            total += stats;
        }

        writer.flush()?;

        info!(
            "{} files: {} records normalized, {} records and {} entries \
                skipped",
            total.files,
            total.records,
            total.skipped_records,
            total.skipped_entries
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = anyhow::Result<()>;

    #[test]
    fn write_json_lines() -> TestResult {
        let catalog = LanguageCatalog::builtin();
        let pipeline = ParsingPipeline::new(ResourceType::Ris, catalog);
        let data = b"TY  - JOUR\nTI  - A\nPY  - 1994\nER  - \n\
            TY  - JOUR\nTI  - B\nPY  - 2001\nER  - \n";

        let mut out = vec![];
        for record in pipeline.records(&data[..], "x.ris")? {
            write_record(&mut out, &record)?;
        }

        let lines: Vec<HyperdataRecord> = out
            .split(|b| *b == b'\n')
            .filter(|line| !line.is_empty())
            .map(serde_json::from_slice)
            .collect::<Result<_, _>>()?;

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["title"], "A");
        assert_eq!(lines[1]["publication_date"], "2001-01-01 00:00:00");

        Ok(())
    }

    #[test]
    fn expand_missing_pattern() {
        let patterns = vec!["/nonexistent/**/*.ris".to_string()];
        assert!(expand(&patterns).is_err());
    }
}
