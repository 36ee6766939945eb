use std::fs::File;
use std::io::{stdout, Write};
use std::path::PathBuf;

use clap::Parser;
use hyperdata::{CValueScorer, NgramFrequencyIndex, ScoreTable, ScoredTerm};
use log::info;

use crate::prelude::*;

const PBAR_SCORE: &str =
    "Scoring: {spinner} {msg} | elapsed: {elapsed_precise}";

/// Compute the C-value of the terms of a corpus.
///
/// The input is a CSV frequency table with the columns `id`, `term`,
/// `frequency` and an optional prior `score`. The output contains the
/// columns `corpus`, `term_id`, `term` and `score`, ordered by
/// descending score.
#[derive(Debug, Parser)]
pub(crate) struct Cvalue {
    /// Run verbosely. Print additional progress information to the
    /// standard error stream. This option conflicts with the
    /// `--quiet` option.
    #[arg(short, long, conflicts_with = "quiet")]
    pub(crate) verbose: bool,

    /// Operate quietly; do not show progress. This option conflicts
    /// with the `--verbose` option.
    #[arg(short, long, conflicts_with = "verbose")]
    pub(crate) quiet: bool,

    /// The identifier of the corpus.
    #[arg(long, default_value = "0")]
    corpus: u64,

    /// Score only the NUM terms with the highest prior score.
    #[arg(short, long, value_name = "NUM")]
    limit: Option<usize>,

    /// Write the scores into `filename`. By default output will be
    /// written in CSV format to the standard output (`stdout`).
    #[arg(short, long, value_name = "filename")]
    output: Option<PathBuf>,

    /// The frequency table.
    path: PathBuf,
}

fn sorted(table: &ScoreTable, corpus: u64) -> Vec<&ScoredTerm> {
    let mut scores: Vec<_> = table.corpus(corpus).collect();
    scores.sort_by(|a, b| {
        b.score.total_cmp(&a.score).then_with(|| a.term.cmp(&b.term))
    });
    scores
}

impl Cvalue {
    pub(crate) fn execute(self) -> CorpusResult<()> {
        let mut index = NgramFrequencyIndex::from_path(&self.path)?;
        if let Some(limit) = self.limit {
            index = index.top(limit);
        }

        if index.is_empty() {
            bail!("no terms in '{}'", self.path.display());
        }

        let pbar = ProgressBarBuilder::new(PBAR_SCORE, self.quiet).build();
        pbar.set_message(format!("{} terms", index.len()));

        let scores = CValueScorer::new().score(self.corpus, &index);
        let mut table = ScoreTable::new();
        let count = table.replace(self.corpus, scores);
        pbar.finish_and_clear();

        info!("scored {count} terms of corpus {}", self.corpus);

        let output: Box<dyn Write> = match self.output {
            Some(ref path) => Box::new(File::create(path)?),
            None => Box::new(stdout().lock()),
        };

        let mut writer = csv::Writer::from_writer(output);
        writer.write_record(["corpus", "term_id", "term", "score"])?;

        for scored in sorted(&table, self.corpus) {
            writer.write_record([
                scored.corpus_id.to_string(),
                scored.term_id.to_string(),
                scored.term.clone(),
                scored.score.to_string(),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_by_score() {
        let mut table = ScoreTable::new();
        let mut index = NgramFrequencyIndex::new();
        index.add(1, "basal cell carcinoma", 984.0);
        index.add(2, "cystic basal cell carcinoma", 11.0);
        index.add(3, "carcinoma", 1200.0);
        index.add(4, "cell", 10.0);

        table.replace(5, CValueScorer::new().score(5, &index));
        let terms: Vec<_> = sorted(&table, 5)
            .into_iter()
            .map(|scored| scored.term.as_str())
            .collect();

        assert_eq!(
            terms,
            vec![
                "basal cell carcinoma",
                "cystic basal cell carcinoma",
                "carcinoma",
                "cell"
            ]
        );
    }
}
