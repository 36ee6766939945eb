//! C-value termhood scoring.
//!
//! A term `t1` is *included* in a different term `t2` if every word of
//! `t1` occurs in `t2`. The score of a term with `n` words and
//! frequency `f` is `log2(n) * f` if no other term includes it, and
//! `log2(n) * (f - mean)` otherwise, where `mean` is the average
//! frequency of the including terms.

use std::collections::{BTreeMap, HashSet};
use std::io::Read;
use std::path::Path;

use hashbrown::HashMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::HyperdataResult;

/// The aggregate frequency of a term within one corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyEntry {
    pub term_id: u64,
    pub term: String,
    pub frequency: f64,

    /// A prior score (e.g. a global tf-idf), used to select the terms
    /// to be scored.
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTerm {
    pub corpus_id: u64,
    pub term_id: u64,
    pub term: String,
    pub score: f64,
}

#[derive(Debug, Deserialize)]
struct Row {
    id: u64,
    term: String,
    frequency: f64,
    score: Option<f64>,
}

fn normalize_term(term: &str) -> String {
    term.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Term frequencies of one corpus.
#[derive(Debug, Default, Clone)]
pub struct NgramFrequencyIndex {
    entries: Vec<FrequencyEntry>,
    positions: HashMap<String, usize>,
}

impl NgramFrequencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a CSV table with the columns `id`, `term`, `frequency` and
    /// an optional `score`. Repeated terms are accumulated.
    pub fn from_reader<R: Read>(reader: R) -> HyperdataResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut index = Self::new();
        for result in reader.deserialize() {
            let row: Row = result?;
            index.add(row.id, &row.term, row.frequency);
            if let Some(score) = row.score {
                index.set_score(&row.term, score);
            }
        }

        Ok(index)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> HyperdataResult<Self> {
        Self::from_reader(std::fs::File::open(path)?)
    }

    /// Adds the weight of one occurrence (or one document) of a term.
    /// Blank terms are ignored. A term keeps the id it was first added
    /// with.
    pub fn add(&mut self, term_id: u64, term: &str, weight: f64) {
        let term = normalize_term(term);
        if term.is_empty() {
            return;
        }

        match self.positions.get(&term) {
            Some(idx) => self.entries[*idx].frequency += weight,
            None => {
                self.positions.insert(term.clone(), self.entries.len());
                self.entries.push(FrequencyEntry {
                    term_id,
                    term,
                    frequency: weight,
                    score: None,
                });
            }
        }
    }

    /// Sets the prior score of a term. Returns `false` if the term is
    /// unknown.
    pub fn set_score(&mut self, term: &str, score: f64) -> bool {
        let term = normalize_term(term);
        match self.positions.get(&term) {
            Some(idx) => {
                self.entries[*idx].score = Some(score);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, term: &str) -> Option<&FrequencyEntry> {
        self.positions
            .get(&normalize_term(term))
            .map(|idx| &self.entries[*idx])
    }

    /// Keeps the `limit` terms with the highest prior score. Terms
    /// without a score rank last; ties are broken by the term text.
    pub fn top(&self, limit: usize) -> Self {
        let mut entries = self.entries.clone();
        entries.sort_by(|a, b| {
            let a_score = a.score.unwrap_or(f64::NEG_INFINITY);
            let b_score = b.score.unwrap_or(f64::NEG_INFINITY);

            b_score.total_cmp(&a_score).then_with(|| a.term.cmp(&b.term))
        });

        entries.truncate(limit);
        Self::from_iter(entries)
    }

    #[inline]
    pub fn entries(&self) -> &[FrequencyEntry] {
        &self.entries
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

impl FromIterator<FrequencyEntry> for NgramFrequencyIndex {
    fn from_iter<I: IntoIterator<Item = FrequencyEntry>>(iter: I) -> Self {
        let mut index = Self::new();
        for entry in iter {
            index.add(entry.term_id, &entry.term, entry.frequency);
            if let Some(score) = entry.score {
                index.set_score(&entry.term, score);
            }
        }

        index
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CValueScorer;

impl CValueScorer {
    pub fn new() -> Self {
        Self
    }

    /// Scores every term of the index.
    ///
    /// The word sets of all terms are computed once and shared by the
    /// workers, each of which scores one term against all others.
    pub fn score(
        &self,
        corpus_id: u64,
        index: &NgramFrequencyIndex,
    ) -> Vec<ScoredTerm> {
        let entries = index.entries();
        let words: Vec<HashSet<&str>> = entries
            .iter()
            .map(|entry| entry.term.split_whitespace().collect())
            .collect();

        entries
            .par_iter()
            .enumerate()
            .map(|(i, entry)| {
                let (sum, count) = words
                    .iter()
                    .enumerate()
                    .filter(|(j, other)| *j != i && words[i].is_subset(other))
                    .fold((0.0, 0usize), |(sum, count), (j, _)| {
                        (sum + entries[j].frequency, count + 1)
                    });

                let n = entry.term.split_whitespace().count();
                let score = if n == 1 {
                    // log2(1) = 0
                    0.0
                } else if count == 0 {
                    (n as f64).log2() * entry.frequency
                } else {
                    (n as f64).log2() * (entry.frequency - sum / count as f64)
                };

                ScoredTerm {
                    corpus_id,
                    term_id: entry.term_id,
                    term: entry.term.clone(),
                    score,
                }
            })
            .collect()
    }

    /// Scores independent corpora in parallel.
    pub fn score_corpora(
        &self,
        corpora: &[(u64, NgramFrequencyIndex)],
    ) -> Vec<(u64, Vec<ScoredTerm>)> {
        corpora
            .par_iter()
            .map(|(corpus_id, index)| {
                (*corpus_id, self.score(*corpus_id, index))
            })
            .collect()
    }
}

/// Stored scores, keyed by corpus and term text.
#[derive(Debug, Default)]
pub struct ScoreTable {
    rows: BTreeMap<(u64, String), ScoredTerm>,
}

impl ScoreTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all scores of a corpus. Returns the number of stored
    /// rows of that corpus.
    pub fn replace<I>(&mut self, corpus_id: u64, scores: I) -> usize
    where
        I: IntoIterator<Item = ScoredTerm>,
    {
        self.rows.retain(|(corpus, _), _| *corpus != corpus_id);

        for scored in scores {
            if scored.corpus_id == corpus_id {
                self.rows.insert((corpus_id, scored.term.clone()), scored);
            }
        }

        self.corpus(corpus_id).count()
    }

    pub fn corpus(&self, corpus_id: u64) -> impl Iterator<Item = &ScoredTerm> {
        self.rows
            .range((corpus_id, String::new())..)
            .take_while(move |((corpus, _), _)| *corpus == corpus_id)
            .map(|(_, scored)| scored)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoredTerm> {
        self.rows.values()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    type TestResult = anyhow::Result<()>;

    fn carcinoma() -> NgramFrequencyIndex {
        let mut index = NgramFrequencyIndex::new();
        index.add(1, "basal cell carcinoma", 984.0);
        index.add(2, "cystic basal cell carcinoma", 11.0);
        index.add(3, "recurrent basal cell carcinoma", 5.0);
        index.add(4, "carcinoma", 1200.0);
        index
    }

    fn score_of(scores: &[ScoredTerm], term: &str) -> f64 {
        scores.iter().find(|s| s.term == term).unwrap().score
    }

    #[test]
    fn index_add() {
        let mut index = NgramFrequencyIndex::new();
        index.add(1, "basal  cell", 2.0);
        index.add(1, " basal cell ", 0.5);
        index.add(2, "   ", 1.0);

        assert_eq!(index.len(), 1);
        assert_eq!(index.get("basal cell").unwrap().frequency, 2.5);
        assert_eq!(index.get(" basal\tcell").unwrap().frequency, 2.5);
        assert_eq!(index.get("basal  cell").unwrap().term_id, 1);
        assert!(index.set_score("basal cell", 0.3));
        assert!(!index.set_score("cell", 0.3));
    }

    #[test]
    fn index_top() {
        let mut index = carcinoma();
        index.set_score("carcinoma", 0.9);
        index.set_score("basal cell carcinoma", 0.5);
        index.set_score("cystic basal cell carcinoma", 0.5);

        let top = index.top(2);
        let terms: Vec<_> = top.entries().iter().map(|e| e.term.as_str()).collect();
        assert_eq!(terms, vec!["carcinoma", "basal cell carcinoma"]);

        assert_eq!(index.top(10).len(), 4);
        assert!(index.top(0).is_empty());
    }

    #[test]
    fn index_from_reader() -> TestResult {
        let data = "id,term,frequency,score\n\
            1,basal cell carcinoma,984,0.5\n\
            2,cystic basal cell carcinoma,11,\n\
            1,basal cell carcinoma,16,\n";

        let index = NgramFrequencyIndex::from_reader(data.as_bytes())?;
        assert_eq!(index.len(), 2);

        let entry = index.get("basal cell carcinoma").unwrap();
        assert_eq!(entry.frequency, 1000.0);
        assert_eq!(entry.score, Some(0.5));
        assert_eq!(index.get("cystic basal cell carcinoma").unwrap().score, None);

        let data = "id,term,frequency\n1,cell,x\n";
        assert!(NgramFrequencyIndex::from_reader(data.as_bytes()).is_err());
        Ok(())
    }

    #[test]
    fn cvalue_nested_term() {
        let scores = CValueScorer::new().score(7, &carcinoma());
        assert_eq!(scores.len(), 4);
        assert!(scores.iter().all(|s| s.corpus_id == 7));

        assert_relative_eq!(
            score_of(&scores, "basal cell carcinoma"),
            3f64.log2() * (984.0 - (11.0 + 5.0) / 2.0)
        );
        assert_relative_eq!(
            score_of(&scores, "cystic basal cell carcinoma"),
            4f64.log2() * 11.0
        );
        assert_relative_eq!(
            score_of(&scores, "recurrent basal cell carcinoma"),
            2.0 * 5.0
        );
    }

    #[test]
    fn cvalue_single_word_is_zero() {
        let scores = CValueScorer::new().score(1, &carcinoma());
        assert_eq!(score_of(&scores, "carcinoma"), 0.0);

        let mut index = NgramFrequencyIndex::new();
        index.add(1, "cell", 3.0);
        let scores = CValueScorer::new().score(1, &index);
        assert_eq!(scores[0].score, 0.0);
    }

    #[test]
    fn cvalue_word_set_inclusion() {
        let mut index = NgramFrequencyIndex::new();
        index.add(1, "cell carcinoma", 10.0);
        index.add(2, "carcinoma of the basal cell", 4.0);
        index.add(3, "cell cell", 2.0);

        let scores = CValueScorer::new().score(1, &index);

        // both words occur in term 2, although not contiguously
        assert_relative_eq!(score_of(&scores, "cell carcinoma"), 10.0 - 4.0);
        assert_relative_eq!(
            score_of(&scores, "cell cell"),
            2.0 - (10.0 + 4.0) / 2.0
        );
    }

    #[test]
    fn score_corpora() {
        let mut other = NgramFrequencyIndex::new();
        other.add(9, "squamous cell", 2.0);

        let corpora = vec![(1, carcinoma()), (2, other)];
        let result = CValueScorer::new().score_corpora(&corpora);

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].0, 1);
        assert_eq!(result[0].1.len(), 4);
        assert_eq!(result[1].0, 2);
        assert_relative_eq!(result[1].1[0].score, 2.0);
    }

    #[test]
    fn score_table_replace_is_idempotent() {
        let scorer = CValueScorer::new();
        let index = carcinoma();
        let mut table = ScoreTable::new();

        assert_eq!(table.replace(1, scorer.score(1, &index)), 4);
        assert_eq!(table.replace(2, scorer.score(2, &index)), 4);
        let before: Vec<_> = table.iter().cloned().collect();

        assert_eq!(table.replace(1, scorer.score(1, &index)), 4);
        assert_eq!(table.len(), 8);
        assert_eq!(table.iter().cloned().collect::<Vec<_>>(), before);

        assert_eq!(table.replace(1, vec![]), 0);
        assert_eq!(table.len(), 4);
        assert_eq!(table.corpus(2).count(), 4);
    }

    #[test]
    fn score_table_keeps_terms_sharing_an_id() {
        let mut index = NgramFrequencyIndex::new();
        index.add(3, "basal cell", 4.0);
        index.add(3, "squamous cell", 2.0);

        let mut table = ScoreTable::new();
        let count = table.replace(1, CValueScorer::new().score(1, &index));
        assert_eq!(count, 2);

        let terms: Vec<_> = table.corpus(1).map(|s| s.term.as_str()).collect();
        assert_eq!(terms, vec!["basal cell", "squamous cell"]);
        assert!(table.corpus(1).all(|s| s.term_id == 3));
        assert_eq!(table.corpus(2).count(), 0);
    }
}
