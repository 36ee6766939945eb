use std::io::Cursor;

use bstr::ByteSlice;
use csv::{ByteRecord, ReaderBuilder};

use super::{strip_bom, FormatParser, RawRecords};
use crate::error::{HyperdataError, HyperdataResult};
use crate::record::RawRecord;

/// Guesses the field delimiter from the header line.
fn sniff_delimiter(data: &[u8]) -> u8 {
    let header = data.lines().next().unwrap_or_default();

    [b'\t', b';', b',']
        .into_iter()
        .map(|d| (d, header.iter().filter(|b| **b == d).count()))
        .filter(|(_, count)| *count > 0)
        .fold(None, |best: Option<(u8, usize)>, (d, count)| match best {
            Some((_, max)) if max >= count => best,
            _ => Some((d, count)),
        })
        .map(|(d, _)| d)
        .unwrap_or(b',')
}

/// Maps a column header to its record key.
fn canonical(header: &str) -> String {
    let name = header
        .trim()
        .to_lowercase()
        .replace(|c: char| c.is_whitespace() || c == '-', "_");

    match name.as_str() {
        "title" | "titre" => "title".into(),
        "author" | "authors" | "auteur" | "auteurs" => "authors".into(),
        "source" | "journal" | "journal_title" => "journal".into(),
        "date" | "publication_date" => "publication_date_to_parse".into(),
        "year" | "annee" | "publication_year" => "publication_year".into(),
        "abstract" | "text" | "texte" | "resume" => "abstract".into(),
        "language" | "langue" | "lang" => "language_name".into(),
        "doi" => "doi".into(),
        "url" | "link" | "lien" => "url".into(),
        _ => name,
    }
}

fn to_record(headers: &[String], row: &ByteRecord) -> RawRecord {
    let mut record = RawRecord::new();

    for (key, value) in headers.iter().zip(row.iter()) {
        if !key.is_empty() && !record.contains_key(key) {
            record.set(key.as_str(), value.to_str_lossy());
        }
    }

    record
}

/// Parser for delimited press exports with a header row.
///
/// The delimiter (tab, semicolon or comma) is detected from the header.
/// A row whose length differs from the header is skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvParser;

impl FormatParser for CsvParser {
    fn parse(&self, data: Vec<u8>) -> RawRecords {
        let data = strip_bom(data);
        let mut reader = ReaderBuilder::new()
            .delimiter(sniff_delimiter(&data))
            .has_headers(true)
            .from_reader(Cursor::new(data));

        let headers: Vec<String> = match reader.byte_headers() {
            Ok(headers) => headers
                .iter()
                .map(|h| canonical(&h.to_str_lossy()))
                .collect(),
            Err(e) => {
                return Box::new(std::iter::once(Err(e.into())));
            }
        };

        Box::new(reader.into_byte_records().map(
            move |result| -> HyperdataResult<RawRecord> {
                let row = result.map_err(|e| {
                    HyperdataError::parse(format!("csv: {e}"))
                })?;

                let record = to_record(&headers, &row);
                if record.is_empty() {
                    return Err(HyperdataError::parse("csv: empty row"));
                }

                Ok(record)
            },
        ))
    }
}
