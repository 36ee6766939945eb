use super::tagged::{is_tag, Dialect, Line, TaggedRecords};
use super::{decode, FormatParser, RawRecords};

fn split(line: &str) -> Line<'_> {
    let bytes = line.as_bytes();

    if line.trim().is_empty() {
        Line::Blank
    } else if bytes.starts_with(b"   ") {
        Line::Continuation(line.trim())
    } else if is_tag(bytes) && (bytes.len() == 2 || bytes[2] == b' ') {
        Line::Tag(&line[..2], line[2..].trim())
    } else {
        Line::Malformed
    }
}

static ISI: Dialect = Dialect {
    name: "isi",
    split,
    end: "ER",
    fields: &[
        ("AU", "authors"),
        ("TI", "title"),
        ("SO", "journal"),
        ("AB", "abstract"),
        ("PY", "publication_year"),
        ("PD", "publication_month"),
        ("LA", "language_name"),
        ("DI", "doi"),
        ("DE", "keywords"),
        ("C1", "authors_affiliations"),
        ("UT", "uid"),
        ("VL", "volume"),
        ("IS", "issue"),
        ("BP", "pages"),
        ("EP", "pages"),
        ("PU", "publisher"),
    ],
    lists: &[
        ("authors", ", "),
        ("authors_affiliations", "; "),
        ("keywords", "; "),
        ("pages", "-"),
    ],
};

/// Parser for Web of Science (ISI) tagged exports.
#[derive(Debug, Default, Clone, Copy)]
pub struct IsiParser;

impl FormatParser for IsiParser {
    fn parse(&self, data: Vec<u8>) -> RawRecords {
        Box::new(TaggedRecords::new(&ISI, decode(data)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = anyhow::Result<()>;

    const DATA: &str = "\u{feff}FN Thomson Reuters Web of Science
VR 1.0
PT J
AU Smith, J
   Doe, A
TI Cystic basal cell carcinoma: a
   clinical study
SO JOURNAL OF DERMATOLOGY
LA English
DE carcinoma; skin
PD NOV-DEC
PY 1994
UT WOS:000001
ZZ unknown
ER

PT J
TI Second
PY 2001
ER

EF
";

    #[test]
    fn split_lines() {
        assert_eq!(split("PY 1994"), Line::Tag("PY", "1994"));
        assert_eq!(split("ER"), Line::Tag("ER", ""));
        assert_eq!(split("   Doe, A"), Line::Continuation("Doe, A"));
        assert_eq!(split("garbage line"), Line::Malformed);
        assert_eq!(split(" "), Line::Blank);
    }

    #[test]
    fn parse_records() -> TestResult {
        let records = IsiParser
            .parse(DATA.as_bytes().to_vec())
            .collect::<Result<Vec<_>, _>>()?;

        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first["authors"], "Smith, J, Doe, A");
        assert_eq!(
            first["title"],
            "Cystic basal cell carcinoma: a clinical study"
        );
        assert_eq!(first["journal"], "JOURNAL OF DERMATOLOGY");
        assert_eq!(first["language_name"], "English");
        assert_eq!(first["keywords"], "carcinoma; skin");
        assert_eq!(first["publication_month"], "NOV-DEC");
        assert_eq!(first["publication_year"], "1994");
        assert_eq!(first["uid"], "WOS:000001");

        assert_eq!(records[1]["title"], "Second");
        assert_eq!(records[1]["publication_year"], "2001");

        Ok(())
    }
}
