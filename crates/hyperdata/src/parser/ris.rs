use super::tagged::{is_tag, Dialect, Line, TaggedRecords};
use super::{decode, FormatParser, RawRecords};

fn split(line: &str) -> Line<'_> {
    let bytes = line.as_bytes();

    if is_tag(bytes) && bytes.len() >= 5 && &bytes[2..5] == b"  -" {
        return Line::Tag(&line[..2], line[5..].trim());
    }

    if line.trim().is_empty() {
        Line::Blank
    } else {
        Line::Continuation(line.trim())
    }
}

static RIS: Dialect = Dialect {
    name: "ris",
    split,
    end: "ER",
    fields: &[
        ("AU", "authors"),
        ("A1", "authors"),
        ("A2", "authors"),
        ("A3", "authors"),
        ("TI", "title"),
        ("T1", "title"),
        ("AB", "abstract"),
        ("N2", "abstract"),
        ("JO", "journal"),
        ("JF", "journal"),
        ("JA", "journal"),
        ("T2", "journal"),
        ("PY", "publication_date_to_parse"),
        ("Y1", "publication_date_to_parse"),
        ("DA", "publication_date_to_parse"),
        ("LA", "language_name"),
        ("DO", "doi"),
        ("KW", "keywords"),
        ("UR", "url"),
        ("VL", "volume"),
        ("IS", "issue"),
        ("SP", "pages"),
        ("EP", "pages"),
        ("PB", "publisher"),
    ],
    lists: &[("authors", ", "), ("keywords", "; "), ("pages", "-")],
};

/// Parser for RIS citation files (`TAG  - value` lines, `ER` closes a
/// record).
#[derive(Debug, Default, Clone, Copy)]
pub struct RisParser;

impl FormatParser for RisParser {
    fn parse(&self, data: Vec<u8>) -> RawRecords {
        Box::new(TaggedRecords::new(&RIS, decode(data)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = anyhow::Result<()>;

    const DATA: &str = "TY  - JOUR\r
AU  - Doe, Jane\r
AU  - Roe, Richard\r
TI  - Basal cell carcinoma\r
  of the skin\r
PY  - 2014///\r
LA  - eng\r
KW  - carcinoma\r
KW  - skin\r
SP  - 12\r
EP  - 19\r
XX  - unknown tag\r
ER  - \r
\r
TY  - JOUR\r
TI  - Second record\r
PY  - 2014/10/23/\r
ER  - \r
";

    #[test]
    fn split_lines() {
        assert_eq!(split("TI  - A title"), Line::Tag("TI", "A title"));
        assert_eq!(split("ER  -"), Line::Tag("ER", ""));
        assert_eq!(split("   more"), Line::Continuation("more"));
        assert_eq!(split(""), Line::Blank);
    }

    #[test]
    fn parse_records() -> TestResult {
        let records = RisParser
            .parse(DATA.as_bytes().to_vec())
            .collect::<Result<Vec<_>, _>>()?;

        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first["authors"], "Doe, Jane, Roe, Richard");
        assert_eq!(first["title"], "Basal cell carcinoma of the skin");
        assert_eq!(first["publication_date_to_parse"], "2014///");
        assert_eq!(first["language_name"], "eng");
        assert_eq!(first["keywords"], "carcinoma; skin");
        assert_eq!(first["pages"], "12-19");
        assert_eq!(first.len(), 6);

        let second = &records[1];
        assert_eq!(second["title"], "Second record");
        assert_eq!(second["publication_date_to_parse"], "2014/10/23/");

        Ok(())
    }

    #[test]
    fn parse_without_end_tag() -> TestResult {
        let data = b"TY  - BOOK\nTI  - Unterminated\n".to_vec();
        let records = RisParser
            .parse(data)
            .collect::<Result<Vec<_>, _>>()?;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["title"], "Unterminated");
        Ok(())
    }

    #[test]
    fn parse_empty_record() {
        let data = b"TY  - JOUR\nTI  - \nER  - \n".to_vec();
        let mut records = RisParser.parse(data);

        assert!(records.next().unwrap().is_err());
        assert!(records.next().is_none());
    }
}
