use std::collections::BTreeMap;
use std::io::Cursor;

use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use super::{strip_bom, FormatParser, RawRecords};
use crate::error::{HyperdataError, HyperdataResult};
use crate::record::{MultiValue, RawRecord};

/// How an occurrence of a subfield contributes to the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Occurrence {
    /// Ordered ahead of all secondary occurrences of the same key.
    Primary,
    /// Appended after the primary occurrences.
    Secondary,
    /// A single value; the last occurrence wins.
    Scalar,
}

const AUTHOR_SUBFIELDS: &[(&str, &str)] = &[
    ("a", "authors"),
    ("v", "authors_affiliations"),
    ("w", "authors_countries"),
    ("m", "authors_mails"),
];

/// Maps a datafield tag and subfield code to the record key.
fn field(tag: &str, code: &str) -> Option<(&'static str, Occurrence)> {
    use Occurrence::*;

    let author = || {
        AUTHOR_SUBFIELDS
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, key)| *key)
    };

    match (tag, code) {
        ("100", _) => author().map(|key| (key, Primary)),
        ("700", _) => author().map(|key| (key, Secondary)),
        ("773", "c") => Some(("pages", Scalar)),
        ("773", "n") => Some(("issue", Scalar)),
        ("773", "p") => Some(("journal", Scalar)),
        ("773", "v") => Some(("volume", Scalar)),
        ("773", "y") => Some(("publication_year", Scalar)),
        ("024", "a") => Some(("doi", Scalar)),
        ("041", "a") => Some(("language_iso3", Scalar)),
        ("245", "a") => Some(("title", Scalar)),
        ("520", "a") => Some(("abstract", Scalar)),
        ("260", "b") => Some(("publisher", Scalar)),
        ("260", "c") => Some(("publication_date_to_parse", Scalar)),
        ("856", "u") => Some(("pdf_source", Scalar)),
        _ => None,
    }
}

#[derive(Default)]
struct Builder {
    uid: Option<String>,
    scalars: BTreeMap<&'static str, String>,
    lists: BTreeMap<&'static str, MultiValue>,
}

impl Builder {
    fn push(&mut self, tag: &str, code: &str, value: String) {
        match field(tag, code) {
            Some((key, Occurrence::Primary)) => {
                self.lists.entry(key).or_default().push_primary(value)
            }
            Some((key, Occurrence::Secondary)) => {
                self.lists.entry(key).or_default().push(value)
            }
            Some((key, Occurrence::Scalar)) => {
                self.scalars.insert(key, value);
            }
            None => debug!("marc: ignore subfield {tag}${code}"),
        }
    }

    fn finish(self) -> HyperdataResult<RawRecord> {
        let mut record = RawRecord::new();

        if let Some(uid) = self.uid {
            record.set("uid", uid);
        }

        for (key, value) in self.scalars.into_iter() {
            record.set(key, value);
        }

        for (key, values) in self.lists.into_iter() {
            record.set(key, values.join(","));
        }

        if record.is_empty() {
            return Err(HyperdataError::parse("empty marc record"));
        }

        if !record.contains_key("language_iso3") {
            record.set("language_iso2", "en");
        }

        Ok(record)
    }
}

enum State {
    Outside,
    Record,
    Control(String),
    Datafield(String),
    Subfield(String, String),
}

/// Lazily reads `<record>` elements from a MARC21-XML document.
struct MarcRecords {
    reader: Reader<Cursor<Vec<u8>>>,
    buf: Vec<u8>,
    done: bool,
}

fn attribute(e: &BytesStart<'_>, name: &str) -> Option<String> {
    e.try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|attr| attr.unescape_value().ok())
        .map(|value| value.trim().to_string())
}

impl MarcRecords {
    fn read_record(&mut self) -> HyperdataResult<Option<RawRecord>> {
        let mut state = State::Outside;
        let mut builder = Builder::default();
        let mut text = String::new();

        loop {
            self.buf.clear();
            let event = self.reader.read_event_into(&mut self.buf)?;

            match event {
                Event::Start(ref e) => {
                    let name = e.local_name();
                    state = match (state, name.as_ref()) {
                        (_, b"record") => {
                            builder = Builder::default();
                            State::Record
                        }
                        (State::Record, b"controlfield") => {
                            text.clear();
                            State::Control(
                                attribute(e, "tag").unwrap_or_default(),
                            )
                        }
                        (State::Record, b"datafield") => State::Datafield(
                            attribute(e, "tag").unwrap_or_default(),
                        ),
                        (State::Datafield(tag), b"subfield") => {
                            text.clear();
                            let code =
                                attribute(e, "code").unwrap_or_default();
                            State::Subfield(tag, code)
                        }
                        (state, _) => state,
                    };
                }
                Event::Text(ref e) => {
                    if matches!(state, State::Control(_) | State::Subfield(..))
                    {
                        text.push_str(&e.unescape()?);
                    }
                }
                Event::CData(ref e) => {
                    if matches!(state, State::Control(_) | State::Subfield(..))
                    {
                        text.push_str(&String::from_utf8_lossy(e));
                    }
                }
                Event::End(ref e) => {
                    let name = e.local_name();
                    state = match (state, name.as_ref()) {
                        (State::Subfield(tag, code), b"subfield") => {
                            let value = text.trim();
                            if !value.is_empty() {
                                builder.push(&tag, &code, value.to_string());
                            }
                            State::Datafield(tag)
                        }
                        (State::Datafield(_), b"datafield") => State::Record,
                        (State::Control(tag), b"controlfield") => {
                            if tag == "001" {
                                builder.uid = Some(text.trim().to_string());
                            }
                            State::Record
                        }
                        (State::Record, b"record") => {
                            return builder.finish().map(Some);
                        }
                        (state, _) => state,
                    };
                }
                Event::Eof => return Ok(None),
                _ => {}
            }
        }
    }
}

impl Iterator for MarcRecords {
    type Item = HyperdataResult<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e @ HyperdataError::Parse(_)) => Some(Err(e)),
            Err(e) => {
                // The document can't be resynchronized after an xml
                // error.
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Parser for MARC21-XML collections (e.g. CERN document server
/// exports).
///
/// Main (`100`) and additional (`700`) author entries are merged into
/// the same comma separated fields, main entries first.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarcXmlParser;

impl FormatParser for MarcXmlParser {
    fn parse(&self, data: Vec<u8>) -> RawRecords {
        let reader = Reader::from_reader(Cursor::new(strip_bom(data)));

        Box::new(MarcRecords {
            reader,
            buf: Vec::new(),
            done: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = anyhow::Result<()>;

    const DATA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<collection xmlns="http://www.loc.gov/MARC21/slim">
  <record>
    <controlfield tag="001">2001234</controlfield>
    <datafield tag="700" ind1=" " ind2=" ">
      <subfield code="a">Second, B.</subfield>
      <subfield code="v">CERN</subfield>
    </datafield>
    <datafield tag="100" ind1=" " ind2=" ">
      <subfield code="a">Main, A.</subfield>
      <subfield code="v">DESY</subfield>
    </datafield>
    <datafield tag="700" ind1=" " ind2=" ">
      <subfield code="a">Third, C.</subfield>
    </datafield>
    <datafield tag="245" ind1=" " ind2=" ">
      <subfield code="a">Search for &lt;new&gt; physics</subfield>
    </datafield>
    <datafield tag="260" ind1=" " ind2=" ">
      <subfield code="c">2014-10-23</subfield>
    </datafield>
    <datafield tag="999" ind1=" " ind2=" ">
      <subfield code="z">ignored</subfield>
    </datafield>
  </record>
  <record>
    <controlfield tag="001">2005678</controlfield>
    <datafield tag="041" ind1=" " ind2=" ">
      <subfield code="a">fre</subfield>
    </datafield>
    <datafield tag="773" ind1=" " ind2=" ">
      <subfield code="p">Phys. Lett. B</subfield>
      <subfield code="y">1994</subfield>
    </datafield>
  </record>
</collection>
"#;

    #[test]
    fn parse_records() -> TestResult {
        let records = MarcXmlParser
            .parse(DATA.as_bytes().to_vec())
            .collect::<Result<Vec<_>, _>>()?;

        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first["uid"], "2001234");
        assert_eq!(first["authors"], "Main, A.,Second, B.,Third, C.");
        assert_eq!(first["authors_affiliations"], "DESY,CERN");
        assert_eq!(first["title"], "Search for <new> physics");
        assert_eq!(first["publication_date_to_parse"], "2014-10-23");
        assert_eq!(first["language_iso2"], "en");
        assert!(!first.contains_key("authors_mails"));

        let second = &records[1];
        assert_eq!(second["uid"], "2005678");
        assert_eq!(second["journal"], "Phys. Lett. B");
        assert_eq!(second["publication_year"], "1994");
        assert_eq!(second["language_iso3"], "fre");
        assert!(!second.contains_key("language_iso2"));
        assert!(!second.contains_key("authors"));

        Ok(())
    }

    #[test]
    fn parse_empty_collection() {
        let data = b"<collection></collection>".to_vec();
        assert_eq!(MarcXmlParser.parse(data).count(), 0);
    }

    #[test]
    fn parse_malformed_document() -> TestResult {
        let data = format!("{}</record></oops>", &DATA[..DATA.len() - 14]);
        let results: Vec<_> =
            MarcXmlParser.parse(data.into_bytes()).collect();

        assert!(results[0].is_ok());
        assert!(results.last().unwrap().is_err());
        Ok(())
    }
}
