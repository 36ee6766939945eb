use std::fmt::{self, Display};
use std::str::FromStr;

use bstr::ByteSlice;
use serde::{Deserialize, Serialize};

pub use self::delimited::CsvParser;
pub use self::isi::IsiParser;
pub use self::marc::MarcXmlParser;
pub use self::ris::RisParser;
use crate::error::{bail, HyperdataError, HyperdataResult};
use crate::record::RawRecord;

mod delimited;
mod isi;
mod marc;
mod ris;
mod tagged;

/// The records extracted from one file.
///
/// An `Err` item is a record that couldn't be extracted; the remaining
/// records are still produced.
pub type RawRecords =
    Box<dyn Iterator<Item = HyperdataResult<RawRecord>> + Send>;

/// Extracts raw records from the bytes of one (non-container) file.
pub trait FormatParser: Send + Sync {
    fn parse(&self, data: Vec<u8>) -> RawRecords;
}

/// The declared source format of an input file.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// MARC21-XML bibliographic records.
    Marc,
    /// RIS tagged citations.
    #[default]
    Ris,
    /// Web of Science (ISI) tagged export.
    Isi,
    /// Delimited (CSV/TSV) press export.
    Csv,
}

impl ResourceType {
    /// Returns the parser for this resource type.
    pub fn parser(&self) -> Box<dyn FormatParser> {
        match self {
            Self::Marc => Box::new(MarcXmlParser),
            Self::Ris => Box::new(RisParser),
            Self::Isi => Box::new(IsiParser),
            Self::Csv => Box::new(CsvParser),
        }
    }
}

impl Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Marc => write!(f, "marc"),
            Self::Ris => write!(f, "ris"),
            Self::Isi => write!(f, "isi"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

impl FromStr for ResourceType {
    type Err = HyperdataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "marc" | "marcxml" | "cern" => Ok(Self::Marc),
            "ris" | "zotero" => Ok(Self::Ris),
            "isi" | "wos" => Ok(Self::Isi),
            "csv" | "tsv" | "europress" => Ok(Self::Csv),
            _ => bail!("invalid resource type '{s}'"),
        }
    }
}

/// Removes a leading UTF-8 byte order mark.
pub(crate) fn strip_bom(mut data: Vec<u8>) -> Vec<u8> {
    if data.starts_with(b"\xef\xbb\xbf") {
        data.drain(..3);
    }

    data
}

/// Decodes the bytes of a text file; invalid sequences are replaced.
pub(crate) fn decode(data: Vec<u8>) -> String {
    let data = strip_bom(data);
    match String::from_utf8(data) {
        Ok(s) => s,
        Err(e) => e.as_bytes().to_str_lossy().into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_type_from_str() {
        use ResourceType::*;

        assert_eq!(ResourceType::from_str("marc").unwrap(), Marc);
        assert_eq!(ResourceType::from_str("cern").unwrap(), Marc);
        assert_eq!(ResourceType::from_str("RIS").unwrap(), Ris);
        assert_eq!(ResourceType::from_str("wos").unwrap(), Isi);
        assert_eq!(ResourceType::from_str("europress").unwrap(), Csv);

        assert!(ResourceType::from_str("pdf").is_err());
    }

    #[test]
    fn resource_type_to_string() {
        use ResourceType::*;

        assert_eq!(Marc.to_string(), "marc");
        assert_eq!(Ris.to_string(), "ris");
        assert_eq!(Isi.to_string(), "isi");
        assert_eq!(Csv.to_string(), "csv");
    }

    #[test]
    fn decode_lossy() {
        assert_eq!(decode(b"\xef\xbb\xbfabc".to_vec()), "abc");
        assert_eq!(decode(b"a\xffb".to_vec()), "a\u{FFFD}b");
    }
}
