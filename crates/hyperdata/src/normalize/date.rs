use std::collections::BTreeSet;
use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use log::{debug, warn};
use regex::Regex;

use crate::error::{HyperdataError, HyperdataResult};
use crate::record::RawRecord;

/// The canonical format of every `<prefix>_date` field.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const TO_PARSE: &str = "_date_to_parse";

const COMPONENTS: [(&str, &str); 5] = [
    ("month", " "),
    ("day", " "),
    ("hour", " "),
    ("minute", ":"),
    ("second", ":"),
];

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"//+\w*").unwrap())
}

fn iso_time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d)[Tt](\d)").unwrap())
}

fn utc_offset_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-]\d{2}:?\d{2}$").unwrap())
}

/// Removes repeated-slash placeholders (`2014///`, `2014/10//Spring`).
pub fn strip_placeholders(s: &str) -> String {
    placeholder_re().replace_all(s, "").trim().to_string()
}

fn month_number(token: &str) -> Option<u32> {
    match token {
        "jan" | "january" | "janv" | "janvier" => Some(1),
        "feb" | "february" | "fev" | "fév" | "fevrier" | "février" => {
            Some(2)
        }
        "mar" | "march" | "mars" => Some(3),
        "apr" | "april" | "avr" | "avril" => Some(4),
        "may" | "mai" => Some(5),
        "jun" | "june" | "juin" => Some(6),
        "jul" | "july" | "juil" | "juillet" => Some(7),
        "aug" | "august" | "aou" | "aoû" | "aout" | "août" => Some(8),
        "sep" | "sept" | "september" | "septembre" => Some(9),
        "oct" | "october" | "octobre" => Some(10),
        "nov" | "november" | "novembre" => Some(11),
        "dec" | "december" | "déc" | "decembre" | "décembre" => Some(12),
        _ => None,
    }
}

fn is_ignored_word(token: &str) -> bool {
    matches!(
        token,
        "mon"
            | "monday"
            | "tue"
            | "tuesday"
            | "wed"
            | "wednesday"
            | "thu"
            | "thursday"
            | "fri"
            | "friday"
            | "sat"
            | "saturday"
            | "sun"
            | "sunday"
            | "lundi"
            | "mardi"
            | "mercredi"
            | "jeudi"
            | "vendredi"
            | "samedi"
            | "dimanche"
            | "z"
            | "utc"
            | "gmt"
            | "of"
            | "the"
            | "le"
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Meridiem {
    Am,
    Pm,
}

#[derive(Debug, Default)]
struct Parts {
    numbers: Vec<(u32, usize)>,
    month: Option<u32>,
    time: Option<(u32, u32, u32)>,
    meridiem: Option<Meridiem>,
}

impl Parts {
    fn push_word(&mut self, word: &str) -> Option<()> {
        let word = word.trim_end_matches('.').to_lowercase();
        if word.is_empty() || is_ignored_word(&word) {
            return Some(());
        }

        let digits = word.chars().take_while(char::is_ascii_digit).count();
        if digits > 0 {
            let (number, suffix) = word.split_at(digits);
            if !matches!(suffix, "" | "st" | "nd" | "rd" | "th" | "er") {
                return None;
            }

            self.numbers.push((number.parse().ok()?, digits));
            return Some(());
        }

        match word.as_str() {
            "am" => self.meridiem = Some(Meridiem::Am),
            "pm" => self.meridiem = Some(Meridiem::Pm),
            _ => {
                let month = month_number(&word)?;
                if self.month.replace(month).is_some() {
                    return None;
                }
            }
        }

        Some(())
    }

    fn push_time(&mut self, chunk: &str) -> Option<()> {
        if self.time.is_some() {
            return None;
        }

        // drop a trailing offset (`+02:00`, `-0500`, `Z`)
        let chunk = chunk
            .split(['+', '-', 'Z', 'z'])
            .next()
            .unwrap_or_default()
            .to_lowercase();

        let (chunk, meridiem) = match chunk.strip_suffix("pm") {
            Some(rest) => (rest.to_string(), Some(Meridiem::Pm)),
            None => match chunk.strip_suffix("am") {
                Some(rest) => (rest.to_string(), Some(Meridiem::Am)),
                None => (chunk, None),
            },
        };

        if meridiem.is_some() {
            self.meridiem = meridiem;
        }

        let mut iter = chunk.split(':');
        let hour = iter.next()?.trim().parse().ok()?;
        let minute = iter.next()?.trim().parse().ok()?;
        let second = match iter.next() {
            Some(s) => s.split('.').next()?.trim().parse().ok()?,
            None => 0,
        };

        if iter.next().is_some() {
            return None;
        }

        self.time = Some((hour, minute, second));
        Some(())
    }

    fn resolve(mut self) -> Option<NaiveDateTime> {
        let is_year = |(value, digits): (u32, usize)| digits >= 3 || value > 31;

        let (year, month, day, rest) = if let Some(month) = self.month {
            let mut year = None;
            let mut day = None;
            let mut rest = vec![];

            for number in self.numbers.drain(..) {
                if year.is_none() && is_year(number) {
                    year = Some(number);
                } else if day.is_none() && number.0 <= 31 {
                    day = Some(number.0);
                } else if year.is_none() {
                    year = Some(number);
                } else {
                    rest.push(number.0);
                }
            }

            (year?, month, day.unwrap_or(1), rest)
        } else {
            // `10/23/14`: a two-digit year comes last
            let pos = self
                .numbers
                .iter()
                .position(|n| is_year(*n))
                .or_else(|| (self.numbers.len() == 3).then_some(2))?;
            let numbers: Vec<u32> =
                self.numbers.iter().map(|(value, _)| *value).collect();

            match pos {
                0 => (
                    self.numbers[0],
                    numbers.get(1).copied().unwrap_or(1),
                    numbers.get(2).copied().unwrap_or(1),
                    numbers.iter().skip(3).copied().collect::<Vec<_>>(),
                ),
                1 => (self.numbers[1], numbers[0], 1, numbers[2..].to_vec()),
                2 if numbers[0] > 12 => (
                    self.numbers[2],
                    numbers[1],
                    numbers[0],
                    numbers[3..].to_vec(),
                ),
                2 => (
                    self.numbers[2],
                    numbers[0],
                    numbers[1],
                    numbers[3..].to_vec(),
                ),
                _ => return None,
            }
        };

        let (hour, minute, second) = match (self.time, rest.as_slice()) {
            (Some(time), []) => time,
            (None, []) => (0, 0, 0),
            (None, [h]) => (*h, 0, 0),
            (None, [h, m]) => (*h, *m, 0),
            (None, [h, m, s]) => (*h, *m, *s),
            _ => return None,
        };

        let hour = match (self.meridiem, hour) {
            (Some(Meridiem::Pm), h) if h < 12 => h + 12,
            (Some(Meridiem::Am), 12) => 0,
            (_, h) => h,
        };

        let year = match year {
            (value, digits) if digits <= 2 && value < 50 => 2000 + value,
            (value, digits) if digits <= 2 => 1900 + value,
            (value, _) => value,
        };

        NaiveDate::from_ymd_opt(year as i32, month, day)?
            .and_hms_opt(hour, minute, second)
    }
}

/// Parses a free-text date.
///
/// Recognizes ISO dates and timestamps, slash or dot separated dates
/// (month first unless the first number exceeds 12, a trailing two-digit
/// year), English and French month names, `hh:mm[:ss]` times with an
/// optional AM/PM marker and UTC offset, and plain numeric sequences
/// (`1994 11 23 10:30:00`). Offsets are dropped, not applied. Missing
/// components
/// default to the first month, the first day and midnight. A year is
/// required and any unknown word makes the parse fail.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = iso_time_re().replace_all(s.trim(), "$1 $2");
    let mut parts = Parts::default();

    for chunk in s.split(|c: char| c.is_whitespace() || c == ',') {
        if chunk.is_empty() || chunk.starts_with('+') {
            continue;
        }

        if parts.time.is_some() && utc_offset_re().is_match(chunk) {
            continue;
        }

        if chunk.contains(':') {
            parts.push_time(chunk)?;
            continue;
        }

        for word in chunk.split(['-', '/', '.']) {
            parts.push_word(word)?;
        }
    }

    parts.resolve()
}

/// A single attempt to turn a date string into a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateStrategy {
    /// Parse the whole string.
    FullText,

    /// Parse only the first `n` characters (e.g. `1994 NOV` of
    /// `1994 NOV-DEC`).
    FirstChars(usize),
}

impl DateStrategy {
    pub fn apply(&self, s: &str) -> Option<NaiveDateTime> {
        match self {
            Self::FullText => parse_datetime(s),
            Self::FirstChars(n) => {
                parse_datetime(&s.chars().take(*n).collect::<String>())
            }
        }
    }
}

/// The strategies tried, in order, on a date assembled from its
/// components.
pub const ASSEMBLED_STRATEGIES: [DateStrategy; 3] = [
    DateStrategy::FullText,
    DateStrategy::FirstChars(8),
    DateStrategy::FirstChars(4),
];

/// Tries the strategies in order; the first success wins.
pub fn resolve_date(
    field: &str,
    s: &str,
    strategies: &[DateStrategy],
) -> HyperdataResult<NaiveDateTime> {
    for strategy in strategies {
        match strategy.apply(s) {
            Some(datetime) => return Ok(datetime),
            None => debug!("{field}: {strategy:?} failed on '{s}'"),
        }
    }

    Err(HyperdataError::Normalize {
        field: field.into(),
        reason: format!("unable to parse date '{s}'"),
    })
}

/// Builds the date string of a prefix from its components. A component
/// is only appended if the previous one is present.
fn assemble(record: &RawRecord, prefix: &str) -> Option<String> {
    let mut date = record.get(&format!("{prefix}_year"))?.clone();

    for (name, sep) in COMPONENTS {
        match record.get(&format!("{prefix}_{name}")) {
            Some(value) => {
                date.push_str(sep);
                date.push_str(value);
            }
            None => break,
        }
    }

    Some(date)
}

#[inline]
fn to_date_string(datetime: &NaiveDateTime) -> String {
    datetime.format(DATE_FORMAT).to_string()
}

fn set_components(record: &mut RawRecord, prefix: &str, dt: &NaiveDateTime) {
    let components = [
        ("year", format!("{:04}", dt.year())),
        ("month", format!("{:02}", dt.month())),
        ("day", format!("{:02}", dt.day())),
        ("hour", format!("{:02}", dt.hour())),
        ("minute", format!("{:02}", dt.minute())),
        ("second", format!("{:02}", dt.second())),
    ];

    for (name, value) in components {
        record.insert(format!("{prefix}_{name}"), value);
    }
}

/// Resolves and expands the date fields of a record.
///
/// For every prefix with a `<prefix>_date_to_parse` or `<prefix>_year`
/// field, `<prefix>_date` is resolved (the free-text date first, then
/// the assembled components). A record without any of these gets the
/// current time as `publication_date`. Finally every `<prefix>_date`
/// field is expanded into its six components; a date which can't be
/// parsed is replaced by the current time.
pub(crate) fn format_hyperdata_dates(
    record: &mut RawRecord,
    now: NaiveDateTime,
) {
    let prefixes: BTreeSet<String> = record
        .keys()
        .filter_map(|key| {
            key.strip_suffix(TO_PARSE)
                .or_else(|| key.strip_suffix("_year"))
        })
        .map(ToString::to_string)
        .collect();

    if prefixes.is_empty() {
        warn!("date unknown, using {now}");
        record.insert("publication_date".into(), to_date_string(&now));
    }

    for prefix in prefixes.iter() {
        let field = format!("{prefix}_date");

        if let Some(value) = record.get(&format!("{prefix}{TO_PARSE}")) {
            let value = strip_placeholders(value);
            let datetime = match parse_datetime(&value) {
                Some(datetime) => datetime,
                None => {
                    warn!("{field}: unable to parse '{value}', using {now}");
                    now
                }
            };

            record.insert(field, to_date_string(&datetime));
        } else if let Some(value) = assemble(record, prefix) {
            match resolve_date(&field, &value, &ASSEMBLED_STRATEGIES) {
                Ok(datetime) => {
                    record.insert(field, to_date_string(&datetime));
                }
                Err(e) => warn!("{e}"),
            }
        }
    }

    let dates: Vec<(String, String)> = record
        .iter()
        .filter_map(|(key, value)| {
            key.strip_suffix("_date")
                .map(|prefix| (prefix.to_string(), value.clone()))
        })
        .collect();

    for (prefix, value) in dates.into_iter() {
        let datetime = NaiveDateTime::parse_from_str(&value, DATE_FORMAT)
            .ok()
            .or_else(|| parse_datetime(&value))
            .or_else(|| parse_datetime(&strip_placeholders(&value)))
            .unwrap_or_else(|| {
                warn!("{prefix}_date: unable to parse '{value}', using {now}");
                now
            });

        record.insert(format!("{prefix}_date"), to_date_string(&datetime));
        set_components(record, &prefix, &datetime);
    }
}
