//! Statement format configuration
//!
//! Describes how a statement's extracted text is laid out: which lines are
//! transaction lines, how their fields are captured, how dates and amounts
//! are written, and which type token marks a transfer.
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a two-layer resolution:
//! 1. An explicit path, or the override in the data dir
//!    (~/.local/share/tally/config/statement.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Keys missing from an override keep their default values.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/statement.toml");

/// Capture groups the line pattern must define
pub const REQUIRED_GROUPS: [&str; 4] = ["date", "amount", "token", "details"];

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Embedded,
    File(PathBuf),
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Embedded => write!(f, "built-in defaults"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// `DD<sep>MM<sep>YY` dates with an explicit century pivot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateLayout {
    pub separator: char,
    /// Two-digit years below the pivot map to 20YY, the rest to 19YY
    pub century_pivot: u8,
}

impl DateLayout {
    /// Parse a printed statement date, `None` if it is not a real calendar date
    pub fn parse(&self, raw: &str) -> Option<NaiveDate> {
        let mut parts = raw.trim().split(self.separator);
        let day = two_digits(parts.next()?)?;
        let month = two_digits(parts.next()?)?;
        let yy = two_digits(parts.next()?)?;
        if parts.next().is_some() {
            return None;
        }

        NaiveDate::from_ymd_opt(self.resolve_year(yy), month, day)
    }

    /// Map a two-digit year onto a full year using the pivot
    pub fn resolve_year(&self, yy: u32) -> i32 {
        let yy = yy as i32;
        if yy < self.century_pivot as i32 {
            2000 + yy
        } else {
            1900 + yy
        }
    }
}

fn two_digits(s: &str) -> Option<u32> {
    if s.len() != 2 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// The single number-formatting convention statements are written in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmountFormat {
    /// Stripped before parsing; a space also stands for any other whitespace
    pub grouping_separators: Vec<char>,
    /// Decimal point when followed by exactly `decimal_places` trailing digits
    pub decimal_mark: Option<char>,
    pub decimal_places: usize,
}

impl AmountFormat {
    /// Normalize a printed amount into a signed number
    ///
    /// `"1 250,00"` → 1250.0, `"-45,90"` → -45.9, `"1,234"` → 1234.0 under the
    /// default convention.
    pub fn parse(&self, raw: &str) -> Option<f64> {
        let raw = raw.trim();
        let (whole, fraction) = self.split_decimal(raw);

        let mut cleaned: String = whole.chars().filter(|c| !self.is_grouping(*c)).collect();
        if let Some(fraction) = fraction {
            cleaned.push('.');
            cleaned.push_str(fraction);
        }

        cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
    }

    fn split_decimal<'a>(&self, raw: &'a str) -> (&'a str, Option<&'a str>) {
        let Some(mark) = self.decimal_mark else {
            return (raw, None);
        };
        if let Some(idx) = raw.rfind(mark) {
            let fraction = &raw[idx + mark.len_utf8()..];
            if fraction.len() == self.decimal_places
                && fraction.bytes().all(|b| b.is_ascii_digit())
            {
                return (&raw[..idx], Some(fraction));
            }
        }
        (raw, None)
    }

    fn is_grouping(&self, c: char) -> bool {
        self.grouping_separators.contains(&c)
            || (c.is_whitespace() && self.grouping_separators.contains(&' '))
    }
}

/// Compiled, validated statement format
#[derive(Debug, Clone)]
pub struct StatementFormat {
    pub transfer_marker: String,
    pub line_prefix: Regex,
    pub line_pattern: Regex,
    pub date: DateLayout,
    pub amount: AmountFormat,
    source: ConfigSource,
}

impl StatementFormat {
    /// Load from the default override location, falling back to built-in defaults
    pub fn new() -> Result<Self> {
        match default_config_path() {
            Some(path) if path.exists() => Self::from_path(&path),
            _ => Self::builtin(),
        }
    }

    /// Load with an optional explicit path (which must exist)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::new(),
        }
    }

    /// Built-in defaults only
    pub fn builtin() -> Result<Self> {
        parse_config(DEFAULT_CONFIG, ConfigSource::Embedded)
    }

    /// Load from a specific TOML file
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        parse_config(&content, ConfigSource::File(path.to_path_buf()))
    }

    /// Parse TOML content layered over the built-in defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        parse_config(content, ConfigSource::Embedded)
    }

    pub fn source(&self) -> &ConfigSource {
        &self.source
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("tally").join("config").join("statement.toml"))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    statement: Option<RawStatement>,
    date: Option<RawDate>,
    amount: Option<RawAmount>,
}

#[derive(Debug, Default, Deserialize)]
struct RawStatement {
    transfer_marker: Option<String>,
    line_prefix: Option<String>,
    line_pattern: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDate {
    separator: Option<String>,
    century_pivot: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAmount {
    grouping_separators: Option<Vec<String>>,
    decimal_mark: Option<String>,
    decimal_places: Option<usize>,
}

fn parse_raw(content: &str) -> Result<RawConfig> {
    toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))
}

/// Parse config from TOML content
fn parse_config(content: &str, source: ConfigSource) -> Result<StatementFormat> {
    let defaults = parse_raw(DEFAULT_CONFIG)?;
    let raw = parse_raw(content)?;

    let statement = raw.statement.unwrap_or_default();
    let default_statement = defaults.statement.unwrap_or_default();
    let date = raw.date.unwrap_or_default();
    let default_date = defaults.date.unwrap_or_default();
    let amount = raw.amount.unwrap_or_default();
    let default_amount = defaults.amount.unwrap_or_default();

    let transfer_marker = required(
        statement.transfer_marker.or(default_statement.transfer_marker),
        "statement.transfer_marker",
    )?;
    if transfer_marker.is_empty() || transfer_marker.chars().any(char::is_whitespace) {
        return Err(Error::Config(format!(
            "statement.transfer_marker must be a single non-empty token, got {:?}",
            transfer_marker
        )));
    }

    let line_prefix = Regex::new(&required(
        statement.line_prefix.or(default_statement.line_prefix),
        "statement.line_prefix",
    )?)?;

    let line_pattern = Regex::new(&required(
        statement.line_pattern.or(default_statement.line_pattern),
        "statement.line_pattern",
    )?)?;
    let names: Vec<&str> = line_pattern.capture_names().flatten().collect();
    for group in REQUIRED_GROUPS {
        if !names.contains(&group) {
            return Err(Error::Config(format!(
                "statement.line_pattern is missing the named group (?P<{}>...)",
                group
            )));
        }
    }

    let separator = single_char(
        &required(date.separator.or(default_date.separator), "date.separator")?,
        "date.separator",
    )?;
    let century_pivot = required(
        date.century_pivot.or(default_date.century_pivot),
        "date.century_pivot",
    )?;
    if century_pivot > 100 {
        return Err(Error::Config(format!(
            "date.century_pivot must be between 0 and 100, got {}",
            century_pivot
        )));
    }

    let grouping_separators = required(
        amount
            .grouping_separators
            .or(default_amount.grouping_separators),
        "amount.grouping_separators",
    )?
    .iter()
    .map(|s| single_char(s, "amount.grouping_separators"))
    .collect::<Result<Vec<_>>>()?;

    // An empty decimal_mark means every separator is grouping
    let decimal_mark = amount
        .decimal_mark
        .or(default_amount.decimal_mark)
        .filter(|m| !m.is_empty())
        .map(|m| single_char(&m, "amount.decimal_mark"))
        .transpose()?;

    let decimal_places = required(
        amount.decimal_places.or(default_amount.decimal_places),
        "amount.decimal_places",
    )?;
    if decimal_mark.is_some() && decimal_places == 0 {
        return Err(Error::Config(
            "amount.decimal_places must be at least 1 when decimal_mark is set".to_string(),
        ));
    }

    Ok(StatementFormat {
        transfer_marker,
        line_prefix,
        line_pattern,
        date: DateLayout {
            separator,
            century_pivot,
        },
        amount: AmountFormat {
            grouping_separators,
            decimal_mark,
            decimal_places,
        },
        source,
    })
}

fn required<T>(value: Option<T>, key: &str) -> Result<T> {
    value.ok_or_else(|| Error::Config(format!("Missing config value: {}", key)))
}

fn single_char(s: &str, key: &str) -> Result<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(Error::Config(format!(
            "{} entries must be exactly one character, got {:?}",
            key, s
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_config() {
        let format = StatementFormat::builtin().unwrap();
        assert_eq!(format.transfer_marker, "Transfers");
        assert_eq!(format.date.separator, '.');
        assert_eq!(format.date.century_pivot, 70);
        assert_eq!(format.amount.grouping_separators, vec![' ', ',']);
        assert_eq!(format.amount.decimal_mark, Some(','));
        assert_eq!(format.amount.decimal_places, 2);
        assert_eq!(format.source(), &ConfigSource::Embedded);
    }

    #[test]
    fn test_override_keeps_missing_defaults() {
        let format = StatementFormat::from_toml(
            r#"
            [statement]
            transfer_marker = "Umbuchung"
            "#,
        )
        .unwrap();
        assert_eq!(format.transfer_marker, "Umbuchung");
        assert!(format.line_prefix.is_match("05.03.24  1,00 X y"));
        assert_eq!(format.date.century_pivot, 70);
    }

    #[test]
    fn test_empty_override_is_default() {
        let format = StatementFormat::from_toml("").unwrap();
        assert_eq!(format.transfer_marker, "Transfers");
    }

    #[test]
    fn test_rejects_pattern_without_groups() {
        let err = StatementFormat::from_toml(
            r#"
            [statement]
            line_pattern = '^(\d{2}\.\d{2}\.\d{2})\s+(.+)$'
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("(?P<date>"));
    }

    #[test]
    fn test_rejects_invalid_regex() {
        let err = StatementFormat::from_toml(
            r#"
            [statement]
            line_prefix = '^(\d{2}'
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Regex(_)));
    }

    #[test]
    fn test_rejects_bad_marker_and_pivot() {
        assert!(StatementFormat::from_toml("[statement]\ntransfer_marker = \"\"").is_err());
        assert!(StatementFormat::from_toml("[statement]\ntransfer_marker = \"Two words\"").is_err());
        assert!(StatementFormat::from_toml("[date]\ncentury_pivot = 101").is_err());
        assert!(StatementFormat::from_toml("[date]\nseparator = \"..\"").is_err());
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let err = StatementFormat::from_toml("[statement\ntransfer_marker = 1").unwrap_err();
        assert!(err.to_string().contains("Invalid config TOML"));
    }

    #[test]
    fn test_empty_decimal_mark_strips_every_separator() {
        let format = StatementFormat::from_toml(
            r#"
            [amount]
            decimal_mark = ""
            "#,
        )
        .unwrap();
        assert_eq!(format.amount.decimal_mark, None);
        assert_eq!(format.amount.parse("-45,90"), Some(-4590.0));
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("statement.toml");
        fs::write(&path, "[statement]\ntransfer_marker = \"TRF\"\n").unwrap();

        let format = StatementFormat::load(Some(&path)).unwrap();
        assert_eq!(format.transfer_marker, "TRF");
        assert_eq!(format.source(), &ConfigSource::File(path));
    }

    #[test]
    fn test_from_missing_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = StatementFormat::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_amount_parse_default_convention() {
        let amount = StatementFormat::builtin().unwrap().amount;
        assert_eq!(amount.parse("1 250,00"), Some(1250.0));
        assert_eq!(amount.parse("-45,90"), Some(-45.9));
        assert_eq!(amount.parse("1 234,56"), Some(1234.56));
        assert_eq!(amount.parse("1,234"), Some(1234.0));
        assert_eq!(amount.parse("1,234,567"), Some(1234567.0));
        assert_eq!(amount.parse("100"), Some(100.0));
        assert_eq!(amount.parse("-1 000 000,01"), Some(-1000000.01));
    }

    #[test]
    fn test_amount_parse_non_breaking_space() {
        let amount = StatementFormat::builtin().unwrap().amount;
        assert_eq!(amount.parse("2\u{a0}500,10"), Some(2500.1));
    }

    #[test]
    fn test_amount_parse_rejects_garbage() {
        let amount = StatementFormat::builtin().unwrap().amount;
        assert_eq!(amount.parse("-"), None);
        assert_eq!(amount.parse(""), None);
        assert_eq!(amount.parse("12a"), None);
    }

    #[test]
    fn test_date_parse_with_pivot() {
        let date = StatementFormat::builtin().unwrap().date;
        assert_eq!(date.parse("05.03.24"), NaiveDate::from_ymd_opt(2024, 3, 5));
        assert_eq!(date.parse("31.12.69"), NaiveDate::from_ymd_opt(2069, 12, 31));
        assert_eq!(date.parse("01.01.70"), NaiveDate::from_ymd_opt(1970, 1, 1));
        assert_eq!(date.parse("15.08.99"), NaiveDate::from_ymd_opt(1999, 8, 15));
    }

    #[test]
    fn test_date_parse_rejects_impossible_dates() {
        let date = StatementFormat::builtin().unwrap().date;
        assert_eq!(date.parse("31.02.24"), None);
        assert_eq!(date.parse("00.01.24"), None);
        assert_eq!(date.parse("01.13.24"), None);
        assert_eq!(date.parse("1.1.24"), None);
        assert_eq!(date.parse("01.01.2024"), None);
        assert_eq!(date.parse("01/01/24"), None);
    }

    #[test]
    fn test_pivot_extremes() {
        let all_modern = DateLayout {
            separator: '.',
            century_pivot: 100,
        };
        assert_eq!(all_modern.resolve_year(99), 2099);
        let all_old = DateLayout {
            separator: '.',
            century_pivot: 0,
        };
        assert_eq!(all_old.resolve_year(0), 1900);
    }
}
