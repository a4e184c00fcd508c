use chrono::NaiveDate;

use crate::config::ExtractorConfig;
use crate::models::{CountryCorrections, RawMrzFields};

/// Two-digit years above this resolve to the 1900s, the rest to the 2000s.
pub const CENTURY_CUTOFF: u32 = 30;

/// Identity fields after cleanup, ready to be merged into a `NormalizedRecord`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFields {
    pub passport_number: String,
    pub country: String,
    pub surname: String,
    pub names: String,
    pub nationality: String,
    pub date_of_birth: Option<NaiveDate>,
    pub sex: String,
    pub expiration_date: Option<NaiveDate>,
    pub personal_number: String,
}

/// FieldNormalizer turns raw MRZ strings into clean, typed values.
/// Nothing in here fails: unusable input comes back empty or `None`.
pub struct FieldNormalizer;

impl FieldNormalizer {
    /// Replaces every `strip_char` with a space, trims, and collapses inner whitespace runs.
    pub fn normalize_text(raw: &str, strip_char: char) -> String {
        raw.replace(strip_char, " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Applies the built-in correction table.
    pub fn correct_country(code: &str) -> String {
        Self::correct_country_with(code, &CountryCorrections::default(), '<')
    }

    /// Table keys and values are normalized with the same filler as the code.
    pub fn correct_country_with(code: &str, corrections: &CountryCorrections, filler: char) -> String {
        corrections.correct_normalized(code, |value| Self::normalize_text(value, filler))
    }

    /// Parses an MRZ `YYMMDD` date. Returns `None` for anything that is not
    /// six digits forming a real calendar date.
    pub fn parse_mrz_date(raw: &str) -> Option<NaiveDate> {
        if raw.len() != 6 || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let yy = raw[0..2].parse::<u32>().ok()?;
        let month = raw[2..4].parse::<u32>().ok()?;
        let day = raw[4..6].parse::<u32>().ok()?;

        let year = if yy > CENTURY_CUTOFF { 1900 + yy } else { 2000 + yy };

        NaiveDate::from_ymd_opt(year as i32, month, day)
    }

    pub fn normalize_fields(raw: &RawMrzFields, config: &ExtractorConfig) -> NormalizedFields {
        let filler = config.filler;
        let text = |value: &str| Self::normalize_text(value, filler);

        let date_of_birth = Self::parse_mrz_date(&raw.date_of_birth);
        if date_of_birth.is_none() {
            log::debug!("Unparsable date of birth: {:?}", raw.date_of_birth);
        }
        let expiration_date = Self::parse_mrz_date(&raw.expiration_date);
        if expiration_date.is_none() {
            log::debug!("Unparsable expiration date: {:?}", raw.expiration_date);
        }

        NormalizedFields {
            passport_number: text(&raw.number),
            country: Self::correct_country_with(&raw.country, &config.country_corrections, filler),
            surname: text(&raw.surname),
            names: text(&raw.names),
            nationality: text(&raw.nationality),
            date_of_birth,
            sex: text(&raw.sex),
            expiration_date,
            personal_number: text(&raw.personal_number),
        }
    }
}
