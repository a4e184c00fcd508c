use lazy_static::lazy_static;
use regex::Regex;

use crate::models::{MrzFormat, RawMrzFields};

lazy_static! {
    static ref MRZ_LINE: Regex = Regex::new(r"^[A-Z0-9<]+$").unwrap();
}

/// Length slack allowed when matching an OCR line against a format width.
const WIDTH_TOLERANCE: usize = 2;

/// MrzParser turns OCR text of a machine-readable zone into raw fields,
/// following the ICAO Doc 9303 layouts for TD1, TD2 and TD3 documents.
pub struct MrzParser;

impl MrzParser {
    /// Parses the MRZ found in `text`, or `None` when no complete zone is present.
    /// Check digit failures are scored, never rejected.
    pub fn parse_mrz_text(text: &str) -> Option<RawMrzFields> {
        let (format, lines) = Self::extract_mrz_lines(text)?;
        let fields = match format {
            MrzFormat::TD1 => Self::parse_td1(&lines[0], &lines[1], &lines[2]),
            MrzFormat::TD2 | MrzFormat::TD3 => Self::parse_two_line(format, &lines[0], &lines[1]),
        };
        log::debug!(
            "Parsed {:?} MRZ for document {:?}, {} check digits valid",
            format,
            fields.number,
            fields.valid_score
        );
        Some(fields)
    }

    /// Picks the bottom-most run of lines that fits an MRZ format and pads each
    /// to the exact width.
    pub fn extract_mrz_lines(text: &str) -> Option<(MrzFormat, Vec<String>)> {
        let candidates: Vec<String> = text
            .lines()
            .map(Self::clean_mrz_line)
            .filter(|line| line.len() >= 20 && MRZ_LINE.is_match(line))
            .collect();

        for format in [MrzFormat::TD3, MrzFormat::TD2, MrzFormat::TD1] {
            let width = format.mrz_chars_per_line();
            let fitting: Vec<&String> = candidates
                .iter()
                .filter(|line| line.len().abs_diff(width) <= WIDTH_TOLERANCE)
                .collect();
            let needed = format.mrz_lines();
            if fitting.len() >= needed {
                let lines = fitting[fitting.len() - needed..]
                    .iter()
                    .map(|line| Self::fit_width(line, width))
                    .collect();
                return Some((format, lines));
            }
        }
        None
    }

    /// Uppercases, drops whitespace, and maps characters OCR commonly emits
    /// in place of the filler.
    fn clean_mrz_line(line: &str) -> String {
        line.chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| match c {
                '«' | '_' | '-' | '.' => '<',
                other => other.to_ascii_uppercase(),
            })
            .collect()
    }

    fn fit_width(line: &str, width: usize) -> String {
        let mut fitted: String = line.chars().take(width).collect();
        while fitted.len() < width {
            fitted.push('<');
        }
        fitted
    }

    fn parse_two_line(format: MrzFormat, line1: &str, line2: &str) -> RawMrzFields {
        let width = format.mrz_chars_per_line();
        let (surname, names) = Self::split_names(&line1[5..]);

        // TD3 carries a personal number with its own check digit; TD2 only optional data.
        let (personal_number, composite_at) = match format {
            MrzFormat::TD3 => (&line2[28..42], 43),
            _ => (&line2[28..width - 1], width - 1),
        };

        let mut score = 0;
        score += Self::check(&line2[0..9], line2.as_bytes()[9]) as u8;
        score += Self::check(&line2[13..19], line2.as_bytes()[19]) as u8;
        score += Self::check(&line2[21..27], line2.as_bytes()[27]) as u8;
        if format == MrzFormat::TD3 {
            score += Self::check(personal_number, line2.as_bytes()[42]) as u8;
        }
        let composite = format!(
            "{}{}{}",
            &line2[0..10],
            &line2[13..20],
            &line2[21..composite_at]
        );
        score += Self::check(&composite, line2.as_bytes()[composite_at]) as u8;

        RawMrzFields {
            mrz_type: Some(format),
            document_type: line1[0..2].to_string(),
            country: line1[2..5].to_string(),
            number: line2[0..9].to_string(),
            surname,
            names,
            nationality: line2[10..13].to_string(),
            date_of_birth: line2[13..19].to_string(),
            sex: line2[20..21].to_string(),
            expiration_date: line2[21..27].to_string(),
            personal_number: personal_number.to_string(),
            valid_score: score,
        }
    }

    fn parse_td1(line1: &str, line2: &str, line3: &str) -> RawMrzFields {
        let (surname, names) = Self::split_names(line3);

        let mut score = 0;
        score += Self::check(&line1[5..14], line1.as_bytes()[14]) as u8;
        score += Self::check(&line2[0..6], line2.as_bytes()[6]) as u8;
        score += Self::check(&line2[8..14], line2.as_bytes()[14]) as u8;
        let composite = format!(
            "{}{}{}{}",
            &line1[5..30],
            &line2[0..7],
            &line2[8..15],
            &line2[18..29]
        );
        score += Self::check(&composite, line2.as_bytes()[29]) as u8;

        RawMrzFields {
            mrz_type: Some(MrzFormat::TD1),
            document_type: line1[0..2].to_string(),
            country: line1[2..5].to_string(),
            number: line1[5..14].to_string(),
            surname,
            names,
            nationality: line2[15..18].to_string(),
            date_of_birth: line2[0..6].to_string(),
            sex: line2[7..8].to_string(),
            expiration_date: line2[8..14].to_string(),
            personal_number: line1[15..30].to_string(),
            valid_score: score,
        }
    }

    /// Splits the name field at the first `<<` into surname and given names.
    fn split_names(field: &str) -> (String, String) {
        match field.split_once("<<") {
            Some((surname, names)) => (surname.to_string(), names.to_string()),
            None => (field.to_string(), String::new()),
        }
    }

    /// ICAO 9303 check digit: values weighted 7, 3, 1 repeating, modulo 10.
    pub fn check_digit(field: &str) -> Option<u8> {
        let mut sum: u32 = 0;
        for (i, c) in field.chars().enumerate() {
            let value = match c {
                '0'..='9' => c as u32 - '0' as u32,
                'A'..='Z' => c as u32 - 'A' as u32 + 10,
                '<' => 0,
                _ => return None,
            };
            sum += value * [7, 3, 1][i % 3];
        }
        Some((sum % 10) as u8)
    }

    fn check(field: &str, check_char: u8) -> bool {
        let expected = match check_char {
            b'0'..=b'9' => check_char - b'0',
            b'<' => 0,
            _ => return false,
        };
        Self::check_digit(field) == Some(expected)
    }
}
