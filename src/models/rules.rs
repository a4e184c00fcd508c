use std::collections::HashMap;

use serde::Deserialize;

/// Known OCR confusions in three-letter country codes, mapped to the code
/// that was actually printed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct CountryCorrections {
    table: HashMap<String, String>,
}

impl CountryCorrections {
    pub fn new() -> Self {
        let mut table = HashMap::new();

        // Iraq read as "ITR"
        table.insert("ITR".to_string(), "IRQ".to_string());

        CountryCorrections { table }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        CountryCorrections {
            table: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns the corrected code, or `code` unchanged when it is not in the table.
    pub fn correct<'a>(&'a self, code: &'a str) -> &'a str {
        self.table.get(code).map(String::as_str).unwrap_or(code)
    }

    /// Like `correct`, but compares keys and returns values after `normalize`,
    /// so entries written with filler characters still match and never leak it.
    pub fn correct_normalized<F>(&self, code: &str, normalize: F) -> String
    where
        F: Fn(&str) -> String,
    {
        let code = normalize(code);
        let corrected = self
            .table
            .get(&code)
            .or_else(|| {
                self.table
                    .iter()
                    .find(|(key, _)| normalize(key) == code)
                    .map(|(_, value)| value)
            })
            .map(String::as_str)
            .unwrap_or(&code);
        normalize(corrected)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for CountryCorrections {
    fn default() -> Self {
        Self::new()
    }
}
