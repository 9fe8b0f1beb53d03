use serde::{Deserialize, Deserializer};
use std::fmt;

/// Zero-padded, 10-digit SEC Central Index Key.
///
/// The company index serves it as a bare integer, the submissions API
/// wants the padded form, and the document archive wants the padding
/// stripped back off. Pad once here so nothing downstream thinks about
/// widths again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cik(String);

impl Cik {
    pub fn new(n: u64) -> Self {
        Self(format!("{n:010}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The archive path segment drops the leading zeroes.
    pub fn unpadded(&self) -> &str {
        self.0.trim_start_matches('0')
    }
}

impl fmt::Display for Cik {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// the index names the field `cik_str` yet ships a number
pub(crate) fn de_cik<'de, D>(deserializer: D) -> Result<Cik, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = u64::deserialize(deserializer)?;
    Ok(Cik::new(raw))
}

/// Filing dates arrive as `YYYY-MM-DD` strings.
pub(crate) fn convert_date_type(str_date: &str) -> anyhow::Result<chrono::NaiveDate> {
    let date = chrono::NaiveDate::parse_from_str(str_date, "%Y-%m-%d")?;
    Ok(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cik_pads_to_ten_digits() {
        let cik = Cik::new(320193);
        assert_eq!(cik.as_str(), "0000320193");
        assert_eq!(cik.to_string(), "0000320193");
    }

    #[test]
    fn cik_unpads_for_archive_paths() {
        assert_eq!(Cik::new(320193).unpadded(), "320193");
        assert_eq!(Cik::new(1018724).unpadded(), "1018724");
    }

    #[test]
    fn dates_parse_from_iso_strings() {
        let date = convert_date_type("2024-02-01").unwrap();
        assert_eq!(date.to_string(), "2024-02-01");
        assert!(convert_date_type("02/01/2024").is_err());
    }
}
