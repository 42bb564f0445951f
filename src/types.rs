use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Deserialize)]
pub(crate) struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_retries")]
    pub db_retries: u32,
    #[serde(default = "default_db_retry_delay_ms")]
    pub db_retry_delay_ms: u64,
    // json file with musicas and playlists loaded at startup
    pub seed_path: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_database_url() -> String {
    "sqlite::memory:".to_string()
}

fn default_db_retries() -> u32 {
    5
}

fn default_db_retry_delay_ms() -> u64 {
    100
}

impl Config {
    pub(crate) fn from_env() -> Result<Self, envy::Error> {
        envy::from_env::<Config>()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Musica {
    pub id: i64,
    pub name: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    // seconds
    pub duration: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: i64,
    pub id_user: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub musicas: Vec<Musica>,
}

/// Numeric route parameter.
///
/// Built from the raw path segment the same way a browser coerces a string
/// with unary plus: the conversion never fails, garbage becomes `NaN` and is
/// handed to the service untouched.
#[derive(Debug, Clone, Copy)]
pub struct Id(f64);

impl Id {
    pub fn from_param(param: &str) -> Self {
        Self(coerce_number(param))
    }

    /// The id as a row key, if it is a finite whole number that fits.
    pub fn as_integer(self) -> Option<i64> {
        let v = self.0;
        if !v.is_finite() || v.fract() != 0.0 || v < i64::MIN as f64 || v >= i64::MAX as f64 {
            return None;
        }
        Some(v as i64)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_integer() {
            Some(v) => write!(f, "{v}"),
            None => write!(f, "{}", self.0),
        }
    }
}

// WhiteSpace and LineTerminator of the number grammar: Unicode White_Space
// without U+0085, plus the byte order mark
fn is_number_space(c: char) -> bool {
    c == '\u{feff}' || (c.is_whitespace() && c != '\u{85}')
}

pub(crate) fn coerce_number(raw: &str) -> f64 {
    let s = raw.trim_matches(is_number_space);
    if s.is_empty() {
        return 0.0;
    }
    let prefixed = [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)];
    for (prefix, radix) in prefixed {
        if let Some(digits) = s.strip_prefix(prefix) {
            return parse_radix(digits, radix);
        }
    }
    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    // f64::from_str also takes "inf" and "nan", which must stay NaN here
    if !s
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
    {
        return f64::NAN;
    }
    s.parse().unwrap_or(f64::NAN)
}

fn parse_radix(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    digits
        .chars()
        .try_fold(0f64, |acc, c| {
            c.to_digit(radix).map(|d| acc * f64::from(radix) + f64::from(d))
        })
        .unwrap_or(f64::NAN)
}

/// Raw query string pairs, kept in request order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Filter(Vec<(String, String)>);

impl Filter {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Filter {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
