use crate::error::{LaradockError, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Raw `KEY=value` pairs as read from an env file.
pub type EnvMap = BTreeMap<String, String>;

/// Typed env values keyed by variable name.
pub type TypedEnv = BTreeMap<String, EnvValue>;

/// Strings that a dotenv reader would turn into something other than a
/// string unless quoted.
const RESERVED_WORDS: &[&str] = &[
    "true", "True", "TRUE", "false", "False", "FALSE", "on", "On", "ON", "off", "Off", "OFF",
    "yes", "Yes", "YES", "no", "No", "NO", "null",
];

const QUOTE_TRIGGERS: &[char] = &['"', '\'', '%', '!', '`', ' ', ',', '\n'];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EnvValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
    Path(PathBuf),
    List(Vec<EnvValue>),
}

impl From<&str> for EnvValue {
    fn from(s: &str) -> Self {
        EnvValue::Str(s.to_string())
    }
}

impl From<String> for EnvValue {
    fn from(s: String) -> Self {
        EnvValue::Str(s)
    }
}

impl From<i64> for EnvValue {
    fn from(n: i64) -> Self {
        EnvValue::Int(n)
    }
}

impl From<bool> for EnvValue {
    fn from(b: bool) -> Self {
        EnvValue::Bool(b)
    }
}

impl EnvValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            EnvValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Map a JSON value handed back by a hook. Objects have no env-file form.
    pub fn from_json(v: &Value) -> Option<EnvValue> {
        match v {
            Value::Null => Some(EnvValue::Null),
            Value::Bool(b) => Some(EnvValue::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(EnvValue::Int)
                .or_else(|| n.as_f64().map(EnvValue::Float)),
            Value::String(s) => Some(EnvValue::Str(s.clone())),
            Value::Array(arr) => arr
                .iter()
                .map(EnvValue::from_json)
                .collect::<Option<Vec<_>>>()
                .map(EnvValue::List),
            Value::Object(_) => None,
        }
    }
}

/// Render a value the way it must appear after `KEY=` in an env file.
///
/// `quote` only decides whether escaped string content gets wrapped in
/// double quotes; list elements are rendered with `quote = false` and the
/// joined list is wrapped as a whole.
pub fn stringify(value: &EnvValue, quote: bool) -> Result<String> {
    match value {
        EnvValue::Path(p) => Ok(std::path::absolute(p)?.display().to_string()),
        EnvValue::Bool(true) => Ok("true".to_string()),
        EnvValue::Bool(false) => Ok("false".to_string()),
        EnvValue::Null => Ok("null".to_string()),
        EnvValue::Int(n) => Ok(n.to_string()),
        EnvValue::Float(f) => Ok(format_float(*f)),
        EnvValue::Str(s) => Ok(stringify_str(s, quote)),
        EnvValue::List(items) => {
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                if let EnvValue::List(_) | EnvValue::Path(_) = item {
                    return Err(LaradockError::Unstringifiable(format!("list element {item:?}")));
                }
                parts.push(stringify(item, false)?);
            }
            Ok(format!("\"{}\"", parts.join(",")))
        }
    }
}

fn stringify_str(s: &str, quote: bool) -> String {
    if !needs_quoting(s) {
        return s.to_string();
    }
    let escaped = s
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace(',', "\\,");
    if quote {
        format!("\"{escaped}\"")
    } else {
        escaped
    }
}

fn needs_quoting(s: &str) -> bool {
    s.contains(QUOTE_TRIGGERS)
        || s.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        || RESERVED_WORDS.contains(&s)
}

fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

/// Read every assignment of an env file. Lines dotenvy cannot parse are
/// skipped with a warning rather than failing the whole read.
pub fn read_env_file(path: &Path) -> Result<EnvMap> {
    let iter = dotenvy::from_path_iter(path).map_err(|source| LaradockError::EnvParse {
        path: path.to_path_buf(),
        source,
    })?;

    let mut map = EnvMap::new();
    for item in iter {
        match item {
            Ok((k, v)) => {
                map.insert(k, v);
            }
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unparsable env line"),
        }
    }
    Ok(map)
}

/// Load a project's env file as ProjectEnv.
pub fn load_project_env(path: &Path) -> Result<TypedEnv> {
    Ok(read_env_file(path)?
        .into_iter()
        .map(|(k, v)| (k, EnvValue::Str(v)))
        .collect())
}

/// Split a comma-separated list value, dropping empty entries.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
