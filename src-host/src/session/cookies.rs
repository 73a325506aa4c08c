// Cookie records and the live/persisted merge

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

fn default_path() -> String {
    "/".to_string()
}

/// One cookie as stored in the partition jar and in `cookie-backup.json`.
///
/// Attributes the host doesn't interpret (`secure`, `httpOnly`, `sameSite`,
/// ...) are kept in `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieRecord {
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CookieRecord {
    pub fn new(
        name: impl Into<String>,
        domain: impl Into<String>,
        path: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: path.into(),
            expiration_date: None,
            extra: Map::new(),
        }
    }
}

/// Identity of a cookie: `(name, domain, path)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CookieKey {
    pub name: String,
    pub domain: String,
    pub path: String,
}

impl CookieKey {
    pub fn of(cookie: &CookieRecord) -> Self {
        Self {
            name: cookie.name.clone(),
            domain: cookie.domain.clone(),
            path: cookie.path.clone(),
        }
    }
}

/// Union of the live jar and the previously persisted store.
///
/// Live cookies come first and win on key collision; no key appears twice
/// in the result.
pub fn merge_cookies(live: Vec<CookieRecord>, persisted: Vec<CookieRecord>) -> Vec<CookieRecord> {
    let mut seen = HashSet::with_capacity(live.len() + persisted.len());
    let mut merged = Vec::with_capacity(live.len() + persisted.len());

    for cookie in live.into_iter().chain(persisted) {
        if seen.insert(CookieKey::of(&cookie)) {
            merged.push(cookie);
        }
    }

    merged
}
