use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("cookie store: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("invalid cookie expiry date: {0}")]
    InvalidExpiry(String),
    #[error("invalid cookie assignment: {0}")]
    InvalidAssignment(String),
}

/// Cookie jar persisted in SQLite. Plays the part of `document.cookie`.
#[derive(Debug)]
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn new(db_url: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(db_url)?;
        conn.execute(
            "
            CREATE TABLE IF NOT EXISTS cookie (
                name TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                path TEXT NOT NULL,
                expires TEXT
            )
            ",
            (),
        )?;
        Ok(Store { conn })
    }

    /// Set a cookie, replacing any cookie with the same name
    pub fn set_cookie(
        &self,
        name: &str,
        value: &str,
        path: &str,
        expires: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "
            INSERT OR REPLACE INTO cookie (name, value, path, expires)
            VALUES (?1, ?2, ?3, ?4)
            ",
            params![name, value, path, expires.map(|e| e.to_rfc3339())],
        )?;
        Ok(())
    }

    /// Get a live cookie value. Missing, empty and expired cookies all read as `None`.
    pub fn get_cookie(&self, name: &str) -> Result<Option<String>, StoreError> {
        let row: Option<(String, Option<String>)> = self
            .conn
            .query_row(
                "SELECT value, expires FROM cookie WHERE name = ?1",
                params![name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((value, expires)) = row else {
            return Ok(None);
        };
        if let Some(expires) = expires {
            let expires = DateTime::parse_from_rfc3339(&expires)
                .map_err(|_| StoreError::InvalidExpiry(expires.clone()))?;
            if expires.with_timezone(&Utc) <= Utc::now() {
                return Ok(None);
            }
        }
        Ok(Some(value).filter(|v| !v.is_empty()))
    }

    /// Apply a `document.cookie` style assignment such as
    /// `token=abc; path=/; expires=Thu, 01 Jan 1970 00:00:01 GMT`.
    pub fn assign(&self, assignment: &str) -> Result<(), StoreError> {
        let cookie = parse_cookie_assignment(assignment)?;
        self.set_cookie(&cookie.name, &cookie.value, &cookie.path, cookie.expires)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CookieAssignment {
    pub name: String,
    pub value: String,
    pub path: String,
    pub expires: Option<DateTime<Utc>>,
}

pub fn parse_cookie_assignment(assignment: &str) -> Result<CookieAssignment, StoreError> {
    let mut parts = assignment.split(';').map(str::trim);
    let (name, value) = parts
        .next()
        .and_then(|pair| pair.split_once('='))
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| StoreError::InvalidAssignment(assignment.to_string()))?;

    let mut cookie = CookieAssignment {
        name: name.to_string(),
        value: value.to_string(),
        path: "/".to_string(),
        expires: None,
    };
    for attr in parts {
        match attr.split_once('=') {
            Some((key, val)) if key.eq_ignore_ascii_case("path") => cookie.path = val.to_string(),
            Some((key, val)) if key.eq_ignore_ascii_case("expires") => {
                let date = DateTime::parse_from_rfc2822(val)
                    .map_err(|_| StoreError::InvalidExpiry(val.to_string()))?;
                cookie.expires = Some(date.with_timezone(&Utc));
            }
            // Attributes a jar without a browser has no use for (domain, secure, ...)
            _ => {}
        }
    }
    Ok(cookie)
}

/// Read one cookie out of a `Cookie:` header string like `a=1; token=abc`.
/// Returns `None` when the name is absent or appears more than once.
pub fn cookie_value(header: &str, name: &str) -> Option<String> {
    let value = format!("; {header}");
    let needle = format!("; {name}=");
    let mut parts = value.split(needle.as_str()).skip(1);
    let found = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    found.split(';').next().map(str::to_owned)
}
