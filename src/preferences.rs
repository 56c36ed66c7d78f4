//! Durable user preferences
//!
//! The theme choice is the only state that outlives a session. It lives in
//! a small SQLite key/value table owned by an explicit store value.

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::ScanError;

const THEME_KEY: &str = "theme";

/// Color theme of the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// The other theme
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme: {}", other)),
        }
    }
}

/// Preferences database
pub struct PreferencesStore {
    conn: Connection,
}

impl PreferencesStore {
    /// Open or create the preferences database
    pub fn open(path: &Path) -> Result<Self, ScanError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Open in-memory database (for testing)
    pub fn open_memory() -> Result<Self, ScanError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), ScanError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, ScanError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ScanError> {
        self.conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    /// Stored theme, `Light` when unset or unreadable
    pub fn theme(&self) -> Result<Theme, ScanError> {
        match self.get(THEME_KEY)? {
            Some(raw) => Ok(raw.parse().unwrap_or_else(|e| {
                log::warn!("Ignoring stored theme: {}", e);
                Theme::default()
            })),
            None => Ok(Theme::default()),
        }
    }

    /// Persist a theme
    pub fn set_theme(&self, theme: Theme) -> Result<(), ScanError> {
        self.set(THEME_KEY, theme.as_str())?;
        log::debug!("Theme set to {}", theme);
        Ok(())
    }

    /// Switch to the other theme and return it
    pub fn toggle_theme(&self) -> Result<Theme, ScanError> {
        let next = self.theme()?.toggled();
        self.set_theme(next)?;
        Ok(next)
    }
}
