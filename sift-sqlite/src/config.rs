//! SQLite configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use sift_query::config::SiftConfig;

use crate::error::{SqliteError, SqliteResult};

/// SQLite database configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SqliteConfig {
    /// Database path (or in-memory).
    pub path: DatabasePath,
    /// Enable foreign keys.
    pub foreign_keys: bool,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: Option<u32>,
    /// Journal mode.
    pub journal_mode: JournalMode,
    /// Log every statement at debug level.
    pub log_queries: bool,
    /// Statements slower than this are logged as warnings.
    pub slow_query_threshold: Duration,
}

/// Database path configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DatabasePath {
    /// In-memory database.
    #[default]
    Memory,
    /// File-based database.
    File(PathBuf),
}

impl DatabasePath {
    /// Check if this is an in-memory database.
    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

/// SQLite journal mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JournalMode {
    /// Delete the journal after each transaction.
    Delete,
    /// Keep the journal in memory.
    Memory,
    /// Write-ahead logging.
    #[default]
    Wal,
}

impl JournalMode {
    /// Get the SQLite pragma value.
    pub fn as_pragma(&self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Memory => "MEMORY",
            Self::Wal => "WAL",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "delete" => Some(Self::Delete),
            "memory" => Some(Self::Memory),
            "wal" => Some(Self::Wal),
            _ => None,
        }
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: DatabasePath::Memory,
            foreign_keys: true,
            busy_timeout_ms: Some(5000),
            journal_mode: JournalMode::Wal,
            log_queries: false,
            slow_query_threshold: Duration::from_millis(1000),
        }
    }
}

impl SqliteConfig {
    /// Configuration for an in-memory database.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Configuration for a file-based database.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            path: DatabasePath::File(path.as_ref().to_path_buf()),
            ..Default::default()
        }
    }

    /// Parse a SQLite URL.
    ///
    /// Supported formats:
    /// - `sqlite::memory:` or `:memory:`
    /// - `sqlite://path/to/db.sqlite`, `sqlite:///absolute/path.db`
    /// - `file:path/to/db.sqlite`
    ///
    /// Query options: `mode=memory`, `foreign_keys`, `busy_timeout`,
    /// `journal_mode`.
    pub fn from_url(url: impl AsRef<str>) -> SqliteResult<Self> {
        let url = url.as_ref();
        let (location, query) = match url.split_once('?') {
            Some((location, query)) => (location, Some(query)),
            None => (url, None),
        };

        let mut config = match location {
            "sqlite::memory:" | ":memory:" => Self::memory(),
            _ => {
                let path = location
                    .strip_prefix("sqlite://")
                    .or_else(|| location.strip_prefix("sqlite:"))
                    .or_else(|| location.strip_prefix("file:"))
                    .unwrap_or(location);
                if path.is_empty() {
                    return Err(SqliteError::config(format!(
                        "database path is required in '{url}'"
                    )));
                }
                Self::file(path)
            }
        };

        for pair in query.into_iter().flat_map(|q| q.split('&')) {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            match key {
                "mode" if value == "memory" => config.path = DatabasePath::Memory,
                "foreign_keys" => config.foreign_keys = value == "true" || value == "1",
                "busy_timeout" => {
                    let ms = value.parse().map_err(|_| {
                        SqliteError::config(format!("invalid busy_timeout '{value}'"))
                    })?;
                    config.busy_timeout_ms = Some(ms);
                }
                "journal_mode" => {
                    config.journal_mode = JournalMode::parse(value).ok_or_else(|| {
                        SqliteError::config(format!("invalid journal_mode '{value}'"))
                    })?;
                }
                _ => {}
            }
        }
        Ok(config)
    }

    /// Build from the `[database]` and `[debug]` sections of a Sift config.
    pub fn from_sift_config(config: &SiftConfig) -> SqliteResult<Self> {
        let url = config
            .database_url()
            .ok_or_else(|| SqliteError::config("[database] url is not set"))?;
        Ok(Self::from_url(url)?
            .log_queries(config.debug.log_queries)
            .slow_query_threshold(Duration::from_millis(config.debug.slow_query_threshold_ms)))
    }

    /// PRAGMA statements run on every new connection.
    pub fn init_sql(&self) -> String {
        let mut sql = String::new();
        if self.foreign_keys {
            sql.push_str("PRAGMA foreign_keys = ON;\n");
        }
        // WAL is not available for in-memory databases.
        if !self.path.is_memory() {
            sql.push_str(&format!("PRAGMA journal_mode = {};\n", self.journal_mode.as_pragma()));
        }
        if let Some(timeout) = self.busy_timeout_ms {
            sql.push_str(&format!("PRAGMA busy_timeout = {timeout};\n"));
        }
        sql
    }

    /// Enable or disable foreign keys.
    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    /// Set the busy timeout in milliseconds.
    pub fn busy_timeout(mut self, ms: u32) -> Self {
        self.busy_timeout_ms = Some(ms);
        self
    }

    /// Set the journal mode.
    pub fn journal_mode(mut self, mode: JournalMode) -> Self {
        self.journal_mode = mode;
        self
    }

    /// Log every statement at debug level.
    pub fn log_queries(mut self, enabled: bool) -> Self {
        self.log_queries = enabled;
        self
    }

    /// Set the slow statement threshold.
    pub fn slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = threshold;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_config_from_url_memory() {
        for url in ["sqlite::memory:", ":memory:", "sqlite://db.sqlite?mode=memory"] {
            assert!(SqliteConfig::from_url(url).unwrap().path.is_memory(), "{url}");
        }
    }

    #[test]
    fn test_config_from_url_file() {
        let config = SqliteConfig::from_url("sqlite://./members.db").unwrap();
        assert_eq!(config.path, DatabasePath::File("./members.db".into()));

        let config = SqliteConfig::from_url("sqlite:///var/lib/sift.db").unwrap();
        assert_eq!(config.path, DatabasePath::File("/var/lib/sift.db".into()));

        let config = SqliteConfig::from_url("file:data.db").unwrap();
        assert_eq!(config.path, DatabasePath::File("data.db".into()));

        assert!(SqliteConfig::from_url("sqlite://").is_err());
    }

    #[test]
    fn test_config_from_url_with_options() {
        let url = "sqlite://./test.db?foreign_keys=0&busy_timeout=250&journal_mode=delete";
        let config = SqliteConfig::from_url(url).unwrap();
        assert!(!config.foreign_keys);
        assert_eq!(config.busy_timeout_ms, Some(250));
        assert_eq!(config.journal_mode, JournalMode::Delete);

        assert!(SqliteConfig::from_url("sqlite://./test.db?busy_timeout=soon").is_err());
        assert!(SqliteConfig::from_url("sqlite://./test.db?journal_mode=fast").is_err());
    }

    #[test]
    fn test_init_sql() {
        let sql = SqliteConfig::file("a.db").init_sql();
        assert_eq!(
            sql,
            "PRAGMA foreign_keys = ON;\nPRAGMA journal_mode = WAL;\nPRAGMA busy_timeout = 5000;\n"
        );

        let sql = SqliteConfig::memory().foreign_keys(false).init_sql();
        assert_eq!(sql, "PRAGMA busy_timeout = 5000;\n");
    }

    #[test]
    fn test_from_sift_config() {
        let sift = SiftConfig::from_str(
            "[database]\nurl = \"sqlite::memory:\"\n[debug]\nlog_queries = true\nslow_query_threshold_ms = 20\n",
        )
        .unwrap();
        let config = SqliteConfig::from_sift_config(&sift).unwrap();
        assert!(config.path.is_memory());
        assert!(config.log_queries);
        assert_eq!(config.slow_query_threshold, Duration::from_millis(20));

        assert!(SqliteConfig::from_sift_config(&SiftConfig::default()).is_err());
    }
}
