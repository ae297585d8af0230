use crate::error::{MapperError, MapperResult};
use crate::executor::ExecutorType;
use crate::mapping::JdbcType;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Positional marker written in place of each `#{}` placeholder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderStyle {
    /// `?` markers.
    #[default]
    Question,
    /// PostgreSQL `$1`, `$2`, ... markers.
    Dollar,
}

impl PlaceholderStyle {
    /// Marker for the 1-based parameter `position`.
    pub fn marker(self, position: usize) -> String {
        match self {
            PlaceholderStyle::Question => "?".to_string(),
            PlaceholderStyle::Dollar => format!("${position}"),
        }
    }
}

/// Runtime settings, loadable from TOML.
///
/// ```toml
/// default_executor_type = "reuse"
/// default_statement_timeout = 30
/// placeholder_style = "dollar"
/// shrink_whitespaces_in_sql = true
/// slow_query_threshold = 500
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub default_executor_type: ExecutorType,
    /// Seconds; applies to statements without their own timeout.
    pub default_statement_timeout: Option<u64>,
    pub default_fetch_size: Option<u32>,
    /// Type hint attached to null parameters without an explicit `jdbcType`.
    pub jdbc_type_for_null: JdbcType,
    pub shrink_whitespaces_in_sql: bool,
    pub placeholder_style: PlaceholderStyle,
    pub class_cache_enabled: bool,
    pub expression_cache_capacity: usize,
    /// Emit prepared SQL and parameters on the `sqlmap.sql` target.
    pub log_sql: bool,
    /// Milliseconds; statements slower than this are reported as slow.
    pub slow_query_threshold: Option<u64>,
    /// Exposed to templates as `_databaseId`.
    pub database_id: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_executor_type: ExecutorType::Simple,
            default_statement_timeout: None,
            default_fetch_size: None,
            jdbc_type_for_null: JdbcType::Other,
            shrink_whitespaces_in_sql: false,
            placeholder_style: PlaceholderStyle::Question,
            class_cache_enabled: true,
            expression_cache_capacity: 256,
            log_sql: true,
            slow_query_threshold: None,
            database_id: None,
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse settings from a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(raw: &str) -> MapperResult<Self> {
        let settings: Settings = toml::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read and parse a TOML settings file.
    pub fn load(path: impl AsRef<Path>) -> MapperResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            MapperError::configuration(format!(
                "failed to read settings file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&raw)
    }

    fn validate(&self) -> MapperResult<()> {
        if self.default_fetch_size == Some(0) {
            return Err(MapperError::configuration(
                "default_fetch_size must be greater than zero",
            ));
        }
        if self.database_id.as_deref() == Some("") {
            return Err(MapperError::configuration("database_id must not be empty"));
        }
        Ok(())
    }

    pub fn statement_timeout(&self) -> Option<Duration> {
        self.default_statement_timeout.map(Duration::from_secs)
    }

    pub fn slow_query_duration(&self) -> Option<Duration> {
        self.slow_query_threshold.map(Duration::from_millis)
    }

    pub fn default_executor_type(mut self, executor_type: ExecutorType) -> Self {
        self.default_executor_type = executor_type;
        self
    }

    pub fn default_statement_timeout(mut self, timeout: Duration) -> Self {
        self.default_statement_timeout = Some(timeout.as_secs());
        self
    }

    pub fn default_fetch_size(mut self, rows: u32) -> Self {
        self.default_fetch_size = Some(rows);
        self
    }

    pub fn jdbc_type_for_null(mut self, jdbc_type: JdbcType) -> Self {
        self.jdbc_type_for_null = jdbc_type;
        self
    }

    pub fn shrink_whitespaces_in_sql(mut self, enabled: bool) -> Self {
        self.shrink_whitespaces_in_sql = enabled;
        self
    }

    pub fn placeholder_style(mut self, style: PlaceholderStyle) -> Self {
        self.placeholder_style = style;
        self
    }

    pub fn class_cache_enabled(mut self, enabled: bool) -> Self {
        self.class_cache_enabled = enabled;
        self
    }

    pub fn expression_cache_capacity(mut self, capacity: usize) -> Self {
        self.expression_cache_capacity = capacity;
        self
    }

    pub fn log_sql(mut self, enabled: bool) -> Self {
        self.log_sql = enabled;
        self
    }

    pub fn slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = Some(u64::try_from(threshold.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn database_id(mut self, id: impl Into<String>) -> Self {
        self.database_id = Some(id.into());
        self
    }
}
