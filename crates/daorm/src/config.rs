use std::time::Duration;

/// Configuration of a [`crate::Dao`].
///
/// ```ignore
/// let config = DaoConfig::new()
///     .session_pool_capacity(64)
///     .slow_query_threshold(Duration::from_millis(200))
///     .no_truncate();
/// let dao = Dao::with_config(conn, config);
/// ```
#[derive(Debug, Clone)]
pub struct DaoConfig {
    /// Reset session states kept around for reuse.
    pub session_pool_capacity: usize,
    /// Statements slower than this are logged at `warn`. `None` disables the check.
    pub slow_query_threshold: Option<Duration>,
    /// Truncate SQL in tracing events (in bytes). `None` means no truncation.
    pub max_sql_log_length: Option<usize>,
    /// Whether bound arguments are included in tracing events.
    pub log_args: bool,
}

impl Default for DaoConfig {
    fn default() -> Self {
        Self {
            session_pool_capacity: 32,
            slow_query_threshold: None,
            max_sql_log_length: Some(200),
            log_args: true,
        }
    }
}

impl DaoConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_pool_capacity(mut self, capacity: usize) -> Self {
        self.session_pool_capacity = capacity;
        self
    }

    pub fn slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = Some(threshold);
        self
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_log_length(mut self, len: usize) -> Self {
        self.max_sql_log_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_log_length = None;
        self
    }

    pub fn log_args(mut self, enabled: bool) -> Self {
        self.log_args = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = DaoConfig::new();
        assert_eq!(config.session_pool_capacity, 32);
        assert_eq!(config.max_sql_log_length, Some(200));
        assert!(config.slow_query_threshold.is_none());
        assert!(config.log_args);
    }

    #[test]
    fn builder_overrides() {
        let config = DaoConfig::new()
            .session_pool_capacity(4)
            .slow_query_threshold(Duration::from_millis(5))
            .no_truncate()
            .log_args(false);
        assert_eq!(config.session_pool_capacity, 4);
        assert_eq!(config.slow_query_threshold, Some(Duration::from_millis(5)));
        assert_eq!(config.max_sql_log_length, None);
        assert!(!config.log_args);
    }
}
