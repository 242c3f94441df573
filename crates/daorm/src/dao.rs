use crate::client::Connection;
use crate::config::DaoConfig;
use crate::monitor::SqlMonitor;
use crate::pool::SessionPool;
use crate::session::Session;
use std::fmt;
use std::sync::Arc;

/// Entry point: a connection plus the logging and pooling shared by its sessions.
///
/// ```ignore
/// let dao = Dao::new(Arc::new(SqliteConnection::open_in_memory()?));
/// let mut user = User::default();
/// dao.session().table("users").where_("id = ?", args![1]).get(&mut user)?;
/// ```
pub struct Dao {
    conn: Arc<dyn Connection>,
    monitor: SqlMonitor,
    pool: SessionPool,
}

impl Dao {
    pub fn new(conn: Arc<dyn Connection>) -> Self {
        Self::with_config(conn, DaoConfig::default())
    }

    pub fn with_config(conn: Arc<dyn Connection>, config: DaoConfig) -> Self {
        let pool = SessionPool::new(config.session_pool_capacity);
        Self {
            conn,
            monitor: SqlMonitor::new(config),
            pool,
        }
    }

    /// Install a sink that receives one line per statement before it runs.
    pub fn set_logger<F>(&mut self, logger: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.monitor.set_sink(Arc::new(logger));
    }

    /// A new session with no tag.
    pub fn session(&self) -> Session<'_> {
        self.session_tagged("")
    }

    /// A new session whose log lines are prefixed with `tag`.
    pub fn session_tagged(&self, tag: impl Into<String>) -> Session<'_> {
        Session::new(self, tag.into(), self.pool.acquire())
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.conn
    }

    pub fn config(&self) -> &DaoConfig {
        self.monitor.config()
    }

    /// Session states waiting in the pool.
    pub fn idle_sessions(&self) -> usize {
        self.pool.idle()
    }

    pub(crate) fn monitor(&self) -> &SqlMonitor {
        &self.monitor
    }

    pub(crate) fn pool(&self) -> &SessionPool {
        &self.pool
    }
}

impl fmt::Debug for Dao {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dao")
            .field("config", self.config())
            .field("idle_sessions", &self.idle_sessions())
            .finish_non_exhaustive()
    }
}
