//! Database connection management.

use std::time::Duration;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use tiberius::{AuthMethod, Client, EncryptionLevel, SqlBrowser};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info};

use crate::config::{DbAuth, DbConfig};
use crate::{Error, Result};

pub type MssqlClient = Client<Compat<TcpStream>>;

/// Upper bound for establishing a connection or checking one out.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Opens SQL Server connections for the pool.
pub struct MssqlConnectionManager {
    config: tiberius::Config,
}

impl MssqlConnectionManager {
    pub fn new(config: tiberius::Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl bb8::ManageConnection for MssqlConnectionManager {
    type Connection = MssqlClient;
    type Error = tiberius::error::Error;

    async fn connect(&self) -> std::result::Result<Self::Connection, Self::Error> {
        // Resolves the port through SQL Server Browser when an instance name is set.
        let tcp = TcpStream::connect_named(&self.config).await?;
        tcp.set_nodelay(true)?;
        Client::connect(self.config.clone(), tcp.compat_write()).await
    }

    async fn is_valid(&self, conn: &mut Self::Connection) -> std::result::Result<(), Self::Error> {
        conn.simple_query("SELECT 1").await?.into_row().await?;
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

/// Build the driver configuration.
pub fn tiberius_config(db: &DbConfig) -> Result<tiberius::Config> {
    let mut config = tiberius::Config::new();

    config.host(&db.address.host);
    if let Some(instance) = &db.address.instance_name {
        config.instance_name(instance);
    }
    if let Some(port) = db.address.port {
        config.port(port);
    }

    config.database(&db.database);
    config.authentication(auth_method(&db.auth)?);
    config.encryption(if db.encrypt {
        EncryptionLevel::Required
    } else {
        EncryptionLevel::Off
    });
    if db.trust_server_certificate {
        config.trust_cert();
    }

    Ok(config)
}

fn auth_method(auth: &DbAuth) -> Result<AuthMethod> {
    match auth {
        DbAuth::SqlServer { user, password } => Ok(AuthMethod::sql_server(user, password)),
        #[cfg(windows)]
        DbAuth::Ntlm {
            domain,
            user_name,
            password,
        } => {
            let user = if domain.is_empty() {
                user_name.clone()
            } else {
                format!("{}\\{}", domain, user_name)
            };
            Ok(AuthMethod::windows(user, password))
        }
        #[cfg(not(windows))]
        DbAuth::Ntlm { .. } => Err(Error::Config(
            "DB_AUTH=ntlm is only supported on Windows builds".to_string(),
        )),
    }
}

/// Builds the bb8 manager for a database configuration.
pub type ManagerFactory<M> = Box<dyn Fn(&DbConfig) -> Result<M> + Send + Sync>;

/// Owns the connection pool.
///
/// The pool is created on first use and rebuilt whenever it has lost all of
/// its connections. Creation is serialized, so concurrent callers share a
/// single attempt. A failed attempt is reported once and never retried here.
pub struct ConnectionManager<M: bb8::ManageConnection = MssqlConnectionManager> {
    db: DbConfig,
    factory: ManagerFactory<M>,
    pool: Mutex<Option<Pool<M>>>,
}

impl ConnectionManager<MssqlConnectionManager> {
    pub fn new(db: DbConfig) -> Self {
        Self::with_factory(db, |db| Ok(MssqlConnectionManager::new(tiberius_config(db)?)))
    }
}

impl<M> ConnectionManager<M>
where
    M: bb8::ManageConnection,
    M::Error: std::fmt::Display,
{
    pub fn with_factory(
        db: DbConfig,
        factory: impl Fn(&DbConfig) -> Result<M> + Send + Sync + 'static,
    ) -> Self {
        Self {
            db,
            factory: Box::new(factory),
            pool: Mutex::new(None),
        }
    }

    /// Return the live pool, connecting if needed.
    pub async fn pool(&self) -> Result<Pool<M>> {
        let mut cached = self.pool.lock().await;

        if let Some(pool) = cached.as_ref() {
            if pool.state().connections > 0 {
                return Ok(pool.clone());
            }
            debug!("Cached pool has no live connections, reconnecting");
        }

        let pool = self.connect().await?;
        *cached = Some(pool.clone());
        Ok(pool)
    }

    /// Check out a connection from the pool.
    pub async fn get_connection(&self) -> Result<PooledConnection<'static, M>> {
        let pool = self.pool().await?;
        Ok(pool.get_owned().await?)
    }

    /// Drop the cached pool. Checked-out connections close when returned.
    pub async fn close(&self) {
        if self.pool.lock().await.take().is_some() {
            info!("Database connection pool closed");
        }
    }

    async fn connect(&self) -> Result<Pool<M>> {
        let manager = (self.factory)(&self.db)?;

        // min_idle forces one real connection so failures surface here.
        let builder = Pool::builder()
            .max_size(self.db.pool_max)
            .min_idle(Some(1))
            .retry_connection(false)
            .connection_timeout(CONNECT_TIMEOUT);

        let pool = timeout(CONNECT_TIMEOUT, builder.build(manager))
            .await
            .map_err(|_| {
                Error::Connection(format!(
                    "Timed out connecting to {} after {}s",
                    self.db.address.host,
                    CONNECT_TIMEOUT.as_secs()
                ))
            })?
            .map_err(|e| Error::Connection(e.to_string()))?;

        info!(
            host = %self.db.address.host,
            instance = ?self.db.address.instance_name,
            database = %self.db.database,
            max_connections = self.db.pool_max,
            "Database connection pool created"
        );

        Ok(pool)
    }
}
