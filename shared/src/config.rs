//! Configuration management for the API binaries.

use std::env;
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

const DEFAULT_HTTP_PORT: u16 = 3000;
const DEFAULT_POOL_MAX: u32 = 10;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection settings
    pub database: DbConfig,
    /// Tenant identifier propagated into the database session
    pub tenant_id: Option<String>,
    /// What to do when the tenant context cannot be applied
    pub tenant_policy: TenantPolicy,
    /// HTTP listening port
    pub port: u16,
}

/// Database connection settings.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub address: ServerAddress,
    pub database: String,
    pub auth: DbAuth,
    pub encrypt: bool,
    pub trust_server_certificate: bool,
    pub pool_max: u32,
}

/// Where the SQL Server lives.
///
/// A named instance and an explicit port are two different ways of reaching
/// a server; [`ServerAddress::resolve`] applies the precedence between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub instance_name: Option<String>,
    pub port: Option<u16>,
}

impl ServerAddress {
    /// Resolve the address from the raw server string plus the optional
    /// instance name and port.
    ///
    /// `host\instance` wins over everything else and drops the port.
    pub fn resolve(server: &str, instance_name: Option<String>, port: Option<u16>) -> Self {
        match server.split_once('\\') {
            Some((host, instance)) => Self {
                host: host.to_string(),
                instance_name: Some(instance.to_string()),
                port: None,
            },
            None => Self {
                host: server.to_string(),
                instance_name,
                port,
            },
        }
    }
}

/// Database authentication mode.
#[derive(Clone, PartialEq, Eq)]
pub enum DbAuth {
    /// SQL Server login (`DB_AUTH=sql`, the default)
    SqlServer { user: String, password: String },
    /// Windows/NTLM domain login (`DB_AUTH=ntlm`)
    Ntlm {
        domain: String,
        user_name: String,
        password: String,
    },
}

impl fmt::Debug for DbAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbAuth::SqlServer { user, .. } => f
                .debug_struct("SqlServer")
                .field("user", user)
                .field("password", &"<redacted>")
                .finish(),
            DbAuth::Ntlm {
                domain, user_name, ..
            } => f
                .debug_struct("Ntlm")
                .field("domain", domain)
                .field("user_name", user_name)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

/// Policy for a failed tenant context call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TenantPolicy {
    /// Log and continue; row-level security may simply not be configured.
    #[default]
    BestEffort,
    /// Fail the request with a 500.
    Required,
}

impl FromStr for TenantPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "best-effort" | "ignore" => Ok(TenantPolicy::BestEffort),
            "required" | "abort" => Ok(TenantPolicy::Required),
            other => Err(Error::Config(format!(
                "TENANT_CONTEXT_POLICY must be 'best-effort' or 'required', got '{}'",
                other
            ))),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values are treated the same as unset ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());
        let required =
            |key: &str| var(key).ok_or_else(|| Error::Config(format!("{} not set", key)));

        let server = required("DB_SERVER")?;
        let port = var("DB_PORT").map(|p| parse_number("DB_PORT", &p)).transpose()?;
        let address = ServerAddress::resolve(&server, var("DB_INSTANCE"), port);

        let auth_mode = var("DB_AUTH")
            .unwrap_or_else(|| "sql".to_string())
            .to_lowercase();
        let auth = match auth_mode.as_str() {
            "sql" => DbAuth::SqlServer {
                user: required("DB_USER")?,
                password: required("DB_PASSWORD")?,
            },
            "ntlm" => DbAuth::Ntlm {
                domain: var("DB_DOMAIN").unwrap_or_default(),
                user_name: var("DB_USERNAME").unwrap_or_default(),
                password: var("DB_PASSWORD").unwrap_or_default(),
            },
            other => {
                return Err(Error::Config(format!(
                    "DB_AUTH must be 'sql' or 'ntlm', got '{}'",
                    other
                )))
            }
        };

        let database = DbConfig {
            address,
            database: required("DB_DATABASE")?,
            auth,
            encrypt: var("DB_ENCRYPT").as_deref() == Some("true"),
            trust_server_certificate: var("DB_TRUST_SERVER_CERT").as_deref() == Some("true"),
            pool_max: var("DB_POOL_MAX")
                .map(|n| parse_number("DB_POOL_MAX", &n))
                .transpose()?
                .unwrap_or(DEFAULT_POOL_MAX),
        };

        Ok(Self {
            database,
            tenant_id: var("TENANT_ID"),
            tenant_policy: var("TENANT_CONTEXT_POLICY")
                .map(|p| p.parse())
                .transpose()?
                .unwrap_or_default(),
            port: var("PORT")
                .map(|p| parse_number("PORT", &p))
                .transpose()?
                .unwrap_or(DEFAULT_HTTP_PORT),
        })
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} must be a number, got '{}'", key, value)))
}
