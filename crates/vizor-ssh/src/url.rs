//! Database URL handling for tunnelled connections.

use crate::error::{SshError, SshResult};
use url::Url;

/// Default port for a database URL scheme.
///
/// Driver suffixes such as `postgresql+psycopg2` are ignored.
#[must_use]
pub fn default_port(scheme: &str) -> Option<u16> {
    let backend = scheme.split('+').next().unwrap_or(scheme);
    match backend {
        "postgresql" | "postgres" => Some(5432),
        "mysql" | "mariadb" => Some(3306),
        "mssql" => Some(1433),
        "oracle" => Some(1521),
        "redshift" => Some(5439),
        "clickhouse" => Some(8123),
        "trino" | "presto" => Some(8080),
        "snowflake" => Some(443),
        _ => None,
    }
}

/// Host and port a database URL points at.
pub fn remote_target(database_url: &str) -> SshResult<(String, u16)> {
    let url = parse(database_url)?;
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| SshError::InvalidDatabaseUrl("URL has no host".to_string()))?
        .to_string();
    let port = url
        .port()
        .or_else(|| default_port(url.scheme()))
        .ok_or_else(|| {
            SshError::InvalidDatabaseUrl(format!(
                "No port given and no default known for '{}'",
                url.scheme()
            ))
        })?;
    Ok((host, port))
}

/// Points `database_url` at the local end of a tunnel.
pub fn rewrite_database_url(database_url: &str, local_host: &str, local_port: u16) -> SshResult<String> {
    let mut url = parse(database_url)?;
    url.set_host(Some(local_host))
        .map_err(|e| SshError::InvalidDatabaseUrl(e.to_string()))?;
    url.set_port(Some(local_port))
        .map_err(|()| SshError::InvalidDatabaseUrl("URL cannot carry a port".to_string()))?;
    Ok(url.to_string())
}

fn parse(database_url: &str) -> SshResult<Url> {
    Url::parse(database_url).map_err(|e| SshError::InvalidDatabaseUrl(e.to_string()))
}
