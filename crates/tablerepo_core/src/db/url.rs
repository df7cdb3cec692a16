//! Connection URL parsing.
//!
//! # Responsibility
//! - Recognize SQLAlchemy-style URLs for SQLite and PostgreSQL.
//! - Provide a credential-free rendering for diagnostics.
//!
//! # Invariants
//! - Parsing never opens a connection.
//! - `redacted()` never contains the password.

use super::ConstructionError;
use crate::mapper::Dialect;
use std::path::PathBuf;

const REDACTED_PASSWORD: &str = "***";

/// Storage target resolved from a URL.
#[derive(Debug, Clone)]
pub enum Backend {
    /// Throwaway SQLite database private to one `Database` and removed
    /// with it.
    SqlitePrivate,
    SqliteFile(PathBuf),
    #[cfg(feature = "postgres")]
    Postgres(Box<postgres::Config>),
}

impl Backend {
    pub fn dialect(&self) -> Dialect {
        match self {
            Self::SqlitePrivate | Self::SqliteFile(_) => Dialect::Sqlite,
            #[cfg(feature = "postgres")]
            Self::Postgres(_) => Dialect::Postgres,
        }
    }
}

/// A parsed connection URL.
#[derive(Clone)]
pub struct DatabaseUrl {
    raw: String,
    backend: Backend,
}

impl std::fmt::Debug for DatabaseUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseUrl")
            .field("url", &self.redacted())
            .field("backend", &self.backend)
            .finish()
    }
}

impl DatabaseUrl {
    /// Parses `sqlite://`, `sqlite:///path`, `postgresql://...` URLs.
    ///
    /// A `+driver` suffix on the scheme (`postgresql+psycopg2`) is accepted
    /// and ignored.
    pub fn parse(raw: &str) -> Result<Self, ConstructionError> {
        let trimmed = raw.trim();
        let (scheme, rest) = trimmed.split_once("://").ok_or_else(|| {
            ConstructionError::InvalidUrl(format!(
                "`{}` has no scheme",
                redact(trimmed)
            ))
        })?;
        let backend_name = scheme
            .split_once('+')
            .map_or(scheme, |(backend, _driver)| backend)
            .to_ascii_lowercase();

        let backend = match backend_name.as_str() {
            "sqlite" => parse_sqlite(rest)?,
            "postgresql" | "postgres" => parse_postgres(rest)?,
            "" => {
                return Err(ConstructionError::InvalidUrl(
                    "scheme is empty".to_string(),
                ))
            }
            other => return Err(ConstructionError::UnsupportedBackend(other.to_string())),
        };

        Ok(Self {
            raw: trimmed.to_string(),
            backend,
        })
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn dialect(&self) -> Dialect {
        self.backend.dialect()
    }

    /// URL with any password replaced by `***`.
    pub fn redacted(&self) -> String {
        redact(&self.raw)
    }
}

fn parse_sqlite(rest: &str) -> Result<Backend, ConstructionError> {
    let location = rest.split_once('?').map_or(rest, |(path, _query)| path);
    match location {
        "" | "/:memory:" | ":memory:" => Ok(Backend::SqlitePrivate),
        path if path.starts_with('/') => {
            let decoded = urlencoding::decode(&path[1..]).map_err(|err| {
                ConstructionError::InvalidUrl(format!("sqlite path is not valid UTF-8: {err}"))
            })?;
            Ok(Backend::SqliteFile(PathBuf::from(decoded.into_owned())))
        }
        other => Err(ConstructionError::InvalidUrl(format!(
            "sqlite urls take the form sqlite:///<path>, got host `{other}`"
        ))),
    }
}

#[cfg(feature = "postgres")]
fn parse_postgres(rest: &str) -> Result<Backend, ConstructionError> {
    use std::str::FromStr;

    let normalized = format!("postgresql://{rest}");
    let config = postgres::Config::from_str(&normalized).map_err(|err| {
        ConstructionError::InvalidUrl(format!("{}: {err}", redact(&normalized)))
    })?;
    if config.get_hosts().is_empty() {
        return Err(ConstructionError::InvalidUrl(
            "postgresql url has no host".to_string(),
        ));
    }
    Ok(Backend::Postgres(Box::new(config)))
}

#[cfg(not(feature = "postgres"))]
fn parse_postgres(_rest: &str) -> Result<Backend, ConstructionError> {
    Err(ConstructionError::UnsupportedBackend(
        "postgresql (built without the `postgres` feature)".to_string(),
    ))
}

/// Replaces the password component of `url`, and any `password` query
/// parameter, with a placeholder.
///
/// The userinfo ends at the last `@`, so a password holding a raw `@` or
/// `/` is still masked. When that split is ambiguous the URL is masked more
/// rather than less.
pub fn redact(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let rest = match rest.rsplit_once('@') {
        Some((userinfo, tail)) => match userinfo.split_once(':') {
            Some((user, _password)) if !user.contains(['/', '?', '#']) => {
                format!("{user}:{REDACTED_PASSWORD}@{tail}")
            }
            _ => rest.to_string(),
        },
        None => rest.to_string(),
    };
    format!("{scheme}://{}", redact_query_password(&rest))
}

fn redact_query_password(rest: &str) -> String {
    let Some((head, query)) = rest.split_once('?') else {
        return rest.to_string();
    };
    let pairs = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if key.eq_ignore_ascii_case("password") => {
                format!("{key}={REDACTED_PASSWORD}")
            }
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>();
    format!("{head}?{}", pairs.join("&"))
}
