use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, bail};
use warden_auth::{AuthConfig, PasswordCriteria};
use warden_core::Rank;

/// Which storage adapter backs the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    Memory,
    Postgres { database_url: String },
}

/// Initial administrator created at startup when absent.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminConfig {
    pub username: String,
    pub password: String,
    pub rank: Rank,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("rank", &self.rank)
            .finish()
    }
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub storage: StorageConfig,
    /// Root directory for signing keys and service-account descriptors.
    pub static_root: PathBuf,
    pub auth: AuthConfig,
    pub admin: Option<AdminConfig>,
}

impl ServerConfig {
    /// Load configuration from `.env` (if present) and the environment.
    ///
    /// | Env Var                           | Default        |
    /// |-----------------------------------|----------------|
    /// | `WARDEN_BIND_ADDR`                | `0.0.0.0:8080` |
    /// | `WARDEN_STORAGE`                  | `postgres` (`memory` for dev) |
    /// | `DATABASE_URL`                    | required for `postgres` |
    /// | `WARDEN_STATIC_ROOT`              | `./static`     |
    /// | `WARDEN_TOKEN_ISSUER`             | `warden`       |
    /// | `WARDEN_TOKEN_LIFETIME_SECS`      | `3600`         |
    /// | `WARDEN_CLIENT_MANAGEMENT_RANK`   | `10`           |
    /// | `WARDEN_PASSWORD_MIN_LENGTH`      | `8`            |
    /// | `WARDEN_PASSWORD_REQUIRE_LOWER`   | `true`         |
    /// | `WARDEN_PASSWORD_REQUIRE_UPPER`   | `true`         |
    /// | `WARDEN_PASSWORD_REQUIRE_DIGIT`   | `true`         |
    /// | `WARDEN_PASSWORD_REQUIRE_SYMBOL`  | `true`         |
    /// | `WARDEN_ADMIN_USERNAME`           | unset          |
    /// | `WARDEN_ADMIN_PASSWORD`           | unset          |
    /// | `WARDEN_ADMIN_RANK`               | `100`          |
    pub fn from_env() -> anyhow::Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(e).context("failed to load .env");
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let bind_addr = parse("WARDEN_BIND_ADDR", &get("WARDEN_BIND_ADDR", "0.0.0.0:8080"))?;

        let storage = match get("WARDEN_STORAGE", "postgres").as_str() {
            "postgres" => StorageConfig::Postgres {
                database_url: lookup("DATABASE_URL")
                    .context("DATABASE_URL must be set when WARDEN_STORAGE=postgres")?,
            },
            "memory" => StorageConfig::Memory,
            other => bail!("WARDEN_STORAGE must be 'memory' or 'postgres', got '{other}'"),
        };

        let password_criteria = PasswordCriteria {
            min_length: parse_var(&get, "WARDEN_PASSWORD_MIN_LENGTH", "8")?,
            require_lower: parse_var(&get, "WARDEN_PASSWORD_REQUIRE_LOWER", "true")?,
            require_upper: parse_var(&get, "WARDEN_PASSWORD_REQUIRE_UPPER", "true")?,
            require_digit: parse_var(&get, "WARDEN_PASSWORD_REQUIRE_DIGIT", "true")?,
            require_symbol: parse_var(&get, "WARDEN_PASSWORD_REQUIRE_SYMBOL", "true")?,
        };

        let client_management_rank = parse_var(&get, "WARDEN_CLIENT_MANAGEMENT_RANK", "10")?;
        let auth = AuthConfig {
            token_issuer: get("WARDEN_TOKEN_ISSUER", "warden"),
            token_lifetime_secs: parse_var(&get, "WARDEN_TOKEN_LIFETIME_SECS", "3600")?,
            client_management_rank: Rank::new(client_management_rank),
            password_criteria,
        };

        let admin = match (lookup("WARDEN_ADMIN_USERNAME"), lookup("WARDEN_ADMIN_PASSWORD")) {
            (Some(username), Some(password)) => Some(AdminConfig {
                username,
                password,
                rank: Rank::new(parse_var(&get, "WARDEN_ADMIN_RANK", "100")?),
            }),
            (None, None) => None,
            _ => bail!("WARDEN_ADMIN_USERNAME and WARDEN_ADMIN_PASSWORD must be set together"),
        };

        Ok(Self {
            bind_addr,
            storage,
            static_root: PathBuf::from(get("WARDEN_STATIC_ROOT", "./static")),
            auth,
            admin,
        })
    }
}

/// Parse `key`, falling back to `default` when unset.
fn parse_var<T>(get: impl Fn(&str, &str) -> String, key: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parse(key, &get(key, default))
}

fn parse<T>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("{key} has an invalid value '{raw}'"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<ServerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/warden")]).unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(
            config.storage,
            StorageConfig::Postgres {
                database_url: "postgres://localhost/warden".into()
            }
        );
        assert_eq!(config.static_root, PathBuf::from("./static"));
        assert_eq!(config.auth, AuthConfig::default());
        assert!(config.admin.is_none());
    }

    #[test]
    fn memory_storage_is_opt_in() {
        let err = load(&[]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));

        let config = load(&[("WARDEN_STORAGE", "memory")]).unwrap();
        assert_eq!(config.storage, StorageConfig::Memory);
    }

    #[test]
    fn overrides() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/warden"),
            ("WARDEN_TOKEN_LIFETIME_SECS", "120"),
            ("WARDEN_PASSWORD_REQUIRE_SYMBOL", "false"),
            ("WARDEN_ADMIN_USERNAME", "root"),
            ("WARDEN_ADMIN_PASSWORD", "Secret1!"),
        ])
        .unwrap();
        assert_eq!(
            config.storage,
            StorageConfig::Postgres {
                database_url: "postgres://localhost/warden".into()
            }
        );
        assert_eq!(config.auth.token_lifetime_secs, 120);
        assert!(!config.auth.password_criteria.require_symbol);
        let admin = config.admin.unwrap();
        assert_eq!(admin.rank, Rank::new(100));
        assert!(!format!("{admin:?}").contains("Secret1!"));
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let memory = ("WARDEN_STORAGE", "memory");
        let err = load(&[memory, ("WARDEN_TOKEN_LIFETIME_SECS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("WARDEN_TOKEN_LIFETIME_SECS"));

        assert!(load(&[("WARDEN_STORAGE", "postgres")]).is_err());
        assert!(load(&[("WARDEN_STORAGE", "redis")]).is_err());
        assert!(load(&[memory, ("WARDEN_ADMIN_USERNAME", "root")]).is_err());
    }
}
