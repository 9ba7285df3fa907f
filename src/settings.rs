//! Launch settings read from the resolved store.
//!
//! These are the values a server launcher and a migration runner need. Every
//! read goes through the store → environment chain; nothing here starts a
//! server or touches a database.

use serde::Serialize;
use tracing::debug;

use crate::env::EnvironmentFallback;
use crate::error::AppError;
use crate::store::ConfigurationStore;

pub const DEFAULT_APP_PACKAGE: &str = "qzui";
pub const DEFAULT_MODE: &str = "dev";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BIND_IP: &str = "0.0.0.0";
pub const DEFAULT_WEB_APP: &str = ".";
pub const WEB_INF_LOCATION: &str = "/WEB-INF/web.xml";
pub const DEFAULT_TABLE_PREFIX: &str = "QRTZ_";

/// Pin `restx.app.package` and make `restx.mode` explicit (default `dev`).
///
/// Run after interpolation so the written values are final.
pub fn apply_runtime_defaults<E>(store: &mut ConfigurationStore, env: &E, app_package: &str)
where
    E: EnvironmentFallback + ?Sized,
{
    store.insert("restx.app.package", app_package);
    let mode = store.get_or("restx.mode", env, DEFAULT_MODE);
    debug!(app_package, mode = %mode, "runtime defaults applied");
    store.insert("restx.mode", mode);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerSettings {
    pub port: u16,
    pub bind_ip: String,
    pub web_app: String,
    pub web_inf: String,
    pub mode: String,
}

impl ServerSettings {
    pub fn from_store<E>(store: &ConfigurationStore, env: &E) -> Result<Self, AppError>
    where
        E: EnvironmentFallback + ?Sized,
    {
        let port = match store.lookup("restx.bind.port", env) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| {
                AppError::Config(format!("restx.bind.port: invalid port '{raw}': {e}"))
            })?,
            None => DEFAULT_PORT,
        };
        let web_app = store.get_or("restx.webapp", env, DEFAULT_WEB_APP);
        let web_inf = store
            .lookup("restx.webapp.webinf", env)
            .unwrap_or_else(|| format!("{web_app}{WEB_INF_LOCATION}"));

        Ok(Self {
            port,
            bind_ip: store.get_or("restx.bind.ip", env, DEFAULT_BIND_IP),
            web_app,
            web_inf,
            mode: store.get_or("restx.mode", env, DEFAULT_MODE),
        })
    }
}

/// Database migration inputs. `flyway.*` keys win over the
/// `restx.datasource.*` ones they default to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationSettings {
    pub url: Option<String>,
    pub user: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub table_prefix: String,
    pub locations: Vec<String>,
}

impl MigrationSettings {
    pub fn from_store<E>(store: &ConfigurationStore, env: &E) -> Self
    where
        E: EnvironmentFallback + ?Sized,
    {
        let either = |primary: &str, fallback: &str| {
            store.lookup(primary, env).or_else(|| store.lookup(fallback, env))
        };

        Self {
            url: either("flyway.url", "restx.datasource.url"),
            user: either("flyway.user", "restx.datasource.username"),
            password: either("flyway.password", "restx.datasource.password"),
            table_prefix: store.get_or(
                "org.quartz.jobStore.tablePrefix",
                env,
                DEFAULT_TABLE_PREFIX,
            ),
            locations: store
                .lookup("flyway.locations", env)
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
        }
    }

    /// Copy the effective connection values into `flyway.*`. Absent values
    /// are skipped rather than written as empty strings.
    pub fn write_back(&self, store: &mut ConfigurationStore) {
        let pairs = [
            ("flyway.url", &self.url),
            ("flyway.user", &self.user),
            ("flyway.password", &self.password),
        ];
        for (key, value) in pairs {
            if let Some(value) = value {
                store.insert(key, value.as_str());
            }
        }
    }
}

/// Split a `,`/`;` separated list, trimming items and dropping empty ones.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::NoEnv;
    use std::collections::HashMap;

    fn store(pairs: &[(&str, &str)]) -> ConfigurationStore {
        pairs.iter().copied().collect()
    }

    #[test]
    fn server_defaults() {
        let s = ServerSettings::from_store(&ConfigurationStore::new(), &NoEnv).unwrap();
        assert_eq!(
            s,
            ServerSettings {
                port: 8080,
                bind_ip: "0.0.0.0".into(),
                web_app: ".".into(),
                web_inf: "./WEB-INF/web.xml".into(),
                mode: "dev".into(),
            }
        );
    }

    #[test]
    fn web_inf_follows_web_app() {
        let st = store(&[("restx.webapp", "/srv/qzui"), ("restx.bind.port", " 9000 ")]);
        let s = ServerSettings::from_store(&st, &NoEnv).unwrap();
        assert_eq!(s.web_inf, "/srv/qzui/WEB-INF/web.xml");
        assert_eq!(s.port, 9000);
    }

    #[test]
    fn port_from_environment() {
        let env = HashMap::from([("restx.bind.port".to_string(), "5000".to_string())]);
        let s = ServerSettings::from_store(&ConfigurationStore::new(), &env).unwrap();
        assert_eq!(s.port, 5000);
    }

    #[test]
    fn invalid_port_errors() {
        let st = store(&[("restx.bind.port", "${PORT}")]);
        let msg = ServerSettings::from_store(&st, &NoEnv).unwrap_err().to_string();
        assert!(msg.contains("restx.bind.port"));
        assert!(msg.contains("${PORT}"));

        let st = store(&[("restx.bind.port", "70000")]);
        assert!(ServerSettings::from_store(&st, &NoEnv).is_err());
    }

    #[test]
    fn runtime_defaults_keep_explicit_mode() {
        let mut st = store(&[("restx.mode", "prod")]);
        apply_runtime_defaults(&mut st, &NoEnv, DEFAULT_APP_PACKAGE);
        assert_eq!(st.get("restx.mode"), Some("prod"));
        assert_eq!(st.get("restx.app.package"), Some("qzui"));

        let mut st = ConfigurationStore::new();
        apply_runtime_defaults(&mut st, &NoEnv, "app");
        assert_eq!(st.get("restx.mode"), Some("dev"));
        assert_eq!(st.get("restx.app.package"), Some("app"));
    }

    #[test]
    fn migration_falls_back_to_datasource() {
        let st = store(&[
            ("restx.datasource.url", "jdbc:h2:/tmp/db"),
            ("restx.datasource.username", "sa"),
            ("flyway.user", "migrator"),
        ]);
        let m = MigrationSettings::from_store(&st, &NoEnv);
        assert_eq!(m.url.as_deref(), Some("jdbc:h2:/tmp/db"));
        assert_eq!(m.user.as_deref(), Some("migrator"));
        assert_eq!(m.password, None);
        assert_eq!(m.table_prefix, "QRTZ_");
        assert!(m.locations.is_empty());
    }

    #[test]
    fn migration_write_back_skips_absent() {
        let mut st = store(&[
            ("restx.datasource.url", "jdbc:h2:/tmp/db"),
            ("org.quartz.jobStore.tablePrefix", "JOBS_"),
            ("flyway.locations", "db/migration; db/extra ,"),
        ]);
        let m = MigrationSettings::from_store(&st, &NoEnv);
        assert_eq!(m.table_prefix, "JOBS_");
        assert_eq!(m.locations, ["db/migration", "db/extra"]);

        m.write_back(&mut st);
        assert_eq!(st.get("flyway.url"), Some("jdbc:h2:/tmp/db"));
        assert!(!st.contains_key("flyway.user"));
        assert!(!st.contains_key("flyway.password"));
    }

    #[test]
    fn password_is_not_serialized() {
        let st = store(&[("flyway.password", "hunter2")]);
        let m = MigrationSettings::from_store(&st, &NoEnv);
        let json = serde_json::to_string(&m).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(!json.contains("password"));
    }

    #[test]
    fn split_list_trims() {
        assert_eq!(split_list(" a, b;c ;; "), ["a", "b", "c"]);
        assert!(split_list("").is_empty());
    }
}
