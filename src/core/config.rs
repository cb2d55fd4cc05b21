//! Configuration: TOML environments file + env var overrides + defaults.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SquadError};
use crate::topics::TopicId;

/// Environment variable naming an alternative environments file.
pub const ENV_FILE_VAR: &str = "SQUAD_ENVIRONMENT_FILE";
/// Environment variable overriding the selected environment.
pub const ENV_NAME_VAR: &str = "SQUAD_ENVIRONMENT";

const KEYCLOAK_SUFFIX: &str = "/auth";
const AS_SUFFIX: &str = "/account-server-api";
const DM_SUFFIX: &str = "/data-manager-api";

/// Fully resolved configuration.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub path: PathBuf,
    pub environment: Environment,
    pub dashboard: DashboardConfig,
}

/// Connection details for one named deployment, with URLs normalised.
#[derive(Clone, Serialize, PartialEq, Eq)]
pub struct Environment {
    pub name: String,
    pub keycloak_hostname: String,
    pub keycloak_url: String,
    pub keycloak_realm: String,
    pub keycloak_as_client_id: String,
    pub keycloak_dm_client_id: String,
    pub as_hostname: String,
    pub as_url: String,
    pub dm_hostname: String,
    pub dm_url: String,
    pub user: String,
    #[serde(skip)]
    pub password: String,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("name", &self.name)
            .field("keycloak_url", &self.keycloak_url)
            .field("keycloak_realm", &self.keycloak_realm)
            .field("as_url", &self.as_url)
            .field("dm_url", &self.dm_url)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Dashboard cadence and request settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DashboardConfig {
    pub tick_ms: u64,
    pub refresh_interval_secs: u64,
    pub request_timeout_ms: u64,
    pub initial_topic: String,
    /// Per-topic refresh interval overrides in seconds, keyed by topic name.
    pub intervals: BTreeMap<String, u64>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            tick_ms: 2_000,
            refresh_interval_secs: 20,
            request_timeout_ms: 10_000,
            initial_topic: TopicId::Instances.name().to_string(),
            intervals: BTreeMap::new(),
        }
    }
}

impl DashboardConfig {
    #[must_use]
    pub const fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Refresh interval for `topic`, honouring per-topic overrides.
    #[must_use]
    pub fn interval_for(&self, topic: TopicId) -> Duration {
        let secs = self
            .intervals
            .get(topic.name())
            .copied()
            .unwrap_or(self.refresh_interval_secs);
        Duration::from_secs(secs)
    }

    /// The validated initial topic; falls back to instances.
    #[must_use]
    pub fn initial_topic(&self) -> TopicId {
        TopicId::from_name(&self.initial_topic).unwrap_or(TopicId::Instances)
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("tick_ms", self.tick_ms),
            ("refresh_interval_secs", self.refresh_interval_secs),
            ("request_timeout_ms", self.request_timeout_ms),
        ] {
            if value == 0 {
                return Err(SquadError::InvalidConfig {
                    details: format!("dashboard.{name} must be > 0"),
                });
            }
        }
        self.initial_topic.parse::<TopicId>()?;
        for (name, secs) in &self.intervals {
            name.parse::<TopicId>()?;
            if *secs == 0 {
                return Err(SquadError::InvalidConfig {
                    details: format!("dashboard.intervals.{name} must be > 0"),
                });
            }
        }
        Ok(())
    }
}

// ──────────────────── raw file model ────────────────────

#[derive(Debug, Deserialize)]
struct RawFile {
    environment: Option<String>,
    #[serde(default)]
    environments: BTreeMap<String, RawEnvironment>,
    #[serde(default)]
    dashboard: DashboardConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawEnvironment {
    keycloak_hostname: Option<String>,
    keycloak_realm: Option<String>,
    keycloak_as_client_id: Option<String>,
    keycloak_dm_client_id: Option<String>,
    as_hostname: Option<String>,
    dm_hostname: Option<String>,
    user: Option<String>,
    password: Option<String>,
}

impl Config {
    /// Directory holding the environments file and the dashboard log.
    #[must_use]
    pub fn data_dir() -> PathBuf {
        home_dir().join(".squad")
    }

    #[must_use]
    pub fn default_path() -> PathBuf {
        Self::data_dir().join("environments.toml")
    }

    #[must_use]
    pub fn default_log_file() -> PathBuf {
        Self::data_dir().join("squad.log")
    }

    /// Load from an explicit path, `SQUAD_ENVIRONMENT_FILE`, or the default
    /// path, then apply env overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, env_var)
    }

    /// [`Config::load`] with an injectable environment lookup.
    pub fn load_with<F>(path: Option<&Path>, mut lookup: F) -> Result<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let path = path.map_or_else(
            || lookup(ENV_FILE_VAR).map_or_else(Self::default_path, |raw| expand_home(&raw)),
            expand_home_path,
        );
        if !path.exists() {
            return Err(SquadError::MissingConfig { path });
        }
        let raw = fs::read_to_string(&path).map_err(|source| SquadError::io(&path, source))?;
        Self::from_toml_with(&raw, &path, lookup)
    }

    /// Parse an already-read environments file.
    pub fn from_toml_with<F>(raw: &str, path: &Path, mut lookup: F) -> Result<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if raw.trim().is_empty() {
            return Err(SquadError::InvalidConfig {
                details: format!("{} is empty", path.display()),
            });
        }
        let mut file: RawFile = toml::from_str(raw)?;

        let name = lookup(ENV_NAME_VAR)
            .or_else(|| file.environment.clone())
            .ok_or_else(|| SquadError::InvalidConfig {
                details: format!("{} does not select an 'environment'", path.display()),
            })?;
        let raw_env =
            file.environments
                .remove(&name)
                .ok_or_else(|| SquadError::UnknownEnvironment {
                    name: name.clone(),
                    path: path.to_path_buf(),
                })?;
        let environment = Environment::resolve(name, raw_env)?;

        let mut dashboard = file.dashboard;
        apply_dashboard_env_overrides_from(&mut dashboard, &mut lookup)?;
        dashboard.validate()?;

        Ok(Self {
            path: path.to_path_buf(),
            environment,
            dashboard,
        })
    }
}

fn apply_dashboard_env_overrides_from<F>(dashboard: &mut DashboardConfig, lookup: &mut F) -> Result<()>
where
    F: FnMut(&str) -> Option<String>,
{
    for (name, slot) in [
        ("SQUAD_TICK_MS", &mut dashboard.tick_ms),
        ("SQUAD_REFRESH_INTERVAL_SECS", &mut dashboard.refresh_interval_secs),
        ("SQUAD_REQUEST_TIMEOUT_MS", &mut dashboard.request_timeout_ms),
    ] {
        if let Some(raw) = lookup(name) {
            *slot = parse_env_u64(name, &raw)?;
        }
    }
    Ok(())
}

impl Environment {
    fn resolve(name: String, raw: RawEnvironment) -> Result<Self> {
        let required = |key: &str, value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| SquadError::InvalidConfig {
                    details: format!("environment '{name}' has no value for '{key}'"),
                })
        };
        let keycloak_hostname = required("keycloak-hostname", raw.keycloak_hostname)?;
        let as_hostname = required("as-hostname", raw.as_hostname)?;
        let dm_hostname = required("dm-hostname", raw.dm_hostname)?;
        Ok(Self {
            keycloak_url: normalize_url(&keycloak_hostname, KEYCLOAK_SUFFIX),
            keycloak_realm: required("keycloak-realm", raw.keycloak_realm)?,
            keycloak_as_client_id: required("keycloak-as-client-id", raw.keycloak_as_client_id)?,
            keycloak_dm_client_id: required("keycloak-dm-client-id", raw.keycloak_dm_client_id)?,
            as_url: normalize_url(&as_hostname, AS_SUFFIX),
            dm_url: normalize_url(&dm_hostname, DM_SUFFIX),
            user: required("user", raw.user)?,
            password: required("password", raw.password)?,
            keycloak_hostname,
            as_hostname,
            dm_hostname,
            name,
        })
    }

    /// Environment pointing every service at `base` (tests only).
    #[cfg(test)]
    pub(crate) fn for_tests(base: &str) -> Self {
        Self {
            name: "test".to_string(),
            keycloak_hostname: base.to_string(),
            keycloak_url: normalize_url(base, KEYCLOAK_SUFFIX),
            keycloak_realm: "squonk".to_string(),
            keycloak_as_client_id: "account-server-api".to_string(),
            keycloak_dm_client_id: "data-manager-api".to_string(),
            as_hostname: base.to_string(),
            as_url: normalize_url(base, AS_SUFFIX),
            dm_hostname: base.to_string(),
            dm_url: normalize_url(base, DM_SUFFIX),
            user: "alan".to_string(),
            password: "secret".to_string(),
        }
    }
}

/// Add `https://` when no scheme is given and make sure the URL ends in `suffix`.
#[must_use]
pub fn normalize_url(host: &str, suffix: &str) -> String {
    let mut url = if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    };
    while url.ends_with('/') {
        url.pop();
    }
    if !url.ends_with(suffix) {
        url.push_str(suffix);
    }
    url
}

fn home_dir() -> PathBuf {
    env::var_os("HOME").map_or_else(
        || {
            eprintln!("[SQUAD-CONFIG] WARNING: HOME not set, falling back to /tmp");
            PathBuf::from("/tmp")
        },
        PathBuf::from,
    )
}

fn expand_home(raw: &str) -> PathBuf {
    raw.strip_prefix("~/")
        .map_or_else(|| PathBuf::from(raw), |rest| home_dir().join(rest))
}

fn expand_home_path(path: &Path) -> PathBuf {
    path.to_str().map_or_else(|| path.to_path_buf(), expand_home)
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env_u64(name: &str, raw: &str) -> Result<u64> {
    raw.trim().parse::<u64>().map_err(|error| SquadError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const FILE: &str = r#"
environment = "im-main"

[environments.im-main]
keycloak-hostname = "squonk.example.com"
keycloak-realm = "squonk"
keycloak-as-client-id = "account-server-api"
keycloak-dm-client-id = "data-manager-api"
as-hostname = "squonk.example.com"
dm-hostname = "https://squonk.example.com/data-manager-api/"
user = "alan"
password = "secret"

[environments.local]
keycloak-hostname = "http://localhost:8080/auth"
keycloak-realm = "local"
keycloak-as-client-id = "as"
keycloak-dm-client-id = "dm"
as-hostname = "http://localhost:8081"
dm-hostname = "http://localhost:8082"
user = "dev"
password = "dev"

[dashboard]
tick_ms = 1000

[dashboard.intervals]
service-errors = 60
"#;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect()
    }

    fn parse(raw: &str, env: &[(&str, &str)]) -> Result<Config> {
        let env = vars(env);
        Config::from_toml_with(raw, Path::new("/tmp/environments.toml"), |name| {
            env.get(name).cloned()
        })
    }

    #[test]
    fn selected_environment_is_resolved_and_normalised() {
        let config = parse(FILE, &[]).unwrap();
        let env = &config.environment;
        assert_eq!(env.name, "im-main");
        assert_eq!(env.keycloak_url, "https://squonk.example.com/auth");
        assert_eq!(env.as_url, "https://squonk.example.com/account-server-api");
        assert_eq!(env.dm_url, "https://squonk.example.com/data-manager-api");
        assert_eq!(env.keycloak_hostname, "squonk.example.com");
    }

    #[test]
    fn environment_name_can_be_overridden() {
        let config = parse(FILE, &[(ENV_NAME_VAR, "local")]).unwrap();
        assert_eq!(config.environment.name, "local");
        assert_eq!(config.environment.keycloak_url, "http://localhost:8080/auth");
        assert_eq!(config.environment.as_url, "http://localhost:8081/account-server-api");
    }

    #[test]
    fn unknown_environment_is_a_configuration_error() {
        let err = parse(FILE, &[(ENV_NAME_VAR, "staging")]).unwrap_err();
        assert_eq!(err.code(), "SQD-1004");
        assert!(err.is_configuration());
    }

    #[test]
    fn missing_selection_is_rejected() {
        let raw = FILE.replace("environment = \"im-main\"", "");
        let err = parse(&raw, &[]).unwrap_err();
        assert_eq!(err.code(), "SQD-1001");
    }

    #[test]
    fn missing_required_value_is_rejected() {
        let raw = FILE.replace("password = \"secret\"\n", "");
        let err = parse(&raw, &[]).unwrap_err();
        assert!(err.to_string().contains("password"), "{err}");
    }

    #[test]
    fn empty_file_is_rejected() {
        assert_eq!(parse("  \n", &[]).unwrap_err().code(), "SQD-1001");
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert_eq!(parse("environment = ", &[]).unwrap_err().code(), "SQD-1003");
    }

    #[test]
    fn dashboard_defaults_and_overrides() {
        let config = parse(FILE, &[("SQUAD_REFRESH_INTERVAL_SECS", "30")]).unwrap();
        let dashboard = &config.dashboard;
        assert_eq!(dashboard.tick(), Duration::from_secs(1));
        assert_eq!(dashboard.request_timeout(), Duration::from_secs(10));
        assert_eq!(
            dashboard.interval_for(TopicId::Instances),
            Duration::from_secs(30)
        );
        assert_eq!(
            dashboard.interval_for(TopicId::ServiceErrors),
            Duration::from_secs(60)
        );
        assert_eq!(dashboard.initial_topic(), TopicId::Instances);
    }

    #[test]
    fn invalid_env_override_is_a_parse_error() {
        let err = parse(FILE, &[("SQUAD_TICK_MS", "fast")]).unwrap_err();
        assert_eq!(err.code(), "SQD-1003");
    }

    #[test]
    fn zero_cadence_rejected() {
        let err = parse(FILE, &[("SQUAD_TICK_MS", "0")]).unwrap_err();
        assert!(err.to_string().contains("tick_ms"));
        let raw = FILE.replace("service-errors = 60", "service-errors = 0");
        assert!(parse(&raw, &[]).is_err());
    }

    #[test]
    fn unknown_topic_names_rejected() {
        let raw = FILE.replace("service-errors = 60", "tasks = 60");
        assert_eq!(parse(&raw, &[]).unwrap_err().code(), "SQD-1005");
        let raw = FILE.replace("tick_ms = 1000", "initial_topic = \"tasks\"");
        assert_eq!(parse(&raw, &[]).unwrap_err().code(), "SQD-1005");
    }

    #[test]
    fn debug_output_hides_password() {
        let config = parse(FILE, &[]).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load_with(Some(Path::new("/nonexistent/squad.toml")), |_| None)
            .unwrap_err();
        assert_eq!(err.code(), "SQD-1002");
    }

    #[test]
    fn load_honours_environment_file_variable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("envs.toml");
        fs::write(&path, FILE).unwrap();
        let env = vars(&[(ENV_FILE_VAR, path.to_str().unwrap())]);
        let config = Config::load_with(None, |name| env.get(name).cloned()).unwrap();
        assert_eq!(config.path, path);
    }

    #[test]
    fn url_normalisation() {
        assert_eq!(normalize_url("host", "/auth"), "https://host/auth");
        assert_eq!(normalize_url("http://host/auth/", "/auth"), "http://host/auth");
        assert_eq!(
            normalize_url("https://host/", "/data-manager-api"),
            "https://host/data-manager-api"
        );
    }
}
