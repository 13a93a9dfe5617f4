//! Loader for run configuration with YAML + environment overlays.
//!
//! The YAML document names the researchers to watch and bounds each run:
//!
//! ```yaml
//! orcid_ids:
//!   - 0000-0002-1825-0097
//! days_back: 30
//! max_posts_total: 5      # optional, default 5
//! hashtags: [openscience] # optional, default empty
//! ```
//!
//! Any top-level key can be overridden with a `HERALD_<KEY>` environment
//! variable (lists are comma separated), and string values may reference
//! `${VAR}` placeholders which are expanded after the sources are merged.
//! Publishing credentials never live in the file; see [`Credentials`].
use config::{Config, ConfigError, Environment, File};
use herald_common::HeraldError;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;
use std::path::Path;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

pub const HANDLE_ENV: &str = "BLUESKY_HANDLE";
pub const APP_PASSWORD_ENV: &str = "BLUESKY_APP_PASSWORD";

#[derive(Debug, Clone, Deserialize)]
pub struct HeraldConfig {
    /// ORCID iDs to check, in order.
    pub orcid_ids: Vec<String>,
    /// Lookback window in days.
    pub days_back: u32,
    /// Global post budget per run.
    #[serde(default = "default_max_posts_total")]
    pub max_posts_total: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hashtags: Vec<String>,
    #[serde(default = "default_registry_base_url")]
    pub registry_base_url: String,
    #[serde(default = "default_bluesky_service")]
    pub bluesky_service: String,
    /// Pause after each submitted post.
    #[serde(default = "default_post_interval_ms")]
    pub post_interval_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_max_posts_total() -> u32 {
    5
}
fn default_registry_base_url() -> String {
    "https://pub.orcid.org/v3.0/".into()
}
fn default_bluesky_service() -> String {
    "https://bsky.social".into()
}
fn default_post_interval_ms() -> u64 {
    1000
}
fn default_request_timeout_secs() -> u64 {
    30
}

fn null_as_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

impl HeraldConfig {
    /// Trim identifiers and reject blank ones.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        for (idx, id) in self.orcid_ids.iter_mut().enumerate() {
            let trimmed = id.trim();
            if trimmed.is_empty() {
                return Err(ConfigError::Message(format!(
                    "orcid_ids[{idx}] is blank"
                )));
            }
            *id = trimmed.to_string();
        }
        if self.registry_base_url.trim().is_empty() {
            return Err(ConfigError::Message("registry_base_url is blank".into()));
        }
        if self.bluesky_service.trim().is_empty() {
            return Err(ConfigError::Message("bluesky_service is blank".into()));
        }
        Ok(self)
    }
}

/// Publishing account credentials, read from the process environment only.
#[derive(Clone)]
pub struct Credentials {
    pub handle: String,
    pub app_password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("handle", &self.handle)
            .field("app_password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Read `BLUESKY_HANDLE` and `BLUESKY_APP_PASSWORD`; empty values count as missing.
    pub fn from_env() -> herald_common::Result<Self> {
        let handle = non_empty_env(HANDLE_ENV)?;
        let app_password = non_empty_env(APP_PASSWORD_ENV)?;
        Ok(Self {
            handle,
            app_password,
        })
    }
}

fn non_empty_env(name: &'static str) -> herald_common::Result<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(HeraldError::MissingCredential(name))
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("HERALD")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("orcid_ids")
        .with_list_parse_key("hashtags")
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct HeraldConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for HeraldConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl HeraldConfigLoader {
    /// Start an empty builder; add YAML sources, then [`load`](Self::load) applies
    /// `HERALD_` env overrides on top.
    ///
    /// ```
    /// use herald_config::HeraldConfigLoader;
    ///
    /// let config = HeraldConfigLoader::new()
    ///     .with_yaml_str("orcid_ids: ['0000-0002-1825-0097']\ndays_back: 7")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.days_back, 7);
    /// assert_eq!(config.max_posts_total, 5);
    /// assert!(config.hashtags.is_empty());
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    ///
    /// ```
    /// use herald_config::HeraldConfigLoader;
    ///
    /// unsafe { std::env::set_var("HERALD_DOC_TAG", "openscience"); }
    ///
    /// let config = HeraldConfigLoader::new()
    ///     .with_yaml_str(r##"
    /// orcid_ids: ["0000-0001-5109-3700"]
    /// days_back: 30
    /// hashtags: ["${HERALD_DOC_TAG}", "#papers"]
    /// "##)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.hashtags, vec!["openscience", "#papers"]);
    ///
    /// unsafe { std::env::remove_var("HERALD_DOC_TAG"); }
    /// ```
    pub fn load(self) -> Result<HeraldConfig, ConfigError> {
        // Environment is added last so it overrides every file/inline source.
        let cfg = self.builder.add_source(env_source()).build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: HeraldConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;

        typed.validate()
    }
}
