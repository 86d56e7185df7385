use std::{collections::BTreeMap, fs, path::Path};

use anyhow::Context;
use serde::Deserialize;
use sqlcode_core::ConnectionConfig;

/// Deployment targets, loaded from `sqlcode.yaml`. Passwords never live in
/// the file; `password_env` names the environment variable to read at
/// connect time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Config {
    pub databases: BTreeMap<String, TargetConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TargetConfig {
    pub driver: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password_env: Option<String>,
    pub database: String,
}

impl TargetConfig {
    pub(crate) fn connection(&self) -> ConnectionConfig {
        let password = self
            .password_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok());
        ConnectionConfig {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password,
            database: self.database.clone(),
        }
    }
}

pub(crate) fn load(path: &Path) -> anyhow::Result<Config> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("while reading `{}`", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("while parsing `{}`", path.display()))
}
