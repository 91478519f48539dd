// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use fitdash_app::{DEFAULT_SEARCH_DEBOUNCE, PageSize};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_TIMEOUT: &str = "10s";
const DEFAULT_SESSION_ID: &str = "default";
const DEFAULT_LOG_LEVEL: &str = "warn";
const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub session: Session,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            api: Api::default(),
            session: Session::default(),
            ui: Ui::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Api {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            base_url: Some(fitdash_api::DEFAULT_BASE_URL.to_owned()),
            token: None,
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub db_path: Option<String>,
    pub id: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            db_path: None,
            id: Some(DEFAULT_SESSION_ID.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub search_debounce: Option<String>,
    pub page_size: Option<u32>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            search_debounce: Some("500ms".to_owned()),
            page_size: Some(PageSize::default().get()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("FITDASH_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set FITDASH_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(fitdash_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and put values under [api], [session], [ui], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if self.version != CONFIG_VERSION {
            bail!(
                "config {} has version {}; expected 1",
                path.display(),
                self.version
            );
        }

        if let Some(base_url) = &self.api.base_url
            && base_url.trim().is_empty()
        {
            bail!("api.base_url in {} must not be empty", path.display());
        }

        if let Some(timeout) = &self.api.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "api.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(db_path) = &self.session.db_path {
            fitdash_db::validate_db_path(db_path)?;
        }

        if let Some(id) = &self.session.id
            && !is_valid_session_id(id)
        {
            bail!(
                "session.id in {} must be non-empty and must not contain '/', got {:?}",
                path.display(),
                id
            );
        }

        if let Some(debounce) = &self.ui.search_debounce {
            parse_duration(debounce)
                .with_context(|| format!("ui.search_debounce in {}", path.display()))?;
        }

        if let Some(size) = self.ui.page_size
            && PageSize::new(size).is_none()
        {
            bail!(
                "ui.page_size in {} must be one of {:?}, got {}",
                path.display(),
                PageSize::ALLOWED,
                size
            );
        }

        if let Some(level) = &self.log.level
            && !LOG_LEVELS.contains(&level.as_str())
        {
            bail!(
                "log.level in {} must be one of {}, got {:?}",
                path.display(),
                LOG_LEVELS.join(", "),
                level
            );
        }

        Ok(())
    }

    pub fn api_base_url(&self) -> &str {
        self.api
            .base_url
            .as_deref()
            .unwrap_or(fitdash_api::DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn api_token(&self) -> Option<&str> {
        self.api.token.as_deref()
    }

    pub fn api_timeout(&self) -> Result<Duration> {
        parse_duration(self.api.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.session.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => fitdash_db::default_db_path(),
        }
    }

    pub fn session_id(&self) -> &str {
        self.session.id.as_deref().unwrap_or(DEFAULT_SESSION_ID)
    }

    pub fn search_debounce(&self) -> Result<Duration> {
        match &self.ui.search_debounce {
            Some(raw) => parse_duration(raw),
            None => Ok(DEFAULT_SEARCH_DEBOUNCE),
        }
    }

    pub fn page_size(&self) -> PageSize {
        self.ui
            .page_size
            .and_then(PageSize::new)
            .unwrap_or_default()
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# fitdash config\n# Place this file at: {}\n\nversion = 1\n\n[api]\nbase_url = \"{}\"\n# Optional bearer token sent with every request\n# token = \"...\"\ntimeout = \"{}\"\n\n[session]\n# Optional. Default is platform data dir (for example ~/.local/share/fitdash/session.db)\n# db_path = \"/absolute/path/to/session.db\"\nid = \"{}\"\n\n[ui]\nsearch_debounce = \"500ms\"\npage_size = {}\n\n[log]\n# One of: {}\nlevel = \"{}\"\n",
            path.display(),
            fitdash_api::DEFAULT_BASE_URL,
            DEFAULT_TIMEOUT,
            DEFAULT_SESSION_ID,
            PageSize::default().get(),
            LOG_LEVELS.join(", "),
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn is_valid_session_id(id: &str) -> bool {
    !id.trim().is_empty() && !id.contains('/')
}

pub fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 10s)")
}

#[cfg(test)]
mod tests {
    use super::{Config, parse_duration};
    use anyhow::Result;
    use fitdash_app::PageSize;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert_eq!(config.api_base_url(), "http://localhost:5000/api");
        assert_eq!(config.api_token(), None);
        assert_eq!(config.api_timeout()?, Duration::from_secs(10));
        assert_eq!(config.session_id(), "default");
        assert_eq!(config.search_debounce()?, Duration::from_millis(500));
        assert_eq!(config.page_size(), PageSize::default());
        assert_eq!(config.log_level(), "warn");
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[api]\nbase_url=\"http://localhost:5000/api\"\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[api], [session], [ui], and [log]"));
        Ok(())
    }

    #[test]
    fn v1_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[api]\nbase_url=\"https://admin.example.com/api/\"\ntoken=\"abc\"\ntimeout=\"2s\"\n[session]\nid=\"tab-7\"\n[ui]\nsearch_debounce=\"250ms\"\npage_size=20\n[log]\nlevel=\"debug\"\n",
        )?;

        let config = Config::load(&path)?;
        assert_eq!(config.api_base_url(), "https://admin.example.com/api");
        assert_eq!(config.api_token(), Some("abc"));
        assert_eq!(config.api_timeout()?, Duration::from_secs(2));
        assert_eq!(config.session_id(), "tab-7");
        assert_eq!(config.search_debounce()?, Duration::from_millis(250));
        assert_eq!(config.page_size().get(), 20);
        assert_eq!(config.log_level(), "debug");
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 2\n")?;
        let error = Config::load(&path).expect_err("v2 config should fail");
        assert!(error.to_string().contains("unsupported config version 2"));
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("FITDASH_CONFIG_PATH", &override_path);
        }
        let resolved = Config::default_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("FITDASH_CONFIG_PATH");
        }
        assert_eq!(resolved, override_path);
        Ok(())
    }

    #[test]
    fn db_path_prefers_session_config_over_env_override() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) =
            write_config("version = 1\n[session]\ndb_path = \"/explicit/from-config.db\"\n")?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("FITDASH_DB_PATH", "/from/env.db");
        }
        let config = Config::load(&path)?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("FITDASH_DB_PATH");
        }
        assert_eq!(config.db_path()?, PathBuf::from("/explicit/from-config.db"));
        Ok(())
    }

    #[test]
    fn db_path_uses_env_override_when_session_db_path_missing() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) = write_config("version = 1\n")?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("FITDASH_DB_PATH", "/from/env-only.db");
        }
        let config = Config::load(&path)?;
        let resolved = config.db_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("FITDASH_DB_PATH");
        }
        assert_eq!(resolved, PathBuf::from("/from/env-only.db"));
        Ok(())
    }

    #[test]
    fn db_path_rejects_uri_style_session_value() -> Result<()> {
        let (_temp, path) =
            write_config("version = 1\n[session]\ndb_path = \"https://evil.example/session.db\"\n")?;
        let error = Config::load(&path).expect_err("URI db_path should fail validation");
        assert!(error.to_string().contains("looks like a URI"));
        Ok(())
    }

    #[test]
    fn durations_parse_ms_seconds_and_minutes() -> Result<()> {
        assert_eq!(parse_duration("500ms")?, Duration::from_millis(500));
        assert_eq!(parse_duration("5s")?, Duration::from_secs(5));
        assert_eq!(parse_duration("2m")?, Duration::from_secs(120));
        assert!(parse_duration("soon").is_err());
        Ok(())
    }

    #[test]
    fn zero_timeout_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[api]\ntimeout = \"0s\"\n")?;
        let error = Config::load(&path).expect_err("zero timeout should fail");
        assert!(error.to_string().contains("must be positive"));
        Ok(())
    }

    #[test]
    fn page_size_outside_allowed_set_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[ui]\npage_size = 15\n")?;
        let error = Config::load(&path).expect_err("page size 15 should fail");
        let message = error.to_string();
        assert!(message.contains("ui.page_size"));
        assert!(message.contains("[5, 10, 20, 50]"));
        Ok(())
    }

    #[test]
    fn session_id_with_separator_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[session]\nid = \"a/b\"\n")?;
        let error = Config::load(&path).expect_err("slash in session id should fail");
        assert!(error.to_string().contains("session.id"));
        Ok(())
    }

    #[test]
    fn unknown_log_level_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[log]\nlevel = \"loud\"\n")?;
        let error = Config::load(&path).expect_err("unknown level should fail");
        assert!(error.to_string().contains("log.level"));
        Ok(())
    }

    #[test]
    fn example_config_round_trips_through_load() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        let example = Config::example_config(&path);
        assert!(example.contains("[api]"));
        assert!(example.contains("[session]"));
        std::fs::write(&path, &example)?;
        let config = Config::load(&path)?;
        assert_eq!(config.session_id(), "default");
        Ok(())
    }
}
