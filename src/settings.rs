use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RedeemError, Result};

/// One strategy in the admin authorization chain, tried in configured order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminCheck {
    Email,
    Domain,
    AdminTable,
    Role,
}

impl AdminCheck {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Domain => "domain",
            Self::AdminTable => "admin_table",
            Self::Role => "role",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default = "default_uppercase_keys")]
    pub uppercase_keys: bool,
    #[serde(default = "default_admin_checks")]
    pub admin_checks: Vec<AdminCheck>,
    #[serde(default)]
    pub admin_emails: Vec<String>,
    #[serde(default)]
    pub admin_domains: Vec<String>,
    #[serde(default)]
    pub admin_secret: Option<String>,
}

fn default_uppercase_keys() -> bool {
    true
}

fn default_admin_checks() -> Vec<AdminCheck> {
    vec![
        AdminCheck::Email,
        AdminCheck::Domain,
        AdminCheck::AdminTable,
        AdminCheck::Role,
    ]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            uppercase_keys: default_uppercase_keys(),
            admin_checks: default_admin_checks(),
            admin_emails: Vec::new(),
            admin_domains: Vec::new(),
            admin_secret: None,
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("redeem")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".local")
        .join("share")
        .join("redeem")
}

/// Settings stored at `path`; a missing file yields the defaults.
pub fn read_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| RedeemError::Settings(format!("{}: {e}", path.display())))
}

pub fn load_settings() -> Settings {
    read_settings_from(&settings_path()).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "unreadable settings, using defaults");
        Settings::default()
    })
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| RedeemError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

/// Data directory for startup, before logging is installed. Never logs;
/// a broken settings file is reported by the next `load_settings`.
pub fn get_data_dir() -> PathBuf {
    let settings = read_settings_from(&settings_path()).unwrap_or_default();
    PathBuf::from(settings.data_dir)
}

pub fn db_path(settings: &Settings) -> PathBuf {
    PathBuf::from(&settings.data_dir).join("redeem.db")
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert!(s.uppercase_keys);
        assert_eq!(
            s.admin_checks,
            vec![AdminCheck::Email, AdminCheck::Domain, AdminCheck::AdminTable, AdminCheck::Role]
        );
        assert!(s.admin_secret.is_none());
        assert!(!s.data_dir.is_empty());
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"data_dir": "/tmp/test", "admin_emails": ["boss@example.com"]}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.data_dir, "/tmp/test");
        assert_eq!(s.admin_emails, vec!["boss@example.com"]);
        assert!(s.uppercase_keys);
        assert_eq!(s.admin_checks.len(), 4);
    }

    #[test]
    fn test_admin_check_order_is_configurable() {
        let json = r#"{"data_dir": "/tmp/test", "admin_checks": ["role", "admin_table"]}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.admin_checks, vec![AdminCheck::Role, AdminCheck::AdminTable]);
    }

    #[test]
    fn test_unknown_admin_check_is_rejected() {
        let json = r#"{"data_dir": "/tmp/test", "admin_checks": ["magic"]}"#;
        assert!(serde_json::from_str::<Settings>(json).is_err());
    }

    #[test]
    fn test_read_settings_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        assert!(read_settings_from(&path).unwrap().uppercase_keys);

        std::fs::write(&path, "{ not json").unwrap();
        let err = read_settings_from(&path).unwrap_err();
        assert!(matches!(err, RedeemError::Settings(_)));

        std::fs::write(&path, r#"{"data_dir": "/srv/redeem"}"#).unwrap();
        assert_eq!(read_settings_from(&path).unwrap().data_dir, "/srv/redeem");
    }

    #[test]
    fn test_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            data_dir: "/tmp/redeem".to_string(),
            uppercase_keys: false,
            admin_checks: vec![AdminCheck::AdminTable],
            admin_emails: vec![],
            admin_domains: vec!["example.com".to_string()],
            admin_secret: Some("s3cret".to_string()),
        };
        std::fs::write(&path, serde_json::to_string_pretty(&settings).unwrap()).unwrap();
        let loaded: Settings = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(!loaded.uppercase_keys);
        assert_eq!(loaded.admin_domains, vec!["example.com"]);
        assert_eq!(loaded.admin_secret.as_deref(), Some("s3cret"));
    }
}
