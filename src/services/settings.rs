//! 本地设置存储 - 业务能力层
//!
//! 单文件 TOML 键值存储，只负责设置的读写与 API Key 解析顺序，
//! 不关心流程。程序启动时整体加载，保存时整体覆写。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{AppError, AppResult, ConfigError};

/// 设置文件的持久化形态
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PersistedSettings {
    /// 用户在设置界面填写的 API Key
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_api_key: Option<String>,
}

/// 本地设置存储
///
/// 职责：
/// - 启动时从设置文件加载已保存的设置
/// - 提交修改时立即整体写回
/// - 解析生效的 API Key（本地设置优先，环境变量其次）
pub struct SettingsStore {
    path: PathBuf,
    settings: PersistedSettings,
}

impl SettingsStore {
    /// 从设置文件加载；文件不存在视为空设置（首次运行）
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();

        let settings = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(|e| {
                AppError::Config(ConfigError::SettingsReadFailed {
                    path: path.display().to_string(),
                    source: Box::new(e),
                })
            })?;
            toml::from_str(&raw).map_err(|e| {
                AppError::Config(ConfigError::SettingsParseFailed {
                    path: path.display().to_string(),
                    source: Box::new(e),
                })
            })?
        } else {
            debug!("设置文件不存在，使用空设置: {}", path.display());
            PersistedSettings::default()
        };

        Ok(Self { path, settings })
    }

    /// 当前保存的 API Key
    pub fn custom_api_key(&self) -> Option<&str> {
        self.settings
            .custom_api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }

    /// 保存 API Key 并立即写盘；传 None 表示清除
    pub fn set_custom_api_key(&mut self, key: Option<String>) -> AppResult<()> {
        self.settings.custom_api_key = key.filter(|k| !k.trim().is_empty());
        self.persist()?;
        info!("✓ 设置已保存: {}", self.path.display());
        Ok(())
    }

    /// 解析生效的 API Key
    ///
    /// 本地保存的 Key 优先；没有则退回环境变量提供的默认 Key；
    /// 两者皆无报配置错误，流水线不会带着空 Key 出发。
    pub fn resolve_api_key(&self, config: &Config) -> AppResult<String> {
        if let Some(key) = self.custom_api_key() {
            return Ok(key.to_string());
        }
        config
            .default_api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or(AppError::Config(ConfigError::MissingApiKey))
    }

    fn persist(&self) -> AppResult<()> {
        let raw = toml::to_string_pretty(&self.settings).map_err(|e| {
            AppError::Config(ConfigError::SettingsWriteFailed {
                path: self.path.display().to_string(),
                source: Box::new(e),
            })
        })?;
        std::fs::write(&self.path, raw).map_err(|e| {
            AppError::Config(ConfigError::SettingsWriteFailed {
                path: self.path.display().to_string(),
                source: Box::new(e),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(default_key: Option<&str>) -> Config {
        Config {
            default_api_key: default_key.map(str::to_string),
            ..Config::default()
        }
    }

    #[test]
    fn test_missing_file_means_empty_settings() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::load(dir.path().join("settings.toml")).unwrap();
        assert!(store.custom_api_key().is_none());
    }

    #[test]
    fn test_save_then_reload_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");

        let mut store = SettingsStore::load(&path).unwrap();
        store
            .set_custom_api_key(Some("AIza-test-key".to_string()))
            .unwrap();

        let reloaded = SettingsStore::load(&path).unwrap();
        assert_eq!(reloaded.custom_api_key(), Some("AIza-test-key"));
    }

    #[test]
    fn test_saved_key_overrides_env_default() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SettingsStore::load(dir.path().join("settings.toml")).unwrap();
        store
            .set_custom_api_key(Some("saved-key".to_string()))
            .unwrap();

        let key = store.resolve_api_key(&test_config(Some("env-key"))).unwrap();
        assert_eq!(key, "saved-key");
    }

    #[test]
    fn test_falls_back_to_env_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::load(dir.path().join("settings.toml")).unwrap();

        let key = store.resolve_api_key(&test_config(Some("env-key"))).unwrap();
        assert_eq!(key, "env-key");
    }

    #[test]
    fn test_no_key_anywhere_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::load(dir.path().join("settings.toml")).unwrap();

        let err = store.resolve_api_key(&test_config(None)).unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::MissingApiKey)));
    }

    #[test]
    fn test_clearing_key_restores_env_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");

        let mut store = SettingsStore::load(&path).unwrap();
        store.set_custom_api_key(Some("saved".to_string())).unwrap();
        store.set_custom_api_key(None).unwrap();

        let reloaded = SettingsStore::load(&path).unwrap();
        assert!(reloaded.custom_api_key().is_none());
        let key = reloaded
            .resolve_api_key(&test_config(Some("env-key")))
            .unwrap();
        assert_eq!(key, "env-key");
    }

    #[test]
    fn test_blank_key_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SettingsStore::load(dir.path().join("settings.toml")).unwrap();
        store.set_custom_api_key(Some("   ".to_string())).unwrap();
        assert!(store.custom_api_key().is_none());
    }
}
