pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 設定ファイルを直接指定する環境変数
pub const CONFIG_PATH_ENV: &str = "TENANTNET_CONFIG_PATH";

/// 設定ファイルの API トークンを上書きする環境変数
pub const API_TOKEN_ENV: &str = "TENANTNET_API_TOKEN";

const CANDIDATES: [&str; 2] = ["tenantnet.local.yaml", "tenantnet.yaml"];

fn default_timeout_secs() -> u64 {
    30
}

/// リモート API 1つ分の接続先
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSettings {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// netctl の設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub provider_api: ApiSettings,
    pub account_api: ApiSettings,
    pub default_region: String,

    /// プロバイダー/アカウント API 呼び出しごとのタイムアウト
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Settings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.provider_api.url.trim().is_empty() {
            return Err(ConfigError::Invalid("provider_api.url が空です".to_string()));
        }
        if self.account_api.url.trim().is_empty() {
            return Err(ConfigError::Invalid("account_api.url が空です".to_string()));
        }
        if self.default_region.trim().is_empty() {
            return Err(ConfigError::Invalid("default_region が空です".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs は1以上を指定してください".to_string()));
        }
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(token) = std::env::var(API_TOKEN_ENV) {
            if !token.is_empty() {
                self.provider_api.token = Some(token.clone());
                self.account_api.token = Some(token);
            }
        }
    }
}

/// 設定ファイルを探す
///
/// 以下の優先順位で設定ファイルを検索:
/// 1. 環境変数 TENANTNET_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリ: tenantnet.local.yaml, tenantnet.yaml
/// 3. ./.tenantnet/ ディレクトリ内: 同様の順序
/// 4. ~/.config/tenantnet/tenantnet.yaml (グローバル設定)
pub fn find_config_file() -> Result<PathBuf> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!("{} のファイルが存在しません: {}", CONFIG_PATH_ENV, path.display());
    }

    // 2-3. カレントディレクトリと ./.tenantnet/ で検索
    let current_dir = std::env::current_dir()?;

    for dir in [current_dir.clone(), current_dir.join(".tenantnet")] {
        if !dir.is_dir() {
            continue;
        }
        for filename in &CANDIDATES {
            let path = dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    // 4. グローバル設定ファイル
    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("tenantnet").join("tenantnet.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

/// 設定ファイルを読み込み、環境変数による上書きを適用する
pub fn load_settings(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path)?;
    let mut settings: Settings = serde_yaml::from_str(&content)?;
    settings.apply_env();
    settings.validate()?;

    tracing::debug!("設定を読み込みました: {}", path.display());
    Ok(settings)
}

/// `find_config_file` で探して `load_settings` で読み込む
pub fn load() -> Result<(PathBuf, Settings)> {
    let path = find_config_file()?;
    let settings = load_settings(&path)?;
    Ok((path, settings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    const SAMPLE: &str = r#"
provider_api:
  url: https://cloud.example.com/api
  token: file-token
account_api:
  url: https://accounts.example.com
default_region: tk1a
"#;

    #[test]
    #[serial]
    fn test_load_settings_defaults_timeout() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("tenantnet.yaml");
        fs::write(&path, SAMPLE).unwrap();

        let settings = load_settings(&path).unwrap();

        assert_eq!(settings.default_region, "tk1a");
        assert_eq!(settings.timeout(), Duration::from_secs(30));
        assert_eq!(settings.provider_api.token.as_deref(), Some("file-token"));
        assert_eq!(settings.account_api.token, None);
    }

    #[test]
    #[serial]
    fn test_token_env_overrides_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("tenantnet.yaml");
        fs::write(&path, SAMPLE).unwrap();

        unsafe {
            std::env::set_var(API_TOKEN_ENV, "env-token");
        }
        let settings = load_settings(&path).unwrap();
        unsafe {
            std::env::remove_var(API_TOKEN_ENV);
        }

        assert_eq!(settings.provider_api.token.as_deref(), Some("env-token"));
        assert_eq!(settings.account_api.token.as_deref(), Some("env-token"));
    }

    #[test]
    #[serial]
    fn test_invalid_settings_are_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("tenantnet.yaml");
        fs::write(&path, SAMPLE.replace("tk1a", "\"\"")).unwrap();

        assert!(matches!(load_settings(&path), Err(ConfigError::Invalid(_))));

        fs::write(&path, "provider_api: [").unwrap();
        assert!(matches!(load_settings(&path), Err(ConfigError::Yaml(_))));
    }

    #[test]
    #[serial]
    fn test_find_config_file_local_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("tenantnet.yaml"), SAMPLE).unwrap();
        fs::write(temp_dir.path().join("tenantnet.local.yaml"), SAMPLE).unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();
        let result = find_config_file().unwrap();
        std::env::set_current_dir(original_dir).unwrap();

        // tenantnet.local.yaml が優先される
        assert!(result.ends_with("tenantnet.local.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_config_file_in_dot_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        let dot_dir = temp_dir.path().join(".tenantnet");
        fs::create_dir(&dot_dir).unwrap();
        fs::write(dot_dir.join("tenantnet.yaml"), SAMPLE).unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();
        let result = find_config_file().unwrap();
        std::env::set_current_dir(original_dir).unwrap();

        assert!(result.ends_with(".tenantnet/tenantnet.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_config_file_from_env() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.yaml");
        fs::write(&config_path, SAMPLE).unwrap();

        unsafe {
            std::env::set_var(CONFIG_PATH_ENV, config_path.to_str().unwrap());
        }
        let result = find_config_file().unwrap();
        unsafe {
            std::env::remove_var(CONFIG_PATH_ENV);
        }

        assert_eq!(result, config_path);
    }

    #[test]
    #[serial]
    fn test_find_config_file_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();
        let result = find_config_file();
        std::env::set_current_dir(original_dir).unwrap();

        // テスト環境にグローバル設定があればそちらが見つかる
        let global = dirs::config_dir().map(|d| d.join("tenantnet").join("tenantnet.yaml"));
        if global.is_some_and(|p| p.exists()) {
            return;
        }
        assert!(matches!(result, Err(ConfigError::ConfigFileNotFound)));
    }
}
