use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "設定ファイルが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリ: tenantnet.local.yaml, tenantnet.yaml\n\
        - ./.tenantnet/ ディレクトリ\n\
        - ~/.config/tenantnet/tenantnet.yaml\n\
        または TENANTNET_CONFIG_PATH 環境変数で直接指定できます"
    )]
    ConfigFileNotFound,

    #[error("設定が不正です: {0}")]
    Invalid(String),

    #[error("YAML パースエラー: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
