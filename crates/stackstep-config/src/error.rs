use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "ステップ設定ファイルが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリ: step.local.yaml, .step.local.yaml, step.yaml, .step.yaml\n\
        - ./.stackstep/ ディレクトリ\n\
        - ~/.config/stackstep/step.yaml\n\
        または STACKSTEP_CONFIG_PATH 環境変数で直接指定できます"
    )]
    StepFileNotFound,

    #[error("ステップ設定ファイルはキーと値のマッピングである必要があります: {0}")]
    NotAMapping(String),

    #[error("'{key}' の値はスカラー (文字列・真偽値・数値) である必要があります")]
    UnsupportedValue { key: String },

    #[error("YAML 解析エラー: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
