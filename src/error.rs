use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PhotoLabelerError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("AWS認証情報を取得できません: {0}")]
    Credential(String),

    #[error("ファイルにアクセスできません: {path}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JPEGとして読み込めません: {0}")]
    InvalidJpeg(String),

    #[error("メタデータが破損しています: {0}")]
    MalformedMetadata(String),

    #[error("ラベル検出APIの呼び出しに失敗: {0}")]
    RemoteCall(String),

    #[error("メタデータのシリアライズに失敗: {0}")]
    Serialization(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),
}

impl PhotoLabelerError {
    pub fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileAccess {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PhotoLabelerError>;
