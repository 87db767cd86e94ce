use crate::error::{PhotoLabelerError, Result};
use crate::labels::{LabelFailurePolicy, LabelRequest};
use crate::labels::rekognition::AwsSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub region: String,
    pub profile: Option<String>,
    pub max_labels: i32,
    pub min_confidence: f32,
    pub timeout_seconds: u64,
    pub on_label_failure: LabelFailurePolicy,
}

impl Default for Config {
    fn default() -> Self {
        let request = LabelRequest::default();
        Self {
            region: "us-west-2".into(),
            profile: None,
            max_labels: request.max_labels,
            min_confidence: request.min_confidence,
            timeout_seconds: 60,
            on_label_failure: LabelFailurePolicy::Continue,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// 読み込めない設定ファイルは警告してデフォルト値で置き換える（`config` サブコマンド用）
    pub fn load_or_default() -> Self {
        match Self::config_path() {
            Ok(path) => Self::load_or_default_from(&path),
            Err(e) => {
                tracing::warn!(error = %e, "config path unavailable");
                Self::default()
            }
        }
    }

    pub fn load_or_default_from(config_path: &Path) -> Self {
        Self::load_from(config_path).unwrap_or_else(|e| {
            tracing::warn!(
                path = %config_path.display(),
                error = %e,
                "config unreadable, using defaults"
            );
            eprintln!("⚠ 設定ファイルを読み込めません。デフォルト値を使用します: {}", e);
            Self::default()
        })
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| PhotoLabelerError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("photo-labeler").join("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_labels < 1 {
            return Err(PhotoLabelerError::Config(format!(
                "max_labels は1以上を指定してください: {}",
                self.max_labels
            )));
        }
        if !(0.0..=100.0).contains(&self.min_confidence) {
            return Err(PhotoLabelerError::Config(format!(
                "min_confidence は0-100の範囲で指定してください: {}",
                self.min_confidence
            )));
        }
        if self.region.trim().is_empty() {
            return Err(PhotoLabelerError::Config("region が空です".into()));
        }
        Ok(())
    }

    pub fn label_request(&self) -> LabelRequest {
        LabelRequest {
            max_labels: self.max_labels,
            min_confidence: self.min_confidence,
        }
    }

    pub fn aws_settings(&self) -> AwsSettings {
        AwsSettings {
            region: self.region.clone(),
            profile: self.profile.clone(),
            timeout: Duration::from_secs(self.timeout_seconds),
        }
    }
}
