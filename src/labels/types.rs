use serde::{Deserialize, Serialize};
use std::fmt;

/// 分類器が返すラベル。confidence は 0-100
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub confidence: f32,
}

impl Label {
    pub fn new(name: impl Into<String>, confidence: f32) -> Self {
        Self {
            name: name.into(),
            confidence,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.confidence)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelRequest {
    pub max_labels: i32,
    pub min_confidence: f32,
}

impl Default for LabelRequest {
    fn default() -> Self {
        Self {
            max_labels: 10,
            min_confidence: 7.0,
        }
    }
}

/// ラベル検出失敗時の扱い
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LabelFailurePolicy {
    /// ログを出してラベルなしで続行
    #[default]
    Continue,
    /// エラーとして中断
    Abort,
}

impl fmt::Display for LabelFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelFailurePolicy::Continue => write!(f, "continue"),
            LabelFailurePolicy::Abort => write!(f, "abort"),
        }
    }
}
