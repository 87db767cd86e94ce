//! ラベル検出モジュール
//!
//! リモートの画像分類APIは `LabelSource` トレイトの背後に置く。
//! 失敗は常に `Result` で返し、続行するかどうかは呼び出し側が
//! `LabelFailurePolicy` で決める。

pub mod rekognition;
mod types;

pub use types::{Label, LabelFailurePolicy, LabelRequest};

use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait LabelSource {
    /// 画像バイト列からラベルを検出する（順序はAPIの返却順）
    async fn detect_labels(&self, image: &[u8], request: &LabelRequest) -> Result<Vec<Label>>;
}

/// ポリシーに従ってラベル検出の失敗を処理する
pub async fn resolve_labels<S>(
    source: &S,
    image: &[u8],
    request: &LabelRequest,
    policy: LabelFailurePolicy,
) -> Result<Vec<Label>>
where
    S: LabelSource + ?Sized,
{
    match source.detect_labels(image, request).await {
        Ok(labels) => Ok(labels),
        Err(e) => match policy {
            LabelFailurePolicy::Continue => {
                tracing::error!(error = %e, "ラベル検出に失敗、ラベルなしで続行");
                eprintln!("⚠ {}（ラベルなしで続行します）", e);
                Ok(Vec::new())
            }
            LabelFailurePolicy::Abort => Err(e),
        },
    }
}

/// 検出結果をコンソールに出力
pub fn print_labels(photo: &str, labels: &[Label]) {
    println!("Detected labels for {}", photo);
    for label in labels {
        println!("{}", label);
    }
}
