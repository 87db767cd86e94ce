//! AWS Rekognition DetectLabels 連携
//!
//! 認証情報は AWS の標準チェーン（環境変数・プロファイル等）から解決する。
//! 接続時に一度解決を試み、取得できなければ起動時エラーとする。

use super::{Label, LabelRequest, LabelSource};
use crate::error::{PhotoLabelerError, Result};
use async_trait::async_trait;
use aws_config::{timeout::TimeoutConfig, BehaviorVersion};
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_rekognition::config::Region;
use aws_sdk_rekognition::error::DisplayErrorContext;
use aws_sdk_rekognition::primitives::Blob;
use aws_sdk_rekognition::types::Image;
use aws_sdk_rekognition::Client;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AwsSettings {
    pub region: String,
    pub profile: Option<String>,
    pub timeout: Duration,
}

pub struct RekognitionLabelSource {
    client: Client,
}

impl RekognitionLabelSource {
    pub async fn connect(settings: &AwsSettings) -> Result<Self> {
        let timeouts = TimeoutConfig::builder()
            .operation_timeout(settings.timeout)
            .build();

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .timeout_config(timeouts);
        if let Some(profile) = &settings.profile {
            loader = loader.profile_name(profile);
        }
        let sdk_config = loader.load().await;

        let provider = sdk_config.credentials_provider().ok_or_else(|| {
            PhotoLabelerError::Credential("認証情報プロバイダが設定されていません".into())
        })?;
        provider
            .provide_credentials()
            .await
            .map_err(|e| PhotoLabelerError::Credential(DisplayErrorContext(&e).to_string()))?;

        tracing::debug!(
            region = %settings.region,
            profile = ?settings.profile,
            "Rekognitionクライアントを初期化"
        );

        Ok(Self {
            client: Client::new(&sdk_config),
        })
    }
}

#[async_trait]
impl LabelSource for RekognitionLabelSource {
    async fn detect_labels(&self, image: &[u8], request: &LabelRequest) -> Result<Vec<Label>> {
        tracing::debug!(
            bytes = image.len(),
            max_labels = request.max_labels,
            min_confidence = request.min_confidence,
            "DetectLabels 呼び出し"
        );

        let output = self
            .client
            .detect_labels()
            .image(Image::builder().bytes(Blob::new(image.to_vec())).build())
            .max_labels(request.max_labels)
            .min_confidence(request.min_confidence)
            .send()
            .await
            .map_err(|e| PhotoLabelerError::RemoteCall(DisplayErrorContext(&e).to_string()))?;

        let labels = output
            .labels()
            .iter()
            .filter_map(|label| {
                label
                    .name()
                    .map(|name| Label::new(name, label.confidence().unwrap_or(0.0)))
            })
            .collect();

        Ok(labels)
    }
}
