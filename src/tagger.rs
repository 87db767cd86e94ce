//! 1枚の写真に対する一連の処理
//!
//! 読み込み → メタデータ解析 → ラベル検出 → マージ → 書き出し。
//! メタデータが壊れている場合はAPIを呼ぶ前に失敗させる。

use crate::config::Config;
use crate::error::{PhotoLabelerError, Result};
use crate::labels::{
    print_labels, resolve_labels, Label, LabelFailurePolicy, LabelRequest, LabelSource,
};
use crate::loader;
use crate::merger::{self, PhotoMetadata};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct TagOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub request: LabelRequest,
    pub on_label_failure: LabelFailurePolicy,
}

impl TagOptions {
    /// 出力先は `<input>_modified.jpg`
    pub fn new(input: impl Into<PathBuf>, config: &Config) -> Self {
        let input = input.into();
        Self {
            output: merger::default_output_path(&input),
            input,
            request: config.label_request(),
            on_label_failure: config.on_label_failure,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct TagReport {
    pub output: PathBuf,
    pub labels: Vec<Label>,
    pub keyword_value: String,
    /// 書き出し前から存在したデータセット数
    pub preserved_datasets: usize,
    pub input_sha256: String,
}

pub async fn tag_photo<S>(source: &S, options: &TagOptions) -> Result<TagReport>
where
    S: LabelSource + ?Sized,
{
    ensure_distinct_paths(&options.input, &options.output)?;

    let bytes = loader::load_image(&options.input)?;
    if loader::exceeds_api_limit(&bytes) {
        tracing::warn!(
            bytes = bytes.len(),
            limit = loader::MAX_API_IMAGE_BYTES,
            "画像がAPIのサイズ上限を超えています"
        );
    }
    let input_sha256 = hex::encode(Sha256::digest(&bytes));

    let metadata = PhotoMetadata::read(&bytes)?;
    let preserved_datasets = metadata.iim().len();
    tracing::debug!(
        datasets = preserved_datasets,
        existing_keywords = %metadata.existing_keywords(),
        "既存メタデータを読み込み"
    );

    let labels = resolve_labels(source, &bytes, &options.request, options.on_label_failure).await?;
    print_labels(&options.input.display().to_string(), &labels);

    let merged = metadata.merge_labels(&labels)?;
    merger::write_output(&merged.bytes, &options.output)?;
    tracing::info!(output = %options.output.display(), "キーワードを書き込みました");

    Ok(TagReport {
        output: options.output.clone(),
        labels,
        keyword_value: merged.keyword_value,
        preserved_datasets,
        input_sha256,
    })
}

/// 埋め込まれている IPTC メタデータを読むだけ（書き込みなし）
pub fn inspect_photo(path: &Path) -> Result<PhotoMetadata> {
    let bytes = loader::load_image(path)?;
    PhotoMetadata::read(&bytes)
}

fn ensure_distinct_paths(input: &Path, output: &Path) -> Result<()> {
    let same = input == output
        || matches!(
            (input.canonicalize(), output.canonicalize()),
            (Ok(a), Ok(b)) if a == b
        );
    if same {
        return Err(PhotoLabelerError::file_access(
            output,
            std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "出力先が入力ファイルと同じです",
            ),
        ));
    }
    Ok(())
}
