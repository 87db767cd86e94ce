//! メタデータのマージと書き出し
//!
//! 1. 既存キーワード + 各ラベル名 `"<name>; "` で新しい値を作る
//! 2. Keywords (2:25) データセットとして末尾に追加（既存は残す）
//! 3. IIM → 8BIM → APP13 → JPEG の順に再構築
//! 4. 一時ファイル経由で別パスに書き出す

use crate::error::{PhotoLabelerError, Result};
use crate::iptc::{extract_keywords, parse_iim, serialize_iim, DataSet, DataSetTag, IimContainer};
use crate::jpeg::photoshop::{is_photoshop_payload, PhotoshopResources};
use crate::jpeg::{JpegFile, Segment, APP0, APP1, APP13};
use crate::labels::Label;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const OUTPUT_SUFFIX: &str = "_modified.jpg";

/// `<input>_modified.jpg`
pub fn default_output_path(input: &Path) -> PathBuf {
    let mut name = OsString::from(input.as_os_str());
    name.push(OUTPUT_SUFFIX);
    PathBuf::from(name)
}

/// 既存キーワード文字列の後ろに `"<name>; "` を連結する
///
/// 既存値は `DataSet::value_text` で文字列化済み（UTF-8、不正なら ISO-8859-1 として解釈）。
/// 新しい 2:25 は常に UTF-8 で書き出し、1:90 は追加しないため、ISO-8859-1 の既存
/// データセットと新しいデータセットが同じブロック内で異なる文字コードになりうる。
pub fn build_keyword_value(existing: &str, labels: &[Label]) -> String {
    let appended: String = labels.iter().map(|l| format!("{}; ", l.name)).collect();
    format!("{}{}", existing, appended)
}

/// 読み込んだJPEGとその中の IPTC メタデータ
#[derive(Debug, Clone)]
pub struct PhotoMetadata {
    jpeg: JpegFile,
    resources: Option<PhotoshopResources>,
    iim: IimContainer,
}

/// マージ結果
#[derive(Debug, Clone)]
pub struct MergedPhoto {
    pub bytes: Vec<u8>,
    pub keyword_value: String,
    pub iim: IimContainer,
}

impl PhotoMetadata {
    pub fn read(bytes: &[u8]) -> Result<Self> {
        let jpeg = JpegFile::parse(bytes)?;
        let resources = PhotoshopResources::from_segments(
            jpeg.segments
                .iter()
                .filter(|s| s.marker == APP13)
                .map(|s| s.payload.as_slice()),
        )?;
        let iim = match resources.as_ref().and_then(|r| r.iptc()) {
            Some(block) => parse_iim(block)?,
            None => IimContainer::new(),
        };

        Ok(Self { jpeg, resources, iim })
    }

    pub fn iim(&self) -> &IimContainer {
        &self.iim
    }

    pub fn has_iptc_block(&self) -> bool {
        self.resources.as_ref().and_then(|r| r.iptc()).is_some()
    }

    pub fn existing_keywords(&self) -> String {
        extract_keywords(&self.iim)
    }

    pub fn merge_labels(self, labels: &[Label]) -> Result<MergedPhoto> {
        let Self {
            mut jpeg,
            resources,
            mut iim,
        } = self;

        let keyword_value = build_keyword_value(&extract_keywords(&iim), labels);
        iim.push(DataSet::new(DataSetTag::KEYWORDS, keyword_value.clone().into_bytes()));

        let mut resources = resources.unwrap_or_default();
        resources.set_iptc(serialize_iim(&iim)?);

        // 1セグメントに収まらない場合は連続する複数の APP13 に分割する
        let app13: Vec<Segment> = resources
            .to_segment_payloads(Segment::MAX_PAYLOAD)?
            .into_iter()
            .map(|payload| Segment::new(APP13, payload))
            .collect();
        replace_photoshop_segments(&mut jpeg.segments, app13);

        Ok(MergedPhoto {
            bytes: jpeg.to_bytes(),
            keyword_value,
            iim,
        })
    }
}

fn is_photoshop_segment(segment: &Segment) -> bool {
    segment.marker == APP13 && is_photoshop_payload(&segment.payload)
}

/// 既存の Photoshop APP13 を置き換える。なければ先頭の APP0/APP1 の直後に挿入
fn replace_photoshop_segments(segments: &mut Vec<Segment>, replacement: Vec<Segment>) {
    let first = segments.iter().position(is_photoshop_segment);
    segments.retain(|s| !is_photoshop_segment(s));
    let index = first.unwrap_or_else(|| {
        segments
            .iter()
            .take_while(|s| s.marker == APP0 || s.marker == APP1)
            .count()
    });
    segments.splice(index..index, replacement);
}

/// 出力先と同じディレクトリの一時ファイルに書いてから rename する
pub fn write_output(bytes: &[u8], output: &Path) -> Result<()> {
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp =
        NamedTempFile::new_in(dir).map_err(|e| PhotoLabelerError::file_access(output, e))?;
    temp.write_all(bytes)
        .and_then(|_| temp.flush())
        .map_err(|e| PhotoLabelerError::file_access(output, e))?;
    temp.persist(output)
        .map_err(|e| PhotoLabelerError::file_access(output, e.error))?;

    Ok(())
}
