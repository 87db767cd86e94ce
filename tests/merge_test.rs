//! キーワード書き込みの統合テスト
//!
//! ラベル検出はメモリ上の LabelSource で置き換えて検証する

use async_trait::async_trait;
use photo_labeler::config::Config;
use photo_labeler::error::{PhotoLabelerError, Result};
use photo_labeler::iptc::{DataSet, DataSetTag};
use photo_labeler::jpeg::photoshop::{PhotoshopResources, IPTC_RESOURCE_ID, PHOTOSHOP_HEADER};
use photo_labeler::jpeg::{JpegFile, Segment, APP0, APP1, APP13};
use photo_labeler::labels::{Label, LabelFailurePolicy, LabelRequest, LabelSource};
use photo_labeler::merger::PhotoMetadata;
use photo_labeler::tagger::{tag_photo, TagOptions};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::tempdir;

const SCAN_DATA: &[u8] = &[0xFF, 0xDA, 0x00, 0x02, 0x11, 0x22, 0x33, 0xFF, 0x00, 0x44, 0xFF, 0xD9];
const EXIF_PAYLOAD: &[u8] = b"Exif\0\0MM\0\x2a\0\0\0\x08\0\0";

struct StaticSource {
    labels: Vec<Label>,
    calls: AtomicUsize,
}

impl StaticSource {
    fn new(labels: Vec<Label>) -> Self {
        Self {
            labels,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LabelSource for StaticSource {
    async fn detect_labels(&self, _image: &[u8], _request: &LabelRequest) -> Result<Vec<Label>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.labels.clone())
    }
}

struct FailingSource;

#[async_trait]
impl LabelSource for FailingSource {
    async fn detect_labels(&self, _image: &[u8], _request: &LabelRequest) -> Result<Vec<Label>> {
        Err(PhotoLabelerError::RemoteCall("ImageTooLargeException".into()))
    }
}

fn segment(marker: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![0xFF, marker];
    out.extend(((payload.len() + 2) as u16).to_be_bytes());
    out.extend(payload);
    out
}

fn iim_block(datasets: &[(u8, u8, &[u8])]) -> Vec<u8> {
    let mut out = Vec::new();
    for (record, number, value) in datasets {
        out.extend([0x1C, *record, *number]);
        out.extend((value.len() as u16).to_be_bytes());
        out.extend(*value);
    }
    out
}

fn photoshop_payload(resources: &[(u16, &[u8])]) -> Vec<u8> {
    let mut out = b"Photoshop 3.0\0".to_vec();
    for (id, data) in resources {
        out.extend(b"8BIM");
        out.extend(id.to_be_bytes());
        out.extend([0, 0]);
        out.extend((data.len() as u32).to_be_bytes());
        out.extend(*data);
        if data.len() % 2 == 1 {
            out.push(0);
        }
    }
    out
}

fn build_jpeg(app13: Option<Vec<u8>>) -> Vec<u8> {
    build_jpeg_with_app13(app13.as_slice())
}

fn build_jpeg_with_app13(app13: &[Vec<u8>]) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8];
    bytes.extend(segment(APP0, b"JFIF\0\x01\x01\0\0\x01\0\x01\0\0"));
    bytes.extend(segment(APP1, EXIF_PAYLOAD));
    for payload in app13 {
        bytes.extend(segment(APP13, payload));
    }
    bytes.extend(segment(0xDB, &[0x00; 65]));
    bytes.extend(SCAN_DATA);
    bytes
}

fn existing_datasets() -> Vec<(u8, u8, &'static [u8])> {
    vec![
        (2, 0, &[0x00, 0x04][..]),
        (2, 5, &b"Harbor"[..]),
        (2, 25, &b"a"[..]),
        (2, 116, &b"(c) Example"[..]),
        (2, 25, &b"b"[..]),
        (2, 200, &[0xDE, 0xAD, 0xBE, 0xEF][..]),
    ]
}

fn jpeg_with_iptc() -> Vec<u8> {
    let iim = iim_block(&existing_datasets());
    build_jpeg(Some(photoshop_payload(&[
        (0x03ED, &[0u8, 72, 0, 1, 0, 72, 0, 1][..]),
        (IPTC_RESOURCE_ID, iim.as_slice()),
    ])))
}

fn write_input(dir: &Path, bytes: &[u8]) -> std::path::PathBuf {
    let path = dir.join("test_photo.jpg");
    std::fs::write(&path, bytes).expect("入力ファイルの作成に失敗");
    path
}

fn read_output(path: &Path) -> PhotoMetadata {
    let bytes = std::fs::read(path).expect("出力ファイルが読めない");
    PhotoMetadata::read(&bytes).expect("出力ファイルのメタデータが読めない")
}

fn keyword_values(metadata: &PhotoMetadata) -> Vec<String> {
    metadata
        .iim()
        .find_all(DataSetTag::KEYWORDS)
        .map(DataSet::value_text)
        .collect()
}

/// メタデータのないJPEGにラベルを書き込む
#[tokio::test]
async fn test_end_to_end_without_prior_metadata() {
    let dir = tempdir().expect("Failed to create temp dir");
    let input = write_input(dir.path(), &build_jpeg(None));
    let source = StaticSource::new(vec![Label::new("Beach", 92.1), Label::new("Sky", 88.0)]);

    let options = TagOptions::new(&input, &Config::default());
    let report = tag_photo(&source, &options).await.expect("タグ付けに失敗");

    assert_eq!(report.output, dir.path().join("test_photo.jpg_modified.jpg"));
    assert_eq!(report.keyword_value, "Beach; Sky; ");
    assert_eq!(report.preserved_datasets, 0);

    let output = read_output(&report.output);
    assert_eq!(keyword_values(&output), vec!["Beach; Sky; ".to_string()]);
    assert_eq!(output.iim().len(), 1);
}

/// 既存キーワードの後ろにラベルが追記される
#[tokio::test]
async fn test_keywords_appended_to_existing() {
    let dir = tempdir().expect("Failed to create temp dir");
    let input = write_input(dir.path(), &jpeg_with_iptc());
    let source = StaticSource::new(vec![Label::new("Cat", 98.0), Label::new("Dog", 91.5)]);

    let report = tag_photo(&source, &TagOptions::new(&input, &Config::default()))
        .await
        .expect("タグ付けに失敗");

    assert_eq!(report.keyword_value, "a;b;Cat; Dog; ");
    let output = read_output(&report.output);
    assert_eq!(
        keyword_values(&output),
        vec!["a".to_string(), "b".to_string(), "a;b;Cat; Dog; ".to_string()]
    );
}

/// キーワード以外のデータセット・他のリソース・他のセグメントは変更されない
#[tokio::test]
async fn test_existing_metadata_preserved() {
    let dir = tempdir().expect("Failed to create temp dir");
    let input = write_input(dir.path(), &jpeg_with_iptc());
    let source = StaticSource::new(vec![Label::new("Boat", 77.0)]);

    let report = tag_photo(&source, &TagOptions::new(&input, &Config::default()))
        .await
        .expect("タグ付けに失敗");
    assert_eq!(report.preserved_datasets, 6);

    let output = read_output(&report.output);
    let datasets = output.iim().datasets();
    let expected: Vec<DataSet> = existing_datasets()
        .into_iter()
        .map(|(r, n, v)| DataSet::new(DataSetTag::new(r, n), v.to_vec()))
        .collect();
    assert_eq!(&datasets[..6], expected.as_slice());
    assert_eq!(datasets[6].tag, DataSetTag::KEYWORDS);

    let bytes = std::fs::read(&report.output).unwrap();
    let jpeg = JpegFile::parse(&bytes).unwrap();
    let markers: Vec<u8> = jpeg.segments.iter().map(|s| s.marker).collect();
    assert_eq!(markers, vec![APP0, APP1, APP13, 0xDB]);
    assert_eq!(jpeg.segments[1].payload, EXIF_PAYLOAD.to_vec());
    assert_eq!(jpeg.scan_data, SCAN_DATA.to_vec());

    // 0x03ED リソースが先頭に残っている
    let app13 = &jpeg.segments[2].payload;
    assert_eq!(&app13[14..20], b"8BIM\x03\xED");
}

/// ラベル検出が失敗しても（continue）ファイルは出力される
#[tokio::test]
async fn test_empty_labels_still_written() {
    let dir = tempdir().expect("Failed to create temp dir");
    let input = write_input(dir.path(), &jpeg_with_iptc());

    let report = tag_photo(&FailingSource, &TagOptions::new(&input, &Config::default()))
        .await
        .expect("continue ポリシーでは成功するべき");

    assert!(report.labels.is_empty());
    assert_eq!(report.keyword_value, "a;b;");
    let output = read_output(&report.output);
    assert_eq!(keyword_values(&output).last().map(String::as_str), Some("a;b;"));
}

/// abort ポリシーではエラーになり、ファイルは作られない
#[tokio::test]
async fn test_abort_policy_writes_nothing() {
    let dir = tempdir().expect("Failed to create temp dir");
    let input = write_input(dir.path(), &jpeg_with_iptc());
    let mut options = TagOptions::new(&input, &Config::default());
    options.on_label_failure = LabelFailurePolicy::Abort;

    let result = tag_photo(&FailingSource, &options).await;

    assert!(matches!(result, Err(PhotoLabelerError::RemoteCall(_))));
    assert!(!options.output.exists());
}

/// 宣言長はバイト長（文字数ではない）と一致する
#[tokio::test]
async fn test_declared_length_matches_byte_length() {
    let dir = tempdir().expect("Failed to create temp dir");
    let input = write_input(dir.path(), &build_jpeg(None));
    let source = StaticSource::new(vec![Label::new("東京タワー", 95.0), Label::new("Café", 60.0)]);

    let report = tag_photo(&source, &TagOptions::new(&input, &Config::default()))
        .await
        .expect("タグ付けに失敗");

    let value = report.keyword_value.as_bytes();
    assert_eq!(report.keyword_value, "東京タワー; Café; ");

    let bytes = std::fs::read(&report.output).unwrap();
    let header = [0x1C, 0x02, 0x19];
    let pos = bytes
        .windows(3)
        .position(|w| w == header)
        .expect("Keywordsデータセットが見つからない");
    let declared = u16::from_be_bytes([bytes[pos + 3], bytes[pos + 4]]) as usize;
    assert_eq!(declared, value.len());
    assert_eq!(&bytes[pos + 5..pos + 5 + declared], value);
}

/// 入力ファイルは変更されない
#[tokio::test]
async fn test_input_not_modified() {
    let dir = tempdir().expect("Failed to create temp dir");
    let original = jpeg_with_iptc();
    let input = write_input(dir.path(), &original);
    let before = hex::encode(Sha256::digest(&original));

    let source = StaticSource::new(vec![Label::new("Sea", 70.0)]);
    let report = tag_photo(&source, &TagOptions::new(&input, &Config::default()))
        .await
        .expect("タグ付けに失敗");

    let after = hex::encode(Sha256::digest(std::fs::read(&input).unwrap()));
    assert_eq!(before, after);
    assert_eq!(report.input_sha256, before);
}

/// 壊れたIIMブロックはAPIを呼ばずにエラー、出力なし
#[tokio::test]
async fn test_corrupt_metadata_rejected() {
    let dir = tempdir().expect("Failed to create temp dir");
    let mut iim = iim_block(&existing_datasets());
    iim.truncate(iim.len() - 2);
    let input = write_input(
        dir.path(),
        &build_jpeg(Some(photoshop_payload(&[(IPTC_RESOURCE_ID, iim.as_slice())]))),
    );
    let source = StaticSource::new(vec![Label::new("Cat", 99.0)]);
    let options = TagOptions::new(&input, &Config::default());

    let result = tag_photo(&source, &options).await;

    assert!(matches!(result, Err(PhotoLabelerError::MalformedMetadata(_))));
    assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    assert!(!options.output.exists());
}

/// 出力先に入力ファイルを指定するとエラー
#[tokio::test]
async fn test_output_same_as_input_rejected() {
    let dir = tempdir().expect("Failed to create temp dir");
    let original = jpeg_with_iptc();
    let input = write_input(dir.path(), &original);
    let options = TagOptions::new(&input, &Config::default()).with_output(&input);

    let result = tag_photo(&StaticSource::new(vec![]), &options).await;

    assert!(matches!(result, Err(PhotoLabelerError::FileAccess { .. })));
    assert_eq!(std::fs::read(&input).unwrap(), original);
}

/// 出力先を指定できる
#[tokio::test]
async fn test_custom_output_path() {
    let dir = tempdir().expect("Failed to create temp dir");
    let input = write_input(dir.path(), &build_jpeg(None));
    let output = dir.path().join("labeled.jpg");
    let options = TagOptions::new(&input, &Config::default()).with_output(&output);

    let report = tag_photo(&StaticSource::new(vec![Label::new("Tree", 55.0)]), &options)
        .await
        .expect("タグ付けに失敗");

    assert_eq!(report.output, output);
    assert!(output.exists());
    assert!(!dir.path().join("test_photo.jpg_modified.jpg").exists());
}

/// 複数の APP13 に分割された Photoshop リソースを読み、分割したまま書き戻す
#[tokio::test]
async fn test_split_app13_round_trip() {
    let dir = tempdir().expect("Failed to create temp dir");
    let thumbnail = vec![7u8; 70_000];
    let iim = iim_block(&[(2, 25, &b"a"[..])]);
    let joined = photoshop_payload(&[
        (0x040C, thumbnail.as_slice()),
        (IPTC_RESOURCE_ID, iim.as_slice()),
    ]);

    // ヘッダ以降のリソース列を途中で2つに分け、それぞれにヘッダを付ける
    let stream = &joined[PHOTOSHOP_HEADER.len()..];
    let (first, second) = stream.split_at(60_000);
    let payloads: Vec<Vec<u8>> = [first, second]
        .into_iter()
        .map(|part| [PHOTOSHOP_HEADER, part].concat())
        .collect();
    let input = write_input(dir.path(), &build_jpeg_with_app13(&payloads));

    let source = StaticSource::new(vec![Label::new("Cat", 98.0)]);
    let report = tag_photo(&source, &TagOptions::new(&input, &Config::default()))
        .await
        .expect("分割されたAPP13の入力でタグ付けに失敗");
    assert_eq!(report.keyword_value, "a;Cat; ");

    let bytes = std::fs::read(&report.output).unwrap();
    let jpeg = JpegFile::parse(&bytes).unwrap();
    let app13: Vec<&[u8]> = jpeg
        .segments
        .iter()
        .filter(|s| s.marker == APP13)
        .map(|s| s.payload.as_slice())
        .collect();
    assert_eq!(app13.len(), 2);
    assert!(app13.iter().all(|p| p.len() <= Segment::MAX_PAYLOAD));

    // APP13 は連続して並ぶ
    let markers: Vec<u8> = jpeg.segments.iter().map(|s| s.marker).collect();
    assert_eq!(markers, vec![APP0, APP1, APP13, APP13, 0xDB]);

    let resources = PhotoshopResources::from_segments(app13)
        .unwrap()
        .expect("Photoshopリソースがない");
    assert_eq!(resources.resources[0].id, 0x040C);
    assert_eq!(resources.resources[0].data, thumbnail);

    let output = read_output(&report.output);
    assert_eq!(
        keyword_values(&output),
        vec!["a".to_string(), "a;Cat; ".to_string()]
    );
}
