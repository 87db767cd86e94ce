//! IPTC IIM (Information Interchange Model) モジュール
//!
//! - データセットの型定義
//! - バイナリブロックの解析 (parser) と書き出し (serializer)
//! - キーワード (2:25) の抽出 (keywords)

pub mod keywords;
pub mod parser;
pub mod serializer;

pub use keywords::extract_keywords;
pub use parser::parse_iim;
pub use serializer::{encode_length, serialize_iim};

use serde::Serialize;
use std::fmt;

/// データセットの識別子（レコード番号:データセット番号）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DataSetTag {
    pub record: u8,
    pub number: u8,
}

impl DataSetTag {
    pub const ENVELOPE_RECORD_VERSION: Self = Self::new(1, 0);
    pub const CODED_CHARACTER_SET: Self = Self::new(1, 90);
    pub const RECORD_VERSION: Self = Self::new(2, 0);
    pub const OBJECT_NAME: Self = Self::new(2, 5);
    pub const EDIT_STATUS: Self = Self::new(2, 7);
    pub const URGENCY: Self = Self::new(2, 10);
    pub const CATEGORY: Self = Self::new(2, 15);
    pub const SUPPLEMENTAL_CATEGORY: Self = Self::new(2, 20);
    pub const KEYWORDS: Self = Self::new(2, 25);
    pub const SPECIAL_INSTRUCTIONS: Self = Self::new(2, 40);
    pub const DATE_CREATED: Self = Self::new(2, 55);
    pub const TIME_CREATED: Self = Self::new(2, 60);
    pub const DIGITAL_CREATION_DATE: Self = Self::new(2, 62);
    pub const DIGITAL_CREATION_TIME: Self = Self::new(2, 63);
    pub const ORIGINATING_PROGRAM: Self = Self::new(2, 65);
    pub const BY_LINE: Self = Self::new(2, 80);
    pub const BY_LINE_TITLE: Self = Self::new(2, 85);
    pub const CITY: Self = Self::new(2, 90);
    pub const SUB_LOCATION: Self = Self::new(2, 92);
    pub const PROVINCE_STATE: Self = Self::new(2, 95);
    pub const COUNTRY_CODE: Self = Self::new(2, 100);
    pub const COUNTRY_NAME: Self = Self::new(2, 101);
    pub const ORIGINAL_TRANSMISSION_REFERENCE: Self = Self::new(2, 103);
    pub const HEADLINE: Self = Self::new(2, 105);
    pub const CREDIT: Self = Self::new(2, 110);
    pub const SOURCE: Self = Self::new(2, 115);
    pub const COPYRIGHT_NOTICE: Self = Self::new(2, 116);
    pub const CONTACT: Self = Self::new(2, 118);
    pub const CAPTION: Self = Self::new(2, 120);
    pub const WRITER_EDITOR: Self = Self::new(2, 122);

    pub const fn new(record: u8, number: u8) -> Self {
        Self { record, number }
    }

    /// record * 256 + number（Keywords は 537）
    pub const fn combined(self) -> u16 {
        (self.record as u16) << 8 | self.number as u16
    }
}

impl fmt::Display for DataSetTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.record, self.number)
    }
}

/// 既知データセットの名前。未知のタグは "Unknown"
pub fn dataset_name(tag: DataSetTag) -> &'static str {
    match tag {
        DataSetTag::ENVELOPE_RECORD_VERSION => "Envelope Record Version",
        DataSetTag::CODED_CHARACTER_SET => "Coded Character Set",
        DataSetTag::RECORD_VERSION => "Record Version",
        DataSetTag::OBJECT_NAME => "Object Name",
        DataSetTag::EDIT_STATUS => "Edit Status",
        DataSetTag::URGENCY => "Urgency",
        DataSetTag::CATEGORY => "Category",
        DataSetTag::SUPPLEMENTAL_CATEGORY => "Supplemental Category",
        DataSetTag::KEYWORDS => "Keywords",
        DataSetTag::SPECIAL_INSTRUCTIONS => "Special Instructions",
        DataSetTag::DATE_CREATED => "Date Created",
        DataSetTag::TIME_CREATED => "Time Created",
        DataSetTag::DIGITAL_CREATION_DATE => "Digital Creation Date",
        DataSetTag::DIGITAL_CREATION_TIME => "Digital Creation Time",
        DataSetTag::ORIGINATING_PROGRAM => "Originating Program",
        DataSetTag::BY_LINE => "By-line",
        DataSetTag::BY_LINE_TITLE => "By-line Title",
        DataSetTag::CITY => "City",
        DataSetTag::SUB_LOCATION => "Sub-location",
        DataSetTag::PROVINCE_STATE => "Province/State",
        DataSetTag::COUNTRY_CODE => "Country Code",
        DataSetTag::COUNTRY_NAME => "Country Name",
        DataSetTag::ORIGINAL_TRANSMISSION_REFERENCE => "Original Transmission Reference",
        DataSetTag::HEADLINE => "Headline",
        DataSetTag::CREDIT => "Credit",
        DataSetTag::SOURCE => "Source",
        DataSetTag::COPYRIGHT_NOTICE => "Copyright Notice",
        DataSetTag::CONTACT => "Contact",
        DataSetTag::CAPTION => "Caption/Abstract",
        DataSetTag::WRITER_EDITOR => "Writer/Editor",
        _ => "Unknown",
    }
}

/// IIMデータセット。値は解釈せずバイト列のまま保持する
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSet {
    pub tag: DataSetTag,
    pub value: Vec<u8>,
}

impl DataSet {
    pub fn new(tag: DataSetTag, value: Vec<u8>) -> Self {
        Self { tag, value }
    }

    pub fn name(&self) -> &'static str {
        dataset_name(self.tag)
    }

    /// 値を文字列として読む（UTF-8、不正な場合は ISO-8859-1）
    pub fn value_text(&self) -> String {
        decode_text(&self.value)
    }
}

pub(crate) fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// 順序付きのデータセット列
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IimContainer {
    datasets: Vec<DataSet>,
}

impl IimContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn datasets(&self) -> &[DataSet] {
        &self.datasets
    }

    /// 末尾に追加（既存のデータセットは置き換えない）
    pub fn push(&mut self, dataset: DataSet) {
        self.datasets.push(dataset);
    }

    pub fn find_all(&self, tag: DataSetTag) -> impl Iterator<Item = &DataSet> {
        self.datasets.iter().filter(move |ds| ds.tag == tag)
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

impl From<Vec<DataSet>> for IimContainer {
    fn from(datasets: Vec<DataSet>) -> Self {
        Self { datasets }
    }
}

/// `show --json` 用の表示形式
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSetView {
    pub tag: String,
    pub name: &'static str,
    pub length: usize,
    pub value: String,
}

impl From<&DataSet> for DataSetView {
    fn from(ds: &DataSet) -> Self {
        Self {
            tag: ds.tag.to_string(),
            name: ds.name(),
            length: ds.value.len(),
            value: ds.value_text(),
        }
    }
}
