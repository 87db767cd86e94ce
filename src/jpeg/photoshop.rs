//! Photoshop APP13 (8BIM イメージリソース) の読み書き
//!
//! IPTC IIM ブロックはリソースID 0x0404 に格納される。

use crate::error::{PhotoLabelerError, Result};

pub const PHOTOSHOP_HEADER: &[u8] = b"Photoshop 3.0\0";
pub const RESOURCE_SIGNATURE: &[u8] = b"8BIM";
pub const IPTC_RESOURCE_ID: u16 = 0x0404;

/// APP13 ペイロードが Photoshop イメージリソースかどうか
pub fn is_photoshop_payload(payload: &[u8]) -> bool {
    payload.starts_with(PHOTOSHOP_HEADER)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResource {
    pub id: u16,
    /// Pascal文字列の中身（長さバイトを含まない）
    pub name: Vec<u8>,
    pub data: Vec<u8>,
}

impl ImageResource {
    pub fn new(id: u16, data: Vec<u8>) -> Self {
        Self {
            id,
            name: Vec::new(),
            data,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoshopResources {
    pub resources: Vec<ImageResource>,
}

impl PhotoshopResources {
    /// ヘッダ (`Photoshop 3.0\0`) 以降のリソース列を解析する
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut resources = Vec::new();
        let mut pos = 0;

        while pos < data.len() {
            let rest = &data[pos..];
            if !rest.starts_with(RESOURCE_SIGNATURE) {
                if rest.iter().all(|&b| b == 0) {
                    break;
                }
                return Err(malformed(format!("オフセット{}に8BIMシグネチャがありません", pos)));
            }
            pos += RESOURCE_SIGNATURE.len();

            let id_bytes = take(data, pos, 2, "リソースID")?;
            let id = u16::from_be_bytes([id_bytes[0], id_bytes[1]]);
            pos += 2;

            let name_len = take(data, pos, 1, "リソース名")?[0] as usize;
            let name = take(data, pos + 1, name_len, "リソース名")?.to_vec();
            // 長さバイト込みで偶数長にパディングされる
            pos += padded(1 + name_len);

            let size_bytes = take(data, pos, 4, "リソースサイズ")?;
            let size = u32::from_be_bytes([
                size_bytes[0],
                size_bytes[1],
                size_bytes[2],
                size_bytes[3],
            ]) as usize;
            pos += 4;

            let body = take(data, pos, size, "リソースデータ")?.to_vec();
            pos += padded(size);

            resources.push(ImageResource { id, name, data: body });
        }

        Ok(Self { resources })
    }

    /// APP13 ペイロードの列を連結して解析する。Photoshop 以外の APP13 は無視する
    pub fn from_segments<'a>(
        payloads: impl IntoIterator<Item = &'a [u8]>,
    ) -> Result<Option<Self>> {
        let mut joined: Option<Vec<u8>> = None;
        for payload in payloads {
            if is_photoshop_payload(payload) {
                joined
                    .get_or_insert_with(Vec::new)
                    .extend_from_slice(&payload[PHOTOSHOP_HEADER.len()..]);
            }
        }
        joined.map(|data| Self::parse(&data)).transpose()
    }

    pub fn iptc(&self) -> Option<&[u8]> {
        self.resources
            .iter()
            .find(|r| r.id == IPTC_RESOURCE_ID)
            .map(|r| r.data.as_slice())
    }

    /// IPTC リソースを置き換える。存在しなければ末尾に追加
    pub fn set_iptc(&mut self, data: Vec<u8>) {
        match self.resources.iter_mut().find(|r| r.id == IPTC_RESOURCE_ID) {
            Some(resource) => resource.data = data,
            None => self.resources.push(ImageResource::new(IPTC_RESOURCE_ID, data)),
        }
    }

    /// ヘッダ付きの APP13 ペイロードを生成する
    pub fn to_payload(&self) -> Result<Vec<u8>> {
        let mut out = PHOTOSHOP_HEADER.to_vec();
        out.extend(self.resource_stream()?);
        Ok(out)
    }

    /// `max_payload` bytes 以下のペイロード列に分割する。各ペイロードにヘッダを付ける
    pub fn to_segment_payloads(&self, max_payload: usize) -> Result<Vec<Vec<u8>>> {
        let chunk_size = max_payload.saturating_sub(PHOTOSHOP_HEADER.len());
        if chunk_size == 0 {
            return Err(PhotoLabelerError::Serialization(format!(
                "セグメント長 {} bytes ではヘッダを格納できません",
                max_payload
            )));
        }

        let stream = self.resource_stream()?;
        if stream.is_empty() {
            return Ok(vec![PHOTOSHOP_HEADER.to_vec()]);
        }

        Ok(stream
            .chunks(chunk_size)
            .map(|chunk| {
                let mut payload = PHOTOSHOP_HEADER.to_vec();
                payload.extend_from_slice(chunk);
                payload
            })
            .collect())
    }

    fn resource_stream(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();

        for resource in &self.resources {
            let name_len = u8::try_from(resource.name.len()).map_err(|_| {
                PhotoLabelerError::Serialization(format!(
                    "リソース 0x{:04X} の名前が長すぎます",
                    resource.id
                ))
            })?;
            let size = u32::try_from(resource.data.len()).map_err(|_| {
                PhotoLabelerError::Serialization(format!(
                    "リソース 0x{:04X} のサイズが上限を超えています",
                    resource.id
                ))
            })?;

            out.extend_from_slice(RESOURCE_SIGNATURE);
            out.extend_from_slice(&resource.id.to_be_bytes());
            out.push(name_len);
            out.extend_from_slice(&resource.name);
            if (1 + resource.name.len()) % 2 == 1 {
                out.push(0);
            }
            out.extend_from_slice(&size.to_be_bytes());
            out.extend_from_slice(&resource.data);
            if resource.data.len() % 2 == 1 {
                out.push(0);
            }
        }

        Ok(out)
    }
}

fn padded(len: usize) -> usize {
    len + len % 2
}

fn take<'a>(data: &'a [u8], pos: usize, len: usize, what: &str) -> Result<&'a [u8]> {
    pos.checked_add(len)
        .and_then(|end| data.get(pos..end))
        .ok_or_else(|| malformed(format!("{}が途切れています（オフセット{}）", what, pos)))
}

fn malformed(message: String) -> PhotoLabelerError {
    PhotoLabelerError::MalformedMetadata(message)
}
