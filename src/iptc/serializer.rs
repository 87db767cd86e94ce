//! IIMブロックの書き出し

use super::parser::TAG_MARKER;
use super::IimContainer;
use crate::error::{PhotoLabelerError, Result};

/// 標準形式で表現できる最大長
const MAX_STANDARD_LENGTH: usize = 0x7FFF;

/// データセットの長さフィールドをエンコードする
///
/// 32767 bytes 以下は 2 byte、それを超える場合は拡張形式 (0x8004 + 4 byte BE)。
/// u32 に収まらない長さは表現できないので `Serialization` エラー。
pub fn encode_length(length: usize) -> Result<Vec<u8>> {
    if length <= MAX_STANDARD_LENGTH {
        return Ok((length as u16).to_be_bytes().to_vec());
    }

    let length = u32::try_from(length).map_err(|_| {
        PhotoLabelerError::Serialization(format!(
            "データセット長 {} bytes は長さフィールドで表現できません",
            length
        ))
    })?;

    let mut encoded = vec![0x80, 0x04];
    encoded.extend_from_slice(&length.to_be_bytes());
    Ok(encoded)
}

pub fn serialize_iim(container: &IimContainer) -> Result<Vec<u8>> {
    let mut out = Vec::new();

    for ds in container.datasets() {
        out.push(TAG_MARKER);
        out.push(ds.tag.record);
        out.push(ds.tag.number);
        out.extend(encode_length(ds.value.len())?);
        out.extend_from_slice(&ds.value);
    }

    Ok(out)
}
