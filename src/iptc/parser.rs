//! IIMブロックの解析
//!
//! データセット構造:
//! - 0x1C タグマーカー
//! - レコード番号 (1 byte)
//! - データセット番号 (1 byte)
//! - 長さ (2 byte BE)。最上位ビットが立っている場合は拡張形式で、
//!   下位15ビットが後続の長さフィールドのバイト数を表す

use super::{DataSet, DataSetTag, IimContainer};
use crate::error::{PhotoLabelerError, Result};

pub(crate) const TAG_MARKER: u8 = 0x1C;

/// 拡張長さフィールドの最大バイト数
const MAX_EXTENDED_LENGTH_BYTES: usize = 4;

pub fn parse_iim(bytes: &[u8]) -> Result<IimContainer> {
    let mut datasets = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        if bytes[pos] != TAG_MARKER {
            // Photoshop は偶数長に揃えるため末尾に 0x00 を詰めることがある
            if bytes[pos..].iter().all(|&b| b == 0) {
                break;
            }
            return Err(malformed(format!(
                "オフセット{}に不正なタグマーカー 0x{:02X}",
                pos, bytes[pos]
            )));
        }

        let header = bytes
            .get(pos + 1..pos + 5)
            .ok_or_else(|| malformed(format!("オフセット{}でデータセットヘッダが途切れています", pos)))?;
        let tag = DataSetTag::new(header[0], header[1]);
        let raw_length = u16::from_be_bytes([header[2], header[3]]);
        pos += 5;

        let length = if raw_length & 0x8000 != 0 {
            let count = (raw_length & 0x7FFF) as usize;
            if count == 0 || count > MAX_EXTENDED_LENGTH_BYTES {
                return Err(malformed(format!(
                    "{} の拡張長さフィールドが不正です ({} bytes)",
                    tag, count
                )));
            }
            let length_bytes = bytes
                .get(pos..pos + count)
                .ok_or_else(|| malformed(format!("{} の拡張長さフィールドが途切れています", tag)))?;
            pos += count;
            length_bytes
                .iter()
                .fold(0usize, |acc, &b| (acc << 8) | b as usize)
        } else {
            raw_length as usize
        };

        let end = pos
            .checked_add(length)
            .filter(|&end| end <= bytes.len())
            .ok_or_else(|| {
                malformed(format!(
                    "{} の宣言長 {} bytes がブロック末尾を超えています（残り {} bytes）",
                    tag,
                    length,
                    bytes.len() - pos
                ))
            })?;

        datasets.push(DataSet::new(tag, bytes[pos..end].to_vec()));
        pos = end;
    }

    tracing::debug!("IIMデータセットを{}件読み込み", datasets.len());
    Ok(IimContainer::from(datasets))
}

fn malformed(message: String) -> PhotoLabelerError {
    PhotoLabelerError::MalformedMetadata(message)
}
