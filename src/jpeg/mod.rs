//! JPEGコンテナ操作
//!
//! SOS までのヘッダセグメントだけを分解し、スキャンデータ以降は
//! そのままのバイト列として保持する。画像のデコードは行わない。

pub mod photoshop;

use crate::error::{PhotoLabelerError, Result};

pub const MARKER_PREFIX: u8 = 0xFF;
pub const SOI: u8 = 0xD8;
pub const EOI: u8 = 0xD9;
pub const SOS: u8 = 0xDA;
pub const APP0: u8 = 0xE0;
pub const APP1: u8 = 0xE1;
pub const APP13: u8 = 0xED;

/// 長さフィールドを持たないマーカー (TEM, RST0-7)
fn is_standalone(marker: u8) -> bool {
    marker == 0x01 || (0xD0..=0xD7).contains(&marker)
}

/// ヘッダセグメント。payload は長さフィールドを含まない
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub marker: u8,
    pub payload: Vec<u8>,
}

impl Segment {
    pub fn new(marker: u8, payload: Vec<u8>) -> Self {
        Self { marker, payload }
    }

    /// 1セグメントに格納できる最大ペイロード長
    pub const MAX_PAYLOAD: usize = u16::MAX as usize - 2;

    fn write_to(&self, out: &mut Vec<u8>) {
        out.push(MARKER_PREFIX);
        out.push(self.marker);
        if is_standalone(self.marker) {
            return;
        }
        out.extend_from_slice(&((self.payload.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(&self.payload);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JpegFile {
    pub segments: Vec<Segment>,
    /// SOS (または EOI) マーカーからファイル末尾まで
    pub scan_data: Vec<u8>,
}

impl JpegFile {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 2 || bytes[0] != MARKER_PREFIX || bytes[1] != SOI {
            return Err(invalid("SOIマーカーがありません".into()));
        }

        let mut segments = Vec::new();
        let mut pos = 2;

        loop {
            if pos >= bytes.len() {
                return Err(invalid("SOSマーカーの前にファイルが終了しました".into()));
            }
            if bytes[pos] != MARKER_PREFIX {
                return Err(invalid(format!(
                    "オフセット{}にマーカーがありません (0x{:02X})",
                    pos, bytes[pos]
                )));
            }

            // フィルバイト (連続する 0xFF) を読み飛ばす
            let mut marker_pos = pos;
            while bytes.get(marker_pos + 1) == Some(&MARKER_PREFIX) {
                marker_pos += 1;
            }
            let marker = *bytes
                .get(marker_pos + 1)
                .ok_or_else(|| invalid("マーカーが途切れています".into()))?;

            if marker == SOS || marker == EOI {
                return Ok(Self {
                    segments,
                    scan_data: bytes[marker_pos..].to_vec(),
                });
            }

            pos = marker_pos + 2;
            if is_standalone(marker) {
                segments.push(Segment::new(marker, Vec::new()));
                continue;
            }

            let length_bytes = bytes
                .get(pos..pos + 2)
                .ok_or_else(|| invalid(format!("0xFF{:02X} の長さフィールドが途切れています", marker)))?;
            let length = u16::from_be_bytes([length_bytes[0], length_bytes[1]]) as usize;
            if length < 2 {
                return Err(invalid(format!("0xFF{:02X} の長さ {} が不正です", marker, length)));
            }
            let payload = bytes
                .get(pos + 2..pos + length)
                .ok_or_else(|| invalid(format!("0xFF{:02X} セグメントが途切れています", marker)))?;

            segments.push(Segment::new(marker, payload.to_vec()));
            pos += length;
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let payload_len: usize = self.segments.iter().map(|s| s.payload.len() + 4).sum();
        let mut out = Vec::with_capacity(2 + payload_len + self.scan_data.len());
        out.push(MARKER_PREFIX);
        out.push(SOI);
        for segment in &self.segments {
            segment.write_to(&mut out);
        }
        out.extend_from_slice(&self.scan_data);
        out
    }
}

fn invalid(message: String) -> PhotoLabelerError {
    PhotoLabelerError::InvalidJpeg(message)
}
