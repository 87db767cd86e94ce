//! 画像ファイル読み込み
//!
//! サイズ上限はAPI側の制約であり、ここでは検証しない（呼び出し側の前提条件）。

use crate::error::{PhotoLabelerError, Result};
use std::path::Path;

/// Rekognition に bytes で渡せる画像の上限 (5MB)
pub const MAX_API_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// ファイル全体をメモリに読み込む
pub fn load_image(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| PhotoLabelerError::file_access(path, e))
}

pub fn exceeds_api_limit(bytes: &[u8]) -> bool {
    bytes.len() > MAX_API_IMAGE_BYTES
}
