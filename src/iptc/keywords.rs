//! 既存キーワード (2:25) の抽出

use super::{DataSetTag, IimContainer};

/// すべての Keywords データセットの値を、それぞれ `;` を付けて連結する
pub fn extract_keywords(container: &IimContainer) -> String {
    container
        .find_all(DataSetTag::KEYWORDS)
        .map(|ds| format!("{};", ds.value_text()))
        .collect()
}
