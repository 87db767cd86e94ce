//! photo-labeler
//!
//! JPEG写真をクラウドの画像ラベル検出APIに送り、返ってきたラベル名を
//! IPTC IIM の Keywords (2:25) に追記した新しいファイルを書き出す。

pub mod cli;
pub mod config;
pub mod error;
pub mod iptc;
pub mod jpeg;
pub mod labels;
pub mod loader;
pub mod merger;
pub mod tagger;
