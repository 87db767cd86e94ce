use crate::labels::LabelFailurePolicy;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "photo-labeler")]
#[command(about = "写真のAIラベルをIPTCキーワードとして書き込むツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// ラベルを検出してキーワードを書き込んだ新しいJPEGを出力
    Tag {
        /// 入力JPEGファイル（5MB以下）
        #[arg(required = true)]
        input: PathBuf,

        /// 出力ファイル（デフォルト: <入力>_modified.jpg）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 最大ラベル数
        #[arg(long)]
        max_labels: Option<i32>,

        /// 最小信頼度 (0-100)
        #[arg(long)]
        min_confidence: Option<f32>,

        /// AWSリージョン
        #[arg(long)]
        region: Option<String>,

        /// AWSプロファイル名
        #[arg(long)]
        profile: Option<String>,

        /// API呼び出しのタイムアウト（秒）
        #[arg(long)]
        timeout: Option<u64>,

        /// ラベル検出に失敗したら中断する
        #[arg(long)]
        strict: bool,
    },

    /// 埋め込まれているIPTCデータセットを表示
    Show {
        /// 入力JPEGファイル
        #[arg(required = true)]
        input: PathBuf,

        /// JSONで出力
        #[arg(long)]
        json: bool,
    },

    /// 設定を表示/編集
    Config {
        /// 設定を表示
        #[arg(long)]
        show: bool,

        /// AWSリージョンを設定
        #[arg(long)]
        set_region: Option<String>,

        /// AWSプロファイルを設定
        #[arg(long)]
        set_profile: Option<String>,

        /// 最大ラベル数を設定
        #[arg(long)]
        set_max_labels: Option<i32>,

        /// 最小信頼度を設定
        #[arg(long)]
        set_min_confidence: Option<f32>,

        /// タイムアウト（秒）を設定
        #[arg(long)]
        set_timeout: Option<u64>,

        /// ラベル検出失敗時の動作 (continue/abort)
        #[arg(long)]
        set_on_label_failure: Option<LabelFailurePolicy>,
    },
}
