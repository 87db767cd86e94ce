use clap::Parser;
use photo_labeler::{cli, config, error, iptc, labels, tagger};
use cli::{Cli, Commands};
use config::Config;
use error::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Tag {
            input,
            output,
            max_labels,
            min_confidence,
            region,
            profile,
            timeout,
            strict,
        } => {
            println!("📸 photo-labeler - ラベル付与\n");

            let mut config = Config::load()?;
            if let Some(n) = max_labels {
                config.max_labels = n;
            }
            if let Some(c) = min_confidence {
                config.min_confidence = c;
            }
            if let Some(r) = region {
                config.region = r;
            }
            if profile.is_some() {
                config.profile = profile;
            }
            if let Some(t) = timeout {
                config.timeout_seconds = t;
            }
            if strict {
                config.on_label_failure = labels::LabelFailurePolicy::Abort;
            }
            config.validate()?;

            // 1. 認証情報（取得できなければ何もせず終了）
            println!("[1/3] AWSに接続中...");
            let source =
                labels::rekognition::RekognitionLabelSource::connect(&config.aws_settings()).await?;
            println!("✔ 接続完了 ({})\n", config.region);

            // 2. ラベル検出とマージ
            println!("[2/3] ラベル検出中...");
            let mut options = tagger::TagOptions::new(&input, &config);
            if let Some(output) = output {
                options = options.with_output(output);
            }
            let report = tagger::tag_photo(&source, &options).await?;
            println!("✔ {}件のラベルを検出\n", report.labels.len());

            // 3. 結果
            println!("[3/3] 結果");
            println!("  キーワード: {}", report.keyword_value);
            println!("  既存データセット: {}件", report.preserved_datasets);
            println!("  入力SHA-256: {}", report.input_sha256);
            println!("✔ 保存: {}", report.output.display());

            println!("\n✅ 完了");
        }

        Commands::Show { input, json } => {
            let metadata = tagger::inspect_photo(&input)?;

            if json {
                let views: Vec<iptc::DataSetView> =
                    metadata.iim().datasets().iter().map(iptc::DataSetView::from).collect();
                println!("{}", serde_json::to_string_pretty(&views)?);
            } else if !metadata.has_iptc_block() {
                println!("IPTCメタデータがありません: {}", input.display());
            } else {
                println!("IPTCデータセット ({}件):", metadata.iim().len());
                for ds in metadata.iim().datasets() {
                    println!("  {:>7} {:<24} {}", ds.tag.to_string(), ds.name(), ds.value_text());
                }
                println!("キーワード: {}", metadata.existing_keywords());
            }
        }

        Commands::Config {
            show,
            set_region,
            set_profile,
            set_max_labels,
            set_min_confidence,
            set_timeout,
            set_on_label_failure,
        } => {
            // 壊れた設定ファイルでも --set-* で修復できるようにする
            let mut config = Config::load_or_default();
            let mut changed = false;

            if let Some(region) = set_region {
                config.region = region;
                changed = true;
            }
            if let Some(profile) = set_profile {
                config.profile = Some(profile);
                changed = true;
            }
            if let Some(n) = set_max_labels {
                config.max_labels = n;
                changed = true;
            }
            if let Some(c) = set_min_confidence {
                config.min_confidence = c;
                changed = true;
            }
            if let Some(t) = set_timeout {
                config.timeout_seconds = t;
                changed = true;
            }
            if let Some(policy) = set_on_label_failure {
                config.on_label_failure = policy;
                changed = true;
            }

            if changed {
                config.save()?;
                println!("✔ 設定を保存しました: {}", Config::config_path()?.display());
            }

            if show || !changed {
                println!("設定:");
                println!("  リージョン: {}", config.region);
                println!("  プロファイル: {}", config.profile.as_deref().unwrap_or("(デフォルト)"));
                println!("  最大ラベル数: {}", config.max_labels);
                println!("  最小信頼度: {}", config.min_confidence);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  検出失敗時: {}", config.on_label_failure);
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
