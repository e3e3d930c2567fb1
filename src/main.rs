use clap::Parser;
use crop_ai_common::summarize;
use crop_ai_rust::{cli, config, error, history, pipeline, registry, report, save, scanner};
use crop_ai_rust::stats::BatchStats;
use cli::{Cli, Commands, HistoryAction};
use config::Config;
use error::{CropAiError, Result};
use history::{HistoryStore, HttpHistoryStore};
use indicatif::{ProgressBar, ProgressStyle};
use pipeline::{BatchPipeline, HttpClassifier, Pacer, ProgressEvent};
use registry::{ItemRegistry, ItemStatus, PreviewStore, SelectionMode, ThumbnailDir};
use report::BatchReport;
use save::{SaveCoordinator, SaveOutcome};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("✘ {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;

    match cli.command {
        Commands::Analyze { paths, batch, save, output, heatmap_dir, pace_ms } => {
            println!("🌿 crop-ai - 作物診断\n");
            let mode = if batch { SelectionMode::Batch } else { SelectionMode::Single };
            let pace = pace_ms.map(Duration::from_millis).unwrap_or_else(|| config.pace());
            analyze(&config, paths, mode, save, output, heatmap_dir, pace).await?;
        }

        Commands::History { action } => {
            let token = config.require_credential()?;
            let store = HttpHistoryStore::new(&config.history_url, config.request_timeout())?;
            history_command(&store, &token, action).await?;
        }

        Commands::Config { set_token, clear_token, classifier_url, history_url, show } => {
            let mut config = config;

            if let Some(token) = set_token {
                config.set_token(Some(token))?;
                println!("✔ 認証トークンを設定しました");
            }
            if clear_token {
                config.set_token(None)?;
                println!("✔ 認証トークンを削除しました");
            }
            if classifier_url.is_some() || history_url.is_some() {
                if let Some(url) = classifier_url {
                    config.classifier_url = url;
                }
                if let Some(url) = history_url {
                    config.history_url = url;
                }
                config.save()?;
                println!("✔ URLを更新しました");
            }

            if show {
                println!("設定:");
                println!("  分類サービス: {}", config.classifier_url);
                println!("  履歴ストア: {}", config.history_url);
                println!("  画像間ウェイト: {}ms", config.pace_ms);
                println!("  認証トークン: {}", if config.credential().is_some() { "設定済み" } else { "未設定" });
            }
        }
    }

    Ok(())
}

async fn analyze(
    config: &Config,
    paths: Vec<PathBuf>,
    mode: SelectionMode,
    save: bool,
    output: Option<PathBuf>,
    heatmap_dir: Option<PathBuf>,
    pace: Duration,
) -> Result<()> {
    // 保存を頼まれているなら、解析で待たせる前に認証を確認する
    let token = if save { Some(config.require_credential()?) } else { None };

    // 1. 画像選択
    println!("[1/3] 画像を読み込み中...");
    let images = scanner::load_selection(&paths)?;
    let preview_dir = Config::preview_dir().join(std::process::id().to_string());
    let previews: Arc<dyn PreviewStore> = Arc::new(ThumbnailDir::new(preview_dir)?);
    let mut registry = ItemRegistry::new(previews);
    registry.set_mode(mode);
    registry.select(images, mode)?;
    println!("✔ {}枚を選択 ({}モード)\n", registry.len(), mode.as_str());

    // 2. 解析
    println!("[2/3] AI解析中...");
    let classifier = HttpClassifier::new(&config.classifier_url, config.request_timeout())?;
    let pipeline = BatchPipeline::new(classifier, Pacer::new(pace));

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("  {bar:40.green/white} {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    let stats = pipeline
        .start(&mut registry)?
        .run_to_end(|event| {
            bar.set_position(event.percent() as u64);
            match event {
                ProgressEvent::Processing { file_name, .. } => bar.set_message(file_name.clone()),
                ProgressEvent::ItemDone { file_name, status: ItemStatus::Error, .. } => {
                    bar.println(format!("  ✘ {} の解析に失敗", file_name));
                }
                ProgressEvent::ItemDone { .. } => {}
                ProgressEvent::Finished { .. } => bar.finish_and_clear(),
            }
        })
        .await;
    println!("✔ 解析完了\n");

    for (index, item) in registry.items().iter().enumerate() {
        report::print_item(index, item);
    }
    if BatchStats::is_reportable(registry.mode(), registry.len()) {
        println!();
        report::print_stats(&stats);
    }

    // 3. 保存・出力
    println!("\n[3/3] 結果を出力中...");
    let mut batch_report = BatchReport::from_registry(&registry);
    if let Some(dir) = heatmap_dir {
        let written = report::write_heatmaps(&registry, &mut batch_report, &dir)?;
        println!("✔ ヒートマップ {}枚を保存: {}", written, dir.display());
    }
    if let Some(path) = output {
        batch_report.write_json(&path)?;
        println!("✔ 結果を保存: {}", path.display());
    }
    if let Some(token) = token {
        save_completed(config, &registry, &token).await?;
    }

    println!("\n✅ 完了");
    Ok(())
}

/// 解析済みの画像を1枚ずつ保存する（1枚の失敗で残りは止めない）
async fn save_completed(config: &Config, registry: &ItemRegistry, token: &str) -> Result<()> {
    let store = HttpHistoryStore::new(&config.history_url, config.request_timeout())?;
    let coordinator = SaveCoordinator::new(store, config.saved_reset());

    for item in registry.items().iter().filter(|i| i.status() == ItemStatus::Completed) {
        match coordinator.save(item, Some(token)).await {
            Ok(SaveOutcome::Saved { prediction_id }) => {
                println!("✔ 履歴に保存: {} (ID: {})", item.file_name(), prediction_id);
            }
            Ok(SaveOutcome::Skipped(_)) => {}
            Err(e) => println!("✘ {}: {}", item.file_name(), e),
        }
    }
    let failed = coordinator.failed_count();
    if failed > 0 {
        println!("✘ {}件の保存に失敗しました", failed);
    }
    Ok(())
}

async fn history_command(store: &impl HistoryStore, token: &str, action: HistoryAction) -> Result<()> {
    match action {
        HistoryAction::List { filter } => {
            let entries = store.list(token).await?;
            let shown = filter.apply(&entries);
            let stats = summarize(&entries);
            println!(
                "📚 履歴 {}件（健康 {} / 病害 {}）\n",
                stats.total, stats.healthy, stats.diseased
            );
            for entry in shown {
                println!(
                    "{}  {}  {} ({:.1}%)  {}",
                    format_timestamp(&entry.timestamp),
                    entry.prediction_id,
                    entry.disease,
                    entry.confidence * 100.0,
                    entry.filename
                );
            }
        }

        HistoryAction::Stats => {
            let stats = store.stats(token).await?;
            println!("合計: {}", stats.total);
            println!("健康: {}", stats.healthy);
            println!("病害: {}", stats.diseased);
        }

        HistoryAction::Delete { prediction_id, yes } => {
            if !yes {
                let confirmed = dialoguer::Confirm::new()
                    .with_prompt(format!("{} を削除しますか?", prediction_id))
                    .default(false)
                    .interact()
                    .map_err(|e| CropAiError::Prompt(e.to_string()))?;
                if !confirmed {
                    println!("中止しました");
                    return Ok(());
                }
            }
            store.delete(&prediction_id, token).await?;
            println!("✔ 削除しました: {}", prediction_id);
        }
    }
    Ok(())
}

/// ストアのISO 8601（UTC、タイムゾーンなし）を表示用に整形
fn format_timestamp(timestamp: &str) -> String {
    chrono::NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}
