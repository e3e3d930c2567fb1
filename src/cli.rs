use clap::{Parser, Subcommand};
use crop_ai_common::HistoryFilter;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "crop-ai")]
#[command(about = "作物画像AI診断・バッチ解析ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 作物画像を診断
    Analyze {
        /// 画像ファイルまたはフォルダ（フォルダは直下の画像のみ）
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// バッチモード（最大10枚）。指定しなければ1枚のみ
        #[arg(short, long)]
        batch: bool,

        /// 解析済みの結果を履歴に保存
        #[arg(short, long)]
        save: bool,

        /// 結果JSONの出力先
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Grad-CAMヒートマップの出力フォルダ
        #[arg(long)]
        heatmap_dir: Option<PathBuf>,

        /// 画像間のウェイト（ミリ秒、省略時は設定値）
        #[arg(long)]
        pace_ms: Option<u64>,
    },

    /// 保存済みの履歴
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// 設定を表示/編集
    Config {
        /// 認証トークンを設定
        #[arg(long)]
        set_token: Option<String>,

        /// 認証トークンを削除
        #[arg(long, conflicts_with = "set_token")]
        clear_token: bool,

        /// 分類サービスのURL
        #[arg(long)]
        classifier_url: Option<String>,

        /// 履歴ストアのURL
        #[arg(long)]
        history_url: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

#[derive(Subcommand)]
pub enum HistoryAction {
    /// 履歴一覧（新しい順）
    List {
        /// 絞り込み (all/healthy/diseased)
        #[arg(short, long, default_value = "all")]
        filter: HistoryFilter,
    },

    /// 件数の集計
    Stats,

    /// 履歴を1件削除
    Delete {
        /// 削除するID
        #[arg(required = true)]
        prediction_id: String,

        /// 確認せずに削除
        #[arg(short, long)]
        yes: bool,
    },
}
