use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "object-detective")]
#[command(about = "子供向け写真の物体認識（Gemini Vision）", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 設定ファイル（省略時は ~/.config/object-detective/config.json）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 写真（またはフォルダ内の写真）を認識してJSONを出力
    Recognize {
        /// 画像ファイルまたはフォルダのパス
        #[arg(required = true)]
        path: PathBuf,

        /// ファイル内容を base64 / Data URL テキストとして読む
        #[arg(long)]
        base64: bool,

        /// 出力JSONファイル（省略時は標準出力）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// HTTPサーバーを起動
    Serve {
        /// 待ち受けホスト（省略時は設定値）
        #[arg(long)]
        host: Option<String>,

        /// 待ち受けポート（省略時は設定値）
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// 設定を表示/編集
    Config {
        /// Google Cloud プロジェクトIDを設定
        #[arg(long)]
        set_project: Option<String>,

        /// Vertex AI のロケーションを設定
        #[arg(long)]
        set_location: Option<String>,

        /// モデル名を設定
        #[arg(long)]
        set_model: Option<String>,

        /// Gemini APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}
