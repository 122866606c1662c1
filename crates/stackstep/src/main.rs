mod commands;
mod utils;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stackstep")]
#[command(about = "OpenStack にインスタンスを1台作成するワークフローステップ", long_about = None)]
struct Cli {
    /// 詳細ログを出力 (RUST_LOG が優先)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// インスタンスを作成
    Create(StepArgs),
    /// 認証のみ確認 (インスタンスは作成しない)
    #[command(name = "check-auth")]
    CheckAuth(StepArgs),
    /// 設定を検証 (ネットワークには接続しない)
    Validate(StepArgs),
    /// ステップのプロパティ定義を表示
    Describe {
        /// JSON で出力
        #[arg(long)]
        json: bool,
    },
    /// バージョン情報を表示
    Version,
}

/// ステップ設定。ファイル < 環境変数 (OS_*) < フラグ の順に上書きされる
#[derive(Args, Debug, Clone, Default)]
pub struct StepArgs {
    /// ステップ設定ファイル (省略時は step.yaml を自動検索)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// 設定ファイルを読み込まない
    #[arg(long, conflicts_with = "config")]
    pub no_config: bool,

    /// プロバイダー
    #[arg(long)]
    pub provider: Option<String>,

    /// Keystone エンドポイント (例: http://172.16.0.1:5000/v2.0/)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// テナント名とユーザー名 (tenant:user)
    #[arg(long)]
    pub identity: Option<String>,

    /// パスワード
    #[arg(long, env = "STACKSTEP_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// フレーバー (例: m1.small)
    #[arg(long)]
    pub flavor: Option<String>,

    /// OS ファミリー (ubuntu, centos, その他)
    #[arg(long = "os-family")]
    pub os_family: Option<String>,

    /// 64bit OS を使用
    #[arg(long = "os-64bit", num_args = 0..=1, default_missing_value = "true")]
    pub os_64bit: Option<bool>,

    /// イメージ名 (指定時は OS ファミリーより優先)
    #[arg(long = "image-name")]
    pub image_name: Option<String>,

    /// インスタンス名
    #[arg(short = 'n', long = "instance-name")]
    pub instance_name: Option<String>,

    /// グループ名
    #[arg(short = 'g', long = "group-name")]
    pub group_name: Option<String>,

    /// サービスカタログのリージョン
    #[arg(long, env = "OS_REGION_NAME")]
    pub region: Option<String>,

    /// HTTP リクエストのタイムアウト (秒)
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ログはstderrに出力
    let default_directive = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive)),
        )
        .init();

    // コマンドディスパッチ
    match cli.command {
        Commands::Create(args) => {
            commands::create::handle(&args).await?;
        }
        Commands::CheckAuth(args) => {
            commands::check_auth::handle(&args).await?;
        }
        Commands::Validate(args) => {
            commands::validate::handle(&args)?;
        }
        Commands::Describe { json } => {
            commands::describe::handle(json)?;
        }
        Commands::Version => {
            println!("stackstep {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
