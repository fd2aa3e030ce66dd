use assetexport_lib::commands::{self, SettingsUpdate};
use assetexport_lib::{logging, ExportError};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "assetexport", version, about = "将设计帧导出为 PNG 资源并同步清单")]
struct Cli {
    /// 数据目录（config.json 与日志），默认为系统配置目录下的 assetexport
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// 同时在终端输出日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 导出帧目录中的所有 PNG
    Export {
        /// 帧目录，结构为 <分类>/<名称>.png
        #[arg(long)]
        frames: PathBuf,
        /// 写入本地目录而不是远程仓库
        #[arg(long)]
        local: Option<PathBuf>,
    },
    /// 查看或修改配置
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Debug, Subcommand)]
enum SettingsAction {
    Show,
    Set {
        #[arg(long)]
        token: Option<String>,
        /// 目标仓库 owner/name
        #[arg(long)]
        repo: Option<String>,
        /// 写入分支
        #[arg(long)]
        branch: Option<String>,
        /// 读取清单的分支
        #[arg(long)]
        manifest_ref: Option<String>,
        #[arg(long)]
        log_level: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(assetexport_lib::default_data_dir);
    let _guard = logging::init(&data_dir, cli.verbose);

    match cli.command {
        Command::Export { frames, local } => {
            match commands::run_export(&data_dir, &frames, local.as_deref()).await {
                Ok(report) if report.is_success() => ExitCode::SUCCESS,
                Ok(report) => {
                    if let Some(reason) = report.errors.first() {
                        eprintln!("导出中止: {}", reason);
                    }
                    ExitCode::FAILURE
                }
                Err(e) => {
                    // 前置条件错误已通过状态消息输出
                    if e.downcast_ref::<ExportError>().is_none() {
                        eprintln!("错误: {:#}", e);
                    }
                    ExitCode::from(2)
                }
            }
        }
        Command::Settings { action } => {
            let result = match action {
                SettingsAction::Show => commands::show_settings(&data_dir).map(|text| {
                    println!("{}", text);
                }),
                SettingsAction::Set {
                    token,
                    repo,
                    branch,
                    manifest_ref,
                    log_level,
                } => commands::update_settings(
                    &data_dir,
                    SettingsUpdate {
                        token,
                        repo,
                        branch,
                        manifest_ref,
                        log_level,
                    },
                )
                .map(|_| println!("配置已保存")),
            };
            match result {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("错误: {:#}", e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}
