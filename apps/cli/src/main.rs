//! # Servolink CLI
//!
//! Command-line interface for servolink controllers and hosts.
//!
//! ## 主机模式
//!
//! ```bash
//! # 配置默认串口
//! servolink-cli config set --port /dev/ttyUSB0
//!
//! # 单通道目标
//! servolink-cli set --servo 0 --angle 45
//!
//! # 姿态
//! servolink-cli pose save stand --angles 0=90,1=90,2=90,3=90
//! servolink-cli pose apply stand
//!
//! # 查询
//! servolink-cli query --servo 0
//! ```
//!
//! ## 控制器模式
//!
//! ```bash
//! # 串口
//! servolink-cli controller --config quadruped.toml --port /dev/ttyAMA0
//!
//! # 标准输入/输出（调试）
//! servolink-cli set --servo 0 --angle 45 --stdout | servolink-cli controller --stdin
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod link;
mod validation;

use commands::{ConfigCommand, ControllerCommand, PoseCommand, QueryCommand, SetCommand};

/// Servolink CLI - 舵机命令行工具
#[derive(Parser, Debug)]
#[command(name = "servolink-cli")]
#[command(about = "Command-line interface for servolink controllers and hosts", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 设置单个通道的目标角度
    Set {
        #[command(flatten)]
        args: SetCommand,
    },

    /// 姿态管理
    Pose {
        #[command(flatten)]
        args: PoseCommand,
    },

    /// 查询通道状态
    Query {
        #[command(flatten)]
        args: QueryCommand,
    },

    /// 运行控制器循环
    Controller {
        #[command(flatten)]
        args: ControllerCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志（写到 stderr，stdout 留给协议数据）
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("servolink_cli=info".parse()?)
                .add_directive("servolink_driver=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config(cmd) => cmd.execute(),
        Commands::Set { args } => args.execute(),
        Commands::Pose { args } => args.execute(),
        Commands::Query { args } => args.execute(),
        Commands::Controller { args } => args.execute(),
    }
}
