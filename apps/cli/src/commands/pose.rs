//! 姿态管理命令

use crate::commands::config::CliConfig;
use crate::link::LinkArgs;
use crate::validation::parse_angle_list;
use anyhow::Result;
use clap::{Args, Subcommand};
use servolink_client::HostSession;
use servolink_protocol::Pose;
use servolink_tools::{JsonFilePoseStore, PoseStore};
use std::path::PathBuf;

/// 姿态命令参数
#[derive(Args, Debug)]
pub struct PoseCommand {
    /// 姿态文件（覆盖配置）
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub action: PoseAction,
}

/// 姿态子命令
#[derive(Subcommand, Debug)]
pub enum PoseAction {
    /// 列出所有姿态
    List,

    /// 显示姿态内容
    Show {
        /// 姿态名
        name: String,
    },

    /// 保存姿态
    Save {
        /// 姿态名
        name: String,

        /// 角度列表，例如 0=90,1=45.5
        #[arg(short, long, allow_hyphen_values = true)]
        angles: String,
    },

    /// 发送姿态到控制器
    Apply {
        /// 姿态名
        name: String,

        #[command(flatten)]
        link: LinkArgs,
    },
}

impl PoseCommand {
    pub fn execute(&self) -> Result<()> {
        let config = CliConfig::load()?;
        let mut store = JsonFilePoseStore::open(config.store_path(self.store.as_deref())?);

        match &self.action {
            PoseAction::List => {
                for name in store.list() {
                    println!("{}", name);
                }
            },

            PoseAction::Show { name } => {
                let pose = store.load(name)?;
                println!("{}:", pose.name());
                for (id, angle) in &pose {
                    println!("  {}: {}°", id, angle);
                }
            },

            PoseAction::Save { name, angles } => {
                let angles = parse_angle_list(angles)?;
                let count = angles.len();
                store.save(&Pose::new(name.as_str(), angles))?;
                println!("✅ 已保存姿态 '{}'（{} 个通道）", name, count);
            },

            PoseAction::Apply { name, link } => {
                let sink = link.open_sink(&config)?;
                let mut session = HostSession::new(sink, store);
                let pose = session.on_pose_selected(name)?;
                if !link.stdout {
                    println!("✅ 已发送姿态 '{}'（{} 个通道）", name, pose.len());
                }
            },
        }

        Ok(())
    }
}
