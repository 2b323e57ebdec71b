//! 通道状态查询命令

use crate::commands::config::CliConfig;
use crate::link::LinkArgs;
use anyhow::Result;
use clap::Args;
use servolink_client::HostSession;
use servolink_protocol::ChannelId;
use servolink_tools::MemoryPoseStore;
use std::time::Duration;

/// 查询命令参数
#[derive(Args, Debug)]
pub struct QueryCommand {
    /// 通道 ID
    #[arg(short, long)]
    pub servo: ChannelId,

    /// 应答超时（毫秒）
    #[arg(short, long, default_value_t = 500)]
    pub timeout_ms: u64,

    #[command(flatten)]
    pub link: LinkArgs,
}

impl QueryCommand {
    pub fn execute(&self) -> Result<()> {
        let config = CliConfig::load()?;
        let transport = self.link.open_duplex(&config)?;

        let mut session = HostSession::new(transport, MemoryPoseStore::new())
            .with_query_timeout(Duration::from_millis(self.timeout_ms));
        let status = session.query(self.servo)?;

        println!("📊 通道 {}:", status.channel);
        println!("  当前: {}°", status.current);
        println!("  目标: {}°", status.target);
        println!("  状态: {}", if status.settled { "已到位" } else { "运动中" });
        Ok(())
    }
}
