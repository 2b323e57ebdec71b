//! 单通道目标命令

use crate::commands::config::CliConfig;
use crate::link::LinkArgs;
use crate::validation::parse_angle;
use anyhow::Result;
use clap::Args;
use servolink_client::CommandSink;
use servolink_protocol::{Angle, ChannelId, Command};

/// 单通道目标命令参数
#[derive(Args, Debug)]
pub struct SetCommand {
    /// 通道 ID
    #[arg(short, long)]
    pub servo: ChannelId,

    /// 目标角度（度），超出通道范围时由控制器限幅
    #[arg(short, long, value_parser = parse_angle, allow_hyphen_values = true)]
    pub angle: Angle,

    #[command(flatten)]
    pub link: LinkArgs,
}

impl SetCommand {
    pub fn execute(&self) -> Result<()> {
        let config = CliConfig::load()?;
        let mut sink = self.link.open_sink(&config)?;

        sink.send(&Command::SetAngle {
            channel: self.servo,
            angle: self.angle,
        })?;

        if !self.link.stdout {
            println!("✅ 通道 {} -> {}°", self.servo, self.angle);
        }
        Ok(())
    }
}
