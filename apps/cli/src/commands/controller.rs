//! 控制器命令
//!
//! 在本进程内运行控制循环：从串口（或标准输入）读取命令，按节拍推进舵机。
//! 没有 PWM 硬件时使用 [`TracingPwm`]，占空比写入 debug 日志。

use crate::link::{open_serial, serial_transport};
use anyhow::{Context, Result};
use clap::Args;
use servolink_driver::{
    ChannelSpec, ControllerBuilder, LoopConfig, PwmActuator, PwmCalibration, ReaderTransport,
    TracingPwm,
};
use servolink_tools::{ChannelConfig, ControllerConfig, PwmSettings};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};

/// 控制器命令参数
#[derive(Args, Debug)]
pub struct ControllerCommand {
    /// 控制器配置文件（TOML）；缺省使用四足机器人默认配置
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 串口设备（覆盖配置文件）
    #[arg(short, long, conflicts_with = "stdin")]
    pub port: Option<String>,

    /// 波特率（覆盖配置文件）
    #[arg(short, long)]
    pub baud: Option<u32>,

    /// 从标准输入读取命令，应答写到标准输出
    #[arg(long)]
    pub stdin: bool,

    /// 节拍周期（毫秒，覆盖配置文件）
    #[arg(long)]
    pub tick_ms: Option<u64>,

    /// 打印生效的配置并退出
    #[arg(long)]
    pub print_config: bool,
}

impl ControllerCommand {
    pub fn execute(&self) -> Result<()> {
        let config = self.effective_config()?;

        if self.print_config {
            print!(
                "{}",
                toml::to_string_pretty(&config).context("序列化配置失败")?
            );
            return Ok(());
        }

        let transport = self.open_transport(&config)?;
        let actuator = PwmActuator::new(TracingPwm, calibration(&config.pwm));

        let mut controller = builder(&config)
            .build(transport, actuator)
            .context("构建控制器失败")?;
        for (id, reason) in controller.rejected() {
            warn!("⚠️  通道 {} 未启用: {}", id, reason);
        }

        // Ctrl+C 只置位停止标志，控制循环在节拍边界退出
        let stop = Arc::new(AtomicBool::new(false));
        let handler_stop = Arc::clone(&stop);
        ctrlc::set_handler(move || {
            handler_stop.store(true, Ordering::Relaxed);
        })
        .context("设置 Ctrl+C 处理失败")?;

        let stats = controller.run(&stop);
        info!(
            "{} ticks, {} commands, {} actuations, {} rejected lines, {} overruns",
            stats.ticks,
            stats.commands,
            stats.actuations,
            stats.framing_errors + stats.malformed + stats.unknown_channel,
            stats.overruns
        );
        Ok(())
    }

    /// 配置文件 + 命令行覆盖
    fn effective_config(&self) -> Result<ControllerConfig> {
        let mut config = match &self.config {
            Some(path) => ControllerConfig::load_from_file(path)?,
            None => ControllerConfig::default(),
        };

        if let Some(port) = &self.port {
            config.serial.port = Some(port.clone());
        }
        if let Some(baud) = self.baud {
            config.serial.baud = baud;
        }
        if let Some(tick_ms) = self.tick_ms {
            config.tick_period_ms = tick_ms;
        }

        config.validate()?;
        Ok(config)
    }

    fn open_transport(&self, config: &ControllerConfig) -> Result<ReaderTransport> {
        if self.stdin {
            info!("Reading commands from stdin");
            return ReaderTransport::spawn(io::stdin(), Box::new(io::stdout()))
                .context("启动标准输入读线程失败");
        }

        let port = config
            .serial
            .port
            .as_deref()
            .context("未指定串口：使用 --port、--stdin 或在配置文件中设置 serial.port")?;
        serial_transport(open_serial(port, config.serial.baud)?)
    }
}

fn calibration(pwm: &PwmSettings) -> PwmCalibration {
    PwmCalibration {
        frequency_hz: pwm.frequency_hz,
        min_duty: pwm.min_duty,
        max_duty: pwm.max_duty,
    }
}

fn channel_spec(channel: &ChannelConfig) -> ChannelSpec {
    let mut spec = ChannelSpec::new(
        channel.id,
        channel.pin,
        channel.min,
        channel.max,
        channel.initial,
    );
    if let Some(name) = &channel.name {
        spec = spec.named(name.clone());
    }
    if let Some(step) = channel.step {
        spec = spec.with_step_size(step);
    }
    spec
}

fn builder(config: &ControllerConfig) -> ControllerBuilder {
    ControllerBuilder::new()
        .loop_config(LoopConfig {
            tick_period: Duration::from_millis(config.tick_period_ms),
            max_line_len: config.max_line_len,
            echo_errors: config.echo_errors,
        })
        .default_step(config.default_step)
        .channels(config.channels.iter().map(channel_spec))
}
