//! 主机端链路
//!
//! 打开串口，或把命令写到标准输出（配合 `controller --stdin` 调试）。

use crate::commands::config::CliConfig;
use anyhow::{Context, Result, bail};
use clap::Args;
use servolink_client::{CommandSink, WriterSink};
use servolink_driver::ReaderTransport;
use std::io;
use std::time::Duration;
use tokio_serial::SerialPort;
use tracing::info;

/// 默认波特率
pub const DEFAULT_BAUD: u32 = 9600;

/// 串口读超时；读线程在超时后继续等待
const SERIAL_READ_TIMEOUT: Duration = Duration::from_millis(10);

/// 打开串口
pub fn open_serial(port: &str, baud: u32) -> Result<Box<dyn SerialPort>> {
    let serial = tokio_serial::new(port, baud)
        .timeout(SERIAL_READ_TIMEOUT)
        .open()
        .with_context(|| format!("打开串口失败: {} @ {}", port, baud))?;
    info!("Opened {} at {} baud", port, baud);
    Ok(serial)
}

/// 串口的双向传输（读线程 + 写句柄）
pub fn serial_transport(serial: Box<dyn SerialPort>) -> Result<ReaderTransport> {
    let reader = serial.try_clone().context("复制串口句柄失败")?;
    ReaderTransport::spawn(reader, Box::new(serial)).context("启动串口读线程失败")
}

/// 链路参数
#[derive(Args, Debug, Clone, Default)]
pub struct LinkArgs {
    /// 串口设备（覆盖配置）
    #[arg(short, long)]
    pub port: Option<String>,

    /// 波特率（覆盖配置）
    #[arg(short, long)]
    pub baud: Option<u32>,

    /// 把命令写到标准输出而不是串口
    #[arg(long, conflicts_with = "port")]
    pub stdout: bool,
}

impl LinkArgs {
    /// 确定串口和波特率（命令行参数优先）
    fn resolve(&self, config: &CliConfig) -> Result<(String, u32)> {
        let Some(port) = self.port.clone().or_else(|| config.port.clone()) else {
            bail!("未指定串口：使用 --port 或 `servolink-cli config set --port <PORT>`");
        };
        let baud = self.baud.or(config.baud).unwrap_or(DEFAULT_BAUD);
        Ok((port, baud))
    }

    /// 打开只写链路
    pub fn open_sink(&self, config: &CliConfig) -> Result<Box<dyn CommandSink>> {
        if self.stdout {
            return Ok(Box::new(WriterSink::new(io::stdout())));
        }
        let (port, baud) = self.resolve(config)?;
        Ok(Box::new(WriterSink::new(open_serial(&port, baud)?)))
    }

    /// 打开双向链路（查询需要读取应答）
    pub fn open_duplex(&self, config: &CliConfig) -> Result<ReaderTransport> {
        if self.stdout {
            bail!("--stdout 无法读取应答，请指定串口");
        }
        let (port, baud) = self.resolve(config)?;
        serial_transport(open_serial(&port, baud)?)
    }
}
