//! 配置管理命令
//!
//! 用于管理 CLI 配置（默认串口、波特率、姿态文件）

use anyhow::{Context, Result};
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 配置文件路径
fn config_dir() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;

    path.push("servolink");
    Ok(path)
}

fn config_file() -> Result<PathBuf> {
    let mut path = config_dir()?;
    fs::create_dir_all(&path).context("创建配置目录失败")?;

    path.push("cli.toml");
    Ok(path)
}

/// 默认姿态文件：数据目录下的 `servolink/poses.json`
fn default_store_path() -> Result<PathBuf> {
    let mut path = dirs::data_dir().ok_or_else(|| anyhow::anyhow!("无法确定数据目录"))?;
    path.push("servolink");
    path.push("poses.json");
    Ok(path)
}

/// CLI 配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// 默认串口
    pub port: Option<String>,

    /// 默认波特率
    pub baud: Option<u32>,

    /// 姿态文件
    pub store: Option<PathBuf>,
}

impl CliConfig {
    /// 加载配置
    pub fn load() -> Result<Self> {
        let path = config_file()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).context("读取配置文件失败")?;
        toml::from_str(&content).context("解析配置文件失败")
    }

    /// 保存配置
    pub fn save(&self) -> Result<()> {
        let path = config_file()?;
        let content = toml::to_string_pretty(self).context("序列化配置失败")?;
        fs::write(&path, format!("# Servolink CLI Configuration\n\n{}", content))
            .context("写入配置文件失败")?;

        Ok(())
    }

    /// 姿态文件路径（命令行参数优先）
    pub fn store_path(&self, override_path: Option<&Path>) -> Result<PathBuf> {
        match override_path.or(self.store.as_deref()) {
            Some(path) => Ok(path.to_path_buf()),
            None => default_store_path(),
        }
    }
}

fn show<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "(未设置)".to_string(), |v| v.to_string())
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 设置配置项
    Set {
        /// 默认串口（如 /dev/ttyUSB0, COM3）
        #[arg(short, long)]
        port: Option<String>,

        /// 默认波特率
        #[arg(short, long)]
        baud: Option<u32>,

        /// 姿态文件路径
        #[arg(short, long)]
        store: Option<PathBuf>,
    },

    /// 获取配置项
    Get {
        /// 配置项名称（port, baud, store, all）
        #[arg(default_value = "all")]
        key: String,
    },

    /// 检查配置和可用串口
    Check,
}

impl ConfigCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            ConfigCommand::Set { port, baud, store } => Self::set_(port, baud, store),

            ConfigCommand::Get { key } => Self::get_(&key),

            ConfigCommand::Check => Self::check_(),
        }
    }

    fn set_(port: Option<String>, baud: Option<u32>, store: Option<PathBuf>) -> Result<()> {
        let mut config = CliConfig::load()?;

        if let Some(port) = port {
            println!("✅ 设置默认串口: {}", port);
            config.port = Some(port);
        }

        if let Some(baud) = baud {
            println!("✅ 设置默认波特率: {}", baud);
            config.baud = Some(baud);
        }

        if let Some(store) = store {
            println!("✅ 设置姿态文件: {}", store.display());
            config.store = Some(store);
        }

        config.save()?;
        Ok(())
    }

    fn get_(key: &str) -> Result<()> {
        let config = CliConfig::load()?;

        match key {
            "port" => println!("{}", show(config.port.as_deref())),

            "baud" => println!("{}", show(config.baud)),

            "store" => println!("{}", config.store_path(None)?.display()),

            _ => {
                println!("Servolink CLI 配置:");
                println!("  串口: {}", show(config.port.as_deref()));
                println!("  波特率: {}", show(config.baud));
                println!("  姿态文件: {}", config.store_path(None)?.display());
            },
        }

        Ok(())
    }

    fn check_() -> Result<()> {
        let config = CliConfig::load()?;
        let path = config_file()?;

        println!("配置文件: {}", path.display());
        println!("  串口: {}", show(config.port.as_deref()));
        println!("  波特率: {}", show(config.baud));
        println!("  姿态文件: {}", config.store_path(None)?.display());

        match tokio_serial::available_ports() {
            Ok(ports) if ports.is_empty() => println!("⚠️  未发现串口设备"),
            Ok(ports) => {
                println!("可用串口:");
                for port in ports {
                    println!("  {}", port.port_name);
                }
            },
            Err(e) => println!("⚠️  无法枚举串口: {}", e),
        }

        Ok(())
    }
}
