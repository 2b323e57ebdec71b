//! # 控制器配置
//!
//! 控制器端的 TOML 配置：节拍、步长、串口、PWM 标定和通道表。
//!
//! 配置文件示例：
//!
//! ```toml
//! tick_period_ms = 20
//! default_step = 2.0
//!
//! [serial]
//! port = "/dev/ttyUSB0"
//! baud = 9600
//!
//! [[channels]]
//! id = 0
//! pin = 0
//! name = "Top Left Hip"
//! min = 0.0
//! max = 180.0
//! initial = 90.0
//! ```
//!
//! 所有字段都有默认值；缺省时为四足机器人的 8 路舵机（引脚 0-7，范围 0-180°）。

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use servolink_protocol::{Angle, ChannelId};
use std::fs;
use std::path::Path;

/// 四足机器人的默认舵机名称，按通道 ID 排列
pub const QUADRUPED_SERVO_NAMES: [&str; 8] = [
    "Top Left Hip",
    "Bottom Left Hip",
    "Top Right Hip",
    "Bottom Right Hip",
    "Top Left Leg",
    "Bottom Left Leg",
    "Top Right Leg",
    "Bottom Right Leg",
];

/// 控制器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// 节拍周期（毫秒）
    pub tick_period_ms: u64,

    /// 默认步长（度/节拍）
    pub default_step: Angle,

    /// 最大行长度（字节）
    pub max_line_len: usize,

    /// 是否回传错误应答
    pub echo_errors: bool,

    /// 串口设置
    pub serial: SerialSettings,

    /// PWM 标定
    pub pwm: PwmSettings,

    /// 通道表
    pub channels: Vec<ChannelConfig>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 20,
            default_step: Angle::from_whole_degrees(2),
            max_line_len: 1024,
            echo_errors: true,
            serial: SerialSettings::default(),
            pwm: PwmSettings::default(),
            channels: quadruped_channels(),
        }
    }
}

impl ControllerConfig {
    /// 从文件加载配置
    ///
    /// # 错误
    ///
    /// 文件无法读取、TOML 解析失败或校验不通过
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let config: ControllerConfig = toml::from_str(&content)
            .with_context(|| format!("解析配置文件失败: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).context("序列化配置失败")?;
        fs::write(path, content)
            .with_context(|| format!("写入配置文件失败: {}", path.display()))?;
        Ok(())
    }

    /// 校验全局参数
    ///
    /// 通道本身的范围错误不在这里拒绝：控制器注册时逐个通道处理，
    /// 一个坏通道不影响其他通道。
    pub fn validate(&self) -> Result<()> {
        if self.tick_period_ms == 0 {
            bail!("tick_period_ms 必须大于 0");
        }
        if !self.default_step.is_positive() {
            bail!("default_step 必须大于 0，当前为 {}", self.default_step);
        }
        if self.max_line_len == 0 {
            bail!("max_line_len 必须大于 0");
        }
        if self.serial.baud == 0 {
            bail!("serial.baud 必须大于 0");
        }
        self.pwm.validate()?;
        if self.channels.is_empty() {
            bail!("至少需要配置一个通道");
        }
        Ok(())
    }

    /// 按 ID 查找通道配置
    pub fn channel(&self, id: ChannelId) -> Option<&ChannelConfig> {
        self.channels.iter().find(|c| c.id == id)
    }
}

/// 串口设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    /// 串口设备路径；为空时需要在命令行指定
    pub port: Option<String>,

    /// 波特率
    pub baud: u32,

    /// 读超时（毫秒）
    pub read_timeout_ms: u64,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: None,
            baud: 9600,
            read_timeout_ms: 10,
        }
    }
}

/// PWM 标定
///
/// 默认值对应 50Hz 舵机：占空比 1638/65535 ≈ 0.5ms，7864/65535 ≈ 2.4ms。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PwmSettings {
    pub frequency_hz: u32,
    pub min_duty: u16,
    pub max_duty: u16,
}

impl Default for PwmSettings {
    fn default() -> Self {
        Self {
            frequency_hz: 50,
            min_duty: 1638,
            max_duty: 7864,
        }
    }
}

impl PwmSettings {
    pub fn validate(&self) -> Result<()> {
        if self.frequency_hz == 0 {
            bail!("pwm.frequency_hz 必须大于 0");
        }
        if self.min_duty >= self.max_duty {
            bail!(
                "pwm.min_duty ({}) 必须小于 pwm.max_duty ({})",
                self.min_duty,
                self.max_duty
            );
        }
        Ok(())
    }
}

/// 单个通道配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub id: ChannelId,
    pub pin: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_min")]
    pub min: Angle,
    #[serde(default = "default_max")]
    pub max: Angle,
    #[serde(default = "default_initial")]
    pub initial: Angle,
    /// 覆盖默认步长
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<Angle>,
}

fn default_min() -> Angle {
    Angle::ZERO
}

fn default_max() -> Angle {
    Angle::from_whole_degrees(180)
}

fn default_initial() -> Angle {
    Angle::from_whole_degrees(90)
}

fn quadruped_channels() -> Vec<ChannelConfig> {
    QUADRUPED_SERVO_NAMES
        .iter()
        .zip(0u8..)
        .map(|(name, pin)| ChannelConfig {
            id: ChannelId::from(pin),
            pin,
            name: Some((*name).to_string()),
            min: default_min(),
            max: default_max(),
            initial: default_initial(),
            step: None,
        })
        .collect()
}
