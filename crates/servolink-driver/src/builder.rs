//! Builder 模式实现

use crate::actuator::Actuator;
use crate::channel::ChannelSpec;
use crate::controller::{Controller, LoopConfig};
use crate::error::DriverError;
use crate::registry::{DEFAULT_STEP_SIZE, ServoRegistry};
use crate::transport::Transport;
use servolink_protocol::Angle;
use std::time::Duration;
use tracing::error;

/// 控制器 Builder
///
/// 单个通道注册失败只影响该通道（记录日志并跳过）；没有任何可用通道时构建失败。
///
/// # 示例
///
/// ```rust
/// use servolink_driver::{ChannelSpec, ChannelTransport, ControllerBuilder, RecordingActuator};
/// use servolink_protocol::Angle;
/// use std::time::Duration;
///
/// let (_host, link) = ChannelTransport::pair();
/// let controller = ControllerBuilder::new()
///     .tick_period(Duration::from_millis(20))
///     .default_step(Angle::from_whole_degrees(2))
///     .channel(ChannelSpec::new(
///         0,
///         0,
///         Angle::from_whole_degrees(0),
///         Angle::from_whole_degrees(180),
///         Angle::from_whole_degrees(90),
///     ))
///     .build(link, RecordingActuator::new())
///     .unwrap();
/// assert_eq!(controller.registry().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ControllerBuilder {
    config: LoopConfig,
    default_step: Angle,
    channels: Vec<ChannelSpec>,
}

impl Default for ControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerBuilder {
    pub fn new() -> Self {
        Self {
            config: LoopConfig::default(),
            default_step: DEFAULT_STEP_SIZE,
            channels: Vec::new(),
        }
    }

    /// 设置节拍周期
    pub fn tick_period(mut self, period: Duration) -> Self {
        self.config.tick_period = period;
        self
    }

    /// 设置默认步长
    pub fn default_step(mut self, step: Angle) -> Self {
        self.default_step = step;
        self
    }

    /// 设置最大行长度
    pub fn max_line_len(mut self, max: usize) -> Self {
        self.config.max_line_len = max;
        self
    }

    /// 是否回传错误应答
    pub fn echo_errors(mut self, echo: bool) -> Self {
        self.config.echo_errors = echo;
        self
    }

    /// 整体替换循环配置
    pub fn loop_config(mut self, config: LoopConfig) -> Self {
        self.config = config;
        self
    }

    /// 添加通道
    pub fn channel(mut self, spec: ChannelSpec) -> Self {
        self.channels.push(spec);
        self
    }

    /// 批量添加通道
    pub fn channels(mut self, specs: impl IntoIterator<Item = ChannelSpec>) -> Self {
        self.channels.extend(specs);
        self
    }

    /// 构建控制器
    ///
    /// # 错误
    ///
    /// - 默认步长 <= 0、节拍周期为 0、最大行长度为 0
    /// - 没有任何通道注册成功
    pub fn build<T: Transport, A: Actuator>(
        self,
        transport: T,
        actuator: A,
    ) -> Result<Controller<T, A>, DriverError> {
        self.config.validate()?;
        let mut registry = ServoRegistry::new(self.default_step)?;

        let mut rejected = Vec::new();
        for spec in self.channels {
            let id = spec.id;
            if let Err(e) = registry.register(spec) {
                error!("Channel {} not registered: {}", id, e);
                rejected.push((id, e.to_string()));
            }
        }

        if registry.is_empty() {
            return Err(DriverError::InvalidConfiguration(format!(
                "no usable channels ({} rejected)",
                rejected.len()
            )));
        }

        let mut controller = Controller::new(registry, transport, actuator, self.config)?;
        controller.set_rejected(rejected);
        Ok(controller)
    }
}
