//! 舵机通道定义
//!
//! `ServoChannel` 只能由 [`ServoRegistry`](crate::ServoRegistry) 创建；
//! `current_angle` 只能由 [`TransitionEngine`](crate::TransitionEngine) 修改。

use servolink_protocol::{Angle, ChannelId, ChannelStatus};

/// 通道注册参数
///
/// # 示例
///
/// ```rust
/// use servolink_driver::ChannelSpec;
/// use servolink_protocol::Angle;
///
/// let spec = ChannelSpec::new(
///     0,
///     0,
///     Angle::from_whole_degrees(0),
///     Angle::from_whole_degrees(180),
///     Angle::from_whole_degrees(90),
/// )
/// .named("Top Left Hip")
/// .with_step_size(Angle::from_whole_degrees(5));
/// assert_eq!(spec.name.as_deref(), Some("Top Left Hip"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    /// 通道 ID
    pub id: ChannelId,
    /// 硬件引脚
    pub pin: u8,
    /// 显示名称（可选）
    pub name: Option<String>,
    /// 角度下限（含）
    pub angle_min: Angle,
    /// 角度上限（含）
    pub angle_max: Angle,
    /// 初始角度（超出范围时限幅并告警）
    pub initial_angle: Angle,
    /// 每节拍最大步长；`None` 使用注册表默认值
    pub step_size: Option<Angle>,
}

impl ChannelSpec {
    pub fn new(
        id: ChannelId,
        pin: u8,
        angle_min: Angle,
        angle_max: Angle,
        initial_angle: Angle,
    ) -> Self {
        Self {
            id,
            pin,
            name: None,
            angle_min,
            angle_max,
            initial_angle,
            step_size: None,
        }
    }

    /// 设置显示名称
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 覆盖步长
    pub fn with_step_size(mut self, step_size: Angle) -> Self {
        self.step_size = Some(step_size);
        self
    }
}

/// 过渡状态（每通道）
///
/// 注册时创建，生命周期与进程相同。目标改变为不同于当前角度的值时重新激活。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionState {
    /// 每节拍最大前进量（> 0）
    pub(crate) step_size: Angle,
    /// `current_angle == target_angle`
    pub(crate) settled: bool,
}

impl TransitionState {
    pub fn step_size(&self) -> Angle {
        self.step_size
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }
}

/// 舵机通道
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServoChannel {
    pub(crate) id: ChannelId,
    pub(crate) pin: u8,
    pub(crate) name: Option<String>,
    pub(crate) angle_min: Angle,
    pub(crate) angle_max: Angle,
    pub(crate) current_angle: Angle,
    pub(crate) target_angle: Angle,
    pub(crate) transition: TransitionState,
}

impl ServoChannel {
    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn angle_min(&self) -> Angle {
        self.angle_min
    }

    pub fn angle_max(&self) -> Angle {
        self.angle_max
    }

    /// 最近一次驱动到的位置
    pub fn current_angle(&self) -> Angle {
        self.current_angle
    }

    /// 目标位置（已限幅）
    pub fn target_angle(&self) -> Angle {
        self.target_angle
    }

    pub fn transition(&self) -> &TransitionState {
        &self.transition
    }

    pub fn is_settled(&self) -> bool {
        self.transition.settled
    }

    /// 限幅到本通道范围
    pub fn clamp(&self, angle: Angle) -> Angle {
        angle.clamp_to(self.angle_min, self.angle_max)
    }

    /// 状态快照（用于 `Query` 应答）
    pub fn status(&self) -> ChannelStatus {
        ChannelStatus {
            channel: self.id,
            current: self.current_angle,
            target: self.target_angle,
            settled: self.transition.settled,
        }
    }

    /// 赋值目标角度，返回限幅后的值
    ///
    /// 限幅只在赋值时发生。
    pub(crate) fn assign_target(&mut self, angle: Angle) -> Angle {
        let clamped = self.clamp(angle);
        self.target_angle = clamped;
        self.transition.settled = clamped == self.current_angle;
        clamped
    }
}
