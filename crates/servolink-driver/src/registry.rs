//! 舵机通道注册表
//!
//! 独占持有所有 `ServoChannel`，按通道 ID 索引。命令只修改目标角度，
//! 实际运动由 [`TransitionEngine`](crate::TransitionEngine) 在节拍中完成。

use crate::channel::{ChannelSpec, ServoChannel, TransitionState};
use crate::error::DriverError;
use servolink_protocol::{Angle, ChannelId, ChannelStatus, Pose};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, warn};

/// 默认步长：每节拍 2°
pub const DEFAULT_STEP_SIZE: Angle = Angle::from_whole_degrees(2);

/// 保留的告警条数上限，超出后丢弃最旧的
pub const MAX_RETAINED_WARNINGS: usize = 64;

/// 可恢复的告警
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// 初始角度超出范围，已限幅
    InitialAngleClamped {
        id: ChannelId,
        requested: Angle,
        clamped: Angle,
    },

    /// 姿态中包含未注册的通道，已跳过
    UnknownChannelInPose { pose: String, id: ChannelId },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::InitialAngleClamped {
                id,
                requested,
                clamped,
            } => write!(
                f,
                "channel {}: initial angle {} out of range, clamped to {}",
                id, requested, clamped
            ),
            Warning::UnknownChannelInPose { pose, id } => {
                write!(f, "pose '{}': unknown channel {} skipped", pose, id)
            },
        }
    }
}

/// 姿态应用结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoseReport {
    /// 已更新目标的通道
    pub applied: Vec<ChannelId>,
    /// 未注册而被跳过的通道
    pub skipped: Vec<ChannelId>,
}

impl PoseReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// 舵机通道注册表
#[derive(Debug)]
pub struct ServoRegistry {
    channels: BTreeMap<ChannelId, ServoChannel>,
    default_step: Angle,
    warnings: Vec<Warning>,
}

impl Default for ServoRegistry {
    fn default() -> Self {
        Self {
            channels: BTreeMap::new(),
            default_step: DEFAULT_STEP_SIZE,
            warnings: Vec::new(),
        }
    }
}

impl ServoRegistry {
    /// 创建注册表
    ///
    /// # 错误
    ///
    /// `default_step <= 0` 时返回 [`DriverError::InvalidConfiguration`]，
    /// 否则引擎永远无法到达目标。
    pub fn new(default_step: Angle) -> Result<Self, DriverError> {
        if !default_step.is_positive() {
            return Err(DriverError::InvalidConfiguration(format!(
                "default step size must be positive, got {}",
                default_step
            )));
        }
        Ok(Self {
            default_step,
            ..Self::default()
        })
    }

    /// 默认步长
    pub fn default_step(&self) -> Angle {
        self.default_step
    }

    /// 注册通道
    ///
    /// # 错误
    ///
    /// - [`DriverError::DuplicateChannel`]: ID 已注册
    /// - [`DriverError::InvalidRange`]: `angle_min > angle_max`
    /// - [`DriverError::InvalidConfiguration`]: 步长 <= 0
    ///
    /// 初始角度超出范围不是错误：限幅后记录 [`Warning::InitialAngleClamped`]。
    pub fn register(&mut self, spec: ChannelSpec) -> Result<(), DriverError> {
        if self.channels.contains_key(&spec.id) {
            return Err(DriverError::DuplicateChannel(spec.id));
        }

        if spec.angle_min > spec.angle_max {
            return Err(DriverError::InvalidRange {
                id: spec.id,
                min: spec.angle_min,
                max: spec.angle_max,
            });
        }

        let step_size = spec.step_size.unwrap_or(self.default_step);
        if !step_size.is_positive() {
            return Err(DriverError::InvalidConfiguration(format!(
                "channel {}: step size must be positive, got {}",
                spec.id, step_size
            )));
        }

        let initial = spec.initial_angle.clamp_to(spec.angle_min, spec.angle_max);
        if initial != spec.initial_angle {
            let warning = Warning::InitialAngleClamped {
                id: spec.id,
                requested: spec.initial_angle,
                clamped: initial,
            };
            self.record_warning(warning);
        }

        debug!(
            "Registered channel {} on pin {} [{}, {}] at {}",
            spec.id, spec.pin, spec.angle_min, spec.angle_max, initial
        );

        self.channels.insert(
            spec.id,
            ServoChannel {
                id: spec.id,
                pin: spec.pin,
                name: spec.name,
                angle_min: spec.angle_min,
                angle_max: spec.angle_max,
                current_angle: initial,
                target_angle: initial,
                transition: TransitionState {
                    step_size,
                    settled: true,
                },
            },
        );
        Ok(())
    }

    /// 设置目标角度
    ///
    /// 角度限幅到通道范围后赋值；与当前角度不同时通道重新进入过渡状态。
    /// 过渡途中收到的新目标直接替换旧目标（唯一的"取消"方式）。
    ///
    /// 返回限幅后的目标。
    pub fn set_target(&mut self, id: ChannelId, angle: Angle) -> Result<Angle, DriverError> {
        let channel = self
            .channels
            .get_mut(&id)
            .ok_or(DriverError::UnknownChannel(id))?;

        let clamped = channel.assign_target(angle);
        if clamped != angle {
            debug!("Channel {}: target {} clamped to {}", id, angle, clamped);
        }
        Ok(clamped)
    }

    /// 应用姿态
    ///
    /// 所有已知通道的目标在返回前全部赋值；未知通道跳过并记录告警，
    /// 不会影响其他通道。
    pub fn apply_pose(&mut self, pose: &Pose) -> PoseReport {
        let mut report = PoseReport::default();

        for (id, angle) in pose.iter() {
            match self.set_target(id, angle) {
                Ok(_) => report.applied.push(id),
                Err(_) => {
                    let warning = Warning::UnknownChannelInPose {
                        pose: pose.name().to_string(),
                        id,
                    };
                    self.record_warning(warning);
                    report.skipped.push(id);
                },
            }
        }

        report
    }

    /// 运行时修改通道范围
    ///
    /// 目标角度重新限幅到新范围；当前角度不在新范围内时拒绝修改，
    /// 先把舵机移进新范围再收窄。返回限幅后的目标。
    ///
    /// # 错误
    ///
    /// - [`DriverError::UnknownChannel`]: 通道未注册
    /// - [`DriverError::InvalidRange`]: `angle_min > angle_max`
    /// - [`DriverError::InvalidConfiguration`]: 当前角度在新范围之外
    pub fn recalibrate(
        &mut self,
        id: ChannelId,
        angle_min: Angle,
        angle_max: Angle,
    ) -> Result<Angle, DriverError> {
        let channel = self
            .channels
            .get_mut(&id)
            .ok_or(DriverError::UnknownChannel(id))?;

        if angle_min > angle_max {
            return Err(DriverError::InvalidRange {
                id,
                min: angle_min,
                max: angle_max,
            });
        }
        if channel.current_angle.clamp_to(angle_min, angle_max) != channel.current_angle {
            return Err(DriverError::InvalidConfiguration(format!(
                "channel {}: current angle {} is outside [{}, {}]",
                id, channel.current_angle, angle_min, angle_max
            )));
        }

        channel.angle_min = angle_min;
        channel.angle_max = angle_max;
        let target = channel.target_angle;
        let clamped = channel.assign_target(target);
        info!(
            "Channel {} recalibrated to [{}, {}], target {}",
            id, angle_min, angle_max, clamped
        );
        Ok(clamped)
    }

    /// 查询通道
    pub fn channel(&self, id: ChannelId) -> Option<&ServoChannel> {
        self.channels.get(&id)
    }

    /// 通道状态快照
    pub fn status(&self, id: ChannelId) -> Result<ChannelStatus, DriverError> {
        self.channel(id)
            .map(ServoChannel::status)
            .ok_or(DriverError::UnknownChannel(id))
    }

    pub fn contains(&self, id: ChannelId) -> bool {
        self.channels.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// 按 ID 升序迭代所有通道
    pub fn iter(&self) -> impl Iterator<Item = &ServoChannel> {
        self.channels.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut ServoChannel> {
        self.channels.values_mut()
    }

    /// 所有通道都已到位
    pub fn is_settled(&self) -> bool {
        self.channels.values().all(ServoChannel::is_settled)
    }

    /// 当前角度快照
    pub fn current_pose(&self, name: impl Into<String>) -> Pose {
        Pose::new(
            name,
            self.channels
                .values()
                .map(|ch| (ch.id, ch.current_angle)),
        )
    }

    fn record_warning(&mut self, warning: Warning) {
        warn!("{}", warning);
        if self.warnings.len() >= MAX_RETAINED_WARNINGS {
            self.warnings.remove(0);
        }
        self.warnings.push(warning);
    }

    /// 已记录的告警（最多 [`MAX_RETAINED_WARNINGS`] 条，按发生顺序）
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// 取出并清空告警
    pub fn drain_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deg(d: i16) -> Angle {
        Angle::from_whole_degrees(d)
    }

    fn spec(id: ChannelId, min: i16, max: i16, initial: i16) -> ChannelSpec {
        ChannelSpec::new(id, id as u8, deg(min), deg(max), deg(initial))
    }

    #[test]
    fn test_register_and_query() {
        let mut registry = ServoRegistry::default();
        registry.register(spec(0, 0, 180, 90)).unwrap();

        let ch = registry.channel(0).unwrap();
        assert_eq!(ch.current_angle(), deg(90));
        assert_eq!(ch.target_angle(), deg(90));
        assert!(ch.is_settled());
        assert_eq!(ch.transition().step_size(), DEFAULT_STEP_SIZE);
    }

    #[test]
    fn test_register_duplicate() {
        let mut registry = ServoRegistry::default();
        registry.register(spec(0, 0, 180, 90)).unwrap();
        let err = registry.register(spec(0, 0, 90, 45)).unwrap_err();
        assert!(matches!(err, DriverError::DuplicateChannel(0)));
        // 原通道不受影响
        assert_eq!(registry.channel(0).unwrap().angle_max(), deg(180));
    }

    #[test]
    fn test_register_invalid_range() {
        let mut registry = ServoRegistry::default();
        let err = registry.register(spec(1, 100, 10, 50)).unwrap_err();
        assert!(matches!(err, DriverError::InvalidRange { id: 1, .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_degenerate_range_is_valid() {
        let mut registry = ServoRegistry::default();
        registry.register(spec(1, 45, 45, 45)).unwrap();
        assert_eq!(registry.set_target(1, deg(0)).unwrap(), deg(45));
    }

    #[test]
    fn test_register_initial_out_of_range_is_clamped_with_warning() {
        let mut registry = ServoRegistry::default();
        registry.register(spec(2, 0, 90, 120)).unwrap();

        assert_eq!(registry.channel(2).unwrap().current_angle(), deg(90));
        assert_eq!(
            registry.warnings(),
            &[Warning::InitialAngleClamped {
                id: 2,
                requested: deg(120),
                clamped: deg(90),
            }]
        );
    }

    #[test]
    fn test_register_rejects_non_positive_step() {
        let mut registry = ServoRegistry::default();
        let err = registry
            .register(spec(0, 0, 180, 90).with_step_size(Angle::ZERO))
            .unwrap_err();
        assert!(matches!(err, DriverError::InvalidConfiguration(_)));

        let err = registry
            .register(spec(0, 0, 180, 90).with_step_size(deg(-1)))
            .unwrap_err();
        assert!(matches!(err, DriverError::InvalidConfiguration(_)));

        assert!(ServoRegistry::new(Angle::ZERO).is_err());
    }

    #[test]
    fn test_set_target_clamps() {
        let mut registry = ServoRegistry::default();
        registry.register(spec(0, 0, 180, 90)).unwrap();

        assert_eq!(registry.set_target(0, deg(200)).unwrap(), deg(180));
        assert_eq!(registry.set_target(0, deg(-20)).unwrap(), deg(0));
        assert_eq!(registry.set_target(0, deg(30)).unwrap(), deg(30));
        assert_eq!(registry.channel(0).unwrap().target_angle(), deg(30));
        // 当前角度只能由引擎修改
        assert_eq!(registry.channel(0).unwrap().current_angle(), deg(90));
    }

    #[test]
    fn test_set_target_rearms_only_on_change() {
        let mut registry = ServoRegistry::default();
        registry.register(spec(0, 0, 180, 90)).unwrap();

        registry.set_target(0, deg(90)).unwrap();
        assert!(registry.channel(0).unwrap().is_settled());

        registry.set_target(0, deg(100)).unwrap();
        assert!(!registry.channel(0).unwrap().is_settled());

        // 改回当前角度：不需要运动
        registry.set_target(0, deg(90)).unwrap();
        assert!(registry.channel(0).unwrap().is_settled());
    }

    #[test]
    fn test_set_target_unknown_channel() {
        let mut registry = ServoRegistry::default();
        let err = registry.set_target(5, deg(10)).unwrap_err();
        assert!(matches!(err, DriverError::UnknownChannel(5)));
    }

    #[test]
    fn test_apply_pose_partial() {
        let mut registry = ServoRegistry::default();
        registry.register(spec(1, 0, 90, 0)).unwrap();

        let pose = Pose::new("wave", [(1, deg(45)), (2, deg(999))]);
        let report = registry.apply_pose(&pose);

        assert_eq!(report.applied, vec![1]);
        assert_eq!(report.skipped, vec![2]);
        assert!(!report.is_complete());
        assert_eq!(registry.channel(1).unwrap().target_angle(), deg(45));
        assert_eq!(
            registry.drain_warnings(),
            vec![Warning::UnknownChannelInPose {
                pose: "wave".to_string(),
                id: 2
            }]
        );
        assert!(registry.warnings().is_empty());
    }

    #[test]
    fn test_warnings_are_bounded() {
        let mut registry = ServoRegistry::default();
        registry.register(spec(0, 0, 180, 90)).unwrap();

        let total = MAX_RETAINED_WARNINGS as ChannelId + 10;
        for id in 1..=total {
            registry.apply_pose(&Pose::new("stray", [(id, deg(10))]));
        }

        let warnings = registry.warnings();
        assert_eq!(warnings.len(), MAX_RETAINED_WARNINGS);
        // 保留最新的
        assert_eq!(
            warnings.last(),
            Some(&Warning::UnknownChannelInPose {
                pose: "stray".to_string(),
                id: total
            })
        );
        assert_eq!(
            warnings.first(),
            Some(&Warning::UnknownChannelInPose {
                pose: "stray".to_string(),
                id: 11
            })
        );
    }

    #[test]
    fn test_recalibrate_clamps_target() {
        let mut registry = ServoRegistry::default();
        registry.register(spec(0, 0, 180, 90)).unwrap();
        registry.set_target(0, deg(170)).unwrap();

        let target = registry.recalibrate(0, deg(45), deg(135)).unwrap();
        assert_eq!(target, deg(135));

        let ch = registry.channel(0).unwrap();
        assert_eq!(ch.angle_min(), deg(45));
        assert_eq!(ch.angle_max(), deg(135));
        assert_eq!(ch.current_angle(), deg(90));
        assert!(!ch.is_settled());

        // 新范围对之后的命令生效
        assert_eq!(registry.set_target(0, deg(10)).unwrap(), deg(45));
    }

    #[test]
    fn test_recalibrate_settles_when_target_reaches_current() {
        let mut registry = ServoRegistry::default();
        registry.register(spec(0, 0, 180, 90)).unwrap();
        registry.set_target(0, deg(170)).unwrap();

        registry.recalibrate(0, deg(0), deg(90)).unwrap();
        let ch = registry.channel(0).unwrap();
        assert_eq!(ch.target_angle(), deg(90));
        assert!(ch.is_settled());
    }

    #[test]
    fn test_recalibrate_errors() {
        let mut registry = ServoRegistry::default();
        registry.register(spec(0, 0, 180, 90)).unwrap();

        assert!(matches!(
            registry.recalibrate(5, deg(0), deg(90)),
            Err(DriverError::UnknownChannel(5))
        ));
        assert!(matches!(
            registry.recalibrate(0, deg(120), deg(60)),
            Err(DriverError::InvalidRange { id: 0, .. })
        ));
        // 当前 90° 不在 [100, 180] 内
        assert!(matches!(
            registry.recalibrate(0, deg(100), deg(180)),
            Err(DriverError::InvalidConfiguration(_))
        ));

        let ch = registry.channel(0).unwrap();
        assert_eq!(ch.angle_min(), deg(0));
        assert_eq!(ch.angle_max(), deg(180));
    }

    #[test]
    fn test_current_pose_snapshot() {
        let mut registry = ServoRegistry::default();
        registry.register(spec(0, 0, 180, 10)).unwrap();
        registry.register(spec(1, 0, 180, 20)).unwrap();

        let pose = registry.current_pose("snapshot");
        assert_eq!(pose.name(), "snapshot");
        assert_eq!(pose.get(0), Some(deg(10)));
        assert_eq!(pose.get(1), Some(deg(20)));
    }

    #[test]
    fn test_status() {
        let mut registry = ServoRegistry::default();
        registry.register(spec(3, 0, 180, 90)).unwrap();
        registry.set_target(3, deg(120)).unwrap();

        let status = registry.status(3).unwrap();
        assert_eq!(status.channel, 3);
        assert_eq!(status.current, deg(90));
        assert_eq!(status.target, deg(120));
        assert!(!status.settled);
        assert!(registry.status(4).is_err());
    }
}
