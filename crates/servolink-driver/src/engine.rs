//! Transition Engine - 过渡引擎
//!
//! 每个节拍把所有未到位通道的当前角度向目标推进一步。
//!
//! # 算法
//!
//! ```text
//! delta = target - current
//! if |delta| <= step:  current = target; settled = true
//! else:                current += sign(delta) * step
//! ```
//!
//! 只有当前角度在本节拍中确实改变时才调用执行器，到位后不再产生任何硬件写入。
//!
//! # 特性
//!
//! - **有界速率**: 每节拍最多移动 `step_size`，避免舵机电流尖峰和机械冲击
//! - **通道独立**: 各通道互不等待，没有跨通道同步
//! - **确定性**: 整数运算（0.1°），从差值 Δ 出发恰好 ⌈|Δ| / step⌉ 个节拍到位

use crate::actuator::Actuator;
use crate::registry::ServoRegistry;
use servolink_protocol::{Angle, ChannelId};
use smallvec::SmallVec;
use tracing::{trace, warn};

/// 单个节拍内移动过的通道
///
/// 栈上预留 8 个位置，覆盖四足机器人的全部舵机。
pub type MovedChannels = SmallVec<[(ChannelId, Angle); 8]>;

/// 节拍结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// 本节拍移动过的通道及其新角度（即执行器调用）
    pub moved: MovedChannels,
    /// 本节拍新到位的通道数
    pub settled: usize,
    /// 执行器失败次数
    pub actuation_failures: usize,
}

impl TickReport {
    /// 执行器调用次数
    pub fn actuations(&self) -> usize {
        self.moved.len()
    }

    /// 本节拍没有任何运动
    pub fn is_idle(&self) -> bool {
        self.moved.is_empty()
    }
}

/// 过渡引擎
///
/// 不持有任何通道；每个节拍借用注册表。
#[derive(Debug, Default)]
pub struct TransitionEngine {
    ticks: u64,
}

impl TransitionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已执行的节拍数
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// 执行一个节拍
    pub fn tick(&mut self, registry: &mut ServoRegistry, actuator: &mut dyn Actuator) -> TickReport {
        self.ticks += 1;
        let mut report = TickReport::default();

        for channel in registry.iter_mut() {
            if channel.transition.settled {
                continue;
            }

            let before = channel.current_angle;
            let step = channel.transition.step_size;
            let delta = channel.target_angle - channel.current_angle;

            if delta.abs() <= step {
                channel.current_angle = channel.target_angle;
                channel.transition.settled = true;
                report.settled += 1;
            } else if delta.signum() > 0 {
                channel.current_angle = channel.current_angle + step;
            } else {
                channel.current_angle = channel.current_angle - step;
            }

            if channel.current_angle == before {
                continue;
            }

            trace!(
                "tick {}: channel {} {} -> {} (target {})",
                self.ticks, channel.id, before, channel.current_angle, channel.target_angle
            );
            report.moved.push((channel.id, channel.current_angle));

            if let Err(e) = actuator.actuate(channel) {
                warn!("Channel {}: {}", channel.id, e);
                report.actuation_failures += 1;
            }
        }

        report
    }
}
