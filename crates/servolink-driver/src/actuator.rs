//! 执行器接口
//!
//! 引擎在通道角度实际改变的节拍中调用一次 [`Actuator::actuate`]。
//!
//! # 实现
//!
//! - [`PwmActuator`]: 角度 -> 16 位 PWM 占空比，写入 [`PwmOutput`]
//! - [`TracingPwm`]: 无硬件的 `PwmOutput`，只记录日志
//! - [`RecordingActuator`]: 记录每次调用，用于测试和仿真

use crate::channel::ServoChannel;
use crate::error::ActuationError;
use servolink_protocol::{Angle, ChannelId};
use std::collections::BTreeMap;
use tracing::debug;

/// 执行器 Trait
pub trait Actuator {
    /// 将通道驱动到其 `current_angle`
    fn actuate(&mut self, channel: &ServoChannel) -> Result<(), ActuationError>;
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn actuate(&mut self, channel: &ServoChannel) -> Result<(), ActuationError> {
        (**self).actuate(channel)
    }
}

/// PWM 硬件接口
pub trait PwmOutput {
    /// 配置引脚频率（每个引脚第一次写入前调用一次）
    fn configure(&mut self, pin: u8, frequency_hz: u32) -> Result<(), ActuationError> {
        let _ = (pin, frequency_hz);
        Ok(())
    }

    /// 写入 16 位占空比
    fn set_duty_u16(&mut self, pin: u8, duty: u16) -> Result<(), ActuationError>;
}

/// PWM 标定参数
///
/// 默认值对应常见 180° 舵机在 50Hz 下的 0.5ms - 2.4ms 脉宽。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmCalibration {
    /// PWM 频率（Hz）
    pub frequency_hz: u32,
    /// `angle_min` 对应的占空比
    pub min_duty: u16,
    /// `angle_max` 对应的占空比
    pub max_duty: u16,
}

impl Default for PwmCalibration {
    fn default() -> Self {
        Self {
            frequency_hz: 50,
            min_duty: 1638,
            max_duty: 7864,
        }
    }
}

impl PwmCalibration {
    /// 角度 -> 占空比（在通道范围内线性插值）
    ///
    /// ```text
    /// duty = min_duty + (angle - angle_min) * (max_duty - min_duty) / (angle_max - angle_min)
    /// ```
    pub fn duty_for(&self, angle: Angle, angle_min: Angle, angle_max: Angle) -> u16 {
        let span = (angle_max.tenths() as i64 - angle_min.tenths() as i64).max(0);
        if span == 0 {
            return self.min_duty;
        }

        let offset = (angle.tenths() as i64 - angle_min.tenths() as i64).clamp(0, span);
        let duty_span = self.max_duty as i64 - self.min_duty as i64;
        let duty = self.min_duty as i64 + offset * duty_span / span;
        duty.clamp(0, u16::MAX as i64) as u16
    }
}

/// PWM 执行器
pub struct PwmActuator<O: PwmOutput> {
    output: O,
    calibration: PwmCalibration,
    /// 已配置的引脚 -> 最近写入的占空比
    last_duty: BTreeMap<u8, u16>,
}

impl<O: PwmOutput> PwmActuator<O> {
    pub fn new(output: O, calibration: PwmCalibration) -> Self {
        Self {
            output,
            calibration,
            last_duty: BTreeMap::new(),
        }
    }

    pub fn calibration(&self) -> &PwmCalibration {
        &self.calibration
    }

    /// 最近写入某引脚的占空比
    pub fn last_duty(&self, pin: u8) -> Option<u16> {
        self.last_duty.get(&pin).copied()
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn into_output(self) -> O {
        self.output
    }
}

impl<O: PwmOutput> Actuator for PwmActuator<O> {
    fn actuate(&mut self, channel: &ServoChannel) -> Result<(), ActuationError> {
        let pin = channel.pin();
        if !self.last_duty.contains_key(&pin) {
            self.output.configure(pin, self.calibration.frequency_hz)?;
        }

        let duty = self.calibration.duty_for(
            channel.current_angle(),
            channel.angle_min(),
            channel.angle_max(),
        );
        self.output.set_duty_u16(pin, duty)?;
        self.last_duty.insert(pin, duty);
        Ok(())
    }
}

/// 无硬件 PWM 输出（写入 tracing 日志）
#[derive(Debug, Default)]
pub struct TracingPwm;

impl PwmOutput for TracingPwm {
    fn configure(&mut self, pin: u8, frequency_hz: u32) -> Result<(), ActuationError> {
        debug!("PWM pin {} configured at {} Hz", pin, frequency_hz);
        Ok(())
    }

    fn set_duty_u16(&mut self, pin: u8, duty: u16) -> Result<(), ActuationError> {
        debug!("PWM pin {} duty {}", pin, duty);
        Ok(())
    }
}

/// 记录型执行器
#[derive(Debug, Default, Clone)]
pub struct RecordingActuator {
    calls: Vec<(ChannelId, Angle)>,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 全部调用（按发生顺序）
    pub fn calls(&self) -> &[(ChannelId, Angle)] {
        &self.calls
    }

    /// 某通道收到的角度序列
    pub fn angles_for(&self, id: ChannelId) -> Vec<Angle> {
        self.calls
            .iter()
            .filter(|(ch, _)| *ch == id)
            .map(|(_, angle)| *angle)
            .collect()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl Actuator for RecordingActuator {
    fn actuate(&mut self, channel: &ServoChannel) -> Result<(), ActuationError> {
        self.calls.push((channel.id(), channel.current_angle()));
        Ok(())
    }
}
