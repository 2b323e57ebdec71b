//! 驱动层模块
//!
//! 本模块提供舵机控制器端的全部运行时逻辑，包括：
//! - 通道注册表（标定范围、限幅、目标赋值）
//! - 过渡引擎（有界步长的逐节拍插值）
//! - 执行器接口（PWM 占空比换算）
//! - 传输层接口（非阻塞轮询）
//! - 控制循环（排空 -> 分发 -> 步进 -> 休眠）
//!
//! # 使用场景
//!
//! 控制器侧使用 [`ControllerBuilder`] 构建 [`Controller`] 并调用 [`Controller::run`]。
//! 主机侧应使用 `servolink-client` 提供的接口发送命令。

pub mod actuator;
mod builder;
pub mod channel;
pub mod controller;
pub mod engine;
mod error;
pub mod registry;
pub mod transport;

pub use actuator::{Actuator, PwmActuator, PwmCalibration, PwmOutput, RecordingActuator, TracingPwm};
pub use builder::ControllerBuilder;
pub use channel::{ChannelSpec, ServoChannel, TransitionState};
pub use controller::{Controller, LoopConfig, LoopStats};
pub use engine::{TickReport, TransitionEngine};
pub use error::{ActuationError, DriverError};
pub use registry::{DEFAULT_STEP_SIZE, MAX_RETAINED_WARNINGS, PoseReport, ServoRegistry, Warning};
pub use transport::{ChannelTransport, ReaderTransport, Transport};
