//! 主机端接口模块
//!
//! 本模块提供主机（GUI、脚本、CLI）一侧的控制接口，包括：
//! - 命令发送（[`CommandSink`]）
//! - 应答读取（[`ResponseReader`]，带超时）
//! - 会话（[`HostSession`]：滑块、姿态选择、姿态保存）
//!
//! # 使用场景
//!
//! 主机只负责编码并发送命令，所有插值运动都在控制器端完成。
//! 控制器端的实现参见 `servolink-driver`。

mod error;
pub mod response;
pub mod session;
pub mod sink;

pub use error::ClientError;
pub use response::ResponseReader;
pub use session::HostSession;
pub use sink::{CommandSink, WriterSink};
