//! 驱动层错误类型定义

use servolink_protocol::{Angle, ChannelId, ErrorKind, ProtocolError};
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 通道 ID 已注册
    #[error("Channel {0} is already registered")]
    DuplicateChannel(ChannelId),

    /// 通道范围无效（min > max）
    #[error("Invalid range for channel {id}: min {min} > max {max}")]
    InvalidRange { id: ChannelId, min: Angle, max: Angle },

    /// 配置无效（步长 <= 0、节拍周期为 0、没有可用通道等）
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// 通道未注册
    #[error("Unknown channel: {0}")]
    UnknownChannel(ChannelId),

    /// 协议错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 传输层 IO 错误
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),
}

impl DriverError {
    /// 对应的应答错误类别（仅针对单条消息的错误）
    pub fn response_kind(&self) -> Option<ErrorKind> {
        match self {
            DriverError::UnknownChannel(_) => Some(ErrorKind::UnknownChannel),
            DriverError::Protocol(e) => Some(e.kind()),
            _ => None,
        }
    }

    /// 错误指向的通道（用于错误应答的 `servo` 字段）
    pub fn channel(&self) -> Option<ChannelId> {
        match self {
            DriverError::DuplicateChannel(id)
            | DriverError::InvalidRange { id, .. }
            | DriverError::UnknownChannel(id) => Some(*id),
            _ => None,
        }
    }
}

/// 执行器错误
///
/// 单次写入失败只影响该通道的本次节拍，不会中止控制循环。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Actuation failed on pin {pin}: {reason}")]
pub struct ActuationError {
    pub pin: u8,
    pub reason: String,
}
