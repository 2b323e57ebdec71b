//! # Servolink Protocol
//!
//! 主机与舵机控制器之间的串口命令协议（无硬件依赖）
//!
//! ## 模块
//!
//! - `angle`: 设备原生角度单位（0.1°）
//! - `pose`: 姿态数据模型
//! - `command`: 命令与应答类型
//! - `codec`: JSON 编码/解码
//! - `framing`: 按行分帧（处理半包、超长行、重同步）
//!
//! ## 线路格式
//!
//! 每条消息是一行 UTF-8 JSON，以 `\n` 结尾：
//!
//! ```text
//! {"servo":0,"angle":90}
//! {"pose":{"0":45,"1":120.5}}
//! {"query":0}
//! ```
//!
//! 编解码层是纯语法层：不检查通道是否存在，也不做范围限幅。

pub mod angle;
pub mod codec;
pub mod command;
pub mod framing;
pub mod pose;

// 重新导出常用类型
pub use angle::Angle;
pub use codec::*;
pub use command::*;
pub use framing::{DEFAULT_MAX_LINE_LEN, LineDecoder};
pub use pose::{ChannelId, Pose};

use thiserror::Error;

/// 协议错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// 行超过最大长度，已丢弃并在下一个分隔符处重同步
    #[error("Framing error: line of {len} bytes exceeds limit of {max} bytes")]
    Framing { len: usize, max: usize },

    /// 无法解析为任何已知消息格式
    #[error("Malformed message: {0}")]
    MalformedMessage(String),
}

impl ProtocolError {
    /// 对应的应答错误类别
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProtocolError::Framing { .. } => ErrorKind::Framing,
            ProtocolError::MalformedMessage(_) => ErrorKind::Malformed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::Framing { len: 2000, max: 1024 };
        let msg = format!("{}", err);
        assert!(msg.contains("2000") && msg.contains("1024"), "{}", msg);

        let err = ProtocolError::MalformedMessage("expected value".to_string());
        assert_eq!(format!("{}", err), "Malformed message: expected value");
    }

    #[test]
    fn test_protocol_error_kind() {
        assert_eq!(
            ProtocolError::Framing { len: 1, max: 0 }.kind(),
            ErrorKind::Framing
        );
        assert_eq!(
            ProtocolError::MalformedMessage(String::new()).kind(),
            ErrorKind::Malformed
        );
    }
}
