//! 客户端错误类型定义

use servolink_protocol::{ErrorKind, ProtocolError};
use servolink_tools::PoseStoreError;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// 主机端错误
#[derive(Error, Debug)]
pub enum ClientError {
    /// 姿态存储错误（姿态不存在、名称非法、读写失败）
    #[error("Pose store error: {0}")]
    Store(#[from] PoseStoreError),

    /// 链路读写失败或已关闭
    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),

    /// 控制器的应答无法解析
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 控制器以错误应答拒绝了命令
    #[error("Controller rejected command ({kind}): {detail}")]
    Rejected { kind: ErrorKind, detail: String },

    /// 等待应答超时
    #[error("No response within {0:?}")]
    Timeout(Duration),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClientError::Store(PoseStoreError::NotFound("stand".to_string()));
        assert_eq!(format!("{}", err), "Pose store error: Pose not found: stand");

        let err = ClientError::Rejected {
            kind: ErrorKind::UnknownChannel,
            detail: "Unknown channel: 9".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "Controller rejected command (unknown_channel): Unknown channel: 9"
        );

        let err = ClientError::Timeout(Duration::from_millis(200));
        assert_eq!(format!("{}", err), "No response within 200ms");
    }

    #[test]
    fn test_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "closed");
        let err: ClientError = io_err.into();
        assert!(matches!(err, ClientError::Transport(_)));
    }
}
