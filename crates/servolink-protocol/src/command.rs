//! 命令与应答类型
//!
//! 命令是自描述的值对象，跨消息不携带任何隐式状态。

use crate::angle::Angle;
use crate::pose::{ChannelId, Pose};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 主机 -> 控制器 命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// 设置单个通道的目标角度
    SetAngle { channel: ChannelId, angle: Angle },

    /// 应用一组姿态目标
    ApplyPose { pose: Pose },

    /// 查询单个通道状态
    Query { channel: ChannelId },
}

impl Command {
    /// 命令名（用于日志）
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetAngle { .. } => "set_angle",
            Command::ApplyPose { .. } => "apply_pose",
            Command::Query { .. } => "query",
        }
    }
}

/// 单个通道的状态快照
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelStatus {
    pub channel: ChannelId,
    pub current: Angle,
    pub target: Angle,
    pub settled: bool,
}

/// 应答中的错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Framing,
    Malformed,
    UnknownChannel,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Framing => "framing",
            ErrorKind::Malformed => "malformed",
            ErrorKind::UnknownChannel => "unknown_channel",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 控制器 -> 主机 应答
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `Query` 的结果
    Status(ChannelStatus),

    /// 某条输入被拒绝（控制循环继续运行）
    ///
    /// `channel` 是被拒绝命令指向的通道；帧错误、格式错误没有通道。
    Error {
        kind: ErrorKind,
        channel: Option<ChannelId>,
        detail: String,
    },
}
