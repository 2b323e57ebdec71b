//! 主机会话
//!
//! 把用户界面的动作映射为命令：
//!
//! | 动作 | 结果 |
//! |------|------|
//! | 拖动滑块 | 发送 `SetAngle` |
//! | 选择姿态 | 从存储加载，发送 `ApplyPose` |
//! | 保存姿态 | 写入存储（不发送命令） |
//!
//! 主机从不等待运动完成，也不做插值。

use crate::error::ClientError;
use crate::response::ResponseReader;
use crate::sink::CommandSink;
use servolink_driver::Transport;
use servolink_protocol::{Angle, ChannelId, ChannelStatus, Command, Pose};
use servolink_tools::PoseStore;
use std::time::Duration;
use tracing::{debug, info};

/// 默认查询超时
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_millis(500);

/// 主机会话
///
/// # 示例
///
/// ```rust
/// use servolink_client::{HostSession, WriterSink};
/// use servolink_protocol::Angle;
/// use servolink_tools::MemoryPoseStore;
///
/// let mut session = HostSession::new(WriterSink::new(Vec::new()), MemoryPoseStore::new());
/// session
///     .on_save_requested("stand", [(0, Angle::from_whole_degrees(90))])
///     .unwrap();
/// session.on_pose_selected("stand").unwrap();
/// assert_eq!(session.list_poses(), vec!["stand".to_string()]);
/// ```
pub struct HostSession<S: CommandSink, P: PoseStore> {
    sink: S,
    store: P,
    responses: ResponseReader,
    query_timeout: Duration,
}

impl<S: CommandSink, P: PoseStore> HostSession<S, P> {
    pub fn new(sink: S, store: P) -> Self {
        Self {
            sink,
            store,
            responses: ResponseReader::new(),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// 设置查询超时
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// 滑块变化：发送单通道目标
    pub fn on_slider_change(&mut self, channel: ChannelId, angle: Angle) -> Result<(), ClientError> {
        debug!("Slider {} -> {}", channel, angle);
        self.sink.send(&Command::SetAngle { channel, angle })
    }

    /// 选择姿态：加载并发送
    ///
    /// # 错误
    ///
    /// 姿态不存在时返回 [`ClientError::Store`]，不发送任何命令。
    pub fn on_pose_selected(&mut self, name: &str) -> Result<Pose, ClientError> {
        let pose = self.store.load(name)?;
        info!("Applying pose '{}' ({} channels)", name, pose.len());
        self.sink.send(&Command::ApplyPose { pose: pose.clone() })?;
        Ok(pose)
    }

    /// 保存姿态
    pub fn on_save_requested(
        &mut self,
        name: &str,
        angles: impl IntoIterator<Item = (ChannelId, Angle)>,
    ) -> Result<Pose, ClientError> {
        let pose = Pose::new(name, angles);
        self.store.save(&pose)?;
        info!("Saved pose '{}'", name);
        Ok(pose)
    }

    /// 所有已保存的姿态名
    pub fn list_poses(&self) -> Vec<String> {
        self.store.list()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn store(&self) -> &P {
        &self.store
    }

    pub fn into_parts(self) -> (S, P) {
        (self.sink, self.store)
    }
}

impl<S: CommandSink + Transport, P: PoseStore> HostSession<S, P> {
    /// 查询通道状态（链路需可读）
    pub fn query(&mut self, channel: ChannelId) -> Result<ChannelStatus, ClientError> {
        self.sink.send(&Command::Query { channel })?;
        self.responses
            .wait_status(&mut self.sink, channel, self.query_timeout)
    }
}
