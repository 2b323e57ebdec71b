//! 应答读取
//!
//! 控制器只对 `Query` 和被拒绝的输入回传应答。[`ResponseReader`] 在截止时间前
//! 轮询链路，按行解码应答。

use crate::error::ClientError;
use servolink_driver::Transport;
use servolink_protocol::{ChannelId, ChannelStatus, LineDecoder, Response, decode_response};
use std::io;
use std::time::{Duration, Instant};
use tracing::debug;

/// 轮询间隔
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// 应答读取器
#[derive(Debug, Default)]
pub struct ResponseReader {
    decoder: LineDecoder,
    buf: Vec<u8>,
}

impl ResponseReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取下一条应答
    ///
    /// # 错误
    ///
    /// - [`ClientError::Timeout`]: 截止时间前没有完整的应答行
    /// - [`ClientError::Transport`]: 链路已关闭
    /// - [`ClientError::Protocol`]: 应答行无法解析
    pub fn next_response<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        timeout: Duration,
    ) -> Result<Response, ClientError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(line) = self.decoder.next_line() {
                return Ok(decode_response(&line?)?);
            }

            self.buf.clear();
            match transport.poll_read(&mut self.buf) {
                Ok(0) => {},
                Ok(_) => {
                    self.decoder.push(&self.buf);
                    continue;
                },
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => return Err(e.into()),
                Err(e) => debug!("Response poll failed: {}", e),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(ClientError::Timeout(timeout));
            }
            spin_sleep::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }

    /// 等待指定通道的状态应答
    ///
    /// 指向该通道的错误应答转换为 [`ClientError::Rejected`]。
    /// 其他通道的状态应答、其他通道或不带通道的错误应答（之前某条命令的结果）
    /// 都会被丢弃。
    pub fn wait_status<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        channel: ChannelId,
        timeout: Duration,
    ) -> Result<ChannelStatus, ClientError> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.next_response(transport, remaining) {
                Ok(Response::Status(status)) if status.channel == channel => return Ok(status),
                Ok(Response::Status(status)) => {
                    debug!("Ignoring status for channel {}", status.channel);
                },
                Ok(Response::Error {
                    kind,
                    channel: Some(rejected),
                    detail,
                }) if rejected == channel => {
                    return Err(ClientError::Rejected { kind, detail });
                },
                Ok(Response::Error { kind, detail, .. }) => {
                    debug!("Ignoring earlier rejection ({}): {}", kind, detail);
                },
                Err(ClientError::Timeout(_)) => return Err(ClientError::Timeout(timeout)),
                Err(e) => return Err(e),
            }
        }
    }
}
