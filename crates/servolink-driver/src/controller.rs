//! 控制循环
//!
//! 单线程协作式调度，每个节拍：
//!
//! 1. 非阻塞排空传输层，按接收顺序解码并分发每一行完整的命令
//! 2. 引擎推进所有未到位通道一步
//! 3. 休眠到下一个节拍边界
//!
//! 所有状态修改都发生在这个循环内，因此不需要锁。单条消息的错误在解码/分发处被吸收：
//! 记录日志、计数、回复错误应答，然后继续处理下一条。

use crate::actuator::Actuator;
use crate::engine::{TickReport, TransitionEngine};
use crate::error::DriverError;
use crate::registry::ServoRegistry;
use crate::transport::Transport;
use servolink_protocol::{
    ChannelId, Command, LineDecoder, ProtocolError, Response, decode_command,
    encode_response_line,
};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// 控制循环配置
///
/// # Example
///
/// ```
/// use servolink_driver::LoopConfig;
/// use std::time::Duration;
///
/// let config = LoopConfig {
///     tick_period: Duration::from_millis(50),
///     ..LoopConfig::default()
/// };
/// assert!(config.echo_errors);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopConfig {
    /// 节拍周期
    pub tick_period: Duration,
    /// 最大行长度（字节）
    pub max_line_len: usize,
    /// 是否把被拒绝的输入以错误应答回传给主机
    pub echo_errors: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_millis(20),
            max_line_len: servolink_protocol::DEFAULT_MAX_LINE_LEN,
            echo_errors: true,
        }
    }
}

impl LoopConfig {
    pub fn validate(&self) -> Result<(), DriverError> {
        if self.tick_period.is_zero() {
            return Err(DriverError::InvalidConfiguration(
                "tick period must be non-zero".to_string(),
            ));
        }
        if self.max_line_len == 0 {
            return Err(DriverError::InvalidConfiguration(
                "max line length must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// 控制循环统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// 已执行节拍数
    pub ticks: u64,
    /// 成功分发的命令数
    pub commands: u64,
    /// 超长行
    pub framing_errors: u64,
    /// 无法解析的行
    pub malformed: u64,
    /// 指向未注册通道的命令
    pub unknown_channel: u64,
    /// 姿态中被跳过的通道
    pub skipped_pose_entries: u64,
    /// 执行器调用次数
    pub actuations: u64,
    /// 执行器失败次数
    pub actuation_failures: u64,
    /// 节拍超时（处理时间超过周期）
    pub overruns: u64,
}

/// 控制器
pub struct Controller<T: Transport, A: Actuator> {
    registry: ServoRegistry,
    engine: TransitionEngine,
    decoder: LineDecoder,
    transport: T,
    actuator: A,
    config: LoopConfig,
    stats: LoopStats,
    transport_open: bool,
    rejected: Vec<(ChannelId, String)>,
    read_buf: Vec<u8>,
}

impl<T: Transport, A: Actuator> Controller<T, A> {
    /// 创建控制器
    ///
    /// 通常通过 [`ControllerBuilder`](crate::ControllerBuilder) 构造。
    pub fn new(
        registry: ServoRegistry,
        transport: T,
        actuator: A,
        config: LoopConfig,
    ) -> Result<Self, DriverError> {
        config.validate()?;
        Ok(Self {
            registry,
            engine: TransitionEngine::new(),
            decoder: LineDecoder::new(config.max_line_len),
            transport,
            actuator,
            config,
            stats: LoopStats::default(),
            transport_open: true,
            rejected: Vec::new(),
            read_buf: Vec::new(),
        })
    }

    pub(crate) fn set_rejected(&mut self, rejected: Vec<(ChannelId, String)>) {
        self.rejected = rejected;
    }

    /// 注册失败的通道及原因
    pub fn rejected(&self) -> &[(ChannelId, String)] {
        &self.rejected
    }

    pub fn registry(&self) -> &ServoRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ServoRegistry {
        &mut self.registry
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// 传输层是否仍然打开
    pub fn is_transport_open(&self) -> bool {
        self.transport_open
    }

    /// 分发一条命令
    ///
    /// 返回需要回传给主机的应答（仅 `Query` 有）。
    pub fn dispatch(&mut self, command: Command) -> Result<Option<Response>, DriverError> {
        trace!("Dispatching {}", command.name());
        match command {
            Command::SetAngle { channel, angle } => {
                self.registry.set_target(channel, angle)?;
                Ok(None)
            },
            Command::ApplyPose { pose } => {
                let report = self.registry.apply_pose(&pose);
                self.stats.skipped_pose_entries += report.skipped.len() as u64;
                debug!(
                    "Pose '{}': {} applied, {} skipped",
                    pose.name(),
                    report.applied.len(),
                    report.skipped.len()
                );
                Ok(None)
            },
            Command::Query { channel } => {
                let status = self.registry.status(channel)?;
                Ok(Some(Response::Status(status)))
            },
        }
    }

    /// 执行一个完整节拍（不休眠）
    pub fn tick(&mut self) -> TickReport {
        self.drain_transport();
        self.process_lines();

        let report = self.engine.tick(&mut self.registry, &mut self.actuator);
        self.stats.ticks += 1;
        self.stats.actuations += report.actuations() as u64;
        self.stats.actuation_failures += report.actuation_failures as u64;
        report
    }

    fn drain_transport(&mut self) {
        if !self.transport_open {
            return;
        }

        self.read_buf.clear();
        match self.transport.poll_read(&mut self.read_buf) {
            Ok(0) => {},
            Ok(n) => {
                trace!("Received {} bytes", n);
                self.decoder.push(&self.read_buf);
            },
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                info!("Transport closed, holding current targets");
                self.transport_open = false;
            },
            Err(e) => {
                warn!("Transport read failed: {}", e);
            },
        }
    }

    fn process_lines(&mut self) {
        while let Some(next) = self.decoder.next_line() {
            let result = next
                .map_err(DriverError::from)
                .and_then(|line| decode_command(&line).map_err(DriverError::from))
                .and_then(|command| self.dispatch(command));

            match result {
                Ok(Some(response)) => {
                    self.stats.commands += 1;
                    self.respond(&response);
                },
                Ok(None) => self.stats.commands += 1,
                Err(e) => self.reject(e),
            }
        }
    }

    fn reject(&mut self, error: DriverError) {
        match &error {
            DriverError::Protocol(ProtocolError::Framing { .. }) => self.stats.framing_errors += 1,
            DriverError::Protocol(ProtocolError::MalformedMessage(_)) => self.stats.malformed += 1,
            DriverError::UnknownChannel(_) => self.stats.unknown_channel += 1,
            _ => {},
        }
        warn!("Rejected input: {}", error);

        if !self.config.echo_errors {
            return;
        }
        if let Some(kind) = error.response_kind() {
            let response = Response::Error {
                kind,
                channel: error.channel(),
                detail: error.to_string(),
            };
            self.respond(&response);
        }
    }

    fn respond(&mut self, response: &Response) {
        if !self.transport_open {
            return;
        }
        if let Err(e) = self.transport.write_line(&encode_response_line(response)) {
            warn!("Failed to send response: {}", e);
        }
    }

    /// 运行控制循环
    ///
    /// 在以下情况返回：
    /// - `stop` 被置位
    /// - 传输层已关闭且所有通道都已到位
    ///
    /// 使用绝对截止时间调度，处理时间不会累积成漂移；超时的节拍不补偿。
    pub fn run(&mut self, stop: &AtomicBool) -> LoopStats {
        info!(
            "Control loop started: {} channels, tick {:?}",
            self.registry.len(),
            self.config.tick_period
        );

        let mut next_tick = Instant::now();
        while !stop.load(Ordering::Relaxed) {
            self.tick();

            if !self.transport_open && self.registry.is_settled() {
                info!("Transport closed and all channels settled");
                break;
            }

            next_tick += self.config.tick_period;
            let now = Instant::now();
            if next_tick > now {
                spin_sleep::sleep(next_tick - now);
            } else {
                self.stats.overruns += 1;
                trace!("Tick overrun by {:?}", now - next_tick);
                next_tick = now;
            }
        }

        info!("Control loop stopped: {:?}", self.stats);
        self.stats
    }
}
