//! 命令发送端
//!
//! 把 [`Command`] 编码成一行 JSON 写入链路。主机不做任何插值，
//! 发送即返回。

use crate::error::ClientError;
use servolink_driver::{ChannelTransport, ReaderTransport, Transport};
use servolink_protocol::{Command, encode_command_line};
use std::io::Write;
use tracing::trace;

/// 命令发送 Trait
pub trait CommandSink {
    /// 编码并发送一条命令
    fn send(&mut self, command: &Command) -> Result<(), ClientError>;
}

impl<S: CommandSink + ?Sized> CommandSink for &mut S {
    fn send(&mut self, command: &Command) -> Result<(), ClientError> {
        (**self).send(command)
    }
}

impl<S: CommandSink + ?Sized> CommandSink for Box<S> {
    fn send(&mut self, command: &Command) -> Result<(), ClientError> {
        (**self).send(command)
    }
}

/// 基于 `Write` 的发送端（串口句柄、stdout、文件）
///
/// # 示例
///
/// ```rust
/// use servolink_client::{CommandSink, WriterSink};
/// use servolink_protocol::{Angle, Command};
///
/// let mut sink = WriterSink::new(Vec::new());
/// sink.send(&Command::SetAngle {
///     channel: 0,
///     angle: Angle::from_whole_degrees(45),
/// })
/// .unwrap();
/// assert_eq!(sink.into_inner(), b"{\"angle\":45.0,\"servo\":0}\n");
/// ```
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> CommandSink for WriterSink<W> {
    fn send(&mut self, command: &Command) -> Result<(), ClientError> {
        let line = encode_command_line(command);
        trace!("Sending {}", command.name());
        self.writer.write_all(&line)?;
        self.writer.flush()?;
        Ok(())
    }
}

impl CommandSink for ChannelTransport {
    fn send(&mut self, command: &Command) -> Result<(), ClientError> {
        self.write_line(&encode_command_line(command))?;
        Ok(())
    }
}

impl CommandSink for ReaderTransport {
    fn send(&mut self, command: &Command) -> Result<(), ClientError> {
        self.write_line(&encode_command_line(command))?;
        Ok(())
    }
}
