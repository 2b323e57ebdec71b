//! 传输层抽象
//!
//! 控制循环只在节拍边界非阻塞地轮询传输层：没有完整的行不是错误，
//! 只是"本节拍无事可做"。
//!
//! # 实现
//!
//! - [`ChannelTransport`]: 进程内的一对端点（crossbeam channel），主机侧把编码后的命令写入
//! - [`ReaderTransport`]: 后台线程读取任意 `Read`（串口、stdin），通过 channel 交给控制循环

use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use std::io::{self, Read, Write};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, trace};

/// 读线程单次读取的缓冲区大小
const READ_CHUNK: usize = 256;

/// 传输层 Trait
pub trait Transport {
    /// 非阻塞读取：把当前可用的字节追加到 `buf`，返回追加的字节数
    ///
    /// # 错误
    ///
    /// 对端已关闭且没有剩余数据时返回 `ErrorKind::BrokenPipe`。
    fn poll_read(&mut self, buf: &mut Vec<u8>) -> io::Result<usize>;

    /// 写入一行（调用方负责附加 `\n`）
    fn write_line(&mut self, line: &[u8]) -> io::Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn poll_read(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        (**self).poll_read(buf)
    }

    fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        (**self).write_line(line)
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "transport closed by peer")
}

/// 排空接收端中所有已到达的字节块
fn drain_chunks(rx: &Receiver<Vec<u8>>, buf: &mut Vec<u8>) -> io::Result<usize> {
    let mut total = 0;
    loop {
        match rx.try_recv() {
            Ok(chunk) => {
                total += chunk.len();
                buf.extend_from_slice(&chunk);
            },
            Err(TryRecvError::Empty) => return Ok(total),
            Err(TryRecvError::Disconnected) => {
                return if total > 0 { Ok(total) } else { Err(closed()) };
            },
        }
    }
}

/// 进程内传输端点
///
/// # 示例
///
/// ```rust
/// use servolink_driver::{ChannelTransport, Transport};
///
/// let (mut host, mut controller) = ChannelTransport::pair();
/// host.write_line(b"{\"query\":0}\n").unwrap();
///
/// let mut buf = Vec::new();
/// assert_eq!(controller.poll_read(&mut buf).unwrap(), 12);
/// ```
#[derive(Debug)]
pub struct ChannelTransport {
    rx: Receiver<Vec<u8>>,
    tx: Sender<Vec<u8>>,
}

impl ChannelTransport {
    /// 创建一对互联的端点
    pub fn pair() -> (ChannelTransport, ChannelTransport) {
        let (a_tx, b_rx) = unbounded();
        let (b_tx, a_rx) = unbounded();
        (
            ChannelTransport { rx: a_rx, tx: a_tx },
            ChannelTransport { rx: b_rx, tx: b_tx },
        )
    }
}

impl Transport for ChannelTransport {
    fn poll_read(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        drain_chunks(&self.rx, buf)
    }

    fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        self.tx.send(line.to_vec()).map_err(|_| closed())
    }
}

/// 基于读线程的传输
///
/// 读线程阻塞在 `Read::read` 上，把读到的字节块送入 channel；
/// 控制循环通过 [`Transport::poll_read`] 非阻塞取出。
///
/// 串口句柄通常配置了读超时：`TimedOut`/`WouldBlock`/`Interrupted` 会被忽略并继续读取。
/// 读到 EOF 或其他错误时读线程退出，传输视为关闭。
pub struct ReaderTransport {
    rx: Receiver<Vec<u8>>,
    writer: Box<dyn Write + Send>,
    reader_thread: Option<JoinHandle<()>>,
}

impl ReaderTransport {
    /// 启动读线程
    pub fn spawn<R>(reader: R, writer: Box<dyn Write + Send>) -> io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = unbounded();
        let handle = thread::Builder::new()
            .name("servolink-rx".to_string())
            .spawn(move || reader_loop(reader, tx))?;

        Ok(Self {
            rx,
            writer,
            reader_thread: Some(handle),
        })
    }

    /// 读线程是否仍在运行
    pub fn is_reader_alive(&self) -> bool {
        self.reader_thread
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

fn reader_loop<R: Read>(mut reader: R, tx: Sender<Vec<u8>>) {
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        match reader.read(&mut chunk) {
            Ok(0) => {
                debug!("Reader reached EOF");
                return;
            },
            Ok(n) => {
                trace!("Read {} bytes", n);
                if tx.send(chunk[..n].to_vec()).is_err() {
                    // 控制循环已退出
                    return;
                }
            },
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                continue;
            },
            Err(e) => {
                error!("Reader thread error: {}", e);
                return;
            },
        }
    }
}

impl Transport for ReaderTransport {
    fn poll_read(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        drain_chunks(&self.rx, buf)
    }

    fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        self.writer.write_all(line)?;
        self.writer.flush()
    }
}
