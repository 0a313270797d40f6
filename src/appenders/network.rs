//! Network appenders for remote logging
//!
//! Both appenders ship the record itself rather than the formatted line, so
//! the receiving side can apply its own formatting. Each record is one
//! frame: a 4-byte big-endian length followed by a JSON object.
//!
//! ```text
//! {"name":"svc.api","msg":"ready","levelname":"INFO","levelno":20, ...}
//! ```

use crate::core::{Appender, LogRecord, LoggerError, Result};
use serde::Serialize;
use std::io::{self, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Wire representation of a record
#[derive(Debug, Serialize)]
struct RecordFrame<'a> {
    name: &'a str,
    msg: &'a str,
    levelname: &'a str,
    levelno: u8,
    pathname: Option<&'a str>,
    lineno: Option<u32>,
    #[serde(rename = "funcName")]
    func_name: Option<&'a str>,
    created: f64,
    thread: &'a str,
    #[serde(rename = "threadName")]
    thread_name: Option<&'a str>,
    process: u32,
}

/// Encode a record as a length-prefixed JSON frame
pub fn encode_frame(record: &LogRecord) -> Result<Vec<u8>> {
    let frame = RecordFrame {
        name: &record.logger_name,
        msg: &record.message,
        levelname: record.level.to_str(),
        levelno: record.level.value(),
        pathname: record.file.as_deref(),
        lineno: record.line,
        func_name: record.function.as_deref(),
        created: record.created(),
        thread: &record.thread_id,
        thread_name: record.thread_name.as_deref(),
        process: record.process_id,
    };
    let body = serde_json::to_vec(&frame)?;
    let length = u32::try_from(body.len())
        .map_err(|_| LoggerError::writer(format!("record frame too large: {} bytes", body.len())))?;

    let mut bytes = Vec::with_capacity(body.len() + 4);
    bytes.extend_from_slice(&length.to_be_bytes());
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

pub(crate) fn resolve(host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = (host, port).to_socket_addrs()?.collect();
    if addrs.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no address found for {}:{}", host, port),
        ));
    }
    Ok(addrs)
}

/// Connect to the first reachable address of `host:port`
pub(crate) fn connect_tcp(host: &str, port: u16) -> io::Result<TcpStream> {
    let mut last_error = None;
    for addr in resolve(host, port)? {
        match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
            Ok(stream) => {
                stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
                stream.set_nodelay(true)?;
                return Ok(stream);
            }
            Err(e) => last_error = Some(e),
        }
    }
    Err(last_error.unwrap_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "no address to connect to")))
}

/// Unconnected-style UDP socket bound to the family of `addr`
pub(crate) fn udp_socket_for(addr: &SocketAddr) -> io::Result<UdpSocket> {
    let socket = if addr.is_ipv4() {
        UdpSocket::bind("0.0.0.0:0")?
    } else {
        UdpSocket::bind("[::]:0")?
    };
    socket.connect(addr)?;
    Ok(socket)
}

/// Sends record frames to a TCP peer
///
/// # Example
///
/// ```no_run
/// use rust_logutils::appenders::SocketAppender;
///
/// let appender = SocketAppender::new("127.0.0.1", 9020)
///     .expect("Failed to connect to log server");
/// ```
pub struct SocketAppender {
    stream: Option<TcpStream>,
    host: String,
    port: u16,
    reconnect_on_error: bool,
}

impl SocketAppender {
    /// Connect to `host:port`
    ///
    /// # Errors
    ///
    /// Returns a construction error if the peer cannot be reached
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        let host = host.into();
        let stream = connect_tcp(&host, port).map_err(|e| {
            LoggerError::construction("SocketHandler", format!("cannot connect to {}:{}", host, port), e)
        })?;

        Ok(Self {
            stream: Some(stream),
            host,
            port,
            reconnect_on_error: true,
        })
    }

    /// Enable or disable one reconnection attempt when a send fails
    ///
    /// Default: enabled
    #[must_use]
    pub fn with_reconnect(mut self, enable: bool) -> Self {
        self.reconnect_on_error = enable;
        self
    }

    pub fn peer(&self) -> (&str, u16) {
        (&self.host, self.port)
    }

    fn reconnect(&mut self) -> Result<()> {
        self.stream = Some(connect_tcp(&self.host, self.port)?);
        Ok(())
    }
}

impl Appender for SocketAppender {
    fn append(&mut self, record: &LogRecord, _formatted: &str) -> Result<()> {
        let frame = encode_frame(record)?;

        let result = match self.stream {
            Some(ref mut stream) => stream.write_all(&frame),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "socket closed")),
        };

        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                self.stream = None;
                if !self.reconnect_on_error {
                    return Err(e.into());
                }
                match self.reconnect() {
                    Ok(()) => {
                        if let Some(ref mut stream) = self.stream {
                            stream.write_all(&frame)?;
                        }
                        Ok(())
                    }
                    Err(reconnect_err) => Err(LoggerError::writer(format!(
                        "Failed to send log and reconnect: {} (reconnect: {})",
                        e, reconnect_err
                    ))),
                }
            }
        }
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut stream) = self.stream {
            stream.flush()?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            stream.flush()?;
            // The peer may already have gone away
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "SocketHandler"
    }
}

/// Sends one record frame per UDP datagram
pub struct DatagramAppender {
    socket: Option<UdpSocket>,
    target: SocketAddr,
}

impl DatagramAppender {
    /// Resolve `host:port` and bind a local socket
    ///
    /// # Errors
    ///
    /// Returns a construction error if the host cannot be resolved or no
    /// local socket can be bound
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let construction =
            |e| LoggerError::construction("DatagramHandler", format!("cannot reach {}:{}", host, port), e);
        let target = resolve(host, port).map_err(construction)?[0];
        let socket = udp_socket_for(&target).map_err(construction)?;
        Ok(Self {
            socket: Some(socket),
            target,
        })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl Appender for DatagramAppender {
    fn append(&mut self, record: &LogRecord, _formatted: &str) -> Result<()> {
        let frame = encode_frame(record)?;
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| LoggerError::writer("Datagram socket closed"))?;
        socket.send(&frame)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.socket = None;
        Ok(())
    }

    fn name(&self) -> &str {
        "DatagramHandler"
    }
}
