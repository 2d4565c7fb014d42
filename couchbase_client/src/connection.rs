use crate::{
    config::ClientConfig,
    error::{Error, Result},
};
use bytes::BytesMut;
use mcbp::{Codec, FrameError, Message};
use std::{
    io::{self, Read, Write},
    net::{SocketAddr, TcpStream, ToSocketAddrs},
};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

/// A framed connection to one memcached endpoint. Reads and writes are
/// blocking, bounded by the configured operation timeout.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    read_buffer: BytesMut,
    write_buffer: BytesMut,
    codec: Codec,
}

impl Connection {
    pub fn open(address: &str, config: &ClientConfig) -> Result<Connection> {
        let sockaddr = resolve(address)?;
        let stream = TcpStream::connect_timeout(&sockaddr, config.connect_timeout())
            .map_err(map_io)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(config.operation_timeout()))?;
        stream.set_write_timeout(Some(config.operation_timeout()))?;

        Ok(Connection {
            stream,
            read_buffer: BytesMut::new(),
            write_buffer: BytesMut::new(),
            codec: Codec::new(),
        })
    }

    /// Queue a request frame without flushing; pipelined batches queue
    /// every frame first and flush once.
    pub fn enqueue(&mut self, message: Message) -> Result<()> {
        debug!(opcode = ?message.opcode, opaque = message.opaque, "send");
        self.codec
            .encode(message, &mut self.write_buffer)
            .map_err(Error::Connection)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.stream.write_all(&self.write_buffer).map_err(map_io)?;
        self.write_buffer.clear();
        Ok(())
    }

    pub fn send(&mut self, message: Message) -> Result<()> {
        self.enqueue(message)?;
        self.flush()
    }

    pub fn recv(&mut self) -> Result<Message> {
        loop {
            match self.codec.decode(&mut self.read_buffer) {
                Ok(Some(message)) => {
                    debug!(opcode = ?message.opcode, opaque = message.opaque, "recv");
                    return Ok(message);
                }
                Ok(None) => {
                    let mut buf = [0u8; 4096];
                    let n = self.stream.read(&mut buf).map_err(map_io)?;
                    if n == 0 {
                        return Err(Error::Connection(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "server closed the connection",
                        )));
                    }
                    self.read_buffer.extend_from_slice(&buf[..n]);
                }
                Err(FrameError::Io { source }) => return Err(map_io(source)),
                Err(e) => return Err(Error::Decode(e)),
            }
        }
    }

    pub fn round_trip(&mut self, message: Message) -> Result<Message> {
        self.send(message)?;
        self.recv()
    }
}

fn resolve(address: &str) -> Result<SocketAddr> {
    address
        .to_socket_addrs()
        .map_err(Error::Connection)?
        .next()
        .ok_or_else(|| {
            Error::Connection(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("no address for {address}"),
            ))
        })
}

/// Timed-out reads surface as [Error::Timeout]; everything else stays a
/// connection error.
fn map_io(e: io::Error) -> Error {
    match e.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Error::Timeout,
        _ => Error::Connection(e),
    }
}
