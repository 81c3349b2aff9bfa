//! Byte streams the client can talk over.
//!
//! - TCP (`host:port`)
//! - Unix Domain Sockets (unix only)
//!
//! # Example
//!
//! ```ignore
//! use hurray_client::config::Address;
//! use hurray_client::transport::connect;
//!
//! let stream = connect(&Address::parse("localhost:2222")?, None)?;
//! ```

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::config::Address;
use crate::error::{HurrayError, Result};

/// A connected, blocking, bidirectional byte stream.
pub trait Stream: Read + Write + Send {
    /// Apply a read/write deadline to every later I/O call.
    fn set_io_timeout(&mut self, _timeout: Option<Duration>) -> io::Result<()> {
        Ok(())
    }

    /// Close both directions.
    fn shutdown(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Stream for TcpStream {
    fn set_io_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.set_read_timeout(timeout)?;
        self.set_write_timeout(timeout)
    }

    fn shutdown(&mut self) -> io::Result<()> {
        TcpStream::shutdown(self, Shutdown::Both)
    }
}

#[cfg(unix)]
impl Stream for std::os::unix::net::UnixStream {
    fn set_io_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.set_read_timeout(timeout)?;
        self.set_write_timeout(timeout)
    }

    fn shutdown(&mut self) -> io::Result<()> {
        std::os::unix::net::UnixStream::shutdown(self, Shutdown::Both)
    }
}

/// Open a stream to `address`.
///
/// `timeout` bounds the TCP connect and is then installed as the I/O deadline.
pub fn connect(address: &Address, timeout: Option<Duration>) -> Result<Box<dyn Stream>> {
    let mut stream: Box<dyn Stream> = match address {
        Address::Tcp { host, port } => Box::new(connect_tcp(host, *port, timeout)?),
        Address::Unix(path) => connect_unix(path)?,
    };
    stream.set_io_timeout(timeout)?;
    Ok(stream)
}

fn connect_tcp(host: &str, port: u16, timeout: Option<Duration>) -> Result<TcpStream> {
    let stream = match timeout {
        None => TcpStream::connect((host, port))?,
        Some(timeout) => {
            let mut last_error = None;
            let mut connected = None;
            for addr in (host, port).to_socket_addrs()? {
                match TcpStream::connect_timeout(&addr, timeout) {
                    Ok(stream) => {
                        connected = Some(stream);
                        break;
                    }
                    Err(e) => last_error = Some(e),
                }
            }
            match (connected, last_error) {
                (Some(stream), _) => stream,
                (None, Some(e)) => return Err(e.into()),
                (None, None) => {
                    return Err(HurrayError::Usage(format!(
                        "Host '{}' did not resolve to any address",
                        host
                    )))
                }
            }
        }
    };
    // requests are small and strictly alternate with replies
    stream.set_nodelay(true)?;
    Ok(stream)
}

#[cfg(unix)]
fn connect_unix(path: &std::path::Path) -> Result<Box<dyn Stream>> {
    Ok(Box::new(std::os::unix::net::UnixStream::connect(path)?))
}

#[cfg(not(unix))]
fn connect_unix(path: &std::path::Path) -> Result<Box<dyn Stream>> {
    Err(HurrayError::Usage(format!(
        "Unix domain sockets are not available on this platform ({})",
        path.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_connect_tcp_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let address = Address::Tcp {
            host: "127.0.0.1".into(),
            port,
        };

        let mut stream = connect(&address, Some(Duration::from_secs(5))).unwrap();
        let (mut accepted, _) = listener.accept().unwrap();

        stream.write_all(b"ping").unwrap();
        let mut buf = [0u8; 4];
        accepted.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");
        stream.shutdown().unwrap();
    }

    #[test]
    fn test_connect_refused_is_transport_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let address = Address::Tcp {
            host: "127.0.0.1".into(),
            port,
        };
        let err = connect(&address, None).err().unwrap();
        assert!(err.is_fatal());
    }

    #[cfg(unix)]
    #[test]
    fn test_connect_unix_socket() {
        use std::os::unix::net::UnixListener;

        let path = std::env::temp_dir().join(format!("hurray-test-{}.sock", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let listener = UnixListener::bind(&path).unwrap();

        let mut stream = connect(&Address::Unix(path.clone()), None).unwrap();
        let (mut accepted, _) = listener.accept().unwrap();
        accepted.write_all(b"pong").unwrap();

        let mut buf = [0u8; 4];
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"pong");
        let _ = std::fs::remove_file(&path);
    }
}
