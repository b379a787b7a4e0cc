//! Device transports for the hardware backend
//!
//! A transport exposes the raw session steps of a physical printer. The
//! [`HardwarePrinter`](crate::HardwarePrinter) sequences them; transports
//! only report what happened.

use crate::error::{PrintError, PrintResult};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{info, instrument, warn};

/// Default raw printing port (JetDirect)
pub const DEFAULT_PORT: u16 = 9100;

/// Session steps of a physical printer
#[async_trait]
pub trait PrinterTransport: Send {
    /// Human readable target, used in logs and diagnostics
    fn describe(&self) -> String;

    /// Open a session. Must fail with [`PrintError::AlreadyConnected`] when
    /// a session is already open.
    async fn connect(&mut self) -> PrintResult<()>;

    async fn begin_transaction(&mut self) -> PrintResult<()>;

    async fn send_data(&mut self, data: &[u8]) -> PrintResult<()>;

    async fn end_transaction(&mut self) -> PrintResult<()>;

    /// Close the session. Must fail with [`PrintError::NotConnected`] when
    /// there is nothing to close.
    async fn disconnect(&mut self) -> PrintResult<()>;

    /// Cheap reachability probe
    async fn is_online(&self) -> bool;
}

/// Printer target in `TCP:host[:port]` form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrinterAddress {
    pub host: String,
    pub port: u16,
}

impl PrinterAddress {
    /// Parse `TCP:192.168.1.50`, `TCP:printer.local:9100` or a bare `host:port`
    pub fn parse(raw: &str) -> PrintResult<Self> {
        let raw = raw.trim();
        let target = match raw.split_once(':') {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("tcp") => rest,
            Some((scheme, _)) if scheme.eq_ignore_ascii_case("usb") || scheme.eq_ignore_ascii_case("bt") => {
                return Err(PrintError::InvalidConfig(format!(
                    "Unsupported printer interface '{scheme}' (only TCP is available)"
                )));
            }
            _ => raw,
        };

        let (host, port) = match target.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    PrintError::InvalidConfig(format!("Invalid port in address: {raw}"))
                })?;
                (host, port)
            }
            None => (target, DEFAULT_PORT),
        };

        let host = host.trim();
        if host.is_empty() || host.contains(char::is_whitespace) {
            return Err(PrintError::InvalidConfig(format!(
                "Invalid address: {raw}"
            )));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for PrinterAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TCP:{}:{}", self.host, self.port)
    }
}

/// Raw TCP transport (port 9100)
///
/// Most thermal printers accept raw ESC/POS on port 9100. A transaction is
/// the span between the first write and the final flush.
#[derive(Debug)]
pub struct TcpTransport {
    address: PrinterAddress,
    stream: Option<TcpStream>,
    in_transaction: bool,
}

impl TcpTransport {
    pub fn new(address: PrinterAddress) -> Self {
        Self {
            address,
            stream: None,
            in_transaction: false,
        }
    }

    pub fn address(&self) -> &PrinterAddress {
        &self.address
    }

    fn target(&self) -> String {
        format!("{}:{}", self.address.host, self.address.port)
    }

    fn stream(&mut self) -> PrintResult<&mut TcpStream> {
        self.stream.as_mut().ok_or(PrintError::NotConnected)
    }
}

#[async_trait]
impl PrinterTransport for TcpTransport {
    fn describe(&self) -> String {
        self.address.to_string()
    }

    #[instrument(skip(self), fields(addr = %self.address))]
    async fn connect(&mut self) -> PrintResult<()> {
        if self.stream.is_some() {
            return Err(PrintError::AlreadyConnected);
        }
        let stream = TcpStream::connect(self.target())
            .await
            .map_err(|e| PrintError::Connection(format!("{}: {}", self.address, e)))?;
        stream.set_nodelay(true)?;
        info!("Connected to printer");
        self.stream = Some(stream);
        Ok(())
    }

    async fn begin_transaction(&mut self) -> PrintResult<()> {
        self.stream()?;
        self.in_transaction = true;
        Ok(())
    }

    async fn send_data(&mut self, data: &[u8]) -> PrintResult<()> {
        let in_transaction = self.in_transaction;
        let stream = self.stream()?;
        if !in_transaction {
            return Err(PrintError::Connection("no open transaction".into()));
        }
        stream.write_all(data).await.map_err(|e| {
            PrintError::Io(std::io::Error::new(
                e.kind(),
                format!("Write failed: {}", e),
            ))
        })?;
        Ok(())
    }

    async fn end_transaction(&mut self) -> PrintResult<()> {
        self.stream()?.flush().await?;
        self.in_transaction = false;
        Ok(())
    }

    async fn disconnect(&mut self) -> PrintResult<()> {
        let mut stream = self.stream.take().ok_or(PrintError::NotConnected)?;
        self.in_transaction = false;
        stream.shutdown().await?;
        Ok(())
    }

    async fn is_online(&self) -> bool {
        let check_timeout = Duration::from_millis(500);

        match tokio::time::timeout(check_timeout, TcpStream::connect(self.target())).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                warn!(addr = %self.address, error = %e, "Printer offline");
                false
            }
            Err(_) => {
                warn!(addr = %self.address, "Printer check timeout");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[test]
    fn test_parse_address() {
        let addr = PrinterAddress::parse("TCP:192.168.1.100").unwrap();
        assert_eq!(addr.host, "192.168.1.100");
        assert_eq!(addr.port, 9100);

        let addr = PrinterAddress::parse("tcp:printer.local:9200").unwrap();
        assert_eq!(addr.port, 9200);
        assert_eq!(addr.to_string(), "TCP:printer.local:9200");

        let addr = PrinterAddress::parse("10.0.0.5:9100").unwrap();
        assert_eq!(addr.host, "10.0.0.5");
    }

    #[test]
    fn test_parse_rejects_bad_addresses() {
        assert!(PrinterAddress::parse("USB:000000000000").is_err());
        assert!(PrinterAddress::parse("TCP:host:notaport").is_err());
        assert!(PrinterAddress::parse("TCP:").is_err());
        assert!(PrinterAddress::parse("").is_err());
    }

    #[tokio::test]
    async fn test_loopback_session() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            socket.read_to_end(&mut received).await.unwrap();
            received
        });

        let mut transport = TcpTransport::new(PrinterAddress {
            host: "127.0.0.1".into(),
            port,
        });
        transport.connect().await.unwrap();
        assert!(matches!(
            transport.connect().await,
            Err(PrintError::AlreadyConnected)
        ));
        transport.begin_transaction().await.unwrap();
        transport.send_data(b"\x1b@hello").await.unwrap();
        transport.end_transaction().await.unwrap();
        transport.disconnect().await.unwrap();
        assert!(matches!(
            transport.disconnect().await,
            Err(PrintError::NotConnected)
        ));

        assert_eq!(server.await.unwrap(), b"\x1b@hello");
    }

    #[tokio::test]
    async fn test_send_without_session() {
        let mut transport = TcpTransport::new(PrinterAddress::parse("127.0.0.1:1").unwrap());
        assert!(matches!(
            transport.send_data(b"x").await,
            Err(PrintError::NotConnected)
        ));
    }
}
