//! TCP listener and connector.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use calcwire::transport::{connect, Listener};
//!
//! let listener = Listener::bind("127.0.0.1:0").await?;
//! let addr = listener.local_addr()?;
//! let stream = connect(&addr.to_string(), Duration::from_secs(10)).await?;
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};

use crate::error::{CalcError, Result};

/// TCP listener accepting protocol connections.
pub struct Listener {
    listener: TcpListener,
}

impl Listener {
    /// Bind to `addr`. Port 0 picks a free port.
    pub async fn bind<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    /// Accept a single connection.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr)> {
        let (stream, peer) = self.listener.accept().await?;
        stream.set_nodelay(true)?;
        Ok((stream, peer))
    }

    /// Bound local address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}

/// Connect to `addr` (`host:port`), giving up after `timeout`.
///
/// # Errors
///
/// - [`CalcError::Timeout`] if the connect did not finish in time
/// - [`CalcError::Io`] if it was refused or failed
pub async fn connect(addr: &str, timeout: Duration) -> Result<TcpStream> {
    let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| CalcError::Timeout(timeout))??;
    stream.set_nodelay(true)?;
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_accept_connect() {
        let listener = Listener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let (client, server) = tokio::join!(
            connect(&addr, Duration::from_secs(5)),
            listener.accept()
        );

        let client = client.unwrap();
        let (_stream, peer) = server.unwrap();
        assert_eq!(peer, client.local_addr().unwrap());
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port nobody listens on.
        let addr = {
            let listener = Listener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };

        let result = connect(&addr.to_string(), Duration::from_secs(5)).await;
        assert!(matches!(result, Err(CalcError::Io(_))));
    }
}
