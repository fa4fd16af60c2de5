//! Networking collaborators: URL decomposition, TLS setup, and sockets.
//!
//! The connection engine never opens a `TcpStream` itself. It asks a
//! [`SocketFactory`] for a [`Socket`] and drives that through the
//! cancellation-aware [`Socket`] methods. Tests substitute scripted sockets by
//! installing their own factory with
//! [`HttpClient::with_collaborators`](crate::HttpClient::with_collaborators).

use std::net::TcpStream;

mod socket;
mod tls;
mod url;

pub use self::socket::{PollResult, Socket, SocketWaker, TcpSocket, IO_TICK, MAX_LINE_LEN};
pub use self::tls::{client_config, TlsOptions};
pub use self::url::{parse_url, resolve_location, UrlParts};

use crate::error::SocketError;

/// Creates sockets for the connection engine.
pub trait SocketFactory: Send + Sync {
    /// Create a socket, plain or TLS. `existing` is an already connected
    /// stream to adopt instead of dialing.
    fn create(
        &self,
        use_tls: bool,
        existing: Option<TcpStream>,
        tls: &TlsOptions,
    ) -> Result<Box<dyn Socket>, SocketError>;
}

/// Factory producing [`TcpSocket`]s, with rustls for TLS.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSocketFactory;

impl SocketFactory for DefaultSocketFactory {
    fn create(
        &self,
        use_tls: bool,
        existing: Option<TcpStream>,
        tls: &TlsOptions,
    ) -> Result<Box<dyn Socket>, SocketError> {
        let config = if use_tls {
            Some(client_config(tls)?)
        } else {
            None
        };
        Ok(Box::new(TcpSocket::new(config, existing)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_factory_plain_and_tls() {
        let factory = DefaultSocketFactory;
        assert!(factory.create(false, None, &TlsOptions::default()).is_ok());
        assert!(factory.create(true, None, &TlsOptions::default()).is_ok());
    }

    #[test]
    fn test_default_factory_reports_tls_errors() {
        let options = TlsOptions {
            ca_file: Some(PathBuf::from("/no/such/ca.pem")),
            ..Default::default()
        };
        assert!(DefaultSocketFactory.create(true, None, &options).is_err());
        // Plain sockets ignore TLS settings.
        assert!(DefaultSocketFactory.create(false, None, &options).is_ok());
    }
}
