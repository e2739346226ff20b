//! Outbound connections to the proxied target.

use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpStream;

use crate::config::TargetConfig;

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("connecting to {address} timed out after {timeout:?}")]
    Timeout { address: String, timeout: Duration },

    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Opens one TCP connection to the target per client connection.
#[derive(Debug, Clone)]
pub struct TargetConnector {
    address: String,
    connect_timeout: Duration,
}

impl TargetConnector {
    pub fn new(address: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            address: address.into(),
            connect_timeout,
        }
    }

    pub fn from_config(config: &TargetConfig) -> Self {
        let address = if config.address.contains(':') {
            format!("[{}]:{}", config.address, config.port)
        } else {
            format!("{}:{}", config.address, config.port)
        };
        Self::new(address, config.connect_timeout())
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Resolve and connect, giving up after the connect timeout.
    pub async fn connect(&self) -> Result<TcpStream, TargetError> {
        let connecting = TcpStream::connect(self.address.as_str());
        let stream = match tokio::time::timeout(self.connect_timeout, connecting).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(TargetError::Connect {
                    address: self.address.clone(),
                    source,
                })
            }
            Err(_) => {
                return Err(TargetError::Timeout {
                    address: self.address.clone(),
                    timeout: self.connect_timeout,
                })
            }
        };

        if let Err(err) = stream.set_nodelay(true) {
            tracing::debug!(error = %err, "Could not disable Nagle on target socket");
        }
        Ok(stream)
    }
}
