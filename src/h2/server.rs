use crate::h2::connection::serve_connection;
use crate::h2::consts::ALPN_H2;
use crate::stream::build_tls_acceptor;
use crate::types::{ServerConfig, ServerError};
use crate::utils::timeout_result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info};

/// TLS-only HTTP/2 listener. Every accepted connection runs on its own task.
pub struct Server {
    config: Arc<ServerConfig>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Binds the configured address and serves until the listener fails.
    /// Accept errors are logged and do not stop the loop.
    pub async fn listen_and_serve(&self) -> Result<(), ServerError> {
        let acceptor = build_tls_acceptor(&self.config.cert_path, &self.config.key_path)?;
        let listener = TcpListener::bind(&self.config.address).await?;
        info!(address = %self.config.address, "listening");

        self.serve(listener, acceptor).await
    }

    /// Accept loop over an already bound listener.
    pub async fn serve(&self, listener: TcpListener, acceptor: TlsAcceptor) -> Result<(), ServerError> {
        loop {
            let (tcp, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            let acceptor = acceptor.clone();
            let config = Arc::clone(&self.config);
            tokio::spawn(async move {
                if let Err(e) = handle_conn(acceptor, tcp, peer, &config).await {
                    error!(peer = %peer, error = %e, "connection failed");
                }
            });
        }
    }
}

async fn handle_conn(
    acceptor: TlsAcceptor,
    tcp: TcpStream,
    peer: SocketAddr,
    config: &ServerConfig,
) -> Result<(), ServerError> {
    debug!(peer = %peer, "accepted tcp connection");

    let tls = timeout_result(config.timeouts.handshake, async {
        acceptor
            .accept(tcp)
            .await
            .map_err(|e| ServerError::Handshake(e.to_string()))
    })
    .await?;

    let negotiated = tls.get_ref().1.alpn_protocol();
    if negotiated != Some(ALPN_H2) {
        return Err(ServerError::Handshake(format!(
            "invalid negotiated protocol: {}",
            negotiated
                .map(String::from_utf8_lossy)
                .unwrap_or_else(|| "none".into())
        )));
    }
    debug!(peer = %peer, "tls handshake completed");

    serve_connection(tls, peer, config).await
}
