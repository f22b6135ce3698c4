use crate::h2::consts::ALPN_H2;
use crate::types::ServerError;
use rustls::crypto::ring::default_provider;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig as TlsConfig;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tokio_rustls::TlsAcceptor;

fn open(path: &Path, what: &str) -> Result<BufReader<File>, ServerError> {
    File::open(path).map(BufReader::new).map_err(|e| {
        ServerError::Config(format!("failed to open {} {}: {}", what, path.display(), e))
    })
}

pub fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, ServerError> {
    let mut reader = open(path, "certificate")?;
    let certs = rustls_pemfile::certs(&mut reader).collect::<Result<Vec<_>, _>>()?;

    if certs.is_empty() {
        return Err(ServerError::Config(format!(
            "no certificates found in {}",
            path.display()
        )));
    }

    Ok(certs)
}

pub fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, ServerError> {
    let mut reader = open(path, "private key")?;
    rustls_pemfile::private_key(&mut reader)?.ok_or_else(|| {
        ServerError::Config(format!("no private key found in {}", path.display()))
    })
}

/// TLS 1.2+ server config that only offers `h2` via ALPN.
pub fn build_tls_config(cert_path: &Path, key_path: &Path) -> Result<TlsConfig, ServerError> {
    let certs = load_certs(cert_path)?;
    let key = load_private_key(key_path)?;

    let mut config = TlsConfig::builder_with_provider(Arc::new(default_provider()))
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(certs, key)?;

    config.alpn_protocols = vec![ALPN_H2.to_vec()];

    Ok(config)
}

pub fn build_tls_acceptor(cert_path: &Path, key_path: &Path) -> Result<TlsAcceptor, ServerError> {
    let config = build_tls_config(cert_path, key_path)?;
    Ok(TlsAcceptor::from(Arc::new(config)))
}
