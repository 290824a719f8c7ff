//! TLS client configuration for the daemon transport.
//!
//! Deluge daemons generate a self-signed certificate on first start, so the chain
//! is not verified. Handshake signatures are still checked against the provider's
//! algorithms.

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use tokio_rustls::TlsConnector;

use crate::error::{RpcError, RpcResult};

/// Build a connector that accepts the daemon's self-signed certificate.
pub(crate) fn daemon_connector() -> RpcResult<TlsConnector> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()
        .map_err(|source| RpcError::TlsConfig { source })?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(SelfSignedDaemon { provider }))
        .with_no_client_auth();
    Ok(TlsConnector::from(Arc::new(config)))
}

/// Convert a configured host (DNS name or IP literal) into a TLS server name.
pub(crate) fn server_name(host: &str) -> RpcResult<ServerName<'static>> {
    ServerName::try_from(host.to_string()).map_err(|_| RpcError::InvalidServerName {
        host: host.to_string(),
    })
}

#[derive(Debug)]
struct SelfSignedDaemon {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for SelfSignedDaemon {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connector_builds_with_ring_provider() {
        assert!(daemon_connector().is_ok());
    }

    #[test]
    fn server_names_accept_hosts_and_ip_literals() {
        assert!(server_name("deluge.lan").is_ok());
        assert!(server_name("192.168.1.10").is_ok());
        assert!(matches!(
            server_name("not a host"),
            Err(RpcError::InvalidServerName { .. })
        ));
    }
}
