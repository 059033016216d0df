//! Listener setup for plain HTTP and HTTPS.

use anyhow::Context;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use std::net::SocketAddr;
use std::path::Path;

/// Loads a PEM certificate chain and private key.
pub async fn tls_config(cert: &Path, key: &Path) -> anyhow::Result<RustlsConfig> {
    // Fails only when a provider is already installed.
    let _ = rustls::crypto::ring::default_provider().install_default();
    RustlsConfig::from_pem_file(cert, key).await.with_context(|| {
        format!(
            "failed to load TLS certificate {} and key {}",
            cert.display(),
            key.display()
        )
    })
}

/// Serves `router` on `addr` until `handle` is told to shut down.
///
/// With `tls` the listener speaks HTTPS only.
pub async fn serve(
    addr: SocketAddr,
    router: Router,
    tls: Option<RustlsConfig>,
    handle: Handle,
) -> std::io::Result<()> {
    let app = router.into_make_service();
    match tls {
        Some(tls) => axum_server::bind_rustls(addr, tls).handle(handle).serve(app).await,
        None => axum_server::bind(addr).handle(handle).serve(app).await,
    }
}
