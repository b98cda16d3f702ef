use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ClientConfig, RootCertStore};

use crate::endpoint::TlsIdentity;
use crate::error::{Result, TransportError};

const CA_BUNDLE_ENV: &str = "SSL_CERT_FILE";

/// Build a client config that presents `identity` and trusts its CA bundle.
pub(crate) fn client_config(identity: &TlsIdentity) -> Result<Arc<ClientConfig>> {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let certs = read_certs(&identity.cert_file)?;
    let key = read_key(&identity.key_file)?;
    let roots = load_roots(identity.ca_file.as_deref())?;

    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_client_auth_cert(certs, key)
        .map_err(|err| TransportError::Tls(format!("client certificate rejected: {err}")))?;
    Ok(Arc::new(config))
}

fn read_pem(path: &Path, what: &str) -> Result<Cursor<Vec<u8>>> {
    std::fs::read(path)
        .map(Cursor::new)
        .map_err(|err| TransportError::Tls(format!("failed to read {what} {}: {err}", path.display())))
}

fn read_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let mut reader = read_pem(path, "certificate")?;
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|err| {
            TransportError::Tls(format!("failed to parse certificate {}: {err}", path.display()))
        })?;
    if certs.is_empty() {
        return Err(TransportError::Tls(format!(
            "no certificates in {}",
            path.display()
        )));
    }
    Ok(certs)
}

fn read_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let mut reader = read_pem(path, "private key")?;
    rustls_pemfile::private_key(&mut reader)
        .map_err(|err| {
            TransportError::Tls(format!("failed to parse private key {}: {err}", path.display()))
        })?
        .ok_or_else(|| TransportError::Tls(format!("no private key in {}", path.display())))
}

fn load_roots(ca_file: Option<&Path>) -> Result<RootCertStore> {
    let path = match ca_file {
        Some(path) => path.to_path_buf(),
        None => std::env::var_os(CA_BUNDLE_ENV)
            .map(PathBuf::from)
            .ok_or_else(|| {
                TransportError::Tls(format!(
                    "no CA bundle configured (set a CA file or {CA_BUNDLE_ENV})"
                ))
            })?,
    };

    let mut roots = RootCertStore::empty();
    let (added, _) = roots.add_parsable_certificates(read_certs(&path)?);
    if added == 0 {
        return Err(TransportError::Tls(format!(
            "no usable CA certificates in {}",
            path.display()
        )));
    }
    Ok(roots)
}
