//! Mutual TLS material for broker connections.
//!
//! The keystore is a PKCS#12 bundle holding the client certificate and key.
//! The truststore is either a PKCS#12 bundle of CA certificates or a PEM CA
//! file; both are tried with the configured password.

use std::fs;
use std::path::Path;

use openssl::error::ErrorStack;
use openssl::pkcs12::Pkcs12;
use openssl::ssl::{SslConnector, SslConnectorBuilder, SslMethod};
use openssl::x509::X509;

use crate::config::{ConfigError, CredentialStore, QueueConfig};

/// Build a connector presenting the keystore identity and trusting the
/// truststore certificates.
pub(crate) fn client_connector(config: &QueueConfig) -> Result<SslConnector, ConfigError> {
    let mut builder = SslConnector::builder(SslMethod::tls()).map_err(|err| {
        ConfigError::InvalidSetting(format!("failed to initialise TLS context: {err}"))
    })?;
    load_truststore(
        &mut builder,
        config.truststore(),
        &config.truststore_password,
    )?;
    load_keystore(&mut builder, config.keystore(), &config.keystore_password)?;
    Ok(builder.build())
}

fn load_truststore(
    builder: &mut SslConnectorBuilder,
    path: &Path,
    password: &str,
) -> Result<(), ConfigError> {
    let store = CredentialStore::Truststore;
    let bytes = read_store(store, path)?;
    let certs: Vec<X509> = match Pkcs12::from_der(&bytes).and_then(|p12| p12.parse2(password)) {
        Ok(parsed) => parsed.ca.into_iter().flatten().chain(parsed.cert).collect(),
        Err(_) => X509::stack_from_pem(&bytes).map_err(|err| invalid(store, path, err))?,
    };
    if certs.is_empty() {
        return Err(invalid(store, path, "no certificates found"));
    }
    let cert_store = builder.cert_store_mut();
    for cert in certs {
        cert_store
            .add_cert(cert)
            .map_err(|err| invalid(store, path, err))?;
    }
    Ok(())
}

fn load_keystore(
    builder: &mut SslConnectorBuilder,
    path: &Path,
    password: &str,
) -> Result<(), ConfigError> {
    let store = CredentialStore::Keystore;
    let bytes = read_store(store, path)?;
    let parsed = Pkcs12::from_der(&bytes)
        .and_then(|p12| p12.parse2(password))
        .map_err(|err| invalid(store, path, err))?;
    let (Some(cert), Some(pkey)) = (parsed.cert, parsed.pkey) else {
        return Err(invalid(
            store,
            path,
            "bundle holds no certificate and key pair",
        ));
    };
    let identity = || -> Result<(), ErrorStack> {
        builder.set_certificate(&cert)?;
        builder.set_private_key(&pkey)?;
        for chain_cert in parsed.ca.into_iter().flatten() {
            builder.add_extra_chain_cert(chain_cert)?;
        }
        builder.check_private_key()
    };
    identity().map_err(|err| invalid(store, path, err))
}

fn read_store(store: CredentialStore, path: &Path) -> Result<Vec<u8>, ConfigError> {
    fs::read(path).map_err(|err| invalid(store, path, err))
}

fn invalid(store: CredentialStore, path: &Path, reason: impl ToString) -> ConfigError {
    ConfigError::InvalidCredential {
        store,
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
