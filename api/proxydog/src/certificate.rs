//! TLS material: retrieval from the secret service and installation on the gateway.

use crate::client::{
    join_url, AdminRequest, AdminResource, Confirmation, GatewayClient, RequestBody, Transport,
};
use crate::error::{self, Result};
use serde::Deserialize;
use snafu::ensure;
use std::fmt::Display;

const CERTIFICATES_PATH: &str = "certificates/";
const SECRET_SERVICE_TOKEN_HEADER: &str = "X-Vault-Token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateBundle {
    pub cert: String,
    pub key: String,
    pub snis: Vec<String>,
}

impl AdminResource for CertificateBundle {
    fn path(&self) -> String {
        CERTIFICATES_PATH.to_string()
    }

    fn encode(&self) -> RequestBody {
        RequestBody::Json(serde_json::json!({
            "cert": self.cert,
            "key": self.key,
            "snis": self.snis,
        }))
    }
}

// Secret service responses wrap the stored secret in a `data` object.
#[derive(Debug, Deserialize)]
struct SecretEnvelope {
    data: CertKeyPair,
}

#[derive(Debug, Deserialize)]
struct CertKeyPair {
    cert: String,
    key: String,
}

fn retrieval_error<E: Display>(cert_path: &str, cause: E) -> error::Error {
    error::CertRetrievalSnafu {
        cert_path,
        reason: cause.to_string(),
    }
    .build()
}

pub struct CertificateLoader<'a, T> {
    client: &'a GatewayClient<T>,
}

impl<'a, T: Transport> CertificateLoader<'a, T> {
    pub fn new(client: &'a GatewayClient<T>) -> Self {
        Self { client }
    }

    /// Reads the certificate and private key stored at `cert_path` in the secret service.
    pub fn fetch_cert_key_pair(
        &self,
        secret_service_url: &str,
        cert_path: &str,
        token: &str,
    ) -> Result<(String, String)> {
        let request = AdminRequest::get(join_url(secret_service_url, cert_path))
            .with_header(SECRET_SERVICE_TOKEN_HEADER, token);
        let response = self
            .client
            .transport()
            .send(&request)
            .map_err(|e| retrieval_error(cert_path, e))?;
        ensure!(
            response.status == 200,
            error::CertRetrievalSnafu {
                cert_path,
                reason: format!("status {}", response.status),
            }
        );

        let envelope: SecretEnvelope =
            serde_json::from_str(&response.body).map_err(|e| retrieval_error(cert_path, e))?;
        Ok((envelope.data.cert, envelope.data.key))
    }

    pub fn install_certificate(&self, bundle: &CertificateBundle) -> Result<Confirmation> {
        self.client.ensure(bundle)
    }
}
