//! Consumers and their credentials.
//!
//! JWT credentials are issued in two steps: the gateway generates and stores a `(key, secret)`
//! pair for the consumer, and the token itself is signed here with that secret.  The gateway
//! never sees the token, so it has to be handed to the operator.

use crate::client::{
    AdminRequest, AdminResource, Confirmation, GatewayClient, RequestBody, Transport,
};
use crate::error::{self, Result};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

const CONSUMERS_PATH: &str = "consumers/";
/// Issuer claim of every token minted by this tool.
pub const JWT_ISSUER: &str = "edgex";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerIdentity {
    pub username: String,
    pub password: Option<String>,
}

impl ConsumerIdentity {
    pub fn new<S: Into<String>>(username: S) -> Self {
        Self {
            username: username.into(),
            password: None,
        }
    }
}

impl AdminResource for ConsumerIdentity {
    fn path(&self) -> String {
        CONSUMERS_PATH.to_string()
    }

    fn encode(&self) -> RequestBody {
        RequestBody::Form(vec![("username".to_string(), self.username.clone())])
    }
}

/// A username/password pair attached to an existing consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuthCredential {
    pub username: String,
    pub password: String,
}

impl AdminResource for BasicAuthCredential {
    fn path(&self) -> String {
        format!("{}{}/basic-auth", CONSUMERS_PATH, self.username)
    }

    fn encode(&self) -> RequestBody {
        RequestBody::Form(vec![
            ("username".to_string(), self.username.clone()),
            ("password".to_string(), self.password.clone()),
        ])
    }
}

/// The key/secret pair in the gateway's response to a JWT credential request.
#[derive(Debug, Deserialize)]
struct IssuedCredential {
    key: String,
    secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The gateway-issued key, which tells the gateway which secret verifies the token.
    pub key: String,
    pub sub: String,
    pub iss: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialJwt {
    pub key: String,
    pub secret: String,
    pub token: String,
    pub issuer: String,
}

pub struct ConsumerProvisioner<'a, T> {
    client: &'a GatewayClient<T>,
}

impl<'a, T: Transport> ConsumerProvisioner<'a, T> {
    pub fn new(client: &'a GatewayClient<T>) -> Self {
        Self { client }
    }

    pub fn create_consumer(&self, username: &str) -> Result<Confirmation> {
        self.client.ensure(&ConsumerIdentity::new(username))
    }

    /// Attaches a basic-auth credential.  The consumer must already exist.
    pub fn attach_basic_auth(&self, username: &str, password: &str) -> Result<Confirmation> {
        self.client.ensure(&BasicAuthCredential {
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    /// Has the gateway issue a JWT key/secret pair for the consumer and signs a token with it.
    pub fn mint_jwt(&self, username: &str) -> Result<CredentialJwt> {
        let path = format!("{}{}/jwt", CONSUMERS_PATH, username);
        let request = AdminRequest::post(self.client.url(&path), RequestBody::Empty)
            .with_header("Content-Type", "application/x-www-form-urlencoded");
        let (_, body) = self.client.create(&request)?;

        let issued: IssuedCredential =
            serde_json::from_str(&body).context(error::ParseCredentialSnafu { username })?;
        let claims = JwtClaims {
            key: issued.key.clone(),
            sub: username.to_string(),
            iss: JWT_ISSUER.to_string(),
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(issued.secret.as_bytes()),
        )
        .context(error::SignTokenSnafu { username })?;

        Ok(CredentialJwt {
            key: issued.key,
            secret: issued.secret,
            token,
            issuer: JWT_ISSUER.to_string(),
        })
    }
}
