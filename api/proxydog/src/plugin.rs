//! Plugins attached to a registered service.

use crate::client::{AdminResource, Confirmation, GatewayClient, RequestBody, Transport};
use crate::error::Result;
use crate::service::SERVICES_PATH;

pub const JWT_PLUGIN: &str = "jwt";
pub const BASIC_AUTH_PLUGIN: &str = "basic-auth";
/// Claim that carries the credential key in tokens minted for consumers.
pub const JWT_KEY_CLAIM: &str = "key";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginAttachment {
    pub service: String,
    pub name: String,
    /// Plugin configuration; each key is sent as `config.<key>`.
    pub config: Vec<(String, String)>,
}

impl PluginAttachment {
    pub fn new<S, N>(service: S, name: N) -> Self
    where
        S: Into<String>,
        N: Into<String>,
    {
        Self {
            service: service.into(),
            name: name.into(),
            config: Vec::new(),
        }
    }

    /// JWT verification that looks the credential up by the `key` claim.
    pub fn jwt<S: Into<String>>(service: S) -> Self {
        Self::new(service, JWT_PLUGIN).with_config("key_claim_name", JWT_KEY_CLAIM)
    }

    /// Basic-auth that strips the credentials before proxying upstream.
    pub fn basic_auth<S: Into<String>>(service: S) -> Self {
        Self::new(service, BASIC_AUTH_PLUGIN).with_config("hide_credentials", "true")
    }

    pub fn with_config<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.config.push((key.into(), value.into()));
        self
    }
}

impl AdminResource for PluginAttachment {
    fn path(&self) -> String {
        format!("{}{}/plugins", SERVICES_PATH, self.service)
    }

    fn encode(&self) -> RequestBody {
        let mut pairs = vec![("name".to_string(), self.name.clone())];
        pairs.extend(
            self.config
                .iter()
                .map(|(key, value)| (format!("config.{}", key), value.clone())),
        );
        RequestBody::Form(pairs)
    }
}

pub struct PluginRegistrar<'a, T> {
    client: &'a GatewayClient<T>,
}

impl<'a, T: Transport> PluginRegistrar<'a, T> {
    pub fn new(client: &'a GatewayClient<T>) -> Self {
        Self { client }
    }

    pub fn ensure(&self, plugin: &PluginAttachment) -> Result<Confirmation> {
        self.client.ensure(plugin)
    }
}
