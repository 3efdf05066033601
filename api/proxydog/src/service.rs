//! Upstream service entries on the gateway.

use crate::client::{AdminResource, Confirmation, GatewayClient, RequestBody, Transport};
use crate::error::Result;

pub(crate) const SERVICES_PATH: &str = "services/";

/// A named upstream backend; `name` is the gateway's unique key for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDefinition {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub protocol: String,
}

impl AdminResource for ServiceDefinition {
    fn path(&self) -> String {
        SERVICES_PATH.to_string()
    }

    fn encode(&self) -> RequestBody {
        RequestBody::Form(vec![
            ("name".to_string(), self.name.clone()),
            ("host".to_string(), self.host.clone()),
            ("port".to_string(), self.port.to_string()),
            ("protocol".to_string(), self.protocol.clone()),
        ])
    }
}

pub struct ServiceRegistrar<'a, T> {
    client: &'a GatewayClient<T>,
}

impl<'a, T: Transport> ServiceRegistrar<'a, T> {
    pub fn new(client: &'a GatewayClient<T>) -> Self {
        Self { client }
    }

    /// Creates the service, or confirms one with the same name already exists.
    pub fn ensure(&self, service: &ServiceDefinition) -> Result<Confirmation> {
        self.client.ensure(service)
    }
}
