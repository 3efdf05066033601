//! Path-prefix routes bound to a registered service.

use crate::client::{AdminResource, Confirmation, GatewayClient, RequestBody, Transport};
use crate::error::Result;
use crate::service::SERVICES_PATH;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDefinition {
    pub service: String,
    pub paths: Vec<String>,
}

impl RouteDefinition {
    /// The conventional route for a service: a single `/<service-name>` prefix.
    pub fn for_service<S: Into<String>>(service: S) -> Self {
        let service = service.into();
        let paths = vec![format!("/{}", service)];
        Self { service, paths }
    }

    pub fn with_paths<S: Into<String>>(service: S, paths: Vec<String>) -> Self {
        Self {
            service: service.into(),
            paths,
        }
    }
}

impl AdminResource for RouteDefinition {
    fn path(&self) -> String {
        format!("{}{}/routes", SERVICES_PATH, self.service)
    }

    fn encode(&self) -> RequestBody {
        RequestBody::Form(
            self.paths
                .iter()
                .map(|path| ("paths[]".to_string(), path.clone()))
                .collect(),
        )
    }
}

pub struct RouteRegistrar<'a, T> {
    client: &'a GatewayClient<T>,
}

impl<'a, T: Transport> RouteRegistrar<'a, T> {
    pub fn new(client: &'a GatewayClient<T>) -> Self {
        Self { client }
    }

    /// Creates the route.  The target service must already exist on the gateway.
    pub fn ensure(&self, route: &RouteDefinition) -> Result<Confirmation> {
        self.client.ensure(route)
    }
}
