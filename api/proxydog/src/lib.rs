/*!
proxydog bootstraps a reverse-proxy gateway through the gateway's admin API.

For every configured backend service it registers the service, attaches JWT authentication and
binds a path-prefix route.  It then exposes the gateway's own admin port as an `admin` service
behind authentication, provisions an administrative consumer with a credential, and installs
TLS certificate material.

Every call is create-or-confirm: a `409` from the gateway means the entity already exists and
counts as success, so a run can always be repeated from the start.  Existing entities are not
compared against the configuration.

The run is a [`BootstrapOrchestrator`] state machine.  If the gateway (or the secret service,
when certificates come from it) is unreachable, the run stops before anything is provisioned.
Any other failure is reported against the entity it concerns and the run moves on.
*/

pub mod certificate;
pub mod client;
pub mod config;
pub mod consumer;
mod error;
pub mod health;
pub mod orchestrator;
pub mod plugin;
pub mod report;
pub mod route;
pub mod service;

#[cfg(test)]
mod stub;

pub use client::{Confirmation, GatewayClient, HttpTransport, Transport};
pub use config::BootstrapConfig;
pub use error::{Error, Result, TransportError};
pub use orchestrator::{BootstrapOrchestrator, Stage};
pub use report::{BootstrapReport, LogReporter, Reporter};
