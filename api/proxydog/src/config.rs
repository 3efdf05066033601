//! The TOML bootstrap configuration.
//!
//! Loaded once at startup and read-only afterwards.  Backend services are provisioned in the
//! order they appear in the file.

use crate::error::{self, Result};
use crate::route::RouteDefinition;
use crate::service::ServiceDefinition;
use indexmap::IndexMap;
use serde::Deserialize;
use snafu::{ensure, OptionExt, ResultExt};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Name of the loopback service that exposes the gateway's own admin port.
pub const ADMIN_SERVICE_NAME: &str = "admin";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PROTOCOL: &str = "http";
const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// Whether `name` can be used as a single admin API path segment without escaping.
fn is_entity_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '~' | '-'))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BootstrapConfig {
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    pub secret_service: Option<SecretServiceConfig>,
    #[serde(default)]
    pub certificate: CertificateConfig,
    #[serde(default)]
    pub services: IndexMap<String, ServiceConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GatewayConfig {
    pub server: String,
    pub admin_port: u16,
    /// The proxy listener; the admin loopback is reachable at `/admin` on this port.
    pub application_port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AdminConfig {
    #[serde(default = "default_admin_username")]
    pub username: String,
    pub password: Option<String>,
    #[serde(default)]
    pub auth: AdminAuth,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: default_admin_username(),
            password: None,
            auth: AdminAuth::default(),
        }
    }
}

/// How the operator authenticates against the admin loopback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdminAuth {
    /// A JWT is minted for the admin consumer and printed.
    #[default]
    Jwt,
    /// A basic-auth plugin and the configured password guard the loopback.
    BasicAuth,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SecretServiceConfig {
    pub server: String,
    pub port: u16,
    pub health_check_path: String,
    pub cert_path: String,
    pub token: String,
}

impl SecretServiceConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}/", self.server, self.port)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CertificateConfig {
    #[serde(default)]
    pub source: CertificateSource,
    /// PEM certificate, for the static source.
    pub cert: Option<String>,
    /// PEM private key, for the static source.
    pub key: Option<String>,
    #[serde(default)]
    pub snis: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CertificateSource {
    #[default]
    None,
    Static,
    SecretService,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// Route prefixes; `/<service-name>` when empty.
    #[serde(default)]
    pub paths: Vec<String>,
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_protocol() -> String {
    DEFAULT_PROTOCOL.to_string()
}

fn default_admin_username() -> String {
    DEFAULT_ADMIN_USERNAME.to_string()
}

impl BootstrapConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).context(error::ReadConfigSnafu { path })?;
        Self::from_toml(&contents)
    }

    /// Parses and validates a configuration document.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: BootstrapConfig = toml::from_str(contents).context(error::ParseConfigSnafu)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            !self.gateway.server.is_empty(),
            error::InvalidConfigSnafu {
                reason: "gateway server must not be empty",
            }
        );
        ensure!(
            is_entity_name(&self.admin.username),
            error::InvalidConfigSnafu {
                reason: format!(
                    "admin username '{}' must be non-empty and use only [A-Za-z0-9._~-]",
                    self.admin.username
                ),
            }
        );

        for (name, service) in &self.services {
            ensure!(
                is_entity_name(name),
                error::InvalidConfigSnafu {
                    reason: format!(
                        "service name '{}' must be non-empty and use only [A-Za-z0-9._~-]",
                        name
                    ),
                }
            );
            ensure!(
                name != ADMIN_SERVICE_NAME,
                error::InvalidConfigSnafu {
                    reason: format!(
                        "service name '{}' is reserved for the admin loopback",
                        ADMIN_SERVICE_NAME
                    ),
                }
            );
            ensure!(
                service.paths.iter().all(|path| path.starts_with('/')),
                error::InvalidConfigSnafu {
                    reason: format!("route paths of service '{}' must start with '/'", name),
                }
            );
        }

        if self.admin.auth == AdminAuth::BasicAuth {
            self.admin.password.as_ref().context(error::InvalidConfigSnafu {
                reason: "basic-auth admin access requires an admin password",
            })?;
        }

        match self.certificate.source {
            CertificateSource::None => {}
            CertificateSource::Static => {
                ensure!(
                    self.certificate.cert.is_some() && self.certificate.key.is_some(),
                    error::InvalidConfigSnafu {
                        reason: "static certificate source requires both 'cert' and 'key'",
                    }
                );
            }
            CertificateSource::SecretService => {
                ensure!(
                    self.secret_service.is_some(),
                    error::InvalidConfigSnafu {
                        reason: "secret-service certificate source requires [secret-service]",
                    }
                );
            }
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Base URL of the gateway admin API.
    pub fn gateway_admin_url(&self) -> String {
        format!("http://{}:{}/", self.gateway.server, self.gateway.admin_port)
    }

    /// Backend services with their routes, in configuration order.
    pub fn backends(&self) -> Vec<(ServiceDefinition, RouteDefinition)> {
        self.services
            .iter()
            .map(|(name, service)| {
                let definition = ServiceDefinition {
                    name: name.clone(),
                    host: service.host.clone(),
                    port: service.port,
                    protocol: service.protocol.clone(),
                };
                let route = if service.paths.is_empty() {
                    RouteDefinition::for_service(name.as_str())
                } else {
                    RouteDefinition::with_paths(name.as_str(), service.paths.clone())
                };
                (definition, route)
            })
            .collect()
    }

    /// The loopback service pointing back at the gateway's own admin port.
    pub fn admin_loopback(&self) -> (ServiceDefinition, RouteDefinition) {
        (
            ServiceDefinition {
                name: ADMIN_SERVICE_NAME.to_string(),
                host: self.gateway.server.clone(),
                port: self.gateway.admin_port,
                protocol: DEFAULT_PROTOCOL.to_string(),
            },
            RouteDefinition::for_service(ADMIN_SERVICE_NAME),
        )
    }
}
