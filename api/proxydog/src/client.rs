//! Requests against the gateway admin API and the classification of their responses.
//!
//! Every HTTP exchange in this crate goes through a [`Transport`], which performs exactly one
//! attempt per request.  [`GatewayClient`] layers the admin base URL on top of a transport and
//! interprets status codes: `200` and `201` mean the entity was created, `409` means it already
//! existed, and anything else is a provisioning failure.

use crate::error::{self, Result, TransportError};
use reqwest::Method;
use snafu::ResultExt;
use std::time::Duration;

/// Status codes the gateway returns when it created (or accepted) an entity.
const CREATED_STATUSES: [u16; 2] = [200, 201];
/// Status code the gateway returns when an entity with the same unique key already exists.
const CONFLICT_STATUS: u16 = 409;

/// The body of an admin request; each variant maps to a single wire encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    /// `application/x-www-form-urlencoded` pairs.  Keys may repeat, e.g. `paths[]`.
    Form(Vec<(String, String)>),
    Json(serde_json::Value),
}

/// A fully described HTTP request with an absolute URL.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl AdminRequest {
    pub fn get<S: Into<String>>(url: S) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn post<S: Into<String>>(url: S, body: RequestBody) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            headers: Vec::new(),
            body,
        }
    }

    pub fn with_header<N, V>(mut self, name: N, value: V) -> Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminResponse {
    pub status: u16,
    pub body: String,
}

/// Performs single HTTP exchanges.  Implementations must not retry.
pub trait Transport {
    fn execute(&self, request: &AdminRequest)
        -> std::result::Result<AdminResponse, TransportError>;

    /// Executes the request, attaching the method and URL to any transport failure.
    fn send(&self, request: &AdminRequest) -> Result<AdminResponse> {
        self.execute(request).context(error::TransportSnafu {
            method: request.method.as_str(),
            url: &request.url,
        })
    }
}

/// Blocking HTTP transport; each request is bounded by the configured timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context(error::BuildClientSnafu)?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn execute(
        &self,
        request: &AdminRequest,
    ) -> std::result::Result<AdminResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Form(pairs) => builder.form(pairs),
            RequestBody::Json(value) => builder.json(value),
        };

        let response = builder.send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        Ok(AdminResponse { status, body })
    }
}

/// How the gateway acknowledged a create call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Created,
    /// The gateway answered `409`.  The existing entity is not compared with the request.
    AlreadyExists,
}

impl Confirmation {
    pub fn from_status(status: u16) -> Option<Self> {
        if CREATED_STATUSES.contains(&status) {
            Some(Confirmation::Created)
        } else if status == CONFLICT_STATUS {
            Some(Confirmation::AlreadyExists)
        } else {
            None
        }
    }
}

/// An entity that is created on the gateway with a single POST.
pub trait AdminResource {
    /// Collection path relative to the admin base URL, e.g. `services/`.
    fn path(&self) -> String;

    fn encode(&self) -> RequestBody;
}

/// Joins a base URL and a relative path with exactly one separating slash.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[derive(Debug)]
pub struct GatewayClient<T> {
    base_url: String,
    transport: T,
}

impl<T: Transport> GatewayClient<T> {
    pub fn new<S: Into<String>>(base_url: S, transport: T) -> Self {
        Self {
            base_url: base_url.into(),
            transport,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    /// Sends a request to `path` under the admin base URL without interpreting the status.
    pub fn send(&self, method: Method, path: &str, body: RequestBody) -> Result<AdminResponse> {
        let request = AdminRequest {
            method,
            url: self.url(path),
            headers: Vec::new(),
            body,
        };
        self.transport.send(&request)
    }

    /// POSTs the request and classifies the status, returning the body on success.
    pub fn create(&self, request: &AdminRequest) -> Result<(Confirmation, String)> {
        let response = self.transport.send(request)?;
        match Confirmation::from_status(response.status) {
            Some(confirmation) => Ok((confirmation, response.body)),
            None => error::ProvisioningSnafu {
                method: request.method.as_str(),
                path: request
                    .url
                    .strip_prefix(self.base_url.as_str())
                    .unwrap_or(&request.url),
                status: response.status,
                body: response.body,
            }
            .fail(),
        }
    }

    /// Creates the resource, or confirms it already exists.
    pub fn ensure<R: AdminResource + ?Sized>(&self, resource: &R) -> Result<Confirmation> {
        let request = AdminRequest::post(self.url(&resource.path()), resource.encode());
        self.create(&request).map(|(confirmation, _)| confirmation)
    }
}
