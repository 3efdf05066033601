//! Reachability checks run before any provisioning.

use crate::client::{AdminRequest, Transport};
use crate::error::{self, Result};
use snafu::ensure;

pub struct HealthProbe<'a, T> {
    transport: &'a T,
}

impl<'a, T: Transport> HealthProbe<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    /// Returns `FatalHealth` unless `GET url` answers `200`.  `target` names the service in
    /// the error.
    pub fn check(&self, target: &str, url: &str) -> Result<()> {
        let response = match self.transport.send(&AdminRequest::get(url)) {
            Ok(response) => response,
            Err(e) => {
                return error::FatalHealthSnafu {
                    target,
                    url,
                    reason: e.to_string(),
                }
                .fail()
            }
        };
        ensure!(
            response.status == 200,
            error::FatalHealthSnafu {
                target,
                url,
                reason: format!("status {}", response.status),
            }
        );
        Ok(())
    }
}
