//! The bootstrap state machine.
//!
//! A run walks through a fixed sequence of stages:
//!
//! `Init → ProbeHealth → RegisterServices → RegisterRoutes → BootstrapAdminLoopback →
//! ProvisionAdminConsumer → LoadCertificates → Done`
//!
//! Only a failed health probe stops the run (in `Aborted`).  Every other failure is recorded
//! against the entity it concerns and the run moves on, so one bad service definition does not
//! hold up the rest of the fleet.  Steps that depend on a failed step are recorded as skipped
//! instead of being sent to the gateway.

use crate::certificate::{CertificateBundle, CertificateLoader};
use crate::client::{join_url, Confirmation, GatewayClient, HttpTransport, Transport};
use crate::config::{AdminAuth, BootstrapConfig, CertificateSource, ADMIN_SERVICE_NAME};
use crate::consumer::ConsumerProvisioner;
use crate::error::Result;
use crate::health::HealthProbe;
use crate::plugin::{PluginAttachment, PluginRegistrar};
use crate::report::{Action, BootstrapReport, LogReporter, Reporter, StepOutcome, StepRecord};
use crate::route::RouteRegistrar;
use crate::service::ServiceRegistrar;
use log::info;
use std::collections::HashSet;
use std::fmt;

const SERVICE_NOT_REGISTERED: &str = "service was not registered";
const CONSUMER_NOT_CREATED: &str = "consumer was not created";
/// Entity named in certificate steps when no SNI hostnames are configured.
const NO_SNI: &str = "(no SNI)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Init,
    ProbeHealth,
    RegisterServices,
    RegisterRoutes,
    BootstrapAdminLoopback,
    ProvisionAdminConsumer,
    LoadCertificates,
    Done,
    Aborted,
}

impl Stage {
    /// The stage that follows this one when it completes.
    pub fn next(self) -> Stage {
        match self {
            Stage::Init => Stage::ProbeHealth,
            Stage::ProbeHealth => Stage::RegisterServices,
            Stage::RegisterServices => Stage::RegisterRoutes,
            Stage::RegisterRoutes => Stage::BootstrapAdminLoopback,
            Stage::BootstrapAdminLoopback => Stage::ProvisionAdminConsumer,
            Stage::ProvisionAdminConsumer => Stage::LoadCertificates,
            Stage::LoadCertificates => Stage::Done,
            Stage::Done => Stage::Done,
            Stage::Aborted => Stage::Aborted,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Aborted)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::ProbeHealth => "probe-health",
            Stage::RegisterServices => "register-services",
            Stage::RegisterRoutes => "register-routes",
            Stage::BootstrapAdminLoopback => "bootstrap-admin-loopback",
            Stage::ProvisionAdminConsumer => "provision-admin-consumer",
            Stage::LoadCertificates => "load-certificates",
            Stage::Done => "done",
            Stage::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

pub struct BootstrapOrchestrator<'a, T, R> {
    config: &'a BootstrapConfig,
    client: GatewayClient<T>,
    reporter: R,
    stage: Stage,
    steps: Vec<StepRecord>,
    // Services confirmed on the gateway during this run; only these get routes and plugins.
    registered: HashSet<String>,
    admin_token: Option<String>,
}

impl<'a> BootstrapOrchestrator<'a, HttpTransport, LogReporter> {
    /// An orchestrator talking HTTP to the configured gateway and reporting through `log`.
    pub fn from_config(config: &'a BootstrapConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.request_timeout())?;
        Ok(Self::new(config, transport, LogReporter))
    }
}

impl<'a, T: Transport, R: Reporter> BootstrapOrchestrator<'a, T, R> {
    pub fn new(config: &'a BootstrapConfig, transport: T, reporter: R) -> Self {
        Self {
            config,
            client: GatewayClient::new(config.gateway_admin_url(), transport),
            reporter,
            stage: Stage::Init,
            steps: Vec::new(),
            registered: HashSet::new(),
            admin_token: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn transport(&self) -> &T {
        self.client.transport()
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Runs every stage in order.  Returns `FatalHealth` if a health probe fails, in which case
    /// nothing was provisioned.
    pub fn run(&mut self) -> Result<BootstrapReport> {
        while !self.stage.is_terminal() {
            self.reporter.stage(self.stage);
            match self.advance() {
                Ok(next) => self.stage = next,
                Err(e) => {
                    self.stage = Stage::Aborted;
                    self.reporter.stage(Stage::Aborted);
                    return Err(e);
                }
            }
        }
        self.reporter.stage(self.stage);

        let report = BootstrapReport {
            steps: std::mem::take(&mut self.steps),
            stage: self.stage,
            admin_token: self.admin_token.take(),
        };
        self.reporter.finish(&report);
        Ok(report)
    }

    fn advance(&mut self) -> Result<Stage> {
        match self.stage {
            Stage::Init => {}
            Stage::ProbeHealth => self.probe_health()?,
            Stage::RegisterServices => self.register_services(),
            Stage::RegisterRoutes => self.register_routes(),
            Stage::BootstrapAdminLoopback => self.bootstrap_admin_loopback(),
            Stage::ProvisionAdminConsumer => self.provision_admin_consumer(),
            Stage::LoadCertificates => self.load_certificates(),
            Stage::Done | Stage::Aborted => {}
        }
        Ok(self.stage.next())
    }

    fn record(&mut self, action: Action, entity: &str, outcome: StepOutcome) -> bool {
        let record = StepRecord {
            stage: self.stage,
            action,
            entity: entity.to_string(),
            outcome,
        };
        self.reporter.step(&record);
        let success = record.outcome.is_success();
        self.steps.push(record);
        success
    }

    /// Records the result of a create-or-confirm call; true if the entity now exists.
    fn record_ensure(
        &mut self,
        action: Action,
        entity: &str,
        result: Result<Confirmation>,
    ) -> bool {
        let outcome = match result {
            Ok(confirmation) => confirmation.into(),
            Err(e) => StepOutcome::Failed(e.to_string()),
        };
        self.record(action, entity, outcome)
    }

    fn skip(&mut self, action: Action, entity: &str, reason: &str) {
        self.record(action, entity, StepOutcome::Skipped(reason.to_string()));
    }

    fn probe(&mut self, target: &str, url: &str) -> Result<()> {
        let result = HealthProbe::new(self.client.transport()).check(target, url);
        let outcome = match &result {
            Ok(()) => StepOutcome::Completed,
            Err(e) => StepOutcome::Failed(e.to_string()),
        };
        self.record(Action::ProbeHealth, target, outcome);
        result
    }

    fn probe_health(&mut self) -> Result<()> {
        let gateway_url = self.client.url("");
        self.probe("gateway", &gateway_url)?;

        if self.config.certificate.source == CertificateSource::SecretService {
            if let Some(secret_service) = &self.config.secret_service {
                let url = join_url(&secret_service.base_url(), &secret_service.health_check_path);
                self.probe("secret service", &url)?;
            }
        }
        Ok(())
    }

    /// Registers each backend service followed by its JWT plugin.
    fn register_services(&mut self) {
        for (service, _) in self.config.backends() {
            let result = ServiceRegistrar::new(&self.client).ensure(&service);
            let jwt = Action::AttachPlugin {
                plugin: crate::plugin::JWT_PLUGIN.to_string(),
            };
            if self.record_ensure(Action::RegisterService, &service.name, result) {
                self.registered.insert(service.name.clone());
                let plugin = PluginAttachment::jwt(&service.name);
                let result = PluginRegistrar::new(&self.client).ensure(&plugin);
                self.record_ensure(jwt, &service.name, result);
            } else {
                self.skip(jwt, &service.name, SERVICE_NOT_REGISTERED);
            }
        }
    }

    fn register_routes(&mut self) {
        for (service, route) in self.config.backends() {
            if self.registered.contains(&service.name) {
                let result = RouteRegistrar::new(&self.client).ensure(&route);
                self.record_ensure(Action::RegisterRoute, &service.name, result);
            } else {
                self.skip(Action::RegisterRoute, &service.name, SERVICE_NOT_REGISTERED);
            }
        }
    }

    /// Exposes the gateway's admin port as the `admin` service behind authentication.
    fn bootstrap_admin_loopback(&mut self) {
        let (service, route) = self.config.admin_loopback();
        let mut plugins = vec![PluginAttachment::jwt(ADMIN_SERVICE_NAME)];
        if self.config.admin.auth == AdminAuth::BasicAuth {
            plugins.push(PluginAttachment::basic_auth(ADMIN_SERVICE_NAME));
        }

        let result = ServiceRegistrar::new(&self.client).ensure(&service);
        if !self.record_ensure(Action::RegisterService, &service.name, result) {
            self.skip(Action::RegisterRoute, &service.name, SERVICE_NOT_REGISTERED);
            for plugin in plugins {
                let action = Action::AttachPlugin {
                    plugin: plugin.name,
                };
                self.skip(action, &service.name, SERVICE_NOT_REGISTERED);
            }
            return;
        }
        self.registered.insert(service.name.clone());

        let result = RouteRegistrar::new(&self.client).ensure(&route);
        self.record_ensure(Action::RegisterRoute, &service.name, result);
        for plugin in plugins {
            let result = PluginRegistrar::new(&self.client).ensure(&plugin);
            let action = Action::AttachPlugin {
                plugin: plugin.name,
            };
            self.record_ensure(action, &service.name, result);
        }

        if let Some(application_port) = self.config.gateway.application_port {
            info!(
                "Gateway admin API is proxied at http://{}:{}/{}",
                self.config.gateway.server, application_port, ADMIN_SERVICE_NAME
            );
        }
    }

    fn provision_admin_consumer(&mut self) {
        let config = self.config;
        let username = config.admin.username.as_str();
        let credential_action = match config.admin.auth {
            AdminAuth::Jwt => Action::MintJwt,
            AdminAuth::BasicAuth => Action::AttachBasicAuth,
        };

        let result = ConsumerProvisioner::new(&self.client).create_consumer(username);
        if !self.record_ensure(Action::CreateConsumer, username, result) {
            self.skip(credential_action, username, CONSUMER_NOT_CREATED);
            return;
        }

        match config.admin.auth {
            AdminAuth::Jwt => match ConsumerProvisioner::new(&self.client).mint_jwt(username) {
                Ok(credential) => {
                    self.record(Action::MintJwt, username, StepOutcome::Completed);
                    self.admin_token = Some(credential.token);
                }
                Err(e) => {
                    self.record(Action::MintJwt, username, StepOutcome::Failed(e.to_string()));
                }
            },
            AdminAuth::BasicAuth => match &config.admin.password {
                Some(password) => {
                    let result = ConsumerProvisioner::new(&self.client)
                        .attach_basic_auth(username, password);
                    self.record_ensure(Action::AttachBasicAuth, username, result);
                }
                None => self.skip(
                    Action::AttachBasicAuth,
                    username,
                    "no admin password configured",
                ),
            },
        }
    }

    fn load_certificates(&mut self) {
        let config = self.config;
        let certificate = &config.certificate;
        let entity = if certificate.snis.is_empty() {
            NO_SNI.to_string()
        } else {
            certificate.snis.join(",")
        };

        let bundle = match certificate.source {
            CertificateSource::None => return,
            CertificateSource::Static => match (&certificate.cert, &certificate.key) {
                (Some(cert), Some(key)) => CertificateBundle {
                    cert: cert.clone(),
                    key: key.clone(),
                    snis: certificate.snis.clone(),
                },
                _ => {
                    self.skip(
                        Action::InstallCertificate,
                        &entity,
                        "static certificate material is incomplete",
                    );
                    return;
                }
            },
            CertificateSource::SecretService => {
                let secret_service = match &config.secret_service {
                    Some(secret_service) => secret_service,
                    None => {
                        self.skip(
                            Action::InstallCertificate,
                            &entity,
                            "no secret service configured",
                        );
                        return;
                    }
                };
                let fetched = CertificateLoader::new(&self.client).fetch_cert_key_pair(
                    &secret_service.base_url(),
                    &secret_service.cert_path,
                    &secret_service.token,
                );
                match fetched {
                    Ok((cert, key)) => {
                        self.record(
                            Action::FetchCertificate,
                            &secret_service.cert_path,
                            StepOutcome::Completed,
                        );
                        CertificateBundle {
                            cert,
                            key,
                            snis: certificate.snis.clone(),
                        }
                    }
                    Err(e) => {
                        self.record(
                            Action::FetchCertificate,
                            &secret_service.cert_path,
                            StepOutcome::Failed(e.to_string()),
                        );
                        self.skip(
                            Action::InstallCertificate,
                            &entity,
                            "certificate could not be retrieved",
                        );
                        return;
                    }
                }
            }
        };

        let result = CertificateLoader::new(&self.client).install_certificate(&bundle);
        self.record_ensure(Action::InstallCertificate, &entity, result);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::stub::{RecordingReporter, StubTransport};
    use crate::Error;
    use reqwest::Method;

    const GATEWAY: &str = r#"
[gateway]
server = "kong"
admin-port = 8001
"#;

    const TWO_SERVICES: &str = r#"
[services.A]
host = "service-a"
port = 1001

[services.B]
host = "service-b"
port = 1002
"#;

    const BASIC_AUTH_STATIC: &str = r#"
[admin]
username = "admin"
password = "hunter2"
auth = "basic-auth"

[certificate]
source = "static"
cert = "CERT"
key = "KEY"
"#;

    const SECRET_SERVICE: &str = r#"
[secret-service]
server = "vault"
port = 8200
health-check-path = "v1/sys/health"
cert-path = "v1/secret/edgex/pki/tls/edgex-kong"
token = "s.token"

[certificate]
source = "secret-service"
snis = ["edgex-kong"]
"#;

    const JWT_RESPONSE: &str = r#"{"key":"k1","secret":"s1"}"#;

    fn config(parts: &[&str]) -> BootstrapConfig {
        BootstrapConfig::from_toml(&parts.concat()).unwrap()
    }

    fn run(
        config: &BootstrapConfig,
        transport: StubTransport,
    ) -> (Result<BootstrapReport>, Vec<String>, Stage) {
        let mut orchestrator =
            BootstrapOrchestrator::new(config, transport, RecordingReporter::default());
        let result = orchestrator.run();
        (result, orchestrator.transport().calls(), orchestrator.stage())
    }

    #[test]
    fn stage_sequence() {
        let mut stage = Stage::Init;
        let mut seen = vec![stage];
        while !stage.is_terminal() {
            stage = stage.next();
            seen.push(stage);
        }
        assert_eq!(
            seen,
            [
                Stage::Init,
                Stage::ProbeHealth,
                Stage::RegisterServices,
                Stage::RegisterRoutes,
                Stage::BootstrapAdminLoopback,
                Stage::ProvisionAdminConsumer,
                Stage::LoadCertificates,
                Stage::Done,
            ]
        );
        assert_eq!(Stage::Aborted.next(), Stage::Aborted);
    }

    #[test]
    fn two_services_exact_call_order() {
        let config = config(&[GATEWAY, BASIC_AUTH_STATIC, TWO_SERVICES]);
        let (result, calls, stage) = run(&config, StubTransport::new());
        let report = result.unwrap();

        assert_eq!(
            calls,
            [
                "GET /",
                "POST /services/",
                "POST /services/A/plugins",
                "POST /services/",
                "POST /services/B/plugins",
                "POST /services/A/routes",
                "POST /services/B/routes",
                "POST /services/",
                "POST /services/admin/routes",
                "POST /services/admin/plugins",
                "POST /services/admin/plugins",
                "POST /consumers/",
                "POST /consumers/admin/basic-auth",
                "POST /certificates/",
            ]
        );
        assert_eq!(stage, Stage::Done);
        assert_eq!(report.stage, Stage::Done);
        assert!(report.is_clean());
        assert_eq!(report.admin_token, None);
    }

    #[test]
    fn jwt_mode_mints_token() {
        let config = config(&[GATEWAY, TWO_SERVICES]);
        let transport =
            StubTransport::new().respond(Method::POST, "/consumers/admin/jwt", 201, JWT_RESPONSE);
        let (result, calls, _) = run(&config, transport);
        let report = result.unwrap();

        assert_eq!(
            &calls[7..],
            [
                "POST /services/",
                "POST /services/admin/routes",
                "POST /services/admin/plugins",
                "POST /consumers/",
                "POST /consumers/admin/jwt",
            ]
        );
        assert!(report.admin_token.is_some());
        assert!(report.is_clean());
    }

    #[test]
    fn failed_health_probe_provisions_nothing() {
        let config = config(&[GATEWAY, BASIC_AUTH_STATIC, TWO_SERVICES]);
        let transport = StubTransport::new().respond(Method::GET, "/", 503, "");
        let (result, calls, stage) = run(&config, transport);

        assert!(matches!(result, Err(Error::FatalHealth { .. })));
        assert_eq!(calls, ["GET /"]);
        assert_eq!(stage, Stage::Aborted);
    }

    #[test]
    fn unreachable_gateway_provisions_nothing() {
        let config = config(&[GATEWAY, TWO_SERVICES]);
        let transport = StubTransport::new().unreachable(Method::GET, "/");
        let (result, calls, stage) = run(&config, transport);

        assert!(matches!(result, Err(Error::FatalHealth { .. })));
        assert_eq!(calls, ["GET /"]);
        assert_eq!(stage, Stage::Aborted);
    }

    #[test]
    fn failed_secret_service_probe_provisions_nothing() {
        let config = config(&[GATEWAY, SECRET_SERVICE, TWO_SERVICES]);
        let transport = StubTransport::new().respond(Method::GET, "/v1/sys/health", 500, "");
        let (result, calls, stage) = run(&config, transport);

        assert!(matches!(
            result,
            Err(Error::FatalHealth { ref target, .. }) if target == "secret service"
        ));
        assert_eq!(calls, ["GET /", "GET /v1/sys/health"]);
        assert_eq!(stage, Stage::Aborted);
    }

    #[test]
    fn failed_service_skips_its_route_and_plugin() {
        let config = config(&[GATEWAY, BASIC_AUTH_STATIC, TWO_SERVICES]);
        // Only the first services/ POST matches; service A fails, everything else succeeds.
        let transport = StubTransport::new();
        let transport = FailFirst::new(transport, "/services/");
        let mut orchestrator =
            BootstrapOrchestrator::new(&config, transport, RecordingReporter::default());
        let report = orchestrator.run().unwrap();
        let calls = orchestrator.transport().inner.calls();

        assert!(!calls.contains(&"POST /services/A/plugins".to_string()));
        assert!(!calls.contains(&"POST /services/A/routes".to_string()));
        assert!(calls.contains(&"POST /services/B/routes".to_string()));
        assert_eq!(report.stage, Stage::Done);

        let failed: Vec<_> = report.failures().map(|step| step.entity.as_str()).collect();
        assert_eq!(failed, ["A"]);
        let skipped: Vec<_> = report
            .skipped()
            .map(|step| (step.action.clone(), step.entity.as_str()))
            .collect();
        assert_eq!(
            skipped,
            [
                (
                    Action::AttachPlugin {
                        plugin: "jwt".to_string()
                    },
                    "A"
                ),
                (Action::RegisterRoute, "A"),
            ]
        );
        // The certificate is still installed last.
        assert_eq!(calls.last().unwrap(), "POST /certificates/");
    }

    #[test]
    fn route_failure_does_not_stop_the_fleet() {
        let config = config(&[GATEWAY, BASIC_AUTH_STATIC, TWO_SERVICES]);
        let transport =
            StubTransport::new().respond(Method::POST, "/services/A/routes", 400, "bad path");
        let (result, calls, _) = run(&config, transport);
        let report = result.unwrap();

        assert_eq!(calls.len(), 14);
        let failed: Vec<_> = report.failures().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].action, Action::RegisterRoute);
        assert_eq!(failed[0].entity, "A");
        assert!(matches!(
            &failed[0].outcome,
            StepOutcome::Failed(reason) if reason.contains("400")
        ));
    }

    #[test]
    fn rerun_against_existing_state_is_clean() {
        let config = config(&[GATEWAY, BASIC_AUTH_STATIC, TWO_SERVICES]);
        let existing = || StubTransport::new().respond(Method::POST, "", 409, "{}");

        let (first, first_calls, _) = run(&config, existing());
        let (second, second_calls, _) = run(&config, existing());
        let (first, second) = (first.unwrap(), second.unwrap());

        assert_eq!(first_calls, second_calls);
        assert!(first.is_clean());
        assert!(second.is_clean());
        assert!(second
            .steps
            .iter()
            .filter(|step| step.action != Action::ProbeHealth)
            .all(|step| step.outcome == StepOutcome::AlreadyExists));
    }

    #[test]
    fn consumer_failure_skips_credential() {
        let config = config(&[GATEWAY, BASIC_AUTH_STATIC]);
        let transport = StubTransport::new().respond(Method::POST, "/consumers/", 500, "");
        let (result, calls, _) = run(&config, transport);
        let report = result.unwrap();

        assert!(!calls.contains(&"POST /consumers/admin/basic-auth".to_string()));
        assert_eq!(
            report.skipped().map(|step| &step.action).collect::<Vec<_>>(),
            [&Action::AttachBasicAuth]
        );
    }

    #[test]
    fn jwt_failure_yields_no_token() {
        let config = config(&[GATEWAY]);
        let transport = StubTransport::new().respond(Method::POST, "/consumers/admin/jwt", 404, "");
        let (result, _, stage) = run(&config, transport);
        let report = result.unwrap();

        assert_eq!(stage, Stage::Done);
        assert_eq!(report.admin_token, None);
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn secret_service_certificate_flow() {
        let config = config(&[GATEWAY, SECRET_SERVICE]);
        let transport = StubTransport::new()
            .respond(Method::POST, "/consumers/admin/jwt", 201, JWT_RESPONSE)
            .respond(
                Method::GET,
                "/v1/secret/edgex/pki/tls/edgex-kong",
                200,
                r#"{"data":{"cert":"CERT","key":"KEY"}}"#,
            );
        let mut orchestrator =
            BootstrapOrchestrator::new(&config, transport, RecordingReporter::default());
        let report = orchestrator.run().unwrap();
        assert!(report.is_clean());

        let requests = orchestrator.transport().requests();
        let last = requests.last().unwrap();
        assert_eq!(last.url, "http://kong:8001/certificates/");
        assert_eq!(
            last.body,
            crate::client::RequestBody::Json(serde_json::json!({
                "cert": "CERT",
                "key": "KEY",
                "snis": ["edgex-kong"],
            }))
        );
        let fetch = &requests[requests.len() - 2];
        assert_eq!(fetch.url, "http://vault:8200/v1/secret/edgex/pki/tls/edgex-kong");
        assert_eq!(
            fetch.headers,
            [("X-Vault-Token".to_string(), "s.token".to_string())]
        );
    }

    #[test]
    fn certificate_retrieval_failure_skips_install() {
        let config = config(&[GATEWAY, SECRET_SERVICE]);
        let transport = StubTransport::new()
            .respond(Method::POST, "/consumers/admin/jwt", 201, JWT_RESPONSE)
            .unreachable(Method::GET, "/v1/secret/edgex/pki/tls/edgex-kong");
        let (result, calls, stage) = run(&config, transport);
        let report = result.unwrap();

        assert_eq!(stage, Stage::Done);
        assert!(!calls.contains(&"POST /certificates/".to_string()));
        assert_eq!(report.failures().count(), 1);
        assert_eq!(
            report.failures().next().unwrap().action,
            Action::FetchCertificate
        );
        assert_eq!(report.skipped().count(), 1);
    }

    #[test]
    fn certificate_step_names_its_snis() {
        let install_entity = |report: &BootstrapReport| {
            report
                .steps
                .iter()
                .find(|step| step.action == Action::InstallCertificate)
                .map(|step| step.entity.clone())
        };

        let static_config = config(&[GATEWAY, BASIC_AUTH_STATIC]);
        let (result, _, _) = run(&static_config, StubTransport::new());
        assert_eq!(install_entity(&result.unwrap()).as_deref(), Some("(no SNI)"));

        let secret_config = config(&[GATEWAY, SECRET_SERVICE]);
        let transport = StubTransport::new()
            .respond(Method::POST, "/consumers/admin/jwt", 201, JWT_RESPONSE)
            .respond(
                Method::GET,
                "/v1/secret/edgex/pki/tls/edgex-kong",
                200,
                r#"{"data":{"cert":"C","key":"K"}}"#,
            );
        let (result, _, _) = run(&secret_config, transport);
        assert_eq!(install_entity(&result.unwrap()).as_deref(), Some("edgex-kong"));
    }

    #[test]
    fn no_certificate_source_skips_stage() {
        let config = config(&[GATEWAY]);
        let transport =
            StubTransport::new().respond(Method::POST, "/consumers/admin/jwt", 201, JWT_RESPONSE);
        let (_, calls, _) = run(&config, transport);
        assert!(!calls.iter().any(|call| call.contains("certificates")));
    }

    #[test]
    fn reporter_sees_every_step_and_stage() {
        let config = config(&[GATEWAY, BASIC_AUTH_STATIC, TWO_SERVICES]);
        let mut orchestrator =
            BootstrapOrchestrator::new(&config, StubTransport::new(), RecordingReporter::default());
        let report = orchestrator.run().unwrap();

        let reporter = orchestrator.reporter();
        assert_eq!(reporter.records(), report.steps);
        assert_eq!(
            reporter.stages(),
            [
                Stage::Init,
                Stage::ProbeHealth,
                Stage::RegisterServices,
                Stage::RegisterRoutes,
                Stage::BootstrapAdminLoopback,
                Stage::ProvisionAdminConsumer,
                Stage::LoadCertificates,
                Stage::Done,
            ]
        );
        assert!(reporter.finished());
    }

    /// Wraps a stub so the first POST matching `suffix` gets a 500.
    struct FailFirst {
        inner: StubTransport,
        suffix: &'static str,
        failed: std::cell::Cell<bool>,
    }

    impl FailFirst {
        fn new(inner: StubTransport, suffix: &'static str) -> Self {
            Self {
                inner,
                suffix,
                failed: std::cell::Cell::new(false),
            }
        }
    }

    impl Transport for FailFirst {
        fn execute(
            &self,
            request: &crate::client::AdminRequest,
        ) -> std::result::Result<crate::client::AdminResponse, crate::error::TransportError>
        {
            let response = self.inner.execute(request)?;
            let matches = request.method == Method::POST && request.url.ends_with(self.suffix);
            if matches && !self.failed.get() {
                self.failed.set(true);
                return Ok(crate::client::AdminResponse {
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            Ok(response)
        }
    }
}
