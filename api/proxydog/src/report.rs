//! Step outcomes and the reporting port they are handed to.

use crate::client::Confirmation;
use crate::orchestrator::Stage;
use log::{debug, error, info, warn};
use std::fmt;

/// A single provisioning action taken during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ProbeHealth,
    RegisterService,
    AttachPlugin { plugin: String },
    RegisterRoute,
    CreateConsumer,
    AttachBasicAuth,
    MintJwt,
    FetchCertificate,
    InstallCertificate,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::ProbeHealth => write!(f, "probe health of"),
            Action::RegisterService => write!(f, "register service"),
            Action::AttachPlugin { plugin } => write!(f, "attach {} plugin to service", plugin),
            Action::RegisterRoute => write!(f, "register route for service"),
            Action::CreateConsumer => write!(f, "create consumer"),
            Action::AttachBasicAuth => write!(f, "attach basic-auth credential to consumer"),
            Action::MintJwt => write!(f, "mint JWT for consumer"),
            Action::FetchCertificate => write!(f, "fetch certificate from"),
            Action::InstallCertificate => write!(f, "install certificate for"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Created,
    AlreadyExists,
    /// The step succeeded without creating a gateway entity (probes, fetches, token minting).
    Completed,
    Failed(String),
    /// The step was not attempted because something it depends on failed.
    Skipped(String),
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            StepOutcome::Created | StepOutcome::AlreadyExists | StepOutcome::Completed
        )
    }
}

impl From<Confirmation> for StepOutcome {
    fn from(confirmation: Confirmation) -> Self {
        match confirmation {
            Confirmation::Created => StepOutcome::Created,
            Confirmation::AlreadyExists => StepOutcome::AlreadyExists,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub stage: Stage,
    pub action: Action,
    pub entity: String,
    pub outcome: StepOutcome,
}

/// The result of a bootstrap run that got past the health probes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    pub steps: Vec<StepRecord>,
    pub stage: Stage,
    /// The admin JWT, when one was minted.  The gateway does not keep it.
    pub admin_token: Option<String>,
}

impl BootstrapReport {
    pub fn failures(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps
            .iter()
            .filter(|step| matches!(step.outcome, StepOutcome::Failed(_)))
    }

    pub fn skipped(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps
            .iter()
            .filter(|step| matches!(step.outcome, StepOutcome::Skipped(_)))
    }

    /// True when every step succeeded.
    pub fn is_clean(&self) -> bool {
        self.steps.iter().all(|step| step.outcome.is_success())
    }
}

/// Receives progress of a bootstrap run as it happens.
pub trait Reporter {
    fn stage(&self, _stage: Stage) {}

    fn step(&self, record: &StepRecord);

    fn finish(&self, _report: &BootstrapReport) {}
}

/// Reports through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn stage(&self, stage: Stage) {
        debug!("Entering stage {}", stage);
    }

    fn step(&self, record: &StepRecord) {
        match &record.outcome {
            StepOutcome::Created => info!("Successful to {} '{}'", record.action, record.entity),
            StepOutcome::AlreadyExists => info!(
                "Successful to {} '{}' (already present)",
                record.action, record.entity
            ),
            StepOutcome::Completed => info!("Successful to {} '{}'", record.action, record.entity),
            StepOutcome::Failed(reason) => error!(
                "Failed to {} '{}': {}",
                record.action, record.entity, reason
            ),
            StepOutcome::Skipped(reason) => warn!(
                "Skipped attempt to {} '{}': {}",
                record.action, record.entity, reason
            ),
        }
    }

    fn finish(&self, report: &BootstrapReport) {
        let failed = report.failures().count();
        let skipped = report.skipped().count();
        if failed == 0 && skipped == 0 {
            info!("Bootstrap finished: {} steps succeeded", report.steps.len());
        } else {
            warn!(
                "Bootstrap finished with {} failed and {} skipped of {} steps",
                failed,
                skipped,
                report.steps.len()
            );
        }
    }
}
