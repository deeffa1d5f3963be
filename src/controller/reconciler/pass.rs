//! # Reconciliation Pass
//!
//! One pass: derive parameters, run every component reconciler in order, aggregate
//! the conditions. Nothing here writes the status; the caller persists the returned
//! [`PassOutcome`].
//!
//! A hard error (configuration, missing dependency, apply failure) stops the
//! remaining component steps and forces `Ready=False` with the error's class as the
//! reason. Probe failures never stop a pass; they only turn the owning component's
//! condition False.

use super::status::component_urls;
use super::ReconcilerError;
use crate::config::ControllerConfig;
use crate::controller::apply::ManifestApplier;
use crate::controller::components::{ComponentReconciler, PassContext};
use crate::controller::params::{self, ClusterReader};
use crate::controller::probes::Probes;
use crate::controller::status::{aggregate, PassConditions, ReadyOverride};
use crate::crd::{DataSciencePipelinesApplication, DataSciencePipelinesApplicationStatus};
use kube::{Resource, ResourceExt};
use tracing::{debug, warn};

/// Collaborators of one pass
#[derive(Clone, Copy)]
pub struct PassDeps<'a> {
    pub reader: &'a dyn ClusterReader,
    pub applier: &'a dyn ManifestApplier,
    pub probes: &'a Probes,
    pub config: &'a ControllerConfig,
    pub components: &'a [Box<dyn ComponentReconciler>],
}

impl std::fmt::Debug for PassDeps<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassDeps")
            .field("components", &self.components.len())
            .finish_non_exhaustive()
    }
}

/// Status to persist and the error that cut the pass short, if any
#[derive(Debug)]
pub struct PassOutcome {
    pub status: DataSciencePipelinesApplicationStatus,
    pub error: Option<ReconcilerError>,
}

impl PassOutcome {
    pub fn is_ready(&self) -> bool {
        self.status
            .condition(crate::constants::CR_READY)
            .is_some_and(|c| c.status == "True")
    }
}

fn ready_override(error: &ReconcilerError) -> ReadyOverride {
    ReadyOverride {
        reason: error.class().reason().to_string(),
        message: error.to_string(),
    }
}

pub async fn run_pass(dspa: &DataSciencePipelinesApplication, deps: PassDeps<'_>) -> PassOutcome {
    let previous = dspa.status.clone().unwrap_or_default();
    let generation = dspa.metadata.generation;
    let mut conditions = PassConditions::default();

    let params = match params::derive(dspa, deps.reader, deps.config).await {
        Ok(params) => params,
        Err(e) => {
            warn!("Parameter derivation failed for {}: {}", dspa.name_any(), e);
            let error = ReconcilerError::from(e);
            let status = DataSciencePipelinesApplicationStatus {
                conditions: aggregate(
                    &conditions,
                    Some(&ready_override(&error)),
                    &previous.conditions,
                    generation,
                    chrono::Utc::now(),
                ),
                components: previous.components,
            };
            return PassOutcome {
                status,
                error: Some(error),
            };
        }
    };

    let owner = if params.include_owner_reference {
        dspa.controller_owner_ref(&())
    } else {
        None
    };
    let ctx = PassContext {
        params: &params,
        owner: owner.as_ref(),
        reader: deps.reader,
        applier: deps.applier,
        probes: deps.probes,
        config: deps.config,
    };

    let mut error = None;
    for component in deps.components {
        debug!("Reconciling component {}", component.name());
        match component.reconcile(&ctx).await {
            Ok(Some(condition)) => conditions.set(condition),
            Ok(None) => {}
            Err(e) => {
                warn!("Component {} failed: {}", component.name(), e);
                error = Some(ReconcilerError::from(e));
                break;
            }
        }
    }

    let forced = error.as_ref().map(ready_override);
    let status = DataSciencePipelinesApplicationStatus {
        conditions: aggregate(
            &conditions,
            forced.as_ref(),
            &previous.conditions,
            generation,
            chrono::Utc::now(),
        ),
        components: component_urls(&params, &conditions, deps.reader).await,
    };

    PassOutcome { status, error }
}
