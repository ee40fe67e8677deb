//! High-level pipeline: reconcile → resolve/download → materialize.
//!
//! This module ties the engines together for one run:
//!   - Reconciles the in-memory [`Config`] against the detected dependencies
//!     and persists it once if anything changed
//!   - Resolves every configured category against the registry and downloads
//!     the resulting bundles ([`crate::download::assemble`])
//!   - Writes the bundles into each agent root ([`Materializer`])
//!
//! # Error Handling
//! Only an unsupported registry aborts the run. Unreachable categories,
//! missing references, protected files, refused paths and a failed config save
//! all end up as [`Diagnostic`]s in the [`SynchroniseReport`]. A failed save
//! does not roll back the in-memory reconciliation; the run continues with it.

use std::collections::BTreeSet;

use tracing::info;

use crate::catalog::DetectionRegistry;
use crate::config::{Config, ConfigStore};
use crate::contract::RemoteTree;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::download::assemble;
use crate::error::SyncError;
use crate::materialize::{MaterializeReport, Materializer};
use crate::reconcile::{reconcile, Reconciliation};

/// Collaborators of one run.
pub struct SyncContext<'a, R: RemoteTree + ?Sized> {
    pub store: &'a ConfigStore,
    pub remote: &'a R,
    pub detected: &'a BTreeSet<String>,
    pub rules: &'a DetectionRegistry,
    pub materializer: &'a Materializer,
}

#[derive(Debug)]
pub struct BundleSummary {
    pub category: String,
    pub skill: String,
    pub files: usize,
}

#[derive(Debug, Default)]
pub struct SynchroniseReport {
    pub reconciliation: Reconciliation,
    pub config_saved: bool,
    pub bundles: Vec<BundleSummary>,
    pub materialized: MaterializeReport,
    /// Every diagnostic of the run, in the order it was produced.
    pub diagnostics: Vec<Diagnostic>,
}

/// Result of [`reconcile_and_persist`].
#[derive(Debug, Default)]
pub struct PersistedReconciliation {
    pub reconciliation: Reconciliation,
    pub saved: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Reconciles `config` and saves it when it changed. A save failure is a
/// diagnostic, the mutated config is kept either way.
pub fn reconcile_and_persist(
    config: &mut Config,
    store: &ConfigStore,
    detected: &BTreeSet<String>,
    rules: &DetectionRegistry,
) -> PersistedReconciliation {
    let reconciliation = reconcile(config, detected, rules);
    let mut outcome = PersistedReconciliation::default();

    for (category, skill) in &reconciliation.disabled {
        outcome.diagnostics.push(Diagnostic::info(
            DiagnosticKind::AutoDisabled,
            format!("Excluding '{skill}' in '{category}': none of its packages are used."),
        ));
    }
    for (category, skill) in &reconciliation.reenabled {
        outcome.diagnostics.push(Diagnostic::info(
            DiagnosticKind::Reenabled,
            format!("Re-enabling '{skill}' in '{category}': its packages are used again."),
        ));
    }

    if reconciliation.changed() {
        match store.save(config) {
            Ok(()) => outcome.saved = true,
            Err(e) => outcome.diagnostics.push(Diagnostic::error(
                DiagnosticKind::PersistFailed,
                format!("Could not save reconciled config: {e}"),
            )),
        }
    }

    outcome.reconciliation = reconciliation;
    outcome
}

pub async fn synchronise<R: RemoteTree + ?Sized>(
    config: &mut Config,
    ctx: &SyncContext<'_, R>,
) -> Result<SynchroniseReport, SyncError> {
    let mut report = SynchroniseReport::default();

    if config.skills.is_empty() {
        report.diagnostics.push(Diagnostic::warning(
            DiagnosticKind::NoCategories,
            "No skill categories configured, nothing to sync.",
        ));
        return Ok(report);
    }

    let persisted = reconcile_and_persist(config, ctx.store, ctx.detected, ctx.rules);
    report.reconciliation = persisted.reconciliation;
    report.config_saved = persisted.saved;
    report.diagnostics.extend(persisted.diagnostics);

    info!(registry = %config.registry, "Syncing skills");
    let categories: Vec<String> = config.skills.keys().cloned().collect();
    let assembly = assemble(ctx.remote, &categories, config).await?;
    report.diagnostics.extend(assembly.diagnostics);

    report.bundles = assembly
        .bundles
        .iter()
        .map(|b| BundleSummary {
            category: b.category.clone(),
            skill: b.skill.clone(),
            files: b.files.len(),
        })
        .collect();

    let mut materialized = ctx.materializer.write(&assembly.bundles, config);
    report.diagnostics.append(&mut materialized.diagnostics);
    report.materialized = materialized;

    info!(
        bundles = report.bundles.len(),
        written = report.materialized.written.len(),
        "Sync finished"
    );
    Ok(report)
}
