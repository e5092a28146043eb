//! Entry points of the consolidation pass.
//!
//! [`run_consolidation`] is the one operation the upgrade procedure calls.
//! [`plan_consolidation`] and [`persist_plan`] expose its two halves so a
//! caller can inspect the plan without writing anything.

use crate::config::{ConsolidationConfig, MatchPolicy};
use crate::consolidator::{Consolidation, Consolidator, ResolutionCounts};
use crate::error::{MigrateError, Result};
use crate::loader::{load_legacy_items, load_unconfigured_interfaces};
use crate::model::ConfigRecord;
use crate::orphans::fill_orphans;
use crate::persister::{insert_configs, insert_interfaces, repoint_items, retag_legacy_items};
use crate::schema::verify_legacy_layout;
use crate::store::{IdAllocator, MaxIdAllocator, MultiUpdateStats};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use std::time::Instant;
use tracing::info;

/// Everything the pass will write, computed without touching the database.
#[derive(Debug, Clone, Serialize)]
pub struct ConsolidationPlan {
    /// Distinct legacy item configurations read by the loader.
    pub legacy_configurations: usize,
    pub consolidation: Consolidation,
    /// Placeholder configurations for interfaces without items.
    pub orphans: Vec<ConfigRecord>,
}

impl ConsolidationPlan {
    pub fn config_count(&self) -> usize {
        self.consolidation.representatives.len()
            + self.consolidation.minted_configs().count()
            + self.orphans.len()
    }
}

/// Rows written by [`persist_plan`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PersistStats {
    pub configs_inserted: usize,
    pub interfaces_inserted: usize,
    pub item_updates: MultiUpdateStats,
    pub items_retagged: usize,
}

/// Summary of one run, suitable for logging or JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct ConsolidationReport {
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub match_policy: MatchPolicy,
    pub legacy_configurations: usize,
    pub resolutions: ResolutionCounts,
    pub planned_configs: usize,
    pub planned_interfaces: usize,
    pub orphan_defaults: usize,
    /// `None` for a dry run.
    pub persisted: Option<PersistStats>,
}

impl ConsolidationReport {
    fn new(plan: &ConsolidationPlan, config: &ConsolidationConfig, started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            elapsed_ms: 0,
            match_policy: config.match_policy,
            legacy_configurations: plan.legacy_configurations,
            resolutions: plan.consolidation.counts,
            planned_configs: plan.config_count(),
            planned_interfaces: plan.consolidation.interfaces.len(),
            orphan_defaults: plan.orphans.len(),
            persisted: None,
        }
    }
}

/// Load, consolidate and fill orphans. Reads only.
pub fn plan_consolidation(
    conn: &Connection,
    config: &ConsolidationConfig,
    ids: &mut dyn IdAllocator,
) -> Result<ConsolidationPlan> {
    let items = load_legacy_items(conn)?;
    let legacy_configurations = items.len();
    info!(
        "Consolidation: loaded {} distinct legacy item configurations",
        legacy_configurations
    );

    let mut consolidator = Consolidator::new(config.match_policy);
    for item in items {
        consolidator.resolve(item, ids)?;
    }
    let consolidation = consolidator.finish();
    let counts = consolidation.counts;
    info!(
        "Consolidation: {} representatives, {} reused, {} joined siblings, {} new interfaces",
        counts.representatives, counts.reused_existing, counts.reused_siblings, counts.created
    );

    let unconfigured = load_unconfigured_interfaces(conn)?;
    let orphans = fill_orphans(&unconfigured, consolidation.configured_ids());

    Ok(ConsolidationPlan {
        legacy_configurations,
        consolidation,
        orphans,
    })
}

/// Write a plan. Each step runs only if it has rows; the first failure
/// stops the remaining steps.
pub fn persist_plan(
    conn: &Connection,
    plan: &ConsolidationPlan,
    config: &ConsolidationConfig,
) -> Result<PersistStats> {
    let consolidation = &plan.consolidation;
    let mut stats = PersistStats::default();

    // Interfaces must exist before their configurations and item references
    stats.configs_inserted += insert_configs(conn, &consolidation.representatives)?;
    stats.interfaces_inserted = insert_interfaces(conn, &consolidation.interfaces)?;
    stats.configs_inserted += insert_configs(conn, consolidation.minted_configs())?;
    stats.configs_inserted += insert_configs(conn, &plan.orphans)?;
    info!(
        "Consolidation: inserted {} interfaces and {} configurations",
        stats.interfaces_inserted, stats.configs_inserted
    );

    stats.item_updates = repoint_items(conn, &consolidation.repoints, config.max_statement_bytes)?;
    stats.items_retagged = retag_legacy_items(conn)?;
    info!(
        "Consolidation: {} repoint statements in {} batches, {} items retagged",
        stats.item_updates.statements, stats.item_updates.executions, stats.items_retagged
    );

    Ok(stats)
}

/// Plan without writing. The allocator only reads current maxima.
pub fn dry_run(conn: &Connection, config: &ConsolidationConfig) -> Result<ConsolidationReport> {
    config.validate()?;
    let started_at = Utc::now();
    let timer = Instant::now();

    verify_legacy_layout(conn)?;
    let mut ids = MaxIdAllocator::new(conn);
    let plan = plan_consolidation(conn, config, &mut ids)?;

    let mut report = ConsolidationReport::new(&plan, config, started_at);
    report.elapsed_ms = timer.elapsed().as_millis() as u64;
    Ok(report)
}

/// Run the whole pass with identifiers allocated above the current
/// `interface` maximum.
pub fn run_consolidation(
    conn: &Connection,
    config: &ConsolidationConfig,
) -> Result<ConsolidationReport> {
    let mut ids = MaxIdAllocator::new(conn);
    run_consolidation_with(conn, config, &mut ids)
}

/// Run the whole pass with a caller-supplied allocator.
///
/// With `config.atomic` the pass opens its own transaction, so the caller
/// must not already hold one on `conn`.
pub fn run_consolidation_with(
    conn: &Connection,
    config: &ConsolidationConfig,
    ids: &mut dyn IdAllocator,
) -> Result<ConsolidationReport> {
    config.validate()?;
    let started_at = Utc::now();
    let timer = Instant::now();

    verify_legacy_layout(conn)?;

    let mut report = if config.atomic {
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| MigrateError::database("Failed to begin transaction", e))?;
        let report = plan_and_persist(&tx, config, ids, started_at)?;
        tx.commit()
            .map_err(|e| MigrateError::database("Failed to commit consolidation", e))?;
        report
    } else {
        plan_and_persist(conn, config, ids, started_at)?
    };

    report.elapsed_ms = timer.elapsed().as_millis() as u64;
    info!("Consolidation finished in {} ms", report.elapsed_ms);
    Ok(report)
}

fn plan_and_persist(
    conn: &Connection,
    config: &ConsolidationConfig,
    ids: &mut dyn IdAllocator,
    started_at: DateTime<Utc>,
) -> Result<ConsolidationReport> {
    let plan = plan_consolidation(conn, config, ids)?;
    let mut report = ConsolidationReport::new(&plan, config, started_at);
    report.persisted = Some(persist_plan(conn, &plan, config)?);
    Ok(report)
}
