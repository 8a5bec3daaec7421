//! Status command implementation.

use crate::state::StateFile;
use cpsync_core::{condition_types, AnyEntity, ConditionStatus};
use cpsync_engine::{check_freshness, Freshness, DEFAULT_SYNC_PERIOD};
use serde::Serialize;
use std::path::Path;
use std::time::{Duration, SystemTime};

/// Sync status of one entity.
#[derive(Debug, Serialize)]
pub struct EntityStatusRow {
    /// Entity kind.
    pub kind: String,
    /// Object key.
    pub key: String,
    /// Remote identity, if created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    /// Status of the `Programmed` condition.
    pub programmed: ConditionStatus,
    /// Reason of the `Programmed` condition.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reason: String,
    /// Message of the `Programmed` condition.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    /// Seconds until the next update is due, if in sync.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fresh_for_secs: Option<u64>,
    /// Why the next apply will update the entity, if stale.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale_reason: Option<String>,
    /// True if marked for deletion.
    pub deleting: bool,
}

/// Status report for a state file.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    /// Sync period the freshness was computed with.
    pub sync_period_secs: u64,
    /// Number of entities stored remotely.
    pub remote_entities: usize,
    /// Per-entity rows.
    pub entities: Vec<EntityStatusRow>,
}

/// Runs the status command.
pub fn run(
    path: &Path,
    sync_period: Option<Duration>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = StateFile::load(path)?;
    let report = build_report(
        &state,
        SystemTime::now(),
        sync_period.unwrap_or(DEFAULT_SYNC_PERIOD),
    );

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            print_text_output(&report);
        }
    }

    Ok(())
}

/// Builds the report as of `now`.
pub fn build_report(state: &StateFile, now: SystemTime, sync_period: Duration) -> StatusReport {
    StatusReport {
        sync_period_secs: sync_period.as_secs(),
        remote_entities: state.remote.entities.len(),
        entities: state
            .entities
            .iter()
            .map(|entity| row(entity, now, sync_period))
            .collect(),
    }
}

fn row(entity: &AnyEntity, now: SystemTime, sync_period: Duration) -> EntityStatusRow {
    let e = entity.as_sync_entity();
    let programmed = e.conditions().get(condition_types::PROGRAMMED);

    let (fresh_for_secs, stale_reason) =
        match check_freshness(e.conditions(), e.generation(), now, sync_period) {
            Freshness::Fresh { requeue_after, .. } => (Some(requeue_after.as_secs()), None),
            Freshness::Stale(reason) => (None, Some(reason.to_string())),
        };

    EntityStatusRow {
        kind: e.kind().to_string(),
        key: e.key().to_string(),
        remote_id: e.remote_id().map(str::to_owned),
        programmed: programmed.map_or(ConditionStatus::Unknown, |c| c.status),
        reason: programmed.map(|c| c.reason.clone()).unwrap_or_default(),
        message: programmed.map(|c| c.message.clone()).unwrap_or_default(),
        fresh_for_secs,
        stale_reason,
        deleting: entity.is_being_deleted(),
    }
}

fn print_text_output(report: &StatusReport) {
    println!("cpsync status");
    println!("=============");
    println!();
    println!("Sync period:     {}s", report.sync_period_secs);
    println!("Remote entities: {}", report.remote_entities);
    println!();
    println!("Entities:");
    for row in &report.entities {
        let state = match (row.fresh_for_secs, &row.stale_reason) {
            (Some(secs), _) => format!("in sync for {secs}s"),
            (None, Some(reason)) => format!("stale: {reason}"),
            (None, None) => "stale".to_string(),
        };
        println!(
            "  {} {} [{}] {}",
            row.kind,
            row.key,
            row.remote_id.as_deref().unwrap_or("-"),
            state
        );
        if !row.message.is_empty() {
            println!("      {}", row.message);
        }
        if row.deleting {
            println!("      marked for deletion");
        }
    }
}
