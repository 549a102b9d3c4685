use std::collections::BTreeMap;
use std::time::Duration;

use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snapshot_common::config::{self, RETRY_COUNT, SECONDS_BETWEEN_RETRIES, SNAPSHOT_PROCESS_NAME};
use snapshot_common::tags::creation_tags;
use snapshot_common::{
    list_all_instances, CreateSnapshotRequest, DatabaseFilter, RdsClient, RdsOperations, Response,
    SnapshotError,
};
use tracing::{error, info, warn};

#[derive(Builder, Debug, Clone, PartialEq)]
pub struct CreatorConfig {
    #[builder(into)]
    pub process_name: String,
    pub retry_count: u32,
    pub seconds_between_retries: u64,
    #[builder(default)]
    pub filter: DatabaseFilter,
}

impl CreatorConfig {
    pub fn from_env() -> Result<Self, SnapshotError> {
        Self::from_lookup(config::env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, SnapshotError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            process_name: config::required(&lookup, SNAPSHOT_PROCESS_NAME)?,
            retry_count: config::required_number(&lookup, RETRY_COUNT)?,
            seconds_between_retries: config::required_number(&lookup, SECONDS_BETWEEN_RETRIES)?,
            filter: config::database_filter(&lookup)?,
        })
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.seconds_between_retries)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotStatus {
    #[serde(rename = "In Progress")]
    InProgress,
    Succeeded,
    Failed,
}

/// Per-snapshot outcome of one run, keyed by snapshot identifier
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct CreatorReport {
    #[serde(rename = "failureCount")]
    pub failure_count: usize,
    #[serde(rename = "successCount")]
    pub success_count: usize,
    #[serde(flatten)]
    pub snapshots: BTreeMap<String, SnapshotStatus>,
}

pub struct SnapshotCreatorService<R> {
    rds: R,
    config: CreatorConfig,
}

impl SnapshotCreatorService<RdsClient> {
    pub async fn new() -> Result<Self, SnapshotError> {
        let config = CreatorConfig::from_env()?;
        let region = config::primary_region(&config::env_lookup);

        Ok(Self {
            rds: RdsClient::from_env(&region).await,
            config,
        })
    }
}

impl<R: RdsOperations> SnapshotCreatorService<R> {
    pub fn with_client(rds: R, config: CreatorConfig) -> Self {
        Self { rds, config }
    }

    /// Instances in the region that pass the include/exclude lists
    pub async fn select_instances(&self) -> Result<Vec<String>, SnapshotError> {
        let instances = list_all_instances(&self.rds).await?;
        let selected = self
            .config
            .filter
            .select(instances.iter().map(|db| db.identifier.as_str()));

        for db in instances.iter().filter(|db| selected.contains(&db.identifier)) {
            info!(
                instance = %db.identifier,
                status = db.status.as_deref().unwrap_or("unknown"),
                "Selected database for snapshot"
            );
        }

        Ok(selected)
    }

    /// Start one snapshot, retrying the two instance-state faults.
    ///
    /// Returns `Ok(false)` once the retries are used up; any other error is
    /// returned as-is without retrying.
    pub async fn create_with_retry(
        &self,
        request: &CreateSnapshotRequest,
    ) -> Result<bool, SnapshotError> {
        let retry_limit = self.config.retry_count;
        let mut attempt = 0;

        while attempt < retry_limit {
            attempt += 1;

            if attempt > 1 {
                info!("Retrying after {} seconds", self.config.seconds_between_retries);
                tokio::time::sleep(self.config.retry_delay()).await;
            }

            info!(
                "Creating manual snapshot {} of database: {}",
                request.snapshot_identifier, request.instance_identifier
            );

            match self.rds.create_db_snapshot(request.clone()).await {
                Ok(()) => return Ok(true),
                Err(SnapshotError::InstanceUnavailable { .. }) => {
                    warn!(
                        "DB instance: {} is not in available state",
                        request.instance_identifier
                    );
                }
                Err(SnapshotError::SnapshotInProgress { .. }) => {
                    warn!(
                        "Earlier snapshot for the DB instance: {} is in progress",
                        request.instance_identifier
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Ok(false)
    }

    pub async fn run_snapshots(
        &self,
        timestamp: &str,
    ) -> Result<Response<CreatorReport>, SnapshotError> {
        info!("Include list of databases: {:?}", self.config.filter.include());
        info!("Exclude list of databases: {:?}", self.config.filter.exclude());

        let selected = self.select_instances().await?;
        let mut report = CreatorReport::default();

        for instance in &selected {
            let request = CreateSnapshotRequest {
                snapshot_identifier: snapshot_identifier(instance, timestamp),
                instance_identifier: instance.clone(),
                tags: creation_tags(timestamp, &self.config.process_name),
            };

            report
                .snapshots
                .insert(request.snapshot_identifier.clone(), SnapshotStatus::InProgress);

            let status = if self.create_with_retry(&request).await? {
                report.success_count += 1;
                SnapshotStatus::Succeeded
            } else {
                report.failure_count += 1;
                error!(
                    "Snapshot for database {} failed after retrying {} times. Skipping....",
                    instance, self.config.retry_count
                );
                SnapshotStatus::Failed
            };

            report
                .snapshots
                .insert(request.snapshot_identifier, status);
        }

        if report.success_count == 0 && !selected.is_empty() {
            return Err(SnapshotError::AllSnapshotsFailed {
                retry_limit: self.config.retry_count,
            });
        }

        info!(
            succeeded = report.success_count,
            failed = report.failure_count,
            "Snapshot run finished"
        );

        Ok(Response::ok(report))
    }
}

/// Batch timestamp shared by every snapshot of one invocation
pub fn batch_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d%H%M%S").to_string()
}

pub fn snapshot_identifier(instance_identifier: &str, timestamp: &str) -> String {
    format!("{}-{}", instance_identifier, timestamp)
}
