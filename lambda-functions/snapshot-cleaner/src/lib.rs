use bon::Builder;
use chrono::{DateTime, TimeDelta, Utc};
use snapshot_common::config::{self, DESTINATION_REGION, RETENTION_IN_DAYS, SNAPSHOT_PROCESS_NAME};
use snapshot_common::{
    is_managed, DatabaseFilter, RdsClient, RdsOperations, Response, Snapshot, SnapshotError,
    SnapshotPages,
};
use tracing::{debug, info};

pub const COMPLETED: &str = "Completed";

#[derive(Builder, Debug, Clone, PartialEq)]
pub struct CleanerConfig {
    #[builder(into)]
    pub source_region: String,
    #[builder(into)]
    pub destination_region: String,
    #[builder(into)]
    pub process_name: String,
    pub retention_days: i64,
    #[builder(default)]
    pub filter: DatabaseFilter,
}

impl CleanerConfig {
    pub fn from_env() -> Result<Self, SnapshotError> {
        Self::from_lookup(config::env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, SnapshotError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            source_region: config::primary_region(&lookup),
            destination_region: config::required(&lookup, DESTINATION_REGION)?,
            process_name: config::required(&lookup, SNAPSHOT_PROCESS_NAME)?,
            retention_days: config::required_number(&lookup, RETENTION_IN_DAYS)?,
            filter: config::database_filter(&lookup)?,
        })
    }

    /// Snapshots created before this instant are expired
    pub fn cutoff(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, SnapshotError> {
        TimeDelta::try_days(self.retention_days)
            .and_then(|retention| now.checked_sub_signed(retention))
            .ok_or_else(|| SnapshotError::InvalidConfig {
                key: RETENTION_IN_DAYS,
                reason: format!("{} days is out of range", self.retention_days),
            })
    }
}

/// Why a listed snapshot was or wasn't deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Delete,
    OutOfScope,
    /// Newer than the cutoff, not yet `available`, or without a creation time
    Retained,
    NotManaged,
}

pub fn verdict(snapshot: &Snapshot, config: &CleanerConfig, cutoff: DateTime<Utc>) -> Verdict {
    if !config.filter.allows(&snapshot.instance_identifier) {
        return Verdict::OutOfScope;
    }

    let expired = snapshot
        .original_create_time
        .is_some_and(|created| created < cutoff);
    if !expired || !snapshot.is_available() {
        return Verdict::Retained;
    }

    if is_managed(&snapshot.tags, &config.process_name) {
        Verdict::Delete
    } else {
        Verdict::NotManaged
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionSummary {
    pub region: String,
    pub deleted: usize,
    pub skipped: usize,
}

pub struct SnapshotCleanerService<R> {
    primary: R,
    secondary: R,
    config: CleanerConfig,
}

impl SnapshotCleanerService<RdsClient> {
    pub async fn new() -> Result<Self, SnapshotError> {
        let config = CleanerConfig::from_env()?;

        Ok(Self {
            primary: RdsClient::from_env(&config.source_region).await,
            secondary: RdsClient::for_region(&config.destination_region).await,
            config,
        })
    }
}

impl<R: RdsOperations> SnapshotCleanerService<R> {
    pub fn with_clients(primary: R, secondary: R, config: CleanerConfig) -> Self {
        Self {
            primary,
            secondary,
            config,
        }
    }

    /// Delete every expired managed snapshot in one region
    pub async fn clean_region(
        &self,
        rds: &R,
        region: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<RegionSummary, SnapshotError> {
        let mut summary = RegionSummary {
            region: region.to_string(),
            ..Default::default()
        };
        let mut pages = SnapshotPages::new(rds, &self.config.filter);

        while let Some(snapshots) = pages.next_page().await? {
            for snapshot in snapshots {
                match verdict(&snapshot, &self.config, cutoff) {
                    Verdict::Delete => {
                        info!(
                            "Deleting snapshot {} (database: {}, snapshot creation date: {})",
                            snapshot.identifier,
                            snapshot.instance_identifier,
                            snapshot.created_display()
                        );
                        rds.delete_db_snapshot(snapshot.identifier.clone()).await?;
                        summary.deleted += 1;
                    }
                    Verdict::NotManaged => {
                        info!(
                            "Skipping to delete snapshot {} (database: {}) as it is not managed by the automation process",
                            snapshot.identifier, snapshot.instance_identifier
                        );
                        summary.skipped += 1;
                    }
                    other => {
                        debug!(
                            snapshot = %snapshot.identifier,
                            instance = %snapshot.instance_identifier,
                            verdict = ?other,
                            "Keeping snapshot"
                        );
                        summary.skipped += 1;
                    }
                }
            }
        }

        info!(
            region = %summary.region,
            deleted = summary.deleted,
            skipped = summary.skipped,
            "Finished clean-up"
        );

        Ok(summary)
    }

    pub async fn run_cleanup(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Response<String>, SnapshotError> {
        let cutoff = self.config.cutoff(now)?;

        info!(
            "The snapshots with creation date before timestamp: {} would be deleted (retention period: {} days)",
            cutoff.format("%Y-%m-%d %H:%M:%S"),
            self.config.retention_days
        );
        info!("Include list of databases: {:?}", self.config.filter.include());
        info!("Exclude list of databases: {:?}", self.config.filter.exclude());

        info!("Starting clean-up in primary region: {}", self.config.source_region);
        self.clean_region(&self.primary, &self.config.source_region, cutoff)
            .await?;

        info!(
            "Starting clean-up in secondary region: {}",
            self.config.destination_region
        );
        self.clean_region(&self.secondary, &self.config.destination_region, cutoff)
            .await?;

        Ok(Response::ok(COMPLETED.to_string()))
    }
}
