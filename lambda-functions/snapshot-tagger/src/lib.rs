use bon::Builder;
use snapshot_common::config::{self, DESTINATION_REGION, SNAPSHOT_PROCESS_NAME};
use snapshot_common::tags::process_tag;
use snapshot_common::{
    has_process_tag, DatabaseFilter, RdsClient, RdsOperations, Response, Snapshot, SnapshotError,
    SnapshotPages,
};
use tracing::{debug, info};

pub const COMPLETED: &str = "Completed";

#[derive(Builder, Debug, Clone, PartialEq)]
pub struct TaggerConfig {
    #[builder(into)]
    pub source_region: String,
    #[builder(into)]
    pub destination_region: String,
    #[builder(into)]
    pub process_name: String,
    #[builder(default)]
    pub filter: DatabaseFilter,
}

impl TaggerConfig {
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
            filter: config::database_filter(&lookup)?,
        })
    }
}

/// Snapshots in scope that no process has claimed yet.
///
/// A snapshot already tagged with a different process name belongs to that
/// process and is left alone.
pub fn needs_tag(snapshot: &Snapshot, filter: &DatabaseFilter) -> bool {
    filter.allows(&snapshot.instance_identifier) && !has_process_tag(&snapshot.tags)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionSummary {
    pub region: String,
    pub tagged: usize,
    pub skipped: usize,
}

pub struct SnapshotTaggerService<R> {
    primary: R,
    secondary: R,
    config: TaggerConfig,
}

impl SnapshotTaggerService<RdsClient> {
    pub async fn new() -> Result<Self, SnapshotError> {
        let config = TaggerConfig::from_env()?;

        Ok(Self {
            primary: RdsClient::from_env(&config.source_region).await,
            secondary: RdsClient::for_region(&config.destination_region).await,
            config,
        })
    }
}

impl<R: RdsOperations> SnapshotTaggerService<R> {
    pub fn with_clients(primary: R, secondary: R, config: TaggerConfig) -> Self {
        Self {
            primary,
            secondary,
            config,
        }
    }

    /// Tag every unclaimed snapshot in one region
    pub async fn tag_region(&self, rds: &R, region: &str) -> Result<RegionSummary, SnapshotError> {
        let mut summary = RegionSummary {
            region: region.to_string(),
            ..Default::default()
        };
        let mut pages = SnapshotPages::new(rds, &self.config.filter);

        while let Some(snapshots) = pages.next_page().await? {
            for snapshot in snapshots {
                if !self.config.filter.allows(&snapshot.instance_identifier) {
                    debug!(
                        snapshot = %snapshot.identifier,
                        instance = %snapshot.instance_identifier,
                        "Database not in scope"
                    );
                    summary.skipped += 1;
                    continue;
                }

                if !needs_tag(&snapshot, &self.config.filter) {
                    info!(
                        "Skipping to add tags for snapshot {} (database: {}) as tag named 'SnapshotProcessName' already exists",
                        snapshot.arn, snapshot.instance_identifier
                    );
                    summary.skipped += 1;
                    continue;
                }

                info!(
                    "Adding tags to snapshot {} (database: {}, snapshot creation date: {})",
                    snapshot.arn,
                    snapshot.instance_identifier,
                    snapshot.created_display()
                );
                rds.add_tags_to_resource(
                    snapshot.arn.clone(),
                    vec![process_tag(&self.config.process_name)],
                )
                .await?;
                summary.tagged += 1;
            }
        }

        info!(
            region = %summary.region,
            tagged = summary.tagged,
            skipped = summary.skipped,
            "Finished tagging"
        );

        Ok(summary)
    }

    pub async fn run_tagging(&self) -> Result<Response<String>, SnapshotError> {
        info!("Include list of databases: {:?}", self.config.filter.include());
        info!("Exclude list of databases: {:?}", self.config.filter.exclude());

        info!("Starting tagging in primary region: {}", self.config.source_region);
        self.tag_region(&self.primary, &self.config.source_region)
            .await?;

        info!(
            "Starting tagging in secondary region: {}",
            self.config.destination_region
        );
        self.tag_region(&self.secondary, &self.config.destination_region)
            .await?;

        Ok(Response::ok(COMPLETED.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapshot_common::{MockRdsOperations, Page, Tag};

    fn config(filter: DatabaseFilter) -> TaggerConfig {
        TaggerConfig::builder()
            .source_region("us-east-1")
            .destination_region("us-west-2")
            .process_name("nightly")
            .filter(filter)
            .build()
    }

    fn snapshot(id: &str, instance: &str, tags: Vec<Tag>) -> Snapshot {
        Snapshot {
            identifier: id.to_string(),
            arn: format!("arn:aws:rds:us-east-1:123456789012:snapshot:{}", id),
            instance_identifier: instance.to_string(),
            status: Some("available".to_string()),
            original_create_time: None,
            tags,
        }
    }

    #[test]
    fn test_needs_tag() {
        let filter = DatabaseFilter::new(vec![], vec!["db-b".to_string()]);

        assert!(needs_tag(&snapshot("db-a-1", "db-a", vec![]), &filter));
        assert!(!needs_tag(&snapshot("db-b-1", "db-b", vec![]), &filter));
        assert!(!needs_tag(
            &snapshot("db-a-2", "db-a", vec![Tag::new("SnapshotProcessName", "nightly")]),
            &filter
        ));
        assert!(!needs_tag(
            &snapshot("db-a-3", "db-a", vec![Tag::new("SnapshotProcessName", "other")]),
            &filter
        ));
    }

    #[tokio::test]
    async fn test_tag_region_tags_only_unclaimed() {
        let mut rds = MockRdsOperations::new();
        rds.expect_describe_db_snapshots().times(1).returning(|_| {
            Ok(Page {
                items: vec![
                    snapshot("db-a-1", "db-a", vec![]),
                    snapshot("db-a-2", "db-a", vec![Tag::new("SnapshotProcessName", "nightly")]),
                    snapshot("db-b-1", "db-b", vec![]),
                ],
                marker: None,
            })
        });
        rds.expect_add_tags_to_resource()
            .withf(|arn, tags| {
                arn.ends_with(":snapshot:db-a-1")
                    && tags == &vec![Tag::new("SnapshotProcessName", "nightly")]
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let service = SnapshotTaggerService::with_clients(
            MockRdsOperations::new(),
            MockRdsOperations::new(),
            config(DatabaseFilter::new(vec![], vec!["db-b".to_string()])),
        );
        let summary = service.tag_region(&rds, "us-east-1").await.unwrap();

        assert_eq!(summary.tagged, 1);
        assert_eq!(summary.skipped, 2);
    }

    #[tokio::test]
    async fn test_run_tagging_covers_both_regions() {
        let mut primary = MockRdsOperations::new();
        primary.expect_describe_db_snapshots().times(1).returning(|_| {
            Ok(Page {
                items: vec![snapshot("db-a-1", "db-a", vec![])],
                marker: None,
            })
        });
        primary
            .expect_add_tags_to_resource()
            .times(1)
            .returning(|_, _| Ok(()));

        let mut secondary = MockRdsOperations::new();
        secondary.expect_describe_db_snapshots().times(1).returning(|_| {
            Ok(Page {
                items: vec![snapshot("db-a-1", "db-a", vec![])],
                marker: None,
            })
        });
        secondary
            .expect_add_tags_to_resource()
            .times(1)
            .returning(|_, _| Ok(()));

        let service = SnapshotTaggerService::with_clients(
            primary,
            secondary,
            config(DatabaseFilter::default()),
        );
        let response = service.run_tagging().await.unwrap();
        assert_eq!(response.body, COMPLETED);
    }

    #[tokio::test]
    async fn test_tag_failure_aborts_before_secondary() {
        let mut primary = MockRdsOperations::new();
        primary.expect_describe_db_snapshots().returning(|_| {
            Ok(Page {
                items: vec![snapshot("db-a-1", "db-a", vec![])],
                marker: None,
            })
        });
        primary.expect_add_tags_to_resource().returning(|_, _| {
            Err(SnapshotError::Rds {
                code: Some("AccessDenied".to_string()),
                message: "denied".to_string(),
            })
        });

        let mut secondary = MockRdsOperations::new();
        secondary.expect_describe_db_snapshots().never();

        let service = SnapshotTaggerService::with_clients(
            primary,
            secondary,
            config(DatabaseFilter::default()),
        );
        tokio_test::assert_err!(service.run_tagging().await);
    }
}
