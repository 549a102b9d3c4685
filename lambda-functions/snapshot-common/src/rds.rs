//! RDS client and the operations the functions need from it

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_rds::types::{DbSnapshot, Filter};
use aws_sdk_rds::Client;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::SnapshotError;
use crate::model::{
    CopySnapshotRequest, CreateSnapshotRequest, DbInstance, Page, Snapshot, SnapshotQuery, Tag,
    SNAPSHOT_TYPE_MANUAL,
};

/// Trait for RDS operations that can be mocked in tests.
///
/// Identifiers are passed as owned `String`s to work around mockall lifetime
/// limitations.
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait RdsOperations: Send + Sync {
    /// One page of DB instances
    async fn describe_db_instances(
        &self,
        marker: Option<String>,
    ) -> Result<Page<DbInstance>, SnapshotError>;

    /// One page of manual DB snapshots
    async fn describe_db_snapshots(
        &self,
        query: SnapshotQuery,
    ) -> Result<Page<Snapshot>, SnapshotError>;

    async fn create_db_snapshot(&self, request: CreateSnapshotRequest)
        -> Result<(), SnapshotError>;

    async fn copy_db_snapshot(&self, request: CopySnapshotRequest) -> Result<(), SnapshotError>;

    async fn add_tags_to_resource(
        &self,
        resource_arn: String,
        tags: Vec<Tag>,
    ) -> Result<(), SnapshotError>;

    async fn delete_db_snapshot(&self, snapshot_identifier: String) -> Result<(), SnapshotError>;
}

/// RDS client bound to one region
pub struct RdsClient {
    client: Client,
    region: String,
}

impl RdsClient {
    /// Client for the region the function runs in
    pub async fn from_env(region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;

        Self {
            client: Client::new(&config),
            region: region.to_string(),
        }
    }

    /// Client for an explicit region, e.g. the destination of copies
    pub async fn for_region(region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        Self {
            client: Client::new(&config),
            region: region.to_string(),
        }
    }

}

fn to_sdk_tag(tag: Tag) -> aws_sdk_rds::types::Tag {
    aws_sdk_rds::types::Tag::builder()
        .key(tag.key)
        .value(tag.value)
        .build()
}

fn from_sdk_tag(tag: &aws_sdk_rds::types::Tag) -> Tag {
    Tag::new(
        tag.key().unwrap_or_default(),
        tag.value().unwrap_or_default(),
    )
}

fn instance_filter(instance_identifiers: Vec<String>) -> Filter {
    Filter::builder()
        .name("db-instance-id")
        .set_values(Some(instance_identifiers))
        .build()
}

fn from_sdk_snapshot(snapshot: &DbSnapshot) -> Snapshot {
    Snapshot {
        identifier: snapshot.db_snapshot_identifier().unwrap_or_default().to_string(),
        arn: snapshot.db_snapshot_arn().unwrap_or_default().to_string(),
        instance_identifier: snapshot
            .db_instance_identifier()
            .unwrap_or_default()
            .to_string(),
        status: snapshot.status().map(str::to_string),
        original_create_time: snapshot
            .original_snapshot_create_time()
            .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos())),
        tags: snapshot.tag_list().iter().map(from_sdk_tag).collect(),
    }
}

#[async_trait]
impl RdsOperations for RdsClient {
    async fn describe_db_instances(
        &self,
        marker: Option<String>,
    ) -> Result<Page<DbInstance>, SnapshotError> {
        let output = self
            .client
            .describe_db_instances()
            .set_marker(marker)
            .send()
            .await
            .map_err(SnapshotError::from_sdk)?;

        let items = output
            .db_instances()
            .iter()
            .filter_map(|db| {
                db.db_instance_identifier().map(|id| DbInstance {
                    identifier: id.to_string(),
                    status: db.db_instance_status().map(str::to_string),
                })
            })
            .collect();

        Ok(Page {
            items,
            marker: output.marker().map(str::to_string),
        })
    }

    async fn describe_db_snapshots(
        &self,
        query: SnapshotQuery,
    ) -> Result<Page<Snapshot>, SnapshotError> {
        let mut request = self
            .client
            .describe_db_snapshots()
            .snapshot_type(SNAPSHOT_TYPE_MANUAL)
            .set_db_snapshot_identifier(query.snapshot_identifier)
            .set_max_records(query.max_records)
            .set_marker(query.marker);

        if !query.instance_identifiers.is_empty() {
            request = request.filters(instance_filter(query.instance_identifiers));
        }

        let output = request.send().await.map_err(SnapshotError::from_sdk)?;

        debug!(
            region = %self.region,
            count = output.db_snapshots().len(),
            "Described DB snapshots"
        );

        Ok(Page {
            items: output.db_snapshots().iter().map(from_sdk_snapshot).collect(),
            marker: output.marker().map(str::to_string),
        })
    }

    async fn create_db_snapshot(
        &self,
        request: CreateSnapshotRequest,
    ) -> Result<(), SnapshotError> {
        self.client
            .create_db_snapshot()
            .db_snapshot_identifier(request.snapshot_identifier)
            .db_instance_identifier(request.instance_identifier)
            .set_tags(Some(request.tags.into_iter().map(to_sdk_tag).collect()))
            .send()
            .await
            .map_err(SnapshotError::from_sdk)?;

        Ok(())
    }

    async fn copy_db_snapshot(&self, request: CopySnapshotRequest) -> Result<(), SnapshotError> {
        // No SourceRegion or PreSignedUrl: the source ARN identifies the region,
        // and a presigned URL is only required for encrypted copies in GovCloud.
        self.client
            .copy_db_snapshot()
            .source_db_snapshot_identifier(request.source_snapshot_arn)
            .target_db_snapshot_identifier(request.target_snapshot_identifier)
            .kms_key_id(request.kms_key_id)
            .copy_tags(request.copy_tags)
            .set_option_group_name(request.option_group_name)
            .send()
            .await
            .map_err(SnapshotError::from_sdk)?;

        Ok(())
    }

    async fn add_tags_to_resource(
        &self,
        resource_arn: String,
        tags: Vec<Tag>,
    ) -> Result<(), SnapshotError> {
        self.client
            .add_tags_to_resource()
            .resource_name(resource_arn)
            .set_tags(Some(tags.into_iter().map(to_sdk_tag).collect()))
            .send()
            .await
            .map_err(SnapshotError::from_sdk)?;

        Ok(())
    }

    async fn delete_db_snapshot(&self, snapshot_identifier: String) -> Result<(), SnapshotError> {
        self.client
            .delete_db_snapshot()
            .db_snapshot_identifier(snapshot_identifier)
            .send()
            .await
            .map_err(SnapshotError::from_sdk)?;

        Ok(())
    }
}
