use std::collections::HashMap;

use bon::Builder;
use serde::Deserialize;
use snapshot_common::config::{
    self, DESTINATION_KMS_KEY_ID, DESTINATION_OPTION_GROUPS, DESTINATION_REGION,
    SNAPSHOT_PROCESS_NAME,
};
use snapshot_common::{
    is_managed, owner_instance_id, CopySnapshotRequest, RdsClient, RdsOperations, Response,
    SnapshotError, SnapshotQuery,
};
use tracing::info;

pub const COMPLETED: &str = "Execution completed";

/// RDS snapshot event delivered by EventBridge
#[derive(Deserialize, Debug, Clone)]
pub struct SnapshotEvent {
    #[serde(default, rename = "detail-type")]
    pub detail_type: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    pub detail: SnapshotEventDetail,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SnapshotEventDetail {
    #[serde(rename = "SourceIdentifier")]
    pub source_identifier: String,
    #[serde(rename = "SourceArn")]
    pub source_arn: String,
    #[serde(default, rename = "EventID")]
    pub event_id: Option<String>,
    #[serde(default, rename = "Message")]
    pub message: Option<String>,
}

#[derive(Builder, Debug, Clone, PartialEq)]
pub struct CopierConfig {
    #[builder(into)]
    pub source_region: String,
    #[builder(into)]
    pub destination_region: String,
    #[builder(into)]
    pub kms_key_id: String,
    #[builder(into)]
    pub process_name: String,
    /// Instance identifier to option group in the destination region
    #[builder(default)]
    pub option_groups: HashMap<String, String>,
}

impl CopierConfig {
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
            kms_key_id: config::required(&lookup, DESTINATION_KMS_KEY_ID)?,
            process_name: config::required(&lookup, SNAPSHOT_PROCESS_NAME)?,
            option_groups: config::json_map(&lookup, DESTINATION_OPTION_GROUPS)?,
        })
    }

    /// Option group override for the instance a snapshot was taken from
    pub fn option_group_for(&self, snapshot_identifier: &str) -> Option<String> {
        self.option_groups
            .get(&owner_instance_id(snapshot_identifier))
            .cloned()
    }
}

pub struct SnapshotCopierService<R> {
    source: R,
    destination: R,
    config: CopierConfig,
}

impl SnapshotCopierService<RdsClient> {
    pub async fn new() -> Result<Self, SnapshotError> {
        let config = CopierConfig::from_env()?;

        Ok(Self {
            source: RdsClient::from_env(&config.source_region).await,
            destination: RdsClient::for_region(&config.destination_region).await,
            config,
        })
    }
}

impl<R: RdsOperations> SnapshotCopierService<R> {
    pub fn with_clients(source: R, destination: R, config: CopierConfig) -> Self {
        Self {
            source,
            destination,
            config,
        }
    }

    /// Whether the snapshot in the source region carries the managed tag
    pub async fn is_managed_snapshot(
        &self,
        snapshot_identifier: &str,
    ) -> Result<bool, SnapshotError> {
        let page = self
            .source
            .describe_db_snapshots(SnapshotQuery {
                snapshot_identifier: Some(snapshot_identifier.to_string()),
                ..Default::default()
            })
            .await?;

        Ok(page
            .items
            .iter()
            .any(|snapshot| is_managed(&snapshot.tags, &self.config.process_name)))
    }

    pub fn copy_request(&self, detail: &SnapshotEventDetail) -> CopySnapshotRequest {
        CopySnapshotRequest {
            source_snapshot_arn: detail.source_arn.clone(),
            target_snapshot_identifier: detail.source_identifier.clone(),
            kms_key_id: self.config.kms_key_id.clone(),
            copy_tags: true,
            option_group_name: self.config.option_group_for(&detail.source_identifier),
        }
    }

    pub async fn handle_event(
        &self,
        event: &SnapshotEvent,
    ) -> Result<Response<String>, SnapshotError> {
        let detail = &event.detail;

        info!(
            detail_type = event.detail_type.as_deref().unwrap_or("unknown"),
            event_region = event.region.as_deref().unwrap_or("unknown"),
            event_id = detail.event_id.as_deref().unwrap_or("unknown"),
            message = detail.message.as_deref().unwrap_or(""),
            snapshot = %detail.source_identifier,
            "Received snapshot event"
        );

        if !self.is_managed_snapshot(&detail.source_identifier).await? {
            info!(
                "Skipping cross region snapshot copy for {} as it is not managed with the automation process",
                detail.source_identifier
            );
            return Ok(Response::ok(COMPLETED.to_string()));
        }

        info!(
            "Copying Snapshot {} from region {} to {}",
            detail.source_identifier, self.config.source_region, self.config.destination_region
        );

        let request = self.copy_request(detail);
        if let Some(option_group) = &request.option_group_name {
            info!(
                snapshot = %detail.source_identifier,
                option_group = %option_group,
                "Using destination option group override"
            );
        }

        self.destination.copy_db_snapshot(request).await?;

        Ok(Response::ok(COMPLETED.to_string()))
    }
}
