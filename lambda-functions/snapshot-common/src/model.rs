//! Provider-owned resources as the handlers see them
//!
//! These are read back from RDS on every invocation and never cached.

use chrono::{DateTime, Utc};

/// Snapshot status RDS reports once a snapshot is usable
pub const STATUS_AVAILABLE: &str = "available";

/// Snapshot type used for every listing call
pub const SNAPSHOT_TYPE_MANUAL: &str = "manual";

/// Page size for snapshot and instance listing
pub const PAGE_SIZE: i32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DbInstance {
    pub identifier: String,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub identifier: String,
    pub arn: String,
    pub instance_identifier: String,
    pub status: Option<String>,
    pub original_create_time: Option<DateTime<Utc>>,
    pub tags: Vec<Tag>,
}

impl Snapshot {
    pub fn is_available(&self) -> bool {
        self.status.as_deref() == Some(STATUS_AVAILABLE)
    }

    /// Creation time formatted the way the handlers log it
    pub fn created_display(&self) -> String {
        self.original_create_time
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// One page of a describe call
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub marker: Option<String>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            marker: None,
        }
    }
}

impl<T> Page<T> {
    /// Continuation token for the next request, if there is one.
    /// RDS signals the last page with a missing or empty marker.
    pub fn next_marker(&self) -> Option<&str> {
        self.marker.as_deref().filter(|m| !m.is_empty())
    }
}

/// Parameters of a describe-snapshots request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotQuery {
    /// Exact snapshot identifier, used by the copier
    pub snapshot_identifier: Option<String>,
    /// Server-side `db-instance-id` filter; empty means no filter
    pub instance_identifiers: Vec<String>,
    pub marker: Option<String>,
    pub max_records: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateSnapshotRequest {
    pub snapshot_identifier: String,
    pub instance_identifier: String,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CopySnapshotRequest {
    pub source_snapshot_arn: String,
    pub target_snapshot_identifier: String,
    pub kms_key_id: String,
    pub copy_tags: bool,
    pub option_group_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_marker_end_conditions() {
        let page: Page<Snapshot> = Page {
            items: vec![],
            marker: Some(String::new()),
        };
        assert_eq!(page.next_marker(), None);

        let page: Page<Snapshot> = Page::default();
        assert_eq!(page.next_marker(), None);

        let page: Page<Snapshot> = Page {
            items: vec![],
            marker: Some("A".to_string()),
        };
        assert_eq!(page.next_marker(), Some("A"));
    }

    #[test]
    fn test_snapshot_availability() {
        let mut snapshot = Snapshot {
            identifier: "db-1-20240101000000".to_string(),
            arn: "arn:aws:rds:us-east-1:123456789012:snapshot:db-1-20240101000000".to_string(),
            instance_identifier: "db-1".to_string(),
            status: Some("available".to_string()),
            original_create_time: None,
            tags: vec![],
        };
        assert!(snapshot.is_available());
        assert_eq!(snapshot.created_display(), "unknown");

        snapshot.status = Some("creating".to_string());
        assert!(!snapshot.is_available());

        snapshot.status = None;
        assert!(!snapshot.is_available());
    }
}
