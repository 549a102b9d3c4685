//! Shared pieces of the RDS snapshot lifecycle functions
//!
//! The creator, copier, tagger and cleaner functions each live in their own
//! crate; this one holds the RDS client seam, the managed-tag predicate, the
//! include/exclude filter, paging and environment parsing they all use.

pub mod config;
pub mod error;
pub mod filter;
pub mod model;
pub mod pages;
pub mod rds;
pub mod response;
pub mod tags;

pub use error::SnapshotError;
pub use filter::DatabaseFilter;
pub use model::{
    CopySnapshotRequest, CreateSnapshotRequest, DbInstance, Page, Snapshot, SnapshotQuery, Tag,
};
pub use pages::{list_all_instances, SnapshotPages};
pub use rds::{RdsClient, RdsOperations};
pub use response::Response;
pub use tags::{has_process_tag, is_managed, owner_instance_id};

#[cfg(any(test, feature = "mocks"))]
pub use rds::MockRdsOperations;
