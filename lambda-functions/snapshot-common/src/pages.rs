//! Marker-driven paging over describe calls
//!
//! A page is handed to the caller before the next one is requested, so the
//! handlers mutate page N before listing page N+1.

use crate::error::SnapshotError;
use crate::filter::DatabaseFilter;
use crate::model::{DbInstance, Snapshot, SnapshotQuery, PAGE_SIZE};
use crate::rds::RdsOperations;

enum Cursor {
    Start,
    Next(String),
    Done,
}

/// Pager over manual snapshots, narrowed server-side by the include list
pub struct SnapshotPages<'a, R: RdsOperations + ?Sized> {
    rds: &'a R,
    instance_identifiers: Vec<String>,
    cursor: Cursor,
}

impl<'a, R: RdsOperations + ?Sized> SnapshotPages<'a, R> {
    pub fn new(rds: &'a R, filter: &DatabaseFilter) -> Self {
        Self {
            rds,
            instance_identifiers: filter.include().to_vec(),
            cursor: Cursor::Start,
        }
    }

    /// Next page, or `None` once RDS stopped returning a marker.
    /// Empty pages are returned as empty vectors, not as the end.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Snapshot>>, SnapshotError> {
        let marker = match std::mem::replace(&mut self.cursor, Cursor::Done) {
            Cursor::Done => return Ok(None),
            Cursor::Start => None,
            Cursor::Next(marker) => Some(marker),
        };

        let page = self
            .rds
            .describe_db_snapshots(SnapshotQuery {
                snapshot_identifier: None,
                instance_identifiers: self.instance_identifiers.clone(),
                marker,
                max_records: Some(PAGE_SIZE),
            })
            .await?;

        if let Some(next) = page.next_marker() {
            self.cursor = Cursor::Next(next.to_string());
        }

        Ok(Some(page.items))
    }
}

/// Every DB instance in the region, across all pages
pub async fn list_all_instances<R>(rds: &R) -> Result<Vec<DbInstance>, SnapshotError>
where
    R: RdsOperations + ?Sized,
{
    let mut instances = Vec::new();
    let mut marker = None;

    loop {
        let page = rds.describe_db_instances(marker).await?;
        let next = page.next_marker().map(str::to_string);
        instances.extend(page.items);

        match next {
            Some(m) => marker = Some(m),
            None => break,
        }
    }

    Ok(instances)
}
