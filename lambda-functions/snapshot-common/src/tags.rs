//! The "managed" tag
//!
//! A snapshot belongs to this automation only when it carries
//! `SnapshotProcessName=<configured name>`. Nothing else may be copied or
//! deleted.

use crate::model::Tag;

pub const PROCESS_NAME_TAG: &str = "SnapshotProcessName";
pub const START_TIME_TAG: &str = "SnapshotStartTime";

/// True iff `tags` contains `SnapshotProcessName` with exactly `process_name`.
pub fn is_managed(tags: &[Tag], process_name: &str) -> bool {
    tags.iter()
        .any(|tag| tag.key == PROCESS_NAME_TAG && tag.value == process_name)
}

/// True if any `SnapshotProcessName` tag is present, whatever its value.
pub fn has_process_tag(tags: &[Tag]) -> bool {
    tags.iter().any(|tag| tag.key == PROCESS_NAME_TAG)
}

pub fn process_tag(process_name: &str) -> Tag {
    Tag::new(PROCESS_NAME_TAG, process_name)
}

/// Tags attached to every snapshot the creator starts
pub fn creation_tags(timestamp: &str, process_name: &str) -> Vec<Tag> {
    vec![
        Tag::new(START_TIME_TAG, timestamp),
        process_tag(process_name),
    ]
}

/// Instance identifier a snapshot identifier was minted from.
///
/// Snapshot identifiers are `<instance>-<suffix>`; everything before the last
/// `-` is the instance. An identifier without `-` yields an empty string.
pub fn owner_instance_id(snapshot_identifier: &str) -> String {
    snapshot_identifier
        .rsplit_once('-')
        .map(|(instance, _)| instance.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_managed_matching_value() {
        let tags = vec![Tag::new("SnapshotProcessName", "X")];
        assert!(is_managed(&tags, "X"));
    }

    #[test]
    fn test_is_managed_other_value() {
        let tags = vec![Tag::new("SnapshotProcessName", "Y")];
        assert!(!is_managed(&tags, "X"));
        assert!(has_process_tag(&tags));
    }

    #[test]
    fn test_is_managed_missing_tag() {
        let tags = vec![Tag::new("Owner", "X")];
        assert!(!is_managed(&tags, "X"));
        assert!(!has_process_tag(&tags));
        assert!(!is_managed(&[], "X"));
    }

    #[test]
    fn test_creation_tags() {
        let tags = creation_tags("20240101120000", "nightly");
        assert_eq!(
            tags,
            vec![
                Tag::new("SnapshotStartTime", "20240101120000"),
                Tag::new("SnapshotProcessName", "nightly"),
            ]
        );
        assert!(is_managed(&tags, "nightly"));
    }

    #[test]
    fn test_owner_instance_id() {
        assert_eq!(owner_instance_id("orders-db-20240101120000"), "orders-db");
        assert_eq!(owner_instance_id("db-1"), "db");
        assert_eq!(owner_instance_id("standalone"), "");
    }
}
