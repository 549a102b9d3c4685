//! Environment-variable parsing shared by the four functions
//!
//! Every helper takes a lookup closure instead of reading the process
//! environment directly, so configs can be built from a map in tests.

use std::collections::HashMap;
use std::str::FromStr;

use crate::error::SnapshotError;
use crate::filter::DatabaseFilter;

pub const DESTINATION_REGION: &str = "destinationRegion";
pub const DESTINATION_KMS_KEY_ID: &str = "destinationKmsKeyId";
pub const DESTINATION_OPTION_GROUPS: &str = "destinationOptionGroups";
pub const SNAPSHOT_PROCESS_NAME: &str = "snapshotProcessName";
pub const RETENTION_IN_DAYS: &str = "retentionInDays";
pub const INCLUDE_DATABASES: &str = "includeDatabases";
pub const EXCLUDE_DATABASES: &str = "excludeDatabases";
pub const RETRY_COUNT: &str = "retryCount";
pub const SECONDS_BETWEEN_RETRIES: &str = "secondsBetweenRetries";
pub const AWS_REGION: &str = "AWS_REGION";

/// Lookup backed by the process environment
pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

pub fn required<F>(lookup: &F, key: &'static str) -> Result<String, SnapshotError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).ok_or(SnapshotError::MissingConfig(key))
}

pub fn required_number<F, T>(lookup: &F, key: &'static str) -> Result<T, SnapshotError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = required(lookup, key)?;
    raw.trim()
        .parse()
        .map_err(|e: T::Err| SnapshotError::InvalidConfig {
            key,
            reason: e.to_string(),
        })
}

pub fn json_list<F>(lookup: &F, key: &'static str) -> Result<Vec<String>, SnapshotError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = required(lookup, key)?;
    serde_json::from_str(&raw).map_err(|e| SnapshotError::InvalidConfig {
        key,
        reason: e.to_string(),
    })
}

pub fn json_map<F>(lookup: &F, key: &'static str) -> Result<HashMap<String, String>, SnapshotError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = required(lookup, key)?;
    serde_json::from_str(&raw).map_err(|e| SnapshotError::InvalidConfig {
        key,
        reason: e.to_string(),
    })
}

/// `includeDatabases` and `excludeDatabases` as a filter
pub fn database_filter<F>(lookup: &F) -> Result<DatabaseFilter, SnapshotError>
where
    F: Fn(&str) -> Option<String>,
{
    Ok(DatabaseFilter::new(
        json_list(lookup, INCLUDE_DATABASES)?,
        json_list(lookup, EXCLUDE_DATABASES)?,
    ))
}

/// Region the function runs in, as set by the Lambda runtime
pub fn primary_region<F>(lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(AWS_REGION).unwrap_or_else(|| "us-east-1".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_required_missing() {
        let lookup = lookup_from(&[]);
        let err = required(&lookup, SNAPSHOT_PROCESS_NAME).unwrap_err();
        assert!(matches!(err, SnapshotError::MissingConfig("snapshotProcessName")));
    }

    #[test]
    fn test_required_number() {
        let lookup = lookup_from(&[("retryCount", " 3 "), ("retentionInDays", "seven")]);
        let retries: u32 = required_number(&lookup, RETRY_COUNT).unwrap();
        assert_eq!(retries, 3);

        let err = required_number::<_, i64>(&lookup, RETENTION_IN_DAYS).unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::InvalidConfig { key: "retentionInDays", .. }
        ));
    }

    #[test]
    fn test_database_filter_from_env() {
        let lookup = lookup_from(&[
            ("includeDatabases", r#"[""]"#),
            ("excludeDatabases", r#"["db-b", "db-c"]"#),
        ]);
        let filter = database_filter(&lookup).unwrap();
        assert!(!filter.has_include_list());
        assert_eq!(filter.exclude(), ["db-b".to_string(), "db-c".to_string()]);
    }

    #[test]
    fn test_json_list_rejects_non_array() {
        let lookup = lookup_from(&[("includeDatabases", r#"{"db": 1}"#)]);
        assert!(json_list(&lookup, INCLUDE_DATABASES).is_err());
    }

    #[test]
    fn test_json_map() {
        let lookup = lookup_from(&[("destinationOptionGroups", r#"{"orders-db": "og-dr"}"#)]);
        let groups = json_map(&lookup, DESTINATION_OPTION_GROUPS).unwrap();
        assert_eq!(groups.get("orders-db").map(String::as_str), Some("og-dr"));
    }

    #[test]
    fn test_primary_region_default() {
        assert_eq!(primary_region(&lookup_from(&[])), "us-east-1");
        assert_eq!(
            primary_region(&lookup_from(&[("AWS_REGION", "eu-west-1")])),
            "eu-west-1"
        );
    }
}
