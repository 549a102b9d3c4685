//! Include/exclude selection of database instances

use tracing::info;

/// Which database instances the automation applies to.
///
/// A non-empty include list wins: only those instances are considered and the
/// exclude list is ignored. Otherwise every instance except the excluded ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseFilter {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl DatabaseFilter {
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self {
            include: normalize(include),
            exclude: normalize(exclude),
        }
    }

    pub fn include(&self) -> &[String] {
        &self.include
    }

    pub fn exclude(&self) -> &[String] {
        &self.exclude
    }

    pub fn has_include_list(&self) -> bool {
        !self.include.is_empty()
    }

    /// Whether snapshots or instances of `instance_id` are in scope
    pub fn allows(&self, instance_id: &str) -> bool {
        if self.has_include_list() {
            self.include.iter().any(|id| id == instance_id)
        } else {
            !self.exclude.iter().any(|id| id == instance_id)
        }
    }

    /// Pick the instances to back up, in input order, each at most once.
    pub fn select<'a, I>(&self, instances: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut selected: Vec<String> = Vec::new();

        for instance_id in instances {
            if self.allows(instance_id) {
                if !selected.iter().any(|id| id == instance_id) {
                    selected.push(instance_id.to_string());
                }
            } else if self.has_include_list() {
                info!("Ignoring database {} as it is not in the include list", instance_id);
            } else {
                info!("Ignoring database {} as it is in the exclude list", instance_id);
            }
        }

        selected
    }
}

/// `[""]` is how an empty list is written in the function configuration.
fn normalize(list: Vec<String>) -> Vec<String> {
    match list.as_slice() {
        [only] if only.is_empty() => Vec::new(),
        _ => list,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_single_empty_string_means_no_list() {
        let filter = DatabaseFilter::new(ids(&[""]), ids(&[""]));
        assert!(!filter.has_include_list());
        assert!(filter.exclude().is_empty());
        assert!(filter.allows("anything"));
    }

    #[test]
    fn test_include_overrides_exclude() {
        let filter = DatabaseFilter::new(ids(&["db-a"]), ids(&["db-a", "db-b"]));
        assert!(filter.allows("db-a"));
        assert!(!filter.allows("db-b"));
        assert!(!filter.allows("db-c"));
    }

    #[test]
    fn test_select_with_include() {
        let filter = DatabaseFilter::new(ids(&["db-a"]), ids(&["db-c"]));
        assert_eq!(filter.select(["db-a", "db-b", "db-c"]), ids(&["db-a"]));
        assert!(filter.select(["db-b", "db-c"]).is_empty());
    }

    #[test]
    fn test_select_with_exclude() {
        let filter = DatabaseFilter::new(vec![], ids(&["db-b"]));
        assert_eq!(
            filter.select(["db-a", "db-b", "db-c"]),
            ids(&["db-a", "db-c"])
        );
    }

    #[test]
    fn test_select_never_duplicates_or_invents() {
        let filter = DatabaseFilter::new(ids(&["db-a", "db-z"]), vec![]);
        let selected = filter.select(["db-a", "db-a", "db-b"]);
        assert_eq!(selected, ids(&["db-a"]));
    }
}
