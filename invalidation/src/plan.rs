//! Invalidation planning.

use std::collections::BTreeMap;

use prefix_cover::PrefixCoverTree;
use tracing::info;

use crate::collector::{Classification, Status};
use crate::config::SiteConfig;
use crate::keys::IndexDocument;
use crate::PlanError;

/// Options for [`plan`].
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    /// Fold `dir/<index document>` keys into `dir/`.
    pub index_document: Option<IndexDocument>,
}

impl From<&SiteConfig> for PlanOptions {
    fn from(config: &SiteConfig) -> Self {
        Self {
            index_document: config.index_document.clone().map(IndexDocument::new),
        }
    }
}

/// CDN paths to invalidate, in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationPlan {
    paths: Vec<String>,
}

impl InvalidationPlan {
    /// The invalidation paths.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Number of paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if there is nothing to invalidate.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl IntoIterator for InvalidationPlan {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.into_iter()
    }
}

impl<'a> IntoIterator for &'a InvalidationPlan {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}

/// Computes the smallest set of invalidation paths covering every changed key
/// and no unchanged one.
pub fn plan(classification: &Classification, options: &PlanOptions) -> Result<InvalidationPlan, PlanError> {
    let fold = |key: &str| -> String {
        match &options.index_document {
            Some(index) => index.fold(key).to_owned(),
            None => key.to_owned(),
        }
    };

    // Distinct keys can fold onto the same path; changed wins.
    let mut folded: BTreeMap<String, Status> = BTreeMap::new();
    for key in &classification.changed {
        folded.insert(fold(key), Status::Changed);
    }
    for key in &classification.unchanged {
        folded.entry(fold(key)).or_insert(Status::Unchanged);
    }

    // Includes go first so the excludes can only downgrade.
    let mut tree = PrefixCoverTree::new();
    for (path, _) in folded.iter().filter(|(_, s)| **s == Status::Changed) {
        tree.include(path)?;
    }
    for (path, _) in folded.iter().filter(|(_, s)| **s == Status::Unchanged) {
        tree.exclude(path)?;
    }

    let paths: Vec<String> = tree
        .patterns()
        .inspect(|path| info!(%path, "preparing to invalidate"))
        .collect();

    if paths.is_empty() {
        info!("nothing updated, skipping invalidation");
    }

    Ok(InvalidationPlan { paths })
}
