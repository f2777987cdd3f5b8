//! # cdn-invalidation
//!
//! Turns the outcome of a static-site sync into the list of CDN paths to
//! invalidate.
//!
//! Upload workers report every key they touched to a [`Collector`] as either
//! changed or unchanged. Once the sync is done the collector's
//! [`Classification`] is handed to [`plan`], which folds index documents into
//! their directory path and runs the keys through a
//! [`PrefixCoverTree`](prefix_cover::PrefixCoverTree) to get the smallest set
//! of exact and wildcard paths.
//!
//! ## Example
//!
//! ```rust
//! use cdn_invalidation::{plan, Collector, IndexDocument, PlanOptions};
//!
//! let collector = Collector::new();
//! collector.changed("blog/index.html");
//! collector.changed("blog/post-1.html");
//! collector.unchanged("about/index.html");
//!
//! let options = PlanOptions {
//!     index_document: Some(IndexDocument::new("index.html")),
//! };
//! let plan = plan(&collector.into_classification(), &options).unwrap();
//! assert_eq!(plan.paths(), ["/blog/*"]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collector;
pub mod config;
pub mod keys;
pub mod plan;

pub use collector::{Classification, Collector, Status};
pub use config::SiteConfig;
pub use keys::{key_name_from_path, IndexDocument};
pub use plan::{plan, InvalidationPlan, PlanOptions};
pub use prefix_cover::invalidation_path;

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading configuration or planning.
#[derive(Error, Debug)]
pub enum PlanError {
    /// A key was classified both ways after folding.
    #[error("conflicting classification: {0}")]
    Cover(#[from] prefix_cover::Error),

    /// Failed to read a file.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a config file.
    #[error("invalid config {}: {source}", .path.display())]
    Config {
        /// Config file that failed to parse.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_yaml::Error,
    },

    /// No config file in the given directory.
    #[error("unable to find .s3_website.yaml in {}", .dir.display())]
    ConfigNotFound {
        /// Directory that was searched.
        dir: PathBuf,
    },
}
