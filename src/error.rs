use thiserror::Error;

/// Errors returned by [`PrefixCoverTree`](crate::PrefixCoverTree) insertions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The key is already excluded and cannot be marked included again.
    #[error("cannot include {key:?}: key is already excluded")]
    InvalidTransition {
        /// Full key of the node whose value would have been upgraded.
        key: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
