// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for tree construction.

/// Errors produced when building an octree.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum OctreeError {
    /// The constructor arguments cannot produce a valid tree.
    #[error("invalid octree configuration: {reason}")]
    InvalidConfiguration {
        /// What was wrong with the arguments.
        reason: &'static str,
    },
}

impl OctreeError {
    pub(crate) const fn invalid(reason: &'static str) -> Self {
        Self::InvalidConfiguration { reason }
    }
}
