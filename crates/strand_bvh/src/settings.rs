//! Build configuration, including the compact build-mode string.

use std::str::FromStr;

use thiserror::Error;

use crate::bvh::LeafLayout;

/// Errors from parsing a build-mode string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseSettingsError {
    #[error("unknown build-mode token at byte {offset}: {rest:?}")]
    UnknownToken { offset: usize, rest: String },
}

/// Which split heuristics the builder may use, and how.
///
/// Constructed explicitly and passed to [`build`](crate::build); nothing
/// is read from process-wide state.
#[derive(Clone, Debug, PartialEq)]
pub struct BuildSettings {
    /// Rounds of eager de Casteljau subdivision before building (0..=4).
    pub presubdivision_depth: usize,
    /// Enable axis-aligned object binning.
    pub aligned_object_splits: bool,
    /// Enable axis-aligned spatial splits with primitive duplication.
    pub aligned_spatial_splits: bool,
    /// Enable object binning in each node's oriented frame.
    pub unaligned_object_splits: bool,
    /// Enable two-cluster splits by strand direction.
    pub strand_splits: bool,
    /// Extra references spatial splits may create, as a multiple of the
    /// input count.
    pub replication_factor: f64,
    /// Leaf primitive storage.
    pub leaf_layout: LeafLayout,
}

impl Default for BuildSettings {
    /// The production mix: both object split kinds, strand splits, and
    /// spatial splits, without presubdivision.
    fn default() -> Self {
        Self {
            presubdivision_depth: 0,
            aligned_object_splits: true,
            aligned_spatial_splits: true,
            unaligned_object_splits: true,
            strand_splits: true,
            replication_factor: 0.2,
            leaf_layout: LeafLayout::default(),
        }
    }
}

impl FromStr for BuildSettings {
    type Err = ParseSettingsError;

    /// Parses a build-mode token stream, left to right.
    ///
    /// Tokens: `P0`..`P4` (presubdivision depth), `aO` (aligned object
    /// splits), `uO` (unaligned object splits), `auO` (both), `uST`
    /// (strand splits), `aSP` (aligned spatial splits). Every split kind
    /// starts disabled; unknown tokens are an error.
    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        let mut out = BuildSettings {
            presubdivision_depth: 0,
            aligned_object_splits: false,
            aligned_spatial_splits: false,
            unaligned_object_splits: false,
            strand_splits: false,
            ..BuildSettings::default()
        };

        let mut i = 0;
        while i < mode.len() {
            let rest = &mode[i..];
            if let Some(depth) = rest
                .strip_prefix('P')
                .and_then(|r| r.chars().next())
                .and_then(|c| c.to_digit(10))
                .filter(|&d| d <= 4)
            {
                out.presubdivision_depth = depth as usize;
                i += 2;
            } else if rest.starts_with("aO") {
                out.aligned_object_splits = true;
                i += 2;
            } else if rest.starts_with("uO") {
                out.unaligned_object_splits = true;
                i += 2;
            } else if rest.starts_with("auO") {
                out.aligned_object_splits = true;
                out.unaligned_object_splits = true;
                i += 3;
            } else if rest.starts_with("uST") {
                out.strand_splits = true;
                i += 3;
            } else if rest.starts_with("aSP") {
                out.aligned_spatial_splits = true;
                i += 3;
            } else {
                return Err(ParseSettingsError::UnknownToken {
                    offset: i,
                    rest: rest.to_string(),
                });
            }
        }
        Ok(out)
    }
}
