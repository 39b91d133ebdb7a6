//! Chunk-planning configuration.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// How the io strategy sizes its per-file grid batches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ChunkSizing {
    /// Shrink batches so every worker gets at least one batch per file.
    #[default]
    Auto,
    /// Use [`ChunkConfig::config_file_chunk_size`] verbatim.
    ConfigFile,
    /// One grid per batch: maximum I/O parallelism, minimum memory.
    JustOne,
    /// Always use the raw grid chunk size.
    Old,
}

impl ChunkSizing {
    /// The canonical string form, as accepted by [`FromStr`].
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::ConfigFile => "config_file",
            Self::JustOne => "just_one",
            Self::Old => "old",
        }
    }
}

impl fmt::Display for ChunkSizing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkSizing {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "config_file" => Ok(Self::ConfigFile),
            "just_one" => Ok(Self::JustOne),
            "old" => Ok(Self::Old),
            other => Err(ConfigError::InvalidChunkSizing {
                value: other.to_string(),
            }),
        }
    }
}

/// Configuration for backing-file grouping and io chunk sizing.
///
/// Validated once when the planner is constructed; read-only afterward.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkConfig {
    /// Maximum grids per backing-file record and the base io batch size.
    ///
    /// `None` means effectively unbounded
    /// ([`UNBOUNDED_GRID_CHUNK_SIZE`](Self::UNBOUNDED_GRID_CHUNK_SIZE)).
    pub default_grid_chunk_size: Option<u64>,
    /// Batch sizing mode for the io strategy. Default: `Auto`.
    pub chunk_sizing: ChunkSizing,
    /// Batch size used by [`ChunkSizing::ConfigFile`]. Default: 1000.
    pub config_file_chunk_size: u64,
    /// Number of parallel workers consuming io chunks. Default: 1.
    pub parallel_worker_count: u64,
}

impl ChunkConfig {
    /// Grid chunk size used when none is configured.
    pub const UNBOUNDED_GRID_CHUNK_SIZE: u64 = 2 << 32;

    /// Default batch size for [`ChunkSizing::ConfigFile`].
    pub const DEFAULT_CONFIG_FILE_CHUNK_SIZE: u64 = 1000;

    /// The configured grid chunk size, or the unbounded default.
    pub fn grid_chunk_size(&self) -> u64 {
        self.default_grid_chunk_size
            .unwrap_or(Self::UNBOUNDED_GRID_CHUNK_SIZE)
    }

    /// Check every setting, returning the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_grid_chunk_size == Some(0) {
            return Err(ConfigError::InvalidValue {
                name: "default_grid_chunk_size",
                reason: "must be at least 1".into(),
            });
        }
        if self.config_file_chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                name: "config_file_chunk_size",
                reason: "must be at least 1".into(),
            });
        }
        if self.parallel_worker_count == 0 {
            return Err(ConfigError::InvalidValue {
                name: "parallel_worker_count",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Number of grids per io batch for a file holding `grids_in_file` grids.
    ///
    /// `Auto` computes `max(G / ceil(G * workers / grids_in_file), 1)` with
    /// `G` the grid chunk size. A file with no grids gets batch size 1.
    pub fn batch_size(&self, sizing: ChunkSizing, grids_in_file: usize) -> u64 {
        let base = self.grid_chunk_size();
        match sizing {
            ChunkSizing::Auto => {
                if grids_in_file == 0 {
                    return 1;
                }
                let grids = grids_in_file as u128;
                let wanted = base as u128 * self.parallel_worker_count as u128;
                let factor = wanted.div_ceil(grids).max(1);
                ((base as u128 / factor) as u64).max(1)
            }
            ChunkSizing::ConfigFile => self.config_file_chunk_size,
            ChunkSizing::JustOne => 1,
            ChunkSizing::Old => base,
        }
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            default_grid_chunk_size: None,
            chunk_sizing: ChunkSizing::Auto,
            config_file_chunk_size: Self::DEFAULT_CONFIG_FILE_CHUNK_SIZE,
            parallel_worker_count: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sizing_parses_known_modes() {
        for mode in [
            ChunkSizing::Auto,
            ChunkSizing::ConfigFile,
            ChunkSizing::JustOne,
            ChunkSizing::Old,
        ] {
            assert_eq!(mode.as_str().parse::<ChunkSizing>(), Ok(mode));
        }
    }

    #[test]
    fn unknown_mode_is_config_error() {
        let err = "fastest".parse::<ChunkSizing>().unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidChunkSizing {
                value: "fastest".into()
            }
        );
    }

    #[test]
    fn default_config_is_valid() {
        assert!(ChunkConfig::default().validate().is_ok());
        assert_eq!(
            ChunkConfig::default().grid_chunk_size(),
            ChunkConfig::UNBOUNDED_GRID_CHUNK_SIZE
        );
    }

    #[test]
    fn zero_workers_rejected() {
        let config = ChunkConfig {
            parallel_worker_count: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                name: "parallel_worker_count",
                ..
            })
        ));
    }

    #[test]
    fn auto_matches_ceiling_formula() {
        // G = 10, 2 workers, 7 grids: ceil(20 / 7) = 3, 10 / 3 = 3.
        let config = ChunkConfig {
            default_grid_chunk_size: Some(10),
            parallel_worker_count: 2,
            ..Default::default()
        };
        assert_eq!(config.batch_size(ChunkSizing::Auto, 7), 3);
        // One worker, 10 grids: ceil(10 / 10) = 1, full size.
        let single = ChunkConfig {
            default_grid_chunk_size: Some(10),
            ..Default::default()
        };
        assert_eq!(single.batch_size(ChunkSizing::Auto, 10), 10);
    }

    #[test]
    fn auto_with_unbounded_size_splits_per_worker() {
        let config = ChunkConfig {
            parallel_worker_count: 4,
            ..Default::default()
        };
        // ceil(G * 4 / 8) = G / 2, G / (G / 2) = 2 grids per batch.
        assert_eq!(config.batch_size(ChunkSizing::Auto, 8), 2);
    }

    #[test]
    fn auto_empty_file_falls_back_to_one() {
        assert_eq!(ChunkConfig::default().batch_size(ChunkSizing::Auto, 0), 1);
    }

    #[test]
    fn fixed_modes() {
        let config = ChunkConfig {
            default_grid_chunk_size: Some(16),
            config_file_chunk_size: 5,
            ..Default::default()
        };
        assert_eq!(config.batch_size(ChunkSizing::JustOne, 100), 1);
        assert_eq!(config.batch_size(ChunkSizing::Old, 100), 16);
        assert_eq!(config.batch_size(ChunkSizing::ConfigFile, 100), 5);
    }

    proptest! {
        #[test]
        fn auto_batch_is_within_bounds(
            size in 1u64..10_000,
            workers in 1u64..64,
            grids in 1usize..5_000,
        ) {
            let config = ChunkConfig {
                default_grid_chunk_size: Some(size),
                parallel_worker_count: workers,
                ..Default::default()
            };
            let batch = config.batch_size(ChunkSizing::Auto, grids);
            prop_assert!(batch >= 1);
            prop_assert!(batch <= size);
        }
    }
}
