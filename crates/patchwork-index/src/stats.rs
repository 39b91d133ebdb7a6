//! Per-level aggregate counters.

use std::fmt;

/// Grid and cell totals for one refinement level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LevelStat {
    /// Refinement level.
    pub level: u32,
    /// Grids at this level.
    pub grid_count: u64,
    /// Active cells summed over those grids (children not subtracted).
    pub cell_count: u64,
}

/// One [`LevelStat`] per level from 0 to the deepest level present.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LevelStats {
    levels: Vec<LevelStat>,
}

impl LevelStats {
    /// Tally grids and cells from parallel level/dimension arrays.
    pub fn compute(levels: &[u32], dimensions: &[[u32; 3]]) -> Self {
        debug_assert_eq!(levels.len(), dimensions.len());
        let Some(max_level) = levels.iter().copied().max() else {
            return Self::default();
        };
        let mut out: Vec<LevelStat> = (0..=max_level)
            .map(|level| LevelStat {
                level,
                ..Default::default()
            })
            .collect();
        for (&level, dims) in levels.iter().zip(dimensions) {
            let stat = &mut out[level as usize];
            stat.grid_count += 1;
            stat.cell_count += dims.iter().map(|&d| d as u64).product::<u64>();
        }
        Self { levels: out }
    }

    /// Counters for `level`, if it is within range.
    pub fn get(&self, level: u32) -> Option<&LevelStat> {
        self.levels.get(level as usize)
    }

    /// All levels in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = &LevelStat> {
        self.levels.iter()
    }

    /// Number of level rows.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// `true` when no grids were tallied.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Grids across all levels.
    pub fn total_grids(&self) -> u64 {
        self.levels.iter().map(|s| s.grid_count).sum()
    }

    /// Cells across all levels.
    pub fn total_cells(&self) -> u64 {
        self.levels.iter().map(|s| s.cell_count).sum()
    }
}

impl fmt::Display for LevelStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>5} {:>8} {:>14} {:>14}", "level", "# grids", "# cells", "# cells^3")?;
        writeln!(f, "{}", "-".repeat(44))?;
        for stat in self.levels.iter().take_while(|s| s.grid_count > 0) {
            writeln!(
                f,
                "{:>5} {:>8} {:>14} {:>14}",
                stat.level,
                stat.grid_count,
                stat.cell_count,
                (stat.cell_count as f64).cbrt().ceil() as u64
            )?;
        }
        writeln!(f, "{}", "-".repeat(44))?;
        write!(f, "{:>5} {:>8} {:>14}", "", self.total_grids(), self.total_cells())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_coarse_two_fine() {
        let levels = [0, 0, 0, 1, 1];
        let dims = [[8, 8, 8], [8, 8, 8], [8, 8, 8], [4, 4, 4], [4, 4, 4]];
        let stats = LevelStats::compute(&levels, &dims);
        assert_eq!(
            stats.get(0),
            Some(&LevelStat {
                level: 0,
                grid_count: 3,
                cell_count: 1536
            })
        );
        assert_eq!(
            stats.get(1),
            Some(&LevelStat {
                level: 1,
                grid_count: 2,
                cell_count: 128
            })
        );
        assert_eq!(stats.total_cells(), 1664);
        assert!(stats.get(2).is_none());
    }

    #[test]
    fn empty_input_has_no_rows() {
        let stats = LevelStats::compute(&[], &[]);
        assert!(stats.is_empty());
        assert_eq!(stats.total_grids(), 0);
    }

    #[test]
    fn display_has_totals_row() {
        let stats = LevelStats::compute(&[0, 1], &[[4, 4, 4], [2, 2, 2]]);
        let table = stats.to_string();
        assert!(table.lines().next().unwrap().contains("# grids"));
        assert!(table.lines().last().unwrap().contains("72"));
    }
}
