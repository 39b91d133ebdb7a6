//! Geometric selection predicates.

use std::fmt;

use patchwork_core::{Bounds, Vec3};

/// A geometric predicate evaluated against grid boxes and cell centres.
///
/// `intersects` and `contains` are coarse box tests used to skip or
/// fast-path whole grids; `selects` is the per-cell decision and must
/// agree with them: if `contains(b)` then every point of `b` is
/// selected, and if `!intersects(b)` then none is.
pub trait Predicate: fmt::Debug + Send + Sync {
    /// `true` if any part of `bounds` may be selected.
    fn intersects(&self, bounds: &Bounds) -> bool;

    /// `true` if every point of `bounds` is selected.
    ///
    /// The default is conservative and never claims containment.
    fn contains(&self, bounds: &Bounds) -> bool {
        let _ = bounds;
        false
    }

    /// `true` if the cell centred on `point` is selected.
    fn selects(&self, point: &Vec3) -> bool;
}

/// Built-in selection regions.
#[derive(Clone, Debug, PartialEq)]
pub enum Region {
    /// Every cell of the hierarchy.
    All,
    /// Cells whose centre lies in a closed box.
    Box(Bounds),
    /// Cells whose centre lies within `radius` of `center`.
    Sphere {
        /// Sphere centre.
        center: Vec3,
        /// Sphere radius (inclusive).
        radius: f64,
    },
}

impl Predicate for Region {
    fn intersects(&self, bounds: &Bounds) -> bool {
        match self {
            Self::All => true,
            Self::Box(b) => b.intersects(bounds),
            Self::Sphere { center, radius } => {
                let mut d2 = 0.0;
                for a in 0..3 {
                    let nearest = center[a].clamp(bounds.left[a], bounds.right[a]);
                    d2 += (center[a] - nearest).powi(2);
                }
                d2 <= radius * radius
            }
        }
    }

    fn contains(&self, bounds: &Bounds) -> bool {
        match self {
            Self::All => true,
            Self::Box(b) => b.contains(bounds),
            Self::Sphere { .. } => bounds.corners().iter().all(|c| self.selects(c)),
        }
    }

    fn selects(&self, point: &Vec3) -> bool {
        match self {
            Self::All => true,
            Self::Box(b) => b.contains_point(point),
            Self::Sphere { center, radius } => {
                let d2: f64 = (0..3).map(|a| (point[a] - center[a]).powi(2)).sum();
                d2 <= radius * radius
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_box_tests_agree() {
        let s = Region::Sphere {
            center: [0.5; 3],
            radius: 0.25,
        };
        let inner = Bounds::new([0.45; 3], [0.55; 3]);
        let far = Bounds::new([0.9; 3], [1.0; 3]);
        assert!(s.contains(&inner));
        assert!(s.intersects(&inner));
        assert!(!s.intersects(&far));
        assert!(!s.selects(&[0.95; 3]));
    }

    #[test]
    fn sphere_touching_face_intersects() {
        let s = Region::Sphere {
            center: [0.0, 0.5, 0.5],
            radius: 0.5,
        };
        assert!(s.intersects(&Bounds::new([0.5, 0.0, 0.0], [1.0; 3])));
    }

    #[test]
    fn all_contains_everything() {
        assert!(Region::All.contains(&Bounds::new([-1e9; 3], [1e9; 3])));
    }
}
