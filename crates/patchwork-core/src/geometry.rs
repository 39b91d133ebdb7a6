//! Axis-aligned box geometry and the root domain lattice.
//!
//! All coordinates are in code-length units. Boxes are closed: a point
//! lying exactly on a face is inside the box, which is what makes the
//! point-location tie-break between adjacent grids observable.

/// A point or extent in three dimensions.
pub type Vec3 = [f64; 3];

/// An axis-aligned box spanned by a left (minimum) and right (maximum) edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    /// Minimum corner.
    pub left: Vec3,
    /// Maximum corner.
    pub right: Vec3,
}

impl Bounds {
    /// Create a box from its two corners.
    pub fn new(left: Vec3, right: Vec3) -> Self {
        Self { left, right }
    }

    /// The unit cube `[0, 1]^3`.
    pub fn unit() -> Self {
        Self::new([0.0; 3], [1.0; 3])
    }

    /// Extent along each axis.
    pub fn width(&self) -> Vec3 {
        [
            self.right[0] - self.left[0],
            self.right[1] - self.left[1],
            self.right[2] - self.left[2],
        ]
    }

    /// Geometric centre of the box.
    pub fn center(&self) -> Vec3 {
        [
            0.5 * (self.left[0] + self.right[0]),
            0.5 * (self.left[1] + self.right[1]),
            0.5 * (self.left[2] + self.right[2]),
        ]
    }

    /// `true` if `left <= right` on every axis.
    pub fn is_ordered(&self) -> bool {
        (0..3).all(|a| self.left[a] <= self.right[a])
    }

    /// Closed containment test: faces belong to the box.
    pub fn contains_point(&self, p: &Vec3) -> bool {
        (0..3).all(|a| self.left[a] <= p[a] && p[a] <= self.right[a])
    }

    /// `true` if `other` lies entirely within `self`.
    pub fn contains(&self, other: &Bounds) -> bool {
        (0..3).all(|a| self.left[a] <= other.left[a] && other.right[a] <= self.right[a])
    }

    /// `true` if `other` lies within `self` after growing `self` by `tol`
    /// on every face.
    pub fn contains_within(&self, other: &Bounds, tol: &Vec3) -> bool {
        (0..3).all(|a| {
            self.left[a] - tol[a] <= other.left[a] && other.right[a] <= self.right[a] + tol[a]
        })
    }

    /// `true` if the two boxes share any volume or face.
    pub fn intersects(&self, other: &Bounds) -> bool {
        (0..3).all(|a| self.left[a] <= other.right[a] && other.left[a] <= self.right[a])
    }

    /// The eight corners of the box, x varying fastest on the bottom face.
    pub fn corners(&self) -> [Vec3; 8] {
        let (l, r) = (self.left, self.right);
        [
            [l[0], l[1], l[2]],
            [r[0], l[1], l[2]],
            [r[0], r[1], l[2]],
            [l[0], r[1], l[2]],
            [l[0], l[1], r[2]],
            [r[0], l[1], r[2]],
            [r[0], r[1], r[2]],
            [l[0], r[1], r[2]],
        ]
    }
}

/// The root-level lattice every grid is aligned to.
///
/// Level `n` cells are `refine_by^n` times narrower than the root cells
/// spanning `[left, right]` with `dimensions` cells per axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Domain {
    /// Left edge of the simulation domain.
    pub left: Vec3,
    /// Right edge of the simulation domain.
    pub right: Vec3,
    /// Root-level cells per axis.
    pub dimensions: [u32; 3],
    /// Refinement factor between consecutive levels.
    pub refine_by: u32,
}

impl Domain {
    /// Default refinement factor between levels.
    pub const DEFAULT_REFINE_BY: u32 = 2;

    /// Create a domain with the default refinement factor of 2.
    pub fn new(left: Vec3, right: Vec3, dimensions: [u32; 3]) -> Self {
        Self {
            left,
            right,
            dimensions,
            refine_by: Self::DEFAULT_REFINE_BY,
        }
    }

    /// The domain box.
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.left, self.right)
    }

    /// Cell width along each axis at `level`.
    pub fn cell_width(&self, level: u32) -> Vec3 {
        let factor = (self.refine_by as f64).powi(level as i32);
        [
            (self.right[0] - self.left[0]) / (self.dimensions[0] as f64 * factor),
            (self.right[1] - self.left[1]) / (self.dimensions[1] as f64 * factor),
            (self.right[2] - self.left[2]) / (self.dimensions[2] as f64 * factor),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faces_are_inside() {
        let b = Bounds::unit();
        assert!(b.contains_point(&[1.0, 0.5, 0.0]));
        assert!(!b.contains_point(&[1.0 + 1e-12, 0.5, 0.5]));
    }

    #[test]
    fn touching_boxes_intersect() {
        let a = Bounds::new([0.0; 3], [0.5, 1.0, 1.0]);
        let b = Bounds::new([0.5, 0.0, 0.0], [1.0; 3]);
        assert!(a.intersects(&b));
        let c = Bounds::new([0.6, 0.0, 0.0], [1.0; 3]);
        assert!(!a.intersects(&c));
    }

    #[test]
    fn corners_cover_both_edges() {
        let b = Bounds::new([0.0, 1.0, 2.0], [3.0, 4.0, 5.0]);
        let corners = b.corners();
        assert_eq!(corners[0], b.left);
        assert_eq!(corners[6], b.right);
    }

    #[test]
    fn cell_width_halves_per_level() {
        let d = Domain::new([0.0; 3], [1.0; 3], [16, 16, 16]);
        assert_eq!(d.cell_width(0), [1.0 / 16.0; 3]);
        assert_eq!(d.cell_width(2), [1.0 / 64.0; 3]);
    }
}
