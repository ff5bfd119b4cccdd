//! Normalized bounding region value object

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Axis-aligned bounding region in normalized image coordinates
///
/// All coordinates are in `[0, 1]` relative to the image, so regions from
/// backends running at different input resolutions compare directly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingRegion {
    /// Left edge (0 = image left)
    pub left: f32,
    /// Top edge (0 = image top)
    pub top: f32,
    /// Right edge, exclusive of `left`
    pub right: f32,
    /// Bottom edge, exclusive of `top`
    pub bottom: f32,
}

impl BoundingRegion {
    /// Create a validated region
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Result<Self, DomainError> {
        let in_range = |v: f32| (0.0..=1.0).contains(&v);
        if !(in_range(left) && in_range(top) && in_range(right) && in_range(bottom)) {
            return Err(DomainError::InvalidRegion(format!(
                "coordinates out of [0,1]: ({left}, {top}, {right}, {bottom})"
            )));
        }
        if right <= left || bottom <= top {
            return Err(DomainError::InvalidRegion(format!(
                "degenerate extent: ({left}, {top}, {right}, {bottom})"
            )));
        }
        Ok(Self {
            left,
            top,
            right,
            bottom,
        })
    }

    /// Area of the region (normalized units)
    #[must_use]
    pub fn area(&self) -> f32 {
        (self.right - self.left) * (self.bottom - self.top)
    }

    /// Area of the overlap with another region, zero when disjoint
    #[must_use]
    pub fn intersection_area(&self, other: &Self) -> f32 {
        let w = (self.right.min(other.right) - self.left.max(other.left)).max(0.0);
        let h = (self.bottom.min(other.bottom) - self.top.max(other.top)).max(0.0);
        w * h
    }

    /// Intersection-over-union with another region, in `[0, 1]`
    #[must_use]
    pub fn iou(&self, other: &Self) -> f32 {
        let inter = self.intersection_area(other);
        let union = self.area() + other.area() - inter;
        if union <= f32::EPSILON {
            0.0
        } else {
            inter / union
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(l: f32, t: f32, r: f32, b: f32) -> BoundingRegion {
        BoundingRegion::new(l, t, r, b).unwrap()
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(BoundingRegion::new(-0.1, 0.0, 0.5, 0.5).is_err());
        assert!(BoundingRegion::new(0.0, 0.0, 1.5, 0.5).is_err());
    }

    #[test]
    fn rejects_degenerate() {
        assert!(BoundingRegion::new(0.5, 0.0, 0.5, 0.5).is_err());
        assert!(BoundingRegion::new(0.0, 0.6, 0.5, 0.4).is_err());
    }

    #[test]
    fn iou_of_identical_regions_is_one() {
        let a = region(0.1, 0.1, 0.5, 0.5);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn iou_of_disjoint_regions_is_zero() {
        let a = region(0.0, 0.0, 0.2, 0.2);
        let b = region(0.5, 0.5, 0.9, 0.9);
        assert!(a.iou(&b).abs() < f32::EPSILON);
    }

    #[test]
    fn half_overlap_iou() {
        // Two 0.4x0.4 squares overlapping in a 0.2x0.4 strip.
        let a = region(0.0, 0.0, 0.4, 0.4);
        let b = region(0.2, 0.0, 0.6, 0.4);
        let expected = 0.08 / (0.16 + 0.16 - 0.08);
        assert!((a.iou(&b) - expected).abs() < 1e-5);
    }
}
