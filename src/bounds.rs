//! Axis-aligned bounding box.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box in 3D space.
///
/// An empty box has `min > max` componentwise and contains no points.
///
/// # Example
///
/// ```
/// use mesh_topology::{Aabb, Point3};
///
/// let aabb = Aabb::from_points([
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(2.0, 4.0, 6.0),
/// ]);
///
/// assert!((aabb.extent().y - 4.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Aabb {
    /// Minimum corner.
    pub min: Point3<f64>,
    /// Maximum corner.
    pub max: Point3<f64>,
}

impl Aabb {
    /// Create an empty bounding box.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Compute the bounding box of a set of points.
    ///
    /// Returns an empty box if the iterator yields no points.
    #[must_use]
    pub fn from_points<'a, I>(points: I) -> Self
    where
        I: IntoIterator,
        I::Item: std::borrow::Borrow<Point3<f64>>,
    {
        let mut aabb = Self::empty();
        for p in points {
            aabb.grow(*std::borrow::Borrow::borrow(&p));
        }
        aabb
    }

    /// Expand the box to contain a point.
    pub fn grow(&mut self, p: Point3<f64>) {
        self.min = Point3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z));
        self.max = Point3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z));
    }

    /// Check whether the box contains no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Center of the box.
    #[must_use]
    pub fn center(&self) -> Point3<f64> {
        self.min + (self.max - self.min) * 0.5
    }

    /// Size of the box along each axis. Zero for an empty box.
    #[must_use]
    pub fn extent(&self) -> Vector3<f64> {
        if self.is_empty() {
            Vector3::zeros()
        } else {
            self.max - self.min
        }
    }

    /// Length of the box diagonal. Zero for an empty box.
    #[must_use]
    pub fn diagonal(&self) -> f64 {
        self.extent().norm()
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}
