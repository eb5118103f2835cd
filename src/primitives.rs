//! Primitive shapes that behave as meshes.
//!
//! Primitives implement the same read contract as [`TriMesh`] through
//! [`MeshSource`], but tessellate on first access instead of storing their
//! arrays up front. Converting to a [`TriMesh`] always yields an owned
//! snapshot with no tie back to the primitive.

use std::cell::OnceCell;

use nalgebra::{Point3, Vector3};

use crate::error::InvalidGeometry;
use crate::mesh::TriMesh;

/// Read access to triangle geometry: vertex positions and face indices.
///
/// The fixed capability set shared by stored meshes and lazily evaluated
/// primitives. Algorithms that only read geometry can take any source.
pub trait MeshSource {
    /// Vertex positions.
    fn vertices(&self) -> &[Point3<f64>];

    /// Faces as vertex index triples, counter-clockwise from outside.
    fn faces(&self) -> &[[u32; 3]];

    /// Materialize an owned [`TriMesh`] from this source.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidGeometry`] if the source produces malformed arrays.
    fn to_mesh(&self) -> Result<TriMesh, InvalidGeometry> {
        TriMesh::new(self.vertices().to_vec(), self.faces().to_vec())
    }
}

impl MeshSource for TriMesh {
    fn vertices(&self) -> &[Point3<f64>] {
        self.vertices()
    }

    fn faces(&self) -> &[[u32; 3]] {
        self.faces()
    }
}

/// An axis-aligned box, tessellated into 12 outward-wound triangles on
/// first access.
///
/// # Example
///
/// ```
/// use mesh_topology::{Cuboid, MeshSource};
///
/// let cube = Cuboid::unit().to_mesh().unwrap();
/// assert!(cube.is_watertight());
/// assert_eq!(cube.euler_number(), 2);
/// assert!((cube.signed_volume() - 1.0).abs() < 1e-10);
/// ```
#[derive(Debug, Clone)]
pub struct Cuboid {
    extents: Vector3<f64>,
    tessellation: OnceCell<(Vec<Point3<f64>>, Vec<[u32; 3]>)>,
}

impl Cuboid {
    /// Create a box spanning the origin to `(x, y, z)`.
    ///
    /// Extents are taken as absolute values.
    #[must_use]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            extents: Vector3::new(x.abs(), y.abs(), z.abs()),
            tessellation: OnceCell::new(),
        }
    }

    /// The unit cube from the origin to `(1, 1, 1)`.
    #[must_use]
    pub fn unit() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }

    /// Edge lengths along each axis.
    #[must_use]
    pub fn extents(&self) -> Vector3<f64> {
        self.extents
    }

    fn tessellation(&self) -> &(Vec<Point3<f64>>, Vec<[u32; 3]>) {
        self.tessellation.get_or_init(|| tessellate_box(self.extents))
    }
}

impl MeshSource for Cuboid {
    fn vertices(&self) -> &[Point3<f64>] {
        &self.tessellation().0
    }

    fn faces(&self) -> &[[u32; 3]] {
        &self.tessellation().1
    }
}

/// Two triangles per side, CCW when viewed from outside.
fn tessellate_box(extents: Vector3<f64>) -> (Vec<Point3<f64>>, Vec<[u32; 3]>) {
    let (x, y, z) = (extents.x, extents.y, extents.z);
    let vertices = vec![
        Point3::new(0.0, 0.0, 0.0), // 0
        Point3::new(x, 0.0, 0.0),   // 1
        Point3::new(x, y, 0.0),     // 2
        Point3::new(0.0, y, 0.0),   // 3
        Point3::new(0.0, 0.0, z),   // 4
        Point3::new(x, 0.0, z),     // 5
        Point3::new(x, y, z),       // 6
        Point3::new(0.0, y, z),     // 7
    ];

    let faces = vec![
        // bottom (z = 0), normal -Z
        [0, 2, 1],
        [0, 3, 2],
        // top (z = max), normal +Z
        [4, 5, 6],
        [4, 6, 7],
        // front (y = 0), normal -Y
        [0, 1, 5],
        [0, 5, 4],
        // back (y = max), normal +Y
        [3, 7, 6],
        [3, 6, 2],
        // left (x = 0), normal -X
        [0, 4, 7],
        [0, 7, 3],
        // right (x = max), normal +X
        [1, 2, 6],
        [1, 6, 5],
    ];

    (vertices, faces)
}
