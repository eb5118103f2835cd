//! Indexed triangle mesh with cached topological invariants.

use std::cell::{Cell, RefCell};
use std::hash::Hasher;
use std::rc::Rc;

use ahash::AHasher;
use nalgebra::{Point3, Vector3};
use tracing::trace;

use crate::adjacency::MeshAdjacency;
use crate::bounds::Aabb;
use crate::cache::InvariantCache;
use crate::error::InvalidGeometry;
use crate::topology::{self, SubMesh, TopologyReport};
use crate::triangle::Triangle;

/// An indexed triangle mesh and the single source of truth for its geometry.
///
/// Stores vertex positions and triangular faces separately, with faces
/// referencing vertices by index. Faces use counter-clockwise winding when
/// viewed from outside, so normals point outward by the right-hand rule.
///
/// All mutation goes through the provided entry points ([`TriMesh::replace`],
/// [`TriMesh::replace_faces`], [`TriMesh::set_vertex`], the repair methods),
/// which validate their input and bump a generation counter. Derived
/// quantities (adjacency, topology results, mass properties) are memoized
/// against a content fingerprint and recomputed after any mutation; a stale
/// value can never be observed.
///
/// # Example
///
/// ```
/// use mesh_topology::{Point3, TriMesh};
///
/// let mesh = TriMesh::new(
///     vec![
///         Point3::new(0.0, 0.0, 0.0),
///         Point3::new(1.0, 0.0, 0.0),
///         Point3::new(0.0, 1.0, 0.0),
///     ],
///     vec![[0, 1, 2]],
/// )
/// .unwrap();
///
/// // A lone triangle has three boundary edges.
/// assert!(!mesh.is_watertight());
/// assert_eq!(mesh.euler_number(), 1);
/// assert_eq!(mesh.connected_components().len(), 1);
/// ```
pub struct TriMesh {
    vertices: Vec<Point3<f64>>,
    faces: Vec<[u32; 3]>,
    generation: u64,
    fingerprint: Cell<Option<u64>>,
    cache: RefCell<InvariantCache>,
}

impl TriMesh {
    /// Create a mesh from vertex positions and face index triples.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidGeometry`] if any face index is out of range or any
    /// coordinate is non-finite.
    pub fn new(vertices: Vec<Point3<f64>>, faces: Vec<[u32; 3]>) -> Result<Self, InvalidGeometry> {
        validate(&vertices, &faces)?;
        Ok(Self {
            vertices,
            faces,
            generation: 0,
            fingerprint: Cell::new(None),
            cache: RefCell::new(InvariantCache::new()),
        })
    }

    /// Create a mesh from flat coordinate and index buffers, as handed over
    /// by file loaders.
    ///
    /// `positions` is `[x0, y0, z0, x1, y1, z1, ...]`; `indices` is
    /// `[a0, b0, c0, a1, b1, c1, ...]`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidGeometry`] if either buffer is not a multiple of
    /// three, or the resulting arrays fail validation.
    pub fn from_raw(positions: &[f64], indices: &[u32]) -> Result<Self, InvalidGeometry> {
        if positions.len() % 3 != 0 {
            return Err(InvalidGeometry::RaggedPositions {
                len: positions.len(),
            });
        }
        if indices.len() % 3 != 0 {
            return Err(InvalidGeometry::RaggedIndices { len: indices.len() });
        }

        let vertices = positions
            .chunks_exact(3)
            .map(|c| Point3::new(c[0], c[1], c[2]))
            .collect();
        let faces = indices.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();

        Self::new(vertices, faces)
    }

    /// Read-only view of the vertex positions.
    #[inline]
    #[must_use]
    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    /// Read-only view of the face index triples.
    #[inline]
    #[must_use]
    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    /// Number of vertices.
    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of faces.
    #[inline]
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh has no renderable surface.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Get a face's triangle with resolved vertex positions.
    ///
    /// Returns `None` if the face index is out of bounds.
    #[must_use]
    pub fn triangle(&self, face: usize) -> Option<Triangle> {
        self.faces.get(face).map(|&[a, b, c]| {
            Triangle::new(
                self.vertices[a as usize],
                self.vertices[b as usize],
                self.vertices[c as usize],
            )
        })
    }

    /// Iterate over all faces as triangles with resolved positions.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.faces.iter().map(|&[a, b, c]| {
            Triangle::new(
                self.vertices[a as usize],
                self.vertices[b as usize],
                self.vertices[c as usize],
            )
        })
    }

    /// Clone the raw arrays as unstructured triangle soup.
    ///
    /// Intended for hull and boolean backends that carry no adjacency
    /// expectations. The copy has no tie to this mesh.
    #[must_use]
    pub fn to_soup(&self) -> (Vec<Point3<f64>>, Vec<[u32; 3]>) {
        (self.vertices.clone(), self.faces.clone())
    }

    // ---------------------------------------------------------------------
    // Mutation entry points
    // ---------------------------------------------------------------------

    /// Replace both arrays atomically.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidGeometry`] if the new arrays fail validation; the
    /// mesh is left untouched in that case.
    pub fn replace(
        &mut self,
        vertices: Vec<Point3<f64>>,
        faces: Vec<[u32; 3]>,
    ) -> Result<(), InvalidGeometry> {
        validate(&vertices, &faces)?;
        self.vertices = vertices;
        self.faces = faces;
        self.invalidate();
        Ok(())
    }

    /// Replace the face array, keeping the vertices.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidGeometry`] if a new face references a missing vertex.
    pub fn replace_faces(&mut self, faces: Vec<[u32; 3]>) -> Result<(), InvalidGeometry> {
        validate(&self.vertices, &faces)?;
        self.faces = faces;
        self.invalidate();
        Ok(())
    }

    /// Move a single vertex.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidGeometry`] if `index` is out of range or `position`
    /// has a non-finite coordinate.
    pub fn set_vertex(&mut self, index: usize, position: Point3<f64>) -> Result<(), InvalidGeometry> {
        if index >= self.vertices.len() {
            return Err(InvalidGeometry::VertexIndexOutOfRange {
                index,
                vertex_count: self.vertices.len(),
            });
        }
        if !position.coords.iter().all(|c| c.is_finite()) {
            return Err(InvalidGeometry::NonFiniteCoordinate { index });
        }
        self.vertices[index] = position;
        self.invalidate();
        Ok(())
    }

    /// Commit a face array known to be index-valid (repair output).
    pub(crate) fn commit_faces(&mut self, faces: Vec<[u32; 3]>) {
        debug_assert!(validate(&self.vertices, &faces).is_ok());
        self.faces = faces;
        self.invalidate();
    }

    /// Commit both arrays known to be valid (vertex merge output).
    pub(crate) fn commit_arrays(&mut self, vertices: Vec<Point3<f64>>, faces: Vec<[u32; 3]>) {
        debug_assert!(validate(&vertices, &faces).is_ok());
        self.vertices = vertices;
        self.faces = faces;
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.generation += 1;
        self.fingerprint.set(None);
        trace!(generation = self.generation, "geometry mutated");
    }

    // ---------------------------------------------------------------------
    // Fingerprint
    // ---------------------------------------------------------------------

    /// Mutation counter; bumped by every committed write.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Content hash over the current vertex and face arrays.
    ///
    /// Computed lazily after a mutation and stable across reads. Two meshes
    /// with identical arrays produce the same fingerprint within a process.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        if let Some(fp) = self.fingerprint.get() {
            return fp;
        }

        let mut hasher = AHasher::default();
        hasher.write_usize(self.vertices.len());
        for p in &self.vertices {
            hasher.write_u64(p.x.to_bits());
            hasher.write_u64(p.y.to_bits());
            hasher.write_u64(p.z.to_bits());
        }
        hasher.write_usize(self.faces.len());
        for &[a, b, c] in &self.faces {
            hasher.write_u32(a);
            hasher.write_u32(b);
            hasher.write_u32(c);
        }

        let fp = hasher.finish();
        self.fingerprint.set(Some(fp));
        fp
    }

    /// Memoize a derived value against the current fingerprint.
    ///
    /// Producers must not call back into cached queries; compute
    /// prerequisites (e.g. [`TriMesh::adjacency`]) before entering.
    fn cached<T, F>(&self, key: &'static str, produce: F) -> T
    where
        T: Clone + 'static,
        F: FnOnce() -> T,
    {
        let fingerprint = self.fingerprint();
        self.cache
            .borrow_mut()
            .get_or_compute(fingerprint, key, produce)
    }

    // ---------------------------------------------------------------------
    // Topology queries
    // ---------------------------------------------------------------------

    /// Edge and face adjacency for the current geometry.
    #[must_use]
    pub fn adjacency(&self) -> Rc<MeshAdjacency> {
        self.cached("adjacency", || Rc::new(MeshAdjacency::build(&self.faces)))
    }

    /// True iff every edge is shared by exactly two faces with opposite
    /// winding: no holes, no non-manifold edges.
    ///
    /// A watertight mesh has well-defined enclosed volume per component.
    #[must_use]
    pub fn is_watertight(&self) -> bool {
        self.adjacency().is_watertight()
    }

    /// `V - E + F` over the full mesh.
    ///
    /// A cheap genus/defect signal: 2 per closed sphere-like component,
    /// 0 for a torus. Only a meaningful invariant when watertight.
    #[must_use]
    pub fn euler_number(&self) -> i64 {
        let adj = self.adjacency();
        topology::euler_number(self.vertices.len(), adj.edge_count(), self.faces.len())
    }

    /// Split the face graph into connected components.
    ///
    /// Components are ordered by their lowest original face index. Each
    /// [`SubMesh`] is an owned snapshot carrying only the vertices its faces
    /// reference, plus the mapping back to this mesh's vertex indices.
    #[must_use]
    pub fn connected_components(&self) -> Rc<Vec<SubMesh>> {
        let adj = self.adjacency();
        self.cached("components", || {
            Rc::new(topology::connected_components(
                &self.vertices,
                &self.faces,
                &adj,
            ))
        })
    }

    /// Edges whose two faces traverse them in the same direction, sorted.
    ///
    /// An orientation-consistent mesh has none. These are exactly the edges
    /// [`TriMesh::repair`] tries to eliminate by flipping faces.
    #[must_use]
    pub fn inconsistent_edges(&self) -> Rc<Vec<(u32, u32)>> {
        let adj = self.adjacency();
        self.cached("inconsistent-edges", || {
            Rc::new(topology::inconsistent_edges(&adj))
        })
    }

    /// Full topology report: counts, flags, Euler number, components.
    #[must_use]
    pub fn analyze(&self) -> Rc<TopologyReport> {
        let adj = self.adjacency();
        self.cached("report", || {
            Rc::new(topology::analyze(&self.vertices, &self.faces, &adj))
        })
    }

    // ---------------------------------------------------------------------
    // Mass properties
    // ---------------------------------------------------------------------

    /// Total surface area.
    #[must_use]
    pub fn surface_area(&self) -> f64 {
        self.cached("surface-area", || {
            self.triangles().map(|t| t.area()).sum()
        })
    }

    /// Signed enclosed volume via the divergence theorem.
    ///
    /// Positive for outward-consistent winding, negative for an inside-out
    /// mesh. Meaningless unless [`TriMesh::is_watertight`] holds.
    #[must_use]
    pub fn signed_volume(&self) -> f64 {
        self.cached("signed-volume", || {
            topology::signed_volume_sum(&self.vertices, self.faces.iter().copied())
        })
    }

    /// Absolute enclosed volume.
    #[must_use]
    pub fn volume(&self) -> f64 {
        self.signed_volume().abs()
    }

    /// Unit face normals, one per face, in face order.
    ///
    /// Degenerate faces get a zero vector.
    #[must_use]
    pub fn face_normals(&self) -> Rc<Vec<Vector3<f64>>> {
        self.cached("face-normals", || {
            Rc::new(
                self.triangles()
                    .map(|t| t.normal().unwrap_or_else(Vector3::zeros))
                    .collect(),
            )
        })
    }

    /// Area-weighted surface centroid.
    ///
    /// Falls back to the origin for meshes with no surface area.
    #[must_use]
    pub fn centroid(&self) -> Point3<f64> {
        self.cached("centroid", || {
            let mut weighted = Vector3::zeros();
            let mut total_area = 0.0;
            for t in self.triangles() {
                let area = t.area();
                weighted += t.centroid().coords * area;
                total_area += area;
            }
            if total_area > 0.0 {
                Point3::from(weighted / total_area)
            } else {
                Point3::origin()
            }
        })
    }

    /// Axis-aligned bounding box over all vertices.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        self.cached("bounds", || Aabb::from_points(&self.vertices))
    }
}

impl Clone for TriMesh {
    /// Clones carry the arrays but start with an empty cache and a fresh
    /// generation counter.
    fn clone(&self) -> Self {
        Self {
            vertices: self.vertices.clone(),
            faces: self.faces.clone(),
            generation: 0,
            fingerprint: Cell::new(self.fingerprint.get()),
            cache: RefCell::new(InvariantCache::new()),
        }
    }
}

impl std::fmt::Debug for TriMesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriMesh")
            .field("vertices", &self.vertices.len())
            .field("faces", &self.faces.len())
            .field("generation", &self.generation)
            .finish()
    }
}

/// Check index ranges and coordinate finiteness.
pub(crate) fn validate(
    vertices: &[Point3<f64>],
    faces: &[[u32; 3]],
) -> Result<(), InvalidGeometry> {
    for (index, p) in vertices.iter().enumerate() {
        if !p.coords.iter().all(|c| c.is_finite()) {
            return Err(InvalidGeometry::NonFiniteCoordinate { index });
        }
    }
    let vertex_count = vertices.len();
    for (face, &indices) in faces.iter().enumerate() {
        for index in indices {
            if index as usize >= vertex_count {
                return Err(InvalidGeometry::FaceIndexOutOfRange {
                    face,
                    index,
                    vertex_count,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{Cuboid, MeshSource};
    use approx::assert_relative_eq;

    fn triangle_mesh() -> TriMesh {
        TriMesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        )
        .unwrap()
    }

    #[test]
    fn rejects_out_of_range_face_index() {
        let result = TriMesh::new(vec![Point3::origin()], vec![[0, 0, 1]]);
        assert!(matches!(
            result,
            Err(InvalidGeometry::FaceIndexOutOfRange { face: 0, index: 1, .. })
        ));
    }

    #[test]
    fn rejects_non_finite_vertex() {
        let result = TriMesh::new(vec![Point3::new(0.0, f64::NAN, 0.0)], vec![]);
        assert!(matches!(
            result,
            Err(InvalidGeometry::NonFiniteCoordinate { index: 0 })
        ));
    }

    #[test]
    fn rejects_ragged_buffers() {
        assert!(matches!(
            TriMesh::from_raw(&[0.0, 0.0], &[]),
            Err(InvalidGeometry::RaggedPositions { len: 2 })
        ));
        assert!(matches!(
            TriMesh::from_raw(&[], &[0, 1]),
            Err(InvalidGeometry::RaggedIndices { len: 2 })
        ));
    }

    #[test]
    fn from_raw_builds_triangle() {
        let mesh =
            TriMesh::from_raw(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0], &[0, 1, 2]).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.face_count(), 1);
    }

    #[test]
    fn fingerprint_is_stable_across_reads() {
        let mesh = triangle_mesh();
        assert_eq!(mesh.fingerprint(), mesh.fingerprint());
    }

    #[test]
    fn fingerprint_changes_on_mutation() {
        let mut mesh = triangle_mesh();
        let before = mesh.fingerprint();
        mesh.set_vertex(0, Point3::new(0.5, 0.0, 0.0)).unwrap();
        assert_ne!(before, mesh.fingerprint());
        assert_eq!(mesh.generation(), 1);
    }

    #[test]
    fn identical_content_same_fingerprint() {
        let a = triangle_mesh();
        let b = triangle_mesh();
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn failed_mutation_leaves_mesh_untouched() {
        let mut mesh = triangle_mesh();
        let before = mesh.fingerprint();

        assert!(mesh.replace_faces(vec![[0, 1, 9]]).is_err());
        assert!(mesh.set_vertex(42, Point3::origin()).is_err());
        assert!(mesh
            .set_vertex(0, Point3::new(f64::INFINITY, 0.0, 0.0))
            .is_err());

        assert_eq!(mesh.fingerprint(), before);
        assert_eq!(mesh.generation(), 0);
    }

    #[test]
    fn cached_queries_track_mutation() {
        let mut mesh = Cuboid::unit().to_mesh().unwrap();
        assert!(mesh.is_watertight());

        // Drop one face: the cube now has a hole.
        let mut faces = mesh.faces().to_vec();
        faces.pop();
        mesh.replace_faces(faces).unwrap();

        assert!(!mesh.is_watertight());
        assert_eq!(mesh.analyze().boundary_edge_count, 3);
    }

    #[test]
    fn moving_a_vertex_updates_mass_properties() {
        let mut mesh = Cuboid::unit().to_mesh().unwrap();
        assert_relative_eq!(mesh.signed_volume(), 1.0, epsilon = 1e-10);

        // Stretch the cube along x by moving the four x=1 corners to x=2.
        let stretched: Vec<(usize, Point3<f64>)> = mesh
            .vertices()
            .iter()
            .enumerate()
            .filter(|(_, p)| p.x > 0.5)
            .map(|(i, p)| (i, Point3::new(2.0, p.y, p.z)))
            .collect();
        for (i, p) in stretched {
            mesh.set_vertex(i, p).unwrap();
        }

        assert_relative_eq!(mesh.signed_volume(), 2.0, epsilon = 1e-10);
        assert_relative_eq!(mesh.surface_area(), 10.0, epsilon = 1e-10);
    }

    #[test]
    fn cube_mass_properties() {
        let mesh = Cuboid::unit().to_mesh().unwrap();

        assert_relative_eq!(mesh.surface_area(), 6.0, epsilon = 1e-10);
        assert_relative_eq!(mesh.signed_volume(), 1.0, epsilon = 1e-10);
        let c = mesh.centroid();
        assert_relative_eq!(c.x, 0.5, epsilon = 1e-10);
        assert_relative_eq!(c.y, 0.5, epsilon = 1e-10);
        assert_relative_eq!(c.z, 0.5, epsilon = 1e-10);
    }

    #[test]
    fn face_normals_are_unit_or_zero() {
        let mesh = Cuboid::unit().to_mesh().unwrap();
        for n in mesh.face_normals().iter() {
            assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-10);
        }

        let degenerate = TriMesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
            ],
            vec![[0, 1, 2]],
        )
        .unwrap();
        assert_eq!(degenerate.face_normals()[0], Vector3::zeros());
    }

    #[test]
    fn soup_is_detached() {
        let mut mesh = triangle_mesh();
        let (vertices, faces) = mesh.to_soup();
        mesh.set_vertex(0, Point3::new(9.0, 9.0, 9.0)).unwrap();

        assert_eq!(vertices[0], Point3::origin());
        assert_eq!(faces.len(), 1);
    }

    #[test]
    fn clone_shares_content_not_cache() {
        let mesh = Cuboid::unit().to_mesh().unwrap();
        let _ = mesh.adjacency();
        let copy = mesh.clone();

        assert_eq!(copy.fingerprint(), mesh.fingerprint());
        assert!(copy.is_watertight());
    }

    #[test]
    fn adjacency_is_memoized() {
        let mesh = Cuboid::unit().to_mesh().unwrap();
        let a = mesh.adjacency();
        let b = mesh.adjacency();
        assert!(Rc::ptr_eq(&a, &b));
    }
}
