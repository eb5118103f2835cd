//! Best-effort topology repair: duplicate and degenerate face removal,
//! winding propagation, outward orientation, vertex merging.
//!
//! Repair never fails. Edges that cannot be made manifold by flipping faces
//! are reported in the [`RepairReport`] and the mesh stays usable; it simply
//! keeps answering `is_watertight() == false`.

use std::collections::VecDeque;

use hashbrown::{HashMap, HashSet};
use nalgebra::Point3;
use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::adjacency::{normalize_edge, EdgeKind, MeshAdjacency};
use crate::mesh::TriMesh;
use crate::topology::{canonical_face, face_components, signed_volume_sum};
use crate::triangle::{Triangle, DEGENERATE_AREA};

/// Configuration for [`TriMesh::repair`].
///
/// # Example
///
/// ```
/// use mesh_topology::RepairParams;
///
/// // Defaults fix winding and strip duplicate/degenerate faces.
/// let params = RepairParams::default();
///
/// // Loaders dealing with unindexed soup usually want a merge pass first.
/// let params = RepairParams::default().with_merge_epsilon(Some(1e-6));
/// ```
#[derive(Debug, Clone)]
pub struct RepairParams {
    /// Merge vertices closer than this distance before anything else.
    /// `None` skips the pass; loaders that produce unindexed triangle soup
    /// should set it (or call [`TriMesh::merge_close_vertices`] directly).
    pub merge_epsilon: Option<f64>,
    /// Remove faces that are exact vertex-index permutations of an earlier
    /// face, whichever winding.
    pub remove_duplicates: bool,
    /// Remove faces with repeated indices or area below
    /// [`RepairParams::degenerate_area_threshold`].
    pub remove_degenerate: bool,
    /// Area below which a face counts as degenerate.
    pub degenerate_area_threshold: f64,
    /// Flip faces to make winding consistent across each component.
    pub fix_winding: bool,
    /// Flip entire closed components whose signed volume is negative so
    /// normals point outward. Applies whether or not winding repair ran;
    /// only components with all edges manifold qualify.
    pub normalize_orientation: bool,
}

impl Default for RepairParams {
    fn default() -> Self {
        Self {
            merge_epsilon: None,
            remove_duplicates: true,
            remove_degenerate: true,
            degenerate_area_threshold: DEGENERATE_AREA,
            fix_winding: true,
            normalize_orientation: true,
        }
    }
}

impl RepairParams {
    /// Set the vertex merge distance (`None` disables the pass).
    #[must_use]
    pub const fn with_merge_epsilon(mut self, epsilon: Option<f64>) -> Self {
        self.merge_epsilon = epsilon;
        self
    }

    /// Set the degenerate-face area threshold.
    #[must_use]
    pub const fn with_degenerate_area_threshold(mut self, threshold: f64) -> Self {
        self.degenerate_area_threshold = threshold;
        self
    }

    /// Enable or disable winding repair.
    #[must_use]
    pub const fn with_fix_winding(mut self, fix: bool) -> Self {
        self.fix_winding = fix;
        self
    }

    /// Enable or disable outward orientation of closed components.
    #[must_use]
    pub const fn with_normalize_orientation(mut self, normalize: bool) -> Self {
        self.normalize_orientation = normalize;
        self
    }
}

/// Outcome of a repair run.
///
/// Unrepairable edges are a result state, not an error: callers decide
/// whether a non-watertight mesh is acceptable for their purpose.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RepairReport {
    /// Face count before repair.
    pub initial_faces: usize,
    /// Face count after repair.
    pub final_faces: usize,
    /// Vertices merged by the optional merge pass.
    pub vertices_merged: usize,
    /// Duplicate faces removed.
    pub duplicates_removed: usize,
    /// Degenerate faces removed.
    pub degenerates_removed: usize,
    /// Faces flipped during winding propagation.
    pub faces_flipped: usize,
    /// Closed components flipped outward after propagation.
    pub components_reversed: usize,
    /// Edges still non-manifold after best-effort repair, sorted.
    pub unrepairable_edges: Vec<(u32, u32)>,
}

impl RepairReport {
    /// Check whether the repair touched the mesh at all.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.vertices_merged > 0
            || self.duplicates_removed > 0
            || self.degenerates_removed > 0
            || self.faces_flipped > 0
            || self.components_reversed > 0
    }

    /// Check whether every edge defect was resolved.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.unrepairable_edges.is_empty()
    }
}

impl std::fmt::Display for RepairReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Repair: {} -> {} faces ({} duplicate, {} degenerate removed), \
             {} flipped, {} components reversed, {} merged vertices, {} unrepairable edges",
            self.initial_faces,
            self.final_faces,
            self.duplicates_removed,
            self.degenerates_removed,
            self.faces_flipped,
            self.components_reversed,
            self.vertices_merged,
            self.unrepairable_edges.len()
        )
    }
}

impl TriMesh {
    /// Run the repair pipeline: merge (optional), duplicate and degenerate
    /// removal, winding propagation, outward orientation.
    ///
    /// Winding repair treats orientation as a propagation problem over the
    /// face graph: one seed per component (its lowest face index), a
    /// breadth-first sweep that requires each shared manifold-candidate edge
    /// to be traversed in opposite directions, flipping unvisited neighbors
    /// that disagree. Edges referenced by three or more faces are not
    /// propagated through. Whatever stays non-manifold after the sweep
    /// (such fan edges, plus Moebius-like cycles no set of flips can
    /// resolve) is listed in [`RepairReport::unrepairable_edges`]; that is
    /// a result state, logged but never fatal.
    ///
    /// On success the face array is replaced through the normal mutation
    /// path, invalidating every cached invariant. Repairing an already
    /// consistent mesh is a no-op and does not bump the generation.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_topology::{MeshSource, Cuboid, RepairParams};
    ///
    /// let mut mesh = Cuboid::unit().to_mesh().unwrap();
    /// let report = mesh.repair(&RepairParams::default());
    ///
    /// // A consistently wound cube needs no work.
    /// assert!(!report.changed());
    /// assert!(report.is_clean());
    /// ```
    pub fn repair(&mut self, params: &RepairParams) -> RepairReport {
        let mut report = RepairReport {
            initial_faces: self.face_count(),
            ..RepairReport::default()
        };

        if let Some(epsilon) = params.merge_epsilon {
            report.vertices_merged = self.merge_close_vertices(Some(epsilon));
        }

        let mut faces = self.faces().to_vec();

        if params.remove_duplicates {
            report.duplicates_removed = remove_duplicate_faces(&mut faces);
        }
        if params.remove_degenerate {
            report.degenerates_removed =
                remove_degenerate_faces(self.vertices(), &mut faces, params.degenerate_area_threshold);
        }

        if params.fix_winding {
            let adj = MeshAdjacency::build(&faces);
            report.faces_flipped = propagate_winding(&mut faces, &adj);
        }

        // Flipping a whole component reverses both references of each of
        // its edges, so this adjacency stays valid across orient_outward.
        let adj = MeshAdjacency::build(&faces);
        if params.normalize_orientation {
            report.components_reversed = orient_outward(&adj, self.vertices(), &mut faces);
        }
        report.unrepairable_edges = remaining_non_manifold(&adj);

        if faces != self.faces() {
            self.commit_faces(faces);
        }
        report.final_faces = self.face_count();

        if !report.unrepairable_edges.is_empty() {
            warn!(
                edges = report.unrepairable_edges.len(),
                "repair left non-manifold edges"
            );
        }
        debug!(%report, "repair finished");

        report
    }

    /// Merge vertices closer than `epsilon`, remap faces, drop faces that
    /// collapse, and compact away unreferenced vertices.
    ///
    /// With `None`, the threshold defaults to machine epsilon scaled by the
    /// mesh extent (`sqrt(f64::EPSILON)` times the bounding-box diagonal),
    /// which merges only load-time duplicates. Returns the number of
    /// vertices merged away.
    pub fn merge_close_vertices(&mut self, epsilon: Option<f64>) -> usize {
        let epsilon = epsilon.unwrap_or_else(|| {
            let diagonal = self.bounds().diagonal();
            if diagonal > 0.0 {
                diagonal * f64::EPSILON.sqrt()
            } else {
                f64::EPSILON.sqrt()
            }
        });
        if epsilon <= 0.0 || self.vertex_count() == 0 {
            return 0;
        }

        let remap = merge_map(self.vertices(), epsilon);
        let merged = remap
            .iter()
            .enumerate()
            .filter(|&(i, &target)| i as u32 != target)
            .count();
        if merged == 0 {
            return 0;
        }

        let mut faces: Vec<[u32; 3]> = self
            .faces()
            .iter()
            .map(|face| face.map(|v| remap[v as usize]))
            .collect();
        // Faces collapsed by the merge are degenerate by construction.
        faces.retain(|&[a, b, c]| a != b && b != c && a != c);

        let (vertices, faces) = compact_vertices(self.vertices(), faces);
        debug!(merged, epsilon, "merged close vertices");
        self.commit_arrays(vertices, faces);
        merged
    }
}

/// Remove faces that duplicate an earlier face's vertex set (any winding).
///
/// The first copy encountered stays, whatever its winding; winding repair
/// afterwards decides the surviving orientation.
pub(crate) fn remove_duplicate_faces(faces: &mut Vec<[u32; 3]>) -> usize {
    let before = faces.len();
    let mut seen: HashSet<[u32; 3]> = HashSet::with_capacity(faces.len());

    faces.retain(|&face| {
        let fwd = canonical_face(face);
        let rev = canonical_face([face[0], face[2], face[1]]);
        if seen.contains(&fwd) || seen.contains(&rev) {
            false
        } else {
            seen.insert(fwd);
            true
        }
    });

    before - faces.len()
}

/// Remove faces with repeated indices or area below `threshold`.
pub(crate) fn remove_degenerate_faces(
    vertices: &[Point3<f64>],
    faces: &mut Vec<[u32; 3]>,
    threshold: f64,
) -> usize {
    let before = faces.len();

    faces.retain(|&[a, b, c]| {
        if a == b || b == c || a == c {
            return false;
        }
        Triangle::new(vertices[a as usize], vertices[b as usize], vertices[c as usize]).area()
            >= threshold
    });

    before - faces.len()
}

/// Breadth-first winding propagation over the face graph.
///
/// Returns the number of faces flipped. Flips are tracked lazily and
/// applied at the end so the adjacency's stored directions stay valid.
/// A visited face that disagrees with the propagated orientation is left
/// alone (a Moebius-like cycle); the edge stays non-manifold and shows up
/// in the post-repair scan.
fn propagate_winding(faces: &mut [[u32; 3]], adj: &MeshAdjacency) -> usize {
    let n = faces.len();
    let mut visited = vec![false; n];
    let mut flipped = vec![false; n];
    let mut queue = VecDeque::new();

    for seed in 0..n {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;
        queue.push_back(seed);

        while let Some(face) = queue.pop_front() {
            let [a, b, c] = faces[face];
            // Visit edges in normalized order so traversal does not depend
            // on the face's current winding; repair is a fixed point.
            let mut edges = [
                normalize_edge(a, b),
                normalize_edge(b, c),
                normalize_edge(c, a),
            ];
            edges.sort_unstable();
            for (u, v) in edges {
                let Some(refs) = adj.references(u, v) else {
                    continue;
                };
                // Only propagate through edges shared by exactly two
                // distinct faces; 3+ sharing is ambiguous and stays
                // non-manifold.
                if refs.len() != 2 || refs[0].face == refs[1].face {
                    continue;
                }
                let (this, other) = if refs[0].face == face {
                    (refs[0], refs[1])
                } else {
                    (refs[1], refs[0])
                };

                let this_forward = this.forward != flipped[face];
                let other_forward = other.forward != flipped[other.face];
                let consistent = this_forward != other_forward;

                if !visited[other.face] {
                    if !consistent {
                        flipped[other.face] = true;
                    }
                    visited[other.face] = true;
                    queue.push_back(other.face);
                }
            }
        }
    }

    let mut flips = 0;
    for (face, &flip) in flipped.iter().enumerate() {
        if flip {
            faces[face].swap(1, 2);
            flips += 1;
        }
    }
    flips
}

/// Collect the edges still classified non-manifold, sorted: edges shared
/// by three or more faces, plus same-direction pairs propagation could not
/// resolve.
fn remaining_non_manifold(adj: &MeshAdjacency) -> Vec<(u32, u32)> {
    let mut edges: Vec<(u32, u32)> = adj.non_manifold_edges().collect();
    edges.sort_unstable();
    edges
}

/// Flip entire closed components whose signed volume is negative.
///
/// Components with boundary or non-manifold edges are left alone; their
/// volume is not well-defined. Returns the number of components reversed.
fn orient_outward(adj: &MeshAdjacency, vertices: &[Point3<f64>], faces: &mut [[u32; 3]]) -> usize {
    let mut reversed = 0;

    for component in face_components(adj) {
        let closed = component.iter().all(|&face| {
            let [a, b, c] = faces[face];
            [(a, b), (b, c), (c, a)]
                .into_iter()
                .all(|(u, v)| adj.edge_kind(u, v) == Some(EdgeKind::Manifold))
        });
        if !closed {
            continue;
        }

        let volume = signed_volume_sum(vertices, component.iter().map(|&f| faces[f]));
        if volume < 0.0 {
            for &face in &component {
                faces[face].swap(1, 2);
            }
            reversed += 1;
        }
    }

    reversed
}

/// Compute the merge target for every vertex using a spatial hash over
/// cells of `2 * epsilon`, checking the 3x3x3 neighborhood.
#[allow(clippy::cast_possible_truncation)]
fn merge_map(vertices: &[Point3<f64>], epsilon: f64) -> Vec<u32> {
    let cell_size = epsilon * 2.0;
    let mut grid: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::with_capacity(vertices.len());

    for (i, p) in vertices.iter().enumerate() {
        grid.entry(cell_of(p, cell_size)).or_default().push(i as u32);
    }

    let mut remap: Vec<u32> = (0..vertices.len() as u32).collect();

    for (i, p) in vertices.iter().enumerate() {
        let i = i as u32;
        if remap[i as usize] != i {
            continue;
        }
        let (cx, cy, cz) = cell_of(p, cell_size);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(candidates) = grid.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    for &other in candidates {
                        if other <= i || remap[other as usize] != other {
                            continue;
                        }
                        if (vertices[other as usize] - p).norm() < epsilon {
                            remap[other as usize] = i;
                        }
                    }
                }
            }
        }
    }

    remap
}

#[allow(clippy::cast_possible_truncation)]
fn cell_of(p: &Point3<f64>, cell_size: f64) -> (i64, i64, i64) {
    (
        (p.x / cell_size).floor() as i64,
        (p.y / cell_size).floor() as i64,
        (p.z / cell_size).floor() as i64,
    )
}

/// Drop vertices no face references and remap indices.
#[allow(clippy::cast_possible_truncation)]
fn compact_vertices(
    vertices: &[Point3<f64>],
    mut faces: Vec<[u32; 3]>,
) -> (Vec<Point3<f64>>, Vec<[u32; 3]>) {
    let mut referenced = vec![false; vertices.len()];
    for face in &faces {
        for &v in face {
            referenced[v as usize] = true;
        }
    }

    let mut remap = vec![0_u32; vertices.len()];
    let mut kept = Vec::with_capacity(vertices.len());
    for (i, p) in vertices.iter().enumerate() {
        if referenced[i] {
            remap[i] = kept.len() as u32;
            kept.push(*p);
        }
    }
    for face in &mut faces {
        *face = face.map(|v| remap[v as usize]);
    }

    (kept, faces)
}
