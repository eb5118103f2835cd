//! Topology queries: watertightness, Euler number, connected components,
//! winding consistency.
//!
//! Everything here is a pure function over an already-built
//! [`MeshAdjacency`]. Degenerate meshes are reported, never rejected: an
//! open or non-manifold mesh is still usable, just not for volume
//! integration.

use std::collections::VecDeque;

use hashbrown::{HashMap, HashSet};
use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::adjacency::MeshAdjacency;
use crate::triangle::{Triangle, DEGENERATE_AREA};

/// A connected component extracted as a standalone sub-mesh.
///
/// Carries only the vertices its faces reference, re-indexed from zero.
/// The original vertex indices are preserved in [`SubMesh::vertex_map`] for
/// traceability; the sub-mesh itself is an owned snapshot with no reference
/// back into the parent mesh.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SubMesh {
    /// Vertex positions referenced by this component.
    pub vertices: Vec<Point3<f64>>,
    /// Faces re-indexed into [`SubMesh::vertices`].
    pub faces: Vec<[u32; 3]>,
    /// For each local vertex, its index in the parent mesh.
    pub vertex_map: Vec<u32>,
}

/// Summary of a mesh's topological state.
///
/// Produced by [`crate::TriMesh::analyze`]. All counts are derived from the
/// same adjacency snapshot, so they are mutually consistent.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TopologyReport {
    /// Total number of vertices (including unreferenced ones).
    pub vertex_count: usize,
    /// Total number of faces.
    pub face_count: usize,
    /// Number of distinct undirected edges.
    pub edge_count: usize,

    /// Edges referenced by exactly one face.
    pub boundary_edge_count: usize,
    /// Edges referenced by same-direction pairs or by three or more faces.
    pub non_manifold_edge_count: usize,
    /// Edges referenced by exactly two faces with matching winding; the
    /// subset of non-manifold edges a winding repair can fix.
    pub inconsistent_edge_count: usize,
    /// Faces that are exact vertex-index permutations of an earlier face.
    pub duplicate_face_count: usize,
    /// Faces with repeated indices or (near-)zero area.
    pub degenerate_face_count: usize,

    /// Number of connected components of the face graph.
    pub component_count: usize,
    /// `V - E + F` over the full mesh. Only a meaningful topological
    /// invariant when the mesh is watertight.
    pub euler_number: i64,

    /// True iff every edge is manifold.
    pub is_watertight: bool,
    /// True iff no edge pair shares a winding direction.
    pub is_winding_consistent: bool,
}

impl TopologyReport {
    /// Check whether any defect was found.
    #[must_use]
    pub fn has_defects(&self) -> bool {
        self.boundary_edge_count > 0
            || self.non_manifold_edge_count > 0
            || self.duplicate_face_count > 0
            || self.degenerate_face_count > 0
    }
}

impl std::fmt::Display for TopologyReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Topology:")?;
        writeln!(
            f,
            "  {} vertices, {} faces, {} edges, {} components",
            self.vertex_count, self.face_count, self.edge_count, self.component_count
        )?;
        writeln!(f, "  Euler number: {}", self.euler_number)?;
        writeln!(
            f,
            "  Watertight: {}",
            if self.is_watertight { "yes" } else { "no" }
        )?;
        writeln!(
            f,
            "  Winding consistent: {}",
            if self.is_winding_consistent { "yes" } else { "no" }
        )?;
        if self.has_defects() {
            writeln!(f, "  Defects:")?;
            if self.boundary_edge_count > 0 {
                writeln!(f, "    boundary edges: {}", self.boundary_edge_count)?;
            }
            if self.non_manifold_edge_count > 0 {
                writeln!(f, "    non-manifold edges: {}", self.non_manifold_edge_count)?;
            }
            if self.duplicate_face_count > 0 {
                writeln!(f, "    duplicate faces: {}", self.duplicate_face_count)?;
            }
            if self.degenerate_face_count > 0 {
                writeln!(f, "    degenerate faces: {}", self.degenerate_face_count)?;
            }
        }
        Ok(())
    }
}

/// Partition face indices into connected components of the face graph.
///
/// Components are ordered by their lowest face index; faces within a
/// component come back in ascending order. Breadth-first, deterministic.
pub(crate) fn face_components(adj: &MeshAdjacency) -> Vec<Vec<usize>> {
    let n = adj.face_count();
    let mut visited = vec![false; n];
    let mut components = Vec::new();
    let mut queue = VecDeque::new();

    for seed in 0..n {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;
        queue.push_back(seed);
        let mut faces = Vec::new();

        while let Some(face) = queue.pop_front() {
            faces.push(face);
            for &next in adj.neighbors(face) {
                if !visited[next] {
                    visited[next] = true;
                    queue.push_back(next);
                }
            }
        }

        faces.sort_unstable();
        components.push(faces);
    }

    components
}

/// Extract each connected component as a re-indexed [`SubMesh`].
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn connected_components(
    vertices: &[Point3<f64>],
    faces: &[[u32; 3]],
    adj: &MeshAdjacency,
) -> Vec<SubMesh> {
    face_components(adj)
        .into_iter()
        .map(|component| {
            let mut remap: HashMap<u32, u32> = HashMap::new();
            let mut vertex_map = Vec::new();
            let mut local_vertices = Vec::new();
            let mut local_faces = Vec::with_capacity(component.len());

            for &face in &component {
                let mapped = faces[face].map(|v| {
                    *remap.entry(v).or_insert_with(|| {
                        vertex_map.push(v);
                        local_vertices.push(vertices[v as usize]);
                        (local_vertices.len() - 1) as u32
                    })
                });
                local_faces.push(mapped);
            }

            SubMesh {
                vertices: local_vertices,
                faces: local_faces,
                vertex_map,
            }
        })
        .collect()
}

/// Edges shared by exactly two faces with matching winding, sorted.
pub(crate) fn inconsistent_edges(adj: &MeshAdjacency) -> Vec<(u32, u32)> {
    let mut edges: Vec<(u32, u32)> = adj.inconsistent_edges().collect();
    edges.sort_unstable();
    edges
}

/// Compute `V - E + F` over the full mesh.
#[allow(clippy::cast_possible_wrap)]
pub(crate) fn euler_number(vertex_count: usize, edge_count: usize, face_count: usize) -> i64 {
    vertex_count as i64 - edge_count as i64 + face_count as i64
}

/// Build a full [`TopologyReport`] from a geometry snapshot and its adjacency.
pub(crate) fn analyze(
    vertices: &[Point3<f64>],
    faces: &[[u32; 3]],
    adj: &MeshAdjacency,
) -> TopologyReport {
    let mut boundary = 0;
    let mut non_manifold = 0;
    let mut inconsistent = 0;
    for (_, refs) in adj.edges() {
        match refs.len() {
            1 => boundary += 1,
            2 if refs[0].forward == refs[1].forward => {
                non_manifold += 1;
                inconsistent += 1;
            }
            2 => {}
            _ => non_manifold += 1,
        }
    }

    TopologyReport {
        vertex_count: vertices.len(),
        face_count: faces.len(),
        edge_count: adj.edge_count(),
        boundary_edge_count: boundary,
        non_manifold_edge_count: non_manifold,
        inconsistent_edge_count: inconsistent,
        duplicate_face_count: count_duplicate_faces(faces),
        degenerate_face_count: count_degenerate_faces(vertices, faces),
        component_count: face_components(adj).len(),
        euler_number: euler_number(vertices.len(), adj.edge_count(), faces.len()),
        is_watertight: adj.is_watertight(),
        is_winding_consistent: inconsistent == 0,
    }
}

/// Count faces that duplicate an earlier face's vertex set, in any winding
/// or rotation. Duplicates make adjacency ambiguous and are flagged here,
/// never silently merged.
pub(crate) fn count_duplicate_faces(faces: &[[u32; 3]]) -> usize {
    let mut seen: HashSet<[u32; 3]> = HashSet::with_capacity(faces.len());
    let mut duplicates = 0;

    for &face in faces {
        let fwd = canonical_face(face);
        let rev = canonical_face([face[0], face[2], face[1]]);
        if seen.contains(&fwd) || seen.contains(&rev) {
            duplicates += 1;
        } else {
            seen.insert(fwd);
        }
    }

    duplicates
}

fn count_degenerate_faces(vertices: &[Point3<f64>], faces: &[[u32; 3]]) -> usize {
    faces
        .iter()
        .filter(|&&[a, b, c]| {
            if a == b || b == c || a == c {
                return true;
            }
            Triangle::new(
                vertices[a as usize],
                vertices[b as usize],
                vertices[c as usize],
            )
            .area()
                < DEGENERATE_AREA
        })
        .count()
}

/// Rotate a face so the smallest vertex index comes first, preserving
/// winding.
pub(crate) fn canonical_face(face: [u32; 3]) -> [u32; 3] {
    let start = if face[0] <= face[1] && face[0] <= face[2] {
        0
    } else if face[1] <= face[2] {
        1
    } else {
        2
    };
    [face[start], face[(start + 1) % 3], face[(start + 2) % 3]]
}

/// Sum of signed tetrahedron volumes between each face and the origin.
///
/// Meaningful as an enclosed volume only over a closed, consistently wound
/// face set.
pub(crate) fn signed_volume_sum<I>(vertices: &[Point3<f64>], faces: I) -> f64
where
    I: IntoIterator<Item = [u32; 3]>,
{
    let mut six_volumes = 0.0;
    for [a, b, c] in faces {
        let v0 = vertices[a as usize].coords;
        let v1 = vertices[b as usize].coords;
        let v2 = vertices[c as usize].coords;
        six_volumes += v0.dot(&v1.cross(&v2));
    }
    six_volumes / 6.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_soup() -> (Vec<Point3<f64>>, Vec<[u32; 3]>) {
        // Two disjoint triangles.
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(5.0, 0.0, 0.0),
            Point3::new(6.0, 0.0, 0.0),
            Point3::new(5.0, 1.0, 0.0),
        ];
        let faces = vec![[0, 1, 2], [3, 4, 5]];
        (vertices, faces)
    }

    #[test]
    fn components_of_disjoint_triangles() {
        let (vertices, faces) = triangle_soup();
        let adj = MeshAdjacency::build(&faces);
        let components = connected_components(&vertices, &faces, &adj);

        assert_eq!(components.len(), 2);
        assert_eq!(components[0].faces, vec![[0, 1, 2]]);
        assert_eq!(components[0].vertex_map, vec![0, 1, 2]);
        assert_eq!(components[1].faces, vec![[0, 1, 2]]);
        assert_eq!(components[1].vertex_map, vec![3, 4, 5]);
    }

    #[test]
    fn component_vertices_are_snapshots() {
        let (vertices, faces) = triangle_soup();
        let adj = MeshAdjacency::build(&faces);
        let components = connected_components(&vertices, &faces, &adj);

        assert_eq!(components[1].vertices[0], Point3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn components_ordered_by_first_face() {
        // Component containing face 0 must come first even though the
        // other component has more faces.
        let faces = vec![[0, 1, 2], [3, 4, 5], [4, 6, 5], [6, 4, 7]];
        let adj = MeshAdjacency::build(&faces);
        let components = face_components(&adj);

        assert_eq!(components, vec![vec![0], vec![1, 2, 3]]);
    }

    #[test]
    fn euler_number_of_single_triangle() {
        assert_eq!(euler_number(3, 3, 1), 1);
    }

    #[test]
    fn canonical_face_preserves_winding() {
        assert_eq!(canonical_face([2, 0, 1]), [0, 1, 2]);
        assert_eq!(canonical_face([2, 1, 0]), [0, 2, 1]);
        assert_eq!(canonical_face([0, 1, 2]), [0, 1, 2]);
    }

    #[test]
    fn duplicate_count_ignores_rotation_and_winding() {
        let faces = vec![[0, 1, 2], [1, 2, 0], [0, 2, 1], [1, 3, 2]];
        assert_eq!(count_duplicate_faces(&faces), 2);
    }

    #[test]
    fn degenerate_count_catches_repeated_indices() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let faces = vec![[0, 1, 2], [0, 0, 1]];
        assert_eq!(count_degenerate_faces(&vertices, &faces), 1);
    }

    #[test]
    fn report_flags_open_triangle() {
        let (vertices, faces) = triangle_soup();
        let adj = MeshAdjacency::build(&faces);
        let report = analyze(&vertices, &faces, &adj);

        assert_eq!(report.component_count, 2);
        assert_eq!(report.boundary_edge_count, 6);
        assert!(!report.is_watertight);
        assert!(report.is_winding_consistent);
        assert!(report.has_defects());
    }

    #[test]
    fn report_display_mentions_defects() {
        let (vertices, faces) = triangle_soup();
        let adj = MeshAdjacency::build(&faces);
        let report = analyze(&vertices, &faces, &adj);
        let text = report.to_string();

        assert!(text.contains("boundary edges: 6"));
        assert!(text.contains("Watertight: no"));
    }
}
