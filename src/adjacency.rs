//! Edge-to-face and face-to-face adjacency derived from triangle data.
//!
//! For each face `[a, b, c]` the three directed edges `(a, b)`, `(b, c)`,
//! `(c, a)` are enumerated in winding order and grouped by their undirected
//! edge. The relative direction of two faces over a shared edge is what
//! decides manifoldness: consistent winding traverses a shared edge in
//! opposite directions.

use hashbrown::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An undirected edge as a normalized vertex index pair (`v0 < v1`).
pub type Edge = (u32, u32);

/// One face's reference to an undirected edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EdgeRef {
    /// Index of the referencing face.
    pub face: usize,
    /// `true` if the face traverses the edge from the smaller to the larger
    /// vertex index.
    pub forward: bool,
}

/// Manifold classification of an undirected edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EdgeKind {
    /// Referenced by exactly one face: the mesh has a hole here.
    Boundary,
    /// Referenced by exactly two faces with opposite winding.
    Manifold,
    /// Referenced by two faces with the same winding, or by three or more
    /// faces. All participating faces are recorded; none is dropped.
    NonManifold,
}

/// Edge and face adjacency for a triangle mesh.
///
/// Built in a single pass over the face array with hashed edge keys, so
/// construction is linear in face count.
///
/// # Example
///
/// ```
/// use mesh_topology::{EdgeKind, MeshAdjacency};
///
/// let faces = vec![[0, 1, 2], [1, 3, 2]];
/// let adj = MeshAdjacency::build(&faces);
///
/// assert_eq!(adj.edge_kind(1, 2), Some(EdgeKind::Manifold));
/// assert_eq!(adj.boundary_edges().count(), 4);
/// assert_eq!(adj.neighbors(0), &[1]);
/// ```
#[derive(Debug, Clone)]
pub struct MeshAdjacency {
    edge_refs: HashMap<Edge, Vec<EdgeRef>>,
    neighbors: Vec<Vec<usize>>,
}

impl MeshAdjacency {
    /// Build adjacency information from a list of faces.
    #[must_use]
    pub fn build(faces: &[[u32; 3]]) -> Self {
        let mut edge_refs: HashMap<Edge, Vec<EdgeRef>> = HashMap::with_capacity(faces.len() * 3 / 2);

        for (face, &[a, b, c]) in faces.iter().enumerate() {
            for (u, v) in [(a, b), (b, c), (c, a)] {
                edge_refs
                    .entry(normalize_edge(u, v))
                    .or_default()
                    .push(EdgeRef { face, forward: u < v });
            }
        }

        let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); faces.len()];
        for refs in edge_refs.values() {
            if refs.len() < 2 {
                continue;
            }
            for (i, a) in refs.iter().enumerate() {
                for b in &refs[i + 1..] {
                    if a.face != b.face {
                        neighbors[a.face].push(b.face);
                        neighbors[b.face].push(a.face);
                    }
                }
            }
        }
        for list in &mut neighbors {
            list.sort_unstable();
            list.dedup();
        }

        Self { edge_refs, neighbors }
    }

    /// Get the `(face, direction)` references for an undirected edge.
    ///
    /// Returns `None` if the edge does not occur in the mesh. The query is
    /// direction-insensitive.
    #[must_use]
    pub fn references(&self, v0: u32, v1: u32) -> Option<&[EdgeRef]> {
        self.edge_refs.get(&normalize_edge(v0, v1)).map(Vec::as_slice)
    }

    /// Classify an undirected edge.
    ///
    /// Returns `None` if the edge does not occur in the mesh.
    #[must_use]
    pub fn edge_kind(&self, v0: u32, v1: u32) -> Option<EdgeKind> {
        self.references(v0, v1).map(classify)
    }

    /// Faces adjacent to a face via shared undirected edges, ascending.
    ///
    /// # Panics
    ///
    /// Panics if `face` is out of range for the face array this adjacency
    /// was built from.
    #[must_use]
    pub fn neighbors(&self, face: usize) -> &[usize] {
        &self.neighbors[face]
    }

    /// Number of faces the adjacency was built from.
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.neighbors.len()
    }

    /// Number of distinct undirected edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_refs.len()
    }

    /// Iterate over all undirected edges with their references.
    ///
    /// Iteration order is unspecified.
    pub fn edges(&self) -> impl Iterator<Item = (Edge, &[EdgeRef])> {
        self.edge_refs.iter().map(|(&e, refs)| (e, refs.as_slice()))
    }

    /// Iterate over boundary edges (exactly one referencing face).
    pub fn boundary_edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.classified(EdgeKind::Boundary)
    }

    /// Iterate over non-manifold edges (same-direction pairs or 3+ faces).
    pub fn non_manifold_edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.classified(EdgeKind::NonManifold)
    }

    /// Iterate over edges shared by exactly two faces with the *same*
    /// winding direction. These are the edges a winding repair can fix.
    pub fn inconsistent_edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.edge_refs.iter().filter_map(|(&e, refs)| {
            (refs.len() == 2 && refs[0].forward == refs[1].forward).then_some(e)
        })
    }

    /// Check if every edge is referenced by at most two faces, none of them
    /// with matching winding.
    #[must_use]
    pub fn is_manifold(&self) -> bool {
        self.edge_refs
            .values()
            .all(|refs| classify(refs) != EdgeKind::NonManifold)
    }

    /// Check if every edge is manifold: no boundary, no non-manifold edges.
    #[must_use]
    pub fn is_watertight(&self) -> bool {
        !self.edge_refs.is_empty()
            && self
                .edge_refs
                .values()
                .all(|refs| classify(refs) == EdgeKind::Manifold)
    }

    fn classified(&self, kind: EdgeKind) -> impl Iterator<Item = Edge> + '_ {
        self.edge_refs
            .iter()
            .filter_map(move |(&e, refs)| (classify(refs) == kind).then_some(e))
    }
}

/// Classify an edge from its face references.
fn classify(refs: &[EdgeRef]) -> EdgeKind {
    match refs {
        [_] => EdgeKind::Boundary,
        [a, b] if a.forward != b.forward => EdgeKind::Manifold,
        _ => EdgeKind::NonManifold,
    }
}

/// Normalize edge direction so the smaller vertex index comes first.
#[inline]
pub(crate) fn normalize_edge(v0: u32, v1: u32) -> Edge {
    if v0 < v1 {
        (v0, v1)
    } else {
        (v1, v0)
    }
}
