//! Property-based tests for topology queries and repair.
//!
//! Random triangle soups exercise the invariants that hold for *any* mesh,
//! not just the well-formed ones.

use std::collections::BTreeSet;

use mesh_topology::{Point3, RepairParams, TriMesh};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

fn arb_position() -> impl Strategy<Value = Point3<f64>> {
    prop::array::uniform3(-100.0..100.0f64).prop_map(|[x, y, z]| Point3::new(x, y, z))
}

/// An arbitrary mesh with valid face indices. Faces may be degenerate,
/// duplicated, inconsistently wound, or non-manifold; that is the point.
fn arb_mesh(max_vertices: usize, max_faces: usize) -> impl Strategy<Value = TriMesh> {
    (3..=max_vertices).prop_flat_map(move |num_vertices| {
        let vertices = prop::collection::vec(arb_position(), num_vertices);

        vertices.prop_flat_map(move |verts| {
            let n = verts.len() as u32;
            let face = prop::array::uniform3(0..n);
            let faces = prop::collection::vec(face, 0..=max_faces);

            faces.prop_map(move |f| {
                TriMesh::new(verts.clone(), f).expect("strategy generates valid indices")
            })
        })
    })
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    /// A second repair run finds nothing left to do.
    #[test]
    fn repair_is_idempotent(mut mesh in arb_mesh(12, 16)) {
        let params = RepairParams::default();
        let _ = mesh.repair(&params);
        let second = mesh.repair(&params);
        prop_assert!(!second.changed());
    }

    /// Components partition the face set: every face lands in exactly one.
    #[test]
    fn components_partition_faces(mesh in arb_mesh(12, 16)) {
        let components = mesh.connected_components();

        let total: usize = components.iter().map(|c| c.faces.len()).sum();
        prop_assert_eq!(total, mesh.face_count());

        for sub in components.iter() {
            prop_assert_eq!(sub.vertices.len(), sub.vertex_map.len());
            for (local, &original) in sub.vertex_map.iter().enumerate() {
                prop_assert_eq!(sub.vertices[local], mesh.vertices()[original as usize]);
            }
            for face in &sub.faces {
                for &v in face {
                    prop_assert!((v as usize) < sub.vertices.len());
                }
            }
        }
    }

    /// The cached Euler number matches a from-scratch recount.
    #[test]
    fn euler_number_matches_recount(mesh in arb_mesh(12, 16)) {
        let mut edges: BTreeSet<(u32, u32)> = BTreeSet::new();
        for &[a, b, c] in mesh.faces() {
            for (u, v) in [(a, b), (b, c), (c, a)] {
                edges.insert((u.min(v), u.max(v)));
            }
        }
        let expected =
            mesh.vertex_count() as i64 - edges.len() as i64 + mesh.face_count() as i64;
        prop_assert_eq!(mesh.euler_number(), expected);
    }

    /// Watertight means no boundary edges, no non-manifold edges, and
    /// consistent winding; the report's flags must agree.
    #[test]
    fn watertight_flags_are_coherent(mesh in arb_mesh(12, 16)) {
        let report = mesh.analyze();
        prop_assert_eq!(
            report.is_watertight,
            mesh.face_count() > 0
                && report.boundary_edge_count == 0
                && report.non_manifold_edge_count == 0
        );
        if report.is_watertight {
            prop_assert!(report.is_winding_consistent);
            prop_assert!(mesh.inconsistent_edges().is_empty());
        }
    }

    /// Identical content gives identical fingerprints; the fingerprint is
    /// stable across reads and across rebuilds from the same arrays.
    #[test]
    fn fingerprint_is_content_determined(mesh in arb_mesh(12, 16)) {
        let (vertices, faces) = mesh.to_soup();
        let rebuilt = TriMesh::new(vertices, faces).expect("soup round-trips");

        prop_assert_eq!(mesh.fingerprint(), mesh.fingerprint());
        prop_assert_eq!(rebuilt.fingerprint(), mesh.fingerprint());
    }

    /// Moving any vertex changes the fingerprint.
    #[test]
    fn mutation_changes_fingerprint(
        mut mesh in arb_mesh(12, 16),
        index in 0usize..12,
    ) {
        prop_assume!(index < mesh.vertex_count());
        let before = mesh.fingerprint();
        let p = mesh.vertices()[index];
        mesh.set_vertex(index, Point3::new(p.x + 1.0, p.y, p.z)).expect("in range");
        prop_assert_ne!(mesh.fingerprint(), before);
    }

    /// Repair output is structurally valid and reports honestly: the
    /// report is clean exactly when no non-manifold edge survives.
    #[test]
    fn repair_leaves_valid_geometry(mut mesh in arb_mesh(12, 16)) {
        let report = mesh.repair(&RepairParams::default());

        for face in mesh.faces() {
            for &v in face {
                prop_assert!((v as usize) < mesh.vertex_count());
            }
        }

        let remaining = mesh.adjacency().non_manifold_edges().count();
        prop_assert_eq!(report.is_clean(), remaining == 0);
        prop_assert_eq!(report.unrepairable_edges.len(), remaining);
        if report.is_clean() {
            prop_assert!(mesh.inconsistent_edges().is_empty());
        }
    }
}
