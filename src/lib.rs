//! Topology analysis and repair for indexed triangle meshes.
//!
//! This crate represents a triangulated surface and derives, validates, and
//! repairs its topological properties:
//!
//! - [`TriMesh`]: vertex and face arrays as the single source of truth,
//!   with every derived quantity memoized against a content fingerprint
//! - [`MeshAdjacency`]: edge-to-face and face-to-face adjacency with
//!   boundary / manifold / non-manifold edge classification
//! - Topology queries: watertightness, Euler number, connected components,
//!   winding consistency ([`TopologyReport`])
//! - [`TriMesh::repair`]: duplicate and degenerate face removal plus
//!   best-effort winding repair by propagation over the face graph
//! - [`Cuboid`] / [`MeshSource`]: primitives sharing the mesh read
//!   contract, tessellated lazily
//!
//! File format I/O, rendering, convex hulls, and boolean operations are out
//! of scope; loaders hand raw arrays to [`TriMesh::new`] or
//! [`TriMesh::from_raw`], and exporters read the arrays and queries back.
//!
//! Meshes with topological defects are *not* errors here: an open or
//! non-manifold mesh answers every query honestly and stays usable. Only
//! structurally malformed input (out-of-range indices, non-finite
//! coordinates) is rejected, at the [`TriMesh`] boundary.
//!
//! # Example
//!
//! ```
//! use mesh_topology::{Cuboid, MeshSource, RepairParams};
//!
//! let mut mesh = Cuboid::unit().to_mesh().unwrap();
//! assert!(mesh.is_watertight());
//! assert_eq!(mesh.euler_number(), 2);
//!
//! // Sabotage one face's winding, then let repair find it.
//! let mut faces = mesh.faces().to_vec();
//! faces[5].swap(1, 2);
//! mesh.replace_faces(faces).unwrap();
//! assert!(!mesh.analyze().is_winding_consistent);
//!
//! let report = mesh.repair(&RepairParams::default());
//! assert_eq!(report.faces_flipped, 1);
//! assert!(mesh.is_watertight());
//! ```
//!
//! # Concurrency
//!
//! Single-threaded by design: caching uses per-mesh interior mutability, so
//! [`TriMesh`] is `Send` but not `Sync`. Concurrent callers wrap each mesh
//! in one mutual-exclusion boundary.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod adjacency;
mod bounds;
mod cache;
mod error;
mod mesh;
mod primitives;
mod repair;
mod topology;
mod triangle;

pub use adjacency::{Edge, EdgeKind, EdgeRef, MeshAdjacency};
pub use bounds::Aabb;
pub use error::InvalidGeometry;
pub use mesh::TriMesh;
pub use primitives::{Cuboid, MeshSource};
pub use repair::{RepairParams, RepairReport};
pub use topology::{SubMesh, TopologyReport};
pub use triangle::{Triangle, DEGENERATE_AREA};

// Re-export the nalgebra types appearing in the public API.
pub use nalgebra::{Point3, Vector3};
