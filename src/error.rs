//! Error types for mesh construction and mutation.

use thiserror::Error;

/// Structural errors raised at the geometry store boundary.
///
/// These are fatal: a [`crate::TriMesh`] never holds malformed arrays.
/// Topological defects (holes, inconsistent winding, non-manifold edges)
/// are *not* errors; they are reported through queries and repair results
/// because such meshes are common and still usable for many purposes.
#[derive(Debug, Error)]
pub enum InvalidGeometry {
    /// A face references a vertex index outside the vertex array.
    #[error("face {face} references vertex {index} but mesh has {vertex_count} vertices")]
    FaceIndexOutOfRange {
        /// Index of the offending face.
        face: usize,
        /// The out-of-range vertex index.
        index: u32,
        /// Total number of vertices in the mesh.
        vertex_count: usize,
    },

    /// A vertex index passed to a mutation does not exist.
    #[error("vertex index {index} out of range (mesh has {vertex_count} vertices)")]
    VertexIndexOutOfRange {
        /// The out-of-range vertex index.
        index: usize,
        /// Total number of vertices in the mesh.
        vertex_count: usize,
    },

    /// A vertex coordinate is NaN or infinite.
    #[error("vertex {index} has a non-finite coordinate")]
    NonFiniteCoordinate {
        /// Index of the offending vertex.
        index: usize,
    },

    /// A flat position buffer is not a whole number of 3D points.
    #[error("position buffer length {len} is not a multiple of 3")]
    RaggedPositions {
        /// Length of the buffer.
        len: usize,
    },

    /// A flat index buffer is not a whole number of triangles.
    #[error("index buffer length {len} is not a multiple of 3")]
    RaggedIndices {
        /// Length of the buffer.
        len: usize,
    },
}
