//! Mesh geometry extracted from a GLB file.
//!
//! [`MeshData`] is the reader-side representation of one drawable surface:
//! positions, triangle indices and the optional per-vertex attributes the
//! scene builder knows how to carry into USD. [`GlbAsset`] is the ordered
//! collection of them for one input file.

use arq_math::{Aabb, Vec3};

use crate::diagnostics::Diagnostic;
use crate::glb::{GlbError, GlbResult};

/// One drawable triangle surface.
///
/// Constructed through [`MeshData::new`], which enforces that every face
/// index is in range and that optional attributes have one value per vertex.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshData {
    /// Source mesh name and primitive index (informational)
    pub name: String,

    /// Vertex positions
    pub vertices: Vec<Vec3>,

    /// Triangles, each an index triple into `vertices`
    pub faces: Vec<[u32; 3]>,

    /// Per-vertex normals, present only if the source supplied them
    pub normals: Option<Vec<Vec3>>,

    /// Per-vertex RGB colors in [0, 1]
    pub vertex_colors: Option<Vec<Vec3>>,
}

impl MeshData {
    /// Create a mesh, checking face indices and normal count.
    ///
    /// Vertex colors are not checked here; the scene builder drops them
    /// (with a diagnostic) when they do not line up with the vertices.
    pub fn new(
        name: impl Into<String>,
        vertices: Vec<Vec3>,
        faces: Vec<[u32; 3]>,
        normals: Option<Vec<Vec3>>,
        vertex_colors: Option<Vec<Vec3>>,
    ) -> GlbResult<Self> {
        let vertex_count = vertices.len();

        if let Some(&index) = faces.iter().flatten().find(|&&i| i as usize >= vertex_count) {
            return Err(GlbError::IndexOutOfRange {
                index,
                vertex_count,
            });
        }

        if let Some(normals) = &normals {
            if normals.len() != vertex_count {
                return Err(GlbError::AttributeLength {
                    attribute: "NORMAL",
                    expected: vertex_count,
                    actual: normals.len(),
                });
            }
        }

        Ok(Self {
            name: name.into(),
            vertices,
            faces,
            normals,
            vertex_colors,
        })
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.faces.len()
    }

    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    pub fn has_vertex_colors(&self) -> bool {
        self.vertex_colors.is_some()
    }

    /// True when there is neither geometry nor topology to draw.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.faces.is_empty()
    }

    /// Face indices flattened to a single list, three per triangle.
    pub fn flattened_indices(&self) -> Vec<i32> {
        self.faces
            .iter()
            .flat_map(|face| face.iter().map(|&i| i as i32))
            .collect()
    }

    /// Bounding box of the vertex positions.
    pub fn bounds(&self) -> Aabb {
        Aabb::from_positions(&self.vertices)
    }
}

/// Everything read from one GLB file.
#[derive(Clone, Debug, Default)]
pub struct GlbAsset {
    /// One entry per triangle primitive, in document order
    pub meshes: Vec<MeshData>,

    /// Non-fatal conditions met while reading
    pub diagnostics: Vec<Diagnostic>,
}

impl GlbAsset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Total vertex count across all meshes.
    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(MeshData::vertex_count).sum()
    }

    /// Total triangle count across all meshes.
    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(MeshData::triangle_count).sum()
    }
}
