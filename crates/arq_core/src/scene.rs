//! Scene graph built from a GLB asset.
//!
//! The graph mirrors the USD prims the writer emits: one root transform, one
//! shared preview material and one mesh prim per input mesh. It owns its data
//! and carries the diagnostics of every stage so far.

use std::sync::Arc;

use arq_math::{Aabb, Vec3};

use crate::diagnostics::Diagnostic;
use crate::mesh::{GlbAsset, MeshData};

/// Name of the root transform, also the layer's default prim.
pub const ROOT_NAME: &str = "Root";

/// Name of the shared material prim under the root.
pub const MATERIAL_NAME: &str = "Material";

/// A PBR material definition based on UsdPreviewSurface.
///
/// Only constant inputs; source materials and textures are not carried over.
#[derive(Clone, Debug, PartialEq)]
pub struct PreviewMaterial {
    /// Prim name under the root
    pub name: String,

    /// Diffuse/albedo color (RGB, 0-1)
    pub diffuse_color: Vec3,

    /// Roughness factor (0=smooth, 1=rough)
    pub roughness: f32,

    /// Metallic factor (0=dielectric, 1=metal)
    pub metallic: f32,
}

impl Default for PreviewMaterial {
    fn default() -> Self {
        Self {
            name: MATERIAL_NAME.to_string(),
            diffuse_color: Vec3::splat(0.7),
            roughness: 0.5,
            metallic: 0.0,
        }
    }
}

impl PreviewMaterial {
    /// Absolute prim path of the material.
    pub fn path(&self) -> String {
        format!("/{}/{}", ROOT_NAME, self.name)
    }

    /// Absolute prim path of the material's surface shader.
    pub fn shader_path(&self) -> String {
        format!("{}/PBRShader", self.path())
    }
}

/// The root transform of the scene.
#[derive(Clone, Debug, PartialEq)]
pub struct RootPrim {
    pub name: String,
}

impl Default for RootPrim {
    fn default() -> Self {
        Self {
            name: ROOT_NAME.to_string(),
        }
    }
}

impl RootPrim {
    pub fn path(&self) -> String {
        format!("/{}", self.name)
    }
}

/// One mesh prim, ready to be written.
#[derive(Clone, Debug)]
pub struct MeshPrim {
    /// `Mesh_<i>`, where `i` is the source mesh index in the asset
    pub name: String,

    /// Absolute prim path
    pub path: String,

    pub points: Vec<Vec3>,

    /// Vertices per face; always 3
    pub face_vertex_counts: Vec<i32>,

    pub face_vertex_indices: Vec<i32>,

    /// Per-vertex normals (`vertex` interpolation)
    pub normals: Option<Vec<Vec3>>,

    /// Per-vertex display color (`vertex` interpolation)
    pub display_color: Option<Vec<Vec3>>,

    /// Bounds of `points`
    pub extent: Aabb,

    /// Bound material; the same instance as [`SceneGraph::material`]
    pub material: Arc<PreviewMaterial>,
}

impl MeshPrim {
    pub fn triangle_count(&self) -> usize {
        self.face_vertex_counts.len()
    }
}

/// The complete scene for one conversion.
#[derive(Clone, Debug)]
pub struct SceneGraph {
    pub root: RootPrim,

    /// The one material every mesh prim is bound to
    pub material: Arc<PreviewMaterial>,

    pub mesh_prims: Vec<MeshPrim>,

    /// Reader diagnostics followed by builder diagnostics
    pub diagnostics: Vec<Diagnostic>,
}

impl SceneGraph {
    /// Build a scene with the default material.
    pub fn from_asset(asset: GlbAsset) -> Self {
        build(asset, PreviewMaterial::default())
    }

    pub fn mesh_count(&self) -> usize {
        self.mesh_prims.len()
    }

    /// Total triangle count across all mesh prims.
    pub fn triangle_count(&self) -> usize {
        self.mesh_prims.iter().map(MeshPrim::triangle_count).sum()
    }

    /// Bounds of every mesh prim together.
    pub fn bounds(&self) -> Aabb {
        self.mesh_prims
            .iter()
            .fold(Aabb::empty(), |acc, prim| Aabb::surrounding(&acc, &prim.extent))
    }
}

/// Map a [`GlbAsset`] onto a [`SceneGraph`]. Never fails.
///
/// Meshes with neither vertices nor faces, or with non-finite points, are
/// skipped. Non-finite normals and vertex colors that do not line up with the
/// points are dropped. Each leaves a diagnostic.
pub fn build(asset: GlbAsset, material: PreviewMaterial) -> SceneGraph {
    let GlbAsset {
        meshes,
        mut diagnostics,
    } = asset;

    let root = RootPrim::default();
    let material = Arc::new(material);
    let mut mesh_prims = Vec::with_capacity(meshes.len());

    for (index, mesh) in meshes.into_iter().enumerate() {
        let name = format!("Mesh_{index}");

        if mesh.is_empty() {
            diagnostics.push(Diagnostic::skipped_mesh(
                name,
                format!("{} has no vertices and no faces", mesh.name),
            ));
            continue;
        }

        if !mesh.vertices.iter().all(|v| v.is_finite()) {
            diagnostics.push(Diagnostic::skipped_mesh(
                name,
                format!("{} has non-finite points", mesh.name),
            ));
            continue;
        }

        let path = format!("{}/{}", root.path(), name);
        mesh_prims.push(mesh_prim(mesh, name, path, &material, &mut diagnostics));
    }

    log::debug!(
        "Built scene: {} mesh prims, {} diagnostics",
        mesh_prims.len(),
        diagnostics.len()
    );

    SceneGraph {
        root,
        material,
        mesh_prims,
        diagnostics,
    }
}

fn mesh_prim(
    mesh: MeshData,
    name: String,
    path: String,
    material: &Arc<PreviewMaterial>,
    diagnostics: &mut Vec<Diagnostic>,
) -> MeshPrim {
    let face_vertex_indices = mesh.flattened_indices();
    let extent = mesh.bounds();
    let vertex_count = mesh.vertex_count();

    let display_color = match mesh.vertex_colors {
        Some(colors) if colors.len() != vertex_count => {
            diagnostics.push(Diagnostic::skipped_attribute(
                name.as_str(),
                format!(
                    "{} vertex colors for {} points, displayColor omitted",
                    colors.len(),
                    vertex_count
                ),
            ));
            None
        }
        Some(colors) if !colors.iter().all(|c| c.is_finite()) => {
            diagnostics.push(Diagnostic::skipped_attribute(
                name.as_str(),
                "non-finite vertex color, displayColor omitted",
            ));
            None
        }
        colors => colors,
    };

    let normals = match mesh.normals {
        Some(normals) if !normals.iter().all(|n| n.is_finite()) => {
            diagnostics.push(Diagnostic::skipped_attribute(
                name.as_str(),
                "non-finite normal, normals omitted",
            ));
            None
        }
        normals => normals,
    };

    MeshPrim {
        face_vertex_counts: vec![3; mesh.faces.len()],
        face_vertex_indices,
        points: mesh.vertices,
        normals,
        display_color,
        extent,
        material: Arc::clone(material),
        name,
        path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;

    fn triangle(name: &str) -> MeshData {
        MeshData::new(
            name,
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![[0, 1, 2]],
            None,
            None,
        )
        .unwrap()
    }

    fn asset(meshes: Vec<MeshData>) -> GlbAsset {
        GlbAsset {
            meshes,
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn test_meshes_share_one_material() {
        let scene = SceneGraph::from_asset(asset(vec![
            triangle("a"),
            triangle("b"),
            triangle("c"),
        ]));

        assert_eq!(scene.mesh_count(), 3);
        for prim in &scene.mesh_prims {
            assert!(Arc::ptr_eq(&prim.material, &scene.material));
        }
        // One owner for the scene plus one per prim
        assert_eq!(Arc::strong_count(&scene.material), 4);
    }

    #[test]
    fn test_prim_names_and_topology() {
        let scene = SceneGraph::from_asset(asset(vec![triangle("a"), triangle("b")]));
        let prim = &scene.mesh_prims[1];

        assert_eq!(prim.name, "Mesh_1");
        assert_eq!(prim.path, "/Root/Mesh_1");
        assert_eq!(prim.face_vertex_counts, vec![3]);
        assert_eq!(prim.face_vertex_indices, vec![0, 1, 2]);
        assert_eq!(prim.extent.max(), Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_empty_asset_still_has_root_and_material() {
        let scene = SceneGraph::from_asset(GlbAsset::new());

        assert_eq!(scene.root.path(), "/Root");
        assert_eq!(scene.material.path(), "/Root/Material");
        assert_eq!(*scene.material, PreviewMaterial::default());
        assert!(scene.mesh_prims.is_empty());
        assert!(scene.bounds().is_empty());
    }

    #[test]
    fn test_empty_mesh_is_skipped_and_indices_keep_source_position() {
        let empty = MeshData::new("empty", vec![], vec![], None, None).unwrap();
        let scene = SceneGraph::from_asset(asset(vec![empty, triangle("b")]));

        assert_eq!(scene.mesh_count(), 1);
        assert_eq!(scene.mesh_prims[0].name, "Mesh_1");
        assert_eq!(scene.diagnostics.len(), 1);
        assert_eq!(scene.diagnostics[0].kind, DiagnosticKind::SkippedMesh);
    }

    #[test]
    fn test_points_without_faces_are_kept() {
        let points = MeshData::new("cloud", vec![Vec3::ONE], vec![], None, None).unwrap();
        let scene = SceneGraph::from_asset(asset(vec![points]));

        assert_eq!(scene.mesh_count(), 1);
        assert_eq!(scene.triangle_count(), 0);
    }

    #[test]
    fn test_mismatched_colors_are_omitted() {
        let mut mesh = triangle("a");
        mesh.vertex_colors = Some(vec![Vec3::X; 2]);
        let scene = SceneGraph::from_asset(asset(vec![mesh]));

        assert!(scene.mesh_prims[0].display_color.is_none());
        assert_eq!(scene.diagnostics[0].kind, DiagnosticKind::SkippedAttribute);
    }

    #[test]
    fn test_colors_and_normals_carried() {
        let mut mesh = triangle("a");
        mesh.vertex_colors = Some(vec![Vec3::X, Vec3::Y, Vec3::Z]);
        mesh.normals = Some(vec![Vec3::Z; 3]);
        let scene = SceneGraph::from_asset(asset(vec![mesh]));

        let prim = &scene.mesh_prims[0];
        assert_eq!(prim.display_color.as_ref().unwrap()[2], Vec3::Z);
        assert_eq!(prim.normals.as_ref().unwrap().len(), 3);
        assert!(scene.diagnostics.is_empty());
    }

    #[test]
    fn test_non_finite_points_skip_the_mesh() {
        let mut mesh = triangle("a");
        mesh.vertices[0].x = f32::NAN;
        let scene = SceneGraph::from_asset(asset(vec![mesh, triangle("b")]));

        assert_eq!(scene.mesh_count(), 1);
        assert_eq!(scene.mesh_prims[0].name, "Mesh_1");
        assert_eq!(scene.diagnostics[0].kind, DiagnosticKind::SkippedMesh);
        assert_eq!(scene.diagnostics[0].subject, "Mesh_0");
    }

    #[test]
    fn test_non_finite_normals_are_omitted() {
        let mut mesh = triangle("a");
        mesh.normals = Some(vec![Vec3::Z, Vec3::new(0.0, f32::INFINITY, 0.0), Vec3::Z]);
        let scene = SceneGraph::from_asset(asset(vec![mesh]));

        assert_eq!(scene.mesh_count(), 1);
        assert!(scene.mesh_prims[0].normals.is_none());
        assert_eq!(scene.diagnostics[0].kind, DiagnosticKind::SkippedAttribute);
    }

    #[test]
    fn test_custom_material() {
        let material = PreviewMaterial {
            diffuse_color: Vec3::new(1.0, 0.0, 0.0),
            ..Default::default()
        };
        let scene = build(asset(vec![triangle("a")]), material);

        assert_eq!(scene.mesh_prims[0].material.diffuse_color, Vec3::X);
    }
}
