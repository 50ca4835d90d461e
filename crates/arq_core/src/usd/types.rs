//! USD primitive types for intermediate representation.
//!
//! These types represent prims read back from a USDA layer. They cover the
//! subset the writer produces: transforms, meshes, preview materials.

use std::collections::BTreeMap;
use std::fmt;

use arq_math::Vec3;

/// A parsed USD prim (generic container).
#[derive(Clone, Debug, PartialEq)]
pub enum UsdPrim {
    /// A transform node
    Xform(UsdXform),

    /// A mesh geometry
    Mesh(UsdMesh),

    /// A material with its surface shader
    Material(UsdMaterial),

    /// An unknown or unsupported prim type
    Unknown(String),
}

impl UsdPrim {
    /// Prim path, `None` for unknown prims.
    pub fn path(&self) -> Option<&str> {
        match self {
            UsdPrim::Xform(x) => Some(&x.path),
            UsdPrim::Mesh(m) => Some(&m.path),
            UsdPrim::Material(m) => Some(&m.path),
            UsdPrim::Unknown(_) => None,
        }
    }

    /// Direct children (only transforms have any).
    pub fn children(&self) -> &[UsdPrim] {
        match self {
            UsdPrim::Xform(x) => &x.children,
            _ => &[],
        }
    }
}

/// A USD Xform (transform) prim.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UsdXform {
    /// Prim path (e.g., "/Root")
    pub path: String,

    /// Prim name (last component of path)
    pub name: String,

    /// Model kind from prim metadata, e.g. "component"
    pub kind: Option<String>,

    /// Child prims
    pub children: Vec<UsdPrim>,
}

/// A USD Mesh prim.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UsdMesh {
    /// Prim path
    pub path: String,

    /// Prim name
    pub name: String,

    /// Applied API schemas, e.g. "MaterialBindingAPI"
    pub api_schemas: Vec<String>,

    /// Vertex positions
    pub points: Vec<Vec3>,

    /// Number of vertices per face
    pub face_vertex_counts: Vec<i32>,

    /// Vertex indices for each face
    pub face_vertex_indices: Vec<i32>,

    /// Vertex normals (optional)
    pub normals: Option<Vec<Vec3>>,

    /// Interpolation declared on the normals
    pub normals_interpolation: Option<String>,

    /// `primvars:displayColor` values
    pub display_color: Option<Vec<Vec3>>,

    /// Min and max corner
    pub extent: Option<[Vec3; 2]>,

    /// Target of `rel material:binding`
    pub material_binding: Option<String>,

    pub subdivision_scheme: Option<String>,
}

/// A value assigned to a shader input.
#[derive(Clone, Debug, PartialEq)]
pub enum ShaderInput {
    Float(f32),
    Color(Vec3),
}

/// A USD Shader prim.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UsdShader {
    pub path: String,
    pub name: String,

    /// `info:id`, e.g. "UsdPreviewSurface"
    pub id: Option<String>,

    /// Constant inputs by name, without the `inputs:` prefix
    pub inputs: BTreeMap<String, ShaderInput>,
}

impl UsdShader {
    pub fn float_input(&self, name: &str) -> Option<f32> {
        match self.inputs.get(name) {
            Some(ShaderInput::Float(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn color_input(&self, name: &str) -> Option<Vec3> {
        match self.inputs.get(name) {
            Some(ShaderInput::Color(v)) => Some(*v),
            _ => None,
        }
    }
}

/// A USD Material prim.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UsdMaterial {
    pub path: String,
    pub name: String,

    /// Connection source of `outputs:surface`
    pub surface: Option<String>,

    /// Shader children
    pub shaders: Vec<UsdShader>,
}

impl UsdMaterial {
    /// The shader `outputs:surface` connects to.
    pub fn surface_shader(&self) -> Option<&UsdShader> {
        let surface = self.surface.as_deref()?;
        let shader_path = surface.split('.').next()?;
        self.shaders.iter().find(|s| s.path == shader_path)
    }
}

/// Layer-level metadata from the header block.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayerMetadata {
    pub default_prim: Option<String>,
    pub up_axis: Option<String>,
    pub meters_per_unit: Option<f64>,
}

/// A parsed USDA layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UsdLayer {
    pub metadata: LayerMetadata,

    /// Root prims
    pub prims: Vec<UsdPrim>,
}

impl UsdLayer {
    /// Find a prim by absolute path.
    pub fn find_prim(&self, path: &str) -> Option<&UsdPrim> {
        fn find<'a>(prims: &'a [UsdPrim], path: &str) -> Option<&'a UsdPrim> {
            prims.iter().find_map(|prim| {
                if prim.path() == Some(path) {
                    Some(prim)
                } else {
                    find(prim.children(), path)
                }
            })
        }
        find(&self.prims, path)
    }

    /// The prim named by `defaultPrim`, if it exists.
    pub fn default_prim(&self) -> Option<&UsdPrim> {
        let name = self.metadata.default_prim.as_deref()?;
        self.find_prim(&format!("/{name}"))
    }

    /// Every mesh in the layer, depth first.
    pub fn meshes(&self) -> Vec<&UsdMesh> {
        let mut out = Vec::new();
        collect(&self.prims, &mut |prim| {
            if let UsdPrim::Mesh(mesh) = prim {
                out.push(mesh);
            }
        });
        out
    }

    /// Every material in the layer, depth first.
    pub fn materials(&self) -> Vec<&UsdMaterial> {
        let mut out = Vec::new();
        collect(&self.prims, &mut |prim| {
            if let UsdPrim::Material(material) = prim {
                out.push(material);
            }
        });
        out
    }

    /// Counts and material values, for display and comparison.
    pub fn summary(&self) -> SceneSummary {
        let meshes = self
            .meshes()
            .into_iter()
            .map(|mesh| MeshSummary {
                path: mesh.path.clone(),
                point_count: mesh.points.len(),
                face_count: mesh.face_vertex_counts.len(),
                has_normals: mesh.normals.is_some(),
                has_display_color: mesh.display_color.is_some(),
                material: mesh.material_binding.clone(),
            })
            .collect();

        let materials = self
            .materials()
            .into_iter()
            .map(|material| {
                let shader = material.surface_shader();
                MaterialSummary {
                    path: material.path.clone(),
                    shader_id: shader.and_then(|s| s.id.clone()),
                    diffuse_color: shader.and_then(|s| s.color_input("diffuseColor")),
                    roughness: shader.and_then(|s| s.float_input("roughness")),
                    metallic: shader.and_then(|s| s.float_input("metallic")),
                }
            })
            .collect();

        SceneSummary {
            default_prim: self.metadata.default_prim.clone(),
            up_axis: self.metadata.up_axis.clone(),
            meters_per_unit: self.metadata.meters_per_unit,
            meshes,
            materials,
        }
    }
}

fn collect<'a>(prims: &'a [UsdPrim], visit: &mut impl FnMut(&'a UsdPrim)) {
    for prim in prims {
        visit(prim);
        collect(prim.children(), visit);
    }
}

/// Per-mesh counts.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshSummary {
    pub path: String,
    pub point_count: usize,
    pub face_count: usize,
    pub has_normals: bool,
    pub has_display_color: bool,
    pub material: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MaterialSummary {
    pub path: String,
    pub shader_id: Option<String>,
    pub diffuse_color: Option<Vec3>,
    pub roughness: Option<f32>,
    pub metallic: Option<f32>,
}

/// What a layer contains, without the geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneSummary {
    pub default_prim: Option<String>,
    pub up_axis: Option<String>,
    pub meters_per_unit: Option<f64>,
    pub meshes: Vec<MeshSummary>,
    pub materials: Vec<MaterialSummary>,
}

impl fmt::Display for SceneSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn or_unset<T: fmt::Display>(value: &Option<T>) -> String {
            value.as_ref().map_or_else(|| "(unset)".to_string(), T::to_string)
        }

        writeln!(f, "defaultPrim:   {}", or_unset(&self.default_prim))?;
        writeln!(f, "upAxis:        {}", or_unset(&self.up_axis))?;
        writeln!(f, "metersPerUnit: {}", or_unset(&self.meters_per_unit))?;

        writeln!(f, "Meshes: {}", self.meshes.len())?;
        for mesh in &self.meshes {
            writeln!(
                f,
                "  {} - {} points, {} faces{}{} -> {}",
                mesh.path,
                mesh.point_count,
                mesh.face_count,
                if mesh.has_normals { ", normals" } else { "" },
                if mesh.has_display_color { ", displayColor" } else { "" },
                or_unset(&mesh.material)
            )?;
        }

        writeln!(f, "Materials: {}", self.materials.len())?;
        for material in &self.materials {
            let diffuse = material
                .diffuse_color
                .map(|c| format!("({}, {}, {})", c.x, c.y, c.z));
            writeln!(
                f,
                "  {} [{}] diffuse {} roughness {} metallic {}",
                material.path,
                or_unset(&material.shader_id),
                or_unset(&diffuse),
                or_unset(&material.roughness),
                or_unset(&material.metallic)
            )?;
        }

        Ok(())
    }
}
