//! GLB byte buffers for tests.

use serde_json::{json, Value};

use super::{GLB_CHUNK_BIN, GLB_CHUNK_JSON, GLB_MAGIC};

/// Wrap a JSON document and binary buffer into a GLB container.
///
/// The JSON chunk is padded with spaces and the BIN chunk with zeros. An empty
/// `bin` omits the BIN chunk.
pub fn encode_glb(json: &[u8], bin: &[u8]) -> Vec<u8> {
    let mut json = json.to_vec();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    let mut bin = bin.to_vec();
    while bin.len() % 4 != 0 {
        bin.push(0);
    }

    let mut total = 12 + 8 + json.len();
    if !bin.is_empty() {
        total += 8 + bin.len();
    }

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());

    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(&GLB_CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(&json);

    if !bin.is_empty() {
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(&GLB_CHUNK_BIN.to_le_bytes());
        out.extend_from_slice(&bin);
    }

    out
}

/// Assembles a small glTF document with its binary buffer.
#[derive(Default)]
pub struct GlbBuilder {
    bin: Vec<u8>,
    buffer_views: Vec<Value>,
    accessors: Vec<Value>,
    meshes: Vec<Value>,
    extensions_required: Vec<String>,
}

impl GlbBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_view(&mut self, bytes: &[u8]) -> usize {
        while self.bin.len() % 4 != 0 {
            self.bin.push(0);
        }
        self.buffer_views.push(json!({
            "buffer": 0,
            "byteOffset": self.bin.len(),
            "byteLength": bytes.len(),
        }));
        self.bin.extend_from_slice(bytes);
        self.buffer_views.len() - 1
    }

    fn push_accessor(&mut self, accessor: Value) -> usize {
        self.accessors.push(accessor);
        self.accessors.len() - 1
    }

    /// Float VEC3 accessor with min/max, as POSITION requires.
    pub fn positions(&mut self, values: &[[f32; 3]]) -> usize {
        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];
        for v in values {
            for axis in 0..3 {
                min[axis] = min[axis].min(v[axis]);
                max[axis] = max[axis].max(v[axis]);
            }
        }

        let bytes: Vec<u8> = values.iter().flatten().flat_map(|f| f.to_le_bytes()).collect();
        let view = self.push_view(&bytes);
        self.push_accessor(json!({
            "bufferView": view,
            "componentType": 5126,
            "count": values.len(),
            "type": "VEC3",
            "min": min,
            "max": max,
        }))
    }

    /// Float VEC3 accessor without bounds (normals, float colors).
    pub fn vec3(&mut self, values: &[[f32; 3]]) -> usize {
        let bytes: Vec<u8> = values.iter().flatten().flat_map(|f| f.to_le_bytes()).collect();
        let view = self.push_view(&bytes);
        self.push_accessor(json!({
            "bufferView": view,
            "componentType": 5126,
            "count": values.len(),
            "type": "VEC3",
        }))
    }

    pub fn indices_u16(&mut self, values: &[u16]) -> usize {
        let bytes: Vec<u8> = values.iter().flat_map(|i| i.to_le_bytes()).collect();
        let view = self.push_view(&bytes);
        self.push_accessor(json!({
            "bufferView": view,
            "componentType": 5123,
            "count": values.len(),
            "type": "SCALAR",
        }))
    }

    pub fn indices_u32(&mut self, values: &[u32]) -> usize {
        let bytes: Vec<u8> = values.iter().flat_map(|i| i.to_le_bytes()).collect();
        let view = self.push_view(&bytes);
        self.push_accessor(json!({
            "bufferView": view,
            "componentType": 5125,
            "count": values.len(),
            "type": "SCALAR",
        }))
    }

    /// Normalized u8 RGBA colors.
    pub fn colors_u8(&mut self, values: &[[u8; 4]]) -> usize {
        let bytes: Vec<u8> = values.iter().flatten().copied().collect();
        let view = self.push_view(&bytes);
        self.push_accessor(json!({
            "bufferView": view,
            "componentType": 5121,
            "normalized": true,
            "count": values.len(),
            "type": "VEC4",
        }))
    }

    /// A primitive JSON object; `attributes` maps semantics to accessors.
    pub fn primitive(attributes: &[(&str, usize)], indices: Option<usize>, mode: Option<u32>) -> Value {
        let attributes: serde_json::Map<String, Value> = attributes
            .iter()
            .map(|(name, index)| (name.to_string(), json!(index)))
            .collect();

        let mut primitive = json!({ "attributes": attributes });
        if let Some(indices) = indices {
            primitive["indices"] = json!(indices);
        }
        if let Some(mode) = mode {
            primitive["mode"] = json!(mode);
        }
        primitive
    }

    pub fn mesh(&mut self, name: Option<&str>, primitives: Vec<Value>) -> &mut Self {
        let mut mesh = json!({ "primitives": primitives });
        if let Some(name) = name {
            mesh["name"] = json!(name);
        }
        self.meshes.push(mesh);
        self
    }

    /// Add a triangle mesh with POSITION and indices only.
    pub fn triangle_mesh(&mut self, name: &str, positions: &[[f32; 3]], indices: &[u16]) -> &mut Self {
        let position = self.positions(positions);
        let index = self.indices_u16(indices);
        let primitive = Self::primitive(&[("POSITION", position)], Some(index), None);
        self.mesh(Some(name), vec![primitive])
    }

    pub fn require_extension(&mut self, name: &str) -> &mut Self {
        self.extensions_required.push(name.to_string());
        self
    }

    /// The document as JSON, without the binary buffer.
    pub fn document(&self) -> Value {
        let mut doc = json!({ "asset": { "version": "2.0" } });
        if !self.meshes.is_empty() {
            doc["meshes"] = json!(self.meshes);
        }
        if !self.accessors.is_empty() {
            doc["accessors"] = json!(self.accessors);
            doc["bufferViews"] = json!(self.buffer_views);
        }
        if !self.bin.is_empty() {
            doc["buffers"] = json!([{ "byteLength": self.bin.len() }]);
        }
        if !self.extensions_required.is_empty() {
            doc["extensionsUsed"] = json!(self.extensions_required);
            doc["extensionsRequired"] = json!(self.extensions_required);
        }
        doc
    }

    pub fn build(&self) -> Vec<u8> {
        let json = serde_json::to_vec(&self.document()).unwrap();
        encode_glb(&json, &self.bin)
    }
}

pub const TRIANGLE: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];

/// A minimal valid GLB holding one indexed triangle.
pub fn triangle_glb() -> Vec<u8> {
    GlbBuilder::new()
        .triangle_mesh("Triangle", &TRIANGLE, &[0, 1, 2])
        .build()
}

/// A valid GLB with no meshes at all.
pub fn empty_glb() -> Vec<u8> {
    GlbBuilder::new().build()
}
