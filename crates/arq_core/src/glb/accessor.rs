//! Accessor decoding for the built-in reader.
//!
//! Every read is bounds-checked against both the buffer view and the buffer;
//! nothing here panics on malformed input.

use arq_math::Vec3;

use super::document::{
    component_size, Accessor, Document, COMPONENT_FLOAT, COMPONENT_UNSIGNED_BYTE,
    COMPONENT_UNSIGNED_INT, COMPONENT_UNSIGNED_SHORT,
};
use super::{GlbError, GlbResult};

/// Resolves accessors of one document against its loaded buffers.
pub struct Accessors<'a> {
    document: &'a Document,
    /// Buffer data by index; `None` for buffers that could not be resolved
    buffers: Vec<Option<&'a [u8]>>,
}

/// A validated strided window over one accessor's elements.
struct ElementView<'a> {
    data: &'a [u8],
    start: usize,
    stride: usize,
    count: usize,
    component_type: u32,
    component_size: usize,
    components: usize,
}

impl<'a> ElementView<'a> {
    fn offset(&self, element: usize, component: usize) -> usize {
        self.start + element * self.stride + component * self.component_size
    }

    fn read_u32(&self, element: usize, component: usize) -> u32 {
        let at = self.offset(element, component);
        let b = &self.data[at..at + self.component_size];
        match self.component_size {
            1 => b[0] as u32,
            2 => u16::from_le_bytes([b[0], b[1]]) as u32,
            _ => u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
        }
    }

    fn read_f32(&self, element: usize, component: usize) -> f32 {
        let at = self.offset(element, component);
        let b = &self.data[at..at + 4];
        f32::from_le_bytes([b[0], b[1], b[2], b[3]])
    }

    /// Read a component as a float in [0, 1], normalizing unsigned integers.
    fn read_unorm(&self, element: usize, component: usize) -> f32 {
        match self.component_type {
            COMPONENT_FLOAT => self.read_f32(element, component),
            COMPONENT_UNSIGNED_BYTE => self.read_u32(element, component) as f32 / 255.0,
            _ => self.read_u32(element, component) as f32 / 65535.0,
        }
    }
}

impl<'a> Accessors<'a> {
    pub fn new(document: &'a Document, buffers: Vec<Option<&'a [u8]>>) -> Self {
        Self { document, buffers }
    }

    fn accessor(&self, index: usize) -> GlbResult<&'a Accessor> {
        self.document
            .accessors
            .get(index)
            .ok_or_else(|| GlbError::InvalidFormat(format!("accessor {index} does not exist")))
    }

    fn view(&self, index: usize) -> GlbResult<ElementView<'a>> {
        let accessor = self.accessor(index)?;

        if accessor.sparse.is_some() {
            return Err(GlbError::UnsupportedFeature(format!(
                "accessor {index} is sparse"
            )));
        }

        let components = accessor.components().ok_or_else(|| {
            GlbError::UnsupportedFeature(format!(
                "accessor {index} has type {}",
                accessor.accessor_type
            ))
        })?;
        let component_size = component_size(accessor.component_type).ok_or_else(|| {
            GlbError::InvalidFormat(format!(
                "accessor {index} has unknown component type {}",
                accessor.component_type
            ))
        })?;

        let view_index = accessor.buffer_view.ok_or_else(|| {
            GlbError::UnsupportedFeature(format!("accessor {index} has no bufferView"))
        })?;
        let view = self.document.buffer_views.get(view_index).ok_or_else(|| {
            GlbError::InvalidFormat(format!("bufferView {view_index} does not exist"))
        })?;
        let data = self
            .buffers
            .get(view.buffer)
            .copied()
            .flatten()
            .ok_or_else(|| {
                GlbError::UnsupportedFeature(format!(
                    "buffer {} is not embedded in the GLB",
                    view.buffer
                ))
            })?;

        let element_size = components * component_size;
        let stride = view.byte_stride.unwrap_or(element_size);
        if stride < element_size {
            return Err(GlbError::InvalidFormat(format!(
                "bufferView {view_index} stride {stride} is smaller than element size {element_size}"
            )));
        }

        let too_large = || GlbError::InvalidFormat(format!("accessor {index} is too large"));
        let start = view
            .byte_offset
            .checked_add(accessor.byte_offset)
            .ok_or_else(too_large)?;
        let needed = match accessor.count {
            0 => 0,
            n => (n - 1)
                .checked_mul(stride)
                .and_then(|s| s.checked_add(element_size))
                .ok_or_else(too_large)?,
        };
        let view_end = view
            .byte_offset
            .checked_add(view.byte_length)
            .ok_or_else(|| GlbError::InvalidFormat(format!("bufferView {view_index} is too large")))?;
        let accessor_end = accessor.byte_offset.checked_add(needed).ok_or_else(too_large)?;
        if accessor_end > view.byte_length || view_end > data.len() {
            return Err(GlbError::InvalidFormat(format!(
                "accessor {index} reads past the end of its buffer"
            )));
        }

        Ok(ElementView {
            data,
            start,
            stride,
            count: accessor.count,
            component_type: accessor.component_type,
            component_size,
            components,
        })
    }

    /// Read a float VEC3 accessor (positions, normals).
    pub fn read_vec3(&self, index: usize) -> GlbResult<Vec<Vec3>> {
        let view = self.view(index)?;
        if view.components != 3 || view.component_type != COMPONENT_FLOAT {
            return Err(GlbError::UnsupportedFeature(format!(
                "accessor {index} is not a float VEC3 (component type {})",
                view.component_type
            )));
        }

        Ok((0..view.count)
            .map(|i| Vec3::new(view.read_f32(i, 0), view.read_f32(i, 1), view.read_f32(i, 2)))
            .collect())
    }

    /// Read an index accessor (u8, u16 or u32 scalars).
    pub fn read_indices(&self, index: usize) -> GlbResult<Vec<u32>> {
        let view = self.view(index)?;
        let unsigned = matches!(
            view.component_type,
            COMPONENT_UNSIGNED_BYTE | COMPONENT_UNSIGNED_SHORT | COMPONENT_UNSIGNED_INT
        );
        if view.components != 1 || !unsigned {
            return Err(GlbError::UnsupportedFeature(format!(
                "accessor {index} is not an unsigned scalar index list"
            )));
        }

        Ok((0..view.count).map(|i| view.read_u32(i, 0)).collect())
    }

    /// Read a COLOR_n accessor as RGB in [0, 1]; alpha is dropped.
    pub fn read_colors(&self, index: usize) -> GlbResult<Vec<Vec3>> {
        let view = self.view(index)?;
        let supported_type = matches!(
            view.component_type,
            COMPONENT_FLOAT | COMPONENT_UNSIGNED_BYTE | COMPONENT_UNSIGNED_SHORT
        );
        if !(view.components == 3 || view.components == 4) || !supported_type {
            return Err(GlbError::UnsupportedFeature(format!(
                "accessor {index} is not an RGB/RGBA color (component type {})",
                view.component_type
            )));
        }

        Ok((0..view.count)
            .map(|i| {
                Vec3::new(view.read_unorm(i, 0), view.read_unorm(i, 1), view.read_unorm(i, 2))
                    .clamp(Vec3::ZERO, Vec3::ONE)
            })
            .collect())
    }
}
