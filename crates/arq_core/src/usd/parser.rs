//! USDA (ASCII) layer parser.
//!
//! Line-by-line parsing of the USDA subset the writer emits, so a packaged
//! layer can be read back, inspected and validated.
//!
//! # Supported Syntax
//!
//! - `#usda 1.0` header with a `( ... )` layer metadata block
//! - `def Xform|Scope|Mesh|Material|Shader "Name" (metadata) { ... }`
//! - `point3f[] points`, `normal3f[] normals`, `float3[] extent`
//! - `int[] faceVertexCounts`, `int[] faceVertexIndices`
//! - `color3f[] primvars:displayColor` with `(interpolation = "...")`
//! - `rel material:binding = </Path>`
//! - `token outputs:surface.connect = </Path.outputs:surface>`
//! - `uniform token info:id`, `float inputs:*`, `color3f inputs:*`
//!
//! Other prim types are skipped as [`UsdPrim::Unknown`]; unknown attributes
//! are ignored.

use std::collections::VecDeque;

use arq_math::Vec3;
use thiserror::Error;

use super::types::*;

/// Errors that can occur during USDA parsing.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Unexpected end of file")]
    UnexpectedEof,

    #[error("Invalid number format: {0}")]
    InvalidNumber(String),

    #[error("Unclosed block starting at line {0}")]
    UnclosedBlock(usize),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Metadata entries from a `( ... )` block, in order.
type Metadata = Vec<(String, String)>;

/// USDA layer parser.
pub struct UsdaParser {
    lines: VecDeque<(usize, String)>,
    current_line: usize,
}

impl UsdaParser {
    /// Create a new parser from layer contents.
    pub fn new(content: &str) -> Self {
        let lines: VecDeque<_> = content
            .lines()
            .enumerate()
            .map(|(i, s)| (i + 1, s.to_string()))
            .collect();

        Self {
            lines,
            current_line: 0,
        }
    }

    /// Parse the header, layer metadata and root prims.
    pub fn parse(&mut self) -> ParseResult<UsdLayer> {
        let metadata = self.parse_header()?;

        let mut prims = Vec::new();
        while !self.lines.is_empty() {
            if let Some(prim) = self.parse_prim("")? {
                prims.push(prim);
            } else if let Some((num, line)) = self.lines.front() {
                // A stray closing brace at the root
                if line.trim() == "}" {
                    return Err(ParseError::Parse {
                        line: *num,
                        message: "Unmatched '}'".to_string(),
                    });
                }
            }
        }

        Ok(UsdLayer { metadata, prims })
    }

    /// Check the `#usda` magic line and read the optional metadata block.
    fn parse_header(&mut self) -> ParseResult<LayerMetadata> {
        let (num, first) = self.lines.pop_front().ok_or(ParseError::UnexpectedEof)?;
        if !first.trim_start().starts_with("#usda ") {
            return Err(ParseError::Parse {
                line: num,
                message: "Missing '#usda' header".to_string(),
            });
        }

        self.skip_blank_lines();

        let mut metadata = LayerMetadata::default();
        let opens_block = matches!(self.lines.front(), Some((_, line)) if line.trim().starts_with('('));
        if !opens_block {
            return Ok(metadata);
        }

        let (num, line) = self.lines.pop_front().ok_or(ParseError::UnexpectedEof)?;
        self.current_line = num;
        let after_paren = line.trim().strip_prefix('(').unwrap_or_default().to_string();

        for (key, value) in self.parse_metadata_block(&after_paren)? {
            match key.as_str() {
                "defaultPrim" => metadata.default_prim = Some(unquote(&value).to_string()),
                "upAxis" => metadata.up_axis = Some(unquote(&value).to_string()),
                "metersPerUnit" => {
                    metadata.meters_per_unit = Some(
                        value
                            .parse::<f64>()
                            .map_err(|_| ParseError::InvalidNumber(value.clone()))?,
                    );
                }
                other => log::debug!("Ignoring layer metadata {}", other),
            }
        }

        Ok(metadata)
    }

    fn skip_blank_lines(&mut self) {
        while let Some((_, line)) = self.lines.front() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                self.lines.pop_front();
            } else {
                break;
            }
        }
    }

    /// Parse a single prim and its children.
    fn parse_prim(&mut self, parent_path: &str) -> ParseResult<Option<UsdPrim>> {
        // Get next non-empty line
        let (line_num, line) = loop {
            match self.lines.pop_front() {
                Some((num, line)) => {
                    let trimmed = line.trim();
                    if !trimmed.is_empty() && !trimmed.starts_with('#') {
                        self.current_line = num;
                        break (num, line);
                    }
                }
                None => return Ok(None),
            }
        };

        let trimmed = line.trim();

        // Check for closing brace
        if trimmed == "}" {
            // Put it back for the caller to handle
            self.lines.push_front((line_num, line));
            return Ok(None);
        }

        if trimmed.starts_with("def ") {
            return self.parse_def(trimmed, parent_path, line_num);
        }

        // Skip other lines (attributes are parsed within prim blocks)
        Ok(None)
    }

    /// Parse a `def Type "Name"` block.
    fn parse_def(
        &mut self,
        line: &str,
        parent_path: &str,
        start_line: usize,
    ) -> ParseResult<Option<UsdPrim>> {
        let rest = line.strip_prefix("def ").unwrap_or(line);
        let prim_type = rest.split_whitespace().next().unwrap_or("");

        let name = quoted(rest).ok_or_else(|| ParseError::Parse {
            line: start_line,
            message: format!("Prim without a quoted name: {}", line),
        })?;

        let path = if parent_path.is_empty() {
            format!("/{}", name)
        } else {
            format!("{}/{}", parent_path, name)
        };

        // Metadata: on the def line, started on the def line, or on the next line
        let head = line.split('{').next().unwrap_or(line);
        let metadata = match head.find('(') {
            Some(paren) => self.parse_metadata_block(&head[paren + 1..])?,
            None => self.parse_metadata()?,
        };

        // Entire prim on one line: def Type "Name" { }
        if line.contains('{') && line.trim_end().ends_with('}') {
            return Ok(Some(empty_prim(prim_type, &path, name, &metadata)));
        }

        if !line.contains('{') {
            self.expect_opening_brace(start_line)?;
        }

        let prim = match prim_type {
            "Xform" | "Scope" => UsdPrim::Xform(self.parse_xform_content(&path, name, &metadata, start_line)?),
            "Mesh" => UsdPrim::Mesh(self.parse_mesh_content(&path, name, &metadata, start_line)?),
            "Material" => UsdPrim::Material(self.parse_material_content(&path, name, start_line)?),
            _ => {
                // Skip unknown prim types
                self.skip_block(start_line)?;
                UsdPrim::Unknown(prim_type.to_string())
            }
        };

        Ok(Some(prim))
    }

    /// Metadata in parentheses on the line after a `def`.
    fn parse_metadata(&mut self) -> ParseResult<Metadata> {
        let opens = matches!(self.lines.front(), Some((_, line)) if line.trim().starts_with('('));
        if !opens {
            return Ok(Vec::new());
        }

        let (_, line) = self.lines.pop_front().ok_or(ParseError::UnexpectedEof)?;
        let after_paren = line.trim().strip_prefix('(').unwrap_or_default().to_string();
        self.parse_metadata_block(&after_paren)
    }

    /// Read `key = value` entries up to the closing paren.
    ///
    /// `first` is the text after the opening paren; further lines are
    /// consumed until the parens balance.
    fn parse_metadata_block(&mut self, first: &str) -> ParseResult<Metadata> {
        let start_line = self.current_line;
        let mut depth = 1i32;
        let mut body = Vec::new();

        scan_metadata_line(first, &mut depth, &mut body);
        while depth > 0 {
            match self.lines.pop_front() {
                Some((num, line)) => {
                    self.current_line = num;
                    scan_metadata_line(&line, &mut depth, &mut body);
                }
                None => return Err(ParseError::UnclosedBlock(start_line)),
            }
        }

        Ok(body
            .iter()
            .filter_map(|entry| {
                let (key, value) = entry.split_once('=')?;
                let key = key.trim();
                let key = key
                    .strip_prefix("prepend ")
                    .or_else(|| key.strip_prefix("append "))
                    .unwrap_or(key);
                Some((key.trim().to_string(), value.trim().to_string()))
            })
            .collect())
    }

    /// Expect and consume an opening brace.
    fn expect_opening_brace(&mut self, start_line: usize) -> ParseResult<()> {
        self.skip_blank_lines();
        match self.lines.front() {
            Some((_, line)) if line.trim() == "{" => {
                self.lines.pop_front();
                Ok(())
            }
            _ => Err(ParseError::Parse {
                line: start_line,
                message: "Expected opening brace".to_string(),
            }),
        }
    }

    /// Skip a block (consume until matching closing brace).
    fn skip_block(&mut self, start_line: usize) -> ParseResult<()> {
        // Signed: a stray `}}` closes the block instead of underflowing
        let mut depth: i64 = 1;

        while depth > 0 {
            match self.lines.pop_front() {
                Some((_, line)) => {
                    depth += line.matches('{').count() as i64;
                    depth -= line.matches('}').count() as i64;
                }
                None => return Err(ParseError::UnclosedBlock(start_line)),
            }
        }

        Ok(())
    }

    /// Next content line of a block, `None` at its closing brace.
    fn next_block_line(&mut self, start_line: usize) -> ParseResult<Option<(usize, String)>> {
        loop {
            let (line_num, line) = self
                .lines
                .pop_front()
                .ok_or(ParseError::UnclosedBlock(start_line))?;

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if trimmed == "}" {
                return Ok(None);
            }

            self.current_line = line_num;
            return Ok(Some((line_num, line)));
        }
    }

    /// Parse Xform content (children only).
    fn parse_xform_content(
        &mut self,
        path: &str,
        name: &str,
        metadata: &Metadata,
        start_line: usize,
    ) -> ParseResult<UsdXform> {
        let mut xform = UsdXform {
            path: path.to_string(),
            name: name.to_string(),
            kind: metadata_value(metadata, "kind").map(|v| unquote(v).to_string()),
            children: Vec::new(),
        };

        while let Some((line_num, line)) = self.next_block_line(start_line)? {
            if line.trim().starts_with("def ") {
                self.lines.push_front((line_num, line));
                if let Some(child) = self.parse_prim(path)? {
                    xform.children.push(child);
                }
            }
        }

        Ok(xform)
    }

    /// Parse Mesh content.
    fn parse_mesh_content(
        &mut self,
        path: &str,
        name: &str,
        metadata: &Metadata,
        start_line: usize,
    ) -> ParseResult<UsdMesh> {
        let mut mesh = UsdMesh {
            path: path.to_string(),
            name: name.to_string(),
            api_schemas: metadata_value(metadata, "apiSchemas")
                .map(token_list)
                .unwrap_or_default(),
            ..Default::default()
        };

        while let Some((_, line)) = self.next_block_line(start_line)? {
            let trimmed = line.trim();
            if trimmed.starts_with("def ") {
                return Err(ParseError::Parse {
                    line: self.current_line,
                    message: format!("Unexpected child prim in mesh {}", path),
                });
            }

            let Some((attribute, _)) = split_attribute(trimmed) else {
                continue;
            };

            match attribute {
                "points" => mesh.points = self.parse_vec3_array(trimmed)?.0,
                "faceVertexCounts" => mesh.face_vertex_counts = self.parse_int_array(trimmed)?,
                "faceVertexIndices" => mesh.face_vertex_indices = self.parse_int_array(trimmed)?,
                "normals" => {
                    let (normals, interpolation) = self.parse_vec3_array(trimmed)?;
                    mesh.normals = Some(normals);
                    mesh.normals_interpolation = interpolation;
                }
                "primvars:displayColor" => mesh.display_color = Some(self.parse_vec3_array(trimmed)?.0),
                "extent" => {
                    let (corners, _) = self.parse_vec3_array(trimmed)?;
                    let [min, max] = corners[..] else {
                        return Err(ParseError::Parse {
                            line: self.current_line,
                            message: format!("extent needs 2 values, got {}", corners.len()),
                        });
                    };
                    mesh.extent = Some([min, max]);
                }
                "material:binding" => mesh.material_binding = Some(self.parse_rel_target(trimmed)?),
                "subdivisionScheme" => {
                    mesh.subdivision_scheme = self.attribute_value(trimmed).map(|v| unquote(v).to_string())
                }
                _ => {}
            }
        }

        Ok(mesh)
    }

    /// Parse Material content and its Shader children.
    fn parse_material_content(
        &mut self,
        path: &str,
        name: &str,
        start_line: usize,
    ) -> ParseResult<UsdMaterial> {
        let mut material = UsdMaterial {
            path: path.to_string(),
            name: name.to_string(),
            ..Default::default()
        };

        while let Some((line_num, line)) = self.next_block_line(start_line)? {
            let trimmed = line.trim();

            if let Some(rest) = trimmed.strip_prefix("def ") {
                let is_shader = rest.split_whitespace().next() == Some("Shader");
                if !is_shader {
                    self.lines.push_front((line_num, line));
                    // Nested non-shader prims are parsed and dropped
                    self.parse_prim(path)?;
                    continue;
                }

                let shader_name = quoted(rest)
                    .ok_or_else(|| ParseError::Parse {
                        line: line_num,
                        message: format!("Shader without a quoted name: {}", trimmed),
                    })?
                    .to_string();
                if !trimmed.contains('{') {
                    self.parse_metadata()?;
                    self.expect_opening_brace(line_num)?;
                }
                let shader_path = format!("{}/{}", path, shader_name);
                material
                    .shaders
                    .push(self.parse_shader_content(shader_path, shader_name, line_num)?);
                continue;
            }

            if let Some(("outputs:surface.connect", _)) = split_attribute(trimmed) {
                material.surface = Some(self.parse_rel_target(trimmed)?);
            }
        }

        Ok(material)
    }

    fn parse_shader_content(
        &mut self,
        path: String,
        name: String,
        start_line: usize,
    ) -> ParseResult<UsdShader> {
        let mut shader = UsdShader {
            path,
            name,
            ..Default::default()
        };

        while let Some((_, line)) = self.next_block_line(start_line)? {
            let trimmed = line.trim();
            let Some((attribute, value)) = split_attribute(trimmed) else {
                continue;
            };

            if attribute == "info:id" {
                shader.id = value.map(|v| unquote(v).to_string());
                continue;
            }

            let (Some(input), Some(value)) = (attribute.strip_prefix("inputs:"), value) else {
                continue;
            };
            let input_value = if value.starts_with('(') {
                ShaderInput::Color(self.parse_inline_vec3(trimmed)?)
            } else {
                ShaderInput::Float(self.parse_inline_float(trimmed)?)
            };
            shader.inputs.insert(input.to_string(), input_value);
        }

        Ok(shader)
    }

    /// Value text after the `=` of an attribute line.
    fn attribute_value<'a>(&self, line: &'a str) -> Option<&'a str> {
        split_attribute(line).and_then(|(_, value)| value)
    }

    /// Parse an inline Vec3 value like (1, 2, 3).
    fn parse_inline_vec3(&self, line: &str) -> ParseResult<Vec3> {
        let value = self.attribute_value(line).unwrap_or(line);

        let start = value.find('(').ok_or_else(|| ParseError::Parse {
            line: self.current_line,
            message: format!("Expected '(' in: {}", line),
        })?;
        let end = value.find(')').ok_or_else(|| ParseError::Parse {
            line: self.current_line,
            message: format!("Expected ')' in: {}", line),
        })?;

        self.parse_tuple(&value[start + 1..end])
    }

    /// Parse an inline float value.
    fn parse_inline_float(&self, line: &str) -> ParseResult<f32> {
        let value = self.attribute_value(line).ok_or_else(|| ParseError::Parse {
            line: self.current_line,
            message: "Expected '='".to_string(),
        })?;

        parse_number(value)
    }

    /// Parse the `x, y, z` inside a tuple.
    fn parse_tuple(&self, inner: &str) -> ParseResult<Vec3> {
        let parts: Vec<&str> = inner.split(',').collect();
        if parts.len() != 3 {
            return Err(ParseError::Parse {
                line: self.current_line,
                message: format!("Expected 3 components, got {}", parts.len()),
            });
        }

        Ok(Vec3::new(
            parse_number(parts[0])?,
            parse_number(parts[1])?,
            parse_number(parts[2])?,
        ))
    }

    /// Collect the text between `[` and `]` of an array attribute, reading
    /// continuation lines, plus any `interpolation` from trailing metadata.
    fn read_array(&mut self, first_line: &str) -> ParseResult<(String, Option<String>)> {
        let start_line = self.current_line;

        // Find the = sign first, then look for [ after it
        let eq_pos = first_line.find('=').ok_or_else(|| ParseError::Parse {
            line: start_line,
            message: format!("Expected '=' in: {}", first_line),
        })?;
        let after_eq = &first_line[eq_pos + 1..];
        let bracket_start = after_eq.find('[').ok_or_else(|| ParseError::Parse {
            line: start_line,
            message: format!("Expected '[' in: {}", first_line),
        })?;

        let mut content = after_eq[bracket_start + 1..].to_string();
        while !content.contains(']') {
            match self.lines.pop_front() {
                Some((num, line)) => {
                    self.current_line = num;
                    content.push(' ');
                    content.push_str(line.trim());
                }
                None => return Err(ParseError::UnclosedBlock(start_line)),
            }
        }

        let (inner, trailing) = content.split_once(']').unwrap_or((content.as_str(), ""));
        let inner = inner.to_string();

        let trailing = trailing.trim();
        let interpolation = match trailing.strip_prefix('(') {
            Some(after_paren) => {
                let after_paren = after_paren.to_string();
                metadata_value(&self.parse_metadata_block(&after_paren)?, "interpolation")
                    .map(|v| unquote(v).to_string())
            }
            None => None,
        };

        Ok((inner, interpolation))
    }

    /// Parse a Vec3 array like [(1, 2, 3), (4, 5, 6), ...].
    fn parse_vec3_array(&mut self, first_line: &str) -> ParseResult<(Vec<Vec3>, Option<String>)> {
        let (inner, interpolation) = self.read_array(first_line)?;

        let mut result = Vec::new();
        let mut rest = inner.as_str();
        while let Some(open) = rest.find('(') {
            let close = rest[open..].find(')').ok_or_else(|| ParseError::Parse {
                line: self.current_line,
                message: "Unclosed tuple in array".to_string(),
            })? + open;
            result.push(self.parse_tuple(&rest[open + 1..close])?);
            rest = &rest[close + 1..];
        }

        Ok((result, interpolation))
    }

    /// Parse an int array like [1, 2, 3, ...].
    fn parse_int_array(&mut self, first_line: &str) -> ParseResult<Vec<i32>> {
        let (inner, _) = self.read_array(first_line)?;

        inner
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<i32>().map_err(|_| ParseError::InvalidNumber(s.to_string())))
            .collect()
    }

    /// Parse a single path target like `</Root/Material>`.
    fn parse_rel_target(&self, line: &str) -> ParseResult<String> {
        let value = self.attribute_value(line).unwrap_or("");
        match (value.find('<'), value.rfind('>')) {
            (Some(start), Some(end)) if start < end => Ok(value[start + 1..end].to_string()),
            _ => Err(ParseError::Parse {
                line: self.current_line,
                message: format!("Expected </path> target in: {}", line),
            }),
        }
    }
}

/// Append the part of `text` before the paren that closes the block.
fn scan_metadata_line(text: &str, depth: &mut i32, body: &mut Vec<String>) {
    let mut end = text.len();
    for (i, c) in text.char_indices() {
        match c {
            '(' => *depth += 1,
            ')' => {
                *depth -= 1;
                if *depth == 0 {
                    end = i;
                    break;
                }
            }
            _ => {}
        }
    }
    body.push(text[..end].to_string());
}

/// Split an attribute line into its name and optional value text.
///
/// `uniform token info:id = "X"` gives `("info:id", Some("\"X\""))`.
fn split_attribute(line: &str) -> Option<(&str, Option<&str>)> {
    let (declaration, value) = match line.split_once('=') {
        Some((declaration, value)) => (declaration, Some(value.trim())),
        None => (line, None),
    };
    let name = declaration.split_whitespace().last()?;
    Some((name, value))
}

fn metadata_value<'a>(metadata: &'a Metadata, key: &str) -> Option<&'a str> {
    metadata
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Text between the first pair of double quotes.
fn quoted(text: &str) -> Option<&str> {
    let start = text.find('"')? + 1;
    let len = text[start..].find('"')?;
    Some(&text[start..start + len])
}

fn unquote(value: &str) -> &str {
    quoted(value).unwrap_or(value)
}

/// `["A", "B"]` to its tokens.
fn token_list(value: &str) -> Vec<String> {
    value
        .trim_matches(|c| c == '[' || c == ']')
        .split(',')
        .map(|t| unquote(t.trim()).to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn parse_number(text: &str) -> ParseResult<f32> {
    let text = text.trim();
    text.parse::<f32>()
        .map_err(|_| ParseError::InvalidNumber(text.to_string()))
}

fn empty_prim(prim_type: &str, path: &str, name: &str, metadata: &Metadata) -> UsdPrim {
    match prim_type {
        "Xform" | "Scope" => UsdPrim::Xform(UsdXform {
            path: path.to_string(),
            name: name.to_string(),
            kind: metadata_value(metadata, "kind").map(|v| unquote(v).to_string()),
            children: Vec::new(),
        }),
        "Mesh" => UsdPrim::Mesh(UsdMesh {
            path: path.to_string(),
            name: name.to_string(),
            ..Default::default()
        }),
        "Material" => UsdPrim::Material(UsdMaterial {
            path: path.to_string(),
            name: name.to_string(),
            ..Default::default()
        }),
        other => UsdPrim::Unknown(other.to_string()),
    }
}

/// Parse a USDA string into a layer.
pub fn parse_usda(content: &str) -> ParseResult<UsdLayer> {
    let mut parser = UsdaParser::new(content);
    parser.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYER: &str = r#"#usda 1.0
(
    defaultPrim = "Root"
    metersPerUnit = 1
    upAxis = "Y"
)

def Xform "Root" (
    kind = "component"
)
{
    def Material "Material"
    {
        token outputs:surface.connect = </Root/Material/PBRShader.outputs:surface>

        def Shader "PBRShader"
        {
            uniform token info:id = "UsdPreviewSurface"
            color3f inputs:diffuseColor = (0.7, 0.7, 0.7)
            float inputs:metallic = 0
            float inputs:roughness = 0.5
            token outputs:surface
        }
    }

    def Mesh "Mesh_0" (
        prepend apiSchemas = ["MaterialBindingAPI"]
    )
    {
        float3[] extent = [(0, 0, 0), (1, 1, 0)]
        int[] faceVertexCounts = [3]
        int[] faceVertexIndices = [0, 1, 2]
        rel material:binding = </Root/Material>
        normal3f[] normals = [(0, 0, 1), (0, 0, 1), (0, 0, 1)] (interpolation = "vertex")
        point3f[] points = [(0, 0, 0), (1, 0, 0), (0, 1, 0)]
        uniform token subdivisionScheme = "none"
    }
}
"#;

    #[test]
    fn test_parse_layer_metadata() {
        let layer = parse_usda(LAYER).unwrap();

        assert_eq!(layer.metadata.default_prim.as_deref(), Some("Root"));
        assert_eq!(layer.metadata.up_axis.as_deref(), Some("Y"));
        assert_eq!(layer.metadata.meters_per_unit, Some(1.0));
    }

    #[test]
    fn test_parse_mesh() {
        let layer = parse_usda(LAYER).unwrap();
        let meshes = layer.meshes();
        assert_eq!(meshes.len(), 1);

        let mesh = meshes[0];
        assert_eq!(mesh.path, "/Root/Mesh_0");
        assert_eq!(mesh.api_schemas, vec!["MaterialBindingAPI"]);
        assert_eq!(mesh.points.len(), 3);
        assert_eq!(mesh.face_vertex_counts, vec![3]);
        assert_eq!(mesh.face_vertex_indices, vec![0, 1, 2]);
        assert_eq!(mesh.normals.as_ref().unwrap()[0], Vec3::Z);
        assert_eq!(mesh.normals_interpolation.as_deref(), Some("vertex"));
        assert_eq!(mesh.extent, Some([Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0)]));
        assert_eq!(mesh.material_binding.as_deref(), Some("/Root/Material"));
        assert_eq!(mesh.subdivision_scheme.as_deref(), Some("none"));
        assert!(mesh.display_color.is_none());
    }

    #[test]
    fn test_parse_material() {
        let layer = parse_usda(LAYER).unwrap();
        let materials = layer.materials();
        assert_eq!(materials.len(), 1);

        let shader = materials[0].surface_shader().unwrap();
        assert_eq!(shader.path, "/Root/Material/PBRShader");
        assert_eq!(shader.id.as_deref(), Some("UsdPreviewSurface"));
        assert_eq!(shader.color_input("diffuseColor"), Some(Vec3::splat(0.7)));
        assert_eq!(shader.float_input("roughness"), Some(0.5));
        assert_eq!(shader.float_input("metallic"), Some(0.0));
    }

    #[test]
    fn test_root_kind() {
        let layer = parse_usda(LAYER).unwrap();
        match layer.default_prim() {
            Some(UsdPrim::Xform(root)) => {
                assert_eq!(root.kind.as_deref(), Some("component"));
                assert_eq!(root.children.len(), 2);
            }
            other => panic!("Expected Xform root, got {:?}", other),
        }
    }

    #[test]
    fn test_multiline_array() {
        let usda = r#"#usda 1.0
def Mesh "Quad" {
    point3f[] points = [
        (0, 0, 0), (1, 0, 0),
        (1, 1, 0), (0, 1, 0)
    ]
    int[] faceVertexCounts = [4]
}
"#;
        let layer = parse_usda(usda).unwrap();
        assert_eq!(layer.meshes()[0].points.len(), 4);
        assert_eq!(layer.metadata, LayerMetadata::default());
    }

    #[test]
    fn test_missing_header() {
        let err = parse_usda("def Xform \"Root\" {\n}\n").unwrap_err();
        assert!(matches!(err, ParseError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_unclosed_block() {
        let usda = "#usda 1.0\ndef Xform \"Root\"\n{\n    def Mesh \"M\"\n    {\n";
        assert!(matches!(parse_usda(usda), Err(ParseError::UnclosedBlock(_))));
    }

    #[test]
    fn test_invalid_number() {
        let usda = "#usda 1.0\ndef Mesh \"M\"\n{\n    int[] faceVertexCounts = [3, x]\n}\n";
        assert!(matches!(parse_usda(usda), Err(ParseError::InvalidNumber(_))));
    }

    #[test]
    fn test_unknown_prim_is_skipped() {
        let usda = "#usda 1.0\ndef Camera \"Cam\"\n{\n    float focalLength = 50\n}\n";
        let layer = parse_usda(usda).unwrap();
        assert_eq!(layer.prims, vec![UsdPrim::Unknown("Camera".to_string())]);
    }

    #[test]
    fn test_unbalanced_braces_in_unknown_prim() {
        let usda = "#usda 1.0\ndef Camera \"Cam\"\n{\n    }}\n";
        let layer = parse_usda(usda).unwrap();
        assert_eq!(layer.prims, vec![UsdPrim::Unknown("Camera".to_string())]);
    }
}
