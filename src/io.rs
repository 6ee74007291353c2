//! Configuration files and mesh export
//!
//! Configurations round-trip through YAML or JSON, chosen by file extension.
//! Meshes are written through the [`MeshWriter`] trait; a [`WriterRegistry`]
//! picks the writer by format id or by the output path's extension.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::config::ClothConfig;
use crate::error::{ClothError, ClothResult};
use crate::mesh::MeshSnapshot;

/// Serialization format of a configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Pick the format from a file extension (case-insensitive)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Pick the format from a path
    pub fn from_path(path: &Path) -> ClothResult<Self> {
        let ext = extension_from_path(path)
            .ok_or_else(|| ClothError::UnknownExtension(path.display().to_string()))?;
        Self::from_extension(ext).ok_or_else(|| ClothError::UnsupportedFormat(ext.to_string()))
    }
}

/// Get file extension from a path
pub fn extension_from_path(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}

/// Parse a configuration from text in the given format
pub fn parse_config(text: &str, format: ConfigFormat) -> ClothResult<ClothConfig> {
    match format {
        ConfigFormat::Yaml => {
            serde_yaml::from_str(text).map_err(|e| ClothError::Parse(e.to_string()))
        }
        ConfigFormat::Json => {
            serde_json::from_str(text).map_err(|e| ClothError::Parse(e.to_string()))
        }
    }
}

/// Render a configuration as text in the given format
pub fn render_config(config: &ClothConfig, format: ConfigFormat) -> ClothResult<String> {
    match format {
        ConfigFormat::Yaml => {
            serde_yaml::to_string(config).map_err(|e| ClothError::Write(e.to_string()))
        }
        ConfigFormat::Json => serde_json::to_string_pretty(config)
            .map(|mut s| {
                s.push('\n');
                s
            })
            .map_err(|e| ClothError::Write(e.to_string())),
    }
}

/// Read and validate a configuration file.
///
/// Fields missing from the file take their defaults; unknown fields are an
/// error.
pub fn load_config(path: &Path) -> ClothResult<ClothConfig> {
    let format = ConfigFormat::from_path(path)?;
    let text = fs::read_to_string(path)?;
    let config = parse_config(&text, format)?;
    config.validate()?;
    Ok(config)
}

/// Write a configuration file in the format implied by its extension
pub fn save_config(path: &Path, config: &ClothConfig) -> ClothResult<()> {
    let format = ConfigFormat::from_path(path)?;
    fs::write(path, render_config(config, format)?)?;
    Ok(())
}

/// Writes a mesh snapshot to some output format
pub trait MeshWriter {
    /// Write the mesh to the output path
    fn write(&self, mesh: &MeshSnapshot, output: &Path) -> ClothResult<()>;

    /// Identifier for this output format (e.g., "obj", "json")
    fn format_id(&self) -> &str;

    /// File extensions this writer produces
    fn supported_extensions(&self) -> &[&str];

    /// Check if this writer handles the given file extension
    fn supports_extension(&self, ext: &str) -> bool {
        self.supported_extensions()
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
    }
}

/// Wavefront OBJ writer
#[derive(Debug, Default)]
pub struct ObjWriter;

impl ObjWriter {
    pub fn new() -> Self {
        Self
    }

    /// Render the mesh as OBJ text.
    ///
    /// Positions, texture coordinates and normals share one index space, so
    /// every face corner is written as `i/i/i` (1-based).
    pub fn render(&self, mesh: &MeshSnapshot) -> Result<String, std::fmt::Error> {
        let mut out = String::new();
        writeln!(
            out,
            "# clothsim mesh: {} vertices, {} triangles",
            mesh.positions.len(),
            mesh.indices.len() / 3
        )?;
        for p in &mesh.positions {
            writeln!(out, "v {} {} {}", clean(p.x), clean(p.y), clean(p.z))?;
        }
        for uv in &mesh.uvs {
            writeln!(out, "vt {} {}", clean(uv.x), clean(uv.y))?;
        }
        for n in &mesh.normals {
            writeln!(out, "vn {} {} {}", clean(n.x), clean(n.y), clean(n.z))?;
        }
        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] + 1, tri[1] + 1, tri[2] + 1];
            writeln!(out, "f {a}/{a}/{a} {b}/{b}/{b} {c}/{c}/{c}")?;
        }
        Ok(out)
    }
}

/// Fold `-0.0` into `0.0` so exports print `0`
fn clean(x: f32) -> f32 {
    x + 0.0
}

impl MeshWriter for ObjWriter {
    fn write(&self, mesh: &MeshSnapshot, output: &Path) -> ClothResult<()> {
        let text = self
            .render(mesh)
            .map_err(|e| ClothError::Write(e.to_string()))?;
        fs::write(output, text)?;
        Ok(())
    }

    fn format_id(&self) -> &str {
        "obj"
    }

    fn supported_extensions(&self) -> &[&str] {
        &["obj"]
    }
}

/// Pretty-printed JSON of the whole [`MeshSnapshot`]
#[derive(Debug, Default)]
pub struct JsonWriter;

impl JsonWriter {
    pub fn new() -> Self {
        Self
    }
}

impl MeshWriter for JsonWriter {
    fn write(&self, mesh: &MeshSnapshot, output: &Path) -> ClothResult<()> {
        let json =
            serde_json::to_string_pretty(mesh).map_err(|e| ClothError::Write(e.to_string()))?;
        fs::write(output, json)?;
        Ok(())
    }

    fn format_id(&self) -> &str {
        "json"
    }

    fn supported_extensions(&self) -> &[&str] {
        &["json"]
    }
}

/// Registry of available mesh writers
pub struct WriterRegistry {
    writers: Vec<Box<dyn MeshWriter>>,
}

impl Default for WriterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl WriterRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            writers: Vec::new(),
        }
    }

    /// Create a registry with `ObjWriter` (obj) and `JsonWriter` (json)
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ObjWriter::new()));
        registry.register(Box::new(JsonWriter::new()));
        registry
    }

    /// Register a writer
    pub fn register(&mut self, writer: Box<dyn MeshWriter>) {
        self.writers.push(writer);
    }

    /// Find a writer by format ID
    pub fn writer_for_format(&self, format_id: &str) -> Option<&dyn MeshWriter> {
        self.writers
            .iter()
            .find(|w| w.format_id().eq_ignore_ascii_case(format_id))
            .map(|w| w.as_ref())
    }

    /// Find a writer for the given path based on its extension
    pub fn writer_for_path(&self, path: &Path) -> ClothResult<&dyn MeshWriter> {
        let ext = extension_from_path(path)
            .ok_or_else(|| ClothError::UnknownExtension(path.display().to_string()))?;

        self.writers
            .iter()
            .find(|w| w.supports_extension(ext))
            .map(|w| w.as_ref())
            .ok_or_else(|| ClothError::UnsupportedFormat(ext.to_string()))
    }

    /// Format ids of every registered writer
    pub fn formats(&self) -> Vec<&str> {
        self.writers.iter().map(|w| w.format_id()).collect()
    }
}
