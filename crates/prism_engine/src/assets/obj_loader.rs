//! OBJ mesh decoder
//!
//! Line-based Wavefront OBJ parse producing the engine vertex layout.
//! Faces with more than three corners are fan-triangulated. Decoding is
//! CPU-only and safe to run on loader worker threads.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

use crate::render::{Mesh, RenderError, Vertex};

/// OBJ decode errors
#[derive(Debug, Error)]
pub enum ObjError {
    /// File could not be opened or read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A line failed to parse
    #[error("Parse error at line {line}: {message}")]
    Parse {
        /// 1-based source line
        line: usize,
        /// What went wrong
        message: String,
    },
    /// The file parsed but described no triangles
    #[error("OBJ file contains no faces: {0}")]
    Empty(String),
    /// Assembled data failed mesh validation
    #[error("Invalid mesh: {0}")]
    InvalidMesh(#[from] RenderError),
}

/// Wavefront OBJ file decoder
pub struct ObjLoader;

impl ObjLoader {
    /// Parse an OBJ file into a mesh
    ///
    /// Supported statements: `v`, `vn`, `vt`, `f` with `pos`, `pos/uv`,
    /// `pos//normal` and `pos/uv/normal` corner forms, including negative
    /// (relative) indices. Everything else is ignored.
    ///
    /// # Errors
    /// Returns [`ObjError`] on IO failure, malformed statements, or a file
    /// with no faces.
    pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<Mesh, ObjError> {
        let path_ref = path.as_ref();
        log::debug!("Loading OBJ from {:?}", path_ref);
        let file = File::open(path_ref)?;
        let mesh = Self::parse(BufReader::new(file))?;
        log::info!(
            "Loaded OBJ {:?}: {} vertices, {} triangles",
            path_ref,
            mesh.vertex_count(),
            mesh.triangle_count()
        );
        Ok(mesh)
    }

    /// Parse OBJ statements from any reader
    ///
    /// # Errors
    /// Returns [`ObjError`] on malformed statements or an empty result.
    pub fn parse<R: BufRead>(reader: R) -> Result<Mesh, ObjError> {
        let mut positions: Vec<[f32; 3]> = Vec::new();
        let mut normals: Vec<[f32; 3]> = Vec::new();
        let mut uvs: Vec<[f32; 2]> = Vec::new();
        let mut vertices: Vec<Vertex> = Vec::new();
        let mut indices: Vec<u32> = Vec::new();

        for (number, line) in reader.lines().enumerate() {
            let line_no = number + 1;
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parts: Vec<&str> = line.split_whitespace().collect();
            match parts[0] {
                "v" => positions.push(parse_vec3(&parts, line_no)?),
                "vn" => normals.push(parse_vec3(&parts, line_no)?),
                "vt" => uvs.push(parse_vec2(&parts, line_no)?),
                "f" => {
                    if parts.len() < 4 {
                        return Err(ObjError::Parse {
                            line: line_no,
                            message: format!("face with {} corners", parts.len() - 1),
                        });
                    }
                    let mut corners = Vec::with_capacity(parts.len() - 1);
                    for corner in &parts[1..] {
                        corners.push(resolve_corner(
                            corner, &positions, &uvs, &normals, line_no,
                        )?);
                    }
                    // Fan triangulation around the first corner.
                    let base = vertices.len() as u32;
                    vertices.extend_from_slice(&corners);
                    for i in 1..corners.len() as u32 - 1 {
                        indices.extend_from_slice(&[base, base + i, base + i + 1]);
                    }
                }
                _ => {}
            }
        }

        if indices.is_empty() {
            return Err(ObjError::Empty("no face statements".to_string()));
        }
        Ok(Mesh::new(vertices, indices)?)
    }
}

fn parse_f32(value: &str, line: usize, what: &str) -> Result<f32, ObjError> {
    value.parse().map_err(|_| ObjError::Parse {
        line,
        message: format!("invalid {what} '{value}'"),
    })
}

fn parse_vec3(parts: &[&str], line: usize) -> Result<[f32; 3], ObjError> {
    if parts.len() < 4 {
        return Err(ObjError::Parse {
            line,
            message: format!("'{}' needs three components", parts[0]),
        });
    }
    Ok([
        parse_f32(parts[1], line, "component")?,
        parse_f32(parts[2], line, "component")?,
        parse_f32(parts[3], line, "component")?,
    ])
}

fn parse_vec2(parts: &[&str], line: usize) -> Result<[f32; 2], ObjError> {
    if parts.len() < 3 {
        return Err(ObjError::Parse {
            line,
            message: "'vt' needs two components".to_string(),
        });
    }
    Ok([
        parse_f32(parts[1], line, "component")?,
        parse_f32(parts[2], line, "component")?,
    ])
}

/// Resolve a 1-based (or negative, relative) OBJ index into a slice index
fn resolve_index(raw: &str, len: usize, line: usize) -> Result<usize, ObjError> {
    let value: i64 = raw.parse().map_err(|_| ObjError::Parse {
        line,
        message: format!("invalid index '{raw}'"),
    })?;
    let resolved = if value < 0 {
        len as i64 + value
    } else {
        value - 1
    };
    if resolved < 0 || resolved as usize >= len {
        return Err(ObjError::Parse {
            line,
            message: format!("index {value} out of range for {len} entries"),
        });
    }
    Ok(resolved as usize)
}

fn resolve_corner(
    corner: &str,
    positions: &[[f32; 3]],
    uvs: &[[f32; 2]],
    normals: &[[f32; 3]],
    line: usize,
) -> Result<Vertex, ObjError> {
    let mut fields = corner.split('/');
    let pos_field = fields.next().unwrap_or_default();
    let uv_field = fields.next().unwrap_or_default();
    let normal_field = fields.next().unwrap_or_default();

    let position = positions[resolve_index(pos_field, positions.len(), line)?];
    let uv = if uv_field.is_empty() {
        [0.0, 0.0]
    } else {
        uvs[resolve_index(uv_field, uvs.len(), line)?]
    };
    let normal = if normal_field.is_empty() {
        [0.0, 1.0, 0.0]
    } else {
        normals[resolve_index(normal_field, normals.len(), line)?]
    };
    Ok(Vertex::new(position, normal, uv))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const TRIANGLE: &str = "\
v 0 0 0
v 1 0 0
v 0 1 0
vn 0 0 1
vt 0 0
vt 1 0
vt 0 1
f 1/1/1 2/2/1 3/3/1
";

    #[test]
    fn parses_full_corner_form() {
        let mesh = ObjLoader::parse(Cursor::new(TRIANGLE)).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.vertices[1].uv, [1.0, 0.0]);
        assert_eq!(mesh.vertices[0].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn quad_faces_fan_triangulate() {
        let obj = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";
        let mesh = ObjLoader::parse(Cursor::new(obj)).unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn negative_indices_resolve_relative_to_end() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let mesh = ObjLoader::parse(Cursor::new(obj)).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn out_of_range_index_is_a_parse_error() {
        let obj = "v 0 0 0\nf 1 2 3\n";
        assert!(matches!(
            ObjLoader::parse(Cursor::new(obj)),
            Err(ObjError::Parse { .. })
        ));
    }

    #[test]
    fn file_without_faces_is_empty() {
        let obj = "v 0 0 0\nv 1 0 0\n";
        assert!(matches!(
            ObjLoader::parse(Cursor::new(obj)),
            Err(ObjError::Empty(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            ObjLoader::load_obj("no/such/model.obj"),
            Err(ObjError::Io(_))
        ));
    }
}
