//! Procedural shape generators
//!
//! All generators return CPU-side meshes with positions, unit normals and
//! UVs, wound counter-clockwise when viewed from outside. Conventions:
//! planes lie in XZ facing +Y, flat 2D shapes (quad, triangle, circle) lie
//! in XY facing +Z, and extruded solids run along the Y axis.

use std::f32::consts::PI;

use crate::render::mesh::{Mesh, Vertex};
use crate::render::RenderError;

/// Subdivided plane in the XZ plane facing +Y, centered at the origin
///
/// # Errors
/// Returns [`RenderError::InvalidMesh`] if the generated topology is
/// invalid, which indicates a bug in the generator.
pub fn create_plane(width: f32, depth: f32, subdivisions: u32) -> Result<Mesh, RenderError> {
    let subdivisions = subdivisions.max(1);
    let rows = subdivisions + 1;
    let mut vertices = Vec::with_capacity((rows * rows) as usize);
    for i in 0..=subdivisions {
        for j in 0..=subdivisions {
            let fx = j as f32 / subdivisions as f32;
            let fz = i as f32 / subdivisions as f32;
            vertices.push(Vertex::new(
                [(fx - 0.5) * width, 0.0, (fz - 0.5) * depth],
                [0.0, 1.0, 0.0],
                [fx, fz],
            ));
        }
    }
    let mut indices = Vec::with_capacity((subdivisions * subdivisions * 6) as usize);
    for i in 0..subdivisions {
        for j in 0..subdivisions {
            let a = i * rows + j;
            let b = a + 1;
            let c = a + rows;
            let d = c + 1;
            indices.extend_from_slice(&[a, c, d, a, d, b]);
        }
    }
    Mesh::new(vertices, indices)
}

/// Axis-aligned cube centered at the origin, 24 vertices with per-face
/// normals
///
/// # Errors
/// Returns [`RenderError::InvalidMesh`] on a generator bug.
pub fn create_cube(size: f32) -> Result<Mesh, RenderError> {
    let h = size * 0.5;
    // (normal, u axis, v axis) per face, with u x v = normal.
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (n, u, v) in faces {
        let base = vertices.len() as u32;
        for (su, sv, uv) in [
            (-1.0, -1.0, [0.0, 0.0]),
            (1.0, -1.0, [1.0, 0.0]),
            (1.0, 1.0, [1.0, 1.0]),
            (-1.0, 1.0, [0.0, 1.0]),
        ] {
            let position = [
                h * (n[0] + su * u[0] + sv * v[0]),
                h * (n[1] + su * u[1] + sv * v[1]),
                h * (n[2] + su * u[2] + sv * v[2]),
            ];
            vertices.push(Vertex::new(position, n, uv));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    Mesh::new(vertices, indices)
}

/// UV sphere centered at the origin
///
/// `segments` is the longitudinal resolution (minimum 3), `rings` the
/// latitudinal resolution (minimum 2). The seam column is duplicated so UVs
/// stay continuous.
///
/// # Errors
/// Returns [`RenderError::InvalidMesh`] on a generator bug.
pub fn create_sphere(radius: f32, segments: u32, rings: u32) -> Result<Mesh, RenderError> {
    let segments = segments.max(3);
    let rings = rings.max(2);
    let cols = segments + 1;
    let mut vertices = Vec::with_capacity((cols * (rings + 1)) as usize);
    for i in 0..=rings {
        let theta = PI * i as f32 / rings as f32;
        let (sin_t, cos_t) = theta.sin_cos();
        for j in 0..=segments {
            let phi = 2.0 * PI * j as f32 / segments as f32;
            let (sin_p, cos_p) = phi.sin_cos();
            let normal = [sin_t * cos_p, cos_t, sin_t * sin_p];
            vertices.push(Vertex::new(
                [normal[0] * radius, normal[1] * radius, normal[2] * radius],
                normal,
                [j as f32 / segments as f32, i as f32 / rings as f32],
            ));
        }
    }
    let mut indices = Vec::with_capacity((segments * rings * 6) as usize);
    for i in 0..rings {
        for j in 0..segments {
            let a = i * cols + j;
            let b = a + 1;
            let c = a + cols;
            let d = c + 1;
            indices.extend_from_slice(&[a, b, d, a, d, c]);
        }
    }
    Mesh::new(vertices, indices)
}

/// Capped cylinder along the Y axis, centered at the origin
///
/// # Errors
/// Returns [`RenderError::InvalidMesh`] on a generator bug.
pub fn create_cylinder(radius: f32, height: f32, segments: u32) -> Result<Mesh, RenderError> {
    let segments = segments.max(3);
    let h = height * 0.5;
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    // Side wall, seam duplicated.
    for j in 0..=segments {
        let phi = 2.0 * PI * j as f32 / segments as f32;
        let (sin_p, cos_p) = phi.sin_cos();
        let u = j as f32 / segments as f32;
        vertices.push(Vertex::new(
            [radius * cos_p, -h, radius * sin_p],
            [cos_p, 0.0, sin_p],
            [u, 0.0],
        ));
        vertices.push(Vertex::new(
            [radius * cos_p, h, radius * sin_p],
            [cos_p, 0.0, sin_p],
            [u, 1.0],
        ));
    }
    for j in 0..segments {
        let a = j * 2;
        let b = a + 2;
        let c = a + 1;
        let d = a + 3;
        indices.extend_from_slice(&[a, c, d, a, d, b]);
    }

    // Caps with their own normals.
    for (y, normal, flip) in [(h, [0.0, 1.0, 0.0], true), (-h, [0.0, -1.0, 0.0], false)] {
        let center = vertices.len() as u32;
        vertices.push(Vertex::new([0.0, y, 0.0], normal, [0.5, 0.5]));
        for j in 0..=segments {
            let phi = 2.0 * PI * j as f32 / segments as f32;
            let (sin_p, cos_p) = phi.sin_cos();
            vertices.push(Vertex::new(
                [radius * cos_p, y, radius * sin_p],
                normal,
                [0.5 + 0.5 * cos_p, 0.5 + 0.5 * sin_p],
            ));
        }
        for j in 0..segments {
            let p0 = center + 1 + j;
            let p1 = p0 + 1;
            if flip {
                indices.extend_from_slice(&[center, p1, p0]);
            } else {
                indices.extend_from_slice(&[center, p0, p1]);
            }
        }
    }
    Mesh::new(vertices, indices)
}

/// Capped cone along the Y axis with the apex at +Y, centered at the origin
///
/// # Errors
/// Returns [`RenderError::InvalidMesh`] on a generator bug.
pub fn create_cone(radius: f32, height: f32, segments: u32) -> Result<Mesh, RenderError> {
    let segments = segments.max(3);
    let h = height * 0.5;
    let slant = (radius * radius + height * height).sqrt();
    let (ny, nr) = (radius / slant, height / slant);
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    // Slanted side, one apex vertex per segment for per-segment normals.
    for j in 0..=segments {
        let phi = 2.0 * PI * j as f32 / segments as f32;
        let (sin_p, cos_p) = phi.sin_cos();
        let normal = [nr * cos_p, ny, nr * sin_p];
        vertices.push(Vertex::new(
            [radius * cos_p, -h, radius * sin_p],
            normal,
            [j as f32 / segments as f32, 0.0],
        ));
        vertices.push(Vertex::new(
            [0.0, h, 0.0],
            normal,
            [j as f32 / segments as f32, 1.0],
        ));
    }
    for j in 0..segments {
        let base = j * 2;
        let apex = base + 1;
        let next = base + 2;
        indices.extend_from_slice(&[base, apex, next]);
    }

    // Bottom cap.
    let center = vertices.len() as u32;
    vertices.push(Vertex::new([0.0, -h, 0.0], [0.0, -1.0, 0.0], [0.5, 0.5]));
    for j in 0..=segments {
        let phi = 2.0 * PI * j as f32 / segments as f32;
        let (sin_p, cos_p) = phi.sin_cos();
        vertices.push(Vertex::new(
            [radius * cos_p, -h, radius * sin_p],
            [0.0, -1.0, 0.0],
            [0.5 + 0.5 * cos_p, 0.5 + 0.5 * sin_p],
        ));
    }
    for j in 0..segments {
        let p0 = center + 1 + j;
        indices.extend_from_slice(&[center, p0, p0 + 1]);
    }
    Mesh::new(vertices, indices)
}

/// Torus around the Y axis, centered at the origin
///
/// `major_radius` is the distance from the origin to the tube center,
/// `minor_radius` the tube radius.
///
/// # Errors
/// Returns [`RenderError::InvalidMesh`] on a generator bug.
pub fn create_torus(
    major_radius: f32,
    minor_radius: f32,
    major_segments: u32,
    minor_segments: u32,
) -> Result<Mesh, RenderError> {
    let major_segments = major_segments.max(3);
    let minor_segments = minor_segments.max(3);
    let cols = minor_segments + 1;
    let mut vertices = Vec::with_capacity(((major_segments + 1) * cols) as usize);
    for i in 0..=major_segments {
        let u = 2.0 * PI * i as f32 / major_segments as f32;
        let (sin_u, cos_u) = u.sin_cos();
        for j in 0..=minor_segments {
            let v = 2.0 * PI * j as f32 / minor_segments as f32;
            let (sin_v, cos_v) = v.sin_cos();
            let normal = [cos_v * cos_u, sin_v, cos_v * sin_u];
            vertices.push(Vertex::new(
                [
                    (major_radius + minor_radius * cos_v) * cos_u,
                    minor_radius * sin_v,
                    (major_radius + minor_radius * cos_v) * sin_u,
                ],
                normal,
                [
                    i as f32 / major_segments as f32,
                    j as f32 / minor_segments as f32,
                ],
            ));
        }
    }
    let mut indices = Vec::with_capacity((major_segments * minor_segments * 6) as usize);
    for i in 0..major_segments {
        for j in 0..minor_segments {
            let a = i * cols + j;
            let b = a + 1;
            let c = a + cols;
            let d = c + 1;
            indices.extend_from_slice(&[a, b, d, a, d, c]);
        }
    }
    Mesh::new(vertices, indices)
}

/// Capsule along the Y axis, centered at the origin
///
/// `height` is the length of the cylindrical section; the total extent along
/// Y is `height + 2 * radius`. The equator row is duplicated so the wall
/// between the hemispheres is a straight cylinder.
///
/// # Errors
/// Returns [`RenderError::InvalidMesh`] on a generator bug.
pub fn create_capsule(
    radius: f32,
    height: f32,
    segments: u32,
    rings: u32,
) -> Result<Mesh, RenderError> {
    let segments = segments.max(3);
    let rings = {
        let r = rings.max(2);
        r + (r % 2)
    };
    let h = height * 0.5;
    let cols = segments + 1;
    let rows = rings + 2;
    let mut vertices = Vec::with_capacity((cols * rows) as usize);
    for i in 0..rows {
        let (ring, offset) = if i <= rings / 2 {
            (i, h)
        } else {
            (i - 1, -h)
        };
        let theta = PI * ring as f32 / rings as f32;
        let (sin_t, cos_t) = theta.sin_cos();
        for j in 0..=segments {
            let phi = 2.0 * PI * j as f32 / segments as f32;
            let (sin_p, cos_p) = phi.sin_cos();
            let normal = [sin_t * cos_p, cos_t, sin_t * sin_p];
            vertices.push(Vertex::new(
                [
                    normal[0] * radius,
                    normal[1] * radius + offset,
                    normal[2] * radius,
                ],
                normal,
                [
                    j as f32 / segments as f32,
                    i as f32 / (rows - 1) as f32,
                ],
            ));
        }
    }
    let mut indices = Vec::with_capacity((segments * (rows - 1) * 6) as usize);
    for i in 0..rows - 1 {
        for j in 0..segments {
            let a = i * cols + j;
            let b = a + 1;
            let c = a + cols;
            let d = c + 1;
            indices.extend_from_slice(&[a, b, d, a, d, c]);
        }
    }
    Mesh::new(vertices, indices)
}

/// Unit-style quad in the XY plane facing +Z, centered at the origin
///
/// # Errors
/// Returns [`RenderError::InvalidMesh`] on a generator bug.
pub fn create_quad(width: f32, height: f32) -> Result<Mesh, RenderError> {
    let (w, h) = (width * 0.5, height * 0.5);
    let n = [0.0, 0.0, 1.0];
    let vertices = vec![
        Vertex::new([-w, -h, 0.0], n, [0.0, 0.0]),
        Vertex::new([w, -h, 0.0], n, [1.0, 0.0]),
        Vertex::new([w, h, 0.0], n, [1.0, 1.0]),
        Vertex::new([-w, h, 0.0], n, [0.0, 1.0]),
    ];
    Mesh::new(vertices, vec![0, 1, 2, 0, 2, 3])
}

/// Equilateral triangle in the XY plane facing +Z, centered at the origin
///
/// `size` is the edge length.
///
/// # Errors
/// Returns [`RenderError::InvalidMesh`] on a generator bug.
pub fn create_triangle(size: f32) -> Result<Mesh, RenderError> {
    let n = [0.0, 0.0, 1.0];
    let inradius = size / (2.0 * 3.0_f32.sqrt());
    let circumradius = size / 3.0_f32.sqrt();
    let vertices = vec![
        Vertex::new([-size * 0.5, -inradius, 0.0], n, [0.0, 0.0]),
        Vertex::new([size * 0.5, -inradius, 0.0], n, [1.0, 0.0]),
        Vertex::new([0.0, circumradius, 0.0], n, [0.5, 1.0]),
    ];
    Mesh::new(vertices, vec![0, 1, 2])
}

/// Filled circle in the XY plane facing +Z, centered at the origin
///
/// # Errors
/// Returns [`RenderError::InvalidMesh`] on a generator bug.
pub fn create_circle(radius: f32, segments: u32) -> Result<Mesh, RenderError> {
    let segments = segments.max(3);
    let n = [0.0, 0.0, 1.0];
    let mut vertices = Vec::with_capacity(segments as usize + 2);
    vertices.push(Vertex::new([0.0, 0.0, 0.0], n, [0.5, 0.5]));
    for j in 0..=segments {
        let phi = 2.0 * PI * j as f32 / segments as f32;
        let (sin_p, cos_p) = phi.sin_cos();
        vertices.push(Vertex::new(
            [radius * cos_p, radius * sin_p, 0.0],
            n,
            [0.5 + 0.5 * cos_p, 0.5 + 0.5 * sin_p],
        ));
    }
    let mut indices = Vec::with_capacity(segments as usize * 3);
    for j in 1..=segments {
        indices.extend_from_slice(&[0, j, j + 1]);
    }
    Mesh::new(vertices, indices)
}
