//! Mesh resource
//!
//! CPU-side vertex/index data plus the GPU buffer identifiers assigned at
//! upload time. The GPU buffers exist exactly when the `uploaded` flag is
//! set; [`Mesh::clear`] resets both together.

use super::device::{MeshBuffers, RenderDevice};
use super::RenderError;
use crate::foundation::geometry::Aabb;
use crate::foundation::math::{Vec3, Vec3Ext};
use bytemuck::{Pod, Zeroable};

/// A single mesh vertex
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Object-space position
    pub position: [f32; 3],
    /// Texture coordinates
    pub uv: [f32; 2],
    /// Unit normal
    pub normal: [f32; 3],
    /// Unit tangent (zero until computed or provided)
    pub tangent: [f32; 3],
    /// Unit bitangent (zero until computed or provided)
    pub bitangent: [f32; 3],
    /// Vertex color (RGBA)
    pub color: [f32; 4],
}

impl Vertex {
    /// Create a vertex with white color and no tangent basis
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            uv,
            normal,
            tangent: [0.0; 3],
            bitangent: [0.0; 3],
            color: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

/// Triangle mesh with optional GPU residency
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Vertex list
    pub vertices: Vec<Vertex>,
    /// Index list; length is a multiple of three
    pub indices: Vec<u32>,
    buffers: MeshBuffers,
    uploaded: bool,
    has_tangents: bool,
}

impl Mesh {
    /// Create a mesh, validating the triangle-index invariant and index range
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Result<Self, RenderError> {
        if indices.len() % 3 != 0 {
            return Err(RenderError::InvalidMesh(format!(
                "index count {} is not a multiple of three",
                indices.len()
            )));
        }
        let vertex_count = vertices.len() as u32;
        if let Some(&bad) = indices.iter().find(|&&i| i >= vertex_count) {
            return Err(RenderError::InvalidMesh(format!(
                "index {bad} out of range for {vertex_count} vertices"
            )));
        }
        Ok(Self {
            vertices,
            indices,
            buffers: MeshBuffers::NONE,
            uploaded: false,
            has_tangents: false,
        })
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of indices
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Whether the mesh currently owns GPU buffers
    pub fn is_uploaded(&self) -> bool {
        self.uploaded
    }

    /// GPU buffer ids; all zero until uploaded
    pub fn buffers(&self) -> MeshBuffers {
        self.buffers
    }

    /// Whether a tangent basis has been provided or computed
    pub fn has_tangents(&self) -> bool {
        self.has_tangents
    }

    /// Mark externally provided tangents as valid
    pub fn set_tangents_provided(&mut self) {
        self.has_tangents = true;
    }

    /// Object-space bounding box over all vertex positions
    pub fn aabb(&self) -> Aabb {
        let mut aabb = Aabb::empty();
        for vertex in &self.vertices {
            aabb.grow(Vec3::from(vertex.position));
        }
        aabb
    }

    /// Compute a per-vertex orthonormal tangent basis from positions, UVs,
    /// and normals. For every vertex afterwards {N, T, B} are unit length,
    /// pairwise orthogonal, and `N x T` is parallel to B.
    pub fn compute_tangents(&mut self) {
        let mut tan_accum = vec![Vec3::zeros(); self.vertices.len()];
        let mut bit_accum = vec![Vec3::zeros(); self.vertices.len()];

        for triangle in self.indices.chunks_exact(3) {
            let (i0, i1, i2) = (
                triangle[0] as usize,
                triangle[1] as usize,
                triangle[2] as usize,
            );
            let (v0, v1, v2) = (&self.vertices[i0], &self.vertices[i1], &self.vertices[i2]);

            let edge1 = Vec3::from(v1.position) - Vec3::from(v0.position);
            let edge2 = Vec3::from(v2.position) - Vec3::from(v0.position);
            let du1 = v1.uv[0] - v0.uv[0];
            let dv1 = v1.uv[1] - v0.uv[1];
            let du2 = v2.uv[0] - v0.uv[0];
            let dv2 = v2.uv[1] - v0.uv[1];

            let det = du1 * dv2 - du2 * dv1;
            if det.abs() < 1e-8 {
                continue;
            }
            let r = 1.0 / det;
            let tangent = (edge1 * dv2 - edge2 * dv1) * r;
            let bitangent = (edge2 * du1 - edge1 * du2) * r;

            for &index in &[i0, i1, i2] {
                tan_accum[index] += tangent;
                bit_accum[index] += bitangent;
            }
        }

        for (i, vertex) in self.vertices.iter_mut().enumerate() {
            let normal = Vec3::from(vertex.normal).safe_normalize();
            let mut tangent = tan_accum[i];

            // Degenerate UVs leave no accumulated tangent; pick any direction
            // orthogonal to the normal instead.
            if tangent.norm_squared() < 1e-12 {
                let reference = if normal.x.abs() < 0.9 {
                    Vec3::x()
                } else {
                    Vec3::y()
                };
                tangent = reference;
            }

            // Gram-Schmidt: remove the normal component, then renormalize.
            tangent = (tangent - normal * normal.dot(&tangent)).normalize();

            // Handedness from the accumulated bitangent.
            let mut bitangent = normal.cross(&tangent);
            if bit_accum[i].norm_squared() > 1e-12 && bitangent.dot(&bit_accum[i]) < 0.0 {
                bitangent = -bitangent;
            }

            vertex.normal = normal.into();
            vertex.tangent = tangent.into();
            vertex.bitangent = bitangent.into();
        }

        self.has_tangents = true;
    }

    /// Upload the mesh to the GPU. Computes tangents first when they are
    /// missing. Idempotent once uploaded.
    pub fn upload(&mut self, device: &mut dyn RenderDevice) -> Result<(), RenderError> {
        if self.uploaded {
            return Ok(());
        }
        if !self.has_tangents {
            self.compute_tangents();
        }
        self.buffers =
            device.create_mesh_buffers(bytemuck::cast_slice(&self.vertices), &self.indices)?;
        self.uploaded = true;
        log::debug!(
            "uploaded mesh: {} vertices, {} triangles",
            self.vertex_count(),
            self.triangle_count()
        );
        Ok(())
    }

    /// Release GPU buffers and CPU-side data together
    pub fn clear(&mut self, device: &mut dyn RenderDevice) {
        if self.uploaded {
            device.destroy_mesh_buffers(self.buffers);
        }
        self.buffers = MeshBuffers::NONE;
        self.uploaded = false;
        self.has_tangents = false;
        self.vertices.clear();
        self.indices.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::device::HeadlessDevice;

    fn triangle() -> Mesh {
        let vertices = vec![
            Vertex::new([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            Vertex::new([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
            Vertex::new([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
        ];
        Mesh::new(vertices, vec![0, 1, 2]).unwrap()
    }

    fn assert_orthonormal_basis(mesh: &Mesh) {
        for vertex in &mesh.vertices {
            let n = Vec3::from(vertex.normal);
            let t = Vec3::from(vertex.tangent);
            let b = Vec3::from(vertex.bitangent);
            assert!((n.magnitude() - 1.0).abs() < 1e-3, "normal not unit");
            assert!((t.magnitude() - 1.0).abs() < 1e-3, "tangent not unit");
            assert!((b.magnitude() - 1.0).abs() < 1e-3, "bitangent not unit");
            assert!(n.dot(&t).abs() < 1e-3, "normal/tangent not orthogonal");
            assert!(n.dot(&b).abs() < 1e-3, "normal/bitangent not orthogonal");
            assert!(
                (n.cross(&t).dot(&b).abs() - 1.0).abs() < 1e-3,
                "handedness magnitude not one"
            );
        }
    }

    #[test]
    fn rejects_non_triangle_index_count() {
        let vertices = vec![Vertex::new([0.0; 3], [0.0, 1.0, 0.0], [0.0; 2])];
        assert!(matches!(
            Mesh::new(vertices, vec![0, 0]),
            Err(RenderError::InvalidMesh(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_index() {
        let vertices = vec![Vertex::new([0.0; 3], [0.0, 1.0, 0.0], [0.0; 2])];
        assert!(Mesh::new(vertices, vec![0, 0, 7]).is_err());
    }

    #[test]
    fn tangent_basis_is_orthonormal() {
        let mut mesh = triangle();
        mesh.compute_tangents();
        assert!(mesh.has_tangents());
        assert_orthonormal_basis(&mesh);
    }

    #[test]
    fn degenerate_uvs_still_produce_valid_basis() {
        let vertices = vec![
            Vertex::new([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.5, 0.5]),
            Vertex::new([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.5, 0.5]),
            Vertex::new([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.5, 0.5]),
        ];
        let mut mesh = Mesh::new(vertices, vec![0, 1, 2]).unwrap();
        mesh.compute_tangents();
        assert_orthonormal_basis(&mesh);
    }

    #[test]
    fn upload_and_clear_reset_together() {
        let mut device = HeadlessDevice::new();
        let mut mesh = triangle();
        assert!(!mesh.is_uploaded());
        assert_eq!(mesh.buffers(), MeshBuffers::NONE);

        mesh.upload(&mut device).unwrap();
        assert!(mesh.is_uploaded());
        assert!(mesh.buffers().is_allocated());

        // Second upload is a no-op.
        mesh.upload(&mut device).unwrap();
        assert_eq!(device.live_mesh_buffers, 1);

        mesh.clear(&mut device);
        assert!(!mesh.is_uploaded());
        assert_eq!(mesh.buffers(), MeshBuffers::NONE);
        assert!(mesh.vertices.is_empty());
        assert_eq!(device.live_mesh_buffers, 0);
    }

    #[test]
    fn aabb_covers_positions() {
        let mesh = triangle();
        let aabb = mesh.aabb();
        assert!(aabb.contains(Vec3::new(0.5, 0.5, 0.0)));
        assert!(!aabb.contains(Vec3::new(2.0, 0.0, 0.0)));
    }
}
