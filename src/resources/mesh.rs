use std::{collections::HashSet, f32::consts::PI};

use cgmath::{InnerSpace, Vector3};

use crate::data_structures::model::{self, ModelVertex};

/// CPU side geometry before it is uploaded as a [`model::Mesh`].
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn upload(&self, device: &wgpu::Device, name: &str) -> model::Mesh {
        model::Mesh::new(device, name, &self.vertices, &self.indices)
    }

    /// Same vertices, indices replaced by the unique edges of every triangle
    /// as a line list.
    pub fn to_wireframe(&self) -> MeshData {
        MeshData {
            vertices: self.vertices.clone(),
            indices: wireframe_indices(&self.indices),
        }
    }
}

/// Generate a UV sphere.
///
/// There are `(width_segments + 1) * (height_segments + 1)` vertices: the seam
/// column is duplicated so it can carry both `u = 0` and `u = 1`, and each
/// pole row keeps one vertex per column with `u` shifted by half a segment.
/// `v` runs from 0 at the north pole to 1 at the south pole so images map
/// upright without flipping. The triangles touching a pole collapse to a
/// point and are left out.
pub fn uv_sphere(radius: f32, width_segments: u32, height_segments: u32) -> MeshData {
    let width_segments = width_segments.max(3);
    let height_segments = height_segments.max(2);

    let mut vertices = Vec::with_capacity(((width_segments + 1) * (height_segments + 1)) as usize);
    for iy in 0..=height_segments {
        let v = iy as f32 / height_segments as f32;
        let u_offset = if iy == 0 {
            0.5 / width_segments as f32
        } else if iy == height_segments {
            -0.5 / width_segments as f32
        } else {
            0.0
        };
        let theta = v * PI;
        for ix in 0..=width_segments {
            let u = ix as f32 / width_segments as f32;
            let phi = u * 2.0 * PI;
            let position = Vector3::new(
                -radius * phi.cos() * theta.sin(),
                radius * theta.cos(),
                radius * phi.sin() * theta.sin(),
            );
            let normal = if position.magnitude2() > 0.0 {
                position.normalize()
            } else {
                Vector3::unit_y()
            };
            vertices.push(ModelVertex {
                position: position.into(),
                tex_coords: [u + u_offset, v],
                normal: normal.into(),
                tangent: [0.0; 3],
                bitangent: [0.0; 3],
            });
        }
    }

    let row = width_segments + 1;
    let mut indices = Vec::new();
    for iy in 0..height_segments {
        for ix in 0..width_segments {
            let a = iy * row + ix + 1;
            let b = iy * row + ix;
            let c = (iy + 1) * row + ix;
            let d = (iy + 1) * row + ix + 1;
            if iy != 0 {
                indices.extend_from_slice(&[a, b, d]);
            }
            if iy != height_segments - 1 {
                indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    compute_tangents(&mut vertices, &indices);
    MeshData { vertices, indices }
}

/**
 * Generated meshes don't come with tangents and bitangents so they have to be
 * calculated for normal maps to work correctly.
 *
 * Triangles without UV area contribute nothing. A vertex no triangle could
 * provide a tangent for gets one perpendicular to its normal.
 */
pub fn compute_tangents(vertices: &mut [ModelVertex], indices: &[u32]) {
    let mut triangles_included = vec![0u32; vertices.len()];

    for c in indices.chunks_exact(3) {
        let v0 = vertices[c[0] as usize];
        let v1 = vertices[c[1] as usize];
        let v2 = vertices[c[2] as usize];

        let pos0: Vector3<_> = v0.position.into();
        let pos1: Vector3<_> = v1.position.into();
        let pos2: Vector3<_> = v2.position.into();

        let uv0: cgmath::Vector2<_> = v0.tex_coords.into();
        let uv1: cgmath::Vector2<_> = v1.tex_coords.into();
        let uv2: cgmath::Vector2<_> = v2.tex_coords.into();

        let delta_pos1 = pos1 - pos0;
        let delta_pos2 = pos2 - pos0;
        let delta_uv1 = uv1 - uv0;
        let delta_uv2 = uv2 - uv0;

        // Solves delta_pos = delta_uv.x * T + delta_uv.y * B for both edges
        let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
        if det.abs() < f32::EPSILON {
            continue;
        }
        let r = 1.0 / det;
        let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
        // Flipped so right-handed normal maps work with v pointing down
        let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * -r;

        for &i in c {
            let v = &mut vertices[i as usize];
            v.tangent = (tangent + Vector3::from(v.tangent)).into();
            v.bitangent = (bitangent + Vector3::from(v.bitangent)).into();
            triangles_included[i as usize] += 1;
        }
    }

    for (v, n) in vertices.iter_mut().zip(triangles_included) {
        let normal = Vector3::from(v.normal);
        if n == 0 {
            let tangent = any_perpendicular(normal);
            v.tangent = tangent.into();
            v.bitangent = normal.cross(tangent).into();
            continue;
        }
        let denom = 1.0 / n as f32;
        v.tangent = (Vector3::from(v.tangent) * denom).into();
        v.bitangent = (Vector3::from(v.bitangent) * denom).into();
    }
}

fn any_perpendicular(normal: Vector3<f32>) -> Vector3<f32> {
    let axis = if normal.x.abs() < 0.9 {
        Vector3::unit_x()
    } else {
        Vector3::unit_y()
    };
    let tangent = axis - normal * normal.dot(axis);
    if tangent.magnitude2() > 0.0 {
        tangent.normalize()
    } else {
        Vector3::unit_x()
    }
}

/// Unique edges of a triangle list, in first-seen order.
pub fn wireframe_indices(indices: &[u32]) -> Vec<u32> {
    let mut seen = HashSet::new();
    let mut lines = Vec::new();
    for c in indices.chunks_exact(3) {
        for (start, end) in [(c[0], c[1]), (c[1], c[2]), (c[2], c[0])] {
            let key = (start.min(end), start.max(end));
            if seen.insert(key) {
                lines.extend_from_slice(&[start, end]);
            }
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(data: &MeshData, i: u32) -> Vector3<f32> {
        data.vertices[i as usize].position.into()
    }

    #[test]
    fn should_emit_grid_of_vertices() {
        let sphere = uv_sphere(1.0, 64, 32);
        assert_eq!(sphere.vertices.len(), 65 * 33);
        // Two triangles per quad minus one per column on each pole row
        assert_eq!(sphere.indices.len(), 3 * (2 * 64 * 32 - 2 * 64));
    }

    #[test]
    fn should_not_emit_degenerate_triangles() {
        let sphere = uv_sphere(1.0, 16, 12);
        for c in sphere.indices.chunks_exact(3) {
            let [p0, p1, p2] = [c[0], c[1], c[2]].map(|i| position(&sphere, i));
            let area = (p1 - p0).cross(p2 - p0).magnitude();
            assert!(area > 1e-6, "degenerate triangle {c:?}");
        }
    }

    #[test]
    fn should_place_vertices_on_radius_with_unit_normals() {
        let sphere = uv_sphere(0.6, 16, 12);
        for v in &sphere.vertices {
            let p = Vector3::from(v.position);
            assert!((p.magnitude() - 0.6).abs() < 1e-5);
            assert!((Vector3::from(v.normal).magnitude() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn should_put_north_pole_at_top_of_texture() {
        let sphere = uv_sphere(1.0, 8, 4);
        let first = sphere.vertices[0];
        assert_eq!(first.tex_coords[1], 0.0);
        assert!((first.position[1] - 1.0).abs() < 1e-6);
        let last = sphere.vertices.last().unwrap();
        assert_eq!(last.tex_coords[1], 1.0);
        assert!((last.position[1] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn should_wind_triangles_outwards() {
        let sphere = uv_sphere(1.0, 16, 12);
        for c in sphere.indices.chunks_exact(3) {
            let [p0, p1, p2] = [c[0], c[1], c[2]].map(|i| position(&sphere, i));
            let face_normal = (p1 - p0).cross(p2 - p0);
            let centre = (p0 + p1 + p2) / 3.0;
            assert!(face_normal.dot(centre) > 0.0);
        }
    }

    #[test]
    fn should_compute_finite_tangents() {
        let sphere = uv_sphere(1.0, 64, 32);
        for v in &sphere.vertices {
            let t = Vector3::from(v.tangent);
            let b = Vector3::from(v.bitangent);
            assert!(t.x.is_finite() && t.y.is_finite() && t.z.is_finite());
            assert!(b.x.is_finite() && b.y.is_finite() && b.z.is_finite());
            assert!(t.magnitude() > 0.0);
        }
    }

    #[test]
    fn should_skip_triangles_without_uv_area() {
        let mut vertices = vec![
            ModelVertex {
                position: [0.0, 0.0, 0.0],
                normal: [0.0, 0.0, 1.0],
                ..Default::default()
            },
            ModelVertex {
                position: [1.0, 0.0, 0.0],
                normal: [0.0, 0.0, 1.0],
                ..Default::default()
            },
            ModelVertex {
                position: [0.0, 1.0, 0.0],
                normal: [0.0, 0.0, 1.0],
                ..Default::default()
            },
        ];
        compute_tangents(&mut vertices, &[0, 1, 2]);
        for v in vertices {
            let t = Vector3::from(v.tangent);
            assert!((t.magnitude() - 1.0).abs() < 1e-5);
            assert!(t.dot(Vector3::from(v.normal)).abs() < 1e-5);
        }
    }

    #[test]
    fn should_share_edges_once_in_wireframe() {
        // Two triangles of a quad share the diagonal
        let lines = wireframe_indices(&[0, 1, 2, 0, 2, 3]);
        assert_eq!(lines.len(), 2 * 5);
        let sphere = uv_sphere(0.6, 16, 12).to_wireframe();
        assert_eq!(sphere.indices.len() % 2, 0);
    }
}
