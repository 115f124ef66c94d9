use std::f32::consts::{PI, TAU};

use bevy::math::Vec3;
use bevy::render::mesh::{Indices, Mesh, PrimitiveTopology, VertexAttributeValues};
use bevy::render::render_asset::RenderAssetUsages;
use itertools::iproduct;
use serde::{Deserialize, Serialize};

use crate::layers::{EffectOutput, SurfaceSample};

/// Sample density preset. Only grid resolution changes between tiers; the
/// physics is identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Low,
    #[default]
    Medium,
    High,
    Ultra,
}

impl QualityTier {
    pub const ALL: [QualityTier; 4] = [QualityTier::Low, QualityTier::Medium, QualityTier::High, QualityTier::Ultra];

    /// (sectors, stacks) of the latitude/longitude sphere grid.
    pub fn sphere_segments(&self) -> (u32, u32) {
        match self {
            QualityTier::Low => (48, 24),
            QualityTier::Medium => (96, 48),
            QualityTier::High => (192, 96),
            QualityTier::Ultra => (384, 192),
        }
    }

    /// Quads per side of the flat grids.
    pub fn plane_resolution(&self) -> u32 {
        match self {
            QualityTier::Low => 32,
            QualityTier::Medium => 64,
            QualityTier::High => 128,
            QualityTier::Ultra => 192,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QualityTier::Low => "low",
            QualityTier::Medium => "medium",
            QualityTier::High => "high",
            QualityTier::Ultra => "ultra",
        }
    }
}

/// Which kind of surface a grid samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridShape {
    /// Unit sphere around the origin.
    Sphere,
    /// [-1, 1] square in XZ, normal +Y. Used by the crater patch.
    GroundPlane,
    /// [-1, 1] square in XY, normal +Z. Used by the haze billboard.
    Billboard,
}

/// Rest positions of a mesh, plus the topology needed to build it.
#[derive(Debug, Clone, Default)]
pub struct SampleGrid {
    pub samples: Vec<SurfaceSample>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl SampleGrid {
    pub fn build(shape: GridShape, tier: QualityTier) -> Self {
        match shape {
            GridShape::Sphere => {
                let (sectors, stacks) = tier.sphere_segments();
                sphere_grid(sectors, stacks)
            }
            GridShape::GroundPlane => plane_grid(tier.plane_resolution(), Vec3::Y, |u, v| {
                Vec3::new(-1.0 + 2.0 * u, 0.0, -1.0 + 2.0 * v)
            }),
            GridShape::Billboard => plane_grid(tier.plane_resolution(), Vec3::Z, |u, v| {
                Vec3::new(-1.0 + 2.0 * u, 1.0 - 2.0 * v, 0.0)
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Copy with every position multiplied by `factor`; normals unchanged.
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            samples: self
                .samples
                .iter()
                .map(|s| SurfaceSample::new(s.position * factor, s.normal))
                .collect(),
            uvs: self.uvs.clone(),
            indices: self.indices.clone(),
        }
    }
}

fn sphere_grid(sectors: u32, stacks: u32) -> SampleGrid {
    let vertex_count = ((sectors + 1) * (stacks + 1)) as usize;
    let mut samples = Vec::with_capacity(vertex_count);
    let mut uvs = Vec::with_capacity(vertex_count);

    // Same axis convention as geo::latlon_to_unit: theta from the north pole, phi = longitude.
    for (i, j) in iproduct!(0..=stacks, 0..=sectors) {
        let theta = PI * i as f32 / stacks as f32;
        let phi = TAU * j as f32 / sectors as f32;
        let p = Vec3::new(theta.sin() * phi.cos(), theta.cos(), -theta.sin() * phi.sin());
        samples.push(SurfaceSample::new(p, p));
        uvs.push([j as f32 / sectors as f32, i as f32 / stacks as f32]);
    }

    SampleGrid { samples, uvs, indices: quad_indices(sectors, stacks) }
}

fn plane_grid(n: u32, normal: Vec3, place: impl Fn(f32, f32) -> Vec3) -> SampleGrid {
    let vertex_count = ((n + 1) * (n + 1)) as usize;
    let mut samples = Vec::with_capacity(vertex_count);
    let mut uvs = Vec::with_capacity(vertex_count);

    for (i, j) in iproduct!(0..=n, 0..=n) {
        let u = j as f32 / n as f32;
        let v = i as f32 / n as f32;
        samples.push(SurfaceSample::new(place(u, v), normal));
        uvs.push([u, v]);
    }

    SampleGrid { samples, uvs, indices: quad_indices(n, n) }
}

/// Two counter-clockwise triangles per quad of a row-major (rows + 1) x (columns + 1) vertex grid.
fn quad_indices(columns: u32, rows: u32) -> Vec<u32> {
    let stride = columns + 1;
    let mut indices = Vec::with_capacity((columns * rows * 6) as usize);
    for (i, j) in iproduct!(0..rows, 0..columns) {
        let a = i * stride + j;
        let b = (i + 1) * stride + j;
        let c = b + 1;
        let d = a + 1;
        indices.extend_from_slice(&[a, b, c, a, c, d]);
    }
    indices
}

/// Mesh at rest for `grid`, positions scaled by `scale`. Vertex colors start transparent.
pub fn create_effect_mesh(grid: &SampleGrid, scale: f32) -> Mesh {
    let positions: Vec<[f32; 3]> = grid.samples.iter().map(|s| (s.position * scale).to_array()).collect();
    let normals: Vec<[f32; 3]> = grid.samples.iter().map(|s| s.normal.to_array()).collect();
    let colors = vec![[0.0f32; 4]; grid.len()];

    let mut mesh = Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::MAIN_WORLD | RenderAssetUsages::RENDER_WORLD,
    );
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, grid.uvs.clone());
    mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, colors);
    mesh.insert_indices(Indices::U32(grid.indices.clone()));
    mesh
}

/// Writes one frame of layer output into an existing mesh, reusing its
/// buffers. Each vertex moves along its normal by the sample's displacement.
pub fn write_effect_outputs(mesh: &mut Mesh, grid: &SampleGrid, outputs: &[EffectOutput], scale: f32) {
    if let Some(VertexAttributeValues::Float32x3(positions)) = mesh.attribute_mut(Mesh::ATTRIBUTE_POSITION) {
        for ((slot, sample), out) in positions.iter_mut().zip(&grid.samples).zip(outputs) {
            *slot = (sample.position * scale + sample.normal * out.displacement).to_array();
        }
    }
    if let Some(VertexAttributeValues::Float32x4(colors)) = mesh.attribute_mut(Mesh::ATTRIBUTE_COLOR) {
        for (slot, out) in colors.iter_mut().zip(outputs) {
            let c = out.color;
            *slot = [c.red, c.green, c.blue, c.alpha];
        }
    }
}

/// Vertex colors without the alpha channel, for surfaces drawn opaque.
pub fn write_opaque_tint(mesh: &mut Mesh, outputs: &[EffectOutput], base: [f32; 3]) {
    if let Some(VertexAttributeValues::Float32x4(colors)) = mesh.attribute_mut(Mesh::ATTRIBUTE_COLOR) {
        for (slot, out) in colors.iter_mut().zip(outputs) {
            let a = out.color.alpha.clamp(0.0, 1.0);
            *slot = [
                base[0] + (out.color.red - base[0]) * a,
                base[1] + (out.color.green - base[1]) * a,
                base[2] + (out.color.blue - base[2]) * a,
                1.0,
            ];
        }
    }
}
