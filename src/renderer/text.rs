//! The SDF glyph pipeline.
//!
//! One bind group per batch: globals, the batch's atlas page, the
//! shared sampler, and the batch parameters. The fragment program
//! composites drop shadow, glow, outline, and fill (with optional
//! inner effect) from a single-channel distance texture; the fill
//! color rides on the vertices so gradients do not split batches.

use std::mem::size_of;

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec4};

use crate::renderer::{Globals, Vertex, TARGET_FORMAT};

pub(crate) const FLAG_OUTLINE: u32 = 1 << 0;
pub(crate) const FLAG_GLOW: u32 = 1 << 1;
pub(crate) const FLAG_SHADOW: u32 = 1 << 2;
pub(crate) const FLAG_INNER: u32 = 1 << 3;
pub(crate) const FLAG_INNER_IS_SHADOW: u32 = 1 << 4;
pub(crate) const FLAG_BOLD: u32 = 1 << 5;

/// Per-batch shader parameters. Layout must match `shaders/text.wgsl`.
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub(crate) struct SdfParams {
    pub outline_color: Vec4,
    pub glow_color: Vec4,
    pub shadow_color: Vec4,
    pub inner_color: Vec4,
    /// Shadow sampling offset in texture coordinates.
    pub shadow_offset: Vec2,
    pub edge: f32,
    pub smoothness: f32,
    pub outline_width: f32,
    pub glow_range: f32,
    pub glow_intensity: f32,
    pub shadow_spread: f32,
    pub inner_range: f32,
    pub bold_strength: f32,
    pub flags: u32,
    pub _pad: u32,
}

impl Default for SdfParams {
    fn default() -> Self {
        Self {
            outline_color: Vec4::ZERO,
            glow_color: Vec4::ZERO,
            shadow_color: Vec4::ZERO,
            inner_color: Vec4::ZERO,
            shadow_offset: Vec2::ZERO,
            edge: crate::sdf::ON_EDGE_VALUE,
            smoothness: 0.02,
            outline_width: 0.,
            glow_range: 0.,
            glow_intensity: 0.,
            shadow_spread: 0.,
            inner_range: 0.,
            bold_strength: 0.,
            flags: 0,
            _pad: 0,
        }
    }
}

pub(crate) struct TextPipeline {
    pipeline: wgpu::RenderPipeline,
    bg_layout: wgpu::BindGroupLayout,
}

impl TextPipeline {
    pub fn new(device: &wgpu::Device) -> Self {
        let bg_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sdf_text_bg_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: Some(
                            (size_of::<Globals>() as u64).try_into().unwrap(),
                        ),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler {
                        filtering: true,
                        comparison: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: Some(
                            (size_of::<SdfParams>() as u64).try_into().unwrap(),
                        ),
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: None,
            bind_group_layouts: &[&bg_layout],
            push_constant_ranges: &[],
        });

        let module = device.create_shader_module(&wgpu::ShaderModuleDescriptor {
            label: Some("sdf_text_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../shaders/text.wgsl").into()),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("sdf_text_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: size_of::<Vertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2, 2 => Float32x4],
                }],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: "fs_main",
                targets: &[wgpu::ColorTargetState {
                    format: TARGET_FORMAT,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                }],
            }),
        });

        Self {
            pipeline,
            bg_layout,
        }
    }

    pub fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    pub fn bind_group(
        &self,
        device: &wgpu::Device,
        globals: &wgpu::Buffer,
        page: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
        params: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sdf_text_bind_group"),
            layout: &self.bg_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(page),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: params.as_entire_binding(),
                },
            ],
        })
    }
}
