//! Render batching for laid-out text blocks.
//!
//! A [`Frame`] accumulates quads for one render pass. Glyphs sharing
//! a render state (atlas page, fill, style bits, effects, smoothness)
//! coalesce into one SDF draw call; a state change or an inline image
//! flushes the batch. Prepared frames own their GPU buffers and can
//! be replayed into any compatible render pass.

use std::ops::Range;

use bytemuck::{Pod, Zeroable};
use glam::{vec2, Affine2, Mat4, Vec2, Vec4};
use palette::Srgba;
use wgpu::util::DeviceExt;

use crate::{
    glyph::GlyphCache,
    image::{ImageId, Images},
    rect::Rect,
    text::{layout::{PositionedElement, TextBlock}, CharacterStyle, Fill, StyleFlags},
};

pub(crate) mod quad;
pub(crate) mod text;

use self::quad::{QuadParams, QuadPipeline, MODE_ALPHA_MASK, MODE_SOLID, MODE_TEXTURED};
use self::text::{SdfParams, TextPipeline};

pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Bgra8UnormSrgb;

/// Default bold edge shift in SDF distance units.
const BOLD_STRENGTH: f32 = 0.03;

/// Italic shear as a fraction of the quad height, applied to the top
/// edge.
const ITALIC_SHEAR: f32 = 0.2;

#[derive(Copy, Clone, Debug, Pod, Zeroable)]
#[repr(C)]
pub(crate) struct Vertex {
    pos: Vec2,
    uv: Vec2,
    color: Vec4,
}

#[derive(Copy, Clone, Debug, Pod, Zeroable)]
#[repr(C)]
pub(crate) struct Globals {
    ortho: Mat4,
}

pub(crate) fn color_to_vec4(color: Srgba<u8>) -> Vec4 {
    Vec4::new(
        color.red as f32 / 255.,
        color.green as f32 / 255.,
        color.blue as f32 / 255.,
        color.alpha as f32 / 255.,
    )
}

/// The smoothness uniform for a glyph scaled by
/// `render_size / design_size`, with the process-wide adjustment
/// folded in.
pub(crate) fn smoothness_for_scale(scale: f32, adjustment: f32) -> f32 {
    (0.02 / scale.max(0.25).sqrt() + adjustment).clamp(0.001, 0.1)
}

pub(crate) struct Renderer {
    text: TextPipeline,
    quad: QuadPipeline,
    sampler: wgpu::Sampler,
    /// 1x1 white texture bound for solid-color draws.
    white_view: wgpu::TextureView,
}

impl Renderer {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("text_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            lod_min_clamp: 0.,
            lod_max_clamp: 100.,
            compare: None,
            anisotropy_clamp: None,
            border_color: None,
        });

        let white = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("white_pixel"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::COPY_DST | wgpu::TextureUsages::TEXTURE_BINDING,
        });
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &white,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &[255u8; 4],
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(std::num::NonZeroU32::new(4).unwrap()),
                rows_per_image: Some(std::num::NonZeroU32::new(1).unwrap()),
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );

        Self {
            text: TextPipeline::new(device),
            quad: QuadPipeline::new(device),
            sampler,
            white_view: white.create_view(&Default::default()),
        }
    }
}

/// Fingerprint of the state a glyph batch is drawn with. A difference
/// in any field flushes the accumulated quads and rebinds uniforms.
#[derive(Clone, PartialEq)]
struct BatchState {
    page: u16,
    fill: Fill,
    flags: StyleFlags,
    params: SdfParams,
}

enum Pending {
    None,
    Sdf { state: BatchState, start: u32 },
    Alpha { page: u16, start: u32 },
}

enum Call {
    Sdf {
        page: u16,
        params: SdfParams,
        indices: Range<u32>,
    },
    AlphaGlyphs {
        page: u16,
        indices: Range<u32>,
    },
    Image {
        image: ImageId,
        indices: Range<u32>,
    },
    Solid {
        indices: Range<u32>,
    },
}

/// One render pass worth of batched quads.
pub struct Frame {
    text_vertices: Vec<Vertex>,
    text_indices: Vec<u32>,
    quad_vertices: Vec<Vertex>,
    quad_indices: Vec<u32>,
    calls: Vec<Call>,
    pending: Pending,
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl Frame {
    pub fn new() -> Self {
        Self {
            text_vertices: Vec::new(),
            text_indices: Vec::new(),
            quad_vertices: Vec::new(),
            quad_indices: Vec::new(),
            calls: Vec::new(),
            pending: Pending::None,
        }
    }

    /// Emits a positioned text block. `transform` is applied to all
    /// geometry; `tint` multiplies every fill and effect color;
    /// `clip` rejects geometry in block-local coordinates.
    pub(crate) fn draw_block(
        &mut self,
        block: &TextBlock,
        transform: Affine2,
        tint: Srgba<u8>,
        clip: Option<Rect>,
        atlas_page_size: Vec2,
        smoothness_adjustment: f32,
    ) {
        let tint_v = color_to_vec4(tint);
        for line in &block.lines {
            let baseline_y = line.baseline_y();
            for element in &block.elements[line.element_range()] {
                match element {
                    PositionedElement::Glyph(glyph) => {
                        if glyph.render.rect.is_empty() {
                            continue;
                        }
                        let style = block.element_style(element);
                        let scale = glyph.render.scale_for(glyph.size);
                        let dest = Rect::new(
                            vec2(
                                glyph.position.x + glyph.render.draw_offset.x * scale,
                                baseline_y + glyph.position.y + glyph.render.draw_offset.y * scale,
                            ),
                            vec2(
                                glyph.render.rect.size.x as f32 * scale,
                                glyph.render.rect.size.y as f32 * scale,
                            ),
                        );
                        let uv_min = vec2(
                            glyph.render.rect.pos.x as f32 / atlas_page_size.x,
                            glyph.render.rect.pos.y as f32 / atlas_page_size.y,
                        );
                        let uv_max = vec2(
                            (glyph.render.rect.pos.x + glyph.render.rect.size.x) as f32
                                / atlas_page_size.x,
                            (glyph.render.rect.pos.y + glyph.render.rect.size.y) as f32
                                / atlas_page_size.y,
                        );
                        let (dest, uv_min, uv_max) = match clip_quad(dest, uv_min, uv_max, clip) {
                            Some(c) => c,
                            None => continue,
                        };

                        if glyph.render.is_sdf {
                            let smoothness =
                                smoothness_for_scale(scale, smoothness_adjustment);
                            let params = sdf_params(
                                style,
                                glyph.flags,
                                tint_v,
                                smoothness,
                                atlas_page_size,
                            );
                            let state = BatchState {
                                page: glyph.render.page,
                                fill: glyph.fill.clone(),
                                flags: glyph.flags,
                                params,
                            };
                            self.switch_to_sdf(state);
                            let shear = if glyph.flags.italic {
                                ITALIC_SHEAR * dest.size.y
                            } else {
                                0.
                            };
                            let colors = fill_corners(&glyph.fill, tint_v);
                            push_quad(
                                &mut self.text_vertices,
                                &mut self.text_indices,
                                dest,
                                uv_min,
                                uv_max,
                                colors,
                                shear,
                                transform,
                            );
                        } else {
                            self.switch_to_alpha(glyph.render.page);
                            let color = fill_solid_color(&glyph.fill) * tint_v;
                            push_quad(
                                &mut self.quad_vertices,
                                &mut self.quad_indices,
                                dest,
                                uv_min,
                                uv_max,
                                [color; 4],
                                0.,
                                transform,
                            );
                        }
                    }
                    PositionedElement::Image(image) => {
                        self.flush();
                        let dest = Rect::new(
                            vec2(image.position.x, baseline_y + image.position.y),
                            image.size,
                        );
                        let (dest, uv_min, uv_max) =
                            match clip_quad(dest, Vec2::ZERO, Vec2::ONE, clip) {
                                Some(c) => c,
                                None => continue,
                            };
                        let start = self.quad_indices.len() as u32;
                        push_quad(
                            &mut self.quad_vertices,
                            &mut self.quad_indices,
                            dest,
                            uv_min,
                            uv_max,
                            [tint_v; 4],
                            0.,
                            transform,
                        );
                        self.calls.push(Call::Image {
                            image: image.image.image,
                            indices: start..self.quad_indices.len() as u32,
                        });
                    }
                }
            }
        }
        self.flush();
    }

    /// Emits solid rectangles (selection highlight) in block-local
    /// coordinates.
    pub(crate) fn draw_solid_rects(
        &mut self,
        rects: &[Rect],
        color: Srgba<u8>,
        transform: Affine2,
    ) {
        if rects.is_empty() {
            return;
        }
        self.flush();
        let color = color_to_vec4(color);
        let start = self.quad_indices.len() as u32;
        for rect in rects {
            push_quad(
                &mut self.quad_vertices,
                &mut self.quad_indices,
                *rect,
                Vec2::ZERO,
                Vec2::ONE,
                [color; 4],
                0.,
                transform,
            );
        }
        self.calls.push(Call::Solid {
            indices: start..self.quad_indices.len() as u32,
        });
    }

    fn switch_to_sdf(&mut self, state: BatchState) {
        let matches = matches!(&self.pending, Pending::Sdf { state: s, .. } if *s == state);
        if matches {
            return;
        }
        self.flush();
        self.pending = Pending::Sdf {
            state,
            start: self.text_indices.len() as u32,
        };
    }

    fn switch_to_alpha(&mut self, page: u16) {
        let matches = matches!(&self.pending, Pending::Alpha { page: p, .. } if *p == page);
        if matches {
            return;
        }
        self.flush();
        self.pending = Pending::Alpha {
            page,
            start: self.quad_indices.len() as u32,
        };
    }

    fn flush(&mut self) {
        match std::mem::replace(&mut self.pending, Pending::None) {
            Pending::None => {}
            Pending::Sdf { state, start } => {
                let end = self.text_indices.len() as u32;
                if end > start {
                    self.calls.push(Call::Sdf {
                        page: state.page,
                        params: state.params,
                        indices: start..end,
                    });
                }
            }
            Pending::Alpha { page, start } => {
                let end = self.quad_indices.len() as u32;
                if end > start {
                    self.calls.push(Call::AlphaGlyphs {
                        page,
                        indices: start..end,
                    });
                }
            }
        }
    }

    /// Uploads the frame's geometry and builds per-call bind groups.
    pub(crate) fn prepare(
        mut self,
        device: &wgpu::Device,
        renderer: &Renderer,
        glyphs: &GlyphCache,
        images: &Images,
        target_size: Vec2,
    ) -> PreparedFrame {
        self.flush();

        let globals = Globals {
            ortho: Mat4::orthographic_rh(0., target_size.x, target_size.y, 0., 0., 1.),
        };
        let globals = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("text_globals"),
            contents: bytemuck::bytes_of(&globals),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let text_vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: None,
            contents: bytemuck::cast_slice(&self.text_vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let text_indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: None,
            contents: bytemuck::cast_slice(&self.text_indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let quad_vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: None,
            contents: bytemuck::cast_slice(&self.quad_vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let quad_indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: None,
            contents: bytemuck::cast_slice(&self.quad_indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let solid_params = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: None,
            contents: bytemuck::bytes_of(&QuadParams {
                mode: MODE_SOLID,
                _pad: [0; 3],
            }),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let textured_params = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: None,
            contents: bytemuck::bytes_of(&QuadParams {
                mode: MODE_TEXTURED,
                _pad: [0; 3],
            }),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let alpha_params = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: None,
            contents: bytemuck::bytes_of(&QuadParams {
                mode: MODE_ALPHA_MASK,
                _pad: [0; 3],
            }),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let mut prepared_calls = Vec::with_capacity(self.calls.len());
        for call in &self.calls {
            match call {
                Call::Sdf {
                    page,
                    params,
                    indices,
                } => {
                    let view = match glyphs.page(*page) {
                        Some(p) => p.view(),
                        None => continue,
                    };
                    let params = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: None,
                        contents: bytemuck::bytes_of(params),
                        usage: wgpu::BufferUsages::UNIFORM,
                    });
                    let bind_group = renderer.text.bind_group(
                        device,
                        &globals,
                        view,
                        &renderer.sampler,
                        &params,
                    );
                    prepared_calls.push(PreparedCall::Text {
                        bind_group,
                        indices: indices.clone(),
                    });
                }
                Call::AlphaGlyphs { page, indices } => {
                    let view = match glyphs.page(*page) {
                        Some(p) => p.view(),
                        None => continue,
                    };
                    let bind_group = renderer.quad.bind_group(
                        device,
                        &globals,
                        view,
                        &renderer.sampler,
                        &alpha_params,
                    );
                    prepared_calls.push(PreparedCall::Quad {
                        bind_group,
                        indices: indices.clone(),
                    });
                }
                Call::Image { image, indices } => {
                    let view = match images.get(*image) {
                        Some(i) => i.view(),
                        None => {
                            log::warn!("skipping stale inline image {:?}", image);
                            continue;
                        }
                    };
                    let bind_group = renderer.quad.bind_group(
                        device,
                        &globals,
                        view,
                        &renderer.sampler,
                        &textured_params,
                    );
                    prepared_calls.push(PreparedCall::Quad {
                        bind_group,
                        indices: indices.clone(),
                    });
                }
                Call::Solid { indices } => {
                    let bind_group = renderer.quad.bind_group(
                        device,
                        &globals,
                        &renderer.white_view,
                        &renderer.sampler,
                        &solid_params,
                    );
                    prepared_calls.push(PreparedCall::Quad {
                        bind_group,
                        indices: indices.clone(),
                    });
                }
            }
        }

        PreparedFrame {
            text_vertices,
            text_indices,
            quad_vertices,
            quad_indices,
            calls: prepared_calls,
        }
    }
}

enum PreparedCall {
    Text {
        bind_group: wgpu::BindGroup,
        indices: Range<u32>,
    },
    Quad {
        bind_group: wgpu::BindGroup,
        indices: Range<u32>,
    },
}

/// A frame with uploaded geometry, ready to replay into a pass.
pub struct PreparedFrame {
    text_vertices: wgpu::Buffer,
    text_indices: wgpu::Buffer,
    quad_vertices: wgpu::Buffer,
    quad_indices: wgpu::Buffer,
    calls: Vec<PreparedCall>,
}

impl PreparedFrame {
    pub(crate) fn render<'a>(
        &'a self,
        renderer: &'a Renderer,
        pass: &mut wgpu::RenderPass<'a>,
    ) {
        for call in &self.calls {
            match call {
                PreparedCall::Text {
                    bind_group,
                    indices,
                } => {
                    pass.set_pipeline(renderer.text.pipeline());
                    pass.set_bind_group(0, bind_group, &[]);
                    pass.set_vertex_buffer(0, self.text_vertices.slice(..));
                    pass.set_index_buffer(self.text_indices.slice(..), wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(indices.clone(), 0, 0..1);
                }
                PreparedCall::Quad {
                    bind_group,
                    indices,
                } => {
                    pass.set_pipeline(renderer.quad.pipeline());
                    pass.set_bind_group(0, bind_group, &[]);
                    pass.set_vertex_buffer(0, self.quad_vertices.slice(..));
                    pass.set_index_buffer(self.quad_indices.slice(..), wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(indices.clone(), 0, 0..1);
                }
            }
        }
    }
}

fn fill_solid_color(fill: &Fill) -> Vec4 {
    match fill {
        Fill::Solid(c) => color_to_vec4(*c),
        Fill::LinearGradient { stops, .. } => stops
            .first()
            .map(|s| color_to_vec4(s.color))
            .unwrap_or(Vec4::ONE),
    }
}

/// Fill colors for the four quad corners in order top-left,
/// top-right, bottom-right, bottom-left.
fn fill_corners(fill: &Fill, tint: Vec4) -> [Vec4; 4] {
    let corners = [
        vec2(0., 0.),
        vec2(1., 0.),
        vec2(1., 1.),
        vec2(0., 1.),
    ];
    let mut colors = [Vec4::ONE; 4];
    for (color, corner) in colors.iter_mut().zip(corners) {
        *color = color_to_vec4(fill.color_at(corner)) * tint;
    }
    colors
}

/// Builds the per-batch SDF uniform block from a character style.
fn sdf_params(
    style: &CharacterStyle,
    flags: StyleFlags,
    tint: Vec4,
    smoothness: f32,
    atlas_page_size: Vec2,
) -> SdfParams {
    let mut params = SdfParams {
        smoothness,
        ..Default::default()
    };
    if flags.bold {
        params.flags |= text::FLAG_BOLD;
        params.bold_strength = BOLD_STRENGTH;
    }
    if style.outline.enabled {
        params.flags |= text::FLAG_OUTLINE;
        params.outline_color = color_to_vec4(style.outline.color) * tint;
        params.outline_width = style.outline.width;
    }
    if style.glow.enabled {
        params.flags |= text::FLAG_GLOW;
        params.glow_color = color_to_vec4(style.glow.color) * tint;
        params.glow_range = style.glow.range;
        params.glow_intensity = style.glow.intensity;
    }
    if style.shadow.enabled {
        params.flags |= text::FLAG_SHADOW;
        params.shadow_color = color_to_vec4(style.shadow.color) * tint;
        params.shadow_offset = style.shadow.offset / atlas_page_size;
        params.shadow_spread = style.shadow.spread;
    }
    if style.inner.enabled {
        params.flags |= text::FLAG_INNER;
        if style.inner.is_shadow {
            params.flags |= text::FLAG_INNER_IS_SHADOW;
        }
        params.inner_color = color_to_vec4(style.inner.color) * tint;
        params.inner_range = style.inner.range;
    }
    params
}

/// Clips a destination rectangle against an optional local-space clip
/// rect, trimming texture coordinates proportionally. Returns `None`
/// when nothing is left.
fn clip_quad(
    dest: Rect,
    uv_min: Vec2,
    uv_max: Vec2,
    clip: Option<Rect>,
) -> Option<(Rect, Vec2, Vec2)> {
    let clip = match clip {
        Some(c) => c,
        None => return Some((dest, uv_min, uv_max)),
    };
    let clipped = dest.intersection(clip);
    if clipped.is_empty() {
        return None;
    }
    if clipped == dest {
        return Some((dest, uv_min, uv_max));
    }
    let uv_size = uv_max - uv_min;
    let t0 = (clipped.pos - dest.pos) / dest.size;
    let t1 = (clipped.max() - dest.pos) / dest.size;
    Some((
        clipped,
        uv_min + uv_size * t0,
        uv_min + uv_size * t1,
    ))
}

fn push_quad(
    vertices: &mut Vec<Vertex>,
    indices: &mut Vec<u32>,
    dest: Rect,
    uv_min: Vec2,
    uv_max: Vec2,
    colors: [Vec4; 4],
    shear: f32,
    transform: Affine2,
) {
    let max = dest.max();
    let corners = [
        vec2(dest.pos.x + shear, dest.pos.y),
        vec2(max.x + shear, dest.pos.y),
        vec2(max.x, max.y),
        vec2(dest.pos.x, max.y),
    ];
    let uvs = [
        uv_min,
        vec2(uv_max.x, uv_min.y),
        uv_max,
        vec2(uv_min.x, uv_max.y),
    ];
    let base = vertices.len() as u32;
    for ((corner, uv), color) in corners.iter().zip(uvs).zip(colors) {
        vertices.push(Vertex {
            pos: transform.transform_point2(*corner),
            uv,
            color,
        });
    }
    indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    #[test]
    fn smoothness_follows_the_scale_curve() {
        // At design size the default smoothness is 0.02.
        assert!((smoothness_for_scale(1., 0.) - 0.02).abs() < 1e-6);
        // Shrinking below a quarter of design size stops widening.
        assert_eq!(
            smoothness_for_scale(0.1, 0.),
            smoothness_for_scale(0.25, 0.)
        );
        // Clamped to the documented range.
        assert_eq!(smoothness_for_scale(0.25, 1.), 0.1);
        assert_eq!(smoothness_for_scale(100., -1.), 0.001);
    }

    #[test]
    fn clip_trims_uvs_proportionally() {
        let dest = Rect::new(vec2(0., 0.), vec2(10., 10.));
        let clip = Rect::new(vec2(5., 0.), vec2(10., 10.));
        let (clipped, uv_min, uv_max) =
            clip_quad(dest, Vec2::ZERO, Vec2::ONE, Some(clip)).unwrap();
        assert_eq!(clipped.pos, vec2(5., 0.));
        assert!((uv_min.x - 0.5).abs() < 1e-6);
        assert!((uv_max.x - 1.).abs() < 1e-6);
    }

    #[test]
    fn clip_rejects_disjoint_quads() {
        let dest = Rect::new(vec2(0., 0.), vec2(10., 10.));
        let clip = Rect::new(vec2(50., 50.), vec2(10., 10.));
        assert!(clip_quad(dest, Vec2::ZERO, Vec2::ONE, Some(clip)).is_none());
    }

    #[test]
    fn quads_shear_only_the_top_edge() {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        push_quad(
            &mut vertices,
            &mut indices,
            Rect::new(vec2(0., 0.), vec2(10., 20.)),
            Vec2::ZERO,
            Vec2::ONE,
            [Vec4::ONE; 4],
            4.,
            Affine2::IDENTITY,
        );
        assert_eq!(vertices[0].pos, vec2(4., 0.));
        assert_eq!(vertices[1].pos, vec2(14., 0.));
        assert_eq!(vertices[2].pos, vec2(10., 20.));
        assert_eq!(vertices[3].pos, vec2(0., 20.));
        assert_eq!(indices, vec![0, 1, 2, 2, 3, 0]);
    }

    #[test]
    fn vertex_layout_matches_attribute_array() {
        assert_eq!(size_of::<Vertex>(), 32);
        assert_eq!(size_of::<SdfParams>(), 112);
        assert_eq!(size_of::<QuadParams>(), 16);
    }
}
