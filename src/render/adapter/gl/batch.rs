// PixelDeck
// copyright zipxing@hotmail.com 2022～2025

//! Vertex batching for the OpenGL driver.
//!
//! Every primitive becomes triangles in one interleaved vertex buffer:
//! pos(2) uv(2) color(4) color2(4) params(2). The buffer is flushed when the
//! bound texture changes, when a batch bracket closes, or after each call
//! outside a bracket.

use super::shader::GlShader;
use super::shader_source::{FRAGMENT_SRC_DECK, VERTEX_SRC_DECK};
use crate::render::RgbColor;
use crate::util::{Point, Rect, Size};
use glow::HasContext;
use std::rc::Rc;

const FLOATS_PER_VERTEX: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shading {
    Solid = 0,
    Textured = 1,
    Static = 2,
    Outlined = 3,
    Dither = 4,
}

/// Per-vertex coloring shared by the corners of one primitive.
#[derive(Debug, Clone, Copy)]
pub struct Paint {
    pub shading: Shading,
    pub color: RgbColor,
    pub color2: RgbColor,
    pub frac: u8,
}

impl Paint {
    pub fn solid(color: RgbColor) -> Paint {
        Paint {
            shading: Shading::Solid,
            color,
            color2: color,
            frac: 0,
        }
    }
}

pub struct GlBatch {
    gl: Rc<glow::Context>,
    shader: GlShader,
    vao: glow::VertexArray,
    vbo: glow::Buffer,
    white: glow::Texture,
    bound: Option<glow::Texture>,
    vertices: Vec<f32>,
    screen: Size,
}

impl GlBatch {
    pub fn new(gl: Rc<glow::Context>, ver: &str, screen: Size) -> Result<Self, String> {
        let shader = GlShader::new(&gl, ver, VERTEX_SRC_DECK, FRAGMENT_SRC_DECK)?;
        unsafe {
            let vao = gl.create_vertex_array()?;
            gl.bind_vertex_array(Some(vao));
            let vbo = gl.create_buffer()?;
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            let stride = (FLOATS_PER_VERTEX * 4) as i32;
            let layout: [(u32, i32, i32); 5] = [(0, 2, 0), (1, 2, 8), (2, 4, 16), (3, 4, 32), (4, 2, 48)];
            for (index, size, offset) in layout {
                gl.enable_vertex_attrib_array(index);
                gl.vertex_attrib_pointer_f32(index, size, glow::FLOAT, false, stride, offset);
            }
            gl.bind_vertex_array(None);

            // 1x1 white texture so untextured draws sample something valid
            let white = Self::upload(&gl, 1, 1, &[255, 255, 255, 255])?;

            gl.enable(glow::BLEND);
            gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);

            Ok(Self {
                gl,
                shader,
                vao,
                vbo,
                white,
                bound: None,
                vertices: Vec::with_capacity(FLOATS_PER_VERTEX * 6 * 256),
                screen,
            })
        }
    }

    pub fn upload(
        gl: &glow::Context,
        width: i32,
        height: i32,
        rgba: &[u8],
    ) -> Result<glow::Texture, String> {
        unsafe {
            let texture = gl.create_texture()?;
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::NEAREST as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::NEAREST as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA as i32,
                width,
                height,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(rgba)),
            );
            gl.bind_texture(glow::TEXTURE_2D, None);
            Ok(texture)
        }
    }

    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        unsafe {
            self.gl.clear_color(0.0, 0.0, 0.0, 1.0);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
        }
    }

    /// Binds `texture` (None: plain white), flushing first if it changes.
    pub fn use_texture(&mut self, texture: Option<glow::Texture>) {
        let texture = texture.or(Some(self.white));
        if self.bound != texture {
            self.flush();
            self.bound = texture;
        }
    }

    fn vertex(&mut self, p: (f32, f32), uv: (f32, f32), paint: &Paint) {
        let c = paint.color.to_f32();
        let c2 = paint.color2.to_f32();
        self.vertices.extend_from_slice(&[
            p.0,
            p.1,
            uv.0,
            uv.1,
            c[0],
            c[1],
            c[2],
            c[3],
            c2[0],
            c2[1],
            c2[2],
            c2[3],
            paint.shading as i32 as f32,
            paint.frac as f32,
        ]);
    }

    pub fn triangle(&mut self, pts: [(f32, f32); 3], paint: &Paint) {
        for p in pts {
            self.vertex(p, (0.0, 0.0), paint);
        }
    }

    /// Quad over `rect` sampling `uv` = (u0, v0, u1, v1).
    pub fn quad(&mut self, rect: Rect, uv: [f32; 4], paint: &Paint) {
        let (l, t, r, b) = (
            rect.left as f32,
            rect.top as f32,
            rect.right as f32,
            rect.bottom as f32,
        );
        let [u0, v0, u1, v1] = uv;
        for (p, tc) in [
            ((l, t), (u0, v0)),
            ((r, t), (u1, v0)),
            ((r, b), (u1, v1)),
            ((r, b), (u1, v1)),
            ((l, b), (u0, v1)),
            ((l, t), (u0, v0)),
        ] {
            self.vertex(p, tc, paint);
        }
    }

    /// One pixel wide line as a quad along its length.
    pub fn line(&mut self, from: Point, to: Point, paint: &Paint) {
        let (x0, y0) = (from.x as f32 + 0.5, from.y as f32 + 0.5);
        let (x1, y1) = (to.x as f32 + 0.5, to.y as f32 + 0.5);
        let (dx, dy) = (x1 - x0, y1 - y0);
        let len = (dx * dx + dy * dy).sqrt().max(1.0);
        let (nx, ny) = (-dy / len * 0.5, dx / len * 0.5);
        let (ex, ey) = (dx / len * 0.5, dy / len * 0.5);
        let a = (x0 - ex + nx, y0 - ey + ny);
        let b = (x1 + ex + nx, y1 + ey + ny);
        let c = (x1 + ex - nx, y1 + ey - ny);
        let d = (x0 - ex - nx, y0 - ey - ny);
        self.triangle([a, b, c], paint);
        self.triangle([c, d, a], paint);
    }

    pub fn flush(&mut self) {
        if self.vertices.is_empty() {
            return;
        }
        let gl = &self.gl;
        self.shader.bind(gl);
        unsafe {
            gl.bind_vertex_array(Some(self.vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.vbo));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                self.vertices.align_to::<u8>().1,
                glow::STREAM_DRAW,
            );
            gl.active_texture(glow::TEXTURE0);
            gl.bind_texture(glow::TEXTURE_2D, self.bound.or(Some(self.white)));
            let source_loc = gl.get_uniform_location(self.shader.program, "source");
            gl.uniform_1_i32(source_loc.as_ref(), 0);
            let screen_loc = gl.get_uniform_location(self.shader.program, "screen");
            gl.uniform_2_f32(
                screen_loc.as_ref(),
                self.screen.width as f32,
                self.screen.height as f32,
            );
            let count = (self.vertices.len() / FLOATS_PER_VERTEX) as i32;
            gl.draw_arrays(glow::TRIANGLES, 0, count);
            gl.bind_vertex_array(None);
        }
        self.vertices.clear();
    }
}

impl Drop for GlBatch {
    fn drop(&mut self) {
        unsafe {
            self.gl.delete_buffer(self.vbo);
            self.gl.delete_vertex_array(self.vao);
            self.gl.delete_texture(self.white);
            self.gl.delete_program(self.shader.program);
        }
    }
}
