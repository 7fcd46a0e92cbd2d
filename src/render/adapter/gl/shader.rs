// PixelDeck
// copyright zipxing@hotmail.com 2022～2025

use glow::HasContext;
use log::info;

#[derive(Clone)]
pub struct GlShader {
    pub program: glow::Program,
}

impl GlShader {
    /// Compiles and links a program; any compile or link failure is returned
    /// with the driver's info log.
    pub fn new(
        gl: &glow::Context,
        ver: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self, String> {
        unsafe {
            let vertex_shader = Self::compile(gl, glow::VERTEX_SHADER, ver, vertex_source)?;
            let fragment_shader = Self::compile(gl, glow::FRAGMENT_SHADER, ver, fragment_source)?;

            let program = gl.create_program()?;
            gl.attach_shader(program, vertex_shader);
            gl.attach_shader(program, fragment_shader);
            gl.link_program(program);
            let linked = gl.get_program_link_status(program);
            gl.detach_shader(program, vertex_shader);
            gl.detach_shader(program, fragment_shader);
            gl.delete_shader(vertex_shader);
            gl.delete_shader(fragment_shader);
            if !linked {
                let log = gl.get_program_info_log(program);
                gl.delete_program(program);
                return Err(format!("Program Linking Error: {}", log));
            }
            info!("shader program linked");

            Ok(Self { program })
        }
    }

    unsafe fn compile(
        gl: &glow::Context,
        kind: u32,
        ver: &str,
        source: &str,
    ) -> Result<glow::Shader, String> {
        let shader = gl.create_shader(kind)?;
        gl.shader_source(shader, &format!("{}\n{}", ver, source));
        gl.compile_shader(shader);
        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            let stage = if kind == glow::VERTEX_SHADER {
                "Vertex"
            } else {
                "Fragment"
            };
            return Err(format!("{} Shader Compilation Error: {}", stage, log));
        }
        Ok(shader)
    }

    pub fn bind(&self, gl: &glow::Context) {
        unsafe {
            gl.use_program(Some(self.program));
        }
    }
}
