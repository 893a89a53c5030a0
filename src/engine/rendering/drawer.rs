//! ### English
//! `glow` implementation of [`GlDrawer`]: full-rectangle textured quad with an I420 → RGB
//! program and an external-OES program, plus the three-plane YUV texture uploader.
//!
//! ### 中文
//! [`GlDrawer`] 的 `glow` 实现：全矩形纹理四边形，包含 I420 → RGB 程序与外部 OES 程序，
//! 以及三平面 YUV 纹理上传器。

use std::borrow::Cow;
use std::num::NonZeroU32;
use std::sync::Arc;

use glow::HasContext as _;

use crate::engine::error::RenderError;
use crate::engine::frame::I420Buffer;
use crate::engine::matrix::Mat4;

use super::{GlDrawer, Viewport};

/// GLES2 luminance format; not part of the core-profile constant set.
const LUMINANCE: u32 = 0x1909;
const TEXTURE_EXTERNAL_OES: u32 = 0x8D65;

const VERTEX_SHADER: &str = "\
varying vec2 interp_tc;
attribute vec4 in_pos;
attribute vec4 in_tc;
uniform mat4 texMatrix;
void main() {
    gl_Position = in_pos;
    interp_tc = (texMatrix * in_tc).xy;
}
";

const YUV_FRAGMENT_SHADER: &str = "\
precision mediump float;
varying vec2 interp_tc;
uniform sampler2D y_tex;
uniform sampler2D u_tex;
uniform sampler2D v_tex;
void main() {
    float y = texture2D(y_tex, interp_tc).r;
    float u = texture2D(u_tex, interp_tc).r - 0.5;
    float v = texture2D(v_tex, interp_tc).r - 0.5;
    gl_FragColor = vec4(y + 1.403 * v, y - 0.344 * u - 0.714 * v, y + 1.77 * u, 1);
}
";

const OES_FRAGMENT_SHADER: &str = "\
#extension GL_OES_EGL_image_external : require
precision mediump float;
varying vec2 interp_tc;
uniform samplerExternalOES oes_tex;
void main() {
    gl_FragColor = texture2D(oes_tex, interp_tc);
}
";

/// ### English
/// Interleaved triangle strip covering clip space: `(x, y, u, v)` per vertex.
///
/// ### 中文
/// 覆盖整个裁剪空间的交错三角形带：每个顶点为 `(x, y, u, v)`。
const FULL_RECTANGLE: [f32; 16] = [
    -1.0, -1.0, 0.0, 0.0, //
    1.0, -1.0, 1.0, 0.0, //
    -1.0, 1.0, 0.0, 1.0, //
    1.0, 1.0, 1.0, 1.0,
];

const PLANE_SAMPLERS: [&str; 3] = ["y_tex", "u_tex", "v_tex"];

/// ### English
/// One linked program and the locations the draw call needs.
///
/// ### 中文
/// 一个已链接的着色器程序及绘制所需的位置信息。
struct GlShader {
    program: glow::NativeProgram,
    tex_matrix: Option<glow::NativeUniformLocation>,
    in_pos: u32,
    in_tc: u32,
}

/// ### English
/// Draws frames as a full-rectangle textured quad. Programs, the vertex buffer and the plane
/// textures are created lazily on first use; the context must be current on the calling thread.
///
/// ### 中文
/// 以全矩形纹理四边形绘制帧。着色器程序、顶点缓冲与平面纹理在首次使用时惰性创建；
/// 调用线程上必须已 make current。
pub struct GlRectDrawer {
    gl: Arc<glow::Context>,
    yuv_shader: Option<GlShader>,
    oes_shader: Option<GlShader>,
    vertex_buffer: Option<glow::NativeBuffer>,
    yuv_textures: Option<[glow::NativeTexture; 3]>,
    /// ### English
    /// Scratch buffer reused when a plane's stride is wider than its width.
    ///
    /// ### 中文
    /// 当平面跨度大于宽度时复用的临时打包缓冲。
    pack_scratch: Vec<u8>,
}

impl GlRectDrawer {
    pub fn new(gl: Arc<glow::Context>) -> Self {
        Self {
            gl,
            yuv_shader: None,
            oes_shader: None,
            vertex_buffer: None,
            yuv_textures: None,
            pack_scratch: Vec::new(),
        }
    }

    fn ensure_vertex_buffer(&mut self) -> Result<glow::NativeBuffer, RenderError> {
        if let Some(buffer) = self.vertex_buffer {
            return Ok(buffer);
        }

        let bytes: Vec<u8> = FULL_RECTANGLE.iter().flat_map(|v| v.to_ne_bytes()).collect();
        let buffer = unsafe {
            let buffer = self.gl.create_buffer().map_err(RenderError::Draw)?;
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            self.gl
                .buffer_data_u8_slice(glow::ARRAY_BUFFER, &bytes, glow::STATIC_DRAW);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
            buffer
        };
        self.vertex_buffer = Some(buffer);
        Ok(buffer)
    }

    fn ensure_yuv_textures(&mut self) -> Result<[glow::NativeTexture; 3], RenderError> {
        if let Some(textures) = self.yuv_textures {
            return Ok(textures);
        }

        let textures = [
            generate_texture(&self.gl, glow::TEXTURE_2D)?,
            generate_texture(&self.gl, glow::TEXTURE_2D)?,
            generate_texture(&self.gl, glow::TEXTURE_2D)?,
        ];
        self.yuv_textures = Some(textures);
        Ok(textures)
    }

    /// ### English
    /// Uploads the Y, U and V planes into the three luminance textures.
    ///
    /// ### 中文
    /// 将 Y、U、V 平面上传到三个亮度纹理。
    fn upload_yuv(
        &mut self,
        textures: &[glow::NativeTexture; 3],
        buffer: &I420Buffer,
        width: u32,
        height: u32,
    ) -> Result<(), RenderError> {
        let plane_sizes = [
            (width, height),
            (width / 2, height / 2),
            (width / 2, height / 2),
        ];

        unsafe {
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
        }
        for plane in 0..3 {
            let (plane_width, plane_height) = plane_sizes[plane];
            let data = pack_plane(
                &buffer.planes[plane],
                buffer.strides[plane],
                plane_width,
                plane_height,
                &mut self.pack_scratch,
            )
            .ok_or_else(|| {
                RenderError::Draw(format!(
                    "plane {plane} holds {} bytes, too few for {plane_width}x{plane_height} with stride {}",
                    buffer.planes[plane].len(),
                    buffer.strides[plane]
                ))
            })?;

            unsafe {
                self.gl.active_texture(glow::TEXTURE0 + plane as u32);
                self.gl.bind_texture(glow::TEXTURE_2D, Some(textures[plane]));
                self.gl.tex_image_2d(
                    glow::TEXTURE_2D,
                    0,
                    LUMINANCE as i32,
                    plane_width as i32,
                    plane_height as i32,
                    0,
                    LUMINANCE,
                    glow::UNSIGNED_BYTE,
                    glow::PixelUnpackData::Slice(Some(&data)),
                );
            }
        }
        Ok(())
    }

    fn draw_rectangle(
        &mut self,
        shader: ShaderKind,
        tex_matrix: &Mat4,
        viewport: Viewport,
    ) -> Result<(), RenderError> {
        let vertex_buffer = self.ensure_vertex_buffer()?;
        let slot = match shader {
            ShaderKind::Yuv => &mut self.yuv_shader,
            ShaderKind::Oes => &mut self.oes_shader,
        };
        if slot.is_none() {
            *slot = Some(link_shader(&self.gl, shader)?);
        }
        let Some(shader) = slot.as_ref() else {
            return Ok(());
        };

        let stride = (4 * std::mem::size_of::<f32>()) as i32;
        unsafe {
            let gl = &self.gl;
            gl.viewport(
                viewport.x,
                viewport.y,
                viewport.width as i32,
                viewport.height as i32,
            );
            gl.use_program(Some(shader.program));
            gl.uniform_matrix_4_f32_slice(shader.tex_matrix.as_ref(), false, tex_matrix);
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vertex_buffer));
            gl.enable_vertex_attrib_array(shader.in_pos);
            gl.vertex_attrib_pointer_f32(shader.in_pos, 2, glow::FLOAT, false, stride, 0);
            gl.enable_vertex_attrib_array(shader.in_tc);
            gl.vertex_attrib_pointer_f32(
                shader.in_tc,
                2,
                glow::FLOAT,
                false,
                stride,
                2 * std::mem::size_of::<f32>() as i32,
            );
            gl.draw_arrays(glow::TRIANGLE_STRIP, 0, 4);
            gl.disable_vertex_attrib_array(shader.in_pos);
            gl.disable_vertex_attrib_array(shader.in_tc);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            gl.use_program(None);
        }
        Ok(())
    }
}

impl GlDrawer for GlRectDrawer {
    fn draw_yuv(
        &mut self,
        buffer: &I420Buffer,
        width: u32,
        height: u32,
        tex_matrix: &Mat4,
        viewport: Viewport,
    ) -> Result<(), RenderError> {
        let textures = self.ensure_yuv_textures()?;
        self.upload_yuv(&textures, buffer, width, height)?;
        self.draw_rectangle(ShaderKind::Yuv, tex_matrix, viewport)?;
        unsafe {
            for plane in 0..3 {
                self.gl.active_texture(glow::TEXTURE0 + plane);
                self.gl.bind_texture(glow::TEXTURE_2D, None);
            }
        }
        Ok(())
    }

    fn draw_oes(
        &mut self,
        texture_id: u32,
        tex_matrix: &Mat4,
        viewport: Viewport,
    ) -> Result<(), RenderError> {
        let texture = NonZeroU32::new(texture_id)
            .map(glow::NativeTexture)
            .ok_or_else(|| RenderError::Draw("OES texture id 0".to_string()))?;
        unsafe {
            self.gl.active_texture(glow::TEXTURE0);
            self.gl.bind_texture(TEXTURE_EXTERNAL_OES, Some(texture));
        }
        self.draw_rectangle(ShaderKind::Oes, tex_matrix, viewport)?;
        unsafe {
            self.gl.bind_texture(TEXTURE_EXTERNAL_OES, None);
        }
        Ok(())
    }

    fn release(&mut self) {
        unsafe {
            for shader in [self.yuv_shader.take(), self.oes_shader.take()]
                .into_iter()
                .flatten()
            {
                self.gl.delete_program(shader.program);
            }
            if let Some(buffer) = self.vertex_buffer.take() {
                self.gl.delete_buffer(buffer);
            }
            if let Some(textures) = self.yuv_textures.take() {
                for texture in textures {
                    self.gl.delete_texture(texture);
                }
            }
        }
        self.pack_scratch = Vec::new();
    }
}

#[derive(Clone, Copy, Debug)]
enum ShaderKind {
    Yuv,
    Oes,
}

fn generate_texture(gl: &glow::Context, target: u32) -> Result<glow::NativeTexture, RenderError> {
    unsafe {
        let texture = gl.create_texture().map_err(RenderError::Draw)?;
        gl.bind_texture(target, Some(texture));
        gl.tex_parameter_i32(target, glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
        gl.tex_parameter_i32(target, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
        gl.tex_parameter_i32(target, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
        gl.tex_parameter_i32(target, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
        gl.bind_texture(target, None);
        Ok(texture)
    }
}

fn compile(gl: &glow::Context, kind: u32, source: &str) -> Result<glow::NativeShader, RenderError> {
    unsafe {
        let shader = gl.create_shader(kind).map_err(RenderError::Draw)?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);
        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            return Err(RenderError::Draw(format!("shader compile failed: {log}")));
        }
        Ok(shader)
    }
}

fn link_shader(gl: &glow::Context, kind: ShaderKind) -> Result<GlShader, RenderError> {
    let fragment_source = match kind {
        ShaderKind::Yuv => YUV_FRAGMENT_SHADER,
        ShaderKind::Oes => OES_FRAGMENT_SHADER,
    };
    let vertex = compile(gl, glow::VERTEX_SHADER, VERTEX_SHADER)?;
    let fragment = match compile(gl, glow::FRAGMENT_SHADER, fragment_source) {
        Ok(fragment) => fragment,
        Err(err) => {
            unsafe { gl.delete_shader(vertex) };
            return Err(err);
        }
    };

    unsafe {
        let program = gl.create_program().map_err(RenderError::Draw)?;
        gl.attach_shader(program, vertex);
        gl.attach_shader(program, fragment);
        gl.link_program(program);
        gl.detach_shader(program, vertex);
        gl.detach_shader(program, fragment);
        gl.delete_shader(vertex);
        gl.delete_shader(fragment);
        if !gl.get_program_link_status(program) {
            let log = gl.get_program_info_log(program);
            gl.delete_program(program);
            return Err(RenderError::Draw(format!("program link failed: {log}")));
        }

        let (Some(in_pos), Some(in_tc)) = (
            gl.get_attrib_location(program, "in_pos"),
            gl.get_attrib_location(program, "in_tc"),
        ) else {
            gl.delete_program(program);
            return Err(RenderError::Draw("missing vertex attributes".to_string()));
        };

        gl.use_program(Some(program));
        match kind {
            ShaderKind::Yuv => {
                for (unit, name) in PLANE_SAMPLERS.iter().enumerate() {
                    let location = gl.get_uniform_location(program, name);
                    gl.uniform_1_i32(location.as_ref(), unit as i32);
                }
            }
            ShaderKind::Oes => {
                let location = gl.get_uniform_location(program, "oes_tex");
                gl.uniform_1_i32(location.as_ref(), 0);
            }
        }
        gl.use_program(None);

        Ok(GlShader {
            program,
            tex_matrix: gl.get_uniform_location(program, "texMatrix"),
            in_pos,
            in_tc,
        })
    }
}

/// ### English
/// Returns `width * height` tightly packed bytes of a plane, copying rows into `scratch` only
/// when `stride` is wider than `width`. Returns `None` when `data` is too short.
///
/// ### 中文
/// 返回平面中 `width * height` 个紧密排列的字节；仅当 `stride` 大于 `width` 时才逐行拷贝到
/// `scratch`。数据长度不足时返回 `None`。
fn pack_plane<'a>(
    data: &'a [u8],
    stride: u32,
    width: u32,
    height: u32,
    scratch: &'a mut Vec<u8>,
) -> Option<Cow<'a, [u8]>> {
    let (stride, width, height) = (stride as usize, width as usize, height as usize);
    if height == 0 || width == 0 {
        return Some(Cow::Borrowed(&[]));
    }
    if stride < width || data.len() < stride * (height - 1) + width {
        return None;
    }
    if stride == width {
        return Some(Cow::Borrowed(&data[..width * height]));
    }

    scratch.clear();
    scratch.reserve(width * height);
    for row in data.chunks(stride).take(height) {
        scratch.extend_from_slice(&row[..width]);
    }
    Some(Cow::Borrowed(scratch.as_slice()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tight_planes_are_borrowed_in_place() {
        let data = [1u8, 2, 3, 4, 5, 6];
        let mut scratch = Vec::new();
        let packed = pack_plane(&data, 3, 3, 2, &mut scratch).expect("plane fits");
        assert_eq!(&*packed, &data);
        assert!(scratch.is_empty());
    }

    #[test]
    fn padded_rows_are_packed() {
        let data = [1u8, 2, 0, 0, 3, 4, 0, 0, 5, 6];
        let mut scratch = Vec::new();
        let packed = pack_plane(&data, 4, 2, 3, &mut scratch).expect("plane fits");
        assert_eq!(&*packed, &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn short_planes_are_rejected() {
        let data = [0u8; 5];
        let mut scratch = Vec::new();
        assert!(pack_plane(&data, 4, 2, 3, &mut scratch).is_none());
        assert!(pack_plane(&data, 1, 2, 1, &mut scratch).is_none());
    }
}
