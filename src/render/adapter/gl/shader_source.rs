// PixelDeck
// copyright zipxing@hotmail.com 2022～2025

// one program for every draw: the per-vertex mode picks the coloring
//   0 solid   1 textured*tint   2 static noise   3 outlined   4 dither
pub const VERTEX_SRC_DECK: &str = r#"
            precision highp float;
            layout(location=0) in vec2 pos;
            layout(location=1) in vec2 uv;
            layout(location=2) in vec4 color;
            layout(location=3) in vec4 color2;
            layout(location=4) in vec2 params;
            uniform vec2 screen;
            out vec2 v_uv;
            out vec4 v_color;
            out vec4 v_color2;
            flat out vec2 v_params;
            void main() {
                vec2 ndc = pos / screen * 2.0 - vec2(1.0, 1.0);
                gl_Position = vec4(ndc.x, -ndc.y, 0.0, 1.0);
                v_uv = uv;
                v_color = color;
                v_color2 = color2;
                v_params = params;
            }
        "#;

pub const FRAGMENT_SRC_DECK: &str = r#"
            precision highp float;
            uniform sampler2D source;
            in vec2 v_uv;
            in vec4 v_color;
            in vec4 v_color2;
            flat in vec2 v_params;
            layout(location=0) out vec4 color;
            float noise(vec2 p) {
                return fract(sin(dot(p, vec2(12.9898, 78.233))) * 43758.5453);
            }
            void main() {
                int mode = int(v_params.x + 0.5);
                if (mode == 0) {
                    color = v_color;
                } else if (mode == 1) {
                    color = texture(source, v_uv) * v_color;
                } else if (mode == 2) {
                    vec4 t = texture(source, v_uv);
                    if (t.a > 0.0 && noise(gl_FragCoord.xy) * 255.0 < v_params.y) {
                        t = vec4(v_color2.rgb, t.a);
                    }
                    color = t;
                } else if (mode == 3) {
                    vec4 t = texture(source, v_uv);
                    vec2 px = 1.0 / vec2(textureSize(source, 0));
                    float edge = min(min(texture(source, v_uv + vec2(px.x, 0.0)).a,
                                         texture(source, v_uv - vec2(px.x, 0.0)).a),
                                     min(texture(source, v_uv + vec2(0.0, px.y)).a,
                                         texture(source, v_uv - vec2(0.0, px.y)).a));
                    color = t.a == 0.0 ? vec4(0.0) : (edge == 0.0 ? v_color2 : v_color);
                } else {
                    ivec2 p = ivec2(gl_FragCoord.xy);
                    if ((p.x + p.y) % 2 != 0) {
                        discard;
                    }
                    color = vec4(v_color.rgb, 1.0);
                }
            }
        "#;
