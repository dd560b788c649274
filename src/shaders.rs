//! GLSL sources for every program in the crate.
//!
//! Everything targets GLSL 3.30 core. The geometry-shader shadow extruder
//! needs desktop GL 3.2+; the CPU extrusion path only uses the two-stage
//! programs.

/// Passthrough vertex shader for full-viewport quads given in clip space.
pub const LIGHT_VERTEX_SRC: &str = r"#version 330 core

layout(location = 0) in vec2 position;

void main() {
    gl_Position = vec4(position, 0.0, 1.0);
}
";

/// Radial attenuation around a point light.
///
/// # Uniforms
///
/// | Name             | Type    | Description                                 |
/// |------------------|---------|---------------------------------------------|
/// | `light_position` | `vec2`  | Light position in window pixels, origin at the lower left |
/// | `light_color`    | `vec3`  | Light color                                 |
/// | `radius`         | `float` | Brightness scale of the falloff             |
/// | `falloff`        | `float` | Distance exponent of the falloff            |
pub const LIGHT_FRAGMENT_SRC: &str = r"#version 330 core

uniform vec2 light_position;
uniform vec3 light_color;
uniform float radius;
uniform float falloff;

out vec4 out_color;

void main() {
    // gl_FragCoord has its origin in the lower-left corner, like light_position.
    float dist = length(light_position - gl_FragCoord.xy);
    float attenuation = radius / pow(dist, falloff);

    out_color = vec4(attenuation * light_color, 1.0);
}
";

/// Projects occluder vertices from pixels to clip space.
///
/// # Uniforms
///
/// | Name                    | Type   | Description                  |
/// |-------------------------|--------|------------------------------|
/// | `model_view_projection` | `mat4` | Pixel → clip space transform |
pub const SHADOW_VERTEX_SRC: &str = r"#version 330 core

layout(location = 0) in vec2 position;

uniform mat4 model_view_projection;

void main() {
    gl_Position = model_view_projection * vec4(position, 0.0, 1.0);
}
";

/// Extrudes every edge of every occluder triangle away from the light.
///
/// Each edge `(i, i+1)` becomes a four-vertex strip: start, start pushed
/// away from the light, end, end pushed away from the light.
///
/// # Uniforms
///
/// | Name             | Type    | Description                              |
/// |------------------|---------|------------------------------------------|
/// | `light_position` | `vec2`  | Light position in clip space             |
/// | `extrusion`      | `float` | Distance each vertex is pushed, in clip units |
pub const SHADOW_GEOMETRY_SRC: &str = r"#version 330 core

layout(triangles) in;
layout(triangle_strip, max_vertices = 24) out;

uniform vec2 light_position;
uniform float extrusion;

vec2 extrude(vec2 point) {
    vec2 ray = point - light_position;
    float len = length(ray);
    return len > 0.0 ? point + extrusion * ray / len : point;
}

void main() {
    for (int i = 0; i < 3; i++) {
        int k = (i + 1) % 3;

        gl_Position = gl_in[i].gl_Position;
        EmitVertex();

        gl_Position = vec4(extrude(gl_in[i].gl_Position.xy), 0.0, 1.0);
        EmitVertex();

        gl_Position = gl_in[k].gl_Position;
        EmitVertex();

        gl_Position = vec4(extrude(gl_in[k].gl_Position.xy), 0.0, 1.0);
        EmitVertex();

        EndPrimitive();
    }
}
";

/// Passthrough for shadow volumes already extruded on the CPU (clip space).
pub const SHADOW_CPU_VERTEX_SRC: &str = LIGHT_VERTEX_SRC;

/// Shadow volumes are a pure alpha mask: opaque white.
pub const SHADOW_FRAGMENT_SRC: &str = r"#version 330 core

out vec4 out_color;

void main() {
    out_color = vec4(1.0);
}
";

/// Vertex shader for solid-colored pixel-space geometry.
///
/// # Uniforms
///
/// | Name                    | Type    | Description                  |
/// |-------------------------|---------|------------------------------|
/// | `model_view_projection` | `mat4`  | Pixel → clip space transform |
/// | `scale`                 | `float` | Uniform scale about the origin |
pub const SOLID_VERTEX_SRC: &str = r"#version 330 core

layout(location = 0) in vec2 position;

uniform mat4 model_view_projection;
uniform float scale;

void main() {
    gl_Position = model_view_projection * vec4(position * scale, 0.0, 1.0);
}
";

/// Fragment shader for solid-colored geometry.
pub const SOLID_FRAGMENT_SRC: &str = r"#version 330 core

uniform vec4 color;

out vec4 out_color;

void main() {
    out_color = color;
}
";

/// Vertex shader for textured quads.
///
/// UVs come from a second `vec2` attribute.
///
/// # Uniforms
///
/// | Name                    | Type    | Description                    |
/// |-------------------------|---------|--------------------------------|
/// | `model_view_projection` | `mat4`  | Pixel → clip space transform   |
/// | `scale`                 | `vec2`  | Per-axis scale (negative flips) |
pub const SPRITE_VERTEX_SRC: &str = r"#version 330 core

layout(location = 0) in vec2 position;
layout(location = 1) in vec2 uv;

uniform mat4 model_view_projection;
uniform vec2 scale;

out vec2 v_uv;

void main() {
    v_uv = uv;
    gl_Position = model_view_projection * vec4(position * scale, 0.0, 1.0);
}
";

/// Fragment shader for textured quads.
///
/// # Uniforms
///
/// | Name              | Type        | Description                          |
/// |-------------------|-------------|--------------------------------------|
/// | `texture_sampler` | `sampler2D` | Texture unit index (always 0)        |
/// | `offset`          | `vec2`      | UV offset of the current atlas frame |
pub const SPRITE_FRAGMENT_SRC: &str = r"#version 330 core

in vec2 v_uv;

uniform sampler2D texture_sampler;
uniform vec2 offset;

out vec4 out_color;

void main() {
    out_color = texture(texture_sampler, v_uv + offset);
}
";
