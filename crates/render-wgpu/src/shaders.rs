/// Depth-only pass into the shadow map.
pub const DEPTH_SHADER: &str = r#"
struct DepthUniforms {
    light_space: mat4x4<f32>,
    model: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> u: DepthUniforms;

@vertex
fn vs_depth(@location(0) position: vec3<f32>, @location(1) normal: vec3<f32>) -> @builtin(position) vec4<f32> {
    return u.light_space * u.model * vec4<f32>(position, 1.0);
}
"#;

/// Directional light with shadow lookup, plus the two lamps at night.
pub const LIT_SHADER: &str = r#"
struct LitUniforms {
    model: mat4x4<f32>,
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
    light_space: mat4x4<f32>,
    normal_matrix: mat3x3<f32>,
    light_dir: vec4<f32>,
    light_color: vec4<f32>,
    spot_light_dir: vec4<f32>,
    point_light_pos_eye: vec4<f32>,
    spot_light_pos_eye: vec4<f32>,
    night: vec4<f32>,
    albedo: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> u: LitUniforms;

@group(1) @binding(0)
var shadow_map: texture_depth_2d;
@group(1) @binding(1)
var shadow_sampler: sampler_comparison;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) position_eye: vec3<f32>,
    @location(1) normal_eye: vec3<f32>,
    @location(2) light_space_position: vec4<f32>,
};

@vertex
fn vs_lit(vertex: VertexInput) -> VertexOutput {
    let world = u.model * vec4<f32>(vertex.position, 1.0);
    let eye = u.view * world;

    var out: VertexOutput;
    out.clip_position = u.projection * eye;
    out.position_eye = eye.xyz;
    out.normal_eye = normalize(u.normal_matrix * vertex.normal);
    out.light_space_position = u.light_space * world;
    return out;
}

const AMBIENT: f32 = 0.2;
const SPECULAR_STRENGTH: f32 = 0.5;
const SHININESS: f32 = 32.0;
const SHADOW_BIAS: f32 = 0.005;
const LAMP_COLOR: vec3<f32> = vec3<f32>(1.0, 0.85, 0.6);
const SPOT_INNER: f32 = 0.976;
const SPOT_OUTER: f32 = 0.954;

// 1.0 when the fragment is hidden from the directional light.
fn shadow_factor(light_space_position: vec4<f32>) -> f32 {
    let ndc = light_space_position.xyz / light_space_position.w;
    let uv = vec2<f32>(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5);
    let lit = textureSampleCompareLevel(shadow_map, shadow_sampler, uv, ndc.z - SHADOW_BIAS);
    let outside = any(uv < vec2<f32>(0.0)) || any(uv > vec2<f32>(1.0)) || ndc.z > 1.0;
    return select(1.0 - lit, 0.0, outside);
}

fn blinn_phong(normal: vec3<f32>, to_light: vec3<f32>, to_eye: vec3<f32>) -> vec2<f32> {
    let diffuse = max(dot(normal, to_light), 0.0);
    let half_dir = normalize(to_light + to_eye);
    let specular = pow(max(dot(normal, half_dir), 0.0), SHININESS) * SPECULAR_STRENGTH;
    return vec2<f32>(diffuse, specular);
}

fn attenuation(distance: f32) -> f32 {
    return 1.0 / (1.0 + 0.22 * distance + 0.2 * distance * distance);
}

@fragment
fn fs_lit(in: VertexOutput) -> @location(0) vec4<f32> {
    let normal = normalize(in.normal_eye);
    let to_eye = normalize(-in.position_eye);
    let night = u.night.x > 0.5;

    let sun_strength = select(1.0, 0.15, night);
    let sun = blinn_phong(normal, normalize(u.light_dir.xyz), to_eye);
    let shadow = shadow_factor(in.light_space_position);
    var color = u.light_color.rgb * (AMBIENT + (1.0 - shadow) * (sun.x + sun.y)) * sun_strength;

    if night {
        let to_point = u.point_light_pos_eye.xyz - in.position_eye;
        let point = blinn_phong(normal, normalize(to_point), to_eye);
        color += LAMP_COLOR * (point.x + point.y) * attenuation(length(to_point));

        let to_spot = u.spot_light_pos_eye.xyz - in.position_eye;
        let theta = dot(normalize(-to_spot), normalize(u.spot_light_dir.xyz));
        let cone = clamp((theta - SPOT_OUTER) / (SPOT_INNER - SPOT_OUTER), 0.0, 1.0);
        let spot = blinn_phong(normal, normalize(to_spot), to_eye);
        color += LAMP_COLOR * (spot.x + spot.y) * cone * attenuation(length(to_spot));
    }

    return vec4<f32>(min(color * u.albedo.rgb, vec3<f32>(1.0)), 1.0);
}
"#;

/// Full-screen greyscale view of the shadow map.
pub const DEPTH_VIEW_SHADER: &str = r#"
@group(0) @binding(0)
var depth_map: texture_depth_2d;

struct QuadOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_quad(@builtin(vertex_index) index: u32) -> QuadOutput {
    let corner = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    var out: QuadOutput;
    out.clip_position = vec4<f32>(corner * 2.0 - 1.0, 0.0, 1.0);
    out.uv = vec2<f32>(corner.x, 1.0 - corner.y);
    return out;
}

@fragment
fn fs_quad(in: QuadOutput) -> @location(0) vec4<f32> {
    let size = vec2<f32>(textureDimensions(depth_map));
    let texel = vec2<i32>(clamp(in.uv * size, vec2<f32>(0.0), size - 1.0));
    let depth = textureLoad(depth_map, texel, 0);
    return vec4<f32>(vec3<f32>(depth), 1.0);
}
"#;

/// Gradient sky on a unit cube pinned to the far plane.
pub const SKYBOX_SHADER: &str = r#"
struct SkyboxUniforms {
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> u: SkyboxUniforms;

struct SkyOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) direction: vec3<f32>,
};

@vertex
fn vs_sky(@location(0) position: vec3<f32>, @location(1) normal: vec3<f32>) -> SkyOutput {
    let clip = u.projection * u.view * vec4<f32>(position, 1.0);
    var out: SkyOutput;
    out.clip_position = clip.xyww;
    out.direction = position;
    return out;
}

@fragment
fn fs_sky(in: SkyOutput) -> @location(0) vec4<f32> {
    let t = normalize(in.direction).y * 0.5 + 0.5;
    let horizon = vec3<f32>(0.85, 0.88, 0.92);
    let zenith = vec3<f32>(0.35, 0.55, 0.85);
    return vec4<f32>(mix(horizon, zenith, t), 1.0);
}
"#;
