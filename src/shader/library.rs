//! Built-in shader library and default shader sources.
//!
//! # Include modules
//!
//! | Include path | Description |
//! |--------------|-------------|
//! | `engine/globals.glsl` | Engine global uniform block (`g_*`) |
//! | `engine/lighting.glsl` | Phong lighting over the scene lights |
//!
//! Shaders use `set = 0`; binding 0 holds the engine globals, binding 1 the
//! material block and the following bindings textures and their samplers.

/// Engine global uniform block shared by all default shaders.
pub const GLOBALS_MODULE: &str = r#"layout(set = 0, binding = 0) uniform EngineGlobals {
    mat4 g_model;
    mat4 g_view;
    mat4 g_projection;
    vec4 g_cameraPos;
    vec4 g_ambientLight;
    vec4 g_lightPosType[MAX_LIGHTS];
    vec4 g_lightColorRange[MAX_LIGHTS];
};
"#;

/// Phong lighting. Light type is stored in `g_lightPosType[i].w`:
/// 0 point, 1 directional, 2 unused.
pub const LIGHTING_MODULE: &str = r#"vec3 computeLighting(vec3 wsPos, vec3 normal, float specularity) {
    vec3 lighting = g_ambientLight.rgb;
    vec3 viewDir = normalize(g_cameraPos.xyz - wsPos);
    for (int i = 0; i < MAX_LIGHTS; i++) {
        float lightType = g_lightPosType[i].w;
        vec3 lightDir = vec3(0.0);
        float attenuation = 1.0;
        if (lightType == 0.0) {
            vec3 toLight = g_lightPosType[i].xyz - wsPos;
            float dist = length(toLight);
            lightDir = toLight / max(dist, 0.0001);
            float range = g_lightColorRange[i].w;
            attenuation = clamp(1.0 - dist / max(range, 0.0001), 0.0, 1.0);
        } else if (lightType == 1.0) {
            lightDir = normalize(g_lightPosType[i].xyz);
        } else {
            continue;
        }
        float diffuse = max(dot(normal, lightDir), 0.0);
        float specular = 0.0;
        if (specularity > 0.0 && diffuse > 0.0) {
            vec3 halfway = normalize(lightDir + viewDir);
            specular = pow(max(dot(normal, halfway), 0.0), specularity);
        }
        lighting += (diffuse + specular) * attenuation * g_lightColorRange[i].rgb;
    }
    return lighting;
}
"#;

pub(crate) const STANDARD_VERTEX: &str = r#"#version 450
#include "engine/globals.glsl"
layout(location = 0) in vec3 position;
layout(location = 1) in vec3 normal;
layout(location = 2) in vec2 uv;
layout(location = 0) out vec3 vNormal;
layout(location = 1) out vec2 vUV;
layout(location = 2) out vec3 vWsPos;
void main() {
    vec4 wsPos = g_model * vec4(position, 1.0);
    gl_Position = g_projection * g_view * wsPos;
    vNormal = normalize((g_model * vec4(normal, 0.0)).xyz);
    vUV = uv;
    vWsPos = wsPos.xyz;
}
"#;

pub(crate) const STANDARD_FRAGMENT: &str = r#"#version 450
#include "engine/globals.glsl"
#include "engine/lighting.glsl"
layout(set = 0, binding = 1) uniform Material {
    vec4 color;
    float specularity;
};
layout(set = 0, binding = 2) uniform texture2D tex;
layout(set = 0, binding = 3) uniform sampler tex_sampler;
layout(location = 0) in vec3 vNormal;
layout(location = 1) in vec2 vUV;
layout(location = 2) in vec3 vWsPos;
layout(location = 0) out vec4 fragColor;
void main() {
    vec4 albedo = color * texture(sampler2D(tex, tex_sampler), vUV);
    vec3 light = computeLighting(vWsPos, normalize(vNormal), specularity);
    fragColor = vec4(albedo.rgb * light, albedo.a);
}
"#;

pub(crate) const UNLIT_VERTEX: &str = r#"#version 450
#include "engine/globals.glsl"
layout(location = 0) in vec3 position;
layout(location = 1) in vec2 uv;
layout(location = 0) out vec2 vUV;
void main() {
    gl_Position = g_projection * g_view * g_model * vec4(position, 1.0);
    vUV = uv;
}
"#;

pub(crate) const UNLIT_FRAGMENT: &str = r#"#version 450
layout(set = 0, binding = 1) uniform Material {
    vec4 color;
};
layout(set = 0, binding = 2) uniform texture2D tex;
layout(set = 0, binding = 3) uniform sampler tex_sampler;
layout(location = 0) in vec2 vUV;
layout(location = 0) out vec4 fragColor;
void main() {
    fragColor = color * texture(sampler2D(tex, tex_sampler), vUV);
}
"#;

pub(crate) const UNLIT_SPRITE_VERTEX: &str = r#"#version 450
#include "engine/globals.glsl"
layout(location = 0) in vec3 position;
layout(location = 1) in vec2 uv;
layout(location = 2) in vec4 color;
layout(location = 0) out vec2 vUV;
layout(location = 1) out vec4 vColor;
void main() {
    gl_Position = g_projection * g_view * g_model * vec4(position, 1.0);
    vUV = uv;
    vColor = color;
}
"#;

pub(crate) const UNLIT_SPRITE_FRAGMENT: &str = r#"#version 450
layout(set = 0, binding = 2) uniform texture2D tex;
layout(set = 0, binding = 3) uniform sampler tex_sampler;
layout(location = 0) in vec2 vUV;
layout(location = 1) in vec4 vColor;
layout(location = 0) out vec4 fragColor;
void main() {
    fragColor = vColor * texture(sampler2D(tex, tex_sampler), vUV);
}
"#;

pub(crate) const DEBUG_UV_FRAGMENT: &str = r#"#version 450
layout(location = 0) in vec2 vUV;
layout(location = 0) out vec4 fragColor;
void main() {
    fragColor = vec4(vUV, 0.0, 1.0);
}
"#;

pub(crate) const DEBUG_NORMALS_FRAGMENT: &str = r#"#version 450
layout(location = 0) in vec3 vNormal;
layout(location = 1) in vec2 vUV;
layout(location = 2) in vec3 vWsPos;
layout(location = 0) out vec4 fragColor;
void main() {
    fragColor = vec4(normalize(vNormal) * 0.5 + 0.5, 1.0);
}
"#;

/// Collection of shader modules that can be included.
pub struct ShaderLibrary {
    modules: Vec<(&'static str, &'static str)>,
}

impl ShaderLibrary {
    /// The engine library used by the default shaders.
    pub fn engine() -> Self {
        Self {
            modules: vec![
                ("engine/globals.glsl", GLOBALS_MODULE),
                ("engine/lighting.glsl", LIGHTING_MODULE),
            ],
        }
    }

    /// Create an empty shader library.
    pub fn empty() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    /// Get an iterator over all modules (path, source).
    pub fn modules(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.modules.iter().copied()
    }

    /// Add a custom module to the library.
    pub fn with_module(mut self, path: &'static str, source: &'static str) -> Self {
        self.modules.push((path, source));
        self
    }
}
