//! GLSL preprocessing: `#include` resolution and define injection.
//!
//! The preprocessor expands `#include "path"` directives from registered
//! sources and inserts `#define` lines right after `#version`: the stage
//! macro (`VERTEX`, `FRAGMENT`, ...), `MAX_LIGHTS` and any global defines.
//! The resulting text is what the inspector shows as precompiled source.

use std::collections::{HashMap, HashSet};

use crate::scene::MAX_SCENE_LIGHTS;
use crate::shader::library::ShaderLibrary;
use crate::shader::ShaderStage;

/// Shader preprocessor holding includable sources and global defines.
#[derive(Debug, Clone)]
pub struct ShaderPreprocessor {
    /// Registered include sources: path -> source text.
    includes: HashMap<String, String>,
    defines: Vec<(String, String)>,
}

impl Default for ShaderPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ShaderPreprocessor {
    /// Create a preprocessor with no includes and only the built-in defines.
    pub fn new() -> Self {
        Self {
            includes: HashMap::new(),
            defines: vec![("MAX_LIGHTS".to_string(), MAX_SCENE_LIGHTS.to_string())],
        }
    }

    /// Create a preprocessor with the engine include library pre-loaded.
    pub fn with_engine_library() -> Self {
        let mut preprocessor = Self::new();
        preprocessor.add_library(&ShaderLibrary::engine());
        preprocessor
    }

    pub fn add_library(&mut self, library: &ShaderLibrary) {
        for (path, source) in library.modules() {
            self.register_include(path, source);
        }
    }

    /// Register a single include source under the path used in `#include "path"`.
    pub fn register_include(&mut self, path: &str, source: &str) {
        self.includes.insert(path.to_string(), source.to_string());
    }

    pub fn has_include(&self, path: &str) -> bool {
        self.includes.contains_key(path)
    }

    /// Add a define injected into every stage. Redefining a name replaces it.
    pub fn add_define(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.defines.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = value,
            None => self.defines.push((name, value)),
        }
    }

    pub fn defines(&self) -> &[(String, String)] {
        &self.defines
    }

    /// Expand includes and inject defines for `stage`.
    pub fn preprocess(&self, source: &str, stage: ShaderStage) -> Result<String, String> {
        let mut included = HashSet::new();
        let resolved = self.resolve_includes(source, &mut included)?;
        Ok(self.inject_defines(&resolved, stage))
    }

    /// Resolve `#include "path"` directives recursively.
    ///
    /// Each path is expanded at most once per stage.
    fn resolve_includes(
        &self,
        source: &str,
        included: &mut HashSet<String>,
    ) -> Result<String, String> {
        let mut result = String::with_capacity(source.len());

        for line in source.lines() {
            let trimmed = line.trim();
            if let Some(path) = parse_include_directive(trimmed) {
                if !included.insert(path.to_string()) {
                    continue;
                }
                let include_source = self
                    .includes
                    .get(path)
                    .ok_or_else(|| format!("include not found: \"{path}\""))?;
                let resolved = self.resolve_includes(include_source, included)?;
                result.push_str(&resolved);
            } else {
                result.push_str(line);
                result.push('\n');
            }
        }

        Ok(result)
    }

    fn inject_defines(&self, source: &str, stage: ShaderStage) -> String {
        let mut block = format!("#define {}\n", stage.define());
        for (name, value) in &self.defines {
            if value.is_empty() {
                block.push_str(&format!("#define {name}\n"));
            } else {
                block.push_str(&format!("#define {name} {value}\n"));
            }
        }

        let mut result = String::with_capacity(source.len() + block.len());
        let mut injected = false;
        for line in source.lines() {
            result.push_str(line);
            result.push('\n');
            if !injected && line.trim_start().starts_with("#version") {
                result.push_str(&block);
                injected = true;
            }
        }
        if !injected {
            result.insert_str(0, &block);
        }
        result
    }
}

/// Parse a `#include "path"` directive, returning the path if found.
fn parse_include_directive(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("#include")?;
    let rest = rest.trim();
    // Support both #include "path" and #include <path>
    if let Some(inner) = rest.strip_prefix('"') {
        inner.strip_suffix('"')
    } else if let Some(inner) = rest.strip_prefix('<') {
        inner.strip_suffix('>')
    } else {
        None
    }
}
