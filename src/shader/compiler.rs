//! Stage compilation and program reflection.
//!
//! Vertex and fragment stages are parsed and validated with naga's GLSL front
//! end and translated to WGSL. Geometry and tessellation stages are only
//! preprocessed: naga has no front end for them, so they are handed to the
//! backend as GLSL and the backend decides whether it can link them.

use std::collections::BTreeMap;

use crate::backend::{CompiledStage, ProgramDescriptor};
use crate::error::CompileError;
use crate::shader::preprocess::ShaderPreprocessor;
use crate::shader::reflection::{reflect_module, ShaderReflection};
use crate::shader::ShaderStage;

/// Result of compiling every stage of a program.
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    pub stages: Vec<CompiledStage>,
    pub reflection: ShaderReflection,
}

impl CompiledProgram {
    pub(crate) fn descriptor(&self, label: &str) -> ProgramDescriptor {
        ProgramDescriptor {
            label: label.to_string(),
            stages: self.stages.clone(),
            blocks: self.reflection.block_layouts(),
            textures: self.reflection.texture_layouts(),
            attributes: self.reflection.attribute_layouts(),
        }
    }
}

/// Compile all stages. Fails on the first stage that does not compile.
pub fn compile_program(
    preprocessor: &ShaderPreprocessor,
    sources: &BTreeMap<ShaderStage, String>,
) -> Result<CompiledProgram, CompileError> {
    for required in [ShaderStage::Vertex, ShaderStage::Fragment] {
        if !sources.contains_key(&required) {
            return Err(CompileError::MissingStage(required));
        }
    }

    let mut stages = Vec::with_capacity(sources.len());
    let mut reflection = ShaderReflection::default();

    for (&stage, source) in sources {
        let glsl = preprocessor
            .preprocess(source, stage)
            .map_err(|message| CompileError::Preprocess { stage, message })?;

        let wgsl = match stage.naga_stage() {
            Some(naga_stage) => {
                let (wgsl, stage_reflection) = compile_stage(&glsl, stage, naga_stage)?;
                reflection
                    .merge(stage_reflection)
                    .map_err(|message| CompileError::Link { message })?;
                Some(wgsl)
            }
            None => None,
        };

        stages.push(CompiledStage { stage, glsl, wgsl });
    }

    Ok(CompiledProgram { stages, reflection })
}

/// Parse, validate, reflect and translate a single preprocessed stage.
fn compile_stage(
    glsl: &str,
    stage: ShaderStage,
    naga_stage: naga::ShaderStage,
) -> Result<(String, ShaderReflection), CompileError> {
    let options = naga::front::glsl::Options::from(naga_stage);
    let mut frontend = naga::front::glsl::Frontend::default();
    let module = frontend
        .parse(&options, glsl)
        .map_err(|errors| CompileError::Stage {
            stage,
            message: format!("GLSL parse error:\n{errors}"),
        })?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    let module_info = validator
        .validate(&module)
        .map_err(|e| CompileError::Stage {
            stage,
            message: format!("Validation error: {e}"),
        })?;

    let wgsl = naga::back::wgsl::write_string(
        &module,
        &module_info,
        naga::back::wgsl::WriterFlags::empty(),
    )
    .map_err(|e| CompileError::Stage {
        stage,
        message: format!("WGSL generation error: {e}"),
    })?;

    Ok((wgsl, reflect_module(&module, naga_stage)))
}
