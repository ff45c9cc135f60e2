// pipeline.rs — One generation pass from block program to sketch
//
// Parses a JSON block program, fills in editor defaults, resolves dropdown
// labels through the option catalog and plugged-in reporters to tagged
// expressions, emits every top-level block into a fresh
// ProgramAssembly in program order, and renders the sketch.
//
// Preconditions: a catalog covering every option set referenced by labels.
// Postconditions: `GenerateOutput` holds the assembly, the sketch, all
//                 diagnostics, and provenance hashes.
// Failure modes: malformed JSON, unknown opcodes, unknown or missing
//                parameters, or unresolvable labels abort the pass with
//                `PipelineError`.
// Side effects: none. The assembly is discarded with the output.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::assembly::ProgramAssembly;
use crate::block::{BlockError, BlockInvocation, ParameterValue};
use crate::blocks::{emit_block, reporter_expr, BlockKind};
use crate::catalog::{Catalog, CatalogError};
use crate::codegen::{codegen, CodegenOptions, GeneratedCode};
use crate::diag::{DiagLevel, Diagnostic};

// ── Program input ───────────────────────────────────────────────────────────

/// A block program as saved by the editor.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockProgram {
    pub blocks: Vec<ProgramBlock>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProgramBlock {
    pub opcode: String,
    #[serde(default)]
    pub params: BTreeMap<String, RawParam>,
}

/// A parameter as written in the program file.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawParam {
    /// Code literal: `"A4"`.
    Code(String),
    /// Bare number: `50`.
    Number(serde_json::Number),
    /// Dropdown label to resolve: `{"option": "Software I2C"}`.
    Option { option: String },
    /// Reporter block plugged into the input: `{"block": {"opcode": "getDistance"}}`.
    Block { block: Box<ProgramBlock> },
    /// Code with a precedence tag: `{"code": "x + 1", "order": "additive"}`.
    Value(ParameterValue),
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid block program: {0}")]
    Json(#[from] serde_json::Error),

    #[error("block #{index}: {source}")]
    Block { index: usize, source: BlockError },

    #[error("block #{index}: {source}")]
    Catalog { index: usize, source: CatalogError },

    #[error("block #{index}: parameter '{param}' is not a dropdown and cannot take an option label")]
    NotADropdown { index: usize, param: String },

    #[error("block #{index}: '{opcode}' has no parameter '{param}'")]
    UnknownParameter {
        index: usize,
        opcode: String,
        param: String,
    },
}

impl BlockProgram {
    pub fn from_json_str(source: &str) -> Result<Self, PipelineError> {
        Ok(serde_json::from_str(source)?)
    }
}

/// Turn an editor block into a core invocation: apply input defaults,
/// resolve option labels to code literals and plugged-in reporters to their
/// expressions. Nested blocks report errors under their top-level `index`.
pub fn resolve_block(
    index: usize,
    block: &ProgramBlock,
    catalog: &Catalog,
) -> Result<BlockInvocation, PipelineError> {
    let kind = BlockKind::from_opcode(&block.opcode).ok_or_else(|| PipelineError::Block {
        index,
        source: BlockError::UnknownOpcode(block.opcode.clone()),
    })?;

    if let Some(name) = block.params.keys().find(|n| kind.param_spec(n.as_str()).is_none()) {
        return Err(PipelineError::UnknownParameter {
            index,
            opcode: block.opcode.clone(),
            param: name.clone(),
        });
    }

    let mut invocation = BlockInvocation::new(kind.opcode());
    for spec in kind.params() {
        if !block.params.contains_key(spec.name) {
            invocation = invocation.with(spec.name, spec.default);
        }
    }
    for (name, raw) in &block.params {
        let value = match raw {
            RawParam::Code(code) => ParameterValue::code(code.clone()),
            RawParam::Number(n) => ParameterValue::code(n.to_string()),
            RawParam::Value(v) => v.clone(),
            RawParam::Option { option } => {
                let set = kind
                    .param_spec(name)
                    .and_then(|spec| spec.options)
                    .ok_or_else(|| PipelineError::NotADropdown {
                        index,
                        param: name.clone(),
                    })?;
                let code = catalog
                    .resolve(set, option)
                    .map_err(|source| PipelineError::Catalog { index, source })?;
                ParameterValue::code(code)
            }
            RawParam::Block { block: nested } => {
                let nested = resolve_block(index, nested, catalog)?;
                reporter_expr(&nested)
                    .map_err(|source| PipelineError::Block { index, source })?
                    .into()
            }
        };
        invocation.params.insert(name.clone(), value);
    }
    Ok(invocation)
}

// ── Provenance ──────────────────────────────────────────────────────────────

/// Hashes identifying the inputs of a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub source_hash: [u8; 32],
    pub catalog_fingerprint: [u8; 32],
    pub generator_version: &'static str,
}

#[derive(Serialize)]
struct BuildInfo<'a> {
    source_hash: String,
    catalog_fingerprint: String,
    generator_version: &'a str,
}

impl Provenance {
    pub fn source_hash_hex(&self) -> String {
        bytes_to_hex(&self.source_hash)
    }

    pub fn catalog_fingerprint_hex(&self) -> String {
        bytes_to_hex(&self.catalog_fingerprint)
    }

    /// Pretty JSON for `--emit build-info`.
    pub fn to_json(&self) -> String {
        let info = BuildInfo {
            source_hash: self.source_hash_hex(),
            catalog_fingerprint: self.catalog_fingerprint_hex(),
            generator_version: self.generator_version,
        };
        let mut json = serde_json::to_string_pretty(&info).unwrap_or_default();
        json.push('\n');
        json
    }
}

fn bytes_to_hex(bytes: &[u8; 32]) -> String {
    let mut s = String::with_capacity(64);
    for b in bytes {
        use std::fmt::Write;
        let _ = write!(s, "{:02x}", b);
    }
    s
}

fn sha256(data: &str) -> [u8; 32] {
    Sha256::digest(data.as_bytes()).into()
}

/// Fingerprint the program text and the catalog's canonical JSON.
pub fn compute_provenance(source: &str, catalog: &Catalog) -> Provenance {
    Provenance {
        source_hash: sha256(source),
        catalog_fingerprint: sha256(&catalog.canonical_json()),
        generator_version: env!("CARGO_PKG_VERSION"),
    }
}

// ── Pass ────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct GenerateOutput {
    pub assembly: ProgramAssembly,
    pub generated: GeneratedCode,
    pub diagnostics: Vec<Diagnostic>,
    pub provenance: Provenance,
}

impl GenerateOutput {
    pub fn has_warnings(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.level == DiagLevel::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.level == DiagLevel::Error)
    }

    /// Promote every warning to an error (`--strict`).
    pub fn deny_warnings(&mut self) {
        for d in &mut self.diagnostics {
            d.level = DiagLevel::Error;
        }
    }
}

/// Emit already-resolved invocations into `asm`, in order. Values of
/// top-level reporters are already in the inline stream and are dropped here.
pub fn emit_blocks(
    asm: &mut ProgramAssembly,
    blocks: &[BlockInvocation],
) -> Result<(), PipelineError> {
    for (index, block) in blocks.iter().enumerate() {
        emit_block(asm, block).map_err(|source| PipelineError::Block { index, source })?;
    }
    Ok(())
}

/// Run a full pass over a JSON block program.
#[tracing::instrument(level = "debug", skip_all)]
pub fn generate(
    source: &str,
    catalog: &Catalog,
    options: &CodegenOptions,
) -> Result<GenerateOutput, PipelineError> {
    let program = BlockProgram::from_json_str(source)?;
    let invocations = program
        .blocks
        .iter()
        .enumerate()
        .map(|(i, b)| resolve_block(i, b, catalog))
        .collect::<Result<Vec<_>, _>>()?;
    tracing::debug!(blocks = invocations.len(), "resolved block program");

    let mut assembly = ProgramAssembly::new();
    emit_blocks(&mut assembly, &invocations)?;
    tracing::debug!(
        includes = assembly.includes().len(),
        objects = assembly.objects().len(),
        setup = assembly.setup().len(),
        code = assembly.code().len(),
        "assembly complete"
    );

    let result = codegen(&assembly, options);
    let mut diagnostics = catalog.validate();
    diagnostics.extend(result.diagnostics);

    Ok(GenerateOutput {
        assembly,
        generated: result.generated,
        diagnostics,
        provenance: compute_provenance(source, catalog),
    })
}
