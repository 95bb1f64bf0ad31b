//! Shader Function Emitter (§4.D): orchestrates the Type Mapper, Struct
//! Synthesizer, and Expression/Statement Translator into one complete
//! shader entry-point definition.
//!
//! Grounded on `compile_math_closure` in the teacher's
//! `renderer/node_compiler/math_closure.rs`, which is the one place the
//! teacher already wires "map types + translate a body + assemble
//! bindings" into a single shader string.

use anyhow::{Result, anyhow};
use swc_ecma_ast::{BlockStmt, Param, Pat};

use crate::diagnostics::DiagnosticSink;
use crate::struct_synth::synthesize_structs;
use crate::translator::Translator;
use crate::type_mapper::map_type;
use crate::types::{GlobalConstDescriptor, ParamDescriptor, StageKind};

/// Everything the emitter needs about one annotated function, collected
/// by the Driver before emission.
pub struct AnnotatedFn<'a> {
    pub name: String,
    pub stage: StageKind,
    pub workgroup_size: Vec<u32>,
    pub params: &'a [Param],
    pub body: &'a BlockStmt,
}

/// Derive parameter descriptors from a function's parameter list,
/// assigning dense binding indices in declaration order (§3 invariant 3).
pub fn collect_params(
    params: &[Param],
    sink: &mut dyn DiagnosticSink,
) -> Vec<ParamDescriptor> {
    params
        .iter()
        .enumerate()
        .filter_map(|(index, param)| {
            let Pat::Ident(ident) = &param.pat else {
                return None;
            };
            let type_ann = ident.type_ann.as_ref()?;
            let (mapped, diag) = map_type(&type_ann.type_ann);
            if let Some(diag) = diag {
                sink.report(diag);
            }
            Some(ParamDescriptor {
                name: ident.id.sym.to_string(),
                surface_type: format!("{:?}", type_ann.type_ann),
                mapped_type: mapped,
                binding_index: index as u32,
            })
        })
        .collect()
}

fn stage_prefix_and_signature(stage: StageKind, workgroup_size: &[u32]) -> (String, String, String) {
    match stage {
        StageKind::Kernel => {
            let dims = workgroup_size
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            (
                format!("@compute @workgroup_size({dims})"),
                "global_invocation_id : vec3<u32>".to_string(),
                String::new(),
            )
        }
        StageKind::Vertex => (
            "@vertex".to_string(),
            "@builtin(vertex_index) vertex_index : u32".to_string(),
            " -> @builtin(position) vec4<f32>".to_string(),
        ),
        StageKind::Fragment => (
            "@fragment".to_string(),
            "@builtin(position) pos : vec4<f32>".to_string(),
            " -> @location(0) vec4<f32>".to_string(),
        ),
    }
}

/// Emit the complete shader text for one annotated function: prelude,
/// structs, bindings, attributes, signature, and translated body.
pub fn emit_shader(
    func: &AnnotatedFn,
    unit: &crate::parse::SourceUnit,
    device_wgsl: &str,
    device_struct_roots: &[String],
    global_consts: &[GlobalConstDescriptor],
    sink: &mut dyn DiagnosticSink,
) -> Result<String> {
    let params = collect_params(func.params, sink);

    let mut root_names: Vec<String> = params
        .iter()
        .filter_map(|p| p.mapped_type.referenced_struct().map(|s| s.to_string()))
        .collect();
    root_names.extend(device_struct_roots.iter().cloned());
    let structs = synthesize_structs(unit, &root_names, sink);

    let mut out = String::new();

    for global in global_consts {
        out.push_str(&global.wgsl());
    }
    if !global_consts.is_empty() {
        out.push('\n');
    }

    // Structs must precede any text that references them (§4.D, §6), and
    // a device function's signature may itself reference one (e.g.
    // `makeRay(...) -> Ray`), so structs are emitted before device_wgsl.
    for s in &structs {
        out.push_str(&s.wgsl());
        out.push('\n');
    }

    out.push_str(device_wgsl);

    for param in &params {
        out.push_str(&format!(
            "@group(0) @binding({}) var{} {} : {};\n",
            param.binding_index,
            match param.binding_kind() {
                crate::types::BindingKind::Uniform => "<uniform>",
                crate::types::BindingKind::StorageReadWrite => "<storage, read_write>",
            },
            param.name,
            param.mapped_type.wgsl(),
        ));
    }
    out.push('\n');

    let (attrs, entry_param, return_clause) =
        stage_prefix_and_signature(func.stage, &func.workgroup_size);
    out.push_str(&attrs);
    out.push('\n');
    out.push_str(&format!("fn {}({}){} ", func.name, entry_param, return_clause));

    let mut translator = Translator::new(sink, &func.name);
    out.push_str(&translator.block(func.body));

    Ok(out)
}

/// Emit a device function's text: plain parameter list, mapped return
/// type (omitted for `void`), array parameters wrapped as a storage
/// pointer with read-write access (§4.D).
pub fn emit_device_fn(
    name: &str,
    params: &[Param],
    return_type: Option<&swc_ecma_ast::TsType>,
    body: &BlockStmt,
    sink: &mut dyn DiagnosticSink,
) -> Result<String> {
    let mut param_texts = Vec::new();
    for param in params {
        let Pat::Ident(ident) = &param.pat else {
            continue;
        };
        let Some(type_ann) = &ident.type_ann else {
            return Err(anyhow!(
                "device function `{name}` parameter `{}` has no explicit type",
                ident.id.sym
            ));
        };
        let (mapped, diag) = map_type(&type_ann.type_ann);
        if let Some(diag) = diag {
            sink.report(diag);
        }
        let rendered = if mapped.is_array() {
            format!(
                "{} : ptr<storage, {}, read_write>",
                ident.id.sym,
                mapped.wgsl()
            )
        } else {
            format!("{} : {}", ident.id.sym, mapped.wgsl())
        };
        param_texts.push(rendered);
    }

    let return_clause = match return_type {
        Some(ty) => {
            let (mapped, diag) = map_type(ty);
            if let Some(diag) = diag {
                sink.report(diag);
            }
            format!(" -> {}", mapped.wgsl())
        }
        None => String::new(),
    };

    let mut out = format!("fn {name}({}){} ", param_texts.join(", "), return_clause);
    let mut translator = Translator::new(sink, name);
    out.push_str(&translator.block(body));
    out.push('\n');
    Ok(out)
}
