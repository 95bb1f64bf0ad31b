//! Struct Synthesizer (§4.B): turns an `interface`/object-literal `type`
//! declaration visible in the source unit into a [`StructDescriptor`],
//! and computes the transitive closure of structs reachable from a set
//! of root types.
//!
//! Cycle detection follows the same shape as the teacher's
//! `dsl.rs::resolve_output_f64_inner` family: a `visiting` set guards
//! against infinite recursion through a cyclic reference, since the
//! target shader language (like the teacher's buffer layouts) has no
//! notion of a recursive struct.

use std::collections::{HashSet, VecDeque};

use swc_ecma_ast::{Decl, ModuleItem, Stmt, TsType, TsTypeElement};

use crate::diagnostics::Diagnostic;
use crate::parse::SourceUnit;
use crate::type_mapper::map_type;
use crate::types::{StructDescriptor, StructField};

/// Find an `interface Name { ... }` or `type Name = { ... }` declaration
/// and return its fields as (name, type) pairs in source order. Returns
/// `Err` with a diagnostic if a matching type alias exists but does not
/// resolve to an object literal.
fn find_fields<'a>(
    unit: &'a SourceUnit,
    name: &str,
) -> Option<Result<Vec<(String, &'a TsType)>, Diagnostic>> {
    for item in module_items(unit) {
        match item {
            ModuleItem::Stmt(Stmt::Decl(Decl::TsInterface(iface))) if &*iface.id.sym == name => {
                let fields = iface
                    .body
                    .body
                    .iter()
                    .filter_map(interface_member_field)
                    .collect();
                return Some(Ok(fields));
            }
            ModuleItem::Stmt(Stmt::Decl(Decl::TsTypeAlias(alias))) if &*alias.id.sym == name => {
                return Some(match alias.type_ann.as_ref() {
                    TsType::TsTypeLit(lit) => {
                        Ok(lit.members.iter().filter_map(interface_member_field).collect())
                    }
                    _ => Err(Diagnostic::NonLiteralTypeAlias {
                        name: name.to_string(),
                    }),
                });
            }
            _ => {}
        }
    }
    None
}

fn interface_member_field(member: &TsTypeElement) -> Option<(String, &TsType)> {
    let TsTypeElement::TsPropertySignature(prop) = member else {
        return None;
    };
    let name = prop.key.as_ident()?.sym.to_string();
    let ty = prop.type_ann.as_ref()?.type_ann.as_ref();
    Some((name, ty))
}

fn module_items(unit: &SourceUnit) -> Box<dyn Iterator<Item = &ModuleItem> + '_> {
    match &unit.program {
        swc_ecma_ast::Program::Module(module) => Box::new(module.body.iter()),
        swc_ecma_ast::Program::Script(_) => Box::new(std::iter::empty()),
    }
}

/// Computes the closure of structs reachable from `roots`, synthesizing
/// one [`StructDescriptor`] per reachable, non-cyclic, non-empty struct.
/// Diagnostics from malformed type aliases, empty structs, and cycles are
/// reported as encountered.
pub fn synthesize_structs(
    unit: &SourceUnit,
    roots: &[String],
    sink: &mut dyn crate::diagnostics::DiagnosticSink,
) -> Vec<StructDescriptor> {
    let mut emitted = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut visiting: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = roots.iter().cloned().collect();

    while let Some(name) = queue.pop_front() {
        if seen.contains(&name) {
            continue;
        }
        if visiting.contains(&name) {
            sink.report(Diagnostic::CyclicStructReference { name });
            continue;
        }
        let Some(fields_result) = find_fields(unit, &name) else {
            // Not a struct declared in this unit (e.g. a scalar/vector
            // alias name); nothing to synthesize.
            continue;
        };
        visiting.insert(name.clone());

        let raw_fields = match fields_result {
            Ok(fields) => fields,
            Err(diag) => {
                sink.report(diag);
                visiting.remove(&name);
                seen.insert(name);
                continue;
            }
        };

        if raw_fields.is_empty() {
            sink.report(Diagnostic::EmptyStruct { name: name.clone() });
            visiting.remove(&name);
            seen.insert(name);
            continue;
        }

        let mut fields = Vec::with_capacity(raw_fields.len());
        for (field_name, ty) in raw_fields {
            let (mapped, diag) = map_type(ty);
            if let Some(diag) = diag {
                sink.report(diag);
            }
            if let Some(referenced) = mapped.referenced_struct() {
                queue.push_back(referenced.to_string());
            }
            fields.push(StructField {
                name: field_name,
                mapped_type: mapped,
            });
        }

        visiting.remove(&name);
        seen.insert(name.clone());
        emitted.push(StructDescriptor { name, fields });
    }

    emitted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;

    fn unit(src: &str) -> SourceUnit {
        SourceUnit::parse(src).expect("parses")
    }

    #[test]
    fn synthesizes_a_single_interface() {
        let u = unit(
            r#"
            interface Params {
                width: u32;
                time: f32;
            }
            "#,
        );
        let mut sink = CollectingSink::default();
        let structs = synthesize_structs(&u, &["Params".to_string()], &mut sink);
        assert_eq!(structs.len(), 1);
        assert_eq!(structs[0].name, "Params");
        assert_eq!(structs[0].fields.len(), 2);
        assert!(sink.diagnostics.is_empty());
    }

    #[test]
    fn empty_struct_is_suppressed() {
        let u = unit("interface Empty {}");
        let mut sink = CollectingSink::default();
        let structs = synthesize_structs(&u, &["Empty".to_string()], &mut sink);
        assert!(structs.is_empty());
        assert!(matches!(sink.diagnostics[0], Diagnostic::EmptyStruct { .. }));
    }

    #[test]
    fn cyclic_reference_does_not_loop_forever() {
        let u = unit(
            r#"
            interface A { next: B; }
            interface B { next: A; }
            "#,
        );
        let mut sink = CollectingSink::default();
        let structs = synthesize_structs(&u, &["A".to_string()], &mut sink);
        // A and B are both emitted once each; the second visit to either
        // name is the detected cycle.
        assert_eq!(structs.len(), 2);
        assert!(
            sink.diagnostics
                .iter()
                .any(|d| matches!(d, Diagnostic::CyclicStructReference { .. }))
        );
    }

    #[test]
    fn non_object_type_alias_is_rejected() {
        let u = unit("type Weird = number;");
        let mut sink = CollectingSink::default();
        let structs = synthesize_structs(&u, &["Weird".to_string()], &mut sink);
        assert!(structs.is_empty());
        assert!(matches!(
            sink.diagnostics[0],
            Diagnostic::NonLiteralTypeAlias { .. }
        ));
    }
}
