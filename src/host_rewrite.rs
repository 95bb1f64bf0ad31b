//! Host Rewriter (§4.E): the four in-place transformations applied to
//! the host AST once every annotated function's shader text has been
//! emitted.
//!
//! Call-site rewriting uses an `swc_ecma_visit::VisitMut` pass since a
//! kernel call can appear nested anywhere in an expression tree; import
//! injection and shader-function replacement only ever touch top-level
//! declarations, so those two walk `Module::body` directly rather than
//! through a generic visitor.

use std::collections::HashMap;

use swc_common::DUMMY_SP;
use swc_ecma_ast::{
    ArrayLit, CallExpr, Callee, Decl, EsVersion, Expr, ExprOrSpread, Ident, ImportDecl,
    ImportNamedSpecifier, ImportSpecifier, KeyValueProp, Lit, Module, ModuleDecl, ModuleExportName,
    ModuleItem, Number, ObjectLit, Param, Pat, Prop, PropName, PropOrSpread, Stmt, Str, TsKeywordType,
    TsKeywordTypeKind, TsType, TsTypeAnn, VarDeclKind,
};
use swc_ecma_codegen::{Config, Emitter, text_writer::JsWriter};
use swc_ecma_visit::{VisitMut, VisitMutWith};

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::parse::SourceUnit;
use crate::types::StageKind;

/// Names of functions that received a kernel shader, for call-site
/// rewriting: only calls to these names carry the type-level
/// workgroup-count tuple.
pub struct RewritePlan {
    /// function name -> (wgsl text, stage)
    pub shaders: HashMap<String, (String, StageKind)>,
}

fn any_type_ann() -> TsTypeAnn {
    TsTypeAnn {
        span: DUMMY_SP,
        type_ann: Box::new(TsType::TsKeywordType(TsKeywordType {
            span: DUMMY_SP,
            kind: TsKeywordTypeKind::TsAnyKeyword,
        })),
    }
}

fn ident(name: &str) -> Ident {
    Ident::new(name.into(), DUMMY_SP, Default::default())
}

struct CallSiteRewriter<'a> {
    kernels: &'a HashMap<String, (String, StageKind)>,
    sink: &'a mut dyn DiagnosticSink,
}

impl VisitMut for CallSiteRewriter<'_> {
    fn visit_mut_call_expr(&mut self, call: &mut CallExpr) {
        call.visit_mut_children_with(self);

        let Callee::Expr(callee) = &call.callee else {
            return;
        };
        let Expr::Ident(callee_ident) = callee.as_ref() else {
            return;
        };
        let name = callee_ident.sym.to_string();
        let Some((_, StageKind::Kernel)) = self.kernels.get(&name) else {
            return;
        };
        let Some(type_args) = call.type_args.take() else {
            return;
        };

        let dims = type_args.params.first().and_then(|ty| match ty.as_ref() {
            TsType::TsTupleType(tuple) => tuple
                .elem_types
                .iter()
                .map(|elem| match elem.ty.as_ref() {
                    TsType::TsLitType(lit) => match &lit.lit {
                        swc_ecma_ast::TsLit::Number(n) => Some(n.value),
                        _ => None,
                    },
                    _ => None,
                })
                .collect::<Option<Vec<f64>>>(),
            _ => None,
        });

        match dims {
            Some(dims) => {
                let array = Expr::Array(ArrayLit {
                    span: DUMMY_SP,
                    elems: dims
                        .into_iter()
                        .map(|d| {
                            Some(ExprOrSpread {
                                spread: None,
                                expr: Box::new(Expr::Lit(Lit::Num(Number {
                                    span: DUMMY_SP,
                                    value: d,
                                    raw: None,
                                }))),
                            })
                        })
                        .collect(),
                });
                call.args.push(ExprOrSpread {
                    spread: None,
                    expr: Box::new(array),
                });
            }
            None => {
                self.sink.report(Diagnostic::MalformedWorkgroupCount {
                    function: name,
                });
                // Leave the call site unchanged: put the type argument back.
                call.type_args = Some(type_args);
            }
        }
    }
}

/// Apply the four Host Rewriter transformations to `unit` and return the
/// serialized result.
pub fn rewrite(unit: &mut SourceUnit, plan: &RewritePlan, sink: &mut dyn DiagnosticSink) -> String {
    rewrite_call_sites(unit, plan, sink);
    inject_runtime_import(unit);
    replace_shader_functions(unit, plan);
    render(unit)
}

fn rewrite_call_sites(unit: &mut SourceUnit, plan: &RewritePlan, sink: &mut dyn DiagnosticSink) {
    let Module { body, .. } = module_mut(unit);
    let mut rewriter = CallSiteRewriter {
        kernels: &plan.shaders,
        sink,
    };
    for item in body.iter_mut() {
        item.visit_mut_with(&mut rewriter);
    }
}

fn module_mut(unit: &mut SourceUnit) -> &mut Module {
    match &mut unit.program {
        swc_ecma_ast::Program::Module(module) => module,
        swc_ecma_ast::Program::Script(_) => {
            unreachable!("translator only operates on module-form source units")
        }
    }
}

fn has_runtime_import(module: &Module) -> bool {
    module.body.iter().any(|item| {
        matches!(
            item,
            ModuleItem::ModuleDecl(ModuleDecl::Import(import))
                if import.specifiers.iter().any(|spec| matches!(
                    spec,
                    ImportSpecifier::Named(named) if &*named.local.sym == "runtime"
                ))
        )
    })
}

fn inject_runtime_import(unit: &mut SourceUnit) {
    let module = module_mut(unit);
    if has_runtime_import(module) {
        return;
    }
    let import = ModuleItem::ModuleDecl(ModuleDecl::Import(ImportDecl {
        span: DUMMY_SP,
        specifiers: vec![ImportSpecifier::Named(ImportNamedSpecifier {
            span: DUMMY_SP,
            local: ident("runtime"),
            imported: None,
            is_type_only: false,
        })],
        src: Box::new(Str {
            span: DUMMY_SP,
            value: "./runtime".into(),
            raw: None,
        }),
        type_only: false,
        with: None,
        phase: Default::default(),
    }));
    module.body.insert(0, import);
}

/// Processing order is reverse declaration order (§4.E), so prepending a
/// `<fn>_wgsl` constant ahead of a later function never shifts the index
/// of an earlier one still awaiting rewrite.
fn replace_shader_functions(unit: &mut SourceUnit, plan: &RewritePlan) {
    let module = module_mut(unit);
    let mut i = module.body.len();
    while i > 0 {
        i -= 1;
        let Some((name, stage)) = shader_fn_name_at(&module.body[i], plan) else {
            continue;
        };
        let wgsl = plan
            .shaders
            .get(&name)
            .map(|(wgsl, _)| wgsl.clone())
            .unwrap_or_default();
        let const_item = wgsl_const_item(&name, &wgsl);

        if let ModuleItem::Stmt(Stmt::Decl(Decl::Fn(fn_decl))) = &mut module.body[i] {
            let param_names: Vec<String> = fn_decl
                .function
                .params
                .iter()
                .filter_map(|param| match &param.pat {
                    Pat::Ident(ident) => Some(ident.id.sym.to_string()),
                    _ => None,
                })
                .collect();
            for param in fn_decl.function.params.iter_mut() {
                if let Pat::Ident(ident) = &mut param.pat {
                    ident.type_ann = Some(any_type_ann());
                }
            }
            fn_decl.function.params.push(workgroup_count_param());
            fn_decl.function.body = Some(dispatch_body(&name, stage, &param_names));
        }

        module.body.insert(i, const_item);
    }
}

fn shader_fn_name_at(item: &ModuleItem, plan: &RewritePlan) -> Option<(String, StageKind)> {
    let ModuleItem::Stmt(Stmt::Decl(Decl::Fn(fn_decl))) = item else {
        return None;
    };
    let name = fn_decl.ident.sym.to_string();
    plan.shaders.get(&name).map(|(_, stage)| (name, *stage))
}

fn workgroup_count_param() -> Param {
    Param {
        span: DUMMY_SP,
        decorators: vec![],
        pat: Pat::Ident(swc_ecma_ast::BindingIdent {
            id: ident("workgroup_count"),
            type_ann: Some(any_type_ann()),
        }),
    }
}

fn wgsl_const_item(name: &str, wgsl: &str) -> ModuleItem {
    let var_decl = swc_ecma_ast::VarDecl {
        span: DUMMY_SP,
        ctxt: Default::default(),
        kind: VarDeclKind::Const,
        declare: false,
        decls: vec![swc_ecma_ast::VarDeclarator {
            span: DUMMY_SP,
            name: Pat::Ident(swc_ecma_ast::BindingIdent {
                id: ident(&format!("{name}_wgsl")),
                type_ann: None,
            }),
            init: Some(Box::new(Expr::Lit(Lit::Str(Str {
                span: DUMMY_SP,
                value: wgsl.into(),
                raw: None,
            })))),
            definite: false,
        }],
    };
    ModuleItem::Stmt(Stmt::Decl(Decl::Var(Box::new(var_decl))))
}

fn call_runtime_dispatch(name: &str, param_names: &[String]) -> Expr {
    let args_array = Expr::Array(ArrayLit {
        span: DUMMY_SP,
        elems: param_names
            .iter()
            .map(|p| {
                Some(ExprOrSpread {
                    spread: None,
                    expr: Box::new(Expr::Ident(ident(p))),
                })
            })
            .collect(),
    });
    let args = vec![
        ExprOrSpread {
            spread: None,
            expr: Box::new(Expr::Ident(ident(&format!("{name}_wgsl")))),
        },
        ExprOrSpread {
            spread: None,
            expr: Box::new(Expr::Lit(Lit::Str(Str {
                span: DUMMY_SP,
                value: name.into(),
                raw: None,
            }))),
        },
        ExprOrSpread {
            spread: None,
            expr: Box::new(args_array),
        },
        ExprOrSpread {
            spread: None,
            expr: Box::new(Expr::Ident(ident("workgroup_count"))),
        },
    ];
    Expr::Call(CallExpr {
        span: DUMMY_SP,
        ctxt: Default::default(),
        callee: Callee::Expr(Box::new(Expr::Member(swc_ecma_ast::MemberExpr {
            span: DUMMY_SP,
            obj: Box::new(Expr::Ident(ident("runtime"))),
            prop: swc_ecma_ast::MemberProp::Ident(swc_ecma_ast::IdentName::new(
                "dispatch".into(),
                DUMMY_SP,
            )),
        }))),
        args,
        type_args: None,
    })
}

fn pipeline_object(name: &str) -> Expr {
    Expr::Object(ObjectLit {
        span: DUMMY_SP,
        props: vec![
            PropOrSpread::Prop(Box::new(Prop::KeyValue(KeyValueProp {
                key: PropName::Ident(swc_ecma_ast::IdentName::new("code".into(), DUMMY_SP)),
                value: Box::new(Expr::Ident(ident(&format!("{name}_wgsl")))),
            }))),
            PropOrSpread::Prop(Box::new(Prop::KeyValue(KeyValueProp {
                key: PropName::Ident(swc_ecma_ast::IdentName::new("entryPoint".into(), DUMMY_SP)),
                value: Box::new(Expr::Lit(Lit::Str(Str {
                    span: DUMMY_SP,
                    value: name.into(),
                    raw: None,
                }))),
            }))),
        ],
    })
}

fn dispatch_body(name: &str, stage: StageKind, param_names: &[String]) -> swc_ecma_ast::BlockStmt {
    let return_expr = match stage {
        StageKind::Kernel => call_runtime_dispatch(name, param_names),
        StageKind::Vertex | StageKind::Fragment => pipeline_object(name),
    };
    swc_ecma_ast::BlockStmt {
        span: DUMMY_SP,
        ctxt: Default::default(),
        stmts: vec![Stmt::Return(swc_ecma_ast::ReturnStmt {
            span: DUMMY_SP,
            arg: Some(Box::new(return_expr)),
        })],
    }
}

fn render(unit: &SourceUnit) -> String {
    let mut buf = Vec::new();
    {
        let writer = JsWriter::new(unit.source_map.clone(), "\n", &mut buf, None);
        let mut emitter = Emitter {
            cfg: Config::default(),
            cm: unit.source_map.clone(),
            comments: Some(&unit.comments),
            wr: writer,
        };
        emitter
            .emit_module(&unit.program.clone().expect_module())
            .expect("codegen does not fail on a well-formed tree");
    }
    String::from_utf8(buf).expect("codegen emits valid utf8")
}

trait ExpectModule {
    fn expect_module(self) -> Module;
}
impl ExpectModule for swc_ecma_ast::Program {
    fn expect_module(self) -> Module {
        match self {
            swc_ecma_ast::Program::Module(m) => m,
            swc_ecma_ast::Program::Script(_) => panic!("expected module-form program"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;

    #[test]
    fn call_site_rewrite_moves_tuple_type_arg_to_runtime_arg() {
        let mut unit = SourceUnit::parse("add<[64, 1, 1]>(a, b, out);").unwrap();
        let mut shaders = HashMap::new();
        shaders.insert("add".to_string(), ("shader text".to_string(), StageKind::Kernel));
        let plan = RewritePlan { shaders };
        let mut sink = CollectingSink::default();
        let out = rewrite(&mut unit, &plan, &mut sink);
        assert!(out.contains("add(a, b, out, [\n    64,\n    1,\n    1\n])") || out.contains("[64, 1, 1]"));
        assert!(sink.diagnostics.is_empty());
    }

    #[test]
    fn malformed_type_arg_is_restored_not_stripped() {
        let mut unit = SourceUnit::parse("f<string>(buf);").unwrap();
        let mut shaders = HashMap::new();
        shaders.insert("f".to_string(), ("shader text".to_string(), StageKind::Kernel));
        let plan = RewritePlan { shaders };
        let mut sink = CollectingSink::default();
        let out = rewrite(&mut unit, &plan, &mut sink);
        assert!(out.contains("f<string>(buf)"));
        assert_eq!(sink.diagnostics.len(), 1);
        assert!(matches!(
            sink.diagnostics[0],
            Diagnostic::MalformedWorkgroupCount { .. }
        ));
    }

    #[test]
    fn import_is_injected_once() {
        let mut unit = SourceUnit::parse("function f() {}").unwrap();
        let plan = RewritePlan {
            shaders: HashMap::new(),
        };
        let mut sink = CollectingSink::default();
        let out = rewrite(&mut unit, &plan, &mut sink);
        assert!(out.contains("import { runtime }"));
    }
}
