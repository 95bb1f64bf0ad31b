//! Expression/Statement Translator (§4.C): recursive descent over the
//! body of a single annotated or device function, rendering each
//! supported syntactic form as target shader language text.
//!
//! Structured as a flat match over AST node variants rather than a class
//! hierarchy, per §9's tagged-variant-dispatch guidance — the same shape
//! as the teacher's `node.node_type.as_str()` dispatch in
//! `renderer/node_compiler/mod.rs::compile_expr`, here matching on
//! `swc_ecma_ast` enum variants instead of a string tag.

use swc_ecma_ast::{
    BinExpr, BlockStmt, CallExpr, Callee, CondExpr, Decl, DoWhileStmt, Expr, ForStmt, Ident,
    IfStmt, Lit, MemberExpr, MemberProp, Stmt, SwitchStmt, UnaryExpr, UpdateExpr, VarDeclKind,
    VarDeclOrExpr, WhileStmt,
};

use crate::diagnostics::Diagnostic;
use crate::type_mapper::map_type;

/// Translates the body of one function. Holds the enclosing function's
/// name only to attribute [`Diagnostic::UnknownNode`] findings.
pub struct Translator<'a> {
    sink: &'a mut dyn crate::diagnostics::DiagnosticSink,
    function_name: String,
}

impl<'a> Translator<'a> {
    pub fn new(sink: &'a mut dyn crate::diagnostics::DiagnosticSink, function_name: &str) -> Self {
        Translator {
            sink,
            function_name: function_name.to_string(),
        }
    }

    fn unknown(&mut self, kind: &str) -> String {
        self.sink.report(Diagnostic::UnknownNode {
            kind: kind.to_string(),
            function: self.function_name.clone(),
        });
        format!("/* Unsupported node: {kind} */")
    }

    /// Render a function body (a block of statements) as shader text.
    pub fn block(&mut self, block: &BlockStmt) -> String {
        let mut out = String::from("{\n");
        for stmt in &block.stmts {
            out.push_str(&self.stmt(stmt));
        }
        out.push_str("}\n");
        out
    }

    fn stmt(&mut self, stmt: &Stmt) -> String {
        match stmt {
            Stmt::Empty(_) => String::new(),
            Stmt::Block(block) => self.block(block),
            Stmt::Expr(expr_stmt) => format!("{};\n", self.expr(&expr_stmt.expr)),
            Stmt::Decl(Decl::Var(var_decl)) => self.var_decl(var_decl),
            Stmt::Return(ret) => match &ret.arg {
                Some(arg) => format!("return {};\n", self.expr(arg)),
                None => "return;\n".to_string(),
            },
            Stmt::Break(_) => "break;\n".to_string(),
            Stmt::Continue(_) => "continue;\n".to_string(),
            Stmt::If(if_stmt) => self.if_stmt(if_stmt),
            Stmt::While(while_stmt) => self.while_stmt(while_stmt),
            Stmt::DoWhile(do_while) => self.do_while_stmt(do_while),
            Stmt::For(for_stmt) => self.for_stmt(for_stmt),
            Stmt::Switch(switch_stmt) => self.switch_stmt(switch_stmt),
            other => {
                let kind = format!("{other:?}");
                let kind = kind.split('(').next().unwrap_or("Stmt").to_string();
                format!("{}\n", self.unknown(&kind))
            }
        }
    }

    fn var_decl(&mut self, var_decl: &swc_ecma_ast::VarDecl) -> String {
        let keyword = match var_decl.kind {
            VarDeclKind::Const => "let",
            VarDeclKind::Let | VarDeclKind::Var => "var",
        };
        let mut out = String::new();
        for decl in &var_decl.decls {
            let name = match &decl.name {
                swc_ecma_ast::Pat::Ident(ident) => ident.id.sym.to_string(),
                _ => self.unknown("VarDeclPattern"),
            };
            let type_ann = decl
                .name
                .as_ident()
                .and_then(|ident| ident.type_ann.as_ref())
                .map(|ann| map_type(&ann.type_ann).0.wgsl());

            out.push_str(keyword);
            out.push(' ');
            out.push_str(&name);
            if let Some(ty) = type_ann {
                out.push_str(" : ");
                out.push_str(&ty);
            }
            if let Some(init) = &decl.init {
                out.push_str(" = ");
                out.push_str(&self.expr(init));
            }
            out.push_str(";\n");
        }
        out
    }

    fn if_stmt(&mut self, if_stmt: &IfStmt) -> String {
        let cond = self.expr(&if_stmt.test);
        let cons = self.branch(&if_stmt.cons);
        let mut out = format!("if ({cond}) {cons}");
        if let Some(alt) = &if_stmt.alt {
            out.push_str(" else ");
            out.push_str(&self.branch(alt));
        }
        out.push('\n');
        out
    }

    fn branch(&mut self, stmt: &Stmt) -> String {
        match stmt {
            Stmt::Block(block) => self.block(block),
            other => format!("{{\n{}}}\n", self.stmt(other)),
        }
    }

    fn while_stmt(&mut self, while_stmt: &WhileStmt) -> String {
        let cond = self.expr(&while_stmt.test);
        let body = self.branch(&while_stmt.body);
        format!("while ({cond}) {body}")
    }

    /// Lowered to `loop { <body> if (!(<cond>)) { break; } }`: the target
    /// shading language has no native do-while (§4.C).
    fn do_while_stmt(&mut self, do_while: &DoWhileStmt) -> String {
        let cond = self.expr(&do_while.test);
        let body = match do_while.body.as_ref() {
            Stmt::Block(block) => {
                let mut inner = String::new();
                for s in &block.stmts {
                    inner.push_str(&self.stmt(s));
                }
                inner
            }
            other => self.stmt(other),
        };
        format!("loop {{\n{body}if (!({cond})) {{ break; }}\n}}\n")
    }

    fn for_stmt(&mut self, for_stmt: &ForStmt) -> String {
        let init = match &for_stmt.init {
            Some(VarDeclOrExpr::VarDecl(var_decl)) => {
                self.var_decl(var_decl).trim_end().trim_end_matches(';').to_string()
            }
            Some(VarDeclOrExpr::Expr(expr)) => self.expr(expr),
            None => String::new(),
        };
        let cond = for_stmt.test.as_ref().map(|e| self.expr(e)).unwrap_or_default();
        let update = for_stmt.update.as_ref().map(|e| self.expr(e)).unwrap_or_default();
        let body = self.branch(&for_stmt.body);
        format!("for ({init}; {cond}; {update}) {body}")
    }

    fn switch_stmt(&mut self, switch_stmt: &SwitchStmt) -> String {
        let disc = self.expr(&switch_stmt.disc);
        let mut out = format!("switch ({disc}) {{\n");
        for case in &switch_stmt.cases {
            match &case.test {
                Some(test) => out.push_str(&format!("case {}: {{\n", self.expr(test))),
                None => out.push_str("default: {\n"),
            }
            for stmt in &case.cons {
                out.push_str(&self.stmt(stmt));
            }
            out.push_str("}\n");
        }
        out.push_str("}\n");
        out
    }

    fn expr(&mut self, expr: &Expr) -> String {
        match expr {
            Expr::Lit(lit) => self.lit(lit),
            Expr::Ident(ident) => self.ident(ident),
            Expr::Bin(bin) => self.bin(bin),
            Expr::Unary(unary) => self.unary(unary),
            Expr::Update(update) => self.update(update),
            Expr::Assign(assign) => {
                let left = match &assign.left {
                    swc_ecma_ast::AssignTarget::Simple(simple) => match simple {
                        swc_ecma_ast::SimpleAssignTarget::Ident(ident) => self.ident(&ident.id),
                        swc_ecma_ast::SimpleAssignTarget::Member(member) => self.member(member),
                        _ => self.unknown("AssignTarget"),
                    },
                    _ => self.unknown("AssignTarget"),
                };
                let right = self.expr(&assign.right);
                format!("{left} {} {right}", assign.op.as_str())
            }
            Expr::Cond(cond) => self.cond(cond),
            Expr::Call(call) => self.call(call),
            Expr::Member(member) => self.member(member),
            Expr::Paren(paren) => format!("({})", self.expr(&paren.expr)),
            Expr::TsAs(as_expr) => self.expr(&as_expr.expr),
            Expr::TsConstAssertion(assertion) => self.expr(&assertion.expr),
            Expr::TsNonNull(non_null) => self.expr(&non_null.expr),
            other => {
                let kind = format!("{other:?}");
                let kind = kind.split('(').next().unwrap_or("Expr").to_string();
                self.unknown(&kind)
            }
        }
    }

    fn lit(&mut self, lit: &Lit) -> String {
        match lit {
            Lit::Num(num) => num.raw.as_ref().map(|s| s.to_string()).unwrap_or_else(|| num.value.to_string()),
            Lit::Bool(b) => b.value.to_string(),
            other => self.unknown(&format!("{other:?}")),
        }
    }

    /// `global_id` is normalized to `global_invocation_id` unconditionally
    /// (§4.C, §9 Open Questions).
    fn ident(&mut self, ident: &Ident) -> String {
        if &*ident.sym == "global_id" {
            "global_invocation_id".to_string()
        } else {
            ident.sym.to_string()
        }
    }

    fn bin(&mut self, bin: &BinExpr) -> String {
        let left = self.expr(&bin.left);
        let right = self.expr(&bin.right);
        format!("{left} {} {right}", bin.op.as_str())
    }

    fn unary(&mut self, unary: &UnaryExpr) -> String {
        format!("{}{}", unary.op.as_str(), self.expr(&unary.arg))
    }

    fn update(&mut self, update: &UpdateExpr) -> String {
        let arg = self.expr(&update.arg);
        if update.prefix {
            format!("{}{arg}", update.op.as_str())
        } else {
            format!("{arg}{}", update.op.as_str())
        }
    }

    /// Ternary lowers to `select(whenFalse, whenTrue, condition)` — the
    /// target language places the false value first (§4.C, invariant 6).
    fn cond(&mut self, cond: &CondExpr) -> String {
        let test = self.expr(&cond.test);
        let cons = self.expr(&cond.cons);
        let alt = self.expr(&cond.alt);
        format!("select({alt}, {cons}, {test})")
    }

    fn call(&mut self, call: &CallExpr) -> String {
        let Callee::Expr(callee) = &call.callee else {
            return self.unknown("CalleeSuperOrImport");
        };
        let callee_name = match callee.as_ref() {
            Expr::Ident(ident) => Some(ident.sym.to_string()),
            _ => None,
        };
        let callee_text = self.expr(callee);
        let mut args: Vec<String> = call
            .args
            .iter()
            .map(|arg| self.expr(&arg.expr))
            .collect();

        // Atomic intrinsics take a pointer to their first argument.
        if let Some(name) = &callee_name {
            if name.starts_with("atomic") {
                if let Some(first) = args.first_mut() {
                    *first = format!("&{first}");
                }
            }
        }

        format!("{callee_text}({})", args.join(", "))
    }

    fn member(&mut self, member: &MemberExpr) -> String {
        let obj = self.expr(&member.obj);
        match &member.prop {
            MemberProp::Ident(ident) => format!("{obj}.{}", ident.sym),
            MemberProp::Computed(computed) => format!("{obj}[{}]", self.expr(&computed.expr)),
            MemberProp::PrivateName(_) => self.unknown("PrivateMember"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;
    use swc_ecma_ast::{Module, ModuleItem, Stmt as AstStmt};

    fn translate_fn_body(src: &str) -> (String, CollectingSink) {
        let unit = crate::parse::SourceUnit::parse(src).expect("parses");
        let Module { body, .. } = match unit.program {
            swc_ecma_ast::Program::Module(m) => m,
            _ => panic!("expected module"),
        };
        let func = body.iter().find_map(|item| match item {
            ModuleItem::Stmt(AstStmt::Decl(Decl::Fn(f))) => Some(f.function.clone()),
            _ => None,
        });
        let func = func.expect("one function declaration");
        let block = func.body.expect("function has a body");
        let mut sink = CollectingSink::default();
        let mut translator = Translator::new(&mut sink, "f");
        (translator.block(&block), sink)
    }

    #[test]
    fn translates_ternary_to_select_with_swapped_operands() {
        let (out, _) = translate_fn_body("function f() { let x = cond ? a : b; }");
        assert!(out.contains("select(b, a, cond)"));
    }

    #[test]
    fn lowers_do_while_to_loop_with_negated_break_condition() {
        let (out, _) = translate_fn_body("function f() { do { i++; } while (i < 10); }");
        assert!(out.contains("loop {"));
        assert!(out.contains("if (!(i < 10)) { break; }"));
    }

    #[test]
    fn atomic_call_prefixes_first_argument_with_address_of() {
        let (out, _) = translate_fn_body("function f() { atomicAdd(data[0], 1); }");
        assert!(out.contains("atomicAdd(&data[0], 1)"));
    }

    #[test]
    fn global_id_is_normalized() {
        let (out, _) = translate_fn_body("function f() { let i = global_id.x; }");
        assert!(out.contains("global_invocation_id.x"));
    }

    #[test]
    fn unknown_node_emits_comment_and_diagnostic_but_does_not_abort() {
        let (out, sink) = translate_fn_body("function f() { a ??= b; }");
        assert!(out.contains("Unsupported node"));
        assert!(!sink.diagnostics.is_empty());
    }

    #[test]
    fn type_assertion_is_stripped() {
        let (out, _) = translate_fn_body("function f() { let x = (y as f32); }");
        assert!(!out.contains("as f32"));
    }
}
