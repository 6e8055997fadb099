//! Deterministic renderer: serializes a tree back to source text.
//!
//! The output is structurally faithful, not token-for-token faithful to any
//! original input. The same tree always renders to the same text, which is
//! what the atomic-batch diff checks rely on.

use crate::syntax::expr::{Arg, Expr, Literal, Pattern, Stmt};
use crate::syntax::tree::{Member, MethodDecl, SourceUnit, TypeDecl};

const INDENT: &str = "    ";

/// Renders source units to text.
#[derive(Debug, Clone, Default)]
pub struct Renderer;

impl Renderer {
    /// Create a renderer.
    pub fn new() -> Self {
        Self
    }

    /// Render one unit to source text.
    pub fn render_unit(&self, unit: &SourceUnit) -> String {
        let mut out = String::new();

        if let Some(namespace) = &unit.namespace {
            out.push_str(&format!("namespace {namespace};\n\n"));
        }

        for import in &unit.imports {
            out.push_str(&format!("using {import};\n"));
        }
        if !unit.imports.is_empty() {
            out.push('\n');
        }

        for (i, ty) in unit.types.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            self.render_type(&mut out, ty);
        }

        out
    }

    fn render_type(&self, out: &mut String, ty: &TypeDecl) {
        match &ty.base {
            Some(base) => out.push_str(&format!("public class {} : {}\n{{\n", ty.name, base)),
            None => out.push_str(&format!("public class {}\n{{\n", ty.name)),
        }

        for (i, member) in ty.members.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            match member {
                Member::Field(field) => {
                    let statik = if field.is_static { "static " } else { "" };
                    match &field.initializer {
                        Some(init) => out.push_str(&format!(
                            "{INDENT}{} {statik}{} {} = {};\n",
                            field.visibility.keyword(),
                            field.ty,
                            field.name,
                            self.render_expr(init),
                        )),
                        None => out.push_str(&format!(
                            "{INDENT}{} {statik}{} {};\n",
                            field.visibility.keyword(),
                            field.ty,
                            field.name,
                        )),
                    }
                }
                Member::Property(prop) => {
                    let statik = if prop.is_static { "static " } else { "" };
                    out.push_str(&format!(
                        "{INDENT}{} {statik}{} {} {{ get; set; }}\n",
                        prop.visibility.keyword(),
                        prop.ty,
                        prop.name,
                    ));
                }
                Member::Method(method) => self.render_method(out, method),
            }
        }

        out.push_str("}\n");
    }

    fn render_method(&self, out: &mut String, method: &MethodDecl) {
        let statik = if method.is_static { "static " } else { "" };
        let params = method
            .params
            .iter()
            .map(|p| format!("{} {}", p.ty, p.name))
            .collect::<Vec<_>>()
            .join(", ");

        out.push_str(&format!(
            "{INDENT}{} {statik}{} {}({params})\n{INDENT}{{\n",
            method.visibility.keyword(),
            method.return_ty,
            method.name,
        ));
        for stmt in &method.body {
            self.render_stmt(out, stmt, 2);
        }
        out.push_str(&format!("{INDENT}}}\n"));
    }

    fn render_stmt(&self, out: &mut String, stmt: &Stmt, depth: usize) {
        let pad = INDENT.repeat(depth);
        match stmt {
            Stmt::Expr(expr) => out.push_str(&format!("{pad}{};\n", self.render_expr(expr))),
            Stmt::Return(None) => out.push_str(&format!("{pad}return;\n")),
            Stmt::Return(Some(expr)) => {
                out.push_str(&format!("{pad}return {};\n", self.render_expr(expr)));
            }
            Stmt::Local { name, ty, value } => {
                let ty = ty.as_deref().unwrap_or("var");
                out.push_str(&format!("{pad}{ty} {name} = {};\n", self.render_expr(value)));
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                out.push_str(&format!("{pad}if ({})\n{pad}{{\n", self.render_expr(cond)));
                for stmt in then_branch {
                    self.render_stmt(out, stmt, depth + 1);
                }
                out.push_str(&format!("{pad}}}\n"));
                if !else_branch.is_empty() {
                    out.push_str(&format!("{pad}else\n{pad}{{\n"));
                    for stmt in else_branch {
                        self.render_stmt(out, stmt, depth + 1);
                    }
                    out.push_str(&format!("{pad}}}\n"));
                }
            }
            Stmt::Switch { scrutinee, arms } => {
                out.push_str(&format!(
                    "{pad}switch ({})\n{pad}{{\n",
                    self.render_expr(scrutinee)
                ));
                for arm in arms {
                    match &arm.pattern {
                        Pattern::Discard => out.push_str(&format!("{pad}{INDENT}default:\n")),
                        pattern => out.push_str(&format!(
                            "{pad}{INDENT}case {}:\n",
                            self.render_pattern(pattern)
                        )),
                    }
                    for stmt in &arm.body {
                        self.render_stmt(out, stmt, depth + 2);
                    }
                    out.push_str(&format!("{pad}{INDENT}{INDENT}break;\n"));
                }
                out.push_str(&format!("{pad}}}\n"));
            }
        }
    }

    fn render_pattern(&self, pattern: &Pattern) -> String {
        match pattern {
            Pattern::Discard => "_".to_string(),
            Pattern::Literal(lit) => self.render_literal(lit),
            Pattern::Binding(name) => format!("var {name}"),
            Pattern::Property { ty, entries } => {
                let entries = entries
                    .iter()
                    .map(|e| format!("{}: {}", e.label, self.render_pattern(&e.pattern)))
                    .collect::<Vec<_>>()
                    .join(", ");
                match ty {
                    Some(ty) => format!("{ty} {{ {entries} }}"),
                    None => format!("{{ {entries} }}"),
                }
            }
        }
    }

    /// Render one expression.
    pub fn render_expr(&self, expr: &Expr) -> String {
        match expr {
            Expr::Literal { value, .. } => self.render_literal(value),
            Expr::Ident { name, .. } => name.clone(),
            Expr::This { .. } => "this".to_string(),
            Expr::Base { .. } => "base".to_string(),
            Expr::Member { target, name, .. } => {
                format!("{}.{name}", self.render_expr(target))
            }
            Expr::ConditionalChain { root, segments, .. } => {
                let mut text = self.render_expr(root);
                for segment in segments {
                    match &segment.args {
                        Some(args) => {
                            text.push_str(&format!("?.{}({})", segment.name, self.render_args(args)));
                        }
                        None => text.push_str(&format!("?.{}", segment.name)),
                    }
                }
                text
            }
            Expr::Invoke { callee, args, .. } => {
                format!("{}({})", self.render_expr(callee), self.render_args(args))
            }
            Expr::New { ty, args, init, .. } => {
                let mut text = format!("new {ty}({})", self.render_args(args));
                if !init.is_empty() {
                    let entries = init
                        .iter()
                        .map(|e| format!("{} = {}", e.label, self.render_expr(&e.value)))
                        .collect::<Vec<_>>()
                        .join(", ");
                    text.push_str(&format!(" {{ {entries} }}"));
                }
                text
            }
            Expr::Lambda { params, body, .. } => {
                let body = self.render_expr(body);
                match params.len() {
                    1 => format!("{} => {body}", params[0]),
                    _ => format!("({}) => {body}", params.join(", ")),
                }
            }
            Expr::Binary { op, lhs, rhs, .. } => {
                format!(
                    "({} {} {})",
                    self.render_expr(lhs),
                    op.token(),
                    self.render_expr(rhs)
                )
            }
            Expr::Assign { target, value, .. } => {
                format!("{} = {}", self.render_expr(target), self.render_expr(value))
            }
            Expr::NameOf { operand, .. } => format!("nameof({})", self.render_expr(operand)),
        }
    }

    fn render_args(&self, args: &[Arg]) -> String {
        args.iter()
            .map(|arg| match &arg.label {
                Some(label) => format!("{label}: {}", self.render_expr(&arg.value)),
                None => self.render_expr(&arg.value),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn render_literal(&self, lit: &Literal) -> String {
        match lit {
            Literal::Int(v) => v.to_string(),
            Literal::Str(v) => format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")),
            Literal::Bool(v) => v.to_string(),
            Literal::Null => "null".to_string(),
        }
    }
}
