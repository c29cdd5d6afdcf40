use string_interner::{DefaultStringInterner, DefaultSymbol};

use crate::ast::{Expr, ExprRef, Item, MemberOp, Program, Stmt, StmtRef};

/// Indented AST dump for `--print-ast`. The debug variant additionally
/// shows pool indices, the pooled analog of printing node addresses.
pub struct AstPrinter<'a> {
    program: &'a Program,
    interner: &'a DefaultStringInterner,
    output: String,
    indent: usize,
    debug: bool,
}

impl<'a> AstPrinter<'a> {
    pub fn new(program: &'a Program, interner: &'a DefaultStringInterner) -> Self {
        AstPrinter {
            program,
            interner,
            output: String::new(),
            indent: 0,
            debug: false,
        }
    }

    pub fn debug(mut self) -> Self {
        self.debug = true;
        self
    }

    fn resolve(&self, sym: DefaultSymbol) -> &'a str {
        self.interner.resolve(sym).unwrap_or("<unknown>")
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.output.push_str("  ");
        }
        self.output.push_str(text);
        self.output.push('\n');
    }

    fn nested<F: FnOnce(&mut Self)>(&mut self, f: F) {
        self.indent += 1;
        f(self);
        self.indent -= 1;
    }

    fn stmt_tag(&self, label: String, stmt_ref: StmtRef) -> String {
        if self.debug {
            format!("{} [s{}]", label, stmt_ref.0)
        } else {
            label
        }
    }

    fn expr_tag(&self, label: String, expr_ref: ExprRef) -> String {
        if self.debug {
            format!("{} [e{}]", label, expr_ref.0)
        } else {
            label
        }
    }

    pub fn print(mut self) -> String {
        let program = self.program;
        self.line("Program");
        self.indent += 1;
        for item in &program.items {
            self.print_item(item);
        }
        self.output
    }

    fn print_item(&mut self, item: &'a Item) {
        match item {
            Item::Function(f) => {
                let name = self.resolve(f.name);
                let ret = f.return_type.display(self.interner);
                self.line(&format!("Function {} -> {}", name, ret));
                self.nested(|p| {
                    for (name, ty) in &f.parameter {
                        let name = name.map(|n| p.resolve(n)).unwrap_or("_");
                        let ty = ty.display(p.interner);
                        p.line(&format!("Parameter {}: {}", name, ty));
                    }
                    p.print_stmt(f.code);
                });
            }
            Item::Struct(s) => {
                let name = self.resolve(s.name);
                self.line(&format!("Struct {}", name));
                self.nested(|p| {
                    for field in &s.fields {
                        let name = p.resolve(field.name);
                        let ty = field.ty.display(p.interner);
                        p.line(&format!("Field {}: {}", name, ty));
                    }
                });
            }
            Item::Enum(e) => {
                let name = self.resolve(e.name);
                self.line(&format!("Enum {}", name));
                self.nested(|p| {
                    for (variant, value) in &e.variants {
                        let name = p.resolve(*variant);
                        p.line(&format!("EnumValue {}", name));
                        if let Some(value) = value {
                            p.nested(|p| p.print_expr(*value));
                        }
                    }
                });
            }
            Item::Union(u) => {
                let name = self.resolve(u.name);
                self.line(&format!("Union {}", name));
                self.nested(|p| {
                    for field in &u.fields {
                        let name = p.resolve(field.name);
                        let ty = field.ty.display(p.interner);
                        p.line(&format!("Field {}: {}", name, ty));
                    }
                });
            }
            Item::Module(name) => {
                let name = self.resolve(*name);
                self.line(&format!("Module {}", name));
            }
            Item::Import(import) => {
                let name = self.resolve(import.module);
                self.line(&format!("Import {}", name));
            }
            Item::Export(inner) => {
                self.line("Export");
                self.nested(|p| p.print_item(inner));
            }
            Item::Statement(stmt) => self.print_stmt(*stmt),
        }
    }

    fn print_stmt(&mut self, stmt_ref: StmtRef) {
        let Some(stmt) = self.program.statement.get(stmt_ref.to_index()) else {
            self.line("<missing statement>");
            return;
        };

        match stmt {
            Stmt::Expression(expr) => {
                let label = self.stmt_tag("ExpressionStatement".to_string(), stmt_ref);
                self.line(&label);
                let expr = *expr;
                self.nested(|p| p.print_expr(expr));
            }
            Stmt::VarDecl { name, ty, init } => {
                let name = self.resolve(*name);
                let ty = ty.display(self.interner);
                let label = self.stmt_tag(format!("VariableDeclaration {}: {}", name, ty), stmt_ref);
                self.line(&label);
                if let Some(init) = *init {
                    self.nested(|p| p.print_expr(init));
                }
            }
            Stmt::Block(statements) => {
                let label = self.stmt_tag("Block".to_string(), stmt_ref);
                self.line(&label);
                self.nested(|p| {
                    for stmt in statements {
                        p.print_stmt(*stmt);
                    }
                });
            }
            Stmt::If(cond, then_stmt, else_stmt) => {
                let label = self.stmt_tag("If".to_string(), stmt_ref);
                self.line(&label);
                let (cond, then_stmt, else_stmt) = (*cond, *then_stmt, *else_stmt);
                self.nested(|p| {
                    p.print_expr(cond);
                    p.print_stmt(then_stmt);
                    if let Some(else_stmt) = else_stmt {
                        p.print_stmt(else_stmt);
                    }
                });
            }
            Stmt::While(cond, body) => {
                let label = self.stmt_tag("While".to_string(), stmt_ref);
                self.line(&label);
                let (cond, body) = (*cond, *body);
                self.nested(|p| {
                    p.print_expr(cond);
                    p.print_stmt(body);
                });
            }
            Stmt::For { init, cond, step, body } => {
                let label = self.stmt_tag("For".to_string(), stmt_ref);
                self.line(&label);
                let (init, cond, step, body) = (*init, *cond, *step, *body);
                self.nested(|p| {
                    match init {
                        Some(init) => p.print_stmt(init),
                        None => p.line("<no init>"),
                    }
                    match cond {
                        Some(cond) => p.print_expr(cond),
                        None => p.line("<no condition>"),
                    }
                    match step {
                        Some(step) => p.print_expr(step),
                        None => p.line("<no step>"),
                    }
                    p.print_stmt(body);
                });
            }
            Stmt::DoWhile(body, cond) => {
                let label = self.stmt_tag("DoWhile".to_string(), stmt_ref);
                self.line(&label);
                let (body, cond) = (*body, *cond);
                self.nested(|p| {
                    p.print_stmt(body);
                    p.print_expr(cond);
                });
            }
            Stmt::Switch(scrutinee, arms) => {
                let label = self.stmt_tag("Switch".to_string(), stmt_ref);
                self.line(&label);
                let scrutinee = *scrutinee;
                self.nested(|p| {
                    p.print_expr(scrutinee);
                    for arm in arms {
                        p.print_stmt(*arm);
                    }
                });
            }
            Stmt::Case(value, body) => {
                let label = self.stmt_tag("Case".to_string(), stmt_ref);
                self.line(&label);
                let value = *value;
                self.nested(|p| {
                    p.print_expr(value);
                    for stmt in body {
                        p.print_stmt(*stmt);
                    }
                });
            }
            Stmt::Default(body) => {
                let label = self.stmt_tag("Default".to_string(), stmt_ref);
                self.line(&label);
                self.nested(|p| {
                    for stmt in body {
                        p.print_stmt(*stmt);
                    }
                });
            }
            Stmt::Return(expr) => {
                let label = self.stmt_tag("Return".to_string(), stmt_ref);
                self.line(&label);
                if let Some(expr) = *expr {
                    self.nested(|p| p.print_expr(expr));
                }
            }
            Stmt::Break => {
                let label = self.stmt_tag("Break".to_string(), stmt_ref);
                self.line(&label);
            }
            Stmt::Continue => {
                let label = self.stmt_tag("Continue".to_string(), stmt_ref);
                self.line(&label);
            }
        }
    }

    fn print_expr(&mut self, expr_ref: ExprRef) {
        let Some(expr) = self.program.expression.get(expr_ref.to_index()) else {
            self.line("<missing expression>");
            return;
        };

        match expr {
            Expr::Binary(op, lhs, rhs) => {
                let label = self.expr_tag(format!("BinaryOp '{}'", op.lexeme()), expr_ref);
                self.line(&label);
                let (lhs, rhs) = (*lhs, *rhs);
                self.nested(|p| {
                    p.print_expr(lhs);
                    p.print_expr(rhs);
                });
            }
            Expr::Unary(op, operand) => {
                let label = self.expr_tag(format!("UnaryOp {:?}", op), expr_ref);
                self.line(&label);
                let operand = *operand;
                self.nested(|p| p.print_expr(operand));
            }
            Expr::Postfix(op, operand) => {
                let label = self.expr_tag(format!("PostfixOp {:?}", op), expr_ref);
                self.line(&label);
                let operand = *operand;
                self.nested(|p| p.print_expr(operand));
            }
            Expr::Assign(op, lhs, rhs) => {
                let label = self.expr_tag(format!("Assignment '{}'", op.lexeme()), expr_ref);
                self.line(&label);
                let (lhs, rhs) = (*lhs, *rhs);
                self.nested(|p| {
                    p.print_expr(lhs);
                    p.print_expr(rhs);
                });
            }
            Expr::Ternary(cond, then_expr, else_expr) => {
                let label = self.expr_tag("Ternary".to_string(), expr_ref);
                self.line(&label);
                let (cond, then_expr, else_expr) = (*cond, *then_expr, *else_expr);
                self.nested(|p| {
                    p.print_expr(cond);
                    p.print_expr(then_expr);
                    p.print_expr(else_expr);
                });
            }
            Expr::Call(name, args) => {
                let name = self.resolve(*name);
                let label = self.expr_tag(format!("FunctionCall {}", name), expr_ref);
                self.line(&label);
                self.nested(|p| {
                    for arg in args {
                        p.print_expr(*arg);
                    }
                });
            }
            Expr::ArrayAccess(array, index) => {
                let label = self.expr_tag("ArrayAccess".to_string(), expr_ref);
                self.line(&label);
                let (array, index) = (*array, *index);
                self.nested(|p| {
                    p.print_expr(array);
                    p.print_expr(index);
                });
            }
            Expr::MemberAccess(object, member, op) => {
                let member = self.resolve(*member);
                let op = match op {
                    MemberOp::Dot => ".",
                    MemberOp::Arrow => "->",
                };
                let label = self.expr_tag(format!("MemberAccess '{}' {}", op, member), expr_ref);
                self.line(&label);
                let object = *object;
                self.nested(|p| p.print_expr(object));
            }
            Expr::SizeOf(operand) => {
                let label = self.expr_tag("SizeOf".to_string(), expr_ref);
                self.line(&label);
                let operand = *operand;
                self.nested(|p| p.print_expr(operand));
            }
            Expr::Number(value) => {
                let label = self.expr_tag(format!("Number {}", value), expr_ref);
                self.line(&label);
            }
            Expr::Float(value) => {
                let label = self.expr_tag(format!("Float {}", value), expr_ref);
                self.line(&label);
            }
            Expr::StringLit(value) => {
                let value = self.resolve(*value);
                let label = self.expr_tag(format!("String \"{}\"", value), expr_ref);
                self.line(&label);
            }
            Expr::CharLit(value) => {
                let label = self.expr_tag(format!("Char {}", value), expr_ref);
                self.line(&label);
            }
            Expr::Bool(value) => {
                let label = self.expr_tag(format!("Bool {}", value), expr_ref);
                self.line(&label);
            }
            Expr::Null => {
                let label = self.expr_tag("Null".to_string(), expr_ref);
                self.line(&label);
            }
            Expr::Identifier(name) => {
                let name = self.resolve(*name);
                let label = self.expr_tag(format!("Identifier {}", name), expr_ref);
                self.line(&label);
            }
        }
    }
}
