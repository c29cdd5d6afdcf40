use std::rc::Rc;

use string_interner::DefaultSymbol;

use crate::type_decl::TypeDecl;

/// Start/end byte offsets of a construct in its source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub start: usize,
    pub end: usize,
}

impl Node {
    pub fn new(start: usize, end: usize) -> Self {
        Node { start, end }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprRef(pub u32);

impl ExprRef {
    pub fn to_index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StmtRef(pub u32);

impl StmtRef {
    pub fn to_index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    EQ,
    NE,
    LT,
    GT,
    LE,
    GE,
    LogicalAnd,
    LogicalOr,
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
}

impl BinOp {
    pub fn lexeme(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::EQ => "==",
            BinOp::NE => "!=",
            BinOp::LT => "<",
            BinOp::GT => ">",
            BinOp::LE => "<=",
            BinOp::GE => ">=",
            BinOp::LogicalAnd => "&&",
            BinOp::LogicalOr => "||",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::ShiftLeft => "<<",
            BinOp::ShiftRight => ">>",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    LogicalNot,
    BitNot,
    Deref,
    AddrOf,
    PreIncrement,
    PreDecrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostfixOp {
    Increment,
    Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl AssignOp {
    pub fn lexeme(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Mod => "%=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberOp {
    Dot,
    Arrow,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Binary(BinOp, ExprRef, ExprRef),
    Unary(UnaryOp, ExprRef),
    Postfix(PostfixOp, ExprRef),
    Assign(AssignOp, ExprRef, ExprRef),
    Ternary(ExprRef, ExprRef, ExprRef),
    Call(DefaultSymbol, Vec<ExprRef>),
    ArrayAccess(ExprRef, ExprRef),
    MemberAccess(ExprRef, DefaultSymbol, MemberOp),
    SizeOf(ExprRef),
    Number(i64),
    Float(f64),
    StringLit(DefaultSymbol),
    CharLit(u8),
    Bool(bool),
    Null,
    Identifier(DefaultSymbol),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expression(ExprRef),
    VarDecl {
        name: DefaultSymbol,
        ty: TypeDecl,
        init: Option<ExprRef>,
    },
    Block(Vec<StmtRef>),
    If(ExprRef, StmtRef, Option<StmtRef>),
    While(ExprRef, StmtRef),
    For {
        init: Option<StmtRef>,
        cond: Option<ExprRef>,
        step: Option<ExprRef>,
        body: StmtRef,
    },
    DoWhile(StmtRef, ExprRef),
    /// Arms are `Case`/`Default` statements in source order.
    Switch(ExprRef, Vec<StmtRef>),
    Case(ExprRef, Vec<StmtRef>),
    Default(Vec<StmtRef>),
    Return(Option<ExprRef>),
    Break,
    Continue,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExprPool(pub Vec<Expr>);

impl ExprPool {
    pub fn new() -> Self {
        ExprPool(Vec::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        ExprPool(Vec::with_capacity(capacity))
    }

    pub fn add(&mut self, expr: Expr) -> ExprRef {
        self.0.push(expr);
        ExprRef((self.0.len() - 1) as u32)
    }

    pub fn get(&self, index: usize) -> Option<&Expr> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Structural copy of a subtree; children are cloned into fresh pool
    /// slots. Kept for tooling that wants to duplicate expressions without
    /// aliasing them.
    pub fn deep_copy(&mut self, expr_ref: ExprRef) -> ExprRef {
        let expr = self.0[expr_ref.to_index()].clone();
        let copied = match expr {
            Expr::Binary(op, lhs, rhs) => {
                let lhs = self.deep_copy(lhs);
                let rhs = self.deep_copy(rhs);
                Expr::Binary(op, lhs, rhs)
            }
            Expr::Unary(op, operand) => {
                let operand = self.deep_copy(operand);
                Expr::Unary(op, operand)
            }
            Expr::Postfix(op, operand) => {
                let operand = self.deep_copy(operand);
                Expr::Postfix(op, operand)
            }
            Expr::Assign(op, lhs, rhs) => {
                let lhs = self.deep_copy(lhs);
                let rhs = self.deep_copy(rhs);
                Expr::Assign(op, lhs, rhs)
            }
            Expr::Ternary(cond, then_expr, else_expr) => {
                let cond = self.deep_copy(cond);
                let then_expr = self.deep_copy(then_expr);
                let else_expr = self.deep_copy(else_expr);
                Expr::Ternary(cond, then_expr, else_expr)
            }
            Expr::Call(name, args) => {
                let args = args.into_iter().map(|a| self.deep_copy(a)).collect();
                Expr::Call(name, args)
            }
            Expr::ArrayAccess(array, index) => {
                let array = self.deep_copy(array);
                let index = self.deep_copy(index);
                Expr::ArrayAccess(array, index)
            }
            Expr::MemberAccess(object, member, op) => {
                let object = self.deep_copy(object);
                Expr::MemberAccess(object, member, op)
            }
            Expr::SizeOf(operand) => {
                let operand = self.deep_copy(operand);
                Expr::SizeOf(operand)
            }
            leaf => leaf,
        };
        self.add(copied)
    }

    /// Structural equality of two subtrees, ref indirection ignored.
    pub fn structurally_equal(&self, a: ExprRef, b: ExprRef) -> bool {
        match (&self.0[a.to_index()], &self.0[b.to_index()]) {
            (Expr::Binary(op1, l1, r1), Expr::Binary(op2, l2, r2)) => {
                op1 == op2 && self.structurally_equal(*l1, *l2) && self.structurally_equal(*r1, *r2)
            }
            (Expr::Unary(op1, e1), Expr::Unary(op2, e2)) => op1 == op2 && self.structurally_equal(*e1, *e2),
            (Expr::Postfix(op1, e1), Expr::Postfix(op2, e2)) => op1 == op2 && self.structurally_equal(*e1, *e2),
            (Expr::Assign(op1, l1, r1), Expr::Assign(op2, l2, r2)) => {
                op1 == op2 && self.structurally_equal(*l1, *l2) && self.structurally_equal(*r1, *r2)
            }
            (Expr::Ternary(c1, t1, e1), Expr::Ternary(c2, t2, e2)) => {
                self.structurally_equal(*c1, *c2)
                    && self.structurally_equal(*t1, *t2)
                    && self.structurally_equal(*e1, *e2)
            }
            (Expr::Call(n1, a1), Expr::Call(n2, a2)) => {
                n1 == n2
                    && a1.len() == a2.len()
                    && a1.iter().zip(a2.iter()).all(|(x, y)| self.structurally_equal(*x, *y))
            }
            (Expr::ArrayAccess(a1, i1), Expr::ArrayAccess(a2, i2)) => {
                self.structurally_equal(*a1, *a2) && self.structurally_equal(*i1, *i2)
            }
            (Expr::MemberAccess(o1, m1, op1), Expr::MemberAccess(o2, m2, op2)) => {
                m1 == m2 && op1 == op2 && self.structurally_equal(*o1, *o2)
            }
            (Expr::SizeOf(e1), Expr::SizeOf(e2)) => self.structurally_equal(*e1, *e2),
            (lhs, rhs) => lhs == rhs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StmtPool(pub Vec<Stmt>);

impl StmtPool {
    pub fn new() -> Self {
        StmtPool(Vec::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        StmtPool(Vec::with_capacity(capacity))
    }

    pub fn add(&mut self, stmt: Stmt) -> StmtRef {
        self.0.push(stmt);
        StmtRef((self.0.len() - 1) as u32)
    }

    pub fn get(&self, index: usize) -> Option<&Stmt> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Per-node source locations, parallel to the expression and statement
/// pools. Entries are filled on a best-effort basis during parsing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LocationPool {
    pub expr_locations: Vec<Option<SourceLocation>>,
    pub stmt_locations: Vec<Option<SourceLocation>>,
}

impl LocationPool {
    pub fn new() -> Self {
        LocationPool::default()
    }

    pub fn expr_location(&self, expr_ref: ExprRef) -> Option<SourceLocation> {
        self.expr_locations.get(expr_ref.to_index()).copied().flatten()
    }

    pub fn stmt_location(&self, stmt_ref: StmtRef) -> Option<SourceLocation> {
        self.stmt_locations.get(stmt_ref.to_index()).copied().flatten()
    }
}

pub type Parameter = (Option<DefaultSymbol>, TypeDecl);

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub node: Node,
    pub name: DefaultSymbol,
    pub parameter: Vec<Parameter>,
    pub return_type: TypeDecl,
    pub code: StmtRef,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: DefaultSymbol,
    pub ty: TypeDecl,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDecl {
    pub name: DefaultSymbol,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    pub name: DefaultSymbol,
    pub variants: Vec<(DefaultSymbol, Option<ExprRef>)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionDecl {
    pub name: DefaultSymbol,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub module: DefaultSymbol,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Function(Rc<Function>),
    Struct(StructDecl),
    Enum(EnumDecl),
    Union(UnionDecl),
    Module(DefaultSymbol),
    Import(ImportDecl),
    Export(Box<Item>),
    Statement(StmtRef),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub node: Node,
    pub items: Vec<Item>,
    pub statement: StmtPool,
    pub expression: ExprPool,
    pub locations: LocationPool,
}

impl Program {
    pub fn functions(&self) -> impl Iterator<Item = &Rc<Function>> {
        self.items.iter().filter_map(|item| match item {
            Item::Function(f) => Some(f),
            Item::Export(inner) => match inner.as_ref() {
                Item::Function(f) => Some(f),
                _ => None,
            },
            _ => None,
        })
    }

    pub fn imports(&self) -> impl Iterator<Item = &ImportDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::Import(import) => Some(import),
            _ => None,
        })
    }

    pub fn find_function(&self, name: DefaultSymbol) -> Option<&Rc<Function>> {
        self.functions().find(|f| f.name == name)
    }
}

/// Owns the pools while the parser runs; one constructor per node shape so
/// arities are fixed at the call site.
#[derive(Debug, Default)]
pub struct AstBuilder {
    expr: ExprPool,
    stmt: StmtPool,
    locations: LocationPool,
}

impl AstBuilder {
    pub fn new() -> Self {
        AstBuilder::default()
    }

    pub fn with_capacity(expr_capacity: usize, stmt_capacity: usize) -> Self {
        AstBuilder {
            expr: ExprPool::with_capacity(expr_capacity),
            stmt: StmtPool::with_capacity(stmt_capacity),
            locations: LocationPool::new(),
        }
    }

    pub fn expr_pool(&self) -> &ExprPool {
        &self.expr
    }

    pub fn stmt_pool(&self) -> &StmtPool {
        &self.stmt
    }

    pub fn extract_pools(self) -> (ExprPool, StmtPool, LocationPool) {
        (self.expr, self.stmt, self.locations)
    }

    fn add_expr(&mut self, expr: Expr, location: Option<SourceLocation>) -> ExprRef {
        self.locations.expr_locations.push(location);
        self.expr.add(expr)
    }

    fn add_stmt(&mut self, stmt: Stmt, location: Option<SourceLocation>) -> StmtRef {
        self.locations.stmt_locations.push(location);
        self.stmt.add(stmt)
    }

    pub fn binary_expr(&mut self, op: BinOp, lhs: ExprRef, rhs: ExprRef, location: Option<SourceLocation>) -> ExprRef {
        self.add_expr(Expr::Binary(op, lhs, rhs), location)
    }

    pub fn unary_expr(&mut self, op: UnaryOp, operand: ExprRef, location: Option<SourceLocation>) -> ExprRef {
        self.add_expr(Expr::Unary(op, operand), location)
    }

    pub fn postfix_expr(&mut self, op: PostfixOp, operand: ExprRef, location: Option<SourceLocation>) -> ExprRef {
        self.add_expr(Expr::Postfix(op, operand), location)
    }

    pub fn assign_expr(
        &mut self,
        op: AssignOp,
        lhs: ExprRef,
        rhs: ExprRef,
        location: Option<SourceLocation>,
    ) -> ExprRef {
        self.add_expr(Expr::Assign(op, lhs, rhs), location)
    }

    pub fn ternary_expr(
        &mut self,
        cond: ExprRef,
        then_expr: ExprRef,
        else_expr: ExprRef,
        location: Option<SourceLocation>,
    ) -> ExprRef {
        self.add_expr(Expr::Ternary(cond, then_expr, else_expr), location)
    }

    pub fn call_expr(&mut self, name: DefaultSymbol, args: Vec<ExprRef>, location: Option<SourceLocation>) -> ExprRef {
        self.add_expr(Expr::Call(name, args), location)
    }

    pub fn array_access_expr(&mut self, array: ExprRef, index: ExprRef, location: Option<SourceLocation>) -> ExprRef {
        self.add_expr(Expr::ArrayAccess(array, index), location)
    }

    pub fn member_access_expr(
        &mut self,
        object: ExprRef,
        member: DefaultSymbol,
        op: MemberOp,
        location: Option<SourceLocation>,
    ) -> ExprRef {
        self.add_expr(Expr::MemberAccess(object, member, op), location)
    }

    pub fn sizeof_expr(&mut self, operand: ExprRef, location: Option<SourceLocation>) -> ExprRef {
        self.add_expr(Expr::SizeOf(operand), location)
    }

    pub fn number_expr(&mut self, value: i64, location: Option<SourceLocation>) -> ExprRef {
        self.add_expr(Expr::Number(value), location)
    }

    pub fn float_expr(&mut self, value: f64, location: Option<SourceLocation>) -> ExprRef {
        self.add_expr(Expr::Float(value), location)
    }

    pub fn string_expr(&mut self, value: DefaultSymbol, location: Option<SourceLocation>) -> ExprRef {
        self.add_expr(Expr::StringLit(value), location)
    }

    pub fn char_expr(&mut self, value: u8, location: Option<SourceLocation>) -> ExprRef {
        self.add_expr(Expr::CharLit(value), location)
    }

    pub fn bool_expr(&mut self, value: bool, location: Option<SourceLocation>) -> ExprRef {
        self.add_expr(Expr::Bool(value), location)
    }

    pub fn null_expr(&mut self, location: Option<SourceLocation>) -> ExprRef {
        self.add_expr(Expr::Null, location)
    }

    pub fn identifier_expr(&mut self, name: DefaultSymbol, location: Option<SourceLocation>) -> ExprRef {
        self.add_expr(Expr::Identifier(name), location)
    }

    pub fn expression_stmt(&mut self, expr: ExprRef, location: Option<SourceLocation>) -> StmtRef {
        self.add_stmt(Stmt::Expression(expr), location)
    }

    pub fn var_decl_stmt(
        &mut self,
        name: DefaultSymbol,
        ty: TypeDecl,
        init: Option<ExprRef>,
        location: Option<SourceLocation>,
    ) -> StmtRef {
        self.add_stmt(Stmt::VarDecl { name, ty, init }, location)
    }

    pub fn block_stmt(&mut self, statements: Vec<StmtRef>, location: Option<SourceLocation>) -> StmtRef {
        self.add_stmt(Stmt::Block(statements), location)
    }

    pub fn if_stmt(
        &mut self,
        cond: ExprRef,
        then_stmt: StmtRef,
        else_stmt: Option<StmtRef>,
        location: Option<SourceLocation>,
    ) -> StmtRef {
        self.add_stmt(Stmt::If(cond, then_stmt, else_stmt), location)
    }

    pub fn while_stmt(&mut self, cond: ExprRef, body: StmtRef, location: Option<SourceLocation>) -> StmtRef {
        self.add_stmt(Stmt::While(cond, body), location)
    }

    pub fn for_stmt(
        &mut self,
        init: Option<StmtRef>,
        cond: Option<ExprRef>,
        step: Option<ExprRef>,
        body: StmtRef,
        location: Option<SourceLocation>,
    ) -> StmtRef {
        self.add_stmt(Stmt::For { init, cond, step, body }, location)
    }

    pub fn do_while_stmt(&mut self, body: StmtRef, cond: ExprRef, location: Option<SourceLocation>) -> StmtRef {
        self.add_stmt(Stmt::DoWhile(body, cond), location)
    }

    pub fn switch_stmt(&mut self, scrutinee: ExprRef, arms: Vec<StmtRef>, location: Option<SourceLocation>) -> StmtRef {
        self.add_stmt(Stmt::Switch(scrutinee, arms), location)
    }

    pub fn case_stmt(&mut self, value: ExprRef, body: Vec<StmtRef>, location: Option<SourceLocation>) -> StmtRef {
        self.add_stmt(Stmt::Case(value, body), location)
    }

    pub fn default_stmt(&mut self, body: Vec<StmtRef>, location: Option<SourceLocation>) -> StmtRef {
        self.add_stmt(Stmt::Default(body), location)
    }

    pub fn return_stmt(&mut self, expr: Option<ExprRef>, location: Option<SourceLocation>) -> StmtRef {
        self.add_stmt(Stmt::Return(expr), location)
    }

    pub fn break_stmt(&mut self, location: Option<SourceLocation>) -> StmtRef {
        self.add_stmt(Stmt::Break, location)
    }

    pub fn continue_stmt(&mut self, location: Option<SourceLocation>) -> StmtRef {
        self.add_stmt(Stmt::Continue, location)
    }
}
