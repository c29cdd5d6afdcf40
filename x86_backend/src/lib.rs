//! Lowers the parsed AST to GNU-syntax x86_64 assembly.
//!
//! The emitter is a stack machine over the native stack: every expression
//! leaves its value in `%rax`, binary operators push the left operand and
//! combine through `%rbx`. Locals live in the frame at negative offsets
//! from `%rbp`, parameters at positive ones.

use std::collections::HashMap;
use std::fmt::Write;

use string_interner::{DefaultStringInterner, DefaultSymbol};

use frontend::ast::{
    AssignOp, BinOp, Expr, ExprRef, Item, MemberOp, PostfixOp, Program, Stmt, StmtRef, UnaryOp,
};
use frontend::type_decl::TypeDecl;

const MAX_TRACKED_ERRORS: usize = 16;
/// Every function reserves one fixed-size frame instead of measuring its
/// locals.
const FRAME_RESERVE: i32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetArch {
    X86_64,
    Arm64,
    Riscv64,
}

impl TargetArch {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "x86_64" => Some(TargetArch::X86_64),
            "arm64" => Some(TargetArch::Arm64),
            "riscv64" => Some(TargetArch::Riscv64),
            _ => None,
        }
    }
}

impl std::fmt::Display for TargetArch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetArch::X86_64 => write!(f, "x86_64"),
            TargetArch::Arm64 => write!(f, "arm64"),
            TargetArch::Riscv64 => write!(f, "riscv64"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptLevel {
    None,
    Speed,
    Size,
    Debug,
}

impl std::fmt::Display for OptLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptLevel::None => write!(f, "none"),
            OptLevel::Speed => write!(f, "speed"),
            OptLevel::Size => write!(f, "size"),
            OptLevel::Debug => write!(f, "debug"),
        }
    }
}

#[derive(Debug)]
pub enum CodeGenError {
    UnsupportedTarget(TargetArch),
    ErrorsReported(usize),
    Fmt(std::fmt::Error),
}

impl std::fmt::Display for CodeGenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodeGenError::UnsupportedTarget(arch) => {
                write!(f, "no emitter support for target architecture {}", arch)
            }
            CodeGenError::ErrorsReported(count) => write!(f, "{} code generation errors", count),
            CodeGenError::Fmt(e) => write!(f, "formatting failed: {}", e),
        }
    }
}

impl std::error::Error for CodeGenError {}

impl From<std::fmt::Error> for CodeGenError {
    fn from(e: std::fmt::Error) -> Self {
        CodeGenError::Fmt(e)
    }
}

type GenResult = Result<(), CodeGenError>;

#[derive(Debug, Clone)]
struct VariableInfo {
    name: String,
    ty: TypeDecl,
    stack_offset: i32,
    size: u32,
    is_parameter: bool,
    is_global: bool,
    scope_level: i32,
}

#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub name: String,
    pub return_type: TypeDecl,
    pub stack_size: i32,
    pub param_count: usize,
    pub is_main: bool,
}

#[derive(Debug, Default)]
struct SymbolTable {
    variables: Vec<VariableInfo>,
    functions: Vec<FunctionInfo>,
    current_stack_offset: i32,
    scope_level: i32,
}

impl SymbolTable {
    fn enter_scope(&mut self) {
        self.scope_level += 1;
    }

    /// Pops every variable declared at the closing scope level.
    fn exit_scope(&mut self) {
        while self
            .variables
            .last()
            .map(|v| v.scope_level == self.scope_level)
            .unwrap_or(false)
        {
            self.variables.pop();
        }
        self.scope_level -= 1;
    }

    fn add_local(&mut self, name: String, ty: TypeDecl) -> i32 {
        let size = ty.size_in_bytes();
        self.current_stack_offset -= size as i32;
        let offset = self.current_stack_offset;
        self.variables.push(VariableInfo {
            name,
            ty,
            stack_offset: offset,
            size,
            is_parameter: false,
            is_global: self.scope_level == 0,
            scope_level: self.scope_level,
        });
        offset
    }

    /// Parameters sit above the saved frame pointer and return address,
    /// one 8-byte slot each.
    fn add_parameter(&mut self, name: String, ty: TypeDecl, index: usize) -> i32 {
        let offset = 16 + (index as i32) * 8;
        let size = ty.size_in_bytes();
        self.variables.push(VariableInfo {
            name,
            ty,
            stack_offset: offset,
            size,
            is_parameter: true,
            is_global: false,
            scope_level: self.scope_level,
        });
        offset
    }

    fn add_function(&mut self, name: String, return_type: TypeDecl, param_count: usize) {
        let is_main = name == "main";
        self.functions.push(FunctionInfo {
            name,
            return_type,
            stack_size: 0,
            param_count,
            is_main,
        });
    }

    fn find_variable(&self, name: &str) -> Option<&VariableInfo> {
        self.variables.iter().rev().find(|v| v.name == name)
    }

    fn find_function(&self, name: &str) -> Option<&FunctionInfo> {
        self.functions.iter().find(|f| f.name == name)
    }
}

pub struct CodeGenerator<'a> {
    program: &'a Program,
    interner: &'a DefaultStringInterner,
    text: String,
    /// Deduplicated string literal table; entry N becomes `strN` in
    /// `.data`.
    strings: Vec<String>,
    symbols: SymbolTable,
    label_counters: HashMap<&'static str, u32>,
    in_function: bool,
    current_function: Option<String>,
    arch: TargetArch,
    #[allow(dead_code)]
    opt_level: OptLevel,
    debug_info: bool,
    errors: Vec<String>,
    break_labels: Vec<String>,
    continue_labels: Vec<String>,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(
        program: &'a Program,
        interner: &'a DefaultStringInterner,
        arch: TargetArch,
        opt_level: OptLevel,
        debug_info: bool,
    ) -> Self {
        CodeGenerator {
            program,
            interner,
            text: String::with_capacity(64 * 1024),
            strings: Vec::new(),
            symbols: SymbolTable::default(),
            label_counters: HashMap::new(),
            in_function: false,
            current_function: None,
            arch,
            opt_level,
            debug_info,
            errors: Vec::new(),
            break_labels: Vec::new(),
            continue_labels: Vec::new(),
        }
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn functions(&self) -> &[FunctionInfo] {
        &self.symbols.functions
    }

    fn resolve(&self, sym: DefaultSymbol) -> &'a str {
        self.interner.resolve(sym).unwrap_or("<unknown>")
    }

    fn record_error(&mut self, message: String) {
        if self.errors.len() >= MAX_TRACKED_ERRORS {
            return;
        }
        eprintln!("Code generation error: {}", message);
        self.errors.push(message);
    }

    fn instr(&mut self, mnemonic: &str, operands: &str) -> GenResult {
        if operands.is_empty() {
            writeln!(self.text, "    {}", mnemonic)?;
        } else {
            writeln!(self.text, "    {} {}", mnemonic, operands)?;
        }
        Ok(())
    }

    fn label(&mut self, label: &str) -> GenResult {
        writeln!(self.text, "{}:", label)?;
        Ok(())
    }

    fn comment(&mut self, text: &str) -> GenResult {
        if self.debug_info {
            writeln!(self.text, "    # {}", text)?;
        }
        Ok(())
    }

    fn new_label(&mut self, prefix: &'static str) -> String {
        let counter = self.label_counters.entry(prefix).or_insert(0);
        let label = format!("{}{}", prefix, counter);
        *counter += 1;
        label
    }

    fn intern_string(&mut self, value: &str) -> usize {
        if let Some(index) = self.strings.iter().position(|s| s == value) {
            return index;
        }
        self.strings.push(value.to_string());
        self.strings.len() - 1
    }

    /// Walk the whole program, then assemble the section layout around the
    /// emitted text. Recorded errors do not stop the walk; they fail the
    /// result at the end.
    pub fn generate(&mut self) -> Result<String, CodeGenError> {
        if self.arch != TargetArch::X86_64 {
            return Err(CodeGenError::UnsupportedTarget(self.arch));
        }

        let program = self.program;
        self.comment("Program start")?;
        for item in &program.items {
            self.gen_item(item)?;
        }

        let mut output = String::with_capacity(self.text.len() + 1024);
        output.push_str(".global _start\n");

        output.push_str(".section .data\n");
        for (i, s) in self.strings.iter().enumerate() {
            writeln!(output, "str{}: .ascii \"{}\"", i, s)?;
        }

        output.push_str(".section .text\n");
        output.push_str("_start:\n");
        output.push_str("    call main\n");
        output.push_str("    mov %rax, %rdi\n");
        output.push_str("    mov $60, %rax\n");
        output.push_str("    syscall\n");
        output.push_str(&self.text);

        if !self.errors.is_empty() {
            return Err(CodeGenError::ErrorsReported(self.errors.len()));
        }
        Ok(output)
    }

    fn gen_item(&mut self, item: &'a Item) -> GenResult {
        match item {
            Item::Function(f) => self.gen_function(f),
            Item::Statement(stmt) => self.gen_stmt(*stmt),
            // Exports compile to their wrapped declaration.
            Item::Export(inner) => self.gen_item(inner),
            Item::Struct(_) | Item::Enum(_) | Item::Union(_) => {
                self.comment("type declaration carries no code")
            }
            Item::Module(_) | Item::Import(_) => self.comment("module directive"),
        }
    }

    fn gen_function(&mut self, f: &'a frontend::ast::Function) -> GenResult {
        let name = self.resolve(f.name).to_string();
        self.symbols.add_function(name.clone(), f.return_type.clone(), f.parameter.len());

        self.in_function = true;
        self.current_function = Some(name.clone());
        self.symbols.current_stack_offset = 0;
        self.symbols.enter_scope();

        self.label(&name)?;
        self.gen_prologue(FRAME_RESERVE)?;

        for (index, (param_name, param_ty)) in f.parameter.iter().enumerate() {
            let param_name = param_name.map(|n| self.resolve(n)).unwrap_or("unnamed").to_string();
            self.symbols.add_parameter(param_name, param_ty.clone(), index);
        }

        self.gen_stmt(f.code)?;

        // Fallthrough path for bodies without a trailing return.
        self.gen_epilogue()?;

        self.symbols.exit_scope();
        let stack_size = -self.symbols.current_stack_offset;
        if let Some(info) = self.symbols.functions.iter_mut().rev().find(|i| i.name == name) {
            info.stack_size = stack_size;
        }
        self.in_function = false;
        self.current_function = None;
        Ok(())
    }

    fn gen_prologue(&mut self, stack_size: i32) -> GenResult {
        self.instr("push", "%rbp")?;
        self.instr("mov", "%rsp, %rbp")?;
        if stack_size > 0 {
            self.instr("sub", &format!("${}, %rsp", stack_size))?;
        }
        Ok(())
    }

    fn gen_epilogue(&mut self) -> GenResult {
        self.instr("mov", "%rbp, %rsp")?;
        self.instr("pop", "%rbp")?;
        self.instr("ret", "")?;
        Ok(())
    }

    fn variable_offset(&self, name: &str) -> Option<i32> {
        self.symbols.find_variable(name).map(|v| v.stack_offset)
    }

    fn gen_stmt(&mut self, stmt_ref: StmtRef) -> GenResult {
        let program = self.program;
        let Some(stmt) = program.statement.get(stmt_ref.to_index()) else {
            self.record_error(format!("missing statement {}", stmt_ref.0));
            return Ok(());
        };

        if self.debug_info {
            let tag = stmt_name(stmt);
            self.comment(&format!("Node: {}", tag))?;
        }

        match stmt {
            Stmt::Expression(expr) => self.gen_expr(*expr),
            Stmt::VarDecl { name, ty, init } => self.gen_var_decl(*name, ty, *init),
            Stmt::Block(statements) => {
                self.symbols.enter_scope();
                for stmt in statements {
                    self.gen_stmt(*stmt)?;
                }
                self.symbols.exit_scope();
                Ok(())
            }
            Stmt::If(cond, then_stmt, else_stmt) => self.gen_if(*cond, *then_stmt, *else_stmt),
            Stmt::While(cond, body) => self.gen_while(*cond, *body),
            Stmt::For { init, cond, step, body } => self.gen_for(*init, *cond, *step, *body),
            Stmt::DoWhile(body, cond) => self.gen_do_while(*body, *cond),
            Stmt::Switch(scrutinee, arms) => self.gen_switch(*scrutinee, arms),
            Stmt::Return(expr) => {
                match expr {
                    Some(expr) => self.gen_expr(*expr)?,
                    None => self.instr("mov", "$0, %rax")?,
                }
                self.gen_epilogue()
            }
            Stmt::Break => {
                match self.break_labels.last().cloned() {
                    Some(label) => self.instr("jmp", &label),
                    None => {
                        self.record_error("break outside of loop or switch".to_string());
                        Ok(())
                    }
                }
            }
            Stmt::Continue => {
                match self.continue_labels.last().cloned() {
                    Some(label) => self.instr("jmp", &label),
                    None => {
                        self.record_error("continue outside of loop".to_string());
                        Ok(())
                    }
                }
            }
            Stmt::Case(_, _) | Stmt::Default(_) => {
                // Only meaningful under a switch; the switch lowering
                // consumes them directly.
                self.comment("stray case label")
            }
        }
    }

    fn gen_var_decl(&mut self, name: DefaultSymbol, ty: &TypeDecl, init: Option<ExprRef>) -> GenResult {
        let name = self.resolve(name).to_string();
        self.symbols.add_local(name.clone(), ty.clone());

        if let Some(init) = init {
            self.gen_expr(init)?;
            if self.in_function {
                if let Some(offset) = self.variable_offset(&name) {
                    self.instr("mov", &format!("%rax, {}(%rbp)", offset))?;
                }
            }
        }
        Ok(())
    }

    fn gen_if(&mut self, cond: ExprRef, then_stmt: StmtRef, else_stmt: Option<StmtRef>) -> GenResult {
        let else_label = self.new_label("else_");
        let end_label = self.new_label("endif_");

        self.gen_expr(cond)?;
        self.instr("test", "%rax, %rax")?;
        self.instr("je", &else_label)?;

        self.gen_stmt(then_stmt)?;
        self.instr("jmp", &end_label)?;

        self.label(&else_label)?;
        if let Some(else_stmt) = else_stmt {
            self.gen_stmt(else_stmt)?;
        }

        self.label(&end_label)
    }

    fn gen_while(&mut self, cond: ExprRef, body: StmtRef) -> GenResult {
        let loop_label = self.new_label("loop_");
        let end_label = self.new_label("endloop_");

        self.label(&loop_label)?;
        self.gen_expr(cond)?;
        self.instr("test", "%rax, %rax")?;
        self.instr("je", &end_label)?;

        self.break_labels.push(end_label.clone());
        self.continue_labels.push(loop_label.clone());
        self.gen_stmt(body)?;
        self.continue_labels.pop();
        self.break_labels.pop();

        self.instr("jmp", &loop_label)?;
        self.label(&end_label)
    }

    fn gen_for(
        &mut self,
        init: Option<StmtRef>,
        cond: Option<ExprRef>,
        step: Option<ExprRef>,
        body: StmtRef,
    ) -> GenResult {
        let loop_label = self.new_label("for_loop_");
        let step_label = self.new_label("for_step_");
        let condition_label = self.new_label("for_condition_");
        let end_label = self.new_label("for_end_");

        if let Some(init) = init {
            self.gen_stmt(init)?;
        }
        self.instr("jmp", &condition_label)?;

        self.label(&loop_label)?;
        self.break_labels.push(end_label.clone());
        self.continue_labels.push(step_label.clone());
        self.gen_stmt(body)?;
        self.continue_labels.pop();
        self.break_labels.pop();

        self.label(&step_label)?;
        if let Some(step) = step {
            self.gen_expr(step)?;
        }

        self.label(&condition_label)?;
        match cond {
            Some(cond) => {
                self.gen_expr(cond)?;
                self.instr("test", "%rax, %rax")?;
                self.instr("jne", &loop_label)?;
            }
            None => {
                // for(;;) loops unconditionally
                self.instr("jmp", &loop_label)?;
            }
        }

        self.label(&end_label)
    }

    fn gen_do_while(&mut self, body: StmtRef, cond: ExprRef) -> GenResult {
        let body_label = self.new_label("loop_");
        let cond_label = self.new_label("loop_");
        let end_label = self.new_label("endloop_");

        self.label(&body_label)?;
        self.break_labels.push(end_label.clone());
        self.continue_labels.push(cond_label.clone());
        self.gen_stmt(body)?;
        self.continue_labels.pop();
        self.break_labels.pop();

        self.label(&cond_label)?;
        self.gen_expr(cond)?;
        self.instr("test", "%rax, %rax")?;
        self.instr("jne", &body_label)?;
        self.label(&end_label)
    }

    /// Two-pass switch: the comparison chain records one label per case,
    /// the bodies are then emitted under those same labels.
    fn gen_switch(&mut self, scrutinee: ExprRef, arms: &'a [StmtRef]) -> GenResult {
        let program = self.program;
        let end_label = self.new_label("switch_end_");
        let default_label = self.new_label("switch_default_");

        self.gen_expr(scrutinee)?;
        self.instr("push", "%rax")?;

        let mut case_labels = Vec::with_capacity(arms.len());
        let mut has_default = false;
        for arm in arms {
            match program.statement.get(arm.to_index()) {
                Some(Stmt::Case(value, _)) => {
                    let case_label = self.new_label("case_");
                    self.instr("mov", "(%rsp), %rax")?;
                    self.gen_expr(*value)?;
                    self.instr("mov", "%rax, %rbx")?;
                    self.instr("mov", "(%rsp), %rax")?;
                    self.instr("cmp", "%rbx, %rax")?;
                    self.instr("je", &case_label)?;
                    case_labels.push(Some(case_label));
                }
                Some(Stmt::Default(_)) => {
                    has_default = true;
                    case_labels.push(None);
                }
                other => {
                    self.record_error(format!("unexpected switch arm: {:?}", other));
                    case_labels.push(None);
                }
            }
        }

        if has_default {
            self.instr("jmp", &default_label)?;
        } else {
            self.instr("jmp", &end_label)?;
        }

        self.break_labels.push(end_label.clone());
        for (arm, case_label) in arms.iter().zip(case_labels) {
            match program.statement.get(arm.to_index()) {
                Some(Stmt::Case(_, body)) => {
                    if let Some(case_label) = case_label {
                        self.label(&case_label)?;
                    }
                    for stmt in body {
                        self.gen_stmt(*stmt)?;
                    }
                }
                Some(Stmt::Default(body)) => {
                    self.label(&default_label)?;
                    for stmt in body {
                        self.gen_stmt(*stmt)?;
                    }
                }
                _ => {}
            }
        }
        self.break_labels.pop();

        self.label(&end_label)?;
        self.instr("add", "$8, %rsp")
    }

    fn gen_expr(&mut self, expr_ref: ExprRef) -> GenResult {
        let program = self.program;
        let Some(expr) = program.expression.get(expr_ref.to_index()) else {
            self.record_error(format!("missing expression {}", expr_ref.0));
            return Ok(());
        };

        match expr {
            Expr::Number(value) => self.instr("mov", &format!("${}, %rax", value)),
            // No FP lowering; float literals degrade to their integer part.
            Expr::Float(value) => self.instr("mov", &format!("${}, %rax", *value as i64)),
            Expr::StringLit(sym) => {
                let value = self.resolve(*sym).to_string();
                let index = self.intern_string(&value);
                self.instr("mov", &format!("$str{}, %rax", index))
            }
            Expr::CharLit(value) => self.instr("mov", &format!("${}, %rax", value)),
            Expr::Bool(value) => self.instr("mov", &format!("${}, %rax", *value as i32)),
            Expr::Null => self.instr("mov", "$0, %rax"),
            Expr::Identifier(sym) => {
                let name = self.resolve(*sym).to_string();
                if self.in_function {
                    if let Some(offset) = self.variable_offset(&name) {
                        return self.instr("mov", &format!("{}(%rbp), %rax", offset));
                    }
                }
                Ok(())
            }
            Expr::Binary(op, lhs, rhs) => self.gen_binary(*op, *lhs, *rhs),
            Expr::Unary(op, operand) => self.gen_unary(*op, *operand),
            Expr::Postfix(op, operand) => self.gen_postfix(*op, *operand),
            Expr::Assign(op, lhs, rhs) => self.gen_assignment(*op, *lhs, *rhs),
            Expr::Ternary(cond, then_expr, else_expr) => self.gen_ternary(*cond, *then_expr, *else_expr),
            Expr::Call(name, args) => {
                let name = self.resolve(*name).to_string();
                self.gen_call(&name, args)
            }
            Expr::ArrayAccess(array, index) => self.gen_array_access(*array, *index),
            Expr::MemberAccess(object, _, op) => self.gen_member_access(*object, *op),
            Expr::SizeOf(_) => self.comment("sizeof is not lowered"),
        }
    }

    fn gen_binary(&mut self, op: BinOp, lhs: ExprRef, rhs: ExprRef) -> GenResult {
        self.gen_expr(lhs)?;
        self.instr("push", "%rax")?;
        self.gen_expr(rhs)?;
        self.instr("mov", "%rax, %rbx")?;
        self.instr("pop", "%rax")?;

        match op {
            BinOp::Add => self.instr("add", "%rbx, %rax"),
            BinOp::Sub => self.instr("sub", "%rbx, %rax"),
            BinOp::Mul => self.instr("imul", "%rbx, %rax"),
            BinOp::Div => {
                self.instr("cqo", "")?;
                self.instr("idiv", "%rbx")
            }
            BinOp::Mod => {
                self.instr("cqo", "")?;
                self.instr("idiv", "%rbx")?;
                self.instr("mov", "%rdx, %rax")
            }
            BinOp::EQ => self.gen_comparison("sete"),
            BinOp::NE => self.gen_comparison("setne"),
            BinOp::LT => self.gen_comparison("setl"),
            BinOp::GT => self.gen_comparison("setg"),
            BinOp::LE => self.gen_comparison("setle"),
            BinOp::GE => self.gen_comparison("setge"),
            BinOp::BitAnd => self.instr("and", "%rbx, %rax"),
            BinOp::BitOr => self.instr("or", "%rbx, %rax"),
            BinOp::BitXor => self.instr("xor", "%rbx, %rax"),
            BinOp::ShiftLeft => {
                self.instr("mov", "%rbx, %rcx")?;
                self.instr("sal", "%cl, %rax")
            }
            BinOp::ShiftRight => {
                self.instr("mov", "%rbx, %rcx")?;
                self.instr("sar", "%cl, %rax")
            }
            BinOp::LogicalAnd => {
                // Normalize both sides to 0/1 before combining.
                self.instr("test", "%rax, %rax")?;
                self.instr("setne", "%al")?;
                self.instr("movzb", "%al, %rax")?;
                self.instr("test", "%rbx, %rbx")?;
                self.instr("setne", "%bl")?;
                self.instr("movzb", "%bl, %rbx")?;
                self.instr("and", "%rbx, %rax")
            }
            BinOp::LogicalOr => {
                self.instr("or", "%rbx, %rax")?;
                self.instr("test", "%rax, %rax")?;
                self.instr("setne", "%al")?;
                self.instr("movzb", "%al, %rax")
            }
        }
    }

    fn gen_comparison(&mut self, set_instr: &str) -> GenResult {
        self.instr("cmp", "%rbx, %rax")?;
        self.instr(set_instr, "%al")?;
        self.instr("movzb", "%al, %rax")
    }

    fn gen_unary(&mut self, op: UnaryOp, operand: ExprRef) -> GenResult {
        let program = self.program;
        match op {
            UnaryOp::Neg => {
                self.gen_expr(operand)?;
                self.instr("neg", "%rax")
            }
            UnaryOp::Plus => self.gen_expr(operand),
            UnaryOp::LogicalNot => {
                self.gen_expr(operand)?;
                self.instr("test", "%rax, %rax")?;
                self.instr("sete", "%al")?;
                self.instr("movzb", "%al, %rax")
            }
            UnaryOp::BitNot => {
                self.gen_expr(operand)?;
                self.instr("not", "%rax")
            }
            UnaryOp::AddrOf => {
                if let Some(Expr::Identifier(sym)) = program.expression.get(operand.to_index()) {
                    let name = self.resolve(*sym).to_string();
                    if self.in_function {
                        if let Some(offset) = self.variable_offset(&name) {
                            self.instr("lea", &format!("${}, %rax", offset))?;
                            self.instr("add", "%rbp, %rax")?;
                        }
                    }
                    Ok(())
                } else {
                    self.comment("address-of a non-identifier")
                }
            }
            UnaryOp::Deref => {
                self.gen_expr(operand)?;
                self.instr("mov", "(%rax), %rax")
            }
            UnaryOp::PreIncrement => self.gen_increment(operand, "add", false),
            UnaryOp::PreDecrement => self.gen_increment(operand, "sub", false),
        }
    }

    fn gen_postfix(&mut self, op: PostfixOp, operand: ExprRef) -> GenResult {
        match op {
            PostfixOp::Increment => self.gen_increment(operand, "add", true),
            PostfixOp::Decrement => self.gen_increment(operand, "sub", true),
        }
    }

    /// Shared lowering for `++`/`--`. Postfix keeps the old value in
    /// `%rax`; prefix leaves the updated one.
    fn gen_increment(&mut self, operand: ExprRef, op: &str, postfix: bool) -> GenResult {
        let program = self.program;
        let Some(Expr::Identifier(sym)) = program.expression.get(operand.to_index()) else {
            return self.comment("increment of a non-identifier");
        };
        let name = self.resolve(*sym).to_string();
        let Some(offset) = self.variable_offset(&name) else {
            return Ok(());
        };
        if !self.in_function {
            return Ok(());
        }

        self.instr("mov", &format!("{}(%rbp), %rax", offset))?;
        if postfix {
            self.instr("mov", "%rax, %rbx")?;
            self.instr(op, "$1, %rbx")?;
            self.instr("mov", &format!("%rbx, {}(%rbp)", offset))
        } else {
            self.instr(op, "$1, %rax")?;
            self.instr("mov", &format!("%rax, {}(%rbp)", offset))
        }
    }

    fn gen_assignment(&mut self, op: AssignOp, lhs: ExprRef, rhs: ExprRef) -> GenResult {
        let program = self.program;

        self.gen_expr(rhs)?;

        match op {
            AssignOp::Assign => {}
            AssignOp::Add => self.gen_compound(lhs, |g| g.instr("add", "%rbx, %rax"))?,
            AssignOp::Sub => self.gen_compound(lhs, |g| g.instr("sub", "%rbx, %rax"))?,
            AssignOp::Mul => self.gen_compound(lhs, |g| g.instr("imul", "%rbx, %rax"))?,
            AssignOp::Div => self.gen_compound(lhs, |g| {
                g.instr("cqo", "")?;
                g.instr("idiv", "%rbx")
            })?,
            AssignOp::Mod => self.gen_compound(lhs, |g| {
                g.instr("cqo", "")?;
                g.instr("idiv", "%rbx")?;
                g.instr("mov", "%rdx, %rax")
            })?,
        }

        if let Some(Expr::Identifier(sym)) = program.expression.get(lhs.to_index()) {
            let name = self.resolve(*sym).to_string();
            if self.in_function {
                if let Some(offset) = self.variable_offset(&name) {
                    self.instr("mov", &format!("%rax, {}(%rbp)", offset))?;
                }
            }
        }
        Ok(())
    }

    /// RHS value is in `%rax` on entry; evaluates the target, restores the
    /// RHS into `%rbx` and applies `combine` with the target in `%rax`.
    fn gen_compound<F>(&mut self, lhs: ExprRef, combine: F) -> GenResult
    where
        F: FnOnce(&mut Self) -> GenResult,
    {
        self.instr("push", "%rax")?;
        self.gen_expr(lhs)?;
        self.instr("pop", "%rbx")?;
        combine(self)
    }

    fn gen_ternary(&mut self, cond: ExprRef, then_expr: ExprRef, else_expr: ExprRef) -> GenResult {
        let false_label = self.new_label("ternary_false_");
        let end_label = self.new_label("ternary_end_");

        self.gen_expr(cond)?;
        self.instr("test", "%rax, %rax")?;
        self.instr("je", &false_label)?;

        self.gen_expr(then_expr)?;
        self.instr("jmp", &end_label)?;

        self.label(&false_label)?;
        self.gen_expr(else_expr)?;

        self.label(&end_label)
    }

    fn gen_call(&mut self, name: &str, args: &'a [ExprRef]) -> GenResult {
        if name == "printf" {
            return self.gen_printf(args);
        }

        // Arguments go on the stack right to left, one 8-byte slot each.
        for arg in args.iter().rev() {
            self.gen_expr(*arg)?;
            self.instr("push", "%rax")?;
        }

        self.instr("call", name)?;

        if !args.is_empty() {
            self.instr("add", &format!("${}, %rsp", args.len() * 8))?;
        }
        Ok(())
    }

    /// Minimal stdout shim, not printf: a raw string is written via the
    /// `write` syscall, and `"%d"` with a literal argument writes the
    /// stringified value.
    fn gen_printf(&mut self, args: &'a [ExprRef]) -> GenResult {
        let program = self.program;
        if args.is_empty() {
            return Ok(());
        }

        if args.len() >= 2 {
            let format = program.expression.get(args[0].to_index());
            let is_int_format = matches!(
                format,
                Some(Expr::StringLit(sym)) if self.resolve(*sym) == "%d"
            );
            if !is_int_format {
                self.record_error("printf with arguments only supports the \"%d\" format".to_string());
                return Ok(());
            }

            self.gen_expr(args[1])?;

            let value = match program.expression.get(args[1].to_index()) {
                Some(Expr::Number(n)) => n.to_string(),
                Some(Expr::CharLit(c)) => (*c as i64).to_string(),
                Some(Expr::Bool(b)) => (*b as i64).to_string(),
                _ => {
                    self.record_error("printf %d only supports literal arguments".to_string());
                    "0".to_string()
                }
            };
            let index = self.intern_string(&value);
            self.instr("mov", &format!("$str{}, %rsi", index))?;
            self.instr("mov", &format!("${}, %rdx", value.len()))?;
        } else {
            self.gen_expr(args[0])?;
            self.instr("mov", "%rax, %rsi")?;

            if let Some(Expr::StringLit(sym)) = program.expression.get(args[0].to_index()) {
                let len = self.resolve(*sym).len();
                self.instr("mov", &format!("${}, %rdx", len))?;
            }
        }

        self.instr("mov", "$1, %rdi")?;
        self.instr("mov", "$1, %rax")?;
        self.instr("syscall", "")
    }

    fn gen_array_access(&mut self, array: ExprRef, index: ExprRef) -> GenResult {
        self.gen_expr(array)?;
        self.instr("push", "%rax")?;
        self.gen_expr(index)?;
        // Fixed 8-byte element stride.
        self.instr("imul", "$8, %rax")?;
        self.instr("pop", "%rbx")?;
        self.instr("add", "%rbx, %rax")?;
        self.instr("mov", "(%rax), %rax")
    }

    fn gen_member_access(&mut self, object: ExprRef, op: MemberOp) -> GenResult {
        self.gen_expr(object)?;
        match op {
            MemberOp::Dot => {
                // No struct layout engine; member offset is a placeholder.
                self.instr("add", "$0, %rax")
            }
            MemberOp::Arrow => {
                self.instr("mov", "(%rax), %rax")?;
                self.instr("add", "$0, %rax")
            }
        }
    }
}

fn stmt_name(stmt: &Stmt) -> &'static str {
    match stmt {
        Stmt::Expression(_) => "ExpressionStatement",
        Stmt::VarDecl { .. } => "VariableDeclaration",
        Stmt::Block(_) => "Block",
        Stmt::If(_, _, _) => "IfStatement",
        Stmt::While(_, _) => "WhileStatement",
        Stmt::For { .. } => "ForStatement",
        Stmt::DoWhile(_, _) => "DoWhileStatement",
        Stmt::Switch(_, _) => "SwitchStatement",
        Stmt::Case(_, _) => "CaseStatement",
        Stmt::Default(_) => "DefaultStatement",
        Stmt::Return(_) => "ReturnStatement",
        Stmt::Break => "BreakStatement",
        Stmt::Continue => "ContinueStatement",
    }
}
