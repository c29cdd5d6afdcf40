use std::rc::Rc;

use string_interner::{DefaultStringInterner, DefaultSymbol};

use crate::ast::{AstBuilder, EnumDecl, Field, Function, ImportDecl, Item, Node, Parameter, Program, SourceLocation, StmtRef, StructDecl, UnionDecl};
use crate::token::Kind;
use crate::type_decl::TypeDecl;

use super::error::{MultipleParserResult, ParserError, ParserResult};
use super::token_source::{LexerTokenSource, TokenProvider};

pub struct Parser<'a> {
    token_provider: TokenProvider<LexerTokenSource<'a>>,
    pub ast_builder: AstBuilder,
    pub string_interner: &'a mut DefaultStringInterner,
    pub errors: Vec<ParserError>,
    panic_mode: bool,
    /// Kind of the last consumed token; drives panic-mode
    /// synchronization across statement boundaries.
    previous_kind: Option<Kind>,
    consumed: usize,
    input: &'a str,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str, string_interner: &'a mut DefaultStringInterner) -> Self {
        Parser {
            token_provider: TokenProvider::new(LexerTokenSource::new(input)),
            ast_builder: AstBuilder::with_capacity(1024, 1024),
            string_interner,
            errors: Vec::with_capacity(4),
            panic_mode: false,
            previous_kind: None,
            consumed: 0,
            input,
        }
    }

    pub fn peek(&mut self) -> Option<&Kind> {
        self.token_provider.peek().map(|t| &t.kind)
    }

    pub fn peek_at(&mut self, relative_pos: usize) -> Option<&Kind> {
        self.token_provider.peek_at(relative_pos).map(|t| &t.kind)
    }

    pub fn next(&mut self) {
        if let Some(token) = self.token_provider.peek() {
            self.previous_kind = Some(token.kind.clone());
            self.consumed += 1;
        }
        self.token_provider.advance();
    }

    pub fn at_end(&mut self) -> bool {
        self.peek().is_none()
    }

    pub fn check(&mut self, kind: &Kind) -> bool {
        self.peek() == Some(kind)
    }

    pub fn match_kind(&mut self, kind: &Kind) -> bool {
        if self.check(kind) {
            self.next();
            true
        } else {
            false
        }
    }

    pub fn current_location(&mut self) -> SourceLocation {
        match self.token_provider.peek() {
            Some(token) => SourceLocation {
                line: token.line,
                column: token.column,
                offset: token.position.start as u32,
            },
            None => {
                let (line, column) = offset_to_line_col(self.input, self.input.len());
                SourceLocation { line, column, offset: self.input.len() as u32 }
            }
        }
    }

    pub fn current_lexeme(&mut self) -> Option<String> {
        let input = self.input;
        self.token_provider.peek().map(|t| t.lexeme(input).to_string())
    }

    pub fn current_offset(&mut self) -> usize {
        let end = self.input.len();
        self.token_provider.peek().map(|t| t.position.start).unwrap_or(end)
    }

    /// Record an error unless a panic episode is already open, then hand
    /// the error back so the failing production can unwind with `?`.
    pub fn report(&mut self, error: ParserError) -> ParserError {
        if !self.panic_mode {
            self.panic_mode = true;
            self.errors.push(error.clone());
        }
        error
    }

    pub fn error_here(&mut self, message: String) -> ParserError {
        let location = self.current_location();
        let at = self.current_lexeme();
        self.report(ParserError::generic_error(location, message, at))
    }

    /// Punctuation check: a mismatch is recorded but the production
    /// carries on without consuming anything.
    pub fn consume(&mut self, expected: &Kind) -> bool {
        if self.match_kind(expected) {
            return true;
        }
        let location = self.current_location();
        let at = self.current_lexeme();
        let found = self.peek().map(|k| k.name().to_string()).unwrap_or_else(|| "EOF".to_string());
        self.report(ParserError::unexpected_token(location, expected.name().to_string(), found, at));
        false
    }

    pub fn in_panic_mode(&self) -> bool {
        self.panic_mode
    }

    /// Number of tokens consumed so far; recovery loops use it to detect
    /// a stuck parse and force progress.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Skip tokens until a statement boundary: just past a semicolon, or
    /// in front of a keyword that can start a fresh construct.
    pub fn synchronize(&mut self) {
        self.panic_mode = false;

        while !self.at_end() {
            if self.previous_kind == Some(Kind::Semicolon) {
                return;
            }
            match self.peek() {
                Some(Kind::Struct)
                | Some(Kind::Enum)
                | Some(Kind::Union)
                | Some(Kind::For)
                | Some(Kind::If)
                | Some(Kind::While)
                | Some(Kind::Return) => return,
                _ => {}
            }
            self.next();
        }
    }

    pub fn intern(&mut self, text: &str) -> DefaultSymbol {
        self.string_interner.get_or_intern(text)
    }

    pub fn parse_program(&mut self) -> ParserResult<Program> {
        let start = self.current_offset();
        let mut items = Vec::new();

        while !self.at_end() {
            if self.panic_mode {
                self.synchronize();
                if self.at_end() {
                    break;
                }
            }

            let before = self.consumed;
            match self.parse_item() {
                Ok(Some(item)) => items.push(item),
                Ok(None) => {}
                Err(_) => {
                    // Recovery happens at the top of the loop; force
                    // progress if the failing production consumed nothing.
                    if self.consumed == before && !self.at_end() {
                        self.next();
                    }
                }
            }
        }

        let end = self.current_offset();
        let mut ast_builder = AstBuilder::new();
        std::mem::swap(&mut ast_builder, &mut self.ast_builder);
        let (expression, statement, locations) = ast_builder.extract_pools();
        Ok(Program {
            node: Node::new(start, end),
            items,
            statement,
            expression,
            locations,
        })
    }

    /// Parse everything and report every error found along the way.
    pub fn parse_program_multiple_errors(&mut self) -> MultipleParserResult<Program> {
        match self.parse_program() {
            Ok(program) => {
                if self.errors.is_empty() {
                    MultipleParserResult::success(program)
                } else {
                    MultipleParserResult::with_errors(program, self.errors.clone())
                }
            }
            Err(_) => MultipleParserResult::failure(self.errors.clone()),
        }
    }

    pub fn parse_item(&mut self) -> ParserResult<Option<Item>> {
        match self.peek() {
            None => Ok(None),
            Some(Kind::Module) => {
                self.next();
                self.parse_module_declaration().map(Some)
            }
            Some(Kind::Import) => {
                self.next();
                self.parse_import_statement().map(Some)
            }
            Some(Kind::Export) => {
                self.next();
                let inner = self.parse_item()?;
                match inner {
                    Some(item) => Ok(Some(Item::Export(Box::new(item)))),
                    None => Err(self.error_here("expected declaration after 'export'".to_string())),
                }
            }
            Some(Kind::Struct) => {
                self.next();
                self.parse_struct_declaration().map(Some)
            }
            Some(Kind::Enum) => {
                self.next();
                self.parse_enum_declaration().map(Some)
            }
            Some(Kind::Union) => {
                self.next();
                self.parse_union_declaration().map(Some)
            }
            Some(kind) if kind.is_type_token() => {
                if self.function_follows() {
                    self.parse_function_declaration().map(|f| Some(Item::Function(f)))
                } else {
                    self.parse_variable_declaration().map(|s| Some(Item::Statement(s)))
                }
            }
            Some(_) => {
                let stmt = super::stmt::parse_statement(self)?;
                Ok(Some(Item::Statement(stmt)))
            }
        }
    }

    /// Decide between `type name(...)` and `type name [= init];` with pure
    /// lookahead: skip the type head and the pointer stars, then check the
    /// token after the declared name for `(`.
    pub fn function_follows(&mut self) -> bool {
        let mut i = 0;
        match self.peek_at(i) {
            Some(Kind::Struct) | Some(Kind::Enum) | Some(Kind::Union) => {
                i += 1;
                if matches!(self.peek_at(i), Some(Kind::Identifier(_))) {
                    i += 1;
                }
            }
            Some(kind) if kind.is_type_token() => i += 1,
            _ => return false,
        }
        while self.peek_at(i) == Some(&Kind::Star) {
            i += 1;
        }
        if !matches!(self.peek_at(i), Some(Kind::Identifier(_))) {
            return false;
        }
        i += 1;
        self.peek_at(i) == Some(&Kind::ParenOpen)
    }

    pub fn parse_type(&mut self) -> ParserResult<TypeDecl> {
        let mut ty = match self.peek() {
            Some(Kind::I8) => {
                self.next();
                TypeDecl::I8
            }
            Some(Kind::I16) => {
                self.next();
                TypeDecl::I16
            }
            Some(Kind::I32) => {
                self.next();
                TypeDecl::I32
            }
            Some(Kind::I64) => {
                self.next();
                TypeDecl::I64
            }
            Some(Kind::U8) => {
                self.next();
                TypeDecl::U8
            }
            Some(Kind::U16) => {
                self.next();
                TypeDecl::U16
            }
            Some(Kind::U32) => {
                self.next();
                TypeDecl::U32
            }
            Some(Kind::U64) => {
                self.next();
                TypeDecl::U64
            }
            Some(Kind::F32) => {
                self.next();
                TypeDecl::F32
            }
            Some(Kind::F64) => {
                self.next();
                TypeDecl::F64
            }
            Some(Kind::BoolType) => {
                self.next();
                TypeDecl::Bool
            }
            Some(Kind::Void) => {
                self.next();
                TypeDecl::Void
            }
            Some(Kind::Struct) => {
                self.next();
                TypeDecl::Struct(self.optional_type_name())
            }
            Some(Kind::Enum) => {
                self.next();
                TypeDecl::Enum(self.optional_type_name())
            }
            Some(Kind::Union) => {
                self.next();
                TypeDecl::Union(self.optional_type_name())
            }
            Some(Kind::Identifier(name)) => {
                let name = name.clone();
                self.next();
                let sym = self.intern(&name);
                TypeDecl::Identifier(sym)
            }
            _ => return Err(self.error_here("Expected type specifier".to_string())),
        };

        while self.match_kind(&Kind::Star) {
            ty = TypeDecl::Pointer(Box::new(ty));
        }

        Ok(ty)
    }

    fn optional_type_name(&mut self) -> Option<DefaultSymbol> {
        if let Some(Kind::Identifier(name)) = self.peek() {
            let name = name.clone();
            self.next();
            Some(self.intern(&name))
        } else {
            None
        }
    }

    pub fn expect_identifier(&mut self, what: &str) -> ParserResult<DefaultSymbol> {
        if let Some(Kind::Identifier(name)) = self.peek() {
            let name = name.clone();
            self.next();
            Ok(self.intern(&name))
        } else {
            let location = self.current_location();
            let at = self.current_lexeme();
            Err(self.report(ParserError::missing_name(location, what, at)))
        }
    }

    pub fn parse_function_declaration(&mut self) -> ParserResult<Rc<Function>> {
        let start = self.current_offset();
        let return_type = self.parse_type()?;
        let name = self.expect_identifier("function")?;

        self.consume(&Kind::ParenOpen);
        let parameter = self.parse_parameter_list()?;
        self.consume(&Kind::ParenClose);

        self.consume(&Kind::BraceOpen);
        let code = super::stmt::parse_block(self)?;
        let end = self.current_offset();

        Ok(Rc::new(Function {
            node: Node::new(start, end),
            name,
            parameter,
            return_type,
            code,
        }))
    }

    pub fn parse_parameter_list(&mut self) -> ParserResult<Vec<Parameter>> {
        let mut params = Vec::new();
        if self.check(&Kind::ParenClose) {
            return Ok(params);
        }

        loop {
            let ty = self.parse_type()?;
            let name = if let Some(Kind::Identifier(name)) = self.peek() {
                let name = name.clone();
                self.next();
                Some(self.intern(&name))
            } else {
                None
            };
            params.push((name, ty));

            if !self.match_kind(&Kind::Comma) {
                break;
            }
        }

        Ok(params)
    }

    /// `type name [= init];` — used at top level and inside blocks.
    pub fn parse_variable_declaration(&mut self) -> ParserResult<StmtRef> {
        let location = self.current_location();
        let ty = self.parse_type()?;
        let name = self.expect_identifier("variable")?;

        let init = if self.match_kind(&Kind::Assign) {
            Some(super::expr::parse_expression(self)?)
        } else {
            None
        };

        self.consume(&Kind::Semicolon);
        Ok(self.ast_builder.var_decl_stmt(name, ty, init, Some(location)))
    }

    pub fn parse_struct_declaration(&mut self) -> ParserResult<Item> {
        let name = self.expect_identifier("struct")?;
        self.consume(&Kind::BraceOpen);

        let fields = self.parse_field_list()?;

        self.consume(&Kind::BraceClose);
        Ok(Item::Struct(StructDecl { name, fields }))
    }

    pub fn parse_union_declaration(&mut self) -> ParserResult<Item> {
        let name = self.expect_identifier("union")?;
        self.consume(&Kind::BraceOpen);

        let fields = self.parse_field_list()?;

        self.consume(&Kind::BraceClose);
        Ok(Item::Union(UnionDecl { name, fields }))
    }

    fn parse_field_list(&mut self) -> ParserResult<Vec<Field>> {
        let mut fields = Vec::new();
        while !self.check(&Kind::BraceClose) && !self.at_end() {
            let ty = self.parse_type()?;
            let name = self.expect_identifier("field")?;
            // Field initializers parse but carry no layout meaning.
            if self.match_kind(&Kind::Assign) {
                super::expr::parse_expression(self)?;
            }
            self.consume(&Kind::Semicolon);
            fields.push(Field { name, ty });
        }
        Ok(fields)
    }

    pub fn parse_enum_declaration(&mut self) -> ParserResult<Item> {
        let name = self.expect_identifier("enum")?;
        self.consume(&Kind::BraceOpen);

        let mut variants = Vec::new();
        while !self.check(&Kind::BraceClose) && !self.at_end() {
            let variant = self.expect_identifier("enum value")?;
            let value = if self.match_kind(&Kind::Assign) {
                Some(super::expr::parse_expression(self)?)
            } else {
                None
            };
            variants.push((variant, value));

            if !self.match_kind(&Kind::Comma) {
                break;
            }
        }

        self.consume(&Kind::BraceClose);
        Ok(Item::Enum(EnumDecl { name, variants }))
    }

    pub fn parse_module_declaration(&mut self) -> ParserResult<Item> {
        let name = self.expect_identifier("module")?;
        self.consume(&Kind::Semicolon);
        Ok(Item::Module(name))
    }

    /// `import name;` — the module name may be an identifier or a string
    /// literal. Only the node is recorded; resolution is a separate pass.
    pub fn parse_import_statement(&mut self) -> ParserResult<Item> {
        let module = match self.peek() {
            Some(Kind::Identifier(name)) => {
                let name = name.clone();
                self.next();
                self.intern(&name)
            }
            Some(Kind::Str(name)) => {
                let name = name.clone();
                self.next();
                self.intern(&name)
            }
            _ => {
                let location = self.current_location();
                let at = self.current_lexeme();
                return Err(self.report(ParserError::missing_name(location, "module", at)));
            }
        };

        self.consume(&Kind::Semicolon);
        Ok(Item::Import(ImportDecl { module }))
    }
}

/// Line/column of a byte offset, both 1-based.
pub fn offset_to_line_col(input: &str, offset: usize) -> (u32, u32) {
    let mut line = 1u32;
    let mut column = 1u32;
    for (i, ch) in input.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}
