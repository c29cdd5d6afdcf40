//! Compilation session and per-file pipeline.
//!
//! `CompilerSession` owns the state shared across input files — the string
//! interner and the module resolver — and drives one file at a time
//! through lex/parse, code generation and the external assembler. The
//! linker and archiver wrappers live here too so the driver stays a thin
//! argument loop.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{anyhow, bail, Context, Result};
use string_interner::DefaultStringInterner;

use frontend::ast::Program;
use frontend::lexer::Lexer;
use frontend::parser::error::MultipleParserResult;
use frontend::{AstPrinter, ModuleResolver, Parser};
use x86_backend::{CodeGenerator, OptLevel, TargetArch};

pub const DEFAULT_EXECUTABLE: &str = "a.out";
pub const DEFAULT_ARCHIVE: &str = "liboutput.a";
pub const MAX_LINK_ARGS: usize = 16;

/// Driver configuration assembled from the command line.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub input_files: Vec<PathBuf>,
    pub output_file: Option<PathBuf>,
    pub compile_only: bool,
    pub create_library: bool,
    pub arch: TargetArch,
    pub opt_level: OptLevel,
    pub debug_info: bool,
    pub verbose: bool,
    pub keep_asm: bool,
    pub print_ast: bool,
    pub print_tokens: bool,
    pub lib_paths: Vec<String>,
    pub libraries: Vec<String>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            input_files: Vec::new(),
            output_file: None,
            compile_only: false,
            create_library: false,
            arch: TargetArch::X86_64,
            opt_level: OptLevel::None,
            debug_info: false,
            verbose: false,
            keep_asm: false,
            print_ast: false,
            print_tokens: false,
            lib_paths: Vec::new(),
            libraries: Vec::new(),
        }
    }
}

/// Replace (or append) the extension of an input path.
pub fn change_extension(path: &Path, extension: &str) -> PathBuf {
    path.with_extension(extension)
}

pub struct CompilerSession {
    string_interner: DefaultStringInterner,
    module_resolver: ModuleResolver,
}

impl CompilerSession {
    pub fn new() -> Self {
        Self {
            string_interner: DefaultStringInterner::new(),
            module_resolver: ModuleResolver::new(),
        }
    }

    pub fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
        Self {
            string_interner: DefaultStringInterner::new(),
            module_resolver: ModuleResolver::with_search_paths(search_paths),
        }
    }

    pub fn string_interner(&self) -> &DefaultStringInterner {
        &self.string_interner
    }

    pub fn string_interner_mut(&mut self) -> &mut DefaultStringInterner {
        &mut self.string_interner
    }

    pub fn module_resolver_mut(&mut self) -> &mut ModuleResolver {
        &mut self.module_resolver
    }

    /// Parse a source string, collecting every error instead of stopping
    /// at the first one.
    pub fn parse_program(&mut self, input: &str) -> MultipleParserResult<Program> {
        let mut parser = Parser::new(input, &mut self.string_interner);
        parser.parse_program_multiple_errors()
    }

    /// Source text to assembly text. Used by the file pipeline and as the
    /// test entry point that skips the external toolchain.
    pub fn compile_source(&mut self, input: &str, opts: &CompileOptions) -> Result<String> {
        let parsed = self.parse_program(input);
        for error in &parsed.errors {
            eprintln!("{}", error);
        }
        let program = match parsed.result {
            Some(program) if parsed.errors.is_empty() => program,
            _ => bail!("{} parse errors", parsed.errors.len().max(1)),
        };

        let mut generator = CodeGenerator::new(
            &program,
            &self.string_interner,
            opts.arch,
            opts.opt_level,
            opts.debug_info,
        );
        generator
            .generate()
            .map_err(|e| anyhow!("code generation failed: {}", e))
    }

    /// Full per-file pipeline: read, diagnostics, parse, resolve imports,
    /// emit assembly, then assemble with `as`. Returns the object path.
    pub fn compile_file(&mut self, input_file: &Path, opts: &CompileOptions) -> Result<PathBuf> {
        let source = std::fs::read_to_string(input_file)
            .with_context(|| format!("Cannot read file {}", input_file.display()))?;

        if opts.verbose {
            println!("Read {} bytes from {}", source.len(), input_file.display());
        }

        if opts.print_tokens {
            print_tokens(input_file, &source);
        }

        let parsed = self.parse_program(&source);
        for error in &parsed.errors {
            eprintln!("{}", error);
        }
        let program = match parsed.result {
            Some(program) if parsed.errors.is_empty() => program,
            _ => bail!(
                "Parse error in {} ({} errors)",
                input_file.display(),
                parsed.errors.len().max(1)
            ),
        };

        if opts.print_ast {
            println!("AST for {}:", input_file.display());
            let printer = AstPrinter::new(&program, &self.string_interner);
            let printer = if opts.debug_info { printer.debug() } else { printer };
            println!("{}", printer.print());
        }

        self.check_imports(&program, input_file, opts);

        let mut generator = CodeGenerator::new(
            &program,
            &self.string_interner,
            opts.arch,
            opts.opt_level,
            opts.debug_info,
        );
        let assembly = generator.generate().map_err(|e| {
            anyhow!("Code generation error in {} ({})", input_file.display(), e)
        })?;

        if opts.verbose && program.find_function(self.string_interner.get_or_intern("main")).is_none() {
            println!("note: {} does not define main", input_file.display());
        }

        let asm_file = change_extension(input_file, "s");
        std::fs::write(&asm_file, &assembly)
            .with_context(|| format!("Cannot write to {}", asm_file.display()))?;
        if opts.verbose {
            println!("Generated assembly: {}", asm_file.display());
        }

        let obj_file = change_extension(input_file, "o");
        assemble_file(&asm_file, &obj_file)?;
        if opts.verbose {
            println!("Generated object file: {}", obj_file.display());
        }

        Ok(obj_file)
    }

    /// Imports are located and parsed for early diagnostics; their
    /// contents are not merged into this program.
    fn check_imports(&mut self, program: &Program, input_file: &Path, opts: &CompileOptions) {
        let current_dir = input_file.parent();
        for import in program.imports() {
            let resolved =
                self.module_resolver
                    .resolve_import(import, current_dir, &mut self.string_interner);
            match resolved {
                Ok(module) => {
                    if opts.verbose {
                        println!("Resolved module: {}", module.file_path.display());
                    }
                }
                Err(e) => eprintln!("warning: {}", e),
            }
        }
    }
}

impl Default for CompilerSession {
    fn default() -> Self {
        Self::new()
    }
}

fn print_tokens(input_file: &Path, source: &str) {
    use frontend::token::Kind;

    println!("Tokens for {}:", input_file.display());
    let mut lexer = Lexer::new(source);
    loop {
        let token = lexer.next_token();
        if token.kind == Kind::EOF {
            break;
        }
        if matches!(token.kind, Kind::Invalid(_)) {
            lexer.report_error("invalid character");
        }
        println!("  {}: '{}'", token.kind.name(), token.lexeme(source));
    }
    println!();
}

/// `as -64 input.s -o output.o`
pub fn assemble_file(asm_file: &Path, obj_file: &Path) -> Result<()> {
    let status = Command::new("as")
        .arg("-64")
        .arg(asm_file)
        .arg("-o")
        .arg(obj_file)
        .status()
        .context("failed to spawn 'as'")?;
    if !status.success() {
        bail!("Assembly failed for {}", asm_file.display());
    }
    Ok(())
}

/// `ld <objects> -L<path>... -l<name>... -o output`
pub fn link_files(obj_files: &[PathBuf], output_file: &Path, opts: &CompileOptions) -> Result<()> {
    if obj_files.is_empty() {
        bail!("No object files to link");
    }

    let mut command = Command::new("ld");
    for obj in obj_files {
        command.arg(obj);
    }
    for path in opts.lib_paths.iter().take(MAX_LINK_ARGS) {
        command.arg(format!("-L{}", path));
    }
    for lib in opts.libraries.iter().take(MAX_LINK_ARGS) {
        command.arg(format!("-l{}", lib));
    }
    command.arg("-o").arg(output_file);

    if opts.verbose {
        println!("Link command: {:?}", command);
    }

    let status = command.status().context("failed to spawn 'ld'")?;
    if !status.success() {
        bail!("Linking failed");
    }
    Ok(())
}

/// `ar rcs archive <objects>`
pub fn create_static_library(obj_files: &[PathBuf], lib_file: &Path) -> Result<()> {
    if obj_files.is_empty() {
        bail!("No object files for library");
    }

    let mut command = Command::new("ar");
    command.arg("rcs").arg(lib_file);
    for obj in obj_files {
        command.arg(obj);
    }

    let status = command.status().context("failed to spawn 'ar'")?;
    if !status.success() {
        bail!("Library creation failed");
    }
    Ok(())
}

/// Best-effort removal of intermediate products.
pub fn cleanup_temp_files(paths: &[PathBuf]) {
    for path in paths {
        if path.exists() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_program() {
        let mut session = CompilerSession::new();
        let parsed = session.parse_program("i32 main() { return 0; }");
        assert!(!parsed.has_errors());
        assert_eq!(parsed.result.unwrap().functions().count(), 1);
    }

    #[test]
    fn test_parse_errors_are_collected() {
        let mut session = CompilerSession::new();
        let parsed = session.parse_program("i32 main() { i32 x = ; return 0; }");
        assert!(parsed.has_errors());
        assert!(parsed.result.is_some());
    }

    #[test]
    fn test_compile_source_produces_assembly() {
        let mut session = CompilerSession::new();
        let opts = CompileOptions::default();
        let asm = session.compile_source("i32 main() { return 0; }", &opts).unwrap();
        assert!(asm.contains("main:"));
        assert!(asm.contains("_start:"));
    }

    #[test]
    fn test_compile_source_rejects_parse_errors() {
        let mut session = CompilerSession::new();
        let opts = CompileOptions::default();
        assert!(session.compile_source("i32 main() { i32 = ; }", &opts).is_err());
    }

    #[test]
    fn test_compile_source_rejects_unsupported_target() {
        let mut session = CompilerSession::new();
        let opts = CompileOptions {
            arch: TargetArch::Arm64,
            ..CompileOptions::default()
        };
        assert!(session.compile_source("i32 main() { return 0; }", &opts).is_err());
    }

    #[test]
    fn test_change_extension() {
        assert_eq!(change_extension(Path::new("foo.mc"), "s"), PathBuf::from("foo.s"));
        assert_eq!(change_extension(Path::new("dir/foo.mc"), "o"), PathBuf::from("dir/foo.o"));
    }
}
