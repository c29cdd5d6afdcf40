use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use string_interner::{DefaultStringInterner, DefaultSymbol};

use crate::ast::{ImportDecl, Program, SourceLocation};
use crate::parser::error::{ParserError, ParserResult};
use crate::parser::Parser;

/// A module located on disk and parsed.
#[derive(Debug, Clone)]
pub struct ResolvedModule {
    pub name: DefaultSymbol,
    pub file_path: PathBuf,
    pub program: Program,
}

/// Locates `import`ed modules on the search paths and parses them. This
/// exists for diagnostics only; imported names are not resolved into the
/// importing program.
#[derive(Debug, Default)]
pub struct ModuleResolver {
    loaded_modules: HashMap<DefaultSymbol, ResolvedModule>,
    search_paths: Vec<PathBuf>,
}

impl ModuleResolver {
    pub fn new() -> Self {
        Self {
            loaded_modules: HashMap::new(),
            search_paths: vec![PathBuf::from(".")],
        }
    }

    pub fn with_search_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            loaded_modules: HashMap::new(),
            search_paths: paths,
        }
    }

    pub fn add_search_path<P: AsRef<Path>>(&mut self, path: P) {
        self.search_paths.push(path.as_ref().to_path_buf());
    }

    pub fn resolve_import(
        &mut self,
        import: &ImportDecl,
        current_dir: Option<&Path>,
        string_interner: &mut DefaultStringInterner,
    ) -> ParserResult<ResolvedModule> {
        if let Some(module) = self.loaded_modules.get(&import.module) {
            return Ok(module.clone());
        }

        let name = string_interner
            .resolve(import.module)
            .unwrap_or("<unknown>")
            .to_string();
        let file_path = self
            .find_module_file(&name, current_dir)
            .ok_or_else(|| module_error(format!("Module not found: {}", name)))?;

        let content = fs::read_to_string(&file_path)
            .map_err(|e| module_error(format!("Cannot read module {}: {}", file_path.display(), e)))?;

        let mut parser = Parser::new(&content, string_interner);
        let program = parser.parse_program()?;
        if !parser.errors.is_empty() {
            return Err(module_error(format!(
                "Module {} has {} parse errors",
                file_path.display(),
                parser.errors.len()
            )));
        }

        let module = ResolvedModule {
            name: import.module,
            file_path,
            program,
        };
        self.loaded_modules.insert(import.module, module.clone());
        Ok(module)
    }

    /// `name.mc` next to the importing file or on a search path, else
    /// `name/mod.mc`.
    fn find_module_file(&self, name: &str, current_dir: Option<&Path>) -> Option<PathBuf> {
        let mut search_paths: Vec<PathBuf> = Vec::new();
        if let Some(dir) = current_dir {
            search_paths.push(dir.to_path_buf());
        }
        search_paths.extend(self.search_paths.iter().cloned());

        for search_path in &search_paths {
            let file = search_path.join(format!("{}.mc", name));
            if file.is_file() {
                return Some(file);
            }

            let module_dir = search_path.join(name).join("mod.mc");
            if module_dir.is_file() {
                return Some(module_dir);
            }
        }

        None
    }

    pub fn loaded_modules(&self) -> &HashMap<DefaultSymbol, ResolvedModule> {
        &self.loaded_modules
    }

    pub fn clear_cache(&mut self) {
        self.loaded_modules.clear();
    }
}

fn module_error(message: String) -> ParserError {
    ParserError::io_error(SourceLocation { line: 0, column: 0, offset: 0 }, message)
}
