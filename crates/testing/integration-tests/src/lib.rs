//! Integration test utilities for the Rook compiler core

use anyhow::{Context, Result};
use rk_driver::{CompileOutput, CompilerOptions, compile};
use rk_intern::Interner;
use rk_it::{BlockId, ClassId, Diagnostics, Entity, FunctionId, InternalError, Program};
use rk_span::SourceFiles;
use rk_syntax::{CompilationUnit, SyntaxBuilder};
use std::path::Path;

/// Test fixture helper
pub struct TestFixture {
    /// Interner shared by every builder of the fixture
    pub interner: Interner,
    /// Files registered in the fixture
    pub files: SourceFiles,
    /// Options every compilation uses
    pub options: CompilerOptions,
}

impl TestFixture {
    /// Creates a fixture with default options
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(CompilerOptions::default())
    }

    /// Creates a fixture compiling with `options`
    #[must_use]
    pub fn with_options(options: CompilerOptions) -> Self {
        Self {
            interner: Interner::new(),
            files: SourceFiles::new(),
            options,
        }
    }

    /// Creates a fixture configured by `rook.toml` in `dir`
    ///
    /// # Errors
    ///
    /// Returns an error if the options file is missing or invalid
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let path = dir.as_ref().join("rook.toml");
        let options = CompilerOptions::from_file(&path)
            .with_context(|| format!("Failed to load test project {}", dir.as_ref().display()))?;
        Ok(Self::with_options(options))
    }

    /// Registers a source file and returns a builder for its syntax
    pub fn add_file(&mut self, name: &str) -> SyntaxBuilder {
        let file = self.files.add(name);
        SyntaxBuilder::new(&self.interner, file)
    }

    /// Compiles `units`, collecting every diagnostic
    ///
    /// # Errors
    ///
    /// Returns the internal error that aborted the compilation
    pub fn compile(&self, units: &[CompilationUnit]) -> Result<Compiled, InternalError> {
        let mut diagnostics = Diagnostics::new();
        let output = compile(&self.interner, &self.files, units, &mut diagnostics, &self.options)?;
        Ok(Compiled { output, diagnostics })
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A finished compilation and what it reported
pub struct Compiled {
    /// Driver output
    pub output: CompileOutput,
    /// Every diagnostic reported
    pub diagnostics: Diagnostics,
}

impl Compiled {
    /// The lowered program
    pub fn program(&self) -> &Program {
        &self.output.program
    }

    /// Messages in report order
    pub fn messages(&self) -> Vec<&str> {
        self.diagnostics.messages()
    }

    /// Class at `path` in `unit`
    #[must_use]
    pub fn class(&self, unit: &str, path: &[&str]) -> Option<ClassId> {
        match self.output.lookup(unit, path)? {
            Entity::Class(class) => Some(class),
            _ => None,
        }
    }

    /// Function at `path` in `unit`
    #[must_use]
    pub fn function(&self, unit: &str, path: &[&str]) -> Option<FunctionId> {
        match self.output.lookup(unit, path)? {
            Entity::Function(function) => Some(function),
            _ => None,
        }
    }

    /// Lowered body of the function at `path` in `unit`
    #[must_use]
    pub fn body(&self, unit: &str, path: &[&str]) -> Option<BlockId> {
        let function = self.function(unit, path)?;
        self.program().functions[function].body
    }

    /// Loop-flagged blocks reachable from `block`
    #[must_use]
    pub fn loops_in(&self, block: BlockId) -> usize {
        rk_it::BodyStats::of_block(self.program(), block).loops
    }
}

/// Whether every superclass chain reaches a class without a superclass
/// within `bound` steps
#[must_use]
pub fn hierarchy_is_acyclic(program: &Program, bound: usize) -> bool {
    program.classes.iter().all(|(class, _)| {
        let mut current = Some(class);
        for _ in 0..=bound {
            match current {
                None => return true,
                Some(class) => current = program.superclass(class),
            }
        }
        false
    })
}
