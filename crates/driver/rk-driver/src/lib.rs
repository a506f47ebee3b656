//! Compilation driver
//!
//! Runs every compilation unit through the collector passes in lock-step:
//! all units finish one pass before any unit starts the next, so a unit may
//! name classes, bases and constants of units listed after it.

mod options;

pub use options::CompilerOptions;

use rk_collect::{Collector, Pass, UnitCollector};
use rk_intern::Interner;
use rk_it::{BodyStats, DiagnosticSink, Entity, InternalError, Program, Reporter};
use rk_lower::LoweringContext;
use rk_span::SourceFiles;
use rk_syntax::CompilationUnit;
use tracing::debug;

/// Result of a compilation that did not fail internally
#[derive(Debug)]
pub struct CompileOutput {
    /// The lowered program, complete even when semantic errors were reported
    pub program: Program,
    /// Semantic errors reported, including those past the diagnostics cap
    pub error_count: usize,
}

impl CompileOutput {
    /// Whether any semantic error was reported
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// Entity at `path` inside `unit`, descending through class scopes
    pub fn lookup(&self, unit: &str, path: &[&str]) -> Option<Entity> {
        let mut scope = *self.program.units.get(&self.program.sym(unit))?;
        let (last, parents) = path.split_last()?;
        for segment in parents {
            match self.program.lookup_in(scope, self.program.sym(segment))? {
                Entity::Class(class) => scope = self.program.classes[class].scope,
                _ => return None,
            }
        }
        self.program.lookup_in(scope, self.program.sym(last))
    }

    /// Node counts summed over every compiled function body
    pub fn stats(&self) -> BodyStats {
        self.program
            .functions
            .iter()
            .filter_map(|(_, function)| function.body)
            .map(|body| BodyStats::of_block(&self.program, body))
            .fold(BodyStats::default(), |total, stats| BodyStats {
                blocks: total.blocks + stats.blocks,
                loops: total.loops + stats.loops,
                statements: total.statements + stats.statements,
                expressions: total.expressions + stats.expressions,
                error_expressions: total.error_expressions + stats.error_expressions,
            })
    }
}

/// Compile `units`, reporting semantic errors to `sink`
///
/// Locations are resolved to file names through `files`.
///
/// # Errors
///
/// Returns an internal error when the syntax tree is malformed or the
/// lowering state is inconsistent; semantic errors never fail the call.
pub fn compile(
    interner: &Interner,
    files: &SourceFiles,
    units: &[CompilationUnit],
    sink: &mut dyn DiagnosticSink,
    options: &CompilerOptions,
) -> Result<CompileOutput, InternalError> {
    let mut program = Program::new(interner);
    let host = Collector::new();
    let error_count = {
        let reporter = Reporter::new(sink, files, options.max_diagnostics);
        let mut ctx = LoweringContext::new(&mut program, reporter, options.lower_options()).with_host(&host);

        let mut collectors: Vec<UnitCollector<'_>> = units
            .iter()
            .map(|unit| UnitCollector::for_unit(ctx.program, unit))
            .collect();
        debug!(units = collectors.len(), mode = ?options.build_mode, "compilation started");

        for pass in Pass::ALL {
            for (unit, collector) in units.iter().zip(&mut collectors) {
                collector.run(pass, &mut ctx)?;
                debug!(%pass, unit = %ctx.program.name(unit.name), "unit pass finished");
            }
            debug!(%pass, errors = ctx.error_count(), "pass finished");
        }
        ctx.error_count()
    };
    debug!(errors = error_count, functions = program.functions.len(), "compilation finished");
    Ok(CompileOutput { program, error_count })
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;
    use rk_it::{Diagnostics, TyKind};
    use rk_syntax::{DeclarationKind, SyntaxBuilder, VariableDecl};

    fn setup() -> (Interner, SourceFiles, rk_span::FileId) {
        let interner = Interner::new();
        let mut files = SourceFiles::new();
        let file = files.add("app.rk");
        (interner, files, file)
    }

    #[test]
    fn test_forward_reference_across_units() {
        let (interner, files, file) = setup();
        let b = SyntaxBuilder::new(&interner, file);
        let app = b.unit(
            "App",
            vec![
                b.class("Circle", vec![b.unit_ty("Geometry", "Shape")], vec![]),
                b.constant("Sides", None, b.global("Geometry", "Corners")),
            ],
        );
        let geometry = b.unit(
            "Geometry",
            vec![
                b.class("Shape", vec![], vec![]),
                b.constant("Corners", Some(b.ty("int")), b.int(4)),
            ],
        );
        let mut diagnostics = Diagnostics::new();
        let output = compile(&interner, &files, &[app, geometry], &mut diagnostics, &CompilerOptions::default()).unwrap();

        assert!(diagnostics.is_empty(), "{:?}", diagnostics.messages());
        let Some(Entity::Class(circle)) = output.lookup("App", &["Circle"]) else {
            panic!("Circle not collected");
        };
        let Some(Entity::Class(shape)) = output.lookup("Geometry", &["Shape"]) else {
            panic!("Shape not collected");
        };
        assert_eq!(output.program.superclass(circle), Some(shape));
        let Some(Entity::Constant(sides)) = output.lookup("App", &["Sides"]) else {
            panic!("Sides not collected");
        };
        assert_eq!(output.program.constants[sides].value(), Some(&rk_it::Value::Int(4)));
    }

    #[test]
    fn test_diagnostics_cap_counts_everything() {
        let (interner, files, file) = setup();
        let b = SyntaxBuilder::new(&interner, file);
        let unit = b.unit(
            "App",
            vec![
                b.variable("first", None, None),
                b.variable("second", None, None),
                b.variable("third", None, None),
            ],
        );
        let mut reported: Vec<String> = Vec::new();
        let mut sink = |message: &str, file: &str, _line: u32, _column: u32| {
            reported.push(format!("{file}: {message}"));
        };
        let options = CompilerOptions {
            max_diagnostics: Some(1),
            ..CompilerOptions::default()
        };
        let output = compile(&interner, &files, &[unit], &mut sink, &options).unwrap();

        assert_eq!(output.error_count, 3);
        assert!(output.has_errors());
        expect![[r#"
            [
                "app.rk: variable `first` needs a type or an initializer",
            ]
        "#]]
        .assert_debug_eq(&reported);
    }

    #[test]
    fn test_malformed_constant_is_internal_error() {
        let (interner, files, file) = setup();
        let b = SyntaxBuilder::new(&interner, file);
        let broken = b.declaration(
            "Limit",
            DeclarationKind::Variable(VariableDecl {
                ty: Some(b.ty("int")),
                initializer: None,
                is_const: true,
            }),
        );
        let unit = b.unit("App", vec![broken]);
        let mut diagnostics = Diagnostics::new();
        let result = compile(&interner, &files, &[unit], &mut diagnostics, &CompilerOptions::default());
        assert!(matches!(result, Err(InternalError::MalformedSyntax { .. })));
    }

    #[test]
    fn test_stats_cover_every_body() {
        let (interner, files, file) = setup();
        let b = SyntaxBuilder::new(&interner, file);
        let spin = b.block(vec![b.while_loop(b.bool(false), b.block(vec![]))]);
        let unit = b.unit(
            "App",
            vec![
                b.function("first", vec![], None, Some(spin.clone())),
                b.function("second", vec![], None, Some(spin)),
                b.variable("ratio", Some(b.ty("double")), Some(b.int(2))),
            ],
        );
        let mut diagnostics = Diagnostics::new();
        let output = compile(&interner, &files, &[unit], &mut diagnostics, &CompilerOptions::default()).unwrap();

        assert!(!output.has_errors(), "{:?}", diagnostics.messages());
        let Some(Entity::Variable(ratio)) = output.lookup("App", &["ratio"]) else {
            panic!("ratio not collected");
        };
        let ty = output.program.variables[ratio].ty;
        assert_eq!(output.program.ty(ty), &TyKind::Primitive(rk_it::PrimitiveKind::Double));
        assert_eq!(output.stats().error_expressions, 0);
    }
}
