//! Compiler configuration loaded from TOML

use anyhow::{Context, Result, ensure};
use rk_lower::{BuildMode, LowerOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::fs;

/// Settings for one compilation
///
/// Every key is optional; unknown keys are rejected so typos surface as
/// errors instead of silently falling back to defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerOptions {
    /// `debug` or `release`
    pub build_mode: BuildMode,

    /// Fold constant subexpressions outside constant contexts
    pub fold_constants: bool,

    /// Diagnostics past this many are counted but not forwarded
    pub max_diagnostics: Option<usize>,

    /// Reserved name of constructors
    pub constructor_name: String,

    /// Reserved name of destructors
    pub destructor_name: String,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        let lower = LowerOptions::default();
        Self {
            build_mode: lower.build_mode,
            fold_constants: lower.fold_constants,
            max_diagnostics: None,
            constructor_name: lower.constructor_name,
            destructor_name: lower.destructor_name,
        }
    }
}

impl CompilerOptions {
    /// Parse options from TOML text
    ///
    /// # Errors
    ///
    /// Fails on malformed TOML, unknown keys, or unusable reserved names.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let options: Self = toml::from_str(source).context("Failed to parse compiler options")?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a TOML file
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or does not hold valid options.
    pub fn from_file(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read compiler options: {}", path.display()))?;
        Self::from_toml_str(&source).with_context(|| format!("Invalid compiler options in {}", path.display()))
    }

    /// Render as TOML
    ///
    /// # Errors
    ///
    /// Fails only if serialization does.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).context("Failed to serialize compiler options")
    }

    fn validate(&self) -> Result<()> {
        for (key, name) in [
            ("constructor_name", &self.constructor_name),
            ("destructor_name", &self.destructor_name),
        ] {
            ensure!(is_identifier(name), "`{key}` must be an identifier, found `{name}`");
        }
        ensure!(
            self.constructor_name != self.destructor_name,
            "constructor and destructor names must differ"
        );
        Ok(())
    }

    /// The subset the lowering passes read
    pub fn lower_options(&self) -> LowerOptions {
        LowerOptions {
            build_mode: self.build_mode,
            fold_constants: self.fold_constants,
            constructor_name: self.constructor_name.clone(),
            destructor_name: self.destructor_name.clone(),
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first == '_' || first.is_alphabetic())
        && chars.all(|ch| ch == '_' || ch.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_gives_defaults() {
        let options = CompilerOptions::from_toml_str("").unwrap();
        assert_eq!(options, CompilerOptions::default());
        assert_eq!(options.build_mode, BuildMode::Debug);
        assert!(options.fold_constants);
        assert_eq!(options.constructor_name, "constructor");
        assert_eq!(options.destructor_name, "destructor");
    }

    #[test]
    fn test_release_mode() {
        let options = CompilerOptions::from_toml_str("build_mode = \"release\"").unwrap();
        assert_eq!(options.build_mode, BuildMode::Release);
        assert_eq!(options.lower_options().build_mode, BuildMode::Release);
    }

    #[test]
    fn test_all_keys() {
        let source = r#"
            build_mode = "debug"
            fold_constants = false
            max_diagnostics = 20
            constructor_name = "init"
            destructor_name = "deinit"
        "#;
        let options = CompilerOptions::from_toml_str(source).unwrap();
        assert!(!options.fold_constants);
        assert_eq!(options.max_diagnostics, Some(20));
        let lower = options.lower_options();
        assert_eq!(lower.constructor_name, "init");
        assert_eq!(lower.destructor_name, "deinit");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let error = CompilerOptions::from_toml_str("optimize = true").unwrap_err();
        assert!(format!("{error:#}").contains("unknown field `optimize`"));
    }

    #[test]
    fn test_unknown_build_mode_rejected() {
        assert!(CompilerOptions::from_toml_str("build_mode = \"profile\"").is_err());
    }

    #[test]
    fn test_reserved_names_validated() {
        let error = CompilerOptions::from_toml_str("destructor_name = \"constructor\"").unwrap_err();
        assert_eq!(error.to_string(), "constructor and destructor names must differ");
        let error = CompilerOptions::from_toml_str("constructor_name = \"new object\"").unwrap_err();
        assert_eq!(
            error.to_string(),
            "`constructor_name` must be an identifier, found `new object`"
        );
    }

    #[test]
    fn test_written_options_load_back() {
        let options = CompilerOptions {
            build_mode: BuildMode::Release,
            max_diagnostics: Some(3),
            ..CompilerOptions::default()
        };
        let text = options.to_toml_string().unwrap();
        assert!(text.contains("build_mode = \"release\""));
        assert_eq!(CompilerOptions::from_toml_str(&text).unwrap(), options);
    }
}
