//! Per-language toolchain adapters.
//!
//! The engine never hard-codes a compiler or interpreter: everything it runs
//! comes from a [`ToolchainTable`]. Command templates may reference
//! `{source}` (the file name written into the working directory) and `{stem}`
//! (the file name without its extension).

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::language::Language;

/// How the source file is named inside the working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceNaming {
    /// Always the same stem, e.g. `main`.
    Fixed { stem: String },
    /// The name of the public class, as javac requires.
    PublicClass { fallback: String },
}

/// One toolchain adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toolchain {
    pub language: Language,

    /// Extension of the source file, without the dot.
    pub file_extension: String,

    pub source_naming: SourceNaming,

    /// Optional compile step; a non-zero exit skips the run step.
    pub compile_step: Option<Vec<String>>,

    /// Command that runs the program.
    pub run_command: Vec<String>,

    /// Apply the address-space ceiling to the run step. Runtimes that
    /// reserve large virtual regions up front (JVM, V8, Go) must disable this.
    pub enforce_address_space: bool,
}

impl Toolchain {
    /// Create an interpreted toolchain writing `main.<ext>`.
    pub fn interpreted(language: Language, file_extension: &str, run_command: &[&str]) -> Self {
        Self {
            language,
            file_extension: file_extension.to_string(),
            source_naming: SourceNaming::Fixed {
                stem: "main".to_string(),
            },
            compile_step: None,
            run_command: to_args(run_command),
            enforce_address_space: true,
        }
    }

    /// Add a compile step (builder pattern).
    pub fn with_compile_step(mut self, compile_step: &[&str]) -> Self {
        self.compile_step = Some(to_args(compile_step));
        self
    }

    /// Set how the source file is named (builder pattern).
    pub fn with_source_naming(mut self, naming: SourceNaming) -> Self {
        self.source_naming = naming;
        self
    }

    /// Disable the address-space ceiling (builder pattern).
    pub fn without_address_space_limit(mut self) -> Self {
        self.enforce_address_space = false;
        self
    }

    /// File stem to use for this source text.
    pub fn source_stem(&self, source: &str) -> String {
        match &self.source_naming {
            SourceNaming::Fixed { stem } => stem.clone(),
            SourceNaming::PublicClass { fallback } => {
                public_class_name(source).unwrap_or_else(|| fallback.clone())
            }
        }
    }

    /// File name to write this source text to.
    pub fn source_file_name(&self, source: &str) -> String {
        format!("{}.{}", self.source_stem(source), self.file_extension)
    }

    /// Rendered compile command, if this toolchain has one.
    pub fn compile_command(&self, file_name: &str, stem: &str) -> Option<Vec<String>> {
        self.compile_step
            .as_ref()
            .map(|template| render(template, file_name, stem))
    }

    /// Rendered run command.
    pub fn run_command(&self, file_name: &str, stem: &str) -> Vec<String> {
        render(&self.run_command, file_name, stem)
    }
}

fn to_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

fn render(template: &[String], file_name: &str, stem: &str) -> Vec<String> {
    template
        .iter()
        .map(|arg| arg.replace("{source}", file_name).replace("{stem}", stem))
        .collect()
}

fn public_class_name(source: &str) -> Option<String> {
    static PUBLIC_CLASS: OnceLock<Regex> = OnceLock::new();
    static ANY_CLASS: OnceLock<Regex> = OnceLock::new();

    let public = PUBLIC_CLASS
        .get_or_init(|| Regex::new(r"public\s+class\s+(\w+)").expect("static pattern"));
    let any = ANY_CLASS.get_or_init(|| Regex::new(r"\bclass\s+(\w+)").expect("static pattern"));

    public
        .captures(source)
        .or_else(|| any.captures(source))
        .map(|caps| caps[1].to_string())
}

/// Lookup table of toolchain adapters keyed by language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainTable {
    toolchains: BTreeMap<Language, Toolchain>,
}

impl Default for ToolchainTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl ToolchainTable {
    /// A table with no toolchains at all.
    pub fn empty() -> Self {
        Self {
            toolchains: BTreeMap::new(),
        }
    }

    /// The stock toolchains.
    ///
    /// | language   | compile                                   | run              |
    /// |------------|-------------------------------------------|------------------|
    /// | python     | -                                         | `python3 main.py`|
    /// | c          | `gcc main.c -o program -std=c11 -Wall`    | `./program`      |
    /// | cpp        | `g++ main.cpp -o program -std=c++17 -Wall`| `./program`      |
    /// | java       | `javac X.java`                            | `java X`         |
    /// | javascript | `node --check main.js`                    | `node main.js`   |
    /// | go         | `go build -o program main.go`             | `./program`      |
    /// | shell      | -                                         | `sh main.sh`     |
    pub fn standard() -> Self {
        Self::empty()
            .with_toolchain(Toolchain::interpreted(
                Language::Python,
                "py",
                &["python3", "{source}"],
            ))
            .with_toolchain(
                Toolchain::interpreted(Language::C, "c", &["./program"]).with_compile_step(&[
                    "gcc",
                    "{source}",
                    "-o",
                    "program",
                    "-std=c11",
                    "-Wall",
                ]),
            )
            .with_toolchain(
                Toolchain::interpreted(Language::Cpp, "cpp", &["./program"]).with_compile_step(&[
                    "g++",
                    "{source}",
                    "-o",
                    "program",
                    "-std=c++17",
                    "-Wall",
                ]),
            )
            .with_toolchain(
                Toolchain::interpreted(Language::Java, "java", &["java", "-cp", ".", "{stem}"])
                    .with_compile_step(&["javac", "{source}"])
                    .with_source_naming(SourceNaming::PublicClass {
                        fallback: "Main".to_string(),
                    })
                    .without_address_space_limit(),
            )
            .with_toolchain(
                Toolchain::interpreted(Language::JavaScript, "js", &["node", "{source}"])
                    .with_compile_step(&["node", "--check", "{source}"])
                    .without_address_space_limit(),
            )
            .with_toolchain(
                Toolchain::interpreted(Language::Go, "go", &["./program"])
                    .with_compile_step(&["go", "build", "-o", "program", "{source}"])
                    .without_address_space_limit(),
            )
            .with_toolchain(Toolchain::interpreted(
                Language::Shell,
                "sh",
                &["sh", "{source}"],
            ))
    }

    /// Register (or replace) a toolchain and return `self` (builder pattern).
    pub fn with_toolchain(mut self, toolchain: Toolchain) -> Self {
        self.toolchains.insert(toolchain.language, toolchain);
        self
    }

    pub fn get(&self, language: Language) -> Option<&Toolchain> {
        self.toolchains.get(&language)
    }

    pub fn languages(&self) -> impl Iterator<Item = Language> + '_ {
        self.toolchains.keys().copied()
    }

    /// Probe `PATH` for the first program of each toolchain and return the
    /// languages whose binaries are missing.
    pub fn missing_binaries(&self) -> anyhow::Result<Vec<Language>> {
        let path = std::env::var_os("PATH")
            .ok_or_else(|| anyhow::anyhow!("PATH is not set; cannot probe toolchains"))?;
        let dirs: Vec<_> = std::env::split_paths(&path).collect();

        let mut missing = Vec::new();
        for toolchain in self.toolchains.values() {
            let first = toolchain
                .compile_step
                .as_ref()
                .unwrap_or(&toolchain.run_command)
                .first()
                .cloned()
                .unwrap_or_default();
            // Programs produced by the compile step live in the working directory.
            if first.starts_with("./") {
                continue;
            }
            if !dirs.iter().any(|dir| dir.join(&first).is_file()) {
                missing.push(toolchain.language);
            }
        }
        Ok(missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_covers_every_language() {
        let table = ToolchainTable::standard();
        for lang in Language::ALL {
            assert!(table.get(lang).is_some(), "missing toolchain for {lang}");
        }
    }

    #[test]
    fn compiled_languages_have_compile_steps() {
        let table = ToolchainTable::standard();
        for lang in [Language::C, Language::Cpp, Language::Java, Language::Go] {
            assert!(table.get(lang).unwrap().compile_step.is_some());
        }
        assert!(table.get(Language::Python).unwrap().compile_step.is_none());
    }

    #[test]
    fn renders_placeholders() {
        let table = ToolchainTable::standard();
        let c = table.get(Language::C).unwrap();
        let compile = c.compile_command("main.c", "main").unwrap();
        assert_eq!(
            compile,
            vec!["gcc", "main.c", "-o", "program", "-std=c11", "-Wall"]
        );
        assert_eq!(c.run_command("main.c", "main"), vec!["./program"]);
    }

    #[test]
    fn java_uses_public_class_name() {
        let table = ToolchainTable::standard();
        let java = table.get(Language::Java).unwrap();
        let src = "class Helper {}\npublic class Calculator {\n}\n";
        assert_eq!(java.source_file_name(src), "Calculator.java");
        assert_eq!(
            java.run_command("Calculator.java", "Calculator"),
            vec!["java", "-cp", ".", "Calculator"]
        );

        assert_eq!(java.source_stem("class Only {}"), "Only");
        assert_eq!(java.source_stem("interface Nothing {}"), "Main");
        assert!(!java.enforce_address_space);
    }

    #[test]
    fn custom_toolchain_replaces_stock_one() {
        let table = ToolchainTable::standard().with_toolchain(Toolchain::interpreted(
            Language::Python,
            "py",
            &["python3", "-I", "{source}"],
        ));
        let py = table.get(Language::Python).unwrap();
        assert_eq!(py.run_command("main.py", "main"), vec!["python3", "-I", "main.py"]);
    }

    #[test]
    fn table_roundtrips_through_json() {
        let table = ToolchainTable::standard();
        let json = serde_json::to_string(&table).unwrap();
        let back: ToolchainTable = serde_json::from_str(&json).unwrap();
        assert_eq!(table, back);
    }
}
