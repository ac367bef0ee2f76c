//! Static analysis: logical defects in sources that run without crashing.
//!
//! - `python`: structural checks over a tree-sitter parse and per-scope CFGs
//! - `patterns`: regex checks for C, C++, Java, JavaScript and Go
//! - `output`: inspection of a successful run's stdout

pub mod cfg;
pub mod output;
pub mod patterns;
pub mod python;
pub mod syntax;

use mender_sandbox::Language;

use crate::domain::LogicalFinding;

pub use output::inspect_output;
pub use python::analyze;

/// Run the checks appropriate for `language`.
pub fn analyze_for(language: Language, source: &str) -> Vec<LogicalFinding> {
    match language {
        Language::Python => python::analyze(source),
        Language::C | Language::Cpp | Language::Java | Language::JavaScript | Language::Go => {
            patterns::analyze(language, source)
        }
        Language::Shell => Vec::new(),
    }
}
