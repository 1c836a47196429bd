//! Supported language set and extension classification

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// The closed set of languages the pipeline understands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Go,
    C,
    Cpp,
    #[serde(rename = "objc")]
    ObjC,
    Java,
    Kotlin,
    Swift,
    JavaScript,
    TypeScript,
    Python,
}

impl Language {
    /// Classify a file by extension. `.h` defaults to C; the header/impl
    /// pairer promotes it to C++ or Objective-C when a sibling warrants it.
    pub fn from_extension(ext: &str) -> Option<Language> {
        match ext {
            "go" => Some(Language::Go),
            "c" | "h" => Some(Language::C),
            "cpp" | "cc" | "cxx" | "hpp" | "hxx" => Some(Language::Cpp),
            "m" | "mm" => Some(Language::ObjC),
            "java" => Some(Language::Java),
            "kt" | "kts" => Some(Language::Kotlin),
            "swift" => Some(Language::Swift),
            "js" | "mjs" | "jsx" => Some(Language::JavaScript),
            "ts" | "tsx" => Some(Language::TypeScript),
            "py" => Some(Language::Python),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Language> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Language::from_extension)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Go => "go",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::ObjC => "objc",
            Language::Java => "java",
            Language::Kotlin => "kotlin",
            Language::Swift => "swift",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Python => "python",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
