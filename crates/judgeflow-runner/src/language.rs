use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Languages the generator/reference-solution/submission pipeline may run
/// (§4.6.2/§4.6.3/§4.6.4 all invoke the same runner capability for
/// generators, reference solutions, and user submissions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Cpp,
}

impl Language {
    pub fn parse(name: &str) -> Result<Self, Error> {
        match name.to_ascii_lowercase().as_str() {
            "python" | "python3" | "py" => Ok(Language::Python),
            "cpp" | "c++" | "gxx" => Ok(Language::Cpp),
            other => Err(Error::UnsupportedLanguage(other.to_string())),
        }
    }

    /// File extension for the source written into the sandbox workspace.
    pub fn source_extension(&self) -> &'static str {
        match self {
            Language::Python => "py",
            Language::Cpp => "cpp",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Language::Python => "python",
            Language::Cpp => "cpp",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_aliases() {
        assert_eq!(Language::parse("py").unwrap(), Language::Python);
        assert_eq!(Language::parse("PYTHON3").unwrap(), Language::Python);
        assert_eq!(Language::parse("c++").unwrap(), Language::Cpp);
    }

    #[test]
    fn rejects_unknown_language() {
        let err = Language::parse("cobol").unwrap_err();
        assert!(matches!(err, Error::UnsupportedLanguage(_)));
    }
}
