//! Side-channel artifacts.
//!
//! Every stage persists its product next to the source file so the following
//! stage can be re-run independently: JSON for the structured artifacts
//! (tokens, AST, annotated AST, symbol table) and plain text for the TAC
//! program.

use std::{error::Error, fs, path::{Path, PathBuf}};

use log::debug;
use serde::{de::DeserializeOwned, Serialize};

/// The artifact naming scheme for one source file: `<base>.txt` maps to
/// `<base>_tokens.json`, `<base>_ast.json`, `<base>_annotated_ast.json`,
/// `<base>_symbol_table.json` and `<base>_intermediate.txt`.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    base: PathBuf,
}

impl ArtifactPaths {
    pub fn for_source(source: &Path) -> Self {
        Self {
            base: source.with_extension(""),
        }
    }

    fn with_suffix(&self, suffix: &str) -> PathBuf {
        let mut name = self.base.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    }

    pub fn tokens(&self) -> PathBuf {
        self.with_suffix("_tokens.json")
    }

    pub fn ast(&self) -> PathBuf {
        self.with_suffix("_ast.json")
    }

    pub fn annotated_ast(&self) -> PathBuf {
        self.with_suffix("_annotated_ast.json")
    }

    pub fn symbol_table(&self) -> PathBuf {
        self.with_suffix("_symbol_table.json")
    }

    pub fn intermediate(&self) -> PathBuf {
        self.with_suffix("_intermediate.txt")
    }
}

pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    debug!("artifact written to '{}'", path.display());
    Ok(())
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, Box<dyn Error>> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

pub fn save_text(path: &Path, text: &str) -> Result<(), Box<dyn Error>> {
    fs::write(path, text)?;
    debug!("artifact written to '{}'", path.display());
    Ok(())
}

pub fn load_text(path: &Path) -> Result<String, Box<dyn Error>> {
    Ok(fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_replace_the_extension() {
        let paths = ArtifactPaths::for_source(Path::new("/tmp/program.txt"));

        assert_eq!(paths.tokens(), PathBuf::from("/tmp/program_tokens.json"));
        assert_eq!(paths.ast(), PathBuf::from("/tmp/program_ast.json"));
        assert_eq!(
            paths.annotated_ast(),
            PathBuf::from("/tmp/program_annotated_ast.json")
        );
        assert_eq!(
            paths.symbol_table(),
            PathBuf::from("/tmp/program_symbol_table.json")
        );
        assert_eq!(
            paths.intermediate(),
            PathBuf::from("/tmp/program_intermediate.txt")
        );
    }
}
