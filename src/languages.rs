//! Language configuration for the code runner

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::runner::CommandSpec;

/// Configuration for a supported programming language
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageConfig {
    /// Canonical language name (table key, lowercase)
    pub name: String,
    /// Name of the source file (e.g., "main.cpp")
    pub source_file: String,
    /// Compile command (None for interpreted languages)
    pub compile_command: Option<Vec<String>>,
    /// Run command
    pub run_command: Vec<String>,
}

impl LanguageConfig {
    /// Whether running this language produces a compiled artifact first
    pub fn is_compiled(&self) -> bool {
        self.compile_command.is_some()
    }

    /// Build the execution command for a scratch directory holding `source_file`.
    ///
    /// Interpreted languages run `run_command` directly. Compiled languages run
    /// `compile && run` through `sh -c` so a failed compile never starts the binary.
    pub fn command(&self, work_dir: &Path) -> CommandSpec {
        match &self.compile_command {
            Some(compile) => {
                let pipeline = format!("{} && {}", compile.join(" "), self.run_command.join(" "));
                CommandSpec::new("sh")
                    .with_args(["-c".to_string(), pipeline])
                    .with_work_dir(work_dir)
            }
            None => CommandSpec::from_vec(&self.run_command).with_work_dir(work_dir),
        }
    }
}

/// Raw TOML configuration for a language
#[derive(Debug, Deserialize)]
struct RawLanguageConfig {
    source_file: String,
    compile_command: Option<String>,
    run_command: String,
    #[serde(default)]
    aliases: Vec<String>,
}

/// Immutable table of supported languages, keyed by lowercase name and alias
#[derive(Debug, Clone, Default)]
pub struct LanguageTable {
    languages: HashMap<String, LanguageConfig>,
}

impl LanguageTable {
    /// Load the language table bundled with the binary
    pub fn builtin() -> anyhow::Result<Self> {
        let content = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/files/languages.toml"));
        Self::from_toml_str(content).context("Invalid bundled languages.toml")
    }

    /// Parse a language table from TOML
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let raw_configs: HashMap<String, RawLanguageConfig> = toml::from_str(content)?;

        let mut languages = HashMap::new();

        for (name, raw) in raw_configs {
            let run_command = into_command(&raw.run_command);
            if run_command.is_empty() {
                anyhow::bail!("Empty run_command for {}", name);
            }

            let config = LanguageConfig {
                name: name.to_lowercase(),
                source_file: raw.source_file,
                compile_command: raw
                    .compile_command
                    .map(|cmd| into_command(&cmd))
                    .filter(|cmd| !cmd.is_empty()),
                run_command,
            };

            // Add main language name
            languages.insert(name.to_lowercase(), config.clone());

            // Add aliases
            for alias in raw.aliases {
                languages.insert(alias.to_lowercase(), config.clone());
            }
        }

        Ok(Self { languages })
    }

    /// Get language configuration by language name or alias
    pub fn get(&self, language: &str) -> Option<&LanguageConfig> {
        self.languages.get(&language.to_lowercase())
    }

    /// Get all supported language names (aliases excluded), sorted
    pub fn supported_languages(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .languages
            .iter()
            .filter(|(key, config)| **key == config.name)
            .map(|(key, _)| key.clone())
            .collect();
        names.sort();
        names
    }
}

fn into_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_CONFIG: &str = r#"
[c]
source_file = "main.c"
compile_command = "gcc -o main main.c"
run_command = "./main"

[python]
source_file = "main.py"
run_command = "python3 main.py"
aliases = ["py", "python3"]
"#;

    #[test]
    fn test_load_languages() {
        let table = LanguageTable::from_toml_str(TEST_CONFIG).unwrap();

        assert_eq!(table.supported_languages(), vec!["c", "python"]);
        assert_eq!(table.get("PY").unwrap().name, "python");
        assert!(table.get("ruby").is_none());
    }

    #[test]
    fn test_builtin_languages() {
        let table = LanguageTable::builtin().unwrap();

        assert_eq!(
            table.supported_languages(),
            vec!["cpp", "go", "java", "javascript", "python"]
        );
        assert!(table.get("cpp").unwrap().is_compiled());
        assert!(table.get("java").unwrap().is_compiled());
        assert!(!table.get("python").unwrap().is_compiled());
    }

    #[test]
    fn test_interpreted_command_runs_directly() {
        let table = LanguageTable::from_toml_str(TEST_CONFIG).unwrap();
        let cmd = table.get("python").unwrap().command(Path::new("/tmp/x"));

        assert_eq!(cmd.program, "python3");
        assert_eq!(cmd.args, vec!["main.py"]);
        assert_eq!(cmd.work_dir.as_deref(), Some(Path::new("/tmp/x")));
    }

    #[test]
    fn test_compiled_command_is_shell_pipeline() {
        let table = LanguageTable::from_toml_str(TEST_CONFIG).unwrap();
        let cmd = table.get("c").unwrap().command(Path::new("/tmp/x"));

        assert_eq!(cmd.program, "sh");
        assert_eq!(cmd.args, vec!["-c", "gcc -o main main.c && ./main"]);
    }

    #[test]
    fn test_empty_run_command_rejected() {
        let result = LanguageTable::from_toml_str("[bad]\nsource_file = \"a\"\nrun_command = \"\"\n");
        assert!(result.is_err());
    }
}
