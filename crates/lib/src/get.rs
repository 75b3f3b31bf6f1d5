//! Provider binding generation (`tfstack get`).
//!
//! Clears the codegen output directory, runs a [`BindingGenerator`] and
//! verifies that it produced the directory.

use std::fmt;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

/// Target language of generated bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
  #[default]
  Typescript,
  Python,
  Java,
  Csharp,
  Go,
}

impl Language {
  pub const ALL: [Language; 5] = [
    Language::Typescript,
    Language::Python,
    Language::Java,
    Language::Csharp,
    Language::Go,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Language::Typescript => "typescript",
      Language::Python => "python",
      Language::Java => "java",
      Language::Csharp => "csharp",
      Language::Go => "go",
    }
  }
}

impl fmt::Display for Language {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Language {
  type Err = GetError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Language::ALL
      .into_iter()
      .find(|lang| lang.as_str().eq_ignore_ascii_case(s))
      .ok_or_else(|| GetError::UnknownLanguage(s.to_string()))
  }
}

/// Progress of a get run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GetStatus {
  Starting,
  Generating,
  Done,
}

impl fmt::Display for GetStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GetStatus::Starting => write!(f, "starting"),
      GetStatus::Generating => write!(f, "downloading and generating modules and providers"),
      GetStatus::Done => write!(f, "done"),
    }
  }
}

#[derive(Debug, Error)]
pub enum GetError {
  #[error("unknown language '{0}', expected one of typescript, python, java, csharp, go")]
  UnknownLanguage(String),

  #[error("failed to remove {path}: {source}")]
  Clean {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("no code generator configured")]
  NoGenerator,

  #[error("failed to start code generator {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: io::Error,
  },

  #[error("code generator exited with code {code:?}:\n{stderr}")]
  GeneratorFailed { code: Option<i32>, stderr: String },

  #[error("synthesis failed, expected output directory \"{0}\"")]
  MissingOutput(PathBuf),
}

/// Produces language bindings into a directory.
pub trait BindingGenerator {
  fn generate(&self, language: Language, out_dir: &Path) -> impl Future<Output = Result<(), GetError>>;
}

/// Runs an external generator as `<argv...> --language <lang> --output <dir>`.
#[derive(Debug, Clone)]
pub struct CommandBindingGenerator {
  argv: Vec<String>,
}

impl CommandBindingGenerator {
  pub fn new(argv: Vec<String>) -> Result<Self, GetError> {
    if argv.is_empty() {
      return Err(GetError::NoGenerator);
    }
    Ok(Self { argv })
  }
}

impl BindingGenerator for CommandBindingGenerator {
  async fn generate(&self, language: Language, out_dir: &Path) -> Result<(), GetError> {
    let (program, args) = self.argv.split_first().ok_or(GetError::NoGenerator)?;
    debug!(program = %program, language = %language, out_dir = %out_dir.display(), "running code generator");

    let output = Command::new(program)
      .args(args)
      .arg("--language")
      .arg(language.as_str())
      .arg("--output")
      .arg(out_dir)
      .stdin(Stdio::null())
      .kill_on_drop(true)
      .output()
      .await
      .map_err(|source| GetError::Spawn {
        program: program.clone(),
        source,
      })?;

    if !output.status.success() {
      return Err(GetError::GeneratorFailed {
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
      });
    }
    Ok(())
  }
}

/// Outcome of a successful get run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GetReport {
  pub language: Language,
  pub out_dir: PathBuf,
}

impl GetReport {
  /// Extra guidance for languages whose bindings need a runtime installed.
  pub fn note(&self) -> Option<&'static str> {
    match self.language {
      Language::Go => Some(
        "The generated code depends on jsii-runtime-go. If you haven't yet installed it, you can run go mod tidy to automatically install it.",
      ),
      _ => None,
    }
  }
}

impl fmt::Display for GetReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "Generated {} constructs in the output directory: {}",
      self.language,
      self.out_dir.display()
    )?;
    if let Some(note) = self.note() {
      write!(f, "\n\n{}", note)?;
    }
    Ok(())
  }
}

/// Regenerate bindings for `language` into `out_dir`.
///
/// `on_status` observes Starting, Generating and Done in order.
pub async fn run_get<G, F>(generator: &G, language: Language, out_dir: &Path, mut on_status: F) -> Result<GetReport, GetError>
where
  G: BindingGenerator,
  F: FnMut(GetStatus),
{
  on_status(GetStatus::Starting);

  match std::fs::remove_dir_all(out_dir) {
    Ok(()) => debug!(path = %out_dir.display(), "removed previous bindings"),
    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
    Err(source) => {
      return Err(GetError::Clean {
        path: out_dir.to_path_buf(),
        source,
      });
    }
  }

  on_status(GetStatus::Generating);
  generator.generate(language, out_dir).await?;
  on_status(GetStatus::Done);

  if !out_dir.exists() {
    return Err(GetError::MissingOutput(out_dir.to_path_buf()));
  }

  info!(language = %language, out_dir = %out_dir.display(), "generated bindings");
  Ok(GetReport {
    language,
    out_dir: out_dir.to_path_buf(),
  })
}
