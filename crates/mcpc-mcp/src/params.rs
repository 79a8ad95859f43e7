//! Launch parameters for an MCP server script.

use crate::error::McpError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// How to launch one MCP server.
#[derive(Debug, Clone)]
pub struct ServerParams {
    /// Path to the server script or executable.
    pub script: PathBuf,
    /// Interpreter command line (e.g. `"uv run python"`). When unset, it is
    /// chosen from the script's extension.
    pub interpreter: Option<String>,
    /// Extra arguments passed to the script.
    pub args: Vec<String>,
}

impl ServerParams {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
            interpreter: None,
            args: Vec::new(),
        }
    }

    pub fn with_interpreter(mut self, interpreter: Option<String>) -> Self {
        self.interpreter = interpreter.filter(|i| !i.trim().is_empty());
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Resolve the program and argument list used to start the server.
    ///
    /// Fails with [`McpError::ServerLaunch`] if the script does not exist.
    pub fn command_line(&self) -> Result<(OsString, Vec<OsString>), McpError> {
        let script = std::fs::canonicalize(&self.script).map_err(|e| McpError::ServerLaunch {
            path: self.script.display().to_string(),
            message: format!("server script not found ({e})"),
        })?;
        if !script.is_file() {
            return Err(McpError::ServerLaunch {
                path: script.display().to_string(),
                message: "not a file".to_string(),
            });
        }

        let interpreter = self
            .interpreter
            .clone()
            .or_else(|| default_interpreter(&script).map(str::to_string));

        let mut args: Vec<OsString> = Vec::new();
        let program = match interpreter {
            Some(interp) => {
                let mut parts = interp.split_whitespace().map(OsString::from);
                // `with_interpreter` drops blank strings, so there is a first word.
                let program = parts.next().unwrap_or_else(|| OsString::from(&interp));
                args.extend(parts);
                args.push(script.into_os_string());
                program
            }
            None => script.into_os_string(),
        };
        args.extend(self.args.iter().map(OsString::from));

        Ok((program, args))
    }
}

/// Interpreter for a script, chosen by file extension.
///
/// `None` means the file is executed directly.
pub fn default_interpreter(script: &Path) -> Option<&'static str> {
    let ext = script.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "py" => Some(if cfg!(windows) { "python" } else { "python3" }),
        "js" | "mjs" | "cjs" => Some("node"),
        _ => None,
    }
}
