//! External compiler capability. Traversal code only sees the
//! [`ContractInspector`] trait; [`ForgeInspector`] backs it with
//! `forge inspect`.

use crate::sources::ContractRef;
use serde_json::Value;
use std::{collections::BTreeMap, path::PathBuf, process::Command};
use tracing::debug;

/// Function signature to 4-byte selector hex (no `0x`), as `forge inspect
/// <contract> methods` prints it.
pub type MethodTable = BTreeMap<String, String>;

#[derive(Debug, thiserror::Error)]
pub enum InspectError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with {status}: {output}")]
    Failed {
        command: String,
        status: std::process::ExitStatus,
        output: String,
    },
    #[error("no `{open}`...`{close}` block in tool output")]
    MissingDelimiters { open: char, close: char },
    #[error("malformed JSON in tool output: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait ContractInspector {
    /// ABI fragments of one contract.
    fn abi(&self, contract: &ContractRef) -> Result<Vec<Value>, InspectError>;

    /// Method signatures and selectors of one contract.
    fn methods(&self, contract: &ContractRef) -> Result<MethodTable, InspectError>;
}

#[derive(Debug, Clone)]
pub struct ForgeInspector {
    program: String,
    workdir: Option<PathBuf>,
}

impl ForgeInspector {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            workdir: None,
        }
    }

    /// Runs the tool from `dir` instead of the current directory.
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    fn inspect(&self, contract: &ContractRef, view: &str) -> Result<String, InspectError> {
        let target = contract.to_string();
        let command = format!("{} inspect {} {}", self.program, target, view);
        debug!(%command, "running inspector");

        let mut cmd = Command::new(&self.program);
        cmd.arg("inspect").arg(&target).arg(view);
        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().map_err(|source| InspectError::Spawn {
            command: command.clone(),
            source,
        })?;

        if !output.status.success() {
            let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
            text.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(InspectError::Failed {
                command,
                status: output.status,
                output: text.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl ContractInspector for ForgeInspector {
    fn abi(&self, contract: &ContractRef) -> Result<Vec<Value>, InspectError> {
        extract_array(&self.inspect(contract, "abi")?)
    }

    fn methods(&self, contract: &ContractRef) -> Result<MethodTable, InspectError> {
        extract_object(&self.inspect(contract, "methods")?)
    }
}

/// The text between the first `open` and the last `close`, both included.
pub fn delimited(output: &str, open: char, close: char) -> Result<&str, InspectError> {
    match (output.find(open), output.rfind(close)) {
        (Some(start), Some(end)) if start < end => Ok(&output[start..=end]),
        _ => Err(InspectError::MissingDelimiters { open, close }),
    }
}

/// Parses the outermost JSON array embedded in tool output.
pub fn extract_array(output: &str) -> Result<Vec<Value>, InspectError> {
    Ok(serde_json::from_str(delimited(output, '[', ']')?)?)
}

/// Parses the outermost JSON object embedded in tool output.
pub fn extract_object(output: &str) -> Result<MethodTable, InspectError> {
    Ok(serde_json::from_str(delimited(output, '{', '}')?)?)
}
