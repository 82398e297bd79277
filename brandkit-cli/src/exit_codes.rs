//! Exit codes following sysexits.h conventions.
//!
//! These codes provide semantic meaning for different failure modes,
//! enabling scripts and CI systems to handle errors appropriately.

#![allow(dead_code)] // Constants may be used in future or for documentation

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Command line usage error (invalid arguments, missing credential).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Cannot open input file.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// Service unavailable (advisor or generation API).
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const NETWORK_ERROR: i32 = 69;

/// I/O error (cannot write output file).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub const fn success() -> Self {
        Self {
            code: SUCCESS,
            message: None,
        }
    }

    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        // Classify error by inspecting the chain
        let code = if message.contains("Failed to read") {
            INPUT_ERROR
        } else if message.contains("No API key") || message.contains("aspect ratio") {
            USAGE_ERROR
        } else if message.contains("Image generation failed")
            || message.contains("advisor")
            || message.contains("network")
        {
            NETWORK_ERROR
        } else if message.contains("Failed to write") {
            IO_ERROR
        } else {
            GENERAL_ERROR
        };

        Self {
            code,
            message: Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let read = anyhow::anyhow!("Failed to read file: a.png");
        assert_eq!(ExitCode::from_anyhow(&read).code, INPUT_ERROR);

        let key = anyhow::anyhow!("No API key: pass --api-key");
        assert_eq!(ExitCode::from_anyhow(&key).code, USAGE_ERROR);

        let write = anyhow::anyhow!("Failed to write archive: out.zip");
        assert_eq!(ExitCode::from_anyhow(&write).code, IO_ERROR);

        let other = anyhow::anyhow!("something else entirely");
        assert_eq!(ExitCode::from_anyhow(&other).code, GENERAL_ERROR);
    }
}
