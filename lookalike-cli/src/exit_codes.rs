//! Exit codes following sysexits.h conventions.
//!
//! These codes provide semantic meaning for different failure modes,
//! enabling scripts and CI systems to handle errors appropriately.

use std::io::ErrorKind;

use lookalike_core::LookalikeError;

/// Successful execution (for `match`: the query matched).
pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// The query was processed but matched nothing within the threshold.
pub const NOT_RELEVANT: i32 = 2;

/// Command line usage error (invalid arguments or configuration).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Data format error (invalid image, corrupt hash store).
/// Maps to EX_DATAERR from sysexits.h.
pub const DATA_ERROR: i32 = 65;

/// Cannot open input file or dataset directory.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// I/O error (cannot write output file).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Help text appended to `--help`.
pub const HELP: &str = "Exit codes:
  0   success (match: the image matched)
  2   match: the image is not relevant
  64  usage error
  65  invalid image or corrupt hash store
  66  input file or dataset not found
  74  I/O error writing output";

/// Represents an exit code with optional error context.
#[derive(Debug)]
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

    pub const fn not_relevant() -> Self {
        Self {
            code: NOT_RELEVANT,
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

        // Prefer the typed core error anywhere in the chain
        let typed = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<LookalikeError>())
            .map(classify_core_error);

        let code = typed.unwrap_or_else(|| {
            if message.contains("Failed to read") {
                INPUT_ERROR
            } else if message.contains("Failed to write") {
                IO_ERROR
            } else {
                GENERAL_ERROR
            }
        });

        Self {
            code,
            message: Some(message),
        }
    }
}

fn classify_core_error(err: &LookalikeError) -> i32 {
    match err {
        LookalikeError::DecodeFailure(_)
        | LookalikeError::MalformedHash(_)
        | LookalikeError::CorruptStore { .. }
        | LookalikeError::LengthMismatch { .. } => DATA_ERROR,
        LookalikeError::InvalidConfig(_) => USAGE_ERROR,
        LookalikeError::DatasetUnavailable { .. } => INPUT_ERROR,
        LookalikeError::Io(e) if e.kind() == ErrorKind::NotFound => INPUT_ERROR,
        LookalikeError::Io(_) => IO_ERROR,
    }
}
