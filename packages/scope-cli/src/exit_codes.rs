//! Process exit codes shared by all subcommands.

use scope_rs::ConvertError;

pub const SUCCESS: i32 = 0;
/// Bad arguments, missing input, or an unreadable/undecodable file.
pub const INPUT_ERROR: i32 = 1;
/// I/O or database failure while running.
pub const EXECUTION_ERROR: i32 = 2;
/// The run finished but at least one file was skipped.
pub const PARTIAL_FAILURE: i32 = 3;

/// Exit code for a fatal conversion error.
pub fn for_error(error: &ConvertError) -> i32 {
    match error {
        ConvertError::InputNotFound(_)
        | ConvertError::InvalidConfig(_)
        | ConvertError::Pattern(_)
        | ConvertError::MissingTable(_) => INPUT_ERROR,
        ConvertError::IoError(_) | ConvertError::Database(_) | ConvertError::Cancelled(_) => {
            EXECUTION_ERROR
        }
    }
}
