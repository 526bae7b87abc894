//! Fatal error reporting

use tracing::error;

use crate::error::{describe_error_code, PipelineError};

/// Print an error and exit with its status code
///
/// [`PipelineError`]s print their user message, plus the full context chain
/// when `verbose >= 1`. Anything else prints its anyhow chain.
pub fn handle_fatal_error(error: anyhow::Error, verbose: u8) -> ! {
    error!("Fatal error: {}", error);
    std::process::exit(report_error(&error, verbose))
}

/// Print the error and return the exit code it maps to
pub fn report_error(error: &anyhow::Error, verbose: u8) -> i32 {
    let (text, code) = render_error(error, verbose);
    eprintln!("{}", text);
    code
}

/// Text shown for a fatal error, with its exit code
fn render_error(error: &anyhow::Error, verbose: u8) -> (String, i32) {
    if let Some(pipeline_err) = error.downcast_ref::<PipelineError>() {
        let mut text = pipeline_err.user_message();
        if verbose >= 1 {
            let code = pipeline_err.code();
            text.push_str(&format!(
                "\n\nE{:04}: {}\nContext Chain:\n{}",
                code,
                describe_error_code(code),
                pipeline_err.developer_message()
            ));
        }
        return (text, pipeline_err.exit_code());
    }

    let mut text = format!("Error: {error}");
    if verbose >= 1 {
        text.push_str("\n\nError chain:");
        for (i, cause) in error.chain().enumerate() {
            text.push_str(&format!("\n  {}: {}", i, cause));
        }
    }
    (text, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_errors_keep_their_exit_code() {
        let err = PipelineError::config("bad ratio");
        let expected = err.exit_code();
        assert_eq!(report_error(&anyhow::Error::new(err), 0), expected);
    }

    #[test]
    fn test_other_errors_exit_with_one() {
        assert_eq!(report_error(&anyhow::anyhow!("plain failure"), 1), 1);
    }

    #[test]
    fn test_verbose_output_describes_the_code() {
        let err = PipelineError::storage_with_code(
            crate::error::ErrorCode::STORAGE_CORRUPTED,
            "model contains a malformed tree",
            None,
        );
        let error = anyhow::Error::new(err);

        let (quiet, _) = render_error(&error, 0);
        assert!(!quiet.contains("E3006"));

        let (verbose, code) = render_error(&error, 1);
        assert!(verbose.contains("E3006: Artifact is corrupted"), "{}", verbose);
        assert_eq!(code, 4);
    }
}
