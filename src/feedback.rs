use std::io::Write;

use crate::domain::{Feedback, ValidationErrors};

/// Reports submission outcomes on stderr, one line per field error.
#[derive(Default, Debug)]
pub struct StdErrFeedback {}

impl StdErrFeedback {
    fn write_invalid<W: Write>(out: &mut W, errors: &ValidationErrors) -> std::io::Result<()> {
        for (path, message) in errors.messages() {
            writeln!(out, "error: {}: {}", path, message)?;
        }
        Ok(())
    }
}

impl Feedback for StdErrFeedback {
    fn invalid(&self, errors: &ValidationErrors) {
        let stderr = std::io::stderr();
        let _ = Self::write_invalid(&mut stderr.lock(), errors);
    }

    fn failure(&self, message: &str) {
        eprintln!("error: {}", message);
    }

    fn success(&self, message: &str) {
        eprintln!("{}", message);
    }
}
