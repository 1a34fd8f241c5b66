pub mod probe;
pub mod result;

pub mod prelude {
    pub use super::probe::{build_request, run_trial};
    pub use super::report;
    pub use super::result::{ProbeError, TrialOutcome};
}

use std::fmt::Write;

/// Render an error and its source chain on one log line.
pub fn report(mut err: &(dyn std::error::Error + 'static)) -> String {
    let mut s = format!("{}", err);
    while let Some(src) = err.source() {
        let _ = write!(s, ": {}", src);
        err = src;
    }
    s
}

#[cfg(test)]
pub mod test {
    use super::prelude::*;
    use std::io;

    #[test]
    fn report_flattens_the_source_chain() {
        let err = ProbeError::Connect(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));
        assert_eq!(report(&err), "unable to connect: connection refused");
    }
}
