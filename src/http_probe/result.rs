use thiserror::Error;

/// Failure of a single trial, tagged with the phase that broke.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("unable to connect")]
    Connect(#[source] std::io::Error),

    #[error("keepalive write failed")]
    Keepalive(#[source] std::io::Error),

    #[error("tls handshake failed")]
    Tls(#[source] native_tls::Error),

    #[error("http handshake failed")]
    Handshake(#[source] hyper::Error),

    #[error("unable to construct request")]
    Request(#[source] hyper::http::Error),

    #[error("unable to execute request")]
    Transport(#[source] hyper::Error),

    #[error("unable to read response")]
    Read(#[source] hyper::Error),
}

/// What one connect-wait-request cycle produced.
#[derive(Debug)]
pub enum TrialOutcome {
    /// The request never completed: dial, idle-wait, handshake or transport
    /// failure.
    RequestError(ProbeError),

    /// A response came back but its body could not be read in full.
    ReadError(ProbeError),

    /// Full response read; size of the body in bytes.
    Success { bytes: usize },
}

impl From<Result<usize, ProbeError>> for TrialOutcome {
    fn from(result: Result<usize, ProbeError>) -> Self {
        match result {
            Ok(bytes) => TrialOutcome::Success { bytes },
            Err(err @ ProbeError::Read(_)) => TrialOutcome::ReadError(err),
            Err(err) => TrialOutcome::RequestError(err),
        }
    }
}

#[cfg(test)]
pub mod test {
    use super::*;
    use std::io;

    #[test]
    fn connect_failures_count_against_the_request() {
        let err = ProbeError::Connect(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert!(matches!(
            TrialOutcome::from(Err::<usize, _>(err)),
            TrialOutcome::RequestError(_)
        ));
    }

    #[test]
    fn a_full_body_is_a_success_with_its_size() {
        assert!(matches!(
            TrialOutcome::from(Ok::<_, ProbeError>(1517)),
            TrialOutcome::Success { bytes: 1517 }
        ));
    }
}
