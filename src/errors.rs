/// Failure taxonomy for a probe run.
///
/// `Transport` covers connection and timeout faults, `UnexpectedStatus` and
/// `Contract` cover violations of the target's documented behaviour. No
/// variant is recovered from locally; the enclosing probe aborts on the first
/// error and only best-effort cleanup runs afterwards.
#[derive(thiserror::Error, Debug)]
pub enum ProbeError {
    #[error("Request to {endpoint} failed")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned {actual}, expected {expected}")]
    UnexpectedStatus {
        endpoint: String,
        expected: String,
        actual: u16,
    },
    #[error("Contract violation at {endpoint}: {message}")]
    Contract { endpoint: String, message: String },
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl ProbeError {
    pub fn contract(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Contract {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    pub fn transport(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            source,
        }
    }
}
