/// Failures talking to a collage provider or score sink.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid server url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("server answered {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("could not decode response: {0}")]
    Decode(#[source] std::io::Error),

    #[error("collage {0} not found")]
    NotFound(String),

    #[error("malformed collage file {path}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("leaderboard storage error")]
    Storage(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<ureq::Error> for ApiError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => ApiError::Status {
                url: response.get_url().to_string(),
                status,
            },
            ureq::Error::Transport(transport) => ApiError::Transport {
                url: transport
                    .url()
                    .map(|u| u.to_string())
                    .unwrap_or_default(),
                reason: transport.to_string(),
            },
        }
    }
}

/// Why a collage record cannot be turned into a playable round.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoundError {
    #[error("collage has no target photo")]
    NoTarget,

    #[error("collage has {slots} slots but no decoy photos")]
    NoDecoys { slots: usize },
}

/// Start requests the session refuses. None of these change session state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StartRejected {
    #[error("no collage loaded")]
    NoCollage,

    #[error("collage is still loading")]
    NotReady,

    #[error("a round is already running")]
    AlreadyRunning,
}

/// Hint requests the session refuses. None of these change session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HintRejected {
    #[error("no round in progress")]
    NotActive,

    #[error("no hints left")]
    NoneRemaining,

    #[error("hint is cooling down")]
    CoolingDown,
}
