use kube::config::KubeconfigError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("active namespace was not set")]
    NotConfigured,

    #[error("{0}")]
    Usage(String),

    #[error("job {0} has no uid, it must be created before pods can reference it")]
    MissingJobUid(String),

    #[error("error loading kubeconfig: {0}")]
    Kubeconfig(
        #[from]
        #[source]
        KubeconfigError,
    ),

    #[error("error while interacting with the kubernetes API: {0}")]
    Client(
        #[from]
        #[source]
        kube::Error,
    ),

    #[error("error loading settings: {0}")]
    Settings(
        #[from]
        #[source]
        config::ConfigError,
    ),
}

impl Error {
    /// True when the API server rejected a create because the object is already there.
    pub fn is_already_exists(&self) -> bool {
        match self {
            Error::Client(err) => is_already_exists(err),
            _ => false,
        }
    }
}

pub fn is_already_exists(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(response) if response.reason == "AlreadyExists")
}
