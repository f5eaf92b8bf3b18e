use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

const ENV_PRODUCTION: &str = "production";

/// Namespace value meaning "no namespace was chosen".
pub const UNSET_NAMESPACE: &str = "default";

#[derive(Debug, Deserialize, Clone)]
pub struct Logger {
    pub level: String,
    pub directory: bool,
    pub console: bool,
}

impl Default for Logger {
    fn default() -> Self {
        Logger {
            level: "info".to_string(),
            directory: false,
            console: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Kube {
    /// Path of the kubeconfig file. When absent the client looks at
    /// `$KUBECONFIG` and then `$HOME/.kube/config`.
    pub kubeconfig: Option<String>,
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_namespace() -> String {
    UNSET_NAMESPACE.to_string()
}

impl Default for Kube {
    fn default() -> Self {
        Kube {
            kubeconfig: None,
            namespace: default_namespace(),
        }
    }
}

impl Kube {
    pub fn is_namespace_set(&self) -> bool {
        self.namespace != UNSET_NAMESPACE
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub logger: Logger,
    #[serde(default)]
    pub kube: Kube,
}

impl Settings {
    pub fn mode() -> String {
        env::var("KUBE_JOBS_ENV").unwrap_or_else(|_| ENV_PRODUCTION.into())
    }

    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = Self::mode();
        Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(Environment::default().try_parsing(true).separator("__"))
            .build()?
            .try_deserialize()
    }
}
