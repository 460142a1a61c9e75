use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use roomdrop_daemon::registry::{ApiClient, ApiError};
use roomdrop_daemon::state::{AppState, StateError};

/// Shared inputs of every command
#[derive(Debug, Clone)]
pub struct OpContext {
    /// Roomdrop directory override (`--config-path`)
    pub config_path: Option<PathBuf>,
    /// Registry URL override (`--remote`)
    pub remote: Option<Url>,
}

impl OpContext {
    pub fn new(config_path: Option<PathBuf>, remote: Option<Url>) -> Self {
        Self {
            config_path,
            remote,
        }
    }

    pub fn state(&self) -> Result<AppState, StateError> {
        AppState::load(self.config_path.clone())
    }

    /// Registry client for the configured (or overridden) server
    pub fn client(&self, state: &AppState) -> Result<ApiClient, OpContextError> {
        let remote = match &self.remote {
            Some(remote) => remote.clone(),
            None => Url::parse(&state.config.server_url)?,
        };
        let timeout = Duration::from_secs(state.config.request_timeout_secs);
        Ok(ApiClient::with_timeout(&remote, Some(timeout))?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OpContextError {
    #[error("invalid server url: {0}")]
    Url(#[from] url::ParseError),
    #[error("failed to build client: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;
    type Output: std::fmt::Display + std::fmt::Debug;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

/// Build a clap subcommand enum over a list of ops, plus the matching
/// `OpOutput`/`OpError` enums and an `Op` impl that dispatches to the variant.
#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $op:ty)),* $(,)?) => {
        #[derive(clap::Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($op),)*
        }

        #[derive(Debug)]
        pub enum OpOutput {
            $($variant(<$op as $crate::cli::op::Op>::Output),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$op as $crate::cli::op::Op>::Error),
            )*
        }

        impl std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(OpOutput::$variant(output) => write!(f, "{}", output),)*
                }
            }
        }

        #[async_trait::async_trait]
        impl $crate::cli::op::Op for Command {
            type Error = OpError;
            type Output = OpOutput;

            async fn execute(
                &self,
                ctx: &$crate::cli::op::OpContext,
            ) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => op
                            .execute(ctx)
                            .await
                            .map(OpOutput::$variant)
                            .map_err(OpError::$variant),
                    )*
                }
            }
        }
    };
}
