/// Process-wiring errors: anything that can go wrong assembling or running
/// `AppState`, distinct from the per-crate errors it wires together.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("config error: {0}")]
    Config(#[from] judgeflow_config::ConfigError),

    #[error("no llm provider named {0:?} is configured")]
    UnknownLlmProvider(String),
}
