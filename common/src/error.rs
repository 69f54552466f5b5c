use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArbiterError {
    #[error("temperature source '{0}' is already registered")]
    DuplicateSource(String),
    #[error("unknown temperature source '{0}'")]
    UnknownSource(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("temperature {value} from '{source_id}' is out of range")]
    ReadingOutOfRange { source_id: String, value: f32 },
    #[error("unknown {select} option '{label}'")]
    UnknownOption { select: &'static str, label: String },
}
