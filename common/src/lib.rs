pub mod arbiter;
pub mod config;
pub mod echo;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod staleness;
pub mod store;
pub mod topics;
pub mod types;
pub mod vane;

pub use arbiter::TemperatureArbiter;
pub use config::{ArbiterConfig, NetworkConfig, RuntimeConfig};
pub use echo::EchoScheduler;
pub use error::ArbiterError;
pub use protocol::{is_reportable_temperature, remote_temperature_byte};
pub use registry::{Source, SourceHandle, SourceKind, SourceRegistry, INTERNAL_SOURCE_ID};
pub use staleness::StalenessMonitor;
pub use store::{Reading, SourceValue, SourceValueStore};
pub use topics::*;
pub use types::{ArbiterAction, ArbiterStatus, FallbackReason, ForwardCause, SourceStatus};
pub use vane::{HorizontalVanePosition, VanePosition};
