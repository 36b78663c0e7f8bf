pub use clock::{unix_now_ms, ClockOffset};
pub use config::{ConfigError, ConfigFile, ConfigManager, Settings};
pub use messages::{ClientMessage, ServerMessage};
pub use scheduler::{flash_phase, schedule_frame, FramePosition};
pub use session::{SessionController, SessionStart, TriggerError};
pub use show::model::{Routine, ShowState, ShowStateUpdate, Step, StepKind, StepParams};
pub use show::replicator::{ReplicateError, StateReplicator};

mod clock;
mod config;
pub mod messages;
mod scheduler;
mod session;
mod show;
