pub mod config;
pub mod events;
pub mod types;

pub use config::*;
pub use events::{CloudEvent, EventProvider, IoEvent, IoEventKind};
pub use types::*;
