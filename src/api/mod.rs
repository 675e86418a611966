pub mod models;
pub mod session;

pub use models::{Command, PipelineEvent, SessionStats};
pub use session::SpotterSession;
