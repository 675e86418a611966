pub mod events;

pub use events::{Command, PipelineEvent, SessionStats};
