pub mod api;
pub mod core;
pub mod scanner;

pub use crate::api::{PipelineEvent, SpotterSession};
pub use crate::core::ScanError;
pub use crate::scanner::{FramePipeline, PipelineConfig};

pub fn init_logging() {
    #[cfg(target_os = "android")]
    {
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(log::LevelFilter::Debug)
                .with_tag("spotter_lib"),
        );
    }

    #[cfg(not(target_os = "android"))]
    {
        // the host application installs its own `log` backend
    }
}
