pub mod config;
pub mod pipeline;
pub mod sink;
pub mod source;

pub use config::Config;
pub use pipeline::Pipeline;
