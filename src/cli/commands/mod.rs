//! CLI command implementations.

mod captions;
mod classify;
mod config;
mod doctor;
mod enhance;
mod playlist;
mod serve;
mod video;

pub use captions::run_captions;
pub use classify::run_classify;
pub use config::run_config;
pub use doctor::run_doctor;
pub use enhance::run_enhance;
pub use playlist::run_playlist;
pub use serve::run_serve;
pub use video::run_video;
