pub mod clock;
pub mod config;
pub mod dispatch;
pub mod ipc;
pub mod metronome;
pub mod note_scanner;
pub mod params;
pub mod playback_engine;
pub mod scanner;
pub mod voice_pool;

pub use clock::*;
pub use config::*;
pub use dispatch::*;
pub use ipc::*;
pub use metronome::*;
pub use note_scanner::*;
pub use params::*;
pub use playback_engine::*;
pub use scanner::*;
pub use voice_pool::*;
