pub mod audio;
pub mod clock;
pub mod playback;
pub mod types;

pub use audio::*;
pub use clock::*;
pub use playback::*;
pub use types::*;
