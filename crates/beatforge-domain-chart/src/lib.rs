pub mod model;
pub mod notes;
pub mod snapshot;
pub mod tempo;

pub use model::*;
pub use notes::*;
pub use snapshot::*;
pub use tempo::*;
