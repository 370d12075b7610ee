pub mod convert;
pub mod paste;
pub mod play;
