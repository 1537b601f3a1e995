//! Live companion session — streams microphone and camera media to the
//! hosted AI service and plays back streamed audio responses.

pub mod protocol;
pub mod session;

pub use session::{LiveEvent, LiveSession};
