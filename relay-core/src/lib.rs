pub mod code;
pub mod reveal;
pub mod rotation;
pub mod session;
pub mod submission;

// Re-export main components
pub use code::*;
pub use reveal::*;
pub use rotation::*;
pub use session::*;
pub use submission::*;
