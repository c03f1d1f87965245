pub mod api;
pub mod channel;
pub mod controller;
pub mod persist;

pub use api::*;
pub use channel::*;
pub use controller::*;
pub use persist::*;
