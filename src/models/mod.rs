pub mod request;
pub mod task;

pub use request::*;
pub use task::*;
