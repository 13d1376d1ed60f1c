mod codec;
mod collector;
mod config;
mod container;
mod engine;
mod error;
mod handle;
mod node;

pub mod prelude {
    pub use crate::config::{LogHook, LogRecord, TrotConfig};
    pub use crate::container::ChildKind;
    pub use crate::engine::Trot;
    pub use crate::error::{ErrorClass, TrotError, TrotErrorKind, TrotResult};
    pub use crate::handle::ListHandle;
}

pub use prelude::*;
