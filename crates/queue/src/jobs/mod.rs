//! Job definitions.

mod send;

pub use send::{Lane, SendTask};
