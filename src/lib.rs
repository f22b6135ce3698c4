pub mod h2;
pub mod stream;
pub mod types;
pub mod utils;

pub use h2::{ConnHandle, DefaultMultiplexer, Multiplexer, MultiplexerFactory, Server};
pub use types::*;
