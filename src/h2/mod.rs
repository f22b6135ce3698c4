pub mod connection;
pub mod consts;
pub mod framing;
pub mod hpack;
pub mod multiplexer;
pub mod server;

pub use connection::{serve_connection, ConnHandle};
pub use multiplexer::{DefaultMultiplexer, Multiplexer, MultiplexerFactory};
pub use server::Server;
