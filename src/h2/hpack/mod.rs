//! HPACK header compression (RFC 7541).

pub mod block;
pub mod huffman;
pub mod primitive;
pub mod table;

pub use block::{decode_header_block, encode_header_block};
pub use table::{IndexTable, STATIC_TABLE};
