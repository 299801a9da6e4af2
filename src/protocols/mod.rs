//! Protocol implementations.
//!
//! - `status`: the `cs3700fall2015` status line protocol. The server sends a
//!   fixed STATUS line after every receive and never parses client input.

pub mod status;
