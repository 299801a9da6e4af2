//! Status protocol implementation.
//!
//! A test peer for clients of the `cs3700fall2015` line protocol:
//! - Client sends: anything (never parsed)
//! - Server responds: `cs3700fall2015 STATUS 5 + 6\n` after every read
//!
//! ## Behavior
//!
//! 1. **One reply per read**: every completed read produces one STATUS line,
//!    including reads that return no bytes because the peer closed its write
//!    half. The loop does not stop on end of stream; it stops only when a
//!    read or write fails.
//!
//! 2. **BYE at a fixed iteration**: when the iteration counter equals the
//!    configured value (1000), `cs3700fall2015 BYE 24601\n` is written
//!    immediately before that iteration's STATUS line. The session keeps
//!    going afterwards.
//!
//! 3. **No timeouts**: a read waits as long as the peer stays silent.
//!
//! ## Protocol Format
//!
//! ```text
//! Request:  hi
//! Response: cs3700fall2015 STATUS 5 + 6\n
//!
//! Request (counter == 1000):  x
//! Response: cs3700fall2015 BYE 24601\n
//!           cs3700fall2015 STATUS 5 + 6\n
//! ```

pub mod handler;
pub mod message;

pub use handler::{handle_connection, SessionError};
