//! Status protocol messages.

/// Course tag that opens every protocol line.
pub const PROTOCOL_TAG: &str = "cs3700fall2015";

/// Secret carried by the BYE line.
const BYE_SECRET: &str = "24601";

/// A line the server can put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// An arithmetic problem for the client to solve.
    Status { lhs: i64, op: char, rhs: i64 },
    /// End of session, with the flag the client should report.
    Bye(String),
}

impl Message {
    /// The problem sent after every read: `5 + 6`.
    pub fn status() -> Self {
        Message::Status {
            lhs: 5,
            op: '+',
            rhs: 6,
        }
    }

    /// The BYE line sent once, on the configured iteration.
    pub fn bye() -> Self {
        Message::Bye(BYE_SECRET.to_string())
    }

    /// Encode as a newline-terminated protocol line.
    pub fn encode(&self) -> Vec<u8> {
        let body = match self {
            Message::Status { lhs, op, rhs } => format!("STATUS {lhs} {op} {rhs}"),
            Message::Bye(secret) => format!("BYE {secret}"),
        };
        format!("{PROTOCOL_TAG} {body}\n").into_bytes()
    }
}

/// Lines written for one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// The STATUS line only.
    Status,
    /// The BYE line followed by the STATUS line.
    ByeThenStatus,
}

/// Decide what to write on `iteration`. The counter starts at 0, so with
/// `bye_at == 1000` the BYE goes out in reply to the 1001st read.
pub fn reply_for(iteration: u64, bye_at: u64) -> Reply {
    if iteration == bye_at {
        Reply::ByeThenStatus
    } else {
        Reply::Status
    }
}
