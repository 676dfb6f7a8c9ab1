//! Protocol types exchanged with an execution module through virtual files.

mod algorithm;
mod record;
mod request;
mod san;
mod usage;
mod validity;

pub use algorithm::*;
pub use record::*;
pub use request::*;
pub use san::*;
pub use usage::*;
pub use validity::*;

/// Virtual file holding the encoded request or input blob.
pub const INPUT_FILE: &str = "input";
/// Virtual file holding the encoded certificate record.
pub const CERT_FILE: &str = "cert";
/// Virtual file holding key PEM: signer/inspect input, raw key output.
pub const KEY_FILE: &str = "key";
