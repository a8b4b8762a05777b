mod protocol;
mod server;

pub use protocol::{parse_request, ProtocolError, Request, HELP_TEXT};
pub use server::{run_service, CommandExecutor};
