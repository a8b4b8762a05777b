use thiserror::Error;

/// One client command. Newline-terminated ASCII on the wire, case
/// insensitive, one response line per request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Request {
    Stop,
    MoveTo { az: f64, el: f64 },
    Left,
    Right,
    Up,
    Down,
    Read,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    #[error("unknown command '{0}', type HELP for commands")]
    UnknownCommand(String),
    #[error("usage: MOVETO <az> <el>")]
    BadMoveTo,
}

pub const HELP_TEXT: &str =
    "Available commands: STOP (or X), MOVETO <az> <el>, LEFT, RIGHT, UP, DOWN, READ, HELP, QUIT";

pub fn parse_request(line: &str) -> Result<Request, ProtocolError> {
    let mut words = line.split_whitespace();
    let verb = words
        .next()
        .map(str::to_uppercase)
        .unwrap_or_default();

    let request = match verb.as_str() {
        "STOP" | "X" => Request::Stop,
        "MOVETO" => {
            let az = words.next().and_then(|w| w.parse().ok());
            let el = words.next().and_then(|w| w.parse().ok());
            match (az, el, words.next()) {
                (Some(az), Some(el), None) => Request::MoveTo { az, el },
                _ => return Err(ProtocolError::BadMoveTo),
            }
        }
        "LEFT" => Request::Left,
        "RIGHT" => Request::Right,
        "UP" => Request::Up,
        "DOWN" => Request::Down,
        "READ" => Request::Read,
        "HELP" => Request::Help,
        "QUIT" => Request::Quit,
        _ => return Err(ProtocolError::UnknownCommand(line.trim().to_string())),
    };
    Ok(request)
}
