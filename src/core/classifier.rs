use crate::domain::error::{CommandError, Gc100Error, Gc100Result};

/// First token of every device error response
pub const ERROR_SENTINEL: &str = "unknowncommand";

/// Fail with the device error encoded in `response`, if any.
///
/// Errors are `unknowncommand <code>`: space-separated, unlike normal
/// comma-separated responses. Anything else passes; the protocol has no way
/// to tell whether a response belongs to the command that was sent.
pub fn check_response(response: &str) -> Gc100Result<()> {
    let mut tokens = response.split(' ');
    if tokens.next() != Some(ERROR_SENTINEL) {
        return Ok(());
    }

    let code = tokens.next().unwrap_or_default();
    let code: u16 = code.trim().parse().map_err(|_| {
        Gc100Error::Protocol(format!("Malformed error response: '{}'", response))
    })?;
    Err(CommandError::new(code).into())
}
