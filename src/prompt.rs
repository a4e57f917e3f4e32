//! Interactive credential collection.

use std::io::{self, BufRead, Write};

use crate::models::Credentials;

pub const USERNAME_PROMPT: &str = "Enter WeatherXM username: ";
pub const PASSWORD_PROMPT: &str = "Enter WeatherXM password: ";

/// Asks for the username, then the password, one line each.
///
/// Values are taken as typed; only the line terminator is removed.
/// Empty values are passed through and left for the server to reject.
pub fn read_credentials<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> io::Result<Credentials> {
    let username = ask(input, output, USERNAME_PROMPT)?;
    let password = ask(input, output, PASSWORD_PROMPT)?;
    Ok(Credentials { username, password })
}

fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, prompt: &str) -> io::Result<String> {
    output.write_all(prompt.as_bytes())?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "input closed before a value was entered",
        ));
    }
    let trimmed = line.strip_suffix('\n').unwrap_or(&line);
    let trimmed = trimmed.strip_suffix('\r').unwrap_or(trimmed);
    Ok(trimmed.to_string())
}
