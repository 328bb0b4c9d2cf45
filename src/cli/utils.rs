use serde_json::{json, Value};
use std::io::{self, BufRead, Write};

use crate::cli::OutputFormat;
use crate::config::{self, StorageBackend};
use crate::database::DatabaseManager;

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let Some(Value::Object(fields)) = data {
                if let Some(object) = response.as_object_mut() {
                    object.extend(fields);
                }
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(output_format: &OutputFormat, message: &str, error_code: Option<&str>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": false,
                "message": message
            });

            if let Some(code) = error_code {
                response["code"] = json!(code);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", message);
        }
    }
    Ok(())
}

/// Read one line from stdin after printing `label`. Trailing newline is stripped.
pub fn prompt(label: &str) -> anyhow::Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{}", label)?;
    stdout.flush()?;

    read_line(io::stdin().lock())
}

/// Use the flag value when given, otherwise ask for it without echoing.
pub fn password_or_prompt(password: Option<String>) -> anyhow::Result<String> {
    match password {
        Some(password) => Ok(password),
        None => read_password_prompt("Password: "),
    }
}

/// Prompt on stderr and read a password with terminal echo off.
/// Falls back to a plain read when stdin is not a terminal (piped input).
pub fn read_password_prompt(label: &str) -> anyhow::Result<String> {
    eprint!("{}", label);
    io::stderr().flush()?;

    let password = match read_password_no_echo() {
        Ok(password) => {
            // The user's Enter was not echoed
            eprintln!();
            password
        }
        Err(e) => {
            tracing::debug!("Echo suppression unavailable: {}", e);
            read_line(io::stdin().lock())?
        }
    };
    Ok(password)
}

fn read_line(mut reader: impl BufRead) -> anyhow::Result<String> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Read one line from stdin with echo disabled via termios.
#[cfg(unix)]
fn read_password_no_echo() -> anyhow::Result<String> {
    use std::os::unix::io::AsRawFd;

    let stdin_fd = io::stdin().as_raw_fd();

    let mut termios = unsafe { std::mem::zeroed::<libc::termios>() };
    if unsafe { libc::tcgetattr(stdin_fd, &mut termios) } != 0 {
        anyhow::bail!("stdin is not a terminal");
    }

    let saved = termios;
    termios.c_lflag &= !libc::ECHO;
    if unsafe { libc::tcsetattr(stdin_fd, libc::TCSANOW, &termios) } != 0 {
        anyhow::bail!("tcsetattr failed");
    }

    let result = read_line(io::stdin().lock());

    // Restore echo even when the read failed
    unsafe { libc::tcsetattr(stdin_fd, libc::TCSANOW, &saved) };

    result
}

#[cfg(not(unix))]
fn read_password_no_echo() -> anyhow::Result<String> {
    anyhow::bail!("Password echo suppression not supported on this platform");
}

/// Database manager for CLI commands; these always talk to Postgres.
pub fn database_manager() -> anyhow::Result<DatabaseManager> {
    let mut database = config::config().database.clone();
    if database.backend == StorageBackend::Memory {
        tracing::debug!("Memory backend configured; CLI still uses DATABASE_URL");
        database.backend = StorageBackend::Postgres;
    }
    DatabaseManager::new(&database)
        .map_err(|e| anyhow::anyhow!("{} (set DATABASE_URL to a Postgres connection string)", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn read_line_strips_line_endings_only() {
        assert_eq!(read_line(Cursor::new("  s3cret \r\nnext")).unwrap(), "  s3cret ");
        assert_eq!(read_line(Cursor::new("pw")).unwrap(), "pw");
        assert_eq!(read_line(Cursor::new("")).unwrap(), "");
    }

    #[test]
    fn flag_password_skips_the_prompt() {
        assert_eq!(password_or_prompt(Some("BARA211".to_string())).unwrap(), "BARA211");
    }
}
