//! Account management commands.

use std::io::{BufRead, Write as _};

use tamarind_core::Role;
use tamarind_server::db::users::{self, NewUser};
use tamarind_server::services::password;

use super::{CliError, connect};

/// Create an account with a hashed credential.
///
/// # Errors
///
/// Returns an error for an unknown role, a taken username, or a database
/// failure.
pub async fn create(
    username: &str,
    name: &str,
    role: &str,
    password_arg: Option<&str>,
) -> Result<(), CliError> {
    let role: Role = role.parse().map_err(CliError::Invalid)?;

    let password = match password_arg {
        Some(p) => p.to_owned(),
        None => prompt_password()?,
    };
    if password.len() < 4 {
        return Err(CliError::Invalid(
            "password must be at least 4 characters".to_owned(),
        ));
    }

    let pool = connect().await?;

    let user = users::create(
        &pool,
        &NewUser {
            username: username.to_owned(),
            credential: password::hash_password(&password),
            name: name.to_owned(),
            role,
        },
    )
    .await?;

    tracing::info!(user = %user.username, role = %user.role, id = %user.id, "account created");

    Ok(())
}

#[allow(clippy::print_stderr)]
fn prompt_password() -> Result<String, CliError> {
    eprint!("Password: ");
    std::io::stderr()
        .flush()
        .map_err(|e| CliError::Invalid(e.to_string()))?;

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| CliError::Invalid(e.to_string()))?;

    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}
