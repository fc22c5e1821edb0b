//! `login`, `logout` and `whoami`: the persisted staff/student session.

use dialoguer::Input;
use secrecy::SecretString;

use prepdesk_api::SessionUser;

use crate::cli::{GlobalOpts, LoginArgs};
use crate::commands::util;
use crate::config;
use crate::error::CliError;
use crate::output;

/// Read from the environment before prompting, for scripted logins.
const PASSWORD_ENV: &str = "PREPDESK_PASSWORD";

pub async fn login(args: LoginArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = config::resolve(global)?;
    let (client, _session) = resolved.session_client()?;
    let interactive = util::interactive(false);

    let email = match args.email {
        Some(email) => email,
        None if interactive => Input::<String>::new()
            .with_prompt("Email")
            .interact_text()
            .map_err(CliError::prompt)?,
        None => {
            return Err(CliError::Validation {
                field: "email".into(),
                reason: "pass --email or set PREPDESK_EMAIL".into(),
            });
        }
    };

    let password = match std::env::var(PASSWORD_ENV) {
        Ok(password) => password,
        Err(_) if interactive => rpassword::prompt_password("Password: ").map_err(CliError::prompt)?,
        Err(_) => {
            return Err(CliError::Validation {
                field: "password".into(),
                reason: format!("set {PASSWORD_ENV} when running without a terminal"),
            });
        }
    };

    if email.trim().is_empty() || password.is_empty() {
        return Err(CliError::Validation {
            field: "credentials".into(),
            reason: "email and password cannot be empty".into(),
        });
    }

    let user = client
        .login(email.trim(), &SecretString::from(password))
        .await?;
    tracing::info!(profile = %resolved.profile_name, "signed in");

    if !global.quiet {
        eprintln!("✓ Signed in to profile '{}'", resolved.profile_name);
    }
    if let Some(user) = user {
        render_user(&user, global)?;
    }
    Ok(())
}

pub async fn logout(global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = config::resolve(global)?;
    let (client, session) = resolved.session_client()?;

    if !session.is_authenticated() {
        if !global.quiet {
            eprintln!("Not signed in.");
        }
        return Ok(());
    }

    client.logout().await?;
    if !global.quiet {
        eprintln!("✓ Signed out of profile '{}'", resolved.profile_name);
    }
    Ok(())
}

pub async fn whoami(global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = config::resolve(global)?;
    let (client, session) = resolved.session_client()?;

    if !session.is_authenticated() {
        return Err(CliError::NotLoggedIn);
    }

    let user = client.me().await?;
    render_user(&user, global)
}

fn render_user(user: &SessionUser, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(
        global.output,
        user,
        |u| {
            output::detail_table(&[
                ("Name", output::or_dash(u.name.as_deref())),
                ("Email", output::or_dash(u.email.as_deref())),
                ("Role", output::or_dash(u.role.as_deref())),
                ("ID", output::or_dash(u.id.as_deref())),
            ])
        },
        |u| u.email.clone().or_else(|| u.id.clone()).unwrap_or_default(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
