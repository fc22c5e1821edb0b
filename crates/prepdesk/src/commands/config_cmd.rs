//! Config subcommand handlers.

use dialoguer::{Input, Select};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Mask plaintext secrets before showing a config.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.internal_key.is_some() {
            profile.internal_key = Some("****".into());
        }
    }
    cfg
}

/// Format config for display as TOML-ish text.
fn format_config(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);

    for name in cfg.profile_names() {
        let p = &cfg.profiles[&name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "api_url = \"{}\"", p.api_url);
        if let Some(ref key) = p.internal_key {
            let _ = writeln!(out, "internal_key = \"{key}\"");
        }
        if let Some(ref env) = p.internal_key_env {
            let _ = writeln!(out, "internal_key_env = \"{env}\"");
        }
        if let (Some(lat), Some(lon)) = (p.latitude, p.longitude) {
            let _ = writeln!(out, "latitude = {lat}");
            let _ = writeln!(out, "longitude = {lon}");
        }
        if let Some(ref url) = p.geolocation_url {
            let _ = writeln!(out, "geolocation_url = \"{url}\"");
        }
        if let Some(secs) = p.geolocation_timeout_secs {
            let _ = writeln!(out, "geolocation_timeout_secs = {secs}");
        }
        if let Some(secs) = p.maximum_age_secs {
            let _ = writeln!(out, "maximum_age_secs = {secs}");
        }
        if let Some(secs) = p.toast_cooldown_secs {
            let _ = writeln!(out, "toast_cooldown_secs = {secs}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
    }

    out
}

fn prompt_coordinate(label: &str, range: f64) -> Result<f64, CliError> {
    Input::<f64>::new()
        .with_prompt(label)
        .validate_with(move |v: &f64| {
            if v.is_finite() && v.abs() <= range {
                Ok(())
            } else {
                Err(format!("must be between -{range} and {range}"))
            }
        })
        .interact_text()
        .map_err(CliError::prompt)
}

/// Ask for the internal-access key and where to keep it.
///
/// Returns the plaintext to write into the profile, if the user chose that.
fn prompt_internal_key(profile_name: &str) -> Result<Option<String>, CliError> {
    let key = rpassword::prompt_password("Internal-access key (leave empty for none): ")
        .map_err(CliError::prompt)?;
    if key.is_empty() {
        return Ok(None);
    }

    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt("Where to store the key?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(CliError::prompt)?;

    if selection == 0 {
        prepdesk_config::store_internal_key(profile_name, &key)?;
        eprintln!("   ✓ Key stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(key))
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(global),

        ConfigCommand::Show => {
            let cfg = redacted(&config::load_config()?);
            let out = output::render_single(global.output, &cfg, format_config, |c| {
                c.profile_names().join("\n")
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }
    }
}

/// Interactive wizard. Adds (or replaces) one profile and makes it the
/// default; other profiles are kept.
fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let config_path = config::config_path();
    eprintln!("✨ PrepDesk configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    // 1. Profile name
    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default(
            global
                .profile
                .clone()
                .unwrap_or_else(|| "default".into()),
        )
        .interact_text()
        .map_err(CliError::prompt)?;

    // 2. API URL
    let api_url: String = Input::new()
        .with_prompt("API URL")
        .validate_with(|v: &String| {
            url::Url::parse(v)
                .map(|_| ())
                .map_err(|e| format!("invalid URL: {e}"))
        })
        .interact_text()
        .map_err(CliError::prompt)?;

    // 3. Internal-access key
    let internal_key = prompt_internal_key(&profile_name)?;

    // 4. Location
    let location_choices = &[
        "Fixed position (kiosk at the front desk)",
        "Geo-IP lookup URL",
        "None (pass --latitude/--longitude per check-in)",
    ];
    let location = Select::new()
        .with_prompt("Where does the check-in location come from?")
        .items(location_choices)
        .default(0)
        .interact()
        .map_err(CliError::prompt)?;

    let mut profile = Profile {
        api_url,
        internal_key,
        ..Profile::default()
    };
    match location {
        0 => {
            profile.latitude = Some(prompt_coordinate("Latitude", 90.0)?);
            profile.longitude = Some(prompt_coordinate("Longitude", 180.0)?);
        }
        1 => {
            let url: String = Input::new()
                .with_prompt("Geo-IP URL")
                .interact_text()
                .map_err(CliError::prompt)?;
            profile.geolocation_url = Some(url);
        }
        _ => {}
    }

    // 5. Merge into the existing config and write
    let mut cfg = config::load_config()?;
    cfg.profiles.insert(profile_name.clone(), profile);
    cfg.default_profile = Some(profile_name.clone());
    let written = config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", written.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: prepdesk checkin --url <attendance link>");

    Ok(())
}
