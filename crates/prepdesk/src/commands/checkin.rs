//! `prepdesk checkin`: drive one attendance check-in from the terminal.
//!
//! The core `CheckIn` owns the flow; this handler only reacts to the
//! phase it lands in: spin while locating, prompt for what is missing,
//! offer the retries the flow allows, and render the final outcome.

use std::sync::Arc;

use dialoguer::Input;

use prepdesk_api::{Coordinates, TransportConfig};
use prepdesk_core::{
    CachedLocation, CheckIn, CheckInOutcome, FixedLocation, HttpLocation, LocationProvider,
    LocationSource, Phase, Services, SystemClock, parse_entry,
};

use crate::cli::{CheckinArgs, GlobalOpts};
use crate::commands::util;
use crate::config::{self, Profile};
use crate::error::CliError;
use crate::output::{self, TerminalNotifier};

pub async fn handle(args: CheckinArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = config::resolve(global)?;
    let token = entry_token(&args)?;
    let client = resolved.client()?;
    let provider = CachedLocation::new(location_source(
        &args,
        &resolved.profile,
        &resolved.transport,
    )?);

    let services = Services {
        notifier: Arc::new(TerminalNotifier::new(
            output::should_color(global.color),
            global.quiet,
        )),
        clock: Arc::new(SystemClock),
    };
    let mut checkin = CheckIn::new(
        client,
        provider,
        token,
        resolved.profile.checkin_options(),
        services,
    );

    let interactive = util::interactive(args.no_input);
    let outcome = drive(&mut checkin, args.phone, interactive, global.quiet).await?;

    let out = output::render_single(global.output, &outcome, detail, |o| o.message.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// The token from `--url` or `--token`; none means the static QR code.
fn entry_token(args: &CheckinArgs) -> Result<Option<String>, CliError> {
    if let Some(ref url) = args.url {
        return Ok(parse_entry(url)?);
    }
    Ok(args.token.clone())
}

/// Flags win over the profile: `--latitude/--longitude`, then
/// `--geolocation-url`, then whatever the profile selects.
fn location_source(
    args: &CheckinArgs,
    profile: &Profile,
    transport: &TransportConfig,
) -> Result<LocationSource, CliError> {
    if let (Some(latitude), Some(longitude)) = (args.latitude, args.longitude) {
        let fixed = FixedLocation::new(Coordinates::new(latitude, longitude))?;
        return Ok(LocationSource::Fixed(fixed));
    }
    if let Some(ref raw) = args.geolocation_url {
        let url = raw.parse().map_err(|e| CliError::Validation {
            field: "geolocation_url".into(),
            reason: format!("invalid URL '{raw}': {e}"),
        })?;
        return Ok(LocationSource::Http(HttpLocation::from_transport(
            transport, url,
        )?));
    }
    Ok(profile.location_source(transport)?)
}

async fn drive<L: LocationProvider>(
    checkin: &mut CheckIn<L>,
    mut phone: Option<String>,
    interactive: bool,
    quiet: bool,
) -> Result<CheckInOutcome, CliError> {
    loop {
        match checkin.phase() {
            Phase::Invalid { message } => return Err(CliError::QrRejected { message }),

            Phase::ValidatingToken | Phase::AcquiringLocation | Phase::Submitting => {
                let spinner = util::spinner("Acquiring location...", quiet);
                let attempted = checkin.auto_locate().await;
                spinner.finish_and_clear();
                if !attempted {
                    return Err(CliError::LocationUnavailable {
                        message: "The location attempt for this check-in was already used.".into(),
                    });
                }
            }

            Phase::LocationError { message } => {
                if !checkin.can_retry_location()
                    || !util::confirm("Try getting your location again?", interactive)?
                {
                    return Err(CliError::LocationUnavailable { message });
                }
                let spinner = util::spinner("Acquiring location...", quiet);
                let attempted = checkin.retry_location().await;
                spinner.finish_and_clear();
                if !attempted {
                    return Err(CliError::LocationUnavailable { message });
                }
            }

            Phase::AwaitingInput => {
                let number = match phone.take() {
                    Some(number) => number,
                    None if interactive => prompt_phone(checkin.phone_number())?,
                    None => {
                        return Err(CliError::Validation {
                            field: "phone".into(),
                            reason: "pass --phone when running without a terminal".into(),
                        });
                    }
                };
                checkin.set_phone_number(number);

                let spinner = util::spinner("Marking attendance...", quiet);
                let phase = checkin.submit().await;
                spinner.finish_and_clear();

                // Rejected before sending; the notifier already said why.
                if phase == Phase::AwaitingInput && !interactive {
                    return Err(CliError::Validation {
                        field: "phone".into(),
                        reason: prepdesk_core::outcome::PHONE_REQUIRED.into(),
                    });
                }
            }

            Phase::Success(outcome) => return Ok(outcome),

            Phase::Failure { message } => {
                if !util::confirm("Try again?", interactive)? {
                    return Err(CliError::AttendanceFailed { message });
                }
                let spinner = util::spinner("Acquiring location...", quiet);
                let restarted = checkin.try_again().await;
                spinner.finish_and_clear();
                if !restarted {
                    return Err(CliError::AttendanceFailed { message });
                }
            }
        }
    }
}

fn prompt_phone(previous: &str) -> Result<String, CliError> {
    Input::<String>::new()
        .with_prompt("Phone number")
        .with_initial_text(previous)
        .allow_empty(true)
        .interact_text()
        .map_err(CliError::prompt)
}

fn detail(outcome: &CheckInOutcome) -> String {
    let mut rows = vec![
        ("Status", outcome.message.clone()),
        (
            "Student",
            output::or_dash(outcome.student_name.as_deref()),
        ),
        ("Date", outcome.stamp.date.clone()),
        ("Time", outcome.stamp.time.clone()),
    ];
    if outcome.already_marked {
        rows.push(("Note", "recorded earlier today".into()));
    }
    output::detail_table(&rows)
}
