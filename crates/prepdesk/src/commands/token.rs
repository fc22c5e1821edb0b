//! `prepdesk token inspect`: the same verdict the check-in reaches, without
//! touching the network.

use chrono::{DateTime, Local};
use serde::Serialize;

use prepdesk_core::token::decode_claims;
use prepdesk_core::{QrClaims, TokenStatus, parse_entry, validate_token};

use crate::cli::{GlobalOpts, TokenArgs, TokenCommand};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct TokenReport {
    status: &'static str,
    usable: bool,
    dynamic: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<String>,
}

impl TokenReport {
    fn new(status: &TokenStatus, claims: Option<QrClaims>) -> Self {
        let reason = match status {
            TokenStatus::Expired(reason) => Some(reason.to_string()),
            _ => None,
        };
        let (date, exp) = claims.map_or((None, None), |c| (c.date, c.exp));
        Self {
            status: status.label(),
            usable: status.is_usable(),
            dynamic: status.is_dynamic(),
            reason,
            message: status.message(),
            date,
            expires_at: exp
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .map(|at| at.with_timezone(&Local).to_rfc3339()),
        }
    }
}

pub fn handle(args: TokenArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        TokenCommand::Inspect { token } => inspect(&token, global),
    }
}

fn inspect(input: &str, global: &GlobalOpts) -> Result<(), CliError> {
    // Accept either the whole attendance link or the bare token.
    let token = if input.contains("://") {
        parse_entry(input)?
    } else {
        Some(input.trim().to_owned()).filter(|t| !t.is_empty())
    };

    let status = validate_token(token.as_deref(), &Local::now());
    let claims = token.as_deref().and_then(|t| decode_claims(t).ok());
    let report = TokenReport::new(&status, claims);

    let out = output::render_single(global.output, &report, detail, |r| r.status.to_owned())?;
    output::print_output(&out, global.quiet);

    match status.message() {
        Some(message) => Err(CliError::QrRejected {
            message: message.to_owned(),
        }),
        None => Ok(()),
    }
}

fn detail(report: &TokenReport) -> String {
    output::detail_table(&[
        ("Status", report.status.to_owned()),
        ("Usable", report.usable.to_string()),
        (
            "Kind",
            if report.dynamic { "dynamic" } else { "static" }.to_owned(),
        ),
        ("Reason", output::or_dash(report.reason.as_deref())),
        ("Date", output::or_dash(report.date.as_deref())),
        ("Expires", output::or_dash(report.expires_at.as_deref())),
    ])
}
