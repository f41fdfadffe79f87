use crate::cli::actions::{Action, demo::Args};
use crate::cli::commands::flow::{
    ARG_FLOW, ARG_RESEND_COOLDOWN, ARG_SUPPORT_URL, ARG_VERIFIER_TIMEOUT,
};
use crate::config::FlowConfig;
use crate::flow::FlowKind;
use anyhow::{Context, Result};
use std::time::Duration;
use url::Url;

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let kind = matches
        .get_one::<FlowKind>(ARG_FLOW)
        .copied()
        .unwrap_or(FlowKind::SignIn);

    let mut config = FlowConfig::new();

    if let Some(seconds) = matches.get_one::<u64>(ARG_VERIFIER_TIMEOUT).copied() {
        config = config.with_verifier_timeout(Duration::from_secs(seconds));
    }

    if let Some(seconds) = matches.get_one::<u64>(ARG_RESEND_COOLDOWN).copied() {
        config = config.with_resend_cooldown(Duration::from_secs(seconds));
    }

    if let Some(support_url) = matches.get_one::<String>(ARG_SUPPORT_URL) {
        let support_url = Url::parse(support_url).context("invalid AUTHFLOW_SUPPORT_URL")?;
        config = config.with_support_url(support_url);
    }

    Ok(Action::Demo(Args { kind, config }))
}
