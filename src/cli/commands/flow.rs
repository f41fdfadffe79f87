use clap::{Arg, Command, builder::ValueParser};

use crate::flow::FlowKind;

pub const ARG_FLOW: &str = "flow";
pub const ARG_VERIFIER_TIMEOUT: &str = "verifier-timeout";
pub const ARG_RESEND_COOLDOWN: &str = "resend-cooldown";
pub const ARG_SUPPORT_URL: &str = "support-url";

#[must_use]
pub fn validator_flow_kind() -> ValueParser {
    ValueParser::from(
        move |kind: &str| -> std::result::Result<FlowKind, String> {
            FlowKind::from_str(&kind.to_lowercase())
                .ok_or_else(|| "invalid flow; use sign_in or sign_up".to_string())
        },
    )
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_FLOW)
                .short('f')
                .long("flow")
                .help("Flow to run: sign_in or sign_up")
                .default_value("sign_in")
                .env("AUTHFLOW_FLOW")
                .value_parser(validator_flow_kind()),
        )
        .arg(
            Arg::new(ARG_VERIFIER_TIMEOUT)
                .long("verifier-timeout")
                .help("Deadline in seconds for each verifier call (default: 30)")
                .env("AUTHFLOW_VERIFIER_TIMEOUT_SECONDS")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_RESEND_COOLDOWN)
                .long("resend-cooldown")
                .help("Seconds between code deliveries, 0 disables the cooldown (default: 60)")
                .env("AUTHFLOW_RESEND_COOLDOWN_SECONDS")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_SUPPORT_URL)
                .long("support-url")
                .help("Page where permanent failures direct the user")
                .env("AUTHFLOW_SUPPORT_URL"),
        )
}
