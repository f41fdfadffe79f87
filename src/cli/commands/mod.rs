pub mod flow;
pub mod logging;

use clap::{
    ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("authflow")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles);

    let command = flow::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::FlowKind;

    fn with_cleared_env<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        temp_env::with_vars(
            [
                ("AUTHFLOW_FLOW", None::<&str>),
                ("AUTHFLOW_VERIFIER_TIMEOUT_SECONDS", None::<&str>),
                ("AUTHFLOW_RESEND_COOLDOWN_SECONDS", None::<&str>),
                ("AUTHFLOW_SUPPORT_URL", None::<&str>),
                ("AUTHFLOW_LOG_LEVEL", None::<&str>),
            ],
            f,
        )
    }

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "authflow");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some(env!("CARGO_PKG_DESCRIPTION").to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_check_flow_args() {
        with_cleared_env(|| {
            let command = new();
            let matches = command.get_matches_from(vec![
                "authflow",
                "--flow",
                "sign_up",
                "--verifier-timeout",
                "10",
                "--resend-cooldown",
                "0",
                "--support-url",
                "https://help.example.com/mfa",
            ]);

            assert_eq!(
                matches.get_one::<FlowKind>(flow::ARG_FLOW).copied(),
                Some(FlowKind::SignUp)
            );
            assert_eq!(
                matches.get_one::<u64>(flow::ARG_VERIFIER_TIMEOUT).copied(),
                Some(10)
            );
            assert_eq!(
                matches.get_one::<u64>(flow::ARG_RESEND_COOLDOWN).copied(),
                Some(0)
            );
            assert_eq!(
                matches.get_one::<String>(flow::ARG_SUPPORT_URL).cloned(),
                Some("https://help.example.com/mfa".to_string())
            );
        });
    }

    #[test]
    fn test_check_defaults() {
        with_cleared_env(|| {
            let command = new();
            let matches = command.get_matches_from(vec!["authflow"]);

            assert_eq!(
                matches.get_one::<FlowKind>(flow::ARG_FLOW).copied(),
                Some(FlowKind::SignIn)
            );
            assert_eq!(
                matches.get_one::<u64>(flow::ARG_VERIFIER_TIMEOUT).copied(),
                None
            );
            assert_eq!(
                matches.get_one::<u64>(flow::ARG_RESEND_COOLDOWN).copied(),
                None
            );
            assert_eq!(
                matches.get_one::<String>(flow::ARG_SUPPORT_URL).cloned(),
                None
            );
        });
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("AUTHFLOW_FLOW", Some("sign_up")),
                ("AUTHFLOW_VERIFIER_TIMEOUT_SECONDS", Some("5")),
                ("AUTHFLOW_RESEND_COOLDOWN_SECONDS", Some("120")),
                ("AUTHFLOW_SUPPORT_URL", Some("https://help.example.com")),
                ("AUTHFLOW_LOG_LEVEL", Some("info")),
            ],
            || {
                let command = new();
                let matches = command.get_matches_from(vec!["authflow"]);
                assert_eq!(
                    matches.get_one::<FlowKind>(flow::ARG_FLOW).copied(),
                    Some(FlowKind::SignUp)
                );
                assert_eq!(
                    matches.get_one::<u64>(flow::ARG_VERIFIER_TIMEOUT).copied(),
                    Some(5)
                );
                assert_eq!(
                    matches.get_one::<u64>(flow::ARG_RESEND_COOLDOWN).copied(),
                    Some(120)
                );
                assert_eq!(
                    matches.get_one::<String>(flow::ARG_SUPPORT_URL).cloned(),
                    Some("https://help.example.com".to_string())
                );
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(2)
                );
            },
        );
    }

    #[test]
    fn test_check_log_level_env() {
        // loop cover all possible value_parse
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars([("AUTHFLOW_LOG_LEVEL", Some(level))], || {
                let command = new();
                let matches = command.get_matches_from(vec!["authflow"]);
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        // loop cover all possible value_parse
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, _) in levels.iter().enumerate() {
            temp_env::with_vars([("AUTHFLOW_LOG_LEVEL", None::<String>)], || {
                let mut args = vec!["authflow".to_string()];

                // Add the appropriate number of "-v" flags based on the index
                if index > 0 {
                    let v = format!("-{}", "v".repeat(index));
                    args.push(v);
                }

                let command = new();

                let matches = command.get_matches_from(args);

                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }

    #[test]
    fn test_invalid_flow_rejected() {
        with_cleared_env(|| {
            let command = new();
            let result = command.try_get_matches_from(vec!["authflow", "--flow", "magic"]);
            assert_eq!(
                result.map_err(|e| e.kind()),
                Err(clap::error::ErrorKind::ValueValidation)
            );
        });
    }

    #[test]
    fn test_removed_args_fail() {
        with_cleared_env(|| {
            let command = new();
            // dsn belongs to the backing services and should be rejected here
            let result =
                command.try_get_matches_from(vec!["authflow", "--dsn", "postgres://localhost"]);
            assert_eq!(
                result.map_err(|e| e.kind()),
                Err(clap::error::ErrorKind::UnknownArgument)
            );
        });
    }
}
