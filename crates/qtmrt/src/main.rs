mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::exit::{CliError, INTERNAL};
use crate::logging::{effective_level, init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "qtmrt", version, about = "QTM real-time protocol client")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr) [default: $QTM_LOGGING, else info].
    #[arg(long, value_name = "LEVEL", global = true)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, effective_level(cli.log_level));

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::new(INTERNAL, format!("failed to start runtime: {err}")))
        .and_then(|runtime| runtime.block_on(cmd::run(cli.command, format)));

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qtmrt_data::ComponentType;
    use qtmrt_protocol::Event;

    #[test]
    fn parses_send_subcommand() {
        let cli = Cli::try_parse_from(["qtmrt", "send", "10.0.0.5", "qtmversion"])
            .expect("send args should parse");

        match cli.command {
            Command::Send(args) => {
                assert_eq!(args.connection.host, "10.0.0.5");
                assert_eq!(args.connection.port, 22223);
                assert_eq!(args.command, "qtmversion");
                assert!(!args.xml);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn log_level_flag_is_optional() {
        let cli = Cli::try_parse_from(["qtmrt", "version"]).expect("version should parse");
        assert!(cli.log_level.is_none());

        let cli = Cli::try_parse_from(["qtmrt", "--log-level", "debug", "version"])
            .expect("log level should parse");
        assert!(matches!(cli.log_level, Some(LogLevel::Debug)));
    }

    #[test]
    fn rejects_xml_without_wait() {
        let err = Cli::try_parse_from([
            "qtmrt",
            "send",
            "localhost",
            "<QTM_Settings/>",
            "--xml",
            "--no-wait",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn parses_stream_components() {
        let cli = Cli::try_parse_from([
            "qtmrt",
            "stream",
            "localhost",
            "--components",
            "3d,6deuler,skeleton:global",
            "--count",
            "10",
        ])
        .expect("stream args should parse");

        match cli.command {
            Command::Stream(args) => {
                assert_eq!(
                    args.components,
                    vec![
                        ComponentType::Markers3d,
                        ComponentType::Bodies6dEuler,
                        ComponentType::Skeleton
                    ]
                );
                assert_eq!(args.frames, "allframes");
                assert_eq!(args.count, Some(10));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_component() {
        let err = Cli::try_parse_from(["qtmrt", "stream", "localhost", "--components", "4d"])
            .expect_err("unknown component should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_event_filter_case_insensitively() {
        let cli = Cli::try_parse_from([
            "qtmrt",
            "events",
            "localhost",
            "--event",
            "capturestarted",
            "--timeout",
            "30s",
        ])
        .expect("events args should parse");

        match cli.command {
            Command::Events(args) => {
                assert_eq!(args.event, Some(Event::CaptureStarted));
                assert_eq!(args.timeout.as_deref(), Some("30s"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_discover_interface() {
        let cli = Cli::try_parse_from(["qtmrt", "--format", "json", "discover", "--interface", "192.168.1.4"])
            .expect("discover args should parse");
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
        assert!(matches!(cli.command, Command::Discover(_)));
    }
}
