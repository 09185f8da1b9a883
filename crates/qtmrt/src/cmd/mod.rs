use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use clap::{Args, Subcommand};
use qtmrt_data::ComponentType;
use qtmrt_protocol::{connect, ConnectConfig, Event, Protocol, DEFAULT_PORT, DEFAULT_VERSION};

use crate::exit::{protocol_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod discover;
pub mod events;
pub mod reboot;
pub mod send;
pub mod stream;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Find servers on the local network.
    Discover(DiscoverArgs),
    /// Ask every server on the network to reboot.
    Reboot(RebootArgs),
    /// Send one command or XML settings document and print the answer.
    Send(SendArgs),
    /// Print server events as they arrive.
    Events(EventsArgs),
    /// Stream data frames and print them.
    Stream(StreamArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub async fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Discover(args) => discover::run(args, format).await,
        Command::Reboot(args) => reboot::run(args, format).await,
        Command::Send(args) => send::run(args, format).await,
        Command::Events(args) => events::run(args, format).await,
        Command::Stream(args) => stream::run(args, format).await,
        Command::Version(args) => version::run(args),
    }
}

/// Where and how to connect.
#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// Server host name or address.
    pub host: String,
    /// RT interface port.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Protocol version to negotiate.
    #[arg(long, value_name = "MAJOR.MINOR", default_value = DEFAULT_VERSION)]
    pub protocol_version: String,
    /// Bound on connecting and on each answer (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub connect_timeout: String,
}

impl ConnectionArgs {
    pub fn timeout(&self) -> CliResult<Duration> {
        parse_duration(&self.connect_timeout)
    }

    pub async fn connect(&self) -> CliResult<Protocol> {
        let config = ConnectConfig::default()
            .with_port(self.port)
            .with_version(self.protocol_version.clone())
            .with_timeout(self.timeout()?)
            .on_disconnect(|failure| match failure {
                Some(err) => tracing::warn!(error = %err, "connection lost"),
                None => tracing::debug!("connection closed"),
            });
        connect(&self.host, config)
            .await
            .map_err(|err| protocol_error("connect failed", err))
    }
}

#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// Address of the local interface to broadcast from.
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub interface: IpAddr,
    /// Stop after this long without a reply (e.g. 200ms).
    #[arg(long, default_value = "200ms")]
    pub silence: String,
}

#[derive(Args, Debug)]
pub struct RebootArgs {
    /// Address of the local interface to broadcast from.
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub interface: IpAddr,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
    /// Command text, or an XML document with --xml.
    pub command: String,
    /// Send the text as an XML settings document.
    #[arg(long)]
    pub xml: bool,
    /// Do not wait for an answer.
    #[arg(long, conflicts_with = "xml")]
    pub no_wait: bool,
}

#[derive(Args, Debug)]
pub struct EventsArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
    /// Wait for this event only, then exit (e.g. CaptureStarted).
    #[arg(long)]
    pub event: Option<Event>,
    /// Give up if no (matching) event arrives within this time.
    #[arg(long)]
    pub timeout: Option<String>,
    /// Exit after N events.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct StreamArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
    /// Components to stream (comma-separated, e.g. 3d,6d,analog).
    #[arg(long, value_delimiter = ',', required = true)]
    pub components: Vec<ComponentType>,
    /// Frame selection: allframes, frequency:<n> or frequencydivisor:<n>.
    #[arg(long, default_value = "allframes")]
    pub frames: String,
    /// Exit after N frames.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
