use qtmrt_discovery::{discover, DiscoveryConfig};

use crate::cmd::{parse_duration, DiscoverArgs};
use crate::exit::{discovery_error, CliResult, SUCCESS};
use crate::output::{print_servers, OutputFormat};

pub async fn run(args: DiscoverArgs, format: OutputFormat) -> CliResult<i32> {
    let config =
        DiscoveryConfig::on_interface(args.interface).with_silence(parse_duration(&args.silence)?);
    let servers = discover(&config)
        .await
        .map_err(|err| discovery_error("discovery failed", err))?;

    tracing::info!(count = servers.len(), "discovery finished");
    print_servers(&servers, format);
    Ok(SUCCESS)
}
