use serde::Serialize;

use crate::cmd::RebootArgs;
use crate::exit::{discovery_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct RebootOutput {
    interface: String,
    sent: bool,
}

pub async fn run(args: RebootArgs, format: OutputFormat) -> CliResult<i32> {
    qtmrt_discovery::reboot(args.interface)
        .await
        .map_err(|err| discovery_error("reboot failed", err))?;

    let out = RebootOutput {
        interface: args.interface.to_string(),
        sent: true,
    };
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("reboot request sent from {}", out.interface)
        }
    }
    Ok(SUCCESS)
}
