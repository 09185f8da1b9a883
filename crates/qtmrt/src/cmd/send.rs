use crate::cmd::SendArgs;
use crate::exit::{decode_error, protocol_error, CliResult, SUCCESS};
use crate::output::{print_response, OutputFormat};

pub async fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = args.connection.timeout()?;
    let protocol = args.connection.connect().await?;

    let sent = if args.xml {
        protocol.send_xml(&args.command).await
    } else {
        protocol.send_command(&args.command, !args.no_wait).await
    };
    let pending = sent.map_err(|err| protocol_error("send failed", err));

    let result = match pending {
        Ok(_) if args.no_wait => Ok(SUCCESS),
        Ok(pending) => match pending.with_timeout(timeout).await {
            Ok(response) => print_response(&response, format)
                .map(|()| SUCCESS)
                .map_err(|err| decode_error("invalid data frame", err)),
            Err(err) => Err(protocol_error("no answer", err)),
        },
        Err(err) => Err(err),
    };

    protocol.disconnect().await;
    result
}
