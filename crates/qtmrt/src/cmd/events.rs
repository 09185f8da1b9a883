use crate::cmd::{parse_duration, EventsArgs};
use crate::exit::{protocol_error, CliResult, SUCCESS};
use crate::output::{print_event, OutputFormat};

pub async fn run(args: EventsArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = args.timeout.as_deref().map(parse_duration).transpose()?;
    let protocol = args.connection.connect().await?;

    let mut seen = 0usize;
    let result = loop {
        let event = tokio::select! {
            event = protocol.await_event(args.event, timeout) => event,
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!("interrupted");
                break Ok(SUCCESS);
            }
        };

        match event {
            Ok(event) => {
                print_event(event, format);
                seen += 1;
                if args.event.is_some() || args.count.is_some_and(|count| seen >= count) {
                    break Ok(SUCCESS);
                }
            }
            Err(err) => break Err(protocol_error("event wait failed", err)),
        }
    };

    protocol.disconnect().await;
    result
}
