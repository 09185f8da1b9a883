use std::sync::Arc;

use qtmrt_data::{ComponentType, DataFrame};
use qtmrt_protocol::Protocol;

use crate::cmd::StreamArgs;
use crate::exit::{protocol_error, CliResult, SUCCESS};
use crate::output::{frame_output, print_frame, OutputFormat};

/// Build the `streamframes` command for `frames` and `components`.
pub fn stream_command(frames: &str, components: &[ComponentType]) -> String {
    let names = components
        .iter()
        .map(|kind| kind.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    format!("streamframes {frames} {names}")
}

pub async fn run(args: StreamArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = args.connection.timeout()?;
    let protocol = args.connection.connect().await?;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<DataFrame>();
    protocol.set_streaming_callback(Some(Arc::new(move |frame: DataFrame| {
        let _ = tx.send(frame);
    })));

    let command = stream_command(&args.frames, &args.components);
    let armed = match protocol.send_command(&command, true).await {
        Ok(pending) => pending.with_timeout(timeout).await.map(|_| ()),
        Err(err) => Err(err),
    };
    if let Err(err) = armed {
        protocol.disconnect().await;
        return Err(protocol_error("stream request failed", err));
    }
    tracing::info!(%command, "streaming");

    let mut printed = 0usize;
    loop {
        let frame = tokio::select! {
            frame = rx.recv() => frame,
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!("interrupted");
                break;
            }
        };
        let Some(frame) = frame else {
            tracing::warn!("stream ended");
            break;
        };

        match frame_output(&frame, &args.components) {
            Ok(out) => print_frame(&out, format),
            Err(err) => {
                tracing::warn!(frame = frame.frame_number(), error = %err, "skipping frame");
                continue;
            }
        }
        printed += 1;
        if args.count.is_some_and(|count| printed >= count) {
            break;
        }
    }

    stop(&protocol).await;
    Ok(SUCCESS)
}

async fn stop(protocol: &Protocol) {
    if protocol.has_transport() {
        if let Err(err) = protocol.send_command("streamframes stop", false).await {
            tracing::debug!(error = %err, "failed to stop stream");
        }
    }
    protocol.set_streaming_callback(None);
    protocol.disconnect().await;
}
