use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use qtmrt_data::{ComponentType, DataFrame, Decoded};
use qtmrt_discovery::DiscoveryResponse;
use qtmrt_protocol::{Event, Response};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

#[derive(Debug, Serialize)]
pub struct ServerOutput {
    pub host: String,
    pub port: u16,
    pub info: String,
}

impl From<&DiscoveryResponse> for ServerOutput {
    fn from(server: &DiscoveryResponse) -> Self {
        Self {
            host: server.host.to_string(),
            port: server.port,
            info: String::from_utf8_lossy(&server.info).into_owned(),
        }
    }
}

pub fn print_servers(servers: &[DiscoveryResponse], format: OutputFormat) {
    let servers: Vec<ServerOutput> = servers.iter().map(ServerOutput::from).collect();
    match format {
        OutputFormat::Json => print_json(&servers),
        OutputFormat::Table => {
            let mut table = table(vec!["HOST", "PORT", "INFO"]);
            for server in &servers {
                table.add_row(vec![
                    server.host.clone(),
                    server.port.to_string(),
                    server.info.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            if servers.is_empty() {
                println!("no servers found");
            }
            for server in &servers {
                println!("{}:{} {}", server.host, server.port, server.info);
            }
        }
    }
}

#[derive(Serialize)]
struct EventOutput {
    event: &'static str,
    code: u8,
}

pub fn print_event(event: Event, format: OutputFormat) {
    let out = EventOutput {
        event: event.name(),
        code: event.as_u8(),
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = table(vec!["EVENT", "CODE"]);
            table.add_row(vec![out.event.to_string(), out.code.to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("event={} ({})", out.event, out.code),
    }
}

/// One decoded component of a frame.
#[derive(Debug, Serialize)]
pub struct ComponentOutput {
    pub component: &'static str,
    pub items: usize,
    pub data: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct FrameOutput {
    pub frame_number: u32,
    pub timestamp: i64,
    pub components: Vec<ComponentOutput>,
}

fn summarize<H: Serialize, T: Serialize>(
    kind: ComponentType,
    decoded: Option<Decoded<H, T>>,
) -> Option<ComponentOutput> {
    decoded.map(|decoded| ComponentOutput {
        component: kind.as_str(),
        items: decoded.items.len(),
        data: serde_json::to_value(&decoded).unwrap_or(serde_json::Value::Null),
    })
}

fn decode_component(
    frame: &DataFrame,
    kind: ComponentType,
) -> qtmrt_data::Result<Option<ComponentOutput>> {
    Ok(match kind {
        ComponentType::Markers2d => summarize(kind, frame.get_2d_markers(None)?),
        ComponentType::Markers2dLinearized => {
            summarize(kind, frame.get_2d_markers_linearized(None)?)
        }
        ComponentType::Markers3d => summarize(kind, frame.get_3d_markers()?),
        ComponentType::Markers3dResidual => summarize(kind, frame.get_3d_markers_residual()?),
        ComponentType::Markers3dNoLabels => summarize(kind, frame.get_3d_markers_no_label()?),
        ComponentType::Markers3dNoLabelsResidual => {
            summarize(kind, frame.get_3d_markers_no_label_residual()?)
        }
        ComponentType::Bodies6d => summarize(kind, frame.get_6d()?),
        ComponentType::Bodies6dResidual => summarize(kind, frame.get_6d_residual()?),
        ComponentType::Bodies6dEuler => summarize(kind, frame.get_6d_euler()?),
        ComponentType::Bodies6dEulerResidual => summarize(kind, frame.get_6d_euler_residual()?),
        ComponentType::Analog => summarize(kind, frame.get_analog()?),
        ComponentType::AnalogSingle => summarize(kind, frame.get_analog_single()?),
        ComponentType::Force => summarize(kind, frame.get_force()?),
        ComponentType::ForceSingle => summarize(kind, frame.get_force_single()?),
        ComponentType::GazeVector => summarize(kind, frame.get_gaze_vectors()?),
        ComponentType::EyeTracker => summarize(kind, frame.get_eye_trackers()?),
        ComponentType::Image => summarize(kind, frame.get_images()?),
        ComponentType::Skeleton => summarize(kind, frame.get_skeletons()?),
        ComponentType::Timecode => summarize(kind, frame.get_timecodes()?),
    })
}

/// Decode the `wanted` components of `frame`, or every component present
/// when `wanted` is empty. Components missing from the frame are left out.
pub fn frame_output(
    frame: &DataFrame,
    wanted: &[ComponentType],
) -> qtmrt_data::Result<FrameOutput> {
    let kinds: Vec<ComponentType> = if wanted.is_empty() {
        frame.components().keys().copied().collect()
    } else {
        wanted.to_vec()
    };

    let mut components = Vec::with_capacity(kinds.len());
    for kind in kinds {
        if let Some(component) = decode_component(frame, kind)? {
            components.push(component);
        }
    }

    Ok(FrameOutput {
        frame_number: frame.frame_number(),
        timestamp: frame.timestamp(),
        components,
    })
}

pub fn print_frame(out: &FrameOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = table(vec!["FRAME", "TIMESTAMP", "COMPONENT", "ITEMS"]);
            for component in &out.components {
                table.add_row(vec![
                    out.frame_number.to_string(),
                    out.timestamp.to_string(),
                    component.component.to_string(),
                    component.items.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let counts = out
                .components
                .iter()
                .map(|c| format!("{}={}", c.component, c.items))
                .collect::<Vec<_>>()
                .join(" ");
            println!(
                "frame={} timestamp={} {}",
                out.frame_number, out.timestamp, counts
            );
        }
    }
}

#[derive(Serialize)]
struct TextOutput<'a> {
    kind: &'static str,
    text: &'a str,
}

/// Print the answer to a `send`.
pub fn print_response(response: &Response, format: OutputFormat) -> qtmrt_data::Result<()> {
    let (kind, text) = match response {
        Response::Data(frame) => {
            print_frame(&frame_output(frame, &[])?, format);
            return Ok(());
        }
        Response::Command(_) => ("command", response.text().unwrap_or_default()),
        Response::Xml(_) => ("xml", response.text().unwrap_or_default()),
        Response::Empty => ("none", String::new()),
    };

    match format {
        OutputFormat::Json => print_json(&TextOutput { kind, text: &text }),
        OutputFormat::Table | OutputFormat::Pretty => println!("{text}"),
    }
    Ok(())
}
