use serde::Serialize;
use wampser_serializer::all_serializers;

use crate::cmd::FormatsArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_json, print_table, OutputFormat};

#[derive(Serialize)]
struct SerializerInfo {
    name: String,
    subprotocol: String,
    rawsocket_id: u8,
    mime_type: &'static str,
    batched: bool,
    binary: bool,
    native_binary: bool,
}

pub fn run(_args: FormatsArgs, format: OutputFormat) -> CliResult<i32> {
    let infos: Vec<SerializerInfo> = all_serializers()
        .iter()
        .map(|ser| SerializerInfo {
            name: ser.name(),
            subprotocol: ser.subprotocol(),
            rawsocket_id: ser.format().rawsocket_id(),
            mime_type: ser.format().mime_type(),
            batched: ser.is_batched(),
            binary: ser.is_binary(),
            native_binary: ser.format().supports_native_binary(),
        })
        .collect();

    match format {
        OutputFormat::Json => print_json(&infos),
        OutputFormat::Table => print_table(
            &["SERIALIZER", "SUBPROTOCOL", "RAWSOCKET", "FRAME", "NATIVE BINARY"],
            infos
                .iter()
                .map(|info| {
                    vec![
                        info.name.clone(),
                        info.subprotocol.clone(),
                        info.rawsocket_id.to_string(),
                        frame_kind(info.binary).to_string(),
                        info.native_binary.to_string(),
                    ]
                })
                .collect(),
        ),
        OutputFormat::Pretty | OutputFormat::Raw => {
            for info in &infos {
                println!(
                    "{} subprotocol={} rawsocket={} frame={}",
                    info.name,
                    info.subprotocol,
                    info.rawsocket_id,
                    frame_kind(info.binary)
                );
            }
        }
    }
    Ok(SUCCESS)
}

fn frame_kind(binary: bool) -> &'static str {
    if binary {
        "binary"
    } else {
        "text"
    }
}
