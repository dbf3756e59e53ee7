use std::fs;

use serde::Serialize;
use wampser_serializer::{Serializer, StatsSnapshot};

use crate::cmd::InspectArgs;
use crate::exit::{
    io_error, protocol_error, unknown_serializer, CliError, CliResult, SUCCESS, USAGE,
};
use crate::output::{message_json, print_json, print_table, OutputFormat};

#[derive(Serialize)]
struct InspectOutput {
    serializer: String,
    size: usize,
    messages: Vec<serde_json::Value>,
    stats: StatsSnapshot,
}

pub fn run(args: InspectArgs, format: OutputFormat) -> CliResult<i32> {
    let mut serializer = Serializer::from_name(&args.serializer)
        .ok_or_else(|| unknown_serializer(&args.serializer))?;
    let payload = read_payload(&args)?;

    let messages = serializer
        .unserialize(&payload)
        .map_err(|err| protocol_error("unserialize failed", err))?;
    let stats = serializer.stats(false).merged();
    let rendered = messages
        .iter()
        .map(message_json)
        .collect::<CliResult<Vec<_>>>()?;

    match format {
        OutputFormat::Json => print_json(&InspectOutput {
            serializer: serializer.name(),
            size: payload.len(),
            messages: rendered,
            stats,
        }),
        OutputFormat::Table => print_table(
            &["#", "TYPE", "MESSAGE"],
            messages
                .iter()
                .zip(&rendered)
                .enumerate()
                .map(|(index, (message, json))| {
                    vec![
                        index.to_string(),
                        message.name().to_string(),
                        json.to_string(),
                    ]
                })
                .collect(),
        ),
        OutputFormat::Pretty | OutputFormat::Raw => {
            for json in &rendered {
                println!("{json}");
            }
            println!(
                "bytes={} messages={} rated_messages={}",
                stats.bytes,
                messages.len(),
                stats.rated_messages
            );
        }
    }
    Ok(SUCCESS)
}

fn read_payload(args: &InspectArgs) -> CliResult<Vec<u8>> {
    if let Some(text) = &args.hex {
        let compact: String = text.split_whitespace().collect();
        return hex::decode(compact)
            .map_err(|err| CliError::new(USAGE, format!("--hex is not valid hex: {err}")));
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Err(CliError::new(USAGE, "one of --hex or --file is required"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_input_ignores_whitespace() {
        let args = InspectArgs {
            serializer: "msgpack".to_string(),
            hex: Some("93 06 80\n a1 78".to_string()),
            file: None,
        };
        assert_eq!(read_payload(&args).unwrap(), vec![0x93, 0x06, 0x80, 0xa1, 0x78]);
    }

    #[test]
    fn bad_hex_is_a_usage_error() {
        let args = InspectArgs {
            serializer: "json".to_string(),
            hex: Some("zz".to_string()),
            file: None,
        };
        assert_eq!(read_payload(&args).unwrap_err().code, USAGE);
    }
}
