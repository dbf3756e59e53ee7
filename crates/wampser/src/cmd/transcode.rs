use serde::Serialize;
use tracing::debug;
use wampser_codec::JsonCodec;
use wampser_message::Message;
use wampser_serializer::Serializer;

use crate::cmd::TranscodeArgs;
use crate::exit::{
    codec_error, protocol_error, unknown_serializer, CliError, CliResult, DATA_INVALID, SUCCESS,
};
use crate::output::{
    message_json, payload_preview, print_json, print_raw, print_table, OutputFormat,
};

#[derive(Serialize)]
struct TranscodeOutput {
    serializer: String,
    subprotocol: String,
    message_type: &'static str,
    binary: bool,
    size: usize,
    rated_messages: u64,
    payload_hex: String,
    message: serde_json::Value,
}

pub fn run(args: TranscodeArgs, format: OutputFormat) -> CliResult<i32> {
    let mut serializer =
        Serializer::from_name(&args.to).ok_or_else(|| unknown_serializer(&args.to))?;
    let mut message = parse_message(&args.message)?;

    let (payload, is_binary) = serializer
        .serialize(&mut message)
        .map_err(|err| codec_error("serialize failed", err))?;
    let stats = serializer.stats(false).merged();
    debug!(
        serializer = %serializer.name(),
        message = message.name(),
        bytes = payload.len(),
        "transcoded"
    );

    match format {
        OutputFormat::Raw => print_raw(&payload),
        OutputFormat::Json => print_json(&TranscodeOutput {
            serializer: serializer.name(),
            subprotocol: serializer.subprotocol(),
            message_type: message.name(),
            binary: is_binary,
            size: payload.len(),
            rated_messages: stats.rated_messages,
            payload_hex: hex::encode(&payload),
            message: message_json(&message)?,
        }),
        OutputFormat::Table => print_table(
            &["SERIALIZER", "MESSAGE", "SIZE", "PAYLOAD"],
            vec![vec![
                serializer.name(),
                message.name().to_string(),
                payload.len().to_string(),
                payload_preview(&payload, is_binary),
            ]],
        ),
        OutputFormat::Pretty => println!(
            "{} {} size={} payload={}",
            serializer.name(),
            message.name(),
            payload.len(),
            payload_preview(&payload, is_binary)
        ),
    }
    Ok(SUCCESS)
}

/// Parse a message given in WAMP's JSON form.
fn parse_message(input: &str) -> CliResult<Message> {
    let json: serde_json::Value = serde_json::from_str(input)
        .map_err(|err| CliError::new(DATA_INVALID, format!("message is not valid JSON: {err}")))?;
    let value = JsonCodec::from_json_value(json)
        .map_err(|err| codec_error("message is not a valid WAMP value", err))?;
    Message::unmarshal(&value).map_err(|err| protocol_error("invalid message", err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_call_array() {
        let message = parse_message(r#"[48, 7, {}, "com.myapp.echo", ["hi"]]"#).unwrap();
        assert_eq!(message.name(), "CALL");
    }

    #[test]
    fn rejects_unknown_type_as_invalid_data() {
        let err = parse_message("[99, 1]").unwrap_err();
        assert_eq!(err.code, DATA_INVALID);
        let err = parse_message("not json").unwrap_err();
        assert_eq!(err.code, DATA_INVALID);
    }
}
