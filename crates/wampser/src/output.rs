use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use wampser_codec::JsonCodec;
use wampser_message::Message;

use crate::exit::{codec_error, CliResult};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
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

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_table(header: &[&str], rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    for row in rows {
        table.add_row(row);
    }
    println!("{table}");
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// A message as a JSON array, binary blobs wrapped the way the JSON format does.
pub fn message_json(message: &Message) -> CliResult<serde_json::Value> {
    JsonCodec::to_json_value(&message.marshal())
        .map_err(|err| codec_error("failed rendering message", err))
}

/// Printable form of a payload: UTF-8 text as is, binary as hex.
pub fn payload_preview(payload: &[u8], is_binary: bool) -> String {
    if !is_binary {
        if let Ok(text) = std::str::from_utf8(payload) {
            return text.replace('\u{1e}', "\\u001e");
        }
    }
    hex::encode(payload)
}
