use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod formats;
pub mod inspect;
pub mod transcode;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the available serializers.
    Formats(FormatsArgs),
    /// Serialize a message given as a JSON array.
    Transcode(TranscodeArgs),
    /// Decode a payload and print its messages.
    Inspect(InspectArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Formats(args) => formats::run(args, format),
        Command::Transcode(args) => transcode::run(args, format),
        Command::Inspect(args) => inspect::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug, Default)]
pub struct FormatsArgs {}

#[derive(Args, Debug)]
pub struct TranscodeArgs {
    /// Message as a JSON array, e.g. '[48, 1, {}, "com.myapp.echo", ["hi"]]'.
    pub message: String,
    /// Target serializer (json, msgpack, cbor, optionally with .batched).
    #[arg(long, short = 't', value_name = "SERIALIZER")]
    pub to: String,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Serializer the payload was produced with.
    #[arg(long, short = 's', value_name = "SERIALIZER")]
    pub serializer: String,
    /// Payload as a hex string.
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    pub hex: Option<String>,
    /// Read the payload from a file.
    #[arg(long, conflicts_with = "hex")]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
