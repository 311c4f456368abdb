use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::exit::CliResult;
use crate::output::{OutputFormat, PayloadView};

pub mod decode;
pub mod encode;
pub mod listen;
pub mod payload;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode one frame and print it.
    Encode(EncodeArgs),
    /// Decode hex-encoded frames and print the messages.
    Decode(DecodeArgs),
    /// Send a single frame over TCP or UDP.
    Send(SendArgs),
    /// Listen and print received messages.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum TransportArg {
    Tcp,
    Udp,
}

#[derive(Args, Debug)]
pub struct PayloadArgs {
    /// Index (logical channel) of the frame.
    #[arg(long, short = 'i', default_value = "1")]
    pub index: u8,
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["hex", "file", "json", "msgpack_json"])]
    pub data: Option<String>,
    /// Payload bytes as hex (e.g. "93ce075bcd15" or "93 ce 07").
    #[arg(long, conflicts_with_all = ["data", "file", "json", "msgpack_json"])]
    pub hex: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["data", "hex", "json", "msgpack_json"])]
    pub file: Option<PathBuf>,
    /// JSON payload, sent as JSON text.
    #[arg(long, conflicts_with_all = ["data", "hex", "file", "msgpack_json"])]
    pub json: Option<String>,
    /// JSON value, sent packed as MessagePack.
    #[arg(long, value_name = "JSON", conflicts_with_all = ["data", "hex", "file", "json"])]
    pub msgpack_json: Option<String>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub payload: PayloadArgs,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Hex-encoded wire bytes; may hold several delimited frames.
    pub hex: String,
    /// How to render payloads.
    #[arg(long, value_enum, default_value = "auto")]
    pub view: PayloadView,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Transport to use.
    #[arg(value_enum)]
    pub transport: TransportArg,
    /// Address to connect (tcp) or send to (udp).
    pub addr: SocketAddr,
    #[command(flatten)]
    pub payload: PayloadArgs,
    /// Local address for the udp socket. Default: any port on the peer's address family.
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// Write timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Transport to use.
    #[arg(value_enum)]
    pub transport: TransportArg,
    /// Address to bind.
    pub addr: SocketAddr,
    /// Only print messages on these indices (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub indices: Option<Vec<u8>>,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Cap on buffered bytes of an unterminated frame.
    #[arg(long, value_name = "BYTES")]
    pub max_buffer: Option<usize>,
    /// How to render payloads.
    #[arg(long, value_enum, default_value = "auto")]
    pub view: PayloadView,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
