use packetizer_frame::{decode, Reassembler};

use crate::cmd::payload::parse_hex;
use crate::cmd::DecodeArgs;
use crate::exit::{decode_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_message, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let wire = parse_hex(&args.hex).map_err(|err| CliError::new(USAGE, format!("hex: {err}")))?;
    if wire.is_empty() {
        return Err(CliError::new(USAGE, "no bytes to decode"));
    }

    let mut reassembler = Reassembler::new();
    let mut decoded = 0usize;
    for chunk in reassembler.feed(&wire) {
        let message = decode(&chunk).map_err(|err| decode_error("decode failed", err))?;
        print_message(&message, "input", args.view, format);
        decoded += 1;
    }

    // A trailing frame without its delimiter is still decoded; the
    // delimiter only matters on a live stream.
    if reassembler.pending() > 0 {
        let tail = reassembler.take_pending();
        let message = decode(&tail).map_err(|err| decode_error("decode failed", err))?;
        print_message(&message, "input", args.view, format);
        decoded += 1;
    }

    if decoded == 0 {
        return Err(CliError::new(USAGE, "input holds only delimiters"));
    }
    Ok(SUCCESS)
}
