use std::fs;
use std::time::Duration;

use packetizer_payload::{MsgPack, PayloadCodec};

use crate::cmd::PayloadArgs;
use crate::exit::{io_error, payload_error, CliError, CliResult, USAGE};

/// Resolve the payload bytes selected by the payload flags. No flag means empty.
pub fn resolve_payload(args: &PayloadArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(hex) = &args.hex {
        return parse_hex(hex).map_err(|err| CliError::new(USAGE, format!("--hex: {err}")));
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    if let Some(json) = &args.json {
        serde_json::from_str::<serde_json::Value>(json)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
        return Ok(json.as_bytes().to_vec());
    }
    if let Some(json) = &args.msgpack_json {
        let value: serde_json::Value = serde_json::from_str(json).map_err(|err| {
            CliError::new(USAGE, format!("--msgpack-json is not valid JSON: {err}"))
        })?;
        return MsgPack::compact()
            .pack(&value)
            .map_err(|err| payload_error("msgpack encode failed", err));
    }
    Ok(Vec::new())
}

/// Parse hex text. Whitespace, `:`/`-`/`,` separators and `0x` prefixes are ignored.
pub fn parse_hex(input: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let digits: String = input
        .split(|c: char| c.is_whitespace() || matches!(c, ':' | '-' | ','))
        .map(|token| {
            token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token)
        })
        .collect();
    hex::decode(digits)
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
