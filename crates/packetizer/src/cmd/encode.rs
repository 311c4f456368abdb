use packetizer_frame::{encode, RECOMMENDED_MAX_PAYLOAD};
use tracing::warn;

use crate::cmd::payload::resolve_payload;
use crate::cmd::EncodeArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(&args.payload)?;
    if payload.len() > RECOMMENDED_MAX_PAYLOAD {
        warn!(
            size = payload.len(),
            max = RECOMMENDED_MAX_PAYLOAD,
            "payload exceeds the size small peers can buffer"
        );
    }

    let frame = encode(args.payload.index, &payload);
    print_frame(args.payload.index, payload.len(), &frame, format);
    Ok(SUCCESS)
}
