use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use packetizer_frame::{FrameConfig, FrameWriter};
use packetizer_transport::Link;
use tracing::info;

use crate::cmd::payload::{parse_duration, resolve_payload};
use crate::cmd::{SendArgs, TransportArg};
use crate::exit::{frame_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let payload = resolve_payload(&args.payload)?;
    let index = args.payload.index;

    let link = match args.transport {
        TransportArg::Tcp => Link::tcp(args.addr),
        TransportArg::Udp => Link::udp(
            args.bind.unwrap_or_else(|| any_local(&args.addr)),
            args.addr,
        ),
    }
    .map_err(|err| transport_error("connect failed", err))?;

    let config = FrameConfig {
        write_timeout: Some(timeout),
        ..FrameConfig::default()
    };
    let mut writer = FrameWriter::with_config_link(link, config)
        .map_err(|err| frame_error("configure link failed", err))?;
    let wire = writer
        .send(index, &payload)
        .map_err(|err| frame_error("send failed", err))?;
    info!(index, size = payload.len(), wire, addr = %args.addr, "frame sent");

    print_frame(index, payload.len(), writer.last_frame(), format);
    Ok(SUCCESS)
}

fn any_local(peer: &SocketAddr) -> SocketAddr {
    let ip = match peer.ip() {
        IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    };
    SocketAddr::new(ip, 0)
}
