//! Typed telemetry over TCP: one thread sends MessagePack samples, the other
//! routes them by index through a `Subscriber`.
//!
//! Run with:
//!   cargo run --example tcp-telemetry
//!
//! The same frames can be watched with the CLI:
//!   cargo run --features cli -- listen tcp 127.0.0.1:7070 --view msgpack

use std::io::Read;
use std::sync::mpsc;
use std::thread;

use packetizer::frame::{FrameWriter, Subscriber};
use packetizer::payload::{MsgPack, PayloadCodec, TypedHandler};
use packetizer::transport::{Link, TcpAcceptor};

const TELEMETRY: u8 = 0x10;
const STATUS: u8 = 0x20;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let acceptor = TcpAcceptor::bind("127.0.0.1:0".parse()?)?;
    let addr = acceptor.local_addr();
    eprintln!("listening on {addr}");

    let sender = thread::spawn(move || -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let codec = MsgPack::compact();
        let mut writer = FrameWriter::new(Link::tcp(addr)?);
        for seq in 0..5u32 {
            let sample = (seq, 20.0 + f64::from(seq) * 0.5);
            writer.send(TELEMETRY, &codec.pack(&sample)?)?;
        }
        writer.send(STATUS, &codec.pack("done")?)?;
        Ok(())
    });

    let (tx, rx) = mpsc::channel();
    let status_tx = tx.clone();
    let mut subscriber = Subscriber::new();
    subscriber
        .subscribe(
            TELEMETRY,
            TypedHandler::new(MsgPack::compact(), move |_, (seq, celsius): (u32, f64)| {
                let _ = tx.send(format!("sample #{seq}: {celsius:.1} C"));
            }),
        )
        .subscribe(
            STATUS,
            TypedHandler::new(MsgPack::compact(), move |_, status: String| {
                let _ = status_tx.send(format!("status: {status}"));
            }),
        );

    let mut link = acceptor.accept()?;
    let mut buf = [0u8; 1024];
    loop {
        let n = link.read(&mut buf)?;
        if n == 0 {
            break;
        }
        subscriber.feed(&buf[..n]);
        for line in rx.try_iter() {
            eprintln!("{line}");
        }
    }

    sender
        .join()
        .expect("sender thread should not panic")
        .map_err(|err| err.to_string())?;
    eprintln!("{:?}", subscriber.stats());
    Ok(())
}
