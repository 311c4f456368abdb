use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::Duration;

use packetizer_frame::{FrameConfig, Message, Subscriber};
use packetizer_transport::{Link, TcpAcceptor, TransportError};
use tracing::{debug, info};

use crate::cmd::{ListenArgs, TransportArg};
use crate::exit::{io_error, transport_error, CliError, CliResult, SUCCESS};
use crate::output::{print_message, print_stats, OutputFormat, PayloadView};

const READ_BUFFER_SIZE: usize = 64 * 1024;
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// How a read loop over one link ended.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    /// Peer closed the stream; accept the next one.
    Closed,
    /// `--count` reached.
    Done,
    /// Ctrl-C.
    Stopped,
}

struct Session {
    subscriber: Subscriber,
    rx: Receiver<Message>,
    printed: usize,
    count: Option<usize>,
    view: PayloadView,
    format: OutputFormat,
}

impl Session {
    fn new(args: &ListenArgs, format: OutputFormat) -> Self {
        let config = FrameConfig {
            max_buffer_size: args.max_buffer,
            ..FrameConfig::default()
        };
        let mut subscriber = Subscriber::with_config(&config);

        let (tx, rx) = mpsc::channel();
        let indices = args
            .indices
            .clone()
            .unwrap_or_else(|| (0..=u8::MAX).collect());
        for index in indices {
            let tx = tx.clone();
            subscriber.subscribe(index, move |msg: Message| {
                let _ = tx.send(msg);
            });
        }

        Self {
            subscriber,
            rx,
            printed: 0,
            count: args.count,
            view: args.view,
            format,
        }
    }

    fn pump(&mut self, link: &mut Link, running: &AtomicBool) -> CliResult<Flow> {
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        let stream = matches!(link.kind(), packetizer_transport::LinkKind::Tcp);

        while running.load(Ordering::SeqCst) {
            let n = match link.read(&mut buf) {
                Ok(0) if stream => return Ok(Flow::Closed),
                Ok(n) => n,
                Err(err)
                    if matches!(
                        err.kind(),
                        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                    ) =>
                {
                    continue
                }
                Err(err) if stream && err.kind() == ErrorKind::ConnectionReset => {
                    return Ok(Flow::Closed)
                }
                Err(err) => return Err(io_error("receive failed", err)),
            };

            self.subscriber.feed(&buf[..n]);
            let source = link
                .peer_addr()
                .map(|addr| addr.to_string())
                .unwrap_or_else(|| "-".to_string());

            while let Ok(message) = self.rx.try_recv() {
                print_message(&message, &source, self.view, self.format);
                self.printed = self.printed.saturating_add(1);
                if self.count.is_some_and(|count| self.printed >= count) {
                    return Ok(Flow::Done);
                }
            }
        }

        Ok(Flow::Stopped)
    }
}

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut session = Session::new(&args, format);
    let result = match args.transport {
        TransportArg::Tcp => listen_tcp(&args, &running, &mut session),
        TransportArg::Udp => listen_udp(&args, &running, &mut session),
    };

    let stats = session.subscriber.stats();
    info!(
        frames = stats.frames,
        delivered = stats.delivered,
        errors = stats.errors(),
        "listen finished"
    );
    if matches!(format, OutputFormat::Pretty | OutputFormat::Table) {
        print_stats(&stats);
    }

    result.map(|()| SUCCESS)
}

fn listen_tcp(args: &ListenArgs, running: &AtomicBool, session: &mut Session) -> CliResult<()> {
    let acceptor = TcpAcceptor::bind(args.addr).map_err(|err| transport_error("bind failed", err))?;
    acceptor
        .set_nonblocking(true)
        .map_err(|err| transport_error("bind failed", err))?;

    while running.load(Ordering::SeqCst) {
        let mut link = match acceptor.accept() {
            Ok(link) => link,
            Err(TransportError::Accept(err)) if err.kind() == ErrorKind::WouldBlock => {
                std::thread::sleep(POLL_INTERVAL);
                continue;
            }
            Err(err) => return Err(transport_error("accept failed", err)),
        };
        link.set_read_timeout(Some(POLL_INTERVAL))
            .map_err(|err| transport_error("accept failed", err))?;

        match session.pump(&mut link, running)? {
            Flow::Closed => {
                debug!("peer closed connection");
                // Bytes of an unterminated frame never belong to the next peer.
                session.subscriber.reset();
            }
            Flow::Done | Flow::Stopped => return Ok(()),
        }
    }

    Ok(())
}

fn listen_udp(args: &ListenArgs, running: &AtomicBool, session: &mut Session) -> CliResult<()> {
    let mut link = Link::udp_bind(args.addr).map_err(|err| transport_error("bind failed", err))?;
    link.set_read_timeout(Some(POLL_INTERVAL))
        .map_err(|err| transport_error("bind failed", err))?;

    session.pump(&mut link, running)?;
    Ok(())
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
