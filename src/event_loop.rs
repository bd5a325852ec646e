//! Event Loop
//!
//! Single-threaded readiness loop over the X11 connection, the IPC socket
//! and a signalfd, all registered with one `mio::Poll`.

use std::io;
use std::os::fd::{AsFd, AsRawFd};

use anyhow::{Context, Result};
use mio::unix::SourceFd;
use mio::{Events, Interest, Poll, Token};
use nix::sys::signal::{SigSet, Signal};
use nix::sys::signalfd::{SfdFlags, SignalFd};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use tracing::{debug, info, trace, warn};

use crate::ipc::IpcServer;
use crate::wm::Model;
use crate::wm::command::Command;
use crate::x11::X11Connection;

const X11: Token = Token(0);
const IPC: Token = Token(1);
const SIGNALS: Token = Token(2);

pub struct EventLoop {
    poll: Poll,
    events: Events,
    signals: SignalFd,
    ipc: IpcServer,
}

impl EventLoop {
    pub fn new(model: &Model<X11Connection>, ipc: IpcServer) -> Result<Self> {
        let signals = block_signals()?;
        let poll = Poll::new().context("Failed to create mio Poll")?;
        let registry = poll.registry();

        registry
            .register(&mut SourceFd(&model.conn().raw_fd()), X11, Interest::READABLE)
            .context("Failed to register X11 FD with mio")?;
        registry
            .register(&mut SourceFd(&ipc.raw_fd()), IPC, Interest::READABLE)
            .context("Failed to register IPC socket with mio")?;
        registry
            .register(
                &mut SourceFd(&signals.as_fd().as_raw_fd()),
                SIGNALS,
                Interest::READABLE,
            )
            .context("Failed to register signalfd with mio")?;

        Ok(Self {
            poll,
            events: Events::with_capacity(16),
            signals,
            ipc,
        })
    }

    /// Run until the model stops
    pub fn run(&mut self, model: &mut Model<X11Connection>) -> Result<()> {
        // events queued while starting up never wake the poll
        dispatch_x11(model)?;

        while model.is_running() {
            if let Err(e) = self.poll.poll(&mut self.events, None) {
                if e.kind() == io::ErrorKind::Interrupted {
                    continue;
                }

                return Err(e).context("X11 socket poll failed");
            }

            for event in self.events.iter() {
                match event.token() {
                    X11 => trace!("X11 socket readable"),
                    IPC => self.ipc.accept_all(model),
                    SIGNALS => handle_signals(&mut self.signals, model),
                    _ => {}
                }
            }

            // replies read on behalf of the model can buffer events too
            dispatch_x11(model)?;
            reap_children();
        }

        info!("Event loop finished");
        Ok(())
    }
}

fn dispatch_x11(model: &mut Model<X11Connection>) -> Result<()> {
    while let Some(event) = model
        .conn_mut()
        .next_event()
        .context("Lost connection to the X server")?
    {
        model.handle_event(event);

        if !model.is_running() {
            break;
        }
    }

    Ok(())
}

fn block_signals() -> Result<SignalFd> {
    let mut mask = SigSet::empty();
    for signal in [Signal::SIGINT, Signal::SIGTERM, Signal::SIGHUP, Signal::SIGCHLD] {
        mask.add(signal);
    }

    mask.thread_block().context("Failed to block signals")?;

    SignalFd::with_flags(&mask, SfdFlags::SFD_NONBLOCK | SfdFlags::SFD_CLOEXEC)
        .context("Failed to create signalfd")
}

fn handle_signals(signals: &mut SignalFd, model: &mut Model<X11Connection>) {
    loop {
        let info = match signals.read_signal() {
            Ok(Some(info)) => info,
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read signal: {}", e);
                break;
            }
        };

        match Signal::try_from(info.ssi_signo as i32) {
            Ok(Signal::SIGCHLD) => reap_children(),
            Ok(signal) => {
                info!("Received {:?}, shutting down", signal);
                if let Err(e) = model.execute(Command::Quit) {
                    warn!("Failed to quit: {}", e);
                }
            }
            Err(e) => debug!("Unknown signal {}: {}", info.ssi_signo, e),
        }
    }
}

/// Collect every exited child without blocking
fn reap_children() {
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) | Err(_) => break,
            Ok(status) => trace!("Reaped child: {:?}", status),
        }
    }
}
