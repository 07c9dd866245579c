// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Closing outputs when the process is interrupted.
//!
//! SIGINT and SIGTERM are blocked in the calling thread (and therefore in
//! every thread it spawns afterwards), and a dedicated thread waits for them
//! with `sigwait`. This means the handling code runs as a normal thread rather
//! than inside a signal handler, so it may take locks, log and sync files.

mod error;

pub use error::ShutdownError;

use std::{
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use log::{error, info, warn};

use crate::filterbank::FilterbankOutputs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ShutdownState {
    /// Waiting for an interrupt.
    Armed = 0,

    /// An interrupt arrived and the outputs are being closed.
    Triggered = 1,

    /// Outputs have been closed, or the run finished normally and interrupts
    /// are no longer acted upon.
    Terminated = 2,
}

impl ShutdownState {
    fn from_u8(v: u8) -> ShutdownState {
        match v {
            0 => ShutdownState::Armed,
            1 => ShutdownState::Triggered,
            _ => ShutdownState::Terminated,
        }
    }
}

pub struct ShutdownCoordinator {
    state: AtomicU8,
    outputs: Arc<FilterbankOutputs>,
}

impl ShutdownCoordinator {
    pub fn new(outputs: Arc<FilterbankOutputs>) -> ShutdownCoordinator {
        ShutdownCoordinator {
            state: AtomicU8::new(ShutdownState::Armed as u8),
            outputs,
        }
    }

    pub fn state(&self) -> ShutdownState {
        ShutdownState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Close all outputs because of `reason`. Only the first call while armed
    /// does anything; it returns `true`, every other call returns `false`.
    pub fn trigger(&self, reason: &str) -> bool {
        if self
            .state
            .compare_exchange(
                ShutdownState::Armed as u8,
                ShutdownState::Triggered as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            return false;
        }

        warn!("{reason}; closing all outputs");
        match self.outputs.close_all() {
            Ok(num_closed) => info!("Flushed and closed {num_closed} output(s)"),
            Err(e) => error!("{e}"),
        }
        self.state.store(ShutdownState::Terminated as u8, Ordering::SeqCst);
        true
    }

    /// Stop acting on interrupts, because the run is finishing normally.
    /// Returns `false` if an interrupt got here first.
    pub fn disarm(&self) -> bool {
        self.state
            .compare_exchange(
                ShutdownState::Armed as u8,
                ShutdownState::Terminated as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Start a thread that waits for the interrupts in `signals`. On the
    /// first one, outputs are closed, the logger is flushed and the process
    /// exits with status 1. Interrupts that arrived after
    /// [`block_interrupts`] are acted upon straight away.
    pub fn install(
        self: &Arc<Self>,
        signals: BlockedInterrupts,
    ) -> Result<JoinHandle<()>, ShutdownError> {
        let coordinator = Arc::clone(self);
        thread::Builder::new()
            .name("signal-watcher".to_string())
            .spawn(move || {
                let signal = wait_for_signal(&signals.set);
                let name = match signal {
                    libc::SIGINT => "SIGINT",
                    libc::SIGTERM => "SIGTERM",
                    _ => "a signal",
                };
                if coordinator.trigger(&format!("Received {name}")) {
                    log::logger().flush();
                    std::process::exit(1);
                }
            })
            .map_err(ShutdownError::Spawn)
    }
}

/// SIGINT and SIGTERM, blocked in the thread that made this.
pub struct BlockedInterrupts {
    set: libc::sigset_t,
}

/// Block SIGINT and SIGTERM in the calling thread (and every thread it spawns
/// afterwards). They stay pending until a watcher is started with
/// [`ShutdownCoordinator::install`].
///
/// This must be called before any other threads are spawned, otherwise
/// those threads may receive the signal instead.
pub fn block_interrupts() -> Result<BlockedInterrupts, ShutdownError> {
    // SAFETY: `sigemptyset` initialises the set before anything reads it,
    // and `pthread_sigmask` only reads it.
    let set = unsafe {
        let mut set = std::mem::zeroed::<libc::sigset_t>();
        libc::sigemptyset(&mut set);
        libc::sigaddset(&mut set, libc::SIGINT);
        libc::sigaddset(&mut set, libc::SIGTERM);
        let rc = libc::pthread_sigmask(libc::SIG_BLOCK, &set, std::ptr::null_mut());
        if rc != 0 {
            return Err(ShutdownError::Mask(std::io::Error::from_raw_os_error(rc)));
        }
        set
    };
    Ok(BlockedInterrupts { set })
}

fn wait_for_signal(set: &libc::sigset_t) -> libc::c_int {
    let mut signal = 0;
    loop {
        // SAFETY: `set` is an initialised signal set and `signal` is a valid
        // place to put the result.
        let rc = unsafe { libc::sigwait(set, &mut signal) };
        if rc == 0 {
            return signal;
        }
    }
}
