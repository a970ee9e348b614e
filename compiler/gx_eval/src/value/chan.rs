//! Channels.
//!
//! Backed by crossbeam channels (`bounded(n)`, unbuffered is `bounded(0)`).
//! The VM runs a single task, so an operation that would block can never be
//! completed by anyone else: it is reported as a deadlock instead of
//! hanging the host thread.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crossbeam::channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};

use super::Value;
use crate::errors::{
    close_of_closed_channel, deadlock, send_on_closed_channel, ExecResult,
};

struct ChanState {
    tx: Sender<Value>,
    rx: Receiver<Value>,
    closed: Cell<bool>,
    cap: usize,
    /// Received from a closed, drained channel.
    zero: Value,
}

/// Reference to a channel.
#[derive(Clone)]
pub struct ChanValue(Rc<ChanState>);

/// Outcome of a non-blocking receive.
pub enum TryRecv {
    Value(Value),
    /// Closed and drained.
    Closed,
    /// Open and empty.
    Empty,
}

impl ChanValue {
    /// Channel with buffer capacity `cap` whose element zero value is `zero`.
    pub fn new(cap: usize, zero: Value) -> Self {
        let (tx, rx) = bounded(cap);
        ChanValue(Rc::new(ChanState {
            tx,
            rx,
            closed: Cell::new(false),
            cap,
            zero,
        }))
    }

    pub fn send(&self, value: Value) -> ExecResult {
        if self.0.closed.get() {
            return Err(send_on_closed_channel());
        }
        match self.0.tx.try_send(value) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => Err(deadlock().into()),
        }
    }

    /// Receive `(value, ok)`; `ok` is false once closed and drained.
    pub fn recv(&self) -> ExecResult<(Value, bool)> {
        match self.try_recv() {
            TryRecv::Value(value) => Ok((value, true)),
            TryRecv::Closed => Ok((self.0.zero.clone(), false)),
            TryRecv::Empty => Err(deadlock().into()),
        }
    }

    pub fn try_recv(&self) -> TryRecv {
        match self.0.rx.try_recv() {
            Ok(value) => TryRecv::Value(value),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) if self.0.closed.get() => {
                TryRecv::Closed
            }
            Err(_) => TryRecv::Empty,
        }
    }

    pub fn close(&self) -> ExecResult {
        if self.0.closed.replace(true) {
            return Err(close_of_closed_channel());
        }
        Ok(())
    }

    /// Buffered element count.
    pub fn len(&self) -> usize {
        self.0.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.rx.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.0.cap
    }

    pub fn ptr_eq(&self, other: &ChanValue) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Identity for map keys.
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

impl fmt::Debug for ChanValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chan(len {}, cap {})", self.len(), self.cap())
    }
}
