//! In-memory transport for tests and simulation
//!
//! [`MemoryTransport::pair`] returns two connected ends. Cloning an end
//! yields a handle onto the same port, so a test can hand one clone to a
//! node and keep another to inject datagrams or schedule faults:
//!
//! ```rust
//! use hazardguard_core::link::{MemoryTransport, Transport};
//!
//! let (mut a, b) = MemoryTransport::pair("A", "B");
//! let control = b.clone();
//!
//! a.init().unwrap();
//! control.faults(|plan| plan.fail_inits = 1);
//! a.send(&"B", b"{}").unwrap();
//! assert_eq!(control.pending(), 1);
//! ```

use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use super::transport::{Datagram, Transport};
use crate::constants::MAX_DATAGRAM_LEN;
use crate::errors::TransportError;

/// Scheduled failures, consumed one per affected call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultPlan {
    /// Next `init` calls that fail
    pub fail_inits: u32,
    /// Next `send` calls that return an error
    pub fail_sends: u32,
    /// Next `send` calls that report success but lose the datagram
    pub drop_sends: u32,
}

#[derive(Debug, Default)]
struct Port {
    inbox: VecDeque<Datagram<&'static str>>,
    faults: FaultPlan,
    initialized: bool,
    sent: usize,
    init_calls: usize,
}

/// One end of an in-process datagram link
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    address: &'static str,
    peer: &'static str,
    local: Rc<RefCell<Port>>,
    remote: Rc<RefCell<Port>>,
}

impl MemoryTransport {
    pub fn pair(a: &'static str, b: &'static str) -> (Self, Self) {
        let port_a = Rc::new(RefCell::new(Port::default()));
        let port_b = Rc::new(RefCell::new(Port::default()));
        (
            Self {
                address: a,
                peer: b,
                local: port_a.clone(),
                remote: port_b.clone(),
            },
            Self {
                address: b,
                peer: a,
                local: port_b,
                remote: port_a,
            },
        )
    }

    pub fn address(&self) -> &'static str {
        self.address
    }

    /// Edit the fault plan of this end
    pub fn faults(&self, edit: impl FnOnce(&mut FaultPlan)) {
        edit(&mut self.local.borrow_mut().faults);
    }

    /// Place a datagram in this end's receive queue
    pub fn inject(&self, from: &'static str, bytes: &[u8]) {
        self.local.borrow_mut().inbox.push_back(Datagram {
            from,
            bytes: bytes.to_vec(),
        });
    }

    /// Datagrams waiting to be received by this end
    pub fn pending(&self) -> usize {
        self.local.borrow().inbox.len()
    }

    /// Remove and return everything waiting at this end
    pub fn drain(&self) -> Vec<Datagram<&'static str>> {
        self.local.borrow_mut().inbox.drain(..).collect()
    }

    /// Datagrams this end handed to the medium
    pub fn sent(&self) -> usize {
        self.local.borrow().sent
    }

    pub fn init_calls(&self) -> usize {
        self.local.borrow().init_calls
    }

    pub fn is_initialized(&self) -> bool {
        self.local.borrow().initialized
    }
}

impl Transport for MemoryTransport {
    type Address = &'static str;

    fn init(&mut self) -> Result<(), TransportError> {
        let mut port = self.local.borrow_mut();
        port.init_calls += 1;
        if port.faults.fail_inits > 0 {
            port.faults.fail_inits -= 1;
            return Err(TransportError::InitFailed { reason: "injected fault" });
        }
        port.initialized = true;
        Ok(())
    }

    fn send(&mut self, peer: &&'static str, bytes: &[u8]) -> Result<(), TransportError> {
        let mut port = self.local.borrow_mut();
        if !port.initialized {
            return Err(TransportError::NotInitialized);
        }
        if bytes.len() > MAX_DATAGRAM_LEN {
            return Err(TransportError::Oversized {
                len: bytes.len(),
                max: MAX_DATAGRAM_LEN,
            });
        }
        if port.faults.fail_sends > 0 {
            port.faults.fail_sends -= 1;
            return Err(TransportError::SendFailed { reason: "injected fault" });
        }
        port.sent += 1;
        if port.faults.drop_sends > 0 {
            port.faults.drop_sends -= 1;
            return Ok(());
        }
        drop(port);

        if *peer == self.peer {
            self.remote.borrow_mut().inbox.push_back(Datagram {
                from: self.address,
                bytes: bytes.to_vec(),
            });
        }
        Ok(())
    }

    fn recv(&mut self) -> nb::Result<Datagram<&'static str>, TransportError> {
        let mut port = self.local.borrow_mut();
        if !port.initialized {
            return Err(nb::Error::Other(TransportError::NotInitialized));
        }
        port.inbox.pop_front().ok_or(nb::Error::WouldBlock)
    }

    fn close(&mut self) {
        self.local.borrow_mut().initialized = false;
    }
}
