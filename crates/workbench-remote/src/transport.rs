use std::cell::RefCell;
use std::collections::HashSet;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::contracts::TransportError;
use crate::contracts::TransportKey;

/// Factory for terminal connections. At most one live connection per
/// distinct key; a second `connect` for an open key is rejected.
pub trait TerminalEndpoint {
    fn connect(&mut self, key: &TransportKey) -> Result<Box<dyn TerminalConn>, TransportError>;
}

/// One live terminal wire. Faults on one connection never affect another.
pub trait TerminalConn {
    fn send_line(&mut self, line: &str) -> Result<(), TransportError>;
    fn poll_output(&mut self) -> Result<Option<String>, TransportError>;
    fn close(&mut self);
}

impl<E: TerminalEndpoint> TerminalEndpoint for Rc<RefCell<E>> {
    fn connect(&mut self, key: &TransportKey) -> Result<Box<dyn TerminalConn>, TransportError> {
        self.borrow_mut().connect(key)
    }
}

/// Echo endpoint: every line sent comes back as output. Stands in for the
/// real backend in tests and offline runs.
#[derive(Debug, Default)]
pub struct LoopbackEndpoint {
    open: Rc<RefCell<HashSet<TransportKey>>>,
    refuse: HashSet<TransportKey>,
}

impl LoopbackEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `connect` for this key fail.
    pub fn refuse(&mut self, key: TransportKey) {
        self.refuse.insert(key);
    }

    pub fn open_count(&self) -> usize {
        self.open.borrow().len()
    }

    pub fn is_open(&self, key: &TransportKey) -> bool {
        self.open.borrow().contains(key)
    }
}

impl TerminalEndpoint for LoopbackEndpoint {
    fn connect(&mut self, key: &TransportKey) -> Result<Box<dyn TerminalConn>, TransportError> {
        if self.refuse.contains(key) {
            return Err(TransportError::ConnectFailed(format!(
                "endpoint refused {key}"
            )));
        }
        if !self.open.borrow_mut().insert(key.clone()) {
            return Err(TransportError::AlreadyConnected(key.clone()));
        }
        Ok(Box::new(LoopbackConn {
            key: key.clone(),
            open: Rc::clone(&self.open),
            queue: VecDeque::new(),
            closed: false,
        }))
    }
}

struct LoopbackConn {
    key: TransportKey,
    open: Rc<RefCell<HashSet<TransportKey>>>,
    queue: VecDeque<String>,
    closed: bool,
}

impl TerminalConn for LoopbackConn {
    fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.queue.push_back(line.to_string());
        Ok(())
    }

    fn poll_output(&mut self) -> Result<Option<String>, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        Ok(self.queue.pop_front())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.open.borrow_mut().remove(&self.key);
        }
    }
}

impl Drop for LoopbackConn {
    fn drop(&mut self) {
        self.close();
    }
}
