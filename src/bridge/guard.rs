//! Reentrancy guard
//!
//! The remote transport is one synchronous channel. While an outbound call
//! is in flight the remote side may call back into the host, but the host
//! must not start a second outbound call until the first returns. One depth
//! counter is shared by every bridge in a context.

use std::cell::Cell;
use std::rc::Rc;

use crate::error::BridgeError;

#[derive(Debug, Clone, Default)]
pub struct CallDepth(Rc<Cell<u32>>);

impl CallDepth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> u32 {
        self.0.get()
    }

    /// Mark an outbound call as in flight until the guard drops.
    pub fn enter(&self, operation: &'static str) -> Result<CallGuard, BridgeError> {
        if self.0.get() > 0 {
            tracing::debug!(operation, "rejected reentrant remote call");
            return Err(BridgeError::Reentrancy { operation });
        }
        self.0.set(self.0.get() + 1);
        Ok(CallGuard {
            depth: self.0.clone(),
        })
    }
}

/// Decrements the shared depth when dropped, including on early returns.
#[derive(Debug)]
pub struct CallGuard {
    depth: Rc<Cell<u32>>,
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}
