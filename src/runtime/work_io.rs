use std::fmt;

/// Work IO
///
/// Communicate between `work()` and the runtime.
#[derive(Default)]
pub struct WorkIo {
    /// Mark block as finished
    ///
    /// This is the end-of-stream sentinel. The block will not be called again.
    pub finished: bool,
}

impl WorkIo {
    /// Create a fresh Work IO
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Debug for WorkIo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("WorkIo")
            .field("finished", &self.finished)
            .finish()
    }
}
