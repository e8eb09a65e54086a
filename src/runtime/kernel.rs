use std::any::Any;
use std::future::Future;

use crate::runtime::BlockMeta;
use crate::runtime::WorkIo;

/// Kernel
///
/// Central trait to implement a block. The scheduler calls [`work`](Kernel::work)
/// whenever input or output space became available; the kernel consumes and
/// produces on its stream ports directly, so rate-changing blocks report
/// consumption and production independently.
pub trait Kernel: Send {
    /// Processes stream data
    fn work(
        &mut self,
        _io: &mut WorkIo,
        _meta: &mut BlockMeta,
    ) -> impl Future<Output = anyhow::Result<()>> + Send {
        async { Ok(()) }
    }
    /// Initialize kernel
    fn init(&mut self, _meta: &mut BlockMeta) -> impl Future<Output = anyhow::Result<()>> + Send {
        async { Ok(()) }
    }
    /// De-initialize kernel
    fn deinit(
        &mut self,
        _meta: &mut BlockMeta,
    ) -> impl Future<Output = anyhow::Result<()>> + Send {
        async { Ok(()) }
    }
    /// Minimum number of input items required to produce `noutput_items`
    fn forecast(&self, noutput_items: usize) -> usize {
        noutput_items
    }
}

/// Interface to the stream ports of a kernel.
///
/// Used by schedulers and the [`Mocker`](crate::runtime::Mocker) to move data
/// in and out of a block without knowing its concrete type.
pub trait KernelInterface {
    /// Name of the block
    fn type_name() -> &'static str;
    /// Input Stream Ports
    fn stream_inputs(&self) -> Vec<String>;
    /// Output Stream Ports
    fn stream_outputs(&self) -> Vec<String>;
    /// Get type-erased reference to stream input `id`
    fn stream_input(&mut self, id: usize) -> Option<&mut dyn Any>;
    /// Get type-erased reference to stream output `id`
    fn stream_output(&mut self, id: usize) -> Option<&mut dyn Any>;
}
