//! Run a block without a scheduler.
use std::fmt::Debug;

use crate::runtime::BlockMeta;
use crate::runtime::Error;
use crate::runtime::ItemTag;
use crate::runtime::Kernel;
use crate::runtime::KernelInterface;
use crate::runtime::StreamInput;
use crate::runtime::StreamOutput;
use crate::runtime::WorkIo;

/// Mocker for a block
///
/// A harness to run a block without a runtime. Used for unit tests and
/// benchmarking. Each [`run`](Mocker::run) calls `work()` until the kernel
/// stops asking to be called again, which mirrors what a scheduler would do
/// with the data currently buffered.
pub struct Mocker<K> {
    kernel: K,
    meta: BlockMeta,
    finished: bool,
}

impl<K: Kernel + KernelInterface + 'static> Mocker<K> {
    /// Create mocker
    pub fn new(kernel: K) -> Self {
        let mut meta = BlockMeta::new(K::type_name());
        meta.set_instance_name(&format!("{}_0", K::type_name()));
        Mocker {
            kernel,
            meta,
            finished: false,
        }
    }

    /// Add input buffer with given data
    pub fn input<T>(&mut self, id: usize, data: Vec<T>)
    where
        T: Copy + Debug + Send + 'static,
    {
        self.input_with_tags(id, data, Vec::new());
    }

    /// Add input buffer with given data and tags
    ///
    /// Tag indices are relative to the first item of `data`.
    pub fn input_with_tags<T>(&mut self, id: usize, data: Vec<T>, tags: Vec<ItemTag>)
    where
        T: Copy + Debug + Send + 'static,
    {
        let input = self.typed_input::<T>(id).unwrap();
        input.push(&data, tags).unwrap();
        input.finish();
    }

    /// Initialize output buffer with room for `size` items
    pub fn init_output<T>(&mut self, id: usize, size: usize)
    where
        T: Copy + Default + Debug + Send + 'static,
    {
        self.typed_output::<T>(id).unwrap().reserve(size);
    }

    /// Get data from output buffer
    pub fn output<T>(&mut self, id: usize) -> (Vec<T>, Vec<ItemTag>)
    where
        T: Copy + Default + Debug + Send + 'static,
    {
        self.typed_output::<T>(id).unwrap().get()
    }

    /// Taking data from output buffer, freeing up the buffer
    pub fn take_output<T>(&mut self, id: usize) -> (Vec<T>, Vec<ItemTag>)
    where
        T: Copy + Default + Debug + Send + 'static,
    {
        self.typed_output::<T>(id).unwrap().take()
    }

    /// Access the wrapped kernel
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Access the wrapped kernel mutably
    pub fn kernel_mut(&mut self) -> &mut K {
        &mut self.kernel
    }

    /// Whether the kernel signalled end-of-stream
    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Init the block wrapped by the mocker
    pub fn init(&mut self) {
        futures::executor::block_on(self.kernel.init(&mut self.meta)).unwrap();
    }

    /// Deinit the block wrapped by the mocker
    pub fn deinit(&mut self) {
        futures::executor::block_on(self.kernel.deinit(&mut self.meta)).unwrap();
    }

    /// Run the block wrapped by the mocker
    ///
    /// Panics if the kernel returns an error; use [`try_run`](Self::try_run)
    /// to inspect it.
    pub fn run(&mut self) {
        self.try_run().unwrap();
    }

    /// Run the block, returning kernel errors
    pub fn try_run(&mut self) -> Result<(), Error> {
        futures::executor::block_on(self.run_async())
    }

    /// Run the mocker async
    pub async fn run_async(&mut self) -> Result<(), Error> {
        let mut io = WorkIo::new();
        self.kernel
            .work(&mut io, &mut self.meta)
            .await
            .map_err(|e| Error::KernelError(e.to_string()))?;

        if io.finished {
            self.finished = true;
        }
        Ok(())
    }

    fn typed_input<T: Copy + Send + 'static>(
        &mut self,
        id: usize,
    ) -> Result<&mut StreamInput<T>, Error> {
        let name = K::type_name().to_string();
        self.kernel
            .stream_input(id)
            .ok_or_else(|| Error::InvalidStreamPort(name.clone(), id))?
            .downcast_mut::<StreamInput<T>>()
            .ok_or(Error::InvalidItemType(name, id))
    }

    fn typed_output<T: Copy + Default + Send + 'static>(
        &mut self,
        id: usize,
    ) -> Result<&mut StreamOutput<T>, Error> {
        let name = K::type_name().to_string();
        self.kernel
            .stream_output(id)
            .ok_or_else(|| Error::InvalidStreamPort(name.clone(), id))?
            .downcast_mut::<StreamOutput<T>>()
            .ok_or(Error::InvalidItemType(name, id))
    }
}
