//! Typed stream ports.
//!
//! Items on a port are vectors of `vlen` scalars, so a port can carry single
//! samples (`vlen == 1`) or whole OFDM symbols. All counters and tag indices
//! count items, not scalars, and are absolute since the start of the stream.
use crate::runtime::Error;
use crate::runtime::ItemTag;
use crate::runtime::Tag;
use crate::runtime::most_recent;

/// Stream input port
#[derive(Debug)]
pub struct StreamInput<T> {
    name: String,
    vlen: usize,
    buffer: Vec<T>,
    tags: Vec<ItemTag>,
    nitems_read: usize,
    connected: bool,
    finished: bool,
}

impl<T: Copy + Send + 'static> StreamInput<T> {
    /// Create input port with scalar items
    pub fn new(name: &str) -> Self {
        Self::with_vlen(name, 1)
    }

    /// Create input port with vector items
    pub fn with_vlen(name: &str, vlen: usize) -> Self {
        assert!(vlen > 0, "vector length must be positive");
        StreamInput {
            name: name.to_string(),
            vlen,
            buffer: Vec::new(),
            tags: Vec::new(),
            nitems_read: 0,
            connected: false,
            finished: false,
        }
    }

    /// Port name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of scalars per item
    pub fn vlen(&self) -> usize {
        self.vlen
    }

    /// All available scalars
    pub fn slice(&self) -> &[T] {
        &self.buffer
    }

    /// Available scalars and tags
    pub fn slice_with_tags(&self) -> (&[T], &[ItemTag]) {
        (&self.buffer, &self.tags)
    }

    /// Number of available items
    pub fn items(&self) -> usize {
        self.buffer.len() / self.vlen
    }

    /// Available item `i`, relative to the read pointer
    pub fn item(&self, i: usize) -> &[T] {
        &self.buffer[i * self.vlen..(i + 1) * self.vlen]
    }

    /// Tags on available items (absolute indices)
    pub fn tags(&self) -> &[ItemTag] {
        &self.tags
    }

    /// Absolute index of the next item to read
    pub fn nitems_read(&self) -> usize {
        self.nitems_read
    }

    /// Tags with `key` in the absolute half-open range `[start, end)`.
    pub fn tags_in_range<'a>(
        &'a self,
        start: usize,
        end: usize,
        key: &'a str,
    ) -> impl Iterator<Item = &'a ItemTag> + 'a {
        self.tags
            .iter()
            .filter(move |t| t.index >= start && t.index < end && t.has_key(key))
    }

    /// Most recent tag with `key` in the absolute half-open range `[start, end)`.
    pub fn most_recent_tag<'a>(
        &'a self,
        start: usize,
        end: usize,
        key: &'a str,
    ) -> Option<&'a ItemTag> {
        most_recent(self.tags_in_range(start, end, key))
    }

    /// Consume `amount` items
    pub fn consume(&mut self, amount: usize) {
        if amount == 0 {
            return;
        }
        debug_assert!(amount <= self.items());
        self.buffer.drain(..amount * self.vlen);
        self.nitems_read += amount;
        let read = self.nitems_read;
        self.tags.retain(|t| t.index >= read);
    }

    /// Append data.
    ///
    /// Tag indices are relative to the first item of `data`.
    pub fn push(&mut self, data: &[T], tags: Vec<ItemTag>) -> Result<(), Error> {
        if data.len() % self.vlen != 0 {
            return Err(Error::VectorLength(data.len(), self.vlen));
        }
        let offset = self.nitems_read + self.items();
        self.tags.extend(tags.into_iter().map(|mut t| {
            t.index += offset;
            t
        }));
        self.buffer.extend_from_slice(data);
        self.connected = true;
        Ok(())
    }

    /// Whether a producer is attached
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Mark that no more data will arrive
    pub fn finish(&mut self) {
        self.finished = true;
    }

    /// Upstream is done; only the buffered items remain
    pub fn finished(&self) -> bool {
        self.finished
    }
}

/// Stream output port
#[derive(Debug)]
pub struct StreamOutput<T> {
    name: String,
    vlen: usize,
    buffer: Vec<T>,
    produced: usize,
    capacity: usize,
    tags: Vec<ItemTag>,
    nitems_written: usize,
    nitems_taken: usize,
    connected: bool,
}

impl<T: Copy + Default + Send + 'static> StreamOutput<T> {
    /// Create output port with scalar items
    pub fn new(name: &str) -> Self {
        Self::with_vlen(name, 1)
    }

    /// Create output port with vector items
    pub fn with_vlen(name: &str, vlen: usize) -> Self {
        assert!(vlen > 0, "vector length must be positive");
        StreamOutput {
            name: name.to_string(),
            vlen,
            buffer: Vec::new(),
            produced: 0,
            capacity: 0,
            tags: Vec::new(),
            nitems_written: 0,
            nitems_taken: 0,
            connected: false,
        }
    }

    /// Port name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of scalars per item
    pub fn vlen(&self) -> usize {
        self.vlen
    }

    /// Free space to write to
    pub fn slice(&mut self) -> &mut [T] {
        &mut self.buffer[self.produced..]
    }

    /// Free item `i`, relative to the write pointer
    pub fn item_mut(&mut self, i: usize) -> &mut [T] {
        let start = self.produced + i * self.vlen;
        &mut self.buffer[start..start + self.vlen]
    }

    /// Number of free items
    pub fn items(&self) -> usize {
        (self.buffer.len() - self.produced) / self.vlen
    }

    /// Absolute index of the next item to write
    pub fn nitems_written(&self) -> usize {
        self.nitems_written
    }

    /// Commit `amount` items
    pub fn produce(&mut self, amount: usize) {
        if amount == 0 {
            return;
        }
        debug_assert!(amount <= self.items());
        self.produced += amount * self.vlen;
        self.nitems_written += amount;
    }

    /// Attach a tag to the absolute item index `index`.
    pub fn add_tag(&mut self, index: usize, tag: Tag) {
        self.tags.push(ItemTag::new(index, tag));
    }

    /// Attach a tag with source id to the absolute item index `index`.
    pub fn add_tag_from(&mut self, index: usize, tag: Tag, source: &str) {
        self.tags.push(ItemTag {
            index,
            tag,
            source: Some(source.to_string()),
        });
    }

    /// Make room for `items` items and mark the port connected.
    pub fn reserve(&mut self, items: usize) {
        self.capacity = items;
        self.buffer
            .resize(self.produced + items * self.vlen, T::default());
        self.connected = true;
    }

    /// Whether a consumer is attached
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Produced data and tags since the last [`take`](Self::take).
    ///
    /// Tag indices are relative to the first returned item.
    pub fn get(&self) -> (Vec<T>, Vec<ItemTag>) {
        let base = self.nitems_taken;
        let written = self.nitems_written;
        let tags = self
            .tags
            .iter()
            .filter(|t| t.index < written)
            .cloned()
            .map(|mut t| {
                t.index -= base;
                t
            })
            .collect();
        (self.buffer[..self.produced].to_vec(), tags)
    }

    /// Take produced data and tags, freeing up the buffer.
    pub fn take(&mut self) -> (Vec<T>, Vec<ItemTag>) {
        let ret = self.get();
        self.buffer.drain(..self.produced);
        self.produced = 0;
        self.buffer.resize(self.capacity * self.vlen, T::default());
        let written = self.nitems_written;
        self.tags.retain(|t| t.index >= written);
        self.nitems_taken = written;
        ret
    }
}
