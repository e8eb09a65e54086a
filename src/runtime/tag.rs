use std::fmt;

/// Absolute time, split into integer and fractional seconds.
///
/// Radio front ends report sample times this way to avoid losing resolution
/// in a single `f64` once the clock has been running for a while.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Timestamp {
    /// Integer seconds
    pub secs: u64,
    /// Fractional seconds in `[0, 1)`
    pub frac_secs: f64,
}

impl Timestamp {
    /// Create a timestamp, normalizing the fractional part into `[0, 1)`.
    pub fn new(secs: u64, frac_secs: f64) -> Self {
        Timestamp { secs, frac_secs }.normalized()
    }

    /// Timestamp shifted by `elapsed` seconds.
    ///
    /// Negative shifts saturate at time zero.
    pub fn add_secs(&self, elapsed: f64) -> Timestamp {
        let whole = elapsed.floor();
        let secs = self.secs as i64 + whole as i64;
        if secs < 0 {
            return Timestamp::default();
        }
        Timestamp {
            secs: secs as u64,
            frac_secs: self.frac_secs + (elapsed - whole),
        }
        .normalized()
    }

    /// Time as a single `f64` (lossy).
    pub fn as_secs_f64(&self) -> f64 {
        self.secs as f64 + self.frac_secs
    }

    fn normalized(mut self) -> Self {
        if self.frac_secs >= 1.0 {
            let carry = self.frac_secs.trunc();
            self.secs += carry as u64;
            self.frac_secs -= carry;
        }
        self
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{:.9}s", self.secs, self.frac_secs)
    }
}

/// Stream tag
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq)]
pub enum Tag {
    /// A key without value, e.g., start or end of burst
    Flag(String),
    /// An `f32` with a name
    NamedF32(String, f32),
    /// An `f64` with a name
    NamedF64(String, f64),
    /// A [`Timestamp`] with a name
    NamedTime(String, Timestamp),
}

impl Tag {
    /// Key of the tag.
    pub fn key(&self) -> &str {
        match self {
            Tag::Flag(k) | Tag::NamedF32(k, _) | Tag::NamedF64(k, _) | Tag::NamedTime(k, _) => k,
        }
    }

    /// Value of a [`Tag::NamedTime`].
    pub fn as_time(&self) -> Option<Timestamp> {
        match self {
            Tag::NamedTime(_, t) => Some(*t),
            _ => None,
        }
    }

    /// Value of a [`Tag::NamedF64`] or [`Tag::NamedF32`].
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Tag::NamedF64(_, v) => Some(*v),
            Tag::NamedF32(_, v) => Some(*v as f64),
            _ => None,
        }
    }
}

/// Item tag
#[derive(Clone, Debug, PartialEq)]
pub struct ItemTag {
    /// Absolute index of the item on its port
    pub index: usize,
    /// [`Tag`] value
    pub tag: Tag,
    /// Name of the block that emitted the tag
    pub source: Option<String>,
}

impl ItemTag {
    /// Create a tag without source.
    pub fn new(index: usize, tag: Tag) -> Self {
        ItemTag {
            index,
            tag,
            source: None,
        }
    }

    /// Check whether the tag has the given key.
    pub fn has_key(&self, key: &str) -> bool {
        self.tag.key() == key
    }
}

/// Pick the most recently produced tag.
///
/// The tag with the highest index wins. Among tags on the same index, the
/// one emitted last wins.
pub fn most_recent<'a>(tags: impl IntoIterator<Item = &'a ItemTag>) -> Option<&'a ItemTag> {
    tags.into_iter()
        .fold(None, |best: Option<&ItemTag>, t| match best {
            Some(b) if b.index > t.index => Some(b),
            _ => Some(t),
        })
}
