//! Lock-free, append-only timing trace.
//!
//! A [`Profiler`] is a handle on a shared chain of timestamped, tagged entries.
//! [`Profiler::time`] prepends to the chain with a compare-and-swap loop, so any
//! number of threads (holding the same profiler or clones of it) can record
//! concurrently without locks. Clones are shallow: they share the chain, which
//! lives as long as its longest-lived handle.
//!
//! Iteration yields the most recently inserted entry first.

use crate::error::{ClusterError, Result};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Interned tag text. Entries hold a reference-counted handle rather than a copy.
pub type Tag = Arc<str>;

/// Info attached to the opening marker of a [`Scope`].
pub const ENTER: &str = "ENTER";

/// Info attached to the closing marker of a [`Scope`].
pub const LEAVE: &str = "LEAVE";

/// Optional payload attached to an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Info {
    /// Shared text that the trace does not own, such as scope markers.
    Static(&'static str),
    /// Text owned by the entry and dropped with the chain.
    Text(String),
}

impl Info {
    pub fn text(&self) -> &str {
        match self {
            Info::Static(s) => s,
            Info::Text(s) => s,
        }
    }

    /// Whether the trace owns this payload.
    pub fn is_owned(&self) -> bool {
        matches!(self, Info::Text(_))
    }
}

impl From<String> for Info {
    fn from(text: String) -> Self {
        Info::Text(text)
    }
}

/// One record of the trace.
pub struct Entry {
    tag: Tag,
    time: Instant,
    info: Option<Info>,
    next: AtomicPtr<Entry>,
}

impl Entry {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn time(&self) -> Instant {
        self.time
    }

    pub fn info(&self) -> Option<&Info> {
        self.info.as_ref()
    }

    /// Whether the trace owns this entry's info payload.
    pub fn owned(&self) -> bool {
        self.info.as_ref().is_some_and(Info::is_owned)
    }

    fn is_enter(&self) -> bool {
        self.info == Some(Info::Static(ENTER))
    }

    fn is_leave(&self) -> bool {
        self.info == Some(Info::Static(LEAVE))
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("tag", &self.tag)
            .field("time", &self.time)
            .field("info", &self.info)
            .finish()
    }
}

/// Observer invoked synchronously on every [`Profiler::time`] call.
///
/// Implementations may be called from many threads at once.
pub trait Report: Send + Sync {
    /// `elapsed` is measured from the chain's [`Profiler::initial`] instant.
    fn report(&self, entry: &Entry, elapsed: Duration);
}

/// Streams entries whose tag passes a filter to `tracing` at info level.
pub struct TraceReporter {
    filter: Box<dyn Fn(&str) -> bool + Send + Sync>,
}

impl TraceReporter {
    /// Report every entry.
    pub fn all() -> Self {
        Self::new(|_| true)
    }

    /// Report entries whose tag satisfies `filter`.
    pub fn new<F>(filter: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            filter: Box::new(filter),
        }
    }

    /// Report entries whose tag contains `pattern`.
    pub fn matching(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        Self::new(move |tag| tag.contains(pattern.as_str()))
    }
}

impl Report for TraceReporter {
    fn report(&self, entry: &Entry, elapsed: Duration) {
        if !(self.filter)(entry.tag()) {
            return;
        }
        tracing::info!(
            target: "logmeans::profiler",
            tag = entry.tag(),
            elapsed = %Pretty(elapsed),
            info = entry.info().map(Info::text).unwrap_or_default(),
            "profile"
        );
    }
}

/// Stable set of interned tags, used when rebuilding a trace from JSON.
#[derive(Debug, Default)]
pub struct TagSet {
    tags: BTreeSet<Tag>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the shared handle for `tag`, inserting it on first use.
    pub fn intern(&mut self, tag: &str) -> Tag {
        if let Some(existing) = self.tags.get(tag) {
            return existing.clone();
        }
        let tag: Tag = Arc::from(tag);
        self.tags.insert(tag.clone());
        tag
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// The shared chain. Acts as the sentinel: it carries the construction instant
/// and the head pointer.
struct Chain {
    initial: Instant,
    head: AtomicPtr<Entry>,
}

impl Chain {
    fn new() -> Self {
        Self {
            initial: Instant::now(),
            head: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Publish `entry` as the new head.
    fn push(&self, entry: Entry) -> &Entry {
        let entry = Box::into_raw(Box::new(entry));
        let mut next = self.head.load(Ordering::Relaxed);
        loop {
            // SAFETY: `entry` is not published yet, so this thread has exclusive access.
            unsafe { (*entry).next.store(next, Ordering::Relaxed) };
            match self
                .head
                .compare_exchange_weak(next, entry, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(current) => next = current,
            }
        }
        // SAFETY: published entries are only freed when the chain itself drops.
        unsafe { &*entry }
    }
}

impl Drop for Chain {
    fn drop(&mut self) {
        // Unlink one node at a time; a recursive drop would overflow the stack
        // on long traces.
        let mut cur = *self.head.get_mut();
        while !cur.is_null() {
            // SAFETY: every node came from `Box::into_raw` in `push` and is
            // reachable exactly once from the head.
            let mut node = unsafe { Box::from_raw(cur) };
            cur = *node.next.get_mut();
        }
    }
}

/// Thread-safe timing log.
///
/// Cloning is shallow: the clone appends to the same chain and keeps the same
/// reporter.
#[derive(Clone)]
pub struct Profiler {
    chain: Arc<Chain>,
    reporter: Option<Arc<dyn Report>>,
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Profiler {
    /// Create a profiler with a fresh, empty chain and no reporter.
    pub fn new() -> Self {
        Self {
            chain: Arc::new(Chain::new()),
            reporter: None,
        }
    }

    /// Create a profiler with a fresh chain that streams entries to `reporter`.
    pub fn with_reporter(reporter: Arc<dyn Report>) -> Self {
        Self {
            chain: Arc::new(Chain::new()),
            reporter: Some(reporter),
        }
    }

    /// Replace the reporter of this handle. Other handles on the chain keep theirs.
    pub fn set_reporter(&mut self, reporter: Option<Arc<dyn Report>>) {
        self.reporter = reporter;
    }

    /// Instant at which the chain was created, the zero point of every trace.
    pub fn initial(&self) -> Instant {
        self.chain.initial
    }

    /// Time elapsed between [`initial`](Self::initial) and `entry`.
    pub fn elapsed(&self, entry: &Entry) -> Duration {
        entry.time.saturating_duration_since(self.chain.initial)
    }

    /// Record one entry. Lock-free and safe to call from any thread.
    pub fn time(&self, tag: impl Into<Tag>, info: Option<Info>) -> &Entry {
        let entry = self.chain.push(Entry {
            tag: tag.into(),
            time: Instant::now(),
            info,
            next: AtomicPtr::new(ptr::null_mut()),
        });
        if let Some(reporter) = &self.reporter {
            reporter.report(entry, self.elapsed(entry));
        }
        entry
    }

    /// Record an entry without info.
    pub fn mark(&self, tag: impl Into<Tag>) -> &Entry {
        self.time(tag, None)
    }

    /// Bracket a region: records ENTER now and LEAVE when the guard drops.
    pub fn scope(&self, tag: impl Into<Tag>) -> Scope<'_> {
        Scope::new(self, tag)
    }

    /// Whether `other` appends to the same chain.
    pub fn shares_chain_with(&self, other: &Profiler) -> bool {
        Arc::ptr_eq(&self.chain, &other.chain)
    }

    /// Entries, newest first.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            cur: self.chain.head.load(Ordering::Acquire),
            _chain: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.head.load(Ordering::Acquire).is_null()
    }

    /// Serialize the trace, oldest first, as `[[tag, elapsed_ns, info?], ...]`.
    pub fn to_json(&self) -> Value {
        let mut entries: Vec<&Entry> = self.iter().collect();
        entries.reverse();

        let records = entries
            .into_iter()
            .map(|entry| {
                let elapsed = self.elapsed(entry).as_nanos() as f64;
                match entry.info() {
                    Some(info) => json!([entry.tag(), elapsed, info.text()]),
                    None => json!([entry.tag(), elapsed]),
                }
            })
            .collect();

        Value::Array(records)
    }

    /// Rebuild a trace from [`to_json`](Self::to_json) output.
    ///
    /// Timestamps are synthesized by adding each elapsed value to the new
    /// chain's `initial()`. Tags are interned into `tags`.
    ///
    /// The format does not distinguish scope markers from text: an info
    /// string equal to `"ENTER"` or `"LEAVE"` always comes back as a scope
    /// marker, even when it was recorded as plain `Info::Text`, and renders
    /// as a scope in `Display`.
    pub fn from_json(json: &Value, tags: &mut TagSet) -> Result<Profiler> {
        let records = json
            .as_array()
            .ok_or_else(|| ClusterError::MalformedTrace("expected an array".to_string()))?;

        let profiler = Profiler::new();
        for (i, record) in records.iter().enumerate() {
            let fields = record
                .as_array()
                .filter(|f| f.len() == 2 || f.len() == 3)
                .ok_or_else(|| {
                    ClusterError::MalformedTrace(format!("record {} is not a 2 or 3 element array", i))
                })?;

            let tag = fields[0].as_str().ok_or_else(|| {
                ClusterError::MalformedTrace(format!("record {} has a non-string tag", i))
            })?;

            let elapsed = fields[1]
                .as_f64()
                .filter(|ns| ns.is_finite() && *ns >= 0.0)
                .ok_or_else(|| {
                    ClusterError::MalformedTrace(format!("record {} has an invalid elapsed time", i))
                })?;

            let info = match fields.get(2) {
                None => None,
                Some(v) => {
                    let text = v.as_str().ok_or_else(|| {
                        ClusterError::MalformedTrace(format!("record {} has a non-string info", i))
                    })?;
                    Some(match text {
                        ENTER => Info::Static(ENTER),
                        LEAVE => Info::Static(LEAVE),
                        _ => Info::Text(text.to_string()),
                    })
                }
            };

            profiler.chain.push(Entry {
                tag: tags.intern(tag),
                time: profiler.chain.initial + Duration::from_nanos(elapsed.round() as u64),
                info,
                next: AtomicPtr::new(ptr::null_mut()),
            });
        }

        Ok(profiler)
    }
}

impl fmt::Debug for Profiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profiler")
            .field("initial", &self.chain.initial)
            .field("entries", &self.len())
            .finish()
    }
}

/// Indented, chronological rendering. A scope prints an opening line, its
/// inner entries one level deeper, and a closing line with its duration.
impl fmt::Display for Profiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<&Entry> = self.iter().collect();
        entries.reverse();

        let mut stack: Vec<&Entry> = Vec::new();
        let mut last = self.initial();
        for entry in entries {
            let closes = entry.is_leave() && stack.last().is_some_and(|open| open.tag == entry.tag);

            if closes {
                if let Some(open) = stack.pop() {
                    indent(f, stack.len())?;
                    let span = entry.time.saturating_duration_since(open.time);
                    writeln!(f, "{} [{}]", entry.tag, Pretty(span))?;
                }
            } else {
                indent(f, stack.len())?;
                let delta = entry.time.saturating_duration_since(last);
                write!(f, "{} [{}]", entry.tag, Pretty(delta))?;
                match entry.info() {
                    Some(_) if entry.is_enter() => stack.push(entry),
                    Some(info) => write!(f, " : {}", info.text())?,
                    None => {}
                }
                writeln!(f)?;
            }

            last = entry.time;
        }
        Ok(())
    }
}

fn indent(f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        f.write_str("\t")?;
    }
    Ok(())
}

/// Human-readable duration: ns, us, ms or s, switching units at 10 000.
pub struct Pretty(pub Duration);

impl fmt::Display for Pretty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut count = self.0.as_nanos();
        if count < 10_000 {
            return write!(f, "{}ns", count);
        }
        count /= 1000;
        if count < 10_000 {
            return write!(f, "{}us", count);
        }
        count /= 1000;
        if count < 10_000 {
            return write!(f, "{}ms", count);
        }
        write!(f, "{}s", count / 1000)
    }
}

/// Forward-only iterator over a chain, newest first.
pub struct Iter<'a> {
    cur: *const Entry,
    _chain: PhantomData<&'a Profiler>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Entry;

    fn next(&mut self) -> Option<&'a Entry> {
        if self.cur.is_null() {
            return None;
        }
        // SAFETY: the borrowed profiler keeps the chain, and every published
        // entry in it, alive for 'a.
        let entry = unsafe { &*self.cur };
        self.cur = entry.next.load(Ordering::Acquire);
        Some(entry)
    }
}

impl<'a> IntoIterator for &'a Profiler {
    type Item = &'a Entry;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

/// Guard recording an ENTER marker on creation and a LEAVE marker on drop.
#[must_use = "a scope records LEAVE as soon as it is dropped"]
pub struct Scope<'a> {
    profiler: &'a Profiler,
    tag: Tag,
}

impl<'a> Scope<'a> {
    pub fn new(profiler: &'a Profiler, tag: impl Into<Tag>) -> Self {
        let tag = tag.into();
        profiler.time(tag.clone(), Some(Info::Static(ENTER)));
        Self { profiler, tag }
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        self.profiler.time(self.tag.clone(), Some(Info::Static(LEAVE)));
    }
}
