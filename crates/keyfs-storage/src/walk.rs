//! Directory inference for `/`-delimited keys.
//!
//! Given a key and the length of a prefix already known to be a directory
//! (including its trailing `/`), the walker yields the key cut at each
//! following separator. With `dir/` as the prefix:
//!
//! ```text
//! key          non-recursive   recursive
//! dir/a/1/2    dir/a           dir/a, dir/a/1, dir/a/1/2
//! dir/c        dir/c           dir/c
//! dir/         (nothing)       (nothing)
//! ```
//!
//! Nothing here touches an engine; [`list_children`] runs the whole listing
//! over any key set.

use std::collections::HashSet;

/// The hierarchy separator.
pub const SEPARATOR: u8 = b'/';

/// `prefix` with the separator appended: the key prefix shared by everything
/// under the directory `prefix`.
pub fn dir_prefix(prefix: &str) -> String {
    let mut dir = String::with_capacity(prefix.len() + 1);
    dir.push_str(prefix);
    dir.push(SEPARATOR as char);
    dir
}

/// Iterator over the segment boundaries of a key. See [`segments`].
#[derive(Clone, Debug)]
pub struct Segments<'k> {
    key: &'k [u8],
    start: usize,
    recursive: bool,
    done: bool,
}

/// Walk `key` starting at byte offset `start`.
///
/// Each item is `key` truncated at the next separator (or at its end). A
/// non-recursive walk stops after the first item; a recursive one continues
/// past each separator until the key runs out.
pub fn segments(key: &[u8], start: usize, recursive: bool) -> Segments<'_> {
    Segments {
        key,
        start,
        recursive,
        done: false,
    }
}

impl<'k> Iterator for Segments<'k> {
    type Item = &'k [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.start >= self.key.len() {
            return None;
        }
        let sep = self.key[self.start..].iter().position(|&b| b == SEPARATOR);
        let end = match sep {
            Some(i) => self.start + i,
            None => self.key.len(),
        };
        if self.recursive && sep.is_some() {
            self.start = end + 1;
        } else {
            self.done = true;
        }
        Some(&self.key[..end])
    }
}

/// Callback form of [`segments`].
pub fn walk_key(key: &[u8], start: usize, recursive: bool, mut emit: impl FnMut(&[u8])) {
    for segment in segments(key, start, recursive) {
        emit(segment);
    }
}

/// Accumulates the entries of one directory listing.
///
/// Keys are fed in one at a time; their segments under the directory are
/// recorded once each, in order of first appearance.
#[derive(Debug)]
pub struct Listing {
    start: usize,
    recursive: bool,
    seen: HashSet<String>,
    entries: Vec<String>,
}

impl Listing {
    /// Start a listing of the directory whose key prefix is `dir`
    /// (as produced by [`dir_prefix`]).
    pub fn new(dir: &str, recursive: bool) -> Self {
        Self {
            start: dir.len(),
            recursive,
            seen: HashSet::new(),
            entries: Vec::new(),
        }
    }

    /// Record the segments of one key. The key must start with the
    /// directory prefix.
    pub fn add(&mut self, key: &[u8]) {
        for segment in segments(key, self.start, self.recursive) {
            // Separators only ever split at ASCII bytes, so segments of a
            // UTF-8 key stay UTF-8.
            let segment = String::from_utf8_lossy(segment);
            if !self.seen.contains(&*segment) {
                self.seen.insert(segment.to_string());
                self.entries.push(segment.into_owned());
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn into_entries(self) -> Vec<String> {
        self.entries
    }
}

/// List the directory `prefix` over an in-memory key set.
///
/// Keys outside `prefix + "/"` are ignored. Returns an empty vector when no
/// key is under the directory.
pub fn list_children<'a, I>(keys: I, prefix: &str, recursive: bool) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let dir = dir_prefix(prefix);
    let mut listing = Listing::new(&dir, recursive);
    for key in keys.into_iter().filter(|k| k.starts_with(&dir)) {
        listing.add(key.as_bytes());
    }
    listing.into_entries()
}
