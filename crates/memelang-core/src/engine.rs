//! Process-lifetime handle (spec component C8 design note: "a `SymbolCache`
//! owned by the `Engine` handle"). A caller builds one `Engine` per process
//! and runs every job through it, so the key<->id cache it owns warms up
//! once and stays warm for every job afterward instead of being rebuilt from
//! scratch on each call to [`crate::dispatch::query`].

use crate::dispatch;
use crate::error::Result;
use crate::resolver::{Database, SymbolCache};

pub struct Engine<'a> {
    db: &'a dyn Database,
    cache: SymbolCache,
}

impl<'a> Engine<'a> {
    pub fn new(db: &'a dyn Database) -> Self {
        Engine { db, cache: SymbolCache::new() }
    }

    /// Run one job end to end and return its Memelang-text result, reusing
    /// this `Engine`'s cache across every call.
    pub fn query(&mut self, source: &str) -> Result<String> {
        dispatch::query(source, self.db, &mut self.cache)
    }
}
