use std::collections::HashMap;

use super::model::PlayerStatsTable;

// ---------------------------------------------------------------------------
// Season cache: year → loaded table
// ---------------------------------------------------------------------------

/// Loaded seasons, kept for the life of the process unless invalidated.
/// No eviction.
#[derive(Debug, Default)]
pub struct StatsCache {
    seasons: HashMap<u16, PlayerStatsTable>,
}

impl StatsCache {
    /// Return the cached table for `year`, or run `load` and cache its
    /// result. Failures are returned as-is and not cached.
    pub fn get_or_try_load<E>(
        &mut self,
        year: u16,
        load: impl FnOnce(u16) -> Result<PlayerStatsTable, E>,
    ) -> Result<&PlayerStatsTable, E> {
        if self.seasons.contains_key(&year) {
            log::debug!("Season {year}: cache hit");
        } else {
            let table = load(year)?;
            self.seasons.insert(year, table);
        }
        // Present: either hit, or inserted just above.
        Ok(&self.seasons[&year])
    }

    pub fn contains(&self, year: u16) -> bool {
        self.seasons.contains_key(&year)
    }

    /// Forget one season. Returns whether it was cached.
    pub fn invalidate(&mut self, year: u16) -> bool {
        self.seasons.remove(&year).is_some()
    }

    pub fn clear(&mut self) {
        self.seasons.clear();
    }

    pub fn len(&self) -> usize {
        self.seasons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seasons.is_empty()
    }
}
