//! Per-unit combat timing.

use std::collections::HashMap;

use log::{info, warn};

/// Damage delay used for units with no timing entry.
pub const DEFAULT_ATTACK_DAMAGE_DELAY: f32 = 0.5;

/// Timing data for one unit type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitTiming {
    /// Seconds from the start of an attack until damage lands.
    pub attack_damage_delay: f32,
}

impl Default for UnitTiming {
    fn default() -> Self {
        Self {
            attack_damage_delay: DEFAULT_ATTACK_DAMAGE_DELAY,
        }
    }
}

/// Timing entries keyed by unit folder name.
#[derive(Debug, Clone, Default)]
pub struct TimingTable {
    timings: HashMap<String, UnitTiming>,
}

impl TimingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse tab-separated rows of `folder, card_id, attack_damage_delay, ...`.
    ///
    /// The first non-empty line is a header. Rows with too few columns or an
    /// unparseable delay are skipped with a warning.
    pub fn parse(source: &str) -> Self {
        let mut table = Self::new();
        let rows = source
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .skip(1);

        for (line_no, line) in rows {
            let mut columns = line.split('\t');
            let (Some(folder), Some(_card_id), Some(delay)) =
                (columns.next(), columns.next(), columns.next())
            else {
                warn!("timing line {}: expected at least 3 columns", line_no + 1);
                continue;
            };
            match delay.trim().parse::<f32>() {
                Ok(delay) if delay >= 0.0 => {
                    table.insert(folder, UnitTiming { attack_damage_delay: delay });
                }
                _ => warn!("timing line {}: bad damage delay '{}' for {}", line_no + 1, delay, folder),
            }
        }
        info!("loaded timing data for {} units", table.len());
        table
    }

    pub fn insert(&mut self, folder: impl Into<String>, timing: UnitTiming) {
        self.timings.insert(folder.into(), timing);
    }

    /// Timing for a unit, or the defaults when it has no entry.
    pub fn get(&self, folder: &str) -> UnitTiming {
        self.timings.get(folder).copied().unwrap_or_default()
    }

    pub fn contains(&self, folder: &str) -> bool {
        self.timings.contains_key(folder)
    }

    pub fn len(&self) -> usize {
        self.timings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timings.is_empty()
    }
}
