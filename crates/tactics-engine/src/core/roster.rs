use crate::api::types::BoardPos;
use crate::components::unit::{Strike, Unit};
use crate::core::board::BoardLayout;

/// The units on the board plus their per-turn bookkeeping.
///
/// Units are addressed by index. `has_moved` and `has_attacked` are kept the
/// same length as `units` and compacted with them in
/// [`remove_dead`](Roster::remove_dead).
pub struct Roster {
    units: Vec<Unit>,
    has_moved: Vec<bool>,
    has_attacked: Vec<bool>,
    selected: Option<usize>,
}

impl Roster {
    pub fn new() -> Self {
        Self::with_capacity(16)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            units: Vec::with_capacity(capacity),
            has_moved: Vec::with_capacity(capacity),
            has_attacked: Vec::with_capacity(capacity),
            selected: None,
        }
    }

    /// Add a unit. Returns its index.
    pub fn spawn(&mut self, unit: Unit) -> usize {
        self.units.push(unit);
        self.has_moved.push(false);
        self.has_attacked.push(false);
        self.units.len() - 1
    }

    pub fn get(&self, idx: usize) -> Option<&Unit> {
        self.units.get(idx)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut Unit> {
        self.units.get_mut(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Unit> {
        self.units.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Index of the living unit standing on `pos`.
    pub fn unit_at(&self, pos: BoardPos) -> Option<usize> {
        self.units
            .iter()
            .position(|u| u.is_alive() && u.board_pos() == pos)
    }

    /// Whether a living unit stands on `pos` or is walking to it.
    pub fn is_occupied(&self, pos: BoardPos) -> bool {
        self.unit_at(pos).is_some()
            || self
                .units
                .iter()
                .any(|u| u.is_alive() && u.move_target() == Some(pos))
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Select a living unit. Returns `false` for dead or unknown indices.
    pub fn select(&mut self, idx: usize) -> bool {
        match self.units.get(idx) {
            Some(unit) if unit.is_alive() => {
                self.selected = Some(idx);
                true
            }
            _ => false,
        }
    }

    pub fn deselect(&mut self) {
        self.selected = None;
    }

    pub fn has_moved(&self, idx: usize) -> bool {
        self.has_moved.get(idx).copied().unwrap_or(false)
    }

    pub fn has_attacked(&self, idx: usize) -> bool {
        self.has_attacked.get(idx).copied().unwrap_or(false)
    }

    /// Clear per-turn flags at the start of a turn.
    pub fn reset_turn(&mut self) {
        self.has_moved.fill(false);
        self.has_attacked.fill(false);
    }

    /// Order a unit to walk to an empty cell that no other unit is walking
    /// to. Marks it as having moved.
    pub fn start_move(&mut self, idx: usize, target: BoardPos, layout: &BoardLayout) -> bool {
        if self.is_occupied(target) {
            return false;
        }
        let Some(unit) = self.units.get_mut(idx) else {
            return false;
        };
        if !unit.start_move(target, layout) {
            return false;
        }
        self.has_moved[idx] = true;
        true
    }

    /// Order `attacker` to attack `target`. Marks the attacker as having
    /// attacked. The attacker turns toward the target for the attack.
    pub fn start_attack(&mut self, attacker: usize, target: usize) -> bool {
        if attacker == target {
            return false;
        }
        let Some(target_pos) = self
            .units
            .get(target)
            .filter(|u| u.is_alive())
            .map(|u| u.board_pos())
        else {
            return false;
        };
        let Some(unit) = self.units.get_mut(attacker) else {
            return false;
        };
        if !unit.can_act() {
            return false;
        }
        unit.store_facing();
        unit.face_position(target_pos);
        if !unit.start_attack(target) {
            unit.restore_facing();
            return false;
        }
        self.has_attacked[attacker] = true;
        true
    }

    /// Advance every unit. Nothing is removed here.
    pub fn update(&mut self, dt: f32, layout: &BoardLayout) {
        for unit in &mut self.units {
            unit.update(dt, layout);
        }
    }

    /// Drain strikes that became due this step, as `(attacker, strike)`.
    pub fn collect_strikes(&mut self) -> Vec<(usize, Strike)> {
        self.units
            .iter_mut()
            .enumerate()
            .filter_map(|(idx, unit)| unit.take_strike().map(|strike| (idx, strike)))
            .collect()
    }

    /// Remove every unit whose death sequence has completed.
    ///
    /// Survivors keep their relative order and their per-turn flags. The
    /// selection is cleared if the selected unit died and otherwise shifted
    /// down by the number of removed units before it. Attacks in flight are
    /// re-pointed at their target's new index, or cancelled if it was removed.
    /// Returns how many units were removed.
    pub fn remove_dead(&mut self) -> usize {
        if !self.units.iter().any(Unit::is_dead) {
            return 0;
        }

        let mut remap = Vec::with_capacity(self.units.len());
        let mut survivors = 0;
        for unit in &self.units {
            if unit.is_dead() {
                remap.push(None);
            } else {
                remap.push(Some(survivors));
                survivors += 1;
            }
        }

        let mut idx = 0;
        self.has_moved.retain(|_| {
            let keep = remap[idx].is_some();
            idx += 1;
            keep
        });
        idx = 0;
        self.has_attacked.retain(|_| {
            let keep = remap[idx].is_some();
            idx += 1;
            keep
        });
        let removed = self.units.len() - survivors;
        self.units.retain(|u| !u.is_dead());

        self.selected = self.selected.and_then(|s| remap.get(s).copied().flatten());
        for unit in &mut self.units {
            if let Some(target) = unit.attack_target() {
                unit.retarget_attack(remap.get(target).copied().flatten());
            }
        }
        removed
    }

    /// Drop every unit, e.g. on game reset.
    pub fn clear(&mut self) {
        self.units.clear();
        self.has_moved.clear();
        self.has_attacked.clear();
        self.selected = None;
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use crate::api::config::EngineConfig;
    use crate::components::animation::AnimationSet;
    use crate::components::unit::tests::{descriptor, full_set, strip};
    use crate::components::unit::UnitState;

    fn roster_of(n: i32, layout: &BoardLayout) -> Roster {
        let mut roster = Roster::new();
        for i in 0..n {
            let mut unit = Unit::load(&descriptor(full_set()), &EngineConfig::default(), i as f32).unwrap();
            unit.set_board_position(BoardPos::new(i, 0), layout);
            roster.spawn(unit);
        }
        roster.update(0.5, layout);
        roster
    }

    /// Kill and fully dissolve the given units.
    fn finish_off(roster: &mut Roster, victims: &[usize], layout: &BoardLayout) {
        for &idx in victims {
            roster.get_mut(idx).unwrap().take_damage(1000);
        }
        for _ in 0..200 {
            roster.update(0.01, layout);
        }
        for &idx in victims {
            assert!(roster.get(idx).unwrap().is_dead());
        }
    }

    #[test]
    fn compaction_keeps_flags_aligned() {
        let layout = BoardLayout::default();
        let mut roster = roster_of(6, &layout);
        // Flags encode each unit's column so alignment is checkable.
        for idx in 0..6 {
            roster.has_moved[idx] = idx % 2 == 0;
            roster.has_attacked[idx] = idx % 3 == 0;
        }
        roster.select(4);

        finish_off(&mut roster, &[1, 3], &layout);
        assert_eq!(roster.remove_dead(), 2);

        let columns: Vec<i32> = roster.iter().map(|u| u.board_pos().x).collect();
        assert_eq!(columns, [0, 2, 4, 5]);
        for (idx, &col) in columns.iter().enumerate() {
            assert_eq!(roster.has_moved(idx), col % 2 == 0);
            assert_eq!(roster.has_attacked(idx), col % 3 == 0);
        }
        assert_eq!(roster.selected(), Some(2));
    }

    #[test]
    fn selected_unit_dying_clears_selection() {
        let layout = BoardLayout::default();
        let mut roster = roster_of(3, &layout);
        roster.select(1);
        finish_off(&mut roster, &[1], &layout);
        roster.remove_dead();
        assert_eq!(roster.selected(), None);
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn dying_units_are_not_removed_early() {
        let layout = BoardLayout::default();
        let mut roster = roster_of(2, &layout);
        roster.get_mut(0).unwrap().take_damage(1000);
        roster.update(0.1, &layout);
        assert_eq!(roster.get(0).unwrap().state(), UnitState::Dying);
        assert_eq!(roster.remove_dead(), 0);
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn attack_marks_flag_and_faces_target() {
        let layout = BoardLayout::default();
        let mut roster = roster_of(3, &layout);
        assert!(roster.start_attack(2, 0));
        assert!(roster.has_attacked(2));
        assert!(roster.get(2).unwrap().flip_x());
        assert!(!roster.start_attack(2, 1));
        assert!(!roster.start_attack(0, 0));
    }

    #[test]
    fn attack_on_dead_target_is_rejected() {
        let layout = BoardLayout::default();
        let mut roster = roster_of(2, &layout);
        roster.get_mut(1).unwrap().take_damage(1000);
        assert!(!roster.start_attack(0, 1));
        assert!(!roster.has_attacked(0));
    }

    #[test]
    fn move_into_occupied_cell_is_rejected() {
        let layout = BoardLayout::default();
        let mut roster = roster_of(2, &layout);
        assert!(!roster.start_move(0, BoardPos::new(1, 0), &layout));
        assert!(roster.start_move(0, BoardPos::new(0, 3), &layout));
        assert!(roster.has_moved(0));
        assert!(!roster.has_moved(1));
    }

    #[test]
    fn move_targets_are_reserved() {
        let layout = BoardLayout::default();
        let mut roster = Roster::new();
        for x in [0, 2] {
            let mut unit = Unit::load(&descriptor(full_set()), &EngineConfig::default(), 0.0).unwrap();
            unit.set_board_position(BoardPos::new(x, 0), &layout);
            roster.spawn(unit);
        }
        roster.update(0.5, &layout);

        let meeting = BoardPos::new(1, 0);
        assert!(!roster.is_occupied(meeting));
        assert!(roster.start_move(0, meeting, &layout));
        assert_eq!(roster.get(0).unwrap().move_target(), Some(meeting));
        assert!(roster.is_occupied(meeting));
        assert!(!roster.start_move(1, meeting, &layout));
        assert!(!roster.has_moved(1));

        for _ in 0..100 {
            roster.update(0.01, &layout);
        }
        assert_eq!(roster.get(0).unwrap().board_pos(), meeting);
        assert_eq!(roster.get(1).unwrap().board_pos(), BoardPos::new(2, 0));
        assert_eq!(roster.get(0).unwrap().move_target(), None);
        assert!(roster.is_occupied(meeting));
    }

    #[test]
    fn strikes_are_collected_once() {
        let layout = BoardLayout::default();
        let mut roster = roster_of(2, &layout);
        roster.start_attack(0, 1);
        let mut strikes = Vec::new();
        for _ in 0..120 {
            roster.update(0.01, &layout);
            strikes.extend(roster.collect_strikes());
        }
        assert_eq!(strikes, vec![(0, Strike { target: 1, amount: 2 })]);
    }

    #[test]
    fn in_flight_attack_follows_target_across_compaction() {
        let layout = BoardLayout::default();
        let mut roster = roster_of(4, &layout);
        roster.get_mut(0).unwrap().take_damage(1000);
        for _ in 0..150 {
            roster.update(0.01, &layout);
        }
        assert!(roster.start_attack(3, 2));
        for _ in 0..35 {
            roster.update(0.01, &layout);
        }
        assert!(roster.collect_strikes().is_empty());
        assert_eq!(roster.remove_dead(), 1);
        assert_eq!(roster.get(2).unwrap().attack_target(), Some(1));

        let mut strikes = Vec::new();
        for _ in 0..30 {
            roster.update(0.01, &layout);
            strikes.extend(roster.collect_strikes());
        }
        assert_eq!(strikes, vec![(2, Strike { target: 1, amount: 2 })]);
    }

    #[test]
    fn removed_target_cancels_damage() {
        let layout = BoardLayout::default();
        let mut roster = roster_of(2, &layout);
        roster.start_attack(1, 0);
        roster.get_mut(1).unwrap().retarget_attack(None);
        for _ in 0..120 {
            roster.update(0.01, &layout);
        }
        assert!(roster.collect_strikes().is_empty());
        assert_eq!(roster.get(1).unwrap().state(), UnitState::Idle);
    }

    #[test]
    fn reset_turn_clears_flags() {
        let layout = BoardLayout::default();
        let set = Rc::new(AnimationSet::new().with(strip("idle", 2, 2.0)).with(strip("run", 2, 4.0)));
        let mut roster = Roster::new();
        let mut unit = Unit::load(&descriptor(set), &EngineConfig::default(), 0.0).unwrap();
        unit.set_board_position(BoardPos::new(0, 0), &layout);
        roster.spawn(unit);
        roster.update(0.5, &layout);
        roster.start_move(0, BoardPos::new(1, 0), &layout);
        roster.reset_turn();
        assert!(!roster.has_moved(0));
        roster.clear();
        assert!(roster.is_empty());
    }
}
