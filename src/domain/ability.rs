/// Character skills: cooldown-gated, time-limited stat modifiers.
///
/// ```text
///   Idle ──activate (cooldown 0)──▶ Active(duration)
///    ▲                                  │
///    └──────── duration expires ────────┘  cooldown starts
/// ```
///
/// The delta added on activation is recorded and subtracted exactly on
/// expiry, so any number of cycles leaves the stats where they started.
/// Bomb capacity is the one stat that cannot always drop at once: if the
/// player has more bombs on the field than the unboosted capacity allows,
/// that part of the revert waits until enough of them have detonated.

use serde::{Deserialize, Serialize};

use super::entity::Stats;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Character {
    /// Speed multiplier.
    Runner,
    /// Extra blast range.
    Demolisher,
    /// Extra bomb capacity.
    Bomber,
}

impl Character {
    pub const ALL: [Character; 3] = [Character::Runner, Character::Demolisher, Character::Bomber];

    pub fn name(self) -> &'static str {
        match self {
            Character::Runner => "Runner",
            Character::Demolisher => "Demolisher",
            Character::Bomber => "Bomber",
        }
    }

    /// Concrete delta this character's skill adds given the current stats.
    pub fn delta(self, spec: &SkillSpec, stats: &Stats) -> StatDelta {
        match self {
            Character::Runner => StatDelta {
                move_speed: stats.move_speed * spec.magnitude.saturating_sub(1),
                ..StatDelta::ZERO
            },
            Character::Demolisher => StatDelta { bomb_range: spec.magnitude, ..StatDelta::ZERO },
            Character::Bomber => StatDelta { max_bombs: spec.magnitude, ..StatDelta::ZERO },
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SkillSpec {
    /// Multiplier for Runner, flat bonus for the others.
    pub magnitude: u32,
    pub duration_ticks: u32,
    pub cooldown_ticks: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
pub struct StatDelta {
    pub move_speed: u32,
    pub bomb_range: u32,
    pub max_bombs: u32,
}

impl StatDelta {
    pub const ZERO: StatDelta = StatDelta { move_speed: 0, bomb_range: 0, max_bombs: 0 };

    pub fn is_zero(&self) -> bool {
        *self == StatDelta::ZERO
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum AbilityPhase {
    Idle,
    Active,
}

#[derive(Clone, Debug)]
pub struct AbilityState {
    pub character: Character,
    pub spec: SkillSpec,
    pub phase: AbilityPhase,
    pub cooldown_remaining: u32,
    pub duration_remaining: u32,
    /// Delta currently added to the owner's stats.
    applied: StatDelta,
}

impl AbilityState {
    pub fn new(character: Character, spec: SkillSpec) -> Self {
        AbilityState {
            character,
            spec,
            phase: AbilityPhase::Idle,
            cooldown_remaining: 0,
            duration_remaining: 0,
            applied: StatDelta::ZERO,
        }
    }

    pub fn is_active(&self) -> bool {
        self.phase == AbilityPhase::Active
    }

    pub fn applied(&self) -> StatDelta {
        self.applied
    }

    pub fn can_activate(&self) -> bool {
        self.phase == AbilityPhase::Idle && self.cooldown_remaining == 0 && self.applied.is_zero()
    }

    /// Start the skill. Returns false (and changes nothing) if it is active,
    /// cooling down, or still settling a previous activation.
    pub fn activate(&mut self, stats: &mut Stats) -> bool {
        if !self.can_activate() {
            return false;
        }
        let delta = self.character.delta(&self.spec, stats);
        stats.apply(delta);
        self.applied = delta;
        self.phase = AbilityPhase::Active;
        self.duration_remaining = self.spec.duration_ticks.max(1);
        true
    }

    /// Advance timers. Returns true on the tick the skill expires.
    pub fn tick(&mut self, stats: &mut Stats) -> bool {
        match self.phase {
            AbilityPhase::Active => {
                self.duration_remaining = self.duration_remaining.saturating_sub(1);
                if self.duration_remaining > 0 {
                    return false;
                }
                self.phase = AbilityPhase::Idle;
                self.cooldown_remaining = self.spec.cooldown_ticks;
                self.settle(stats);
                true
            }
            AbilityPhase::Idle => {
                if self.cooldown_remaining > 0 {
                    self.cooldown_remaining -= 1;
                }
                self.settle(stats);
                false
            }
        }
    }

    /// Undo as much of the applied delta as the stats allow.
    fn settle(&mut self, stats: &mut Stats) {
        if self.applied.is_zero() {
            return;
        }
        let spare_capacity = stats.max_bombs.saturating_sub(stats.active_bombs);
        let part = StatDelta {
            move_speed: self.applied.move_speed,
            bomb_range: self.applied.bomb_range,
            max_bombs: self.applied.max_bombs.min(spare_capacity),
        };
        stats.revert(part);
        self.applied.move_speed -= part.move_speed;
        self.applied.bomb_range -= part.bomb_range;
        self.applied.max_bombs -= part.max_bombs;
        if !self.applied.is_zero() {
            log::debug!("skill revert deferred: {:?} outstanding", self.applied);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> Stats {
        Stats { move_speed: 2, bomb_range: 2, max_bombs: 1, active_bombs: 0 }
    }

    fn spec() -> SkillSpec {
        SkillSpec { magnitude: 2, duration_ticks: 3, cooldown_ticks: 5 }
    }

    #[test]
    fn idle_active_idle_lifecycle() {
        let mut s = stats();
        let mut a = AbilityState::new(Character::Demolisher, spec());
        assert!(a.activate(&mut s));
        assert!(a.is_active());
        assert_eq!(s.bomb_range, 4);

        assert!(!a.tick(&mut s));
        assert!(!a.tick(&mut s));
        assert!(a.tick(&mut s));
        assert!(!a.is_active());
        assert_eq!(a.cooldown_remaining, 5);
        assert_eq!(s, stats());
    }

    #[test]
    fn cannot_reactivate_while_active_or_cooling_down() {
        let mut s = stats();
        let mut a = AbilityState::new(Character::Runner, spec());
        assert!(a.activate(&mut s));
        assert!(!a.activate(&mut s));
        for _ in 0..3 {
            a.tick(&mut s);
        }
        assert!(!a.activate(&mut s), "cooldown must block activation");
        for _ in 0..5 {
            a.tick(&mut s);
        }
        assert_eq!(a.cooldown_remaining, 0);
        assert!(a.activate(&mut s));
    }

    #[test]
    fn runner_multiplies_speed() {
        let mut s = stats();
        let mut a = AbilityState::new(Character::Runner, SkillSpec { magnitude: 3, ..spec() });
        a.activate(&mut s);
        assert_eq!(s.move_speed, 6);
        assert_eq!(a.applied().move_speed, 4);
    }

    #[test]
    fn repeated_cycles_do_not_drift() {
        for character in Character::ALL {
            let mut s = stats();
            let before = s;
            let mut a = AbilityState::new(character, spec());
            for _ in 0..50 {
                assert!(a.activate(&mut s), "{character:?} failed to activate");
                while a.is_active() || a.cooldown_remaining > 0 {
                    a.tick(&mut s);
                }
            }
            assert_eq!(s, before, "{character:?} drifted");
        }
    }

    #[test]
    fn bomber_revert_waits_for_bombs_on_field() {
        let mut s = stats();
        let mut a = AbilityState::new(Character::Bomber, spec());
        a.activate(&mut s);
        assert_eq!(s.max_bombs, 3);
        s.active_bombs = 3;
        for _ in 0..3 {
            a.tick(&mut s);
        }
        // Expired but all three bombs still live: capacity cannot shrink yet
        assert!(!a.is_active());
        assert_eq!(s.max_bombs, 3);
        assert!(!a.can_activate());

        s.active_bombs = 2;
        a.tick(&mut s);
        assert_eq!(s.max_bombs, 2);
        s.active_bombs = 0;
        a.tick(&mut s);
        assert_eq!(s.max_bombs, 1);
        assert!(a.applied().is_zero());
        assert!(s.active_bombs <= s.max_bombs);
    }
}
