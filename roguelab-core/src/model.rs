//! Reconstructed run aggregate: floors, combats, damage and items.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::Event;

/// Source/target type used by the client for the player character.
pub const PLAYER: &str = "PLAYER";
/// End reason recorded for a won run, and outcome recorded for a won combat.
pub const VICTORY: &str = "VICTORY";
/// Outcome recorded for a lost combat.
pub const DEFEAT: &str = "DEFEAT";

/// State of one enemy at combat start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemySnapshot {
    pub id: String,
    #[serde(rename = "type")]
    pub enemy_type: String,
    pub health: i64,
    pub max_health: i64,
    pub attack: i64,
    pub defense: i64,
}

/// Item as captured at pickup time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub id: String,
    pub name: String,
    pub item_type: String,
    pub rarity: String,
    pub value: i64,
    pub stats: BTreeMap<String, Value>,
}

/// A single damage instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageEvent {
    pub tick: i64,
    pub source_id: String,
    pub source_type: String,
    pub target_id: String,
    pub target_type: String,
    pub base_damage: i64,
    pub final_damage: i64,
    pub damage_type: String,
    pub critical: bool,
    pub health_before: i64,
    pub health_after: i64,
    pub killed: bool,
}

impl DamageEvent {
    #[must_use]
    pub fn is_from_player(&self) -> bool {
        self.source_type == PLAYER
    }

    #[must_use]
    pub fn is_against_player(&self) -> bool {
        self.target_type == PLAYER
    }
}

/// A finalized combat encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combat {
    pub room_id: String,
    pub floor_number: u32,
    pub enemies: Vec<EnemySnapshot>,
    pub outcome: String,
    pub turns_elapsed: u32,
    pub total_damage_dealt: i64,
    pub total_damage_taken: i64,
    pub enemies_killed: u32,
    pub gold_earned: i64,
    pub experience_gained: i64,
    pub damage_events: Vec<DamageEvent>,
}

impl Combat {
    #[must_use]
    pub fn is_victory(&self) -> bool {
        self.outcome == VICTORY
    }

    #[must_use]
    pub fn is_defeat(&self) -> bool {
        self.outcome == DEFEAT
    }
}

/// One dungeon level as entered during the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Floor {
    pub floor_number: u32,
    pub room_count: u32,
    pub is_boss_floor: bool,
    pub room_types: Vec<String>,
    pub combats: Vec<Combat>,
    pub items_found: Vec<ItemSnapshot>,
}

impl Floor {
    /// Enemies killed across this floor's combats, saturating at `u32::MAX`.
    #[must_use]
    pub fn enemies_killed(&self) -> u32 {
        self.combats
            .iter()
            .fold(0u32, |total, c| total.saturating_add(c.enemies_killed))
    }
}

/// Complete reconstruction of one playthrough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub seed: i64,
    pub version: String,
    pub difficulty: String,
    pub player_name: String,
    pub player_class: String,
    pub starting_health: i64,

    // Outcome
    pub end_reason: Option<String>,
    pub final_floor: u32,
    pub player_alive: bool,

    // Totals as declared by RUN_ENDED
    pub total_enemies_killed: u32,
    pub total_bosses_killed: u32,
    pub total_damage_dealt: i64,
    pub total_damage_taken: i64,
    pub total_gold_earned: i64,
    pub total_gold_spent: i64,
    pub total_items_collected: u32,
    pub rooms_visited: u32,
    pub rooms_cleared: u32,

    // Detail
    pub floors: Vec<Floor>,
    pub all_combats: Vec<Combat>,
    pub all_damage_events: Vec<DamageEvent>,
    pub all_items: Vec<ItemSnapshot>,
    #[serde(skip_deserializing)]
    pub events: Vec<Event>,
}

impl Run {
    #[must_use]
    pub fn is_victory(&self) -> bool {
        self.end_reason.as_deref() == Some(VICTORY)
    }

    /// Damage dealt per point of damage taken. Infinite when nothing was
    /// taken but something was dealt, zero when neither happened.
    #[must_use]
    pub fn damage_efficiency(&self) -> f64 {
        damage_efficiency(self.total_damage_dealt, self.total_damage_taken)
    }

    /// Enemies killed per room visited.
    #[must_use]
    pub fn kill_rate(&self) -> f64 {
        if self.rooms_visited == 0 {
            return 0.0;
        }
        f64::from(self.total_enemies_killed) / f64::from(self.rooms_visited)
    }

    /// The last damage event in the run that targeted the player, if any.
    #[must_use]
    pub fn last_hit_on_player(&self) -> Option<&DamageEvent> {
        self.all_damage_events
            .iter()
            .rev()
            .find(|d| d.is_against_player())
    }
}

#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn damage_efficiency(dealt: i64, taken: i64) -> f64 {
    if taken == 0 {
        return if dealt > 0 { f64::INFINITY } else { 0.0 };
    }
    dealt as f64 / taken as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn efficiency_edge_cases() {
        assert!(damage_efficiency(100, 0).is_infinite());
        assert!(damage_efficiency(100, 0) > 0.0);
        assert_eq!(damage_efficiency(0, 0), 0.0);
        assert!((damage_efficiency(50, 25) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn damage_direction_helpers() {
        let hit = DamageEvent {
            tick: 1,
            source_id: "e1".to_string(),
            source_type: "GOBLIN".to_string(),
            target_id: "p".to_string(),
            target_type: PLAYER.to_string(),
            base_damage: 4,
            final_damage: 3,
            damage_type: "PHYSICAL".to_string(),
            critical: false,
            health_before: 10,
            health_after: 7,
            killed: false,
        };
        assert!(hit.is_against_player());
        assert!(!hit.is_from_player());
    }
}
