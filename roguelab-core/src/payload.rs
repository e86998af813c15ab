//! Typed views over event payloads.
//!
//! Every field is optional: a missing key, an explicit `null` or a value of
//! the wrong JSON type all read as `None`, and the documented default is
//! applied when the payload is turned into a model value. Reading a payload
//! never fails. The client's camelCase spellings are accepted through
//! [`Payload::ALIASES`].
use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::event::EventKind;
use crate::model::{Combat, DamageEvent, EnemySnapshot, Floor, ItemSnapshot, Run};

pub const DEFAULT_VERSION: &str = "unknown";
pub const DEFAULT_DIFFICULTY: &str = "NORMAL";
pub const DEFAULT_PLAYER_NAME: &str = "Unknown";
pub const DEFAULT_PLAYER_CLASS: &str = "UNKNOWN";
pub const DEFAULT_STARTING_HEALTH: i64 = 100;
pub const DEFAULT_FLOOR_NUMBER: u32 = 1;
pub const DEFAULT_DAMAGE_TYPE: &str = "PHYSICAL";
pub const DEFAULT_RARITY: &str = "COMMON";
pub const UNKNOWN_OUTCOME: &str = "UNKNOWN";

/// A typed payload view.
///
/// `ALIASES` lists `(client spelling, field key)` pairs. When a payload
/// carries both spellings the field key wins.
pub trait Payload: DeserializeOwned + Default {
    const ALIASES: &'static [(&'static str, &'static str)] = &[];
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Like [`lenient`] for arrays, but an element of the wrong shape only drops
/// that element.
fn lenient_items<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(Some(
            items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
        )),
        _ => Ok(None),
    }
}

/// Move client spellings onto their field keys. An alias never replaces a
/// key that is already present.
pub(crate) fn canonical_keys(
    mut fields: Map<String, Value>,
    aliases: &[(&str, &str)],
) -> Map<String, Value> {
    for &(alias, key) in aliases {
        if let Some(value) = fields.remove(alias) {
            fields.entry(key).or_insert(value);
        }
    }
    fields
}

fn decode<T: Payload>(fields: &Map<String, Value>) -> serde_json::Result<T> {
    serde_json::from_value(Value::Object(canonical_keys(fields.clone(), T::ALIASES)))
}

/// Read a payload map into its typed view.
pub(crate) fn read_payload<T: Payload>(
    kind: &EventKind,
    tick: i64,
    payload: &Map<String, Value>,
) -> T {
    match decode(payload) {
        Ok(typed) => typed,
        Err(err) => {
            log::warn!("tick {tick}: unreadable {kind} payload ({err}); using defaults");
            T::default()
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunStartedPayload {
    #[serde(default, deserialize_with = "lenient")]
    pub seed: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub difficulty: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub player_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub player_class: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub starting_health: Option<i64>,
}

impl Payload for RunStartedPayload {
    const ALIASES: &'static [(&'static str, &'static str)] = &[
        ("gameVersion", "version"),
        ("playerName", "player_name"),
        ("playerClass", "player_class"),
        ("startingHealth", "starting_health"),
    ];
}

impl RunStartedPayload {
    /// Build the identity half of a run; outcome and totals start at their
    /// "nothing happened yet" values.
    #[must_use]
    pub fn into_run(self, run_id: String) -> Run {
        Run {
            run_id,
            seed: self.seed.unwrap_or(0),
            version: self.version.unwrap_or_else(|| DEFAULT_VERSION.to_string()),
            difficulty: self
                .difficulty
                .unwrap_or_else(|| DEFAULT_DIFFICULTY.to_string()),
            player_name: self
                .player_name
                .unwrap_or_else(|| DEFAULT_PLAYER_NAME.to_string()),
            player_class: self
                .player_class
                .unwrap_or_else(|| DEFAULT_PLAYER_CLASS.to_string()),
            starting_health: self.starting_health.unwrap_or(DEFAULT_STARTING_HEALTH),
            end_reason: None,
            final_floor: 0,
            player_alive: true,
            total_enemies_killed: 0,
            total_bosses_killed: 0,
            total_damage_dealt: 0,
            total_damage_taken: 0,
            total_gold_earned: 0,
            total_gold_spent: 0,
            total_items_collected: 0,
            rooms_visited: 0,
            rooms_cleared: 0,
            floors: Vec::new(),
            all_combats: Vec::new(),
            all_damage_events: Vec::new(),
            all_items: Vec::new(),
            events: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FloorEnteredPayload {
    #[serde(default, deserialize_with = "lenient")]
    pub floor_number: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub room_count: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub is_boss_floor: Option<bool>,
    #[serde(default, deserialize_with = "lenient_items")]
    pub room_types: Option<Vec<String>>,
}

impl Payload for FloorEnteredPayload {
    const ALIASES: &'static [(&'static str, &'static str)] = &[
        ("floorNumber", "floor_number"),
        ("roomCount", "room_count"),
        ("isBossFloor", "is_boss_floor"),
        ("roomTypes", "room_types"),
    ];
}

impl FloorEnteredPayload {
    #[must_use]
    pub fn into_floor(self) -> Floor {
        Floor {
            floor_number: self.floor_number.unwrap_or(DEFAULT_FLOOR_NUMBER),
            room_count: self.room_count.unwrap_or(0),
            is_boss_floor: self.is_boss_floor.unwrap_or(false),
            room_types: self.room_types.unwrap_or_default(),
            combats: Vec::new(),
            items_found: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CombatStartedPayload {
    #[serde(default, deserialize_with = "lenient")]
    pub room_id: Option<String>,
    /// Raw enemy objects; each is read on its own so one bad field cannot
    /// lose the rest of the roster.
    #[serde(default, deserialize_with = "lenient_items")]
    pub enemies: Option<Vec<Map<String, Value>>>,
}

impl Payload for CombatStartedPayload {
    const ALIASES: &'static [(&'static str, &'static str)] = &[("roomId", "room_id")];
}

impl CombatStartedPayload {
    /// Open a combat on `floor_number`; outcome and totals are filled in by
    /// the matching COMBAT_ENDED.
    #[must_use]
    pub fn into_combat(self, floor_number: u32) -> Combat {
        Combat {
            room_id: self.room_id.unwrap_or_default(),
            floor_number,
            enemies: self
                .enemies
                .unwrap_or_default()
                .iter()
                .map(|fields| decode::<EnemyFields>(fields).unwrap_or_default().into_snapshot())
                .collect(),
            outcome: String::new(),
            turns_elapsed: 0,
            total_damage_dealt: 0,
            total_damage_taken: 0,
            enemies_killed: 0,
            gold_earned: 0,
            experience_gained: 0,
            damage_events: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct EnemyFields {
    #[serde(default, deserialize_with = "lenient")]
    id: Option<String>,
    #[serde(default, deserialize_with = "lenient", rename = "type")]
    enemy_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    health: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    max_health: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    attack: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    defense: Option<i64>,
}

impl Payload for EnemyFields {
    const ALIASES: &'static [(&'static str, &'static str)] = &[
        ("enemyId", "id"),
        ("enemyType", "type"),
        ("maxHealth", "max_health"),
    ];
}

impl EnemyFields {
    fn into_snapshot(self) -> EnemySnapshot {
        EnemySnapshot {
            id: self.id.unwrap_or_default(),
            enemy_type: self.enemy_type.unwrap_or_default(),
            health: self.health.unwrap_or(0),
            max_health: self.max_health.unwrap_or(0),
            attack: self.attack.unwrap_or(0),
            defense: self.defense.unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CombatEndedPayload {
    #[serde(default, deserialize_with = "lenient")]
    pub outcome: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub turns_elapsed: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub total_damage_dealt: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub total_damage_taken: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub enemies_killed: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub gold_earned: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub experience_gained: Option<i64>,
}

impl Payload for CombatEndedPayload {
    const ALIASES: &'static [(&'static str, &'static str)] = &[
        ("turnsElapsed", "turns_elapsed"),
        ("damageDealt", "total_damage_dealt"),
        ("damageTaken", "total_damage_taken"),
        ("enemiesKilled", "enemies_killed"),
        ("goldDropped", "gold_earned"),
        ("experienceGained", "experience_gained"),
    ];
}

impl CombatEndedPayload {
    pub fn apply_to(self, combat: &mut Combat) {
        combat.outcome = self.outcome.unwrap_or_else(|| UNKNOWN_OUTCOME.to_string());
        combat.turns_elapsed = self.turns_elapsed.unwrap_or(0);
        combat.total_damage_dealt = self.total_damage_dealt.unwrap_or(0);
        combat.total_damage_taken = self.total_damage_taken.unwrap_or(0);
        combat.enemies_killed = self.enemies_killed.unwrap_or(0);
        combat.gold_earned = self.gold_earned.unwrap_or(0);
        combat.experience_gained = self.experience_gained.unwrap_or(0);
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DamageDealtPayload {
    #[serde(default, deserialize_with = "lenient")]
    pub source_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub source_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub target_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub target_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub base_damage: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub final_damage: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub damage_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub critical: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub health_before: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub health_after: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub killed: Option<bool>,
}

impl Payload for DamageDealtPayload {
    const ALIASES: &'static [(&'static str, &'static str)] = &[
        ("sourceId", "source_id"),
        ("sourceType", "source_type"),
        ("targetId", "target_id"),
        ("targetType", "target_type"),
        ("baseDamage", "base_damage"),
        ("finalDamage", "final_damage"),
        ("damageType", "damage_type"),
        ("isCritical", "critical"),
        ("targetHealthBefore", "health_before"),
        ("targetHealthAfter", "health_after"),
        ("targetKilled", "killed"),
    ];
}

impl DamageDealtPayload {
    #[must_use]
    pub fn into_damage(self, tick: i64) -> DamageEvent {
        DamageEvent {
            tick,
            source_id: self.source_id.unwrap_or_default(),
            source_type: self.source_type.unwrap_or_default(),
            target_id: self.target_id.unwrap_or_default(),
            target_type: self.target_type.unwrap_or_default(),
            base_damage: self.base_damage.unwrap_or(0),
            final_damage: self.final_damage.unwrap_or(0),
            damage_type: self
                .damage_type
                .unwrap_or_else(|| DEFAULT_DAMAGE_TYPE.to_string()),
            critical: self.critical.unwrap_or(false),
            health_before: self.health_before.unwrap_or(0),
            health_after: self.health_after.unwrap_or(0),
            killed: self.killed.unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemPickedPayload {
    #[serde(default, deserialize_with = "lenient")]
    pub item_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub item_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub item_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub rarity: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub value: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub stats: Option<BTreeMap<String, Value>>,
}

impl Payload for ItemPickedPayload {
    const ALIASES: &'static [(&'static str, &'static str)] = &[
        ("itemId", "item_id"),
        ("itemName", "item_name"),
        ("itemType", "item_type"),
    ];
}

impl ItemPickedPayload {
    #[must_use]
    pub fn into_item(self) -> ItemSnapshot {
        ItemSnapshot {
            id: self.item_id.unwrap_or_default(),
            name: self.item_name.unwrap_or_default(),
            item_type: self.item_type.unwrap_or_default(),
            rarity: self.rarity.unwrap_or_else(|| DEFAULT_RARITY.to_string()),
            value: self.value.unwrap_or(0),
            stats: self.stats.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunEndedPayload {
    #[serde(default, deserialize_with = "lenient")]
    pub end_reason: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub final_floor: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub enemies_killed: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub bosses_killed: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub damage_dealt: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub damage_taken: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub gold_earned: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub gold_spent: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub items_collected: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub rooms_visited: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub rooms_cleared: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub player_alive: Option<bool>,
}

impl Payload for RunEndedPayload {
    const ALIASES: &'static [(&'static str, &'static str)] = &[
        ("outcome", "end_reason"),
        ("finalFloor", "final_floor"),
        ("enemiesDefeated", "enemies_killed"),
        ("bossesKilled", "bosses_killed"),
        ("damageDealt", "damage_dealt"),
        ("damageTaken", "damage_taken"),
        ("goldEarned", "gold_earned"),
        ("goldSpent", "gold_spent"),
        ("itemsCollected", "items_collected"),
        ("roomsVisited", "rooms_visited"),
        ("roomsCleared", "rooms_cleared"),
        ("playerAlive", "player_alive"),
    ];
}

impl RunEndedPayload {
    pub fn apply_to(self, run: &mut Run) {
        run.end_reason = Some(
            self.end_reason
                .unwrap_or_else(|| UNKNOWN_OUTCOME.to_string()),
        );
        run.final_floor = self.final_floor.unwrap_or(0);
        run.total_enemies_killed = self.enemies_killed.unwrap_or(0);
        run.total_bosses_killed = self.bosses_killed.unwrap_or(0);
        run.total_damage_dealt = self.damage_dealt.unwrap_or(0);
        run.total_damage_taken = self.damage_taken.unwrap_or(0);
        run.total_gold_earned = self.gold_earned.unwrap_or(0);
        run.total_gold_spent = self.gold_spent.unwrap_or(0);
        run.total_items_collected = self.items_collected.unwrap_or(0);
        run.rooms_visited = self.rooms_visited.unwrap_or(0);
        run.rooms_cleared = self.rooms_cleared.unwrap_or(0);
        run.player_alive = self.player_alive.unwrap_or(true);
    }
}
