//! Cross-run reducers used for balance review.
//!
//! Every ranking is a stable sort over first-encountered order, so equal
//! scores keep the order in which their keys first appeared in the input.
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::Run;

/// Death bucket for runs lost without any recorded hit on the player.
pub const UNKNOWN_DEATH_CAUSE: &str = "UNKNOWN";

/// Map keyed by string that remembers first-insertion order.
#[derive(Debug)]
struct Ordered<V> {
    index: HashMap<String, usize>,
    entries: Vec<(String, V)>,
}

impl<V: Default> Ordered<V> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn entry(&mut self, key: &str) -> &mut V {
        let idx = match self.index.get(key) {
            Some(&idx) => idx,
            None => {
                self.entries.push((key.to_string(), V::default()));
                self.index.insert(key.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx].1
    }

    fn into_entries(self) -> Vec<(String, V)> {
        self.entries
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Sum that pins at the `i64` bounds instead of overflowing.
fn saturating_total(values: impl Iterator<Item = i64>) -> i64 {
    values.fold(0, i64::saturating_add)
}

#[allow(clippy::cast_precision_loss)]
fn mean(total: i64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

/// Combat efficiency across a collection of runs. All zeros when the runs
/// contain no finalized combat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombatAnalysis {
    pub total_combats: usize,
    pub victories: usize,
    pub defeats: usize,
    pub win_rate: f64,
    pub avg_turns_per_combat: f64,
    pub avg_damage_dealt: f64,
    pub avg_damage_taken: f64,
    pub total_critical_hits: usize,
    pub critical_hit_rate: f64,
    /// Source type with the most damage dealt to the player overall.
    pub most_dangerous_enemy: Option<String>,
}

#[must_use]
pub fn analyze_combat_efficiency(runs: &[Run]) -> CombatAnalysis {
    let combats: Vec<_> = runs.iter().flat_map(|r| &r.all_combats).collect();
    if combats.is_empty() {
        return CombatAnalysis::default();
    }
    let damage: Vec<_> = runs.iter().flat_map(|r| &r.all_damage_events).collect();

    let victories = combats.iter().filter(|c| c.is_victory()).count();
    let defeats = combats.iter().filter(|c| c.is_defeat()).count();
    let turns = saturating_total(combats.iter().map(|c| i64::from(c.turns_elapsed)));
    let dealt = saturating_total(combats.iter().map(|c| c.total_damage_dealt));
    let taken = saturating_total(combats.iter().map(|c| c.total_damage_taken));

    let player_attacks = damage.iter().filter(|d| d.is_from_player()).count();
    let critical_hits = damage
        .iter()
        .filter(|d| d.is_from_player() && d.critical)
        .count();

    let mut damage_to_player: Ordered<i64> = Ordered::new();
    for hit in damage.iter().filter(|d| d.is_against_player()) {
        let total = damage_to_player.entry(&hit.source_type);
        *total = total.saturating_add(hit.final_damage);
    }
    let mut most_dangerous: Option<(String, i64)> = None;
    for (source, total) in damage_to_player.into_entries() {
        if most_dangerous.as_ref().is_none_or(|(_, best)| total > *best) {
            most_dangerous = Some((source, total));
        }
    }

    CombatAnalysis {
        total_combats: combats.len(),
        victories,
        defeats,
        win_rate: ratio(victories, combats.len()),
        avg_turns_per_combat: mean(turns, combats.len()),
        avg_damage_dealt: mean(dealt, combats.len()),
        avg_damage_taken: mean(taken, combats.len()),
        total_critical_hits: critical_hits,
        critical_hit_rate: ratio(critical_hits, player_attacks),
        most_dangerous_enemy: most_dangerous.map(|(source, _)| source),
    }
}

/// How dangerous one enemy type is across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyStats {
    pub enemy_type: String,
    /// Runs in which this type appeared in at least one combat.
    pub encounters: usize,
    /// Killing blows the player landed on this type.
    pub total_kills: usize,
    pub times_killed_player: usize,
    pub total_damage_dealt_to_player: i64,
    /// Final damage of the player's killing blows on this type.
    pub total_damage_taken: i64,
    pub avg_damage_per_encounter: f64,
    pub lethality_score: f64,
}

#[derive(Debug, Default)]
struct EnemyTally {
    encounters: usize,
    kills: usize,
    player_kills: usize,
    damage_to_player: i64,
    damage_taken: i64,
}

/// Per-enemy lethality, most lethal first.
#[must_use]
pub fn analyze_enemy_lethality(runs: &[Run]) -> Vec<EnemyStats> {
    let mut tally: Ordered<EnemyTally> = Ordered::new();

    for run in runs {
        let mut seen: HashSet<&str> = HashSet::new();
        for enemy in run.all_combats.iter().flat_map(|c| &c.enemies) {
            if seen.insert(enemy.enemy_type.as_str()) {
                tally.entry(&enemy.enemy_type).encounters += 1;
            }
        }

        for hit in &run.all_damage_events {
            if hit.is_from_player() && hit.killed {
                let entry = tally.entry(&hit.target_type);
                entry.kills += 1;
                entry.damage_taken = entry.damage_taken.saturating_add(hit.final_damage);
            } else if hit.is_against_player() {
                let entry = tally.entry(&hit.source_type);
                entry.damage_to_player = entry.damage_to_player.saturating_add(hit.final_damage);
                if hit.killed {
                    entry.player_kills += 1;
                }
            }
        }
    }

    let mut stats: Vec<EnemyStats> = tally
        .into_entries()
        .into_iter()
        .map(|(enemy_type, t)| EnemyStats {
            enemy_type,
            encounters: t.encounters,
            total_kills: t.kills,
            times_killed_player: t.player_kills,
            total_damage_dealt_to_player: t.damage_to_player,
            total_damage_taken: t.damage_taken,
            avg_damage_per_encounter: mean(t.damage_to_player, t.encounters),
            lethality_score: ratio(t.player_kills, t.encounters),
        })
        .collect();
    stats.sort_by(|a, b| b.lethality_score.total_cmp(&a.lethality_score));
    stats
}

/// Pick and win statistics for one item name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStats {
    pub item_name: String,
    /// Type and rarity as recorded by the latest pickup.
    pub item_type: String,
    pub rarity: String,
    pub times_picked: usize,
    /// Fraction of all runs in which the item was picked at least once.
    /// Runs are counted by position in the input, so two runs sharing a
    /// `run_id` count separately.
    pub pick_rate: f64,
    /// Fraction of those runs that ended in victory.
    pub win_rate_with_item: f64,
}

#[derive(Debug, Default)]
struct ItemTally {
    item_type: String,
    rarity: String,
    picks: usize,
    runs_with_item: usize,
    wins_with_item: usize,
}

/// Per-item statistics, most picked (by raw pick count) first.
#[must_use]
pub fn analyze_item_effectiveness(runs: &[Run]) -> Vec<ItemStats> {
    let mut tally: Ordered<ItemTally> = Ordered::new();

    for run in runs {
        let mut in_run: HashSet<&str> = HashSet::new();
        for item in &run.all_items {
            let entry = tally.entry(&item.name);
            entry.item_type.clone_from(&item.item_type);
            entry.rarity.clone_from(&item.rarity);
            entry.picks += 1;
            if in_run.insert(item.name.as_str()) {
                entry.runs_with_item += 1;
                if run.is_victory() {
                    entry.wins_with_item += 1;
                }
            }
        }
    }

    let mut stats: Vec<ItemStats> = tally
        .into_entries()
        .into_iter()
        .map(|(item_name, t)| ItemStats {
            item_name,
            item_type: t.item_type,
            rarity: t.rarity,
            times_picked: t.picks,
            pick_rate: ratio(t.runs_with_item, runs.len()),
            win_rate_with_item: ratio(t.wins_with_item, t.runs_with_item),
        })
        .collect();
    stats.sort_by(|a, b| b.times_picked.cmp(&a.times_picked));
    stats
}

/// Total pickups per rarity, in first-seen order of the given stats.
#[must_use]
pub fn items_by_rarity(items: &[ItemStats]) -> Vec<(String, usize)> {
    let mut tally: Ordered<usize> = Ordered::new();
    for item in items {
        *tally.entry(&item.rarity) += item.times_picked;
    }
    tally.into_entries()
}

/// One bucket of the death-cause histogram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathCause {
    pub cause: String,
    pub deaths: usize,
}

/// Histogram of what killed the player, most common first. Runs without a
/// recorded hit on the player land in [`UNKNOWN_DEATH_CAUSE`].
#[must_use]
pub fn analyze_death_causes(runs: &[Run]) -> Vec<DeathCause> {
    let mut tally: Ordered<usize> = Ordered::new();
    for run in runs.iter().filter(|r| !r.player_alive) {
        let cause = run
            .last_hit_on_player()
            .map_or(UNKNOWN_DEATH_CAUSE, |hit| hit.source_type.as_str());
        *tally.entry(cause) += 1;
    }

    let mut causes: Vec<DeathCause> = tally
        .into_entries()
        .into_iter()
        .map(|(cause, deaths)| DeathCause { cause, deaths })
        .collect();
    causes.sort_by(|a, b| b.deaths.cmp(&a.deaths));
    causes
}
