//! Single-run metrics.
use serde::{Deserialize, Serialize};

use crate::model::Run;
use crate::payload::UNKNOWN_OUTCOME;

/// Summary statistics for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunAnalysis {
    pub run_id: String,
    pub outcome: String,
    pub floors_reached: u32,
    pub total_combats: usize,
    pub total_enemies_killed: u32,
    pub damage_dealt: i64,
    pub damage_taken: i64,
    pub damage_efficiency: f64,
    pub gold_earned: i64,
    pub items_collected: u32,
    pub avg_combat_turns: f64,
    pub critical_hit_rate: f64,
    /// Source type of the last hit on the player; only set for runs the
    /// player did not survive and where such a hit was recorded.
    pub death_cause: Option<String>,
    pub death_floor: Option<u32>,
}

/// Fraction of player-sourced hits that were critical, 0.0 without any.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn critical_hit_rate(run: &Run) -> f64 {
    let (attacks, crits) = run
        .all_damage_events
        .iter()
        .filter(|d| d.is_from_player())
        .fold((0usize, 0usize), |(attacks, crits), d| {
            (attacks + 1, crits + usize::from(d.critical))
        });
    if attacks == 0 {
        return 0.0;
    }
    crits as f64 / attacks as f64
}

/// Mean `turns_elapsed` over the run's finalized combats, 0.0 without any.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn avg_combat_turns(run: &Run) -> f64 {
    if run.all_combats.is_empty() {
        return 0.0;
    }
    let total: u64 = run
        .all_combats
        .iter()
        .map(|c| u64::from(c.turns_elapsed))
        .sum();
    total as f64 / run.all_combats.len() as f64
}

#[must_use]
pub fn analyze_run(run: &Run) -> RunAnalysis {
    let (death_cause, death_floor) = if run.player_alive {
        (None, None)
    } else {
        match run.last_hit_on_player() {
            Some(hit) => (Some(hit.source_type.clone()), Some(run.final_floor)),
            None => (None, None),
        }
    };

    RunAnalysis {
        run_id: run.run_id.clone(),
        outcome: run
            .end_reason
            .clone()
            .unwrap_or_else(|| UNKNOWN_OUTCOME.to_string()),
        floors_reached: run.final_floor,
        total_combats: run.all_combats.len(),
        total_enemies_killed: run.total_enemies_killed,
        damage_dealt: run.total_damage_dealt,
        damage_taken: run.total_damage_taken,
        damage_efficiency: run.damage_efficiency(),
        gold_earned: run.total_gold_earned,
        items_collected: run.total_items_collected,
        avg_combat_turns: avg_combat_turns(run),
        critical_hit_rate: critical_hit_rate(run),
        death_cause,
        death_floor,
    }
}
