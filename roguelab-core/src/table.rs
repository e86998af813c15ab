//! Flat tabular projections of runs and batch-level summary statistics.
use serde::{Deserialize, Serialize};

use crate::analysis::{avg_combat_turns, critical_hit_rate};
use crate::model::Run;

/// One row of the run summary table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRow {
    pub run_id: String,
    pub seed: i64,
    pub difficulty: String,
    pub player_class: String,
    pub outcome: Option<String>,
    pub is_victory: bool,
    pub floors_reached: u32,
    pub rooms_visited: u32,
    pub rooms_cleared: u32,
    pub enemies_killed: u32,
    pub damage_dealt: i64,
    pub damage_taken: i64,
    pub damage_efficiency: f64,
    pub gold_earned: i64,
    pub gold_spent: i64,
    pub items_collected: u32,
    pub combats: usize,
    pub avg_combat_turns: f64,
    pub critical_hit_rate: f64,
}

impl From<&Run> for RunRow {
    fn from(run: &Run) -> Self {
        Self {
            run_id: run.run_id.clone(),
            seed: run.seed,
            difficulty: run.difficulty.clone(),
            player_class: run.player_class.clone(),
            outcome: run.end_reason.clone(),
            is_victory: run.is_victory(),
            floors_reached: run.final_floor,
            rooms_visited: run.rooms_visited,
            rooms_cleared: run.rooms_cleared,
            enemies_killed: run.total_enemies_killed,
            damage_dealt: run.total_damage_dealt,
            damage_taken: run.total_damage_taken,
            damage_efficiency: run.damage_efficiency(),
            gold_earned: run.total_gold_earned,
            gold_spent: run.total_gold_spent,
            items_collected: run.total_items_collected,
            combats: run.all_combats.len(),
            avg_combat_turns: avg_combat_turns(run),
            critical_hit_rate: critical_hit_rate(run),
        }
    }
}

#[must_use]
pub fn run_rows(runs: &[Run]) -> Vec<RunRow> {
    runs.iter().map(RunRow::from).collect()
}

/// One damage event, tagged with its run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageRow {
    pub run_id: String,
    pub tick: i64,
    pub source_id: String,
    pub source_type: String,
    pub target_id: String,
    pub target_type: String,
    pub base_damage: i64,
    pub final_damage: i64,
    pub damage_type: String,
    pub critical: bool,
    pub killed: bool,
}

/// Every damage event of every run, in run then stream order.
#[must_use]
pub fn damage_rows(runs: &[Run]) -> Vec<DamageRow> {
    runs.iter()
        .flat_map(|run| {
            run.all_damage_events.iter().map(|d| DamageRow {
                run_id: run.run_id.clone(),
                tick: d.tick,
                source_id: d.source_id.clone(),
                source_type: d.source_type.clone(),
                target_id: d.target_id.clone(),
                target_type: d.target_type.clone(),
                base_damage: d.base_damage,
                final_damage: d.final_damage,
                damage_type: d.damage_type.clone(),
                critical: d.critical,
                killed: d.killed,
            })
        })
        .collect()
}

/// Mean, minimum and maximum of one integer column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub mean: f64,
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Default)]
struct RunningColumn {
    count: u32,
    mean: f64,
    min: Option<i64>,
    max: Option<i64>,
}

impl RunningColumn {
    #[allow(clippy::cast_precision_loss)]
    fn add(&mut self, value: i64) {
        self.count += 1;
        self.mean += (value as f64 - self.mean) / f64::from(self.count);
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    fn finish(&self) -> Option<ColumnStats> {
        Some(ColumnStats {
            mean: self.mean,
            min: self.min?,
            max: self.max?,
        })
    }
}

/// Headline numbers for a batch of runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOverview {
    pub total_runs: usize,
    pub victories: usize,
    /// Every run that did not end in victory.
    pub defeats: usize,
    pub floors_reached: ColumnStats,
    pub enemies_killed: ColumnStats,
    pub damage_dealt: ColumnStats,
    pub gold_earned: ColumnStats,
}

impl BatchOverview {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn victory_rate(&self) -> f64 {
        if self.total_runs == 0 {
            0.0
        } else {
            self.victories as f64 / self.total_runs as f64
        }
    }
}

/// Summarise a batch; `None` when there are no runs to summarise.
#[must_use]
pub fn batch_overview(runs: &[Run]) -> Option<BatchOverview> {
    let mut floors = RunningColumn::default();
    let mut kills = RunningColumn::default();
    let mut dealt = RunningColumn::default();
    let mut gold = RunningColumn::default();
    for run in runs {
        floors.add(i64::from(run.final_floor));
        kills.add(i64::from(run.total_enemies_killed));
        dealt.add(run.total_damage_dealt);
        gold.add(run.total_gold_earned);
    }

    let victories = runs.iter().filter(|r| r.is_victory()).count();
    Some(BatchOverview {
        total_runs: runs.len(),
        victories,
        defeats: runs.len() - victories,
        floors_reached: floors.finish()?,
        enemies_killed: kills.finish()?,
        damage_dealt: dealt.finish()?,
        gold_earned: gold.finish()?,
    })
}
