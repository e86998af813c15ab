use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::io::Write;

use roguelab_core::{
    BatchLoad, BatchOverview, CombatAnalysis, DeathCause, EnemyStats, ItemStats, Run,
    RunAnalysis, analyze_combat_efficiency, analyze_death_causes, analyze_enemy_lethality,
    analyze_item_effectiveness, batch_overview, items_by_rarity,
};

const TOP_ENEMIES: usize = 10;
const TOP_DEATH_CAUSES: usize = 10;
const TOP_ITEMS: usize = 15;
const CONSOLE_TOP: usize = 5;

/// Everything the batch reports render, computed once.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub overview: BatchOverview,
    pub combat: CombatAnalysis,
    pub enemies: Vec<EnemyStats>,
    pub items: Vec<ItemStats>,
    pub items_by_rarity: Vec<(String, usize)>,
    pub death_causes: Vec<DeathCause>,
    pub skipped_sources: Vec<String>,
}

impl BatchReport {
    /// `None` when the batch holds no runs.
    pub fn from_batch(batch: &BatchLoad) -> Option<Self> {
        let overview = batch_overview(&batch.runs)?;
        let items = analyze_item_effectiveness(&batch.runs);
        Some(Self {
            overview,
            combat: analyze_combat_efficiency(&batch.runs),
            enemies: analyze_enemy_lethality(&batch.runs),
            items_by_rarity: items_by_rarity(&items),
            items,
            death_causes: analyze_death_causes(&batch.runs),
            skipped_sources: batch
                .failures
                .iter()
                .map(|f| f.source_name.clone())
                .collect(),
        })
    }
}

fn pct(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

pub fn generate_json_report<W: Write, T: Serialize + ?Sized>(writer: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, value)?;
    writeln!(writer)?;
    Ok(())
}

pub fn generate_run_console_report<W: Write>(
    writer: &mut W,
    run: &Run,
    analysis: &RunAnalysis,
) -> Result<()> {
    writeln!(writer, "Run ID: {}", run.run_id.bold())?;
    writeln!(writer, "Player: {} ({})", run.player_name, run.player_class)?;
    writeln!(writer, "Difficulty: {}", run.difficulty)?;
    writeln!(writer)?;

    let outcome = if run.is_victory() {
        analysis.outcome.green()
    } else {
        analysis.outcome.red()
    };
    writeln!(writer, "{}", "📊 Run Summary".bright_cyan().bold())?;
    writeln!(writer, "Outcome: {outcome}")?;
    writeln!(writer, "Floors Reached: {}", analysis.floors_reached)?;
    writeln!(writer, "Total Combats: {}", analysis.total_combats)?;
    writeln!(writer, "Enemies Killed: {}", analysis.total_enemies_killed)?;
    writeln!(writer)?;

    writeln!(writer, "{}", "⚔️  Combat Stats".bright_yellow().bold())?;
    writeln!(writer, "Damage Dealt: {}", analysis.damage_dealt)?;
    writeln!(writer, "Damage Taken: {}", analysis.damage_taken)?;
    writeln!(writer, "Damage Efficiency: {:.2}x", analysis.damage_efficiency)?;
    writeln!(writer, "Avg Combat Turns: {:.1}", analysis.avg_combat_turns)?;
    writeln!(writer, "Critical Hit Rate: {}", pct(analysis.critical_hit_rate))?;
    writeln!(writer)?;

    writeln!(writer, "{}", "💰 Economy".bright_yellow().bold())?;
    writeln!(writer, "Gold Earned: {}", analysis.gold_earned)?;
    writeln!(writer, "Items Collected: {}", analysis.items_collected)?;

    if !run.player_alive {
        writeln!(writer)?;
        writeln!(writer, "{}", "💀 Death".bright_red().bold())?;
        writeln!(
            writer,
            "Killed by: {}",
            analysis.death_cause.as_deref().unwrap_or("Unknown").red()
        )?;
        match analysis.death_floor {
            Some(floor) => writeln!(writer, "On floor: {floor}")?,
            None => writeln!(writer, "On floor: Unknown")?,
        }
    }
    Ok(())
}

pub fn generate_run_markdown_report<W: Write>(
    writer: &mut W,
    run: &Run,
    analysis: &RunAnalysis,
) -> Result<()> {
    writeln!(writer, "# Run Report: {}\n", run.run_id)?;

    writeln!(writer, "## Summary\n")?;
    writeln!(writer, "| Metric | Value |")?;
    writeln!(writer, "|--------|-------|")?;
    writeln!(writer, "| Outcome | **{}** |", analysis.outcome)?;
    writeln!(writer, "| Player | {} ({}) |", run.player_name, run.player_class)?;
    writeln!(writer, "| Difficulty | {} |", run.difficulty)?;
    writeln!(writer, "| Seed | {} |", run.seed)?;
    writeln!(writer, "| Floors Reached | {} |", analysis.floors_reached)?;
    writeln!(writer, "| Rooms Visited | {} |\n", run.rooms_visited)?;

    writeln!(writer, "## Combat Statistics\n")?;
    writeln!(writer, "| Metric | Value |")?;
    writeln!(writer, "|--------|-------|")?;
    writeln!(writer, "| Total Combats | {} |", analysis.total_combats)?;
    writeln!(writer, "| Enemies Killed | {} |", analysis.total_enemies_killed)?;
    writeln!(writer, "| Damage Dealt | {} |", analysis.damage_dealt)?;
    writeln!(writer, "| Damage Taken | {} |", analysis.damage_taken)?;
    writeln!(writer, "| Damage Efficiency | {:.2}x |", analysis.damage_efficiency)?;
    writeln!(writer, "| Avg Combat Turns | {:.1} |", analysis.avg_combat_turns)?;
    writeln!(
        writer,
        "| Critical Hit Rate | {} |\n",
        pct(analysis.critical_hit_rate)
    )?;

    writeln!(writer, "## Economy\n")?;
    writeln!(writer, "| Metric | Value |")?;
    writeln!(writer, "|--------|-------|")?;
    writeln!(writer, "| Gold Earned | {} |", analysis.gold_earned)?;
    writeln!(writer, "| Items Collected | {} |\n", analysis.items_collected)?;

    if !run.floors.is_empty() {
        writeln!(writer, "## Floor Breakdown\n")?;
        writeln!(writer, "| Floor | Rooms | Combats | Enemies Killed | Items Found |")?;
        writeln!(writer, "|-------|-------|---------|----------------|-------------|")?;
        for floor in &run.floors {
            writeln!(
                writer,
                "| {} | {} | {} | {} | {} |",
                floor.floor_number,
                floor.room_count,
                floor.combats.len(),
                floor.enemies_killed(),
                floor.items_found.len()
            )?;
        }
        writeln!(writer)?;
    }

    if !run.all_items.is_empty() {
        writeln!(writer, "## Items Collected\n")?;
        writeln!(writer, "| Item | Type | Rarity |")?;
        writeln!(writer, "|------|------|--------|")?;
        for item in &run.all_items {
            writeln!(writer, "| {} | {} | {} |", item.name, item.item_type, item.rarity)?;
        }
        writeln!(writer)?;
    }

    if !run.player_alive {
        writeln!(writer, "## Death Analysis\n")?;
        writeln!(
            writer,
            "- **Cause**: {}",
            analysis.death_cause.as_deref().unwrap_or("Unknown")
        )?;
        match analysis.death_floor {
            Some(floor) => writeln!(writer, "- **Floor**: {floor}\n")?,
            None => writeln!(writer, "- **Floor**: Unknown\n")?,
        }
    }
    Ok(())
}

pub fn generate_batch_console_report<W: Write>(writer: &mut W, report: &BatchReport) -> Result<()> {
    let overview = &report.overview;
    writeln!(writer, "{}", "📊 Quick Summary".bright_cyan().bold())?;
    writeln!(writer, "{}", "================".cyan())?;
    writeln!(writer, "Total Runs: {}", overview.total_runs)?;
    writeln!(
        writer,
        "Victories: {} ({})",
        overview.victories.to_string().green(),
        pct(overview.victory_rate())
    )?;
    writeln!(writer, "Defeats: {}", overview.defeats.to_string().red())?;
    if !report.skipped_sources.is_empty() {
        writeln!(
            writer,
            "Skipped sources: {}",
            report.skipped_sources.len().to_string().yellow()
        )?;
    }
    writeln!(writer)?;

    let combat = &report.combat;
    writeln!(writer, "{}", "⚔️  Combat Analysis".bright_yellow().bold())?;
    writeln!(writer, "{}", "==================".yellow())?;
    writeln!(writer, "Total Combats: {}", combat.total_combats)?;
    writeln!(writer, "Combat Win Rate: {}", pct(combat.win_rate))?;
    writeln!(writer, "Avg Turns/Combat: {:.1}", combat.avg_turns_per_combat)?;
    writeln!(writer, "Critical Hit Rate: {}", pct(combat.critical_hit_rate))?;
    if let Some(enemy) = &combat.most_dangerous_enemy {
        writeln!(writer, "Most Dangerous Enemy: {}", enemy.red())?;
    }
    writeln!(writer)?;

    writeln!(
        writer,
        "{}",
        format!("☠️  Enemy Lethality (Top {CONSOLE_TOP})").bright_red().bold()
    )?;
    for enemy in report.enemies.iter().take(CONSOLE_TOP) {
        writeln!(
            writer,
            "  {}: {:.2}% ({} player deaths)",
            enemy.enemy_type.bold(),
            enemy.lethality_score * 100.0,
            enemy.times_killed_player
        )?;
    }

    if !report.death_causes.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "{}", "💀 Top Death Causes".bright_red().bold())?;
        for cause in report.death_causes.iter().take(CONSOLE_TOP) {
            writeln!(writer, "  {}: {} deaths", cause.cause, cause.deaths)?;
        }
    }
    Ok(())
}

pub fn generate_batch_markdown_report<W: Write>(writer: &mut W, report: &BatchReport) -> Result<()> {
    #[allow(clippy::cast_precision_loss)]
    let share = |count: usize| count as f64 / report.overview.total_runs as f64;
    let overview = &report.overview;

    writeln!(writer, "# RogueLab Batch Analysis Report\n")?;

    writeln!(writer, "## Overview\n")?;
    writeln!(writer, "| Metric | Value |")?;
    writeln!(writer, "|--------|-------|")?;
    writeln!(writer, "| Total Runs | {} |", overview.total_runs)?;
    writeln!(
        writer,
        "| Victories | {} ({}) |",
        overview.victories,
        pct(share(overview.victories))
    )?;
    writeln!(
        writer,
        "| Defeats | {} ({}) |",
        overview.defeats,
        pct(share(overview.defeats))
    )?;
    if !report.skipped_sources.is_empty() {
        writeln!(writer, "| Skipped Sources | {} |", report.skipped_sources.len())?;
    }
    writeln!(writer)?;

    let combat = &report.combat;
    writeln!(writer, "## Combat Statistics\n")?;
    writeln!(writer, "| Metric | Value |")?;
    writeln!(writer, "|--------|-------|")?;
    writeln!(writer, "| Total Combats | {} |", combat.total_combats)?;
    writeln!(writer, "| Combat Win Rate | {} |", pct(combat.win_rate))?;
    writeln!(writer, "| Avg Turns/Combat | {:.1} |", combat.avg_turns_per_combat)?;
    writeln!(writer, "| Avg Damage Dealt | {:.1} |", combat.avg_damage_dealt)?;
    writeln!(writer, "| Avg Damage Taken | {:.1} |", combat.avg_damage_taken)?;
    writeln!(writer, "| Critical Hit Rate | {} |", pct(combat.critical_hit_rate))?;
    writeln!(
        writer,
        "| Most Dangerous Enemy | {} |\n",
        combat.most_dangerous_enemy.as_deref().unwrap_or("N/A")
    )?;

    writeln!(writer, "## Enemy Lethality Ranking\n")?;
    writeln!(writer, "| Enemy | Encounters | Player Deaths | Lethality |")?;
    writeln!(writer, "|-------|------------|---------------|-----------|")?;
    for enemy in report.enemies.iter().take(TOP_ENEMIES) {
        writeln!(
            writer,
            "| {} | {} | {} | {:.2}% |",
            enemy.enemy_type,
            enemy.encounters,
            enemy.times_killed_player,
            enemy.lethality_score * 100.0
        )?;
    }
    writeln!(writer)?;

    writeln!(writer, "## Death Causes\n")?;
    writeln!(writer, "| Enemy | Deaths |")?;
    writeln!(writer, "|-------|--------|")?;
    for cause in report.death_causes.iter().take(TOP_DEATH_CAUSES) {
        writeln!(writer, "| {} | {} |", cause.cause, cause.deaths)?;
    }
    writeln!(writer)?;

    writeln!(writer, "## Item Statistics\n")?;
    writeln!(writer, "| Item | Rarity | Times Picked | Win Rate |")?;
    writeln!(writer, "|------|--------|--------------|----------|")?;
    for item in report.items.iter().take(TOP_ITEMS) {
        writeln!(
            writer,
            "| {} | {} | {} | {} |",
            item.item_name,
            item.rarity,
            item.times_picked,
            pct(item.win_rate_with_item)
        )?;
    }
    writeln!(writer)?;

    if !report.items_by_rarity.is_empty() {
        writeln!(writer, "## Items by Rarity\n")?;
        writeln!(writer, "| Rarity | Times Picked |")?;
        writeln!(writer, "|--------|--------------|")?;
        for (rarity, picks) in &report.items_by_rarity {
            writeln!(writer, "| {rarity} | {picks} |")?;
        }
        writeln!(writer)?;
    }

    writeln!(writer, "## Run Statistics\n")?;
    writeln!(writer, "| Metric | Mean | Min | Max |")?;
    writeln!(writer, "|--------|------|-----|-----|")?;
    let rows = [
        ("Floors Reached", &overview.floors_reached, 1),
        ("Enemies Killed", &overview.enemies_killed, 1),
        ("Damage Dealt", &overview.damage_dealt, 0),
        ("Gold Earned", &overview.gold_earned, 0),
    ];
    for (label, stats, precision) in rows {
        writeln!(
            writer,
            "| {label} | {:.precision$} | {} | {} |",
            stats.mean, stats.min, stats.max
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use roguelab_core::{LoadOptions, load_runs};

    const DEATH_RUN: &str = concat!(
        r#"{"event_type":"RUN_STARTED","event_version":"1.0.0","timestamp":"2025-01-15T14:30:00Z","run_id":"r-dead","tick":0,"payload":{"player_name":"Ada","player_class":"ROGUE","seed":7}}"#,
        "\n",
        r#"{"event_type":"FLOOR_ENTERED","event_version":"1.0.0","timestamp":"2025-01-15T14:30:01Z","run_id":"r-dead","tick":1,"payload":{"floor_number":1,"room_count":4}}"#,
        "\n",
        r#"{"event_type":"COMBAT_STARTED","event_version":"1.0.0","timestamp":"2025-01-15T14:30:02Z","run_id":"r-dead","tick":2,"payload":{"enemies":[{"id":"e1","type":"SKELETON"}]}}"#,
        "\n",
        r#"{"event_type":"DAMAGE_DEALT","event_version":"1.0.0","timestamp":"2025-01-15T14:30:03Z","run_id":"r-dead","tick":3,"payload":{"source_type":"SKELETON","target_type":"PLAYER","final_damage":30,"killed":true}}"#,
        "\n",
        r#"{"event_type":"COMBAT_ENDED","event_version":"1.0.0","timestamp":"2025-01-15T14:30:04Z","run_id":"r-dead","tick":4,"payload":{"outcome":"DEFEAT","turns_elapsed":2}}"#,
        "\n",
        r#"{"event_type":"ITEM_PICKED","event_version":"1.0.0","timestamp":"2025-01-15T14:30:05Z","run_id":"r-dead","tick":5,"payload":{"item_name":"Bone Charm","item_type":"ACCESSORY","rarity":"RARE"}}"#,
        "\n",
        r#"{"event_type":"RUN_ENDED","event_version":"1.0.0","timestamp":"2025-01-15T14:30:06Z","run_id":"r-dead","tick":6,"payload":{"end_reason":"DEATH","final_floor":1,"player_alive":false,"damage_taken":30}}"#,
    );
    const WIN_RUN: &str = concat!(
        r#"{"event_type":"RUN_STARTED","event_version":"1.0.0","timestamp":"2025-01-15T15:00:00Z","run_id":"r-win","tick":0,"payload":{}}"#,
        "\n",
        r#"{"event_type":"RUN_ENDED","event_version":"1.0.0","timestamp":"2025-01-15T15:10:00Z","run_id":"r-win","tick":90,"payload":{"end_reason":"VICTORY","final_floor":5,"gold_earned":120}}"#,
    );

    fn batch() -> BatchLoad {
        load_runs(
            &[("dead.jsonl", DEATH_RUN), ("win.jsonl", WIN_RUN), ("bad.jsonl", "")],
            &LoadOptions::default(),
        )
    }

    fn render<F>(write: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> Result<()>,
    {
        let mut buffer = Vec::new();
        write(&mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn run_markdown_includes_floor_items_and_death() {
        let batch = batch();
        let run = &batch.runs[0];
        let analysis = roguelab_core::analyze_run(run);
        let content = render(|w| generate_run_markdown_report(w, run, &analysis));
        assert!(content.starts_with("# Run Report: r-dead"));
        assert!(content.contains("| Player | Ada (ROGUE) |"));
        assert!(content.contains("| 1 | 4 | 1 | 0 | 1 |"));
        assert!(content.contains("| Bone Charm | ACCESSORY | RARE |"));
        assert!(content.contains("- **Cause**: SKELETON"));
    }

    #[test]
    fn run_markdown_omits_death_for_survivor() {
        let batch = batch();
        let run = &batch.runs[1];
        let analysis = roguelab_core::analyze_run(run);
        let content = render(|w| generate_run_markdown_report(w, run, &analysis));
        assert!(content.contains("| Outcome | **VICTORY** |"));
        assert!(!content.contains("Death Analysis"));
        assert!(!content.contains("Floor Breakdown"));
    }

    #[test]
    fn batch_report_requires_runs() {
        assert!(BatchReport::from_batch(&BatchLoad::default()).is_none());
    }

    #[test]
    fn batch_markdown_has_every_section() {
        let report = BatchReport::from_batch(&batch()).unwrap();
        assert_eq!(report.skipped_sources, vec!["bad.jsonl".to_string()]);
        let content = render(|w| generate_batch_markdown_report(w, &report));
        assert!(content.contains("| Victories | 1 (50.0%) |"));
        assert!(content.contains("| Most Dangerous Enemy | SKELETON |"));
        assert!(content.contains("| SKELETON | 1 | 1 | 100.00% |"));
        assert!(content.contains("| SKELETON | 1 |"));
        assert!(content.contains("| Bone Charm | RARE | 1 | 0.0% |"));
        assert!(content.contains("| RARE | 1 |"));
        assert!(content.contains("| Floors Reached | 3.0 | 1 | 5 |"));
        assert!(content.contains("| Gold Earned | 60 | 0 | 120 |"));
    }

    #[test]
    fn console_reports_render() {
        let batch = batch();
        let report = BatchReport::from_batch(&batch).unwrap();
        let content = render(|w| generate_batch_console_report(w, &report));
        assert!(content.contains("Total Runs: 2"));
        assert!(content.contains("SKELETON"));

        let run = &batch.runs[0];
        let analysis = roguelab_core::analyze_run(run);
        let content = render(|w| generate_run_console_report(w, run, &analysis));
        assert!(content.contains("Killed by:"));
        assert!(content.contains("On floor: 1"));
    }

    #[test]
    fn json_report_is_parseable() {
        let report = BatchReport::from_batch(&batch()).unwrap();
        let content = render(|w| generate_json_report(w, &report));
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["overview"]["total_runs"], 2);
        assert_eq!(value["death_causes"][0]["cause"], "SKELETON");
    }
}
