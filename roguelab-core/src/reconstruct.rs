//! Folding an ordered event stream into a [`Run`].
//!
//! Reconstruction is a single forward pass. The only context carried between
//! events is which floor is current and which combat is open; see
//! [`FoldState`].
use crate::error::{Result, TelemetryError};
use crate::event::{Event, EventKind};
use crate::model::{Combat, Run};
use crate::payload::{
    CombatEndedPayload, CombatStartedPayload, DamageDealtPayload, FloorEnteredPayload,
    ItemPickedPayload, RunEndedPayload, RunStartedPayload, read_payload,
};

/// Floor number stamped on combats that start before any floor is entered.
pub const FLOORLESS_COMBAT_FLOOR: u32 = 1;

/// Mutable context threaded through the fold.
#[derive(Debug, Default)]
pub struct FoldState {
    /// Index into `Run::floors` of the floor most recently entered.
    pub current_floor: Option<usize>,
    /// Combat started but not yet ended.
    pub current_combat: Option<Combat>,
}

impl FoldState {
    /// Apply one event to the run under construction.
    pub fn apply(&mut self, run: &mut Run, event: &Event) {
        match &event.kind {
            // Identity is read once, before the fold starts.
            EventKind::RunStarted => {}
            EventKind::FloorEntered => {
                let payload: FloorEnteredPayload =
                    read_payload(&event.kind, event.tick, &event.payload);
                run.floors.push(payload.into_floor());
                self.current_floor = Some(run.floors.len() - 1);
            }
            EventKind::CombatStarted => {
                let payload: CombatStartedPayload =
                    read_payload(&event.kind, event.tick, &event.payload);
                let floor_number = self
                    .current_floor
                    .and_then(|idx| run.floors.get(idx))
                    .map_or(FLOORLESS_COMBAT_FLOOR, |floor| floor.floor_number);
                if let Some(abandoned) = self.current_combat.take() {
                    log::debug!(
                        "run {}: tick {} starts a new combat while room '{}' is still open; \
                         dropping the open combat",
                        run.run_id,
                        event.tick,
                        abandoned.room_id
                    );
                }
                self.current_combat = Some(payload.into_combat(floor_number));
            }
            EventKind::DamageDealt => {
                let payload: DamageDealtPayload =
                    read_payload(&event.kind, event.tick, &event.payload);
                let damage = payload.into_damage(event.tick);
                if let Some(combat) = self.current_combat.as_mut() {
                    combat.damage_events.push(damage.clone());
                }
                run.all_damage_events.push(damage);
            }
            EventKind::CombatEnded => {
                let Some(mut combat) = self.current_combat.take() else {
                    log::debug!(
                        "run {}: tick {} ends a combat that never started",
                        run.run_id,
                        event.tick
                    );
                    return;
                };
                let payload: CombatEndedPayload =
                    read_payload(&event.kind, event.tick, &event.payload);
                payload.apply_to(&mut combat);
                if let Some(floor) = self.current_floor.and_then(|idx| run.floors.get_mut(idx)) {
                    floor.combats.push(combat.clone());
                }
                run.all_combats.push(combat);
            }
            EventKind::ItemPicked => {
                let payload: ItemPickedPayload =
                    read_payload(&event.kind, event.tick, &event.payload);
                let item = payload.into_item();
                if let Some(floor) = self.current_floor.and_then(|idx| run.floors.get_mut(idx)) {
                    floor.items_found.push(item.clone());
                }
                run.all_items.push(item);
            }
            EventKind::RunEnded => {
                let payload: RunEndedPayload =
                    read_payload(&event.kind, event.tick, &event.payload);
                payload.apply_to(run);
            }
            EventKind::Other(_) => {}
        }
    }
}

/// Reconstruct one run from its ordered events.
///
/// The first `RUN_STARTED` anywhere in the stream establishes identity; every
/// event, including any before it, is then folded in order. The raw events
/// are kept on the run.
///
/// # Errors
///
/// [`TelemetryError::EmptyRun`] for an empty stream and
/// [`TelemetryError::MissingRunStart`] when no `RUN_STARTED` is present.
pub fn reconstruct_run(source_name: &str, events: Vec<Event>) -> Result<Run> {
    if events.is_empty() {
        return Err(TelemetryError::EmptyRun {
            source_name: source_name.to_string(),
        });
    }
    let start = events
        .iter()
        .find(|e| e.kind == EventKind::RunStarted)
        .ok_or_else(|| TelemetryError::MissingRunStart {
            source_name: source_name.to_string(),
        })?;

    let identity: RunStartedPayload = read_payload(&start.kind, start.tick, &start.payload);
    let mut run = identity.into_run(start.run_id.clone());

    let mut state = FoldState::default();
    for event in &events {
        state.apply(&mut run, event);
    }
    if let Some(open) = state.current_combat {
        log::debug!(
            "run {}: combat in room '{}' never ended; dropping it",
            run.run_id,
            open.room_id
        );
    }

    run.events = events;
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::parse_event_line;
    use serde_json::{Value, json};

    fn event(tick: i64, kind: &str, payload: Value) -> Event {
        let line = json!({
            "event_type": kind,
            "event_version": "1.0.0",
            "timestamp": "2025-01-15T14:30:00.000Z",
            "run_id": "run-1",
            "tick": tick,
            "payload": payload,
        });
        parse_event_line(tick as usize + 1, &line.to_string()).unwrap()
    }

    fn start() -> Event {
        event(0, "RUN_STARTED", json!({ "seed": 99, "player_class": "WARRIOR" }))
    }

    fn hit(tick: i64, source: &str, target: &str, killed: bool) -> Event {
        event(
            tick,
            "DAMAGE_DEALT",
            json!({
                "source_type": source,
                "target_type": target,
                "final_damage": 5,
                "killed": killed,
            }),
        )
    }

    #[test]
    fn empty_stream_is_rejected() {
        let err = reconstruct_run("a.jsonl", Vec::new()).unwrap_err();
        assert!(matches!(err, TelemetryError::EmptyRun { .. }));
    }

    #[test]
    fn run_end_alone_is_missing_start() {
        let err =
            reconstruct_run("a.jsonl", vec![event(5, "RUN_ENDED", json!({}))]).unwrap_err();
        assert!(matches!(err, TelemetryError::MissingRunStart { .. }));
    }

    #[test]
    fn combat_end_without_start_is_ignored() {
        let events = vec![
            start(),
            event(1, "FLOOR_ENTERED", json!({ "floor_number": 1 })),
            event(2, "COMBAT_ENDED", json!({ "outcome": "VICTORY" })),
        ];
        let run = reconstruct_run("a", events).unwrap();
        assert!(run.all_combats.is_empty());
        assert!(run.floors[0].combats.is_empty());
    }

    #[test]
    fn second_combat_start_replaces_open_combat() {
        let events = vec![
            start(),
            event(1, "COMBAT_STARTED", json!({ "room_id": "first" })),
            hit(2, "PLAYER", "GOBLIN", false),
            event(3, "COMBAT_STARTED", json!({ "room_id": "second" })),
            hit(4, "PLAYER", "ORC", true),
            event(5, "COMBAT_ENDED", json!({ "outcome": "VICTORY" })),
        ];
        let run = reconstruct_run("a", events).unwrap();
        assert_eq!(run.all_combats.len(), 1);
        assert_eq!(run.all_combats[0].room_id, "second");
        assert_eq!(run.all_combats[0].damage_events.len(), 1);
        assert_eq!(run.all_damage_events.len(), 2);
    }

    #[test]
    fn combat_without_floor_uses_floor_one_and_stays_run_level() {
        let events = vec![
            start(),
            event(1, "COMBAT_STARTED", json!({})),
            event(2, "COMBAT_ENDED", json!({ "outcome": "VICTORY" })),
            event(3, "ITEM_PICKED", json!({ "item_name": "Potion" })),
        ];
        let run = reconstruct_run("a", events).unwrap();
        assert!(run.floors.is_empty());
        assert_eq!(run.all_combats[0].floor_number, 1);
        assert_eq!(run.all_items.len(), 1);
    }

    #[test]
    fn combat_is_stamped_with_current_floor() {
        let events = vec![
            start(),
            event(1, "FLOOR_ENTERED", json!({ "floor_number": 1 })),
            event(2, "FLOOR_ENTERED", json!({ "floor_number": 4, "is_boss_floor": true })),
            event(3, "COMBAT_STARTED", json!({})),
            event(4, "COMBAT_ENDED", json!({})),
            event(5, "ITEM_PICKED", json!({ "item_name": "Crown" })),
        ];
        let run = reconstruct_run("a", events).unwrap();
        assert_eq!(run.all_combats[0].floor_number, 4);
        assert!(run.floors[0].combats.is_empty());
        assert_eq!(run.floors[1].combats.len(), 1);
        assert_eq!(run.floors[1].items_found[0].name, "Crown");
    }

    #[test]
    fn orphaned_damage_is_global_only() {
        let events = vec![
            start(),
            hit(1, "TRAP", "PLAYER", false),
            event(2, "COMBAT_STARTED", json!({})),
            hit(3, "PLAYER", "RAT", true),
            event(4, "COMBAT_ENDED", json!({})),
            hit(5, "TRAP", "PLAYER", false),
        ];
        let run = reconstruct_run("a", events).unwrap();
        let per_combat: usize = run.all_combats.iter().map(|c| c.damage_events.len()).sum();
        assert_eq!(run.all_damage_events.len(), 3);
        assert_eq!(per_combat, 1);
    }

    #[test]
    fn unterminated_combat_is_dropped_at_run_end() {
        let events = vec![
            start(),
            event(1, "COMBAT_STARTED", json!({})),
            hit(2, "GOBLIN", "PLAYER", true),
            event(3, "RUN_ENDED", json!({ "end_reason": "DEATH", "player_alive": false })),
        ];
        let run = reconstruct_run("a", events).unwrap();
        assert!(run.all_combats.is_empty());
        assert_eq!(run.all_damage_events.len(), 1);
        assert!(!run.player_alive);
    }

    #[test]
    fn unknown_events_are_retained_but_inert() {
        let events = vec![
            start(),
            event(1, "SHOP_PURCHASED", json!({ "price": 30 })),
            event(2, "RUN_ENDED", json!({ "end_reason": "VICTORY" })),
        ];
        let run = reconstruct_run("a", events).unwrap();
        assert_eq!(run.events.len(), 3);
        assert!(run.is_victory());
        assert_eq!(run.player_class, "WARRIOR");
        assert_eq!(run.seed, 99);
    }
}
