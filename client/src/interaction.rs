use cinewall_shared::CatalogRecord;

use crate::grid::GridCoordinate;

/// Bound tile under the pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub coord: GridCoordinate,
    pub record: CatalogRecord,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragAnchor {
    pub last_x: f64,
    pub last_y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lock {
    pub coord: GridCoordinate,
    pub record: CatalogRecord,
    /// What the detail display showed before this lock took over.
    pub previous: Option<CatalogRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Free,
    Dragging,
    Locked(GridCoordinate),
}

/// Side effects requested by an input transition, applied by the engine in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Pan { dx: f64, dy: f64 },
    Zoom { client_x: f64, client_y: f64, delta: f64 },
    Focus(Option<CatalogRecord>),
    LockChanged(bool),
    LockTarget(Option<GridCoordinate>),
    ScrollDetail(f64),
}

/// Hover, lock and drag state. Drag and lock are independent; a locked tile
/// can be dragged around like any other.
#[derive(Debug, Default)]
pub struct InteractionState {
    drag: Option<DragAnchor>,
    lock: Option<Lock>,
    hovered: Option<GridCoordinate>,
    shown: Option<CatalogRecord>,
    suppressed: bool,
}

impl InteractionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        match (&self.lock, &self.drag) {
            (Some(lock), _) => Phase::Locked(lock.coord),
            (None, Some(_)) => Phase::Dragging,
            (None, None) => Phase::Free,
        }
    }

    /// The only coordinate exempt from eviction.
    pub fn locked(&self) -> Option<GridCoordinate> {
        self.lock.as_ref().map(|lock| lock.coord)
    }

    pub fn lock(&self) -> Option<&Lock> {
        self.lock.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn hovered(&self) -> Option<GridCoordinate> {
        self.hovered
    }

    /// Record currently published to the detail display.
    pub fn shown(&self) -> Option<&CatalogRecord> {
        self.shown.as_ref()
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    /// Ignore all canvas input while an overlay is open. Suppressing also ends a drag.
    pub fn set_suppressed(&mut self, suppressed: bool) {
        self.suppressed = suppressed;
        if suppressed {
            self.drag = None;
        }
    }

    pub fn pointer_down(&mut self, x: f64, y: f64, hit: Option<&Hit>, over_ui: bool) -> Vec<Effect> {
        if self.suppressed || over_ui {
            return Vec::new();
        }

        let mut effects = Vec::new();
        let on_locked = matches!(
            (&self.lock, hit),
            (Some(lock), Some(hit)) if lock.coord == hit.coord
        );
        if self.lock.is_some() && !on_locked {
            self.release_into(&mut effects);
        }
        self.drag = Some(DragAnchor { last_x: x, last_y: y });
        effects
    }

    pub fn pointer_move(&mut self, x: f64, y: f64, hit: Option<&Hit>, over_ui: bool) -> Vec<Effect> {
        if self.suppressed {
            return Vec::new();
        }

        let mut effects = Vec::new();
        let hit = hit.filter(|_| !over_ui);

        if let Some(lock) = &self.lock {
            if let Some(hit) = hit.filter(|hit| hit.coord != lock.coord) {
                let previous = Some(lock.record.clone());
                self.lock = Some(Lock {
                    coord: hit.coord,
                    record: hit.record.clone(),
                    previous,
                });
                self.publish(Some(hit.record.clone()), &mut effects);
                effects.push(Effect::LockTarget(Some(hit.coord)));
            }
            self.hovered = hit.map(|hit| hit.coord);
        } else if self.drag.is_none() {
            let coord = hit.map(|hit| hit.coord);
            if coord != self.hovered {
                self.hovered = coord;
                self.publish(hit.map(|hit| hit.record.clone()), &mut effects);
            }
        }

        if let Some(anchor) = &mut self.drag {
            effects.push(Effect::Pan {
                dx: x - anchor.last_x,
                dy: y - anchor.last_y,
            });
            anchor.last_x = x;
            anchor.last_y = y;
        }
        effects
    }

    pub fn pointer_up(&mut self) {
        self.drag = None;
    }

    pub fn double_click(&mut self, hit: Option<&Hit>, over_ui: bool) -> Vec<Effect> {
        let Some(hit) = hit.filter(|_| !self.suppressed && !over_ui) else {
            return Vec::new();
        };

        let previous = match self.lock.take() {
            Some(lock) => Some(lock.record),
            None => self.shown.clone(),
        };
        self.lock = Some(Lock {
            coord: hit.coord,
            record: hit.record.clone(),
            previous,
        });

        let mut effects = Vec::new();
        self.shown = Some(hit.record.clone());
        effects.push(Effect::Focus(Some(hit.record.clone())));
        effects.push(Effect::LockChanged(true));
        effects.push(Effect::LockTarget(Some(hit.coord)));
        effects
    }

    pub fn wheel(&mut self, client_x: f64, client_y: f64, delta: f64, over_ui: bool) -> Vec<Effect> {
        if self.suppressed || over_ui {
            return Vec::new();
        }
        if self.lock.is_some() {
            vec![Effect::ScrollDetail(delta)]
        } else {
            vec![Effect::Zoom {
                client_x,
                client_y,
                delta,
            }]
        }
    }

    /// Drop the lock and hover, as when the whole grid is replaced.
    pub fn clear(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.lock.is_some() {
            self.release_into(&mut effects);
        } else if self.shown.is_some() {
            self.publish(None, &mut effects);
        }
        self.hovered = None;
        effects
    }

    fn release_into(&mut self, effects: &mut Vec<Effect>) {
        self.lock = None;
        self.publish(None, effects);
        effects.push(Effect::LockChanged(false));
        effects.push(Effect::LockTarget(None));
    }

    fn publish(&mut self, record: Option<CatalogRecord>, effects: &mut Vec<Effect>) {
        self.shown.clone_from(&record);
        effects.push(Effect::Focus(record));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::record;

    fn hit(col: i32, row: i32, id: u64) -> Hit {
        Hit {
            coord: GridCoordinate::new(col, row),
            record: record(id),
        }
    }

    fn locked_on(tile: &Hit) -> InteractionState {
        let mut state = InteractionState::new();
        state.double_click(Some(tile), false);
        state
    }

    #[test]
    fn hover_in_free_publishes_and_hides() {
        let mut state = InteractionState::new();
        let a = hit(0, 0, 1);

        let effects = state.pointer_move(10.0, 10.0, Some(&a), false);
        assert_eq!(effects, vec![Effect::Focus(Some(record(1)))]);
        // Moving within the same tile publishes nothing new.
        assert!(state.pointer_move(12.0, 11.0, Some(&a), false).is_empty());

        let effects = state.pointer_move(300.0, 10.0, None, false);
        assert_eq!(effects, vec![Effect::Focus(None)]);
        assert_eq!(state.hovered(), None);
    }

    #[test]
    fn drag_pans_by_pointer_delta() {
        let mut state = InteractionState::new();
        assert!(state.pointer_down(100.0, 100.0, None, false).is_empty());
        assert_eq!(state.phase(), Phase::Dragging);

        let effects = state.pointer_move(130.0, 90.0, None, false);
        assert_eq!(effects, vec![Effect::Pan { dx: 30.0, dy: -10.0 }]);
        let effects = state.pointer_move(135.0, 95.0, None, false);
        assert_eq!(effects, vec![Effect::Pan { dx: 5.0, dy: 5.0 }]);

        state.pointer_up();
        assert_eq!(state.phase(), Phase::Free);
        assert!(state.pointer_move(200.0, 200.0, None, false).is_empty());
    }

    #[test]
    fn dragging_starts_on_tiles_and_suspends_hover() {
        let mut state = InteractionState::new();
        let a = hit(0, 0, 1);
        let b = hit(1, 0, 2);
        state.pointer_down(10.0, 10.0, Some(&a), false);
        assert!(state.is_dragging());

        let effects = state.pointer_move(240.0, 10.0, Some(&b), false);
        assert_eq!(effects, vec![Effect::Pan { dx: 230.0, dy: 0.0 }]);
    }

    #[test]
    fn double_click_locks_and_exempts_the_tile() {
        let a = hit(2, 3, 7);
        let mut state = InteractionState::new();
        let effects = state.double_click(Some(&a), false);
        assert_eq!(
            effects,
            vec![
                Effect::Focus(Some(record(7))),
                Effect::LockChanged(true),
                Effect::LockTarget(Some(a.coord)),
            ]
        );
        assert_eq!(state.phase(), Phase::Locked(a.coord));
        assert_eq!(state.locked(), Some(a.coord));
    }

    #[test]
    fn double_click_on_empty_space_does_nothing() {
        let mut state = InteractionState::new();
        assert!(state.double_click(None, false).is_empty());
        assert_eq!(state.phase(), Phase::Free);
    }

    #[test]
    fn relocking_remembers_the_previous_record() {
        let a = hit(0, 0, 1);
        let b = hit(4, 0, 2);
        let mut state = locked_on(&a);
        state.double_click(Some(&b), false);

        let lock = state.lock().expect("locked");
        assert_eq!(lock.coord, b.coord);
        assert_eq!(lock.previous.as_ref().map(|r| r.id), Some(a.record.id));
    }

    #[test]
    fn pointer_down_off_the_locked_tile_releases_then_drags() {
        let a = hit(0, 0, 1);
        let mut state = locked_on(&a);

        let effects = state.pointer_down(500.0, 500.0, None, false);
        assert_eq!(
            effects,
            vec![
                Effect::Focus(None),
                Effect::LockChanged(false),
                Effect::LockTarget(None),
            ]
        );
        assert_eq!(state.phase(), Phase::Dragging);
        assert_eq!(state.locked(), None);
    }

    #[test]
    fn pointer_down_on_another_tile_releases_the_lock() {
        let a = hit(0, 0, 1);
        let b = hit(1, 0, 2);
        let mut state = locked_on(&a);

        let effects = state.pointer_down(230.0, 10.0, Some(&b), false);
        assert_eq!(
            effects,
            vec![
                Effect::Focus(None),
                Effect::LockChanged(false),
                Effect::LockTarget(None),
            ]
        );
        assert_eq!(state.locked(), None);
        assert_eq!(state.phase(), Phase::Dragging);

        state.pointer_up();
        assert_eq!(state.phase(), Phase::Free);
    }

    #[test]
    fn pointer_down_on_the_locked_tile_keeps_the_lock() {
        let a = hit(0, 0, 1);
        let mut state = locked_on(&a);

        assert!(state.pointer_down(10.0, 10.0, Some(&a), false).is_empty());
        assert_eq!(state.locked(), Some(a.coord));
        assert!(state.is_dragging());

        // Dragging a locked tile pans without touching the lock.
        let effects = state.pointer_move(20.0, 10.0, Some(&a), false);
        assert_eq!(effects, vec![Effect::Pan { dx: 10.0, dy: 0.0 }]);
        state.pointer_up();
        assert_eq!(state.phase(), Phase::Locked(a.coord));
    }

    #[test]
    fn pointer_down_over_ui_is_ignored() {
        let a = hit(0, 0, 1);
        let mut state = locked_on(&a);
        assert!(state.pointer_down(0.0, 0.0, None, true).is_empty());
        assert_eq!(state.locked(), Some(a.coord));
        assert!(!state.is_dragging());
    }

    #[test]
    fn hovering_another_tile_while_locked_retargets() {
        let a = hit(0, 0, 1);
        let b = hit(1, 0, 2);
        let mut state = locked_on(&a);

        // Empty space and the locked tile itself leave the lock alone.
        assert!(state.pointer_move(215.0, 10.0, None, false).is_empty());
        assert!(state.pointer_move(10.0, 10.0, Some(&a), false).is_empty());

        let effects = state.pointer_move(230.0, 10.0, Some(&b), false);
        assert_eq!(
            effects,
            vec![
                Effect::Focus(Some(record(2))),
                Effect::LockTarget(Some(b.coord)),
            ]
        );
        assert_eq!(state.phase(), Phase::Locked(b.coord));
    }

    #[test]
    fn hovering_through_ui_while_locked_keeps_the_lock() {
        let a = hit(0, 0, 1);
        let b = hit(1, 0, 2);
        let mut state = locked_on(&a);
        assert!(state.pointer_move(230.0, 10.0, Some(&b), true).is_empty());
        assert_eq!(state.locked(), Some(a.coord));
    }

    #[test]
    fn wheel_zooms_when_free_and_scrolls_detail_when_locked() {
        let mut state = InteractionState::new();
        assert_eq!(
            state.wheel(50.0, 60.0, 120.0, false),
            vec![Effect::Zoom {
                client_x: 50.0,
                client_y: 60.0,
                delta: 120.0
            }]
        );
        assert!(state.wheel(50.0, 60.0, 120.0, true).is_empty());

        let mut state = locked_on(&hit(0, 0, 1));
        assert_eq!(
            state.wheel(50.0, 60.0, -40.0, false),
            vec![Effect::ScrollDetail(-40.0)]
        );
    }

    #[test]
    fn suppressed_input_is_ignored_and_ends_drags() {
        let mut state = InteractionState::new();
        state.pointer_down(0.0, 0.0, None, false);
        state.set_suppressed(true);
        assert!(!state.is_dragging());

        let a = hit(0, 0, 1);
        assert!(state.pointer_down(0.0, 0.0, None, false).is_empty());
        assert!(state.pointer_move(5.0, 5.0, Some(&a), false).is_empty());
        assert!(state.double_click(Some(&a), false).is_empty());
        assert!(state.wheel(0.0, 0.0, 10.0, false).is_empty());
        assert_eq!(state.phase(), Phase::Free);

        state.set_suppressed(false);
        assert_eq!(state.double_click(Some(&a), false).len(), 3);
    }

    #[test]
    fn clear_releases_lock_and_hover() {
        let mut state = locked_on(&hit(0, 0, 1));
        let effects = state.clear();
        assert_eq!(
            effects,
            vec![
                Effect::Focus(None),
                Effect::LockChanged(false),
                Effect::LockTarget(None),
            ]
        );
        assert_eq!(state.phase(), Phase::Free);
        assert!(state.clear().is_empty());
    }
}
