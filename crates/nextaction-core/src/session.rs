//! Caller-owned view state: current perspective, cursor and batch selection.
//!
//! Nothing in the engine reads this; the CLI persists it between invocations
//! in the database's key/value table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::Result;
use crate::perspective::Perspective;
use crate::storage::TaskDb;
use crate::task::{Task, TaskId};

const VIEW_STATE_KEY: &str = "view_state";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    /// Last perspective shown; `None` until something is listed.
    #[serde(default)]
    pub perspective: Option<Perspective>,
    /// Row index into the current list.
    #[serde(default)]
    pub cursor: usize,
    #[serde(default)]
    pub selection: BTreeSet<TaskId>,
}

impl ViewState {
    /// Load the saved state; unreadable state is discarded.
    pub fn load(db: &TaskDb) -> Result<Self> {
        let Some(raw) = db.kv_get(VIEW_STATE_KEY)? else {
            return Ok(Self::default());
        };
        match serde_json::from_str(&raw) {
            Ok(state) => Ok(state),
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable view state");
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self, db: &TaskDb) -> Result<()> {
        db.kv_set(VIEW_STATE_KEY, &serde_json::to_string(self)?)
    }

    /// Switch perspective; the cursor goes back to the top on change.
    pub fn set_perspective(&mut self, perspective: Perspective) {
        if self.perspective != Some(perspective) {
            self.perspective = Some(perspective);
            self.cursor = 0;
        }
    }

    pub fn clamp_cursor(&mut self, len: usize) {
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }

    pub fn task_at_cursor<'a>(&self, visible: &'a [Task]) -> Option<&'a Task> {
        visible.get(self.cursor)
    }

    pub fn select(&mut self, id: TaskId) -> bool {
        self.selection.insert(id)
    }

    pub fn deselect(&mut self, id: TaskId) -> bool {
        self.selection.remove(&id)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn selected(&self) -> Vec<TaskId> {
        self.selection.iter().copied().collect()
    }

    /// Drop selected ids that are no longer in `tasks`.
    pub fn prune(&mut self, tasks: &[Task]) {
        self.selection
            .retain(|id| tasks.iter().any(|t| t.id == *id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TaskStore;
    use crate::task::NewTask;

    #[test]
    fn state_persists_in_kv_table() {
        let db = TaskDb::open_memory().unwrap();
        assert_eq!(ViewState::load(&db).unwrap(), ViewState::default());

        let mut state = ViewState::default();
        state.set_perspective(Perspective::Context(2));
        state.cursor = 3;
        state.select(5);
        state.select(1);
        state.save(&db).unwrap();

        let loaded = ViewState::load(&db).unwrap();
        assert_eq!(loaded.perspective, Some(Perspective::Context(2)));
        assert_eq!(loaded.cursor, 3);
        assert_eq!(loaded.selected(), vec![1, 5]);
    }

    #[test]
    fn corrupt_state_falls_back_to_default() {
        let db = TaskDb::open_memory().unwrap();
        db.kv_set(VIEW_STATE_KEY, "{not json").unwrap();
        assert_eq!(ViewState::load(&db).unwrap(), ViewState::default());
    }

    #[test]
    fn changing_perspective_resets_cursor() {
        let mut state = ViewState {
            perspective: Some(Perspective::Today),
            cursor: 4,
            ..Default::default()
        };
        state.set_perspective(Perspective::Today);
        assert_eq!(state.cursor, 4);
        state.set_perspective(Perspective::Inbox);
        assert_eq!(state.cursor, 0);

        state.cursor = 10;
        state.clamp_cursor(3);
        assert_eq!(state.cursor, 2);
        state.clamp_cursor(0);
        assert_eq!(state.cursor, 0);
    }

    #[test]
    fn prune_drops_deleted_tasks() {
        let db = TaskDb::open_memory().unwrap();
        let keep = db.create_task(&NewTask::new("keep")).unwrap();
        let mut state = ViewState::default();
        state.select(keep);
        state.select(999);
        state.prune(&db.load_all_tasks().unwrap());
        assert_eq!(state.selected(), vec![keep]);
        assert!(state.deselect(keep));
        assert!(!state.deselect(keep));
    }
}
