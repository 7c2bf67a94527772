//! Day-boundary roll-over of unfinished tasks.
//!
//! A task that was created on an earlier local day and is still not terminal
//! is flagged `is_carried_forward`, so the day view can show it apart from
//! tasks planned today. Timers are not touched.

use chrono::{FixedOffset, NaiveDate};

use super::Task;
use crate::clock::local_date;

/// Whether `task` should roll over into `today`.
pub fn should_carry_forward(task: &Task, today: NaiveDate, offset: FixedOffset) -> bool {
    !task.is_terminal() && local_date(task.created_at, offset) < today
}

/// Flag every task that rolls over into `today`. Returns the ids that were
/// newly flagged; tasks already flagged are left alone.
pub fn carry_forward(tasks: &mut [Task], today: NaiveDate, offset: FixedOffset) -> Vec<String> {
    let mut carried = Vec::new();
    for task in tasks.iter_mut() {
        if !task.is_carried_forward && should_carry_forward(task, today, offset) {
            task.is_carried_forward = true;
            carried.push(task.id.clone());
        }
    }
    carried
}
