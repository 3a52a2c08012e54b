//! Task Scheduler Bookkeeping
//!
//! Holds queued, active and recently finished task instances. The rules
//! that move characters in and out of tasks live in `systems::tasks`.

use bevy_ecs::prelude::*;
use office_events::{TaskSnapshot, TaskStatus, ZoneType};
use std::collections::VecDeque;

use crate::config::TaskTypeConfig;

/// A task waiting for participants
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedTask {
    pub task_id: String,
    pub type_id: String,
    /// Explicit participants; `None` lets the scheduler pick
    pub participants: Option<Vec<String>>,
    pub queued_tick: u64,
}

/// An assigned unit of work
#[derive(Debug, Clone, PartialEq)]
pub struct TaskInstance {
    pub task_id: String,
    pub type_id: String,
    pub name: String,
    pub icon: String,
    pub zone_type: Option<ZoneType>,
    /// Concrete zone the participants were sent to
    pub target_zone: Option<String>,
    pub participants: Vec<String>,
    /// Ticks in which every participant was working
    pub worked_ticks: u32,
    pub duration_ticks: u32,
    pub completion_mood_bonus: f32,
    pub status: TaskStatus,
    pub assigned_tick: u64,
}

impl TaskInstance {
    pub fn new(
        task_id: String,
        def: &TaskTypeConfig,
        participants: Vec<String>,
        target_zone: Option<String>,
        tick: u64,
    ) -> Self {
        Self {
            task_id,
            type_id: def.id.clone(),
            name: def.name.clone(),
            icon: def.icon.clone(),
            zone_type: def.required_zone,
            target_zone,
            participants,
            worked_ticks: 0,
            duration_ticks: def.duration_ticks.max(1),
            completion_mood_bonus: def.completion_mood_bonus,
            status: TaskStatus::InProgress,
            assigned_tick: tick,
        }
    }

    /// Fraction of the work done, never above 1.0
    pub fn progress(&self) -> f32 {
        (self.worked_ticks as f32 / self.duration_ticks as f32).min(1.0)
    }

    pub fn is_done(&self) -> bool {
        self.worked_ticks >= self.duration_ticks
    }

    pub fn has_participant(&self, character_id: &str) -> bool {
        self.participants.iter().any(|p| p == character_id)
    }

    pub fn to_snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            task_id: self.task_id.clone(),
            type_id: self.type_id.clone(),
            name: self.name.clone(),
            icon: self.icon.clone(),
            participants: self.participants.clone(),
            progress: self.progress(),
            status: self.status,
            assigned_tick: self.assigned_tick,
            zone_type: self.zone_type,
        }
    }
}

/// Scheduler resource
#[derive(Resource, Debug)]
pub struct TaskScheduler {
    queue: VecDeque<QueuedTask>,
    active: Vec<TaskInstance>,
    archive: VecDeque<TaskInstance>,
    archive_size: usize,
    next_seq: u64,
}

impl TaskScheduler {
    pub fn new(archive_size: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            active: Vec::new(),
            archive: VecDeque::new(),
            archive_size,
            next_seq: 1,
        }
    }

    /// Generate the next task ID
    pub fn next_id(&mut self) -> String {
        let id = format!("task_{:04}", self.next_seq);
        self.next_seq += 1;
        id
    }

    pub fn enqueue(&mut self, type_id: &str, participants: Option<Vec<String>>, tick: u64) -> String {
        let task_id = self.next_id();
        self.queue.push_back(QueuedTask {
            task_id: task_id.clone(),
            type_id: type_id.to_string(),
            participants,
            queued_tick: tick,
        });
        task_id
    }

    pub fn queued(&self) -> impl Iterator<Item = &QueuedTask> {
        self.queue.iter()
    }

    pub fn take_queue(&mut self) -> VecDeque<QueuedTask> {
        std::mem::take(&mut self.queue)
    }

    /// Puts unassigned entries back in front of anything queued meanwhile
    pub fn restore_queue(&mut self, mut remaining: VecDeque<QueuedTask>) {
        remaining.append(&mut self.queue);
        self.queue = remaining;
    }

    pub fn clear_queue(&mut self) {
        self.queue.clear();
    }

    pub fn activate(&mut self, task: TaskInstance) {
        self.active.push(task);
    }

    pub fn active(&self) -> &[TaskInstance] {
        &self.active
    }

    pub fn active_mut(&mut self) -> &mut Vec<TaskInstance> {
        &mut self.active
    }

    pub fn get(&self, task_id: &str) -> Option<&TaskInstance> {
        self.active.iter().find(|t| t.task_id == task_id)
    }

    /// Removes an active task and archives it with its final status
    pub fn finish(&mut self, task_id: &str, status: TaskStatus) -> Option<TaskInstance> {
        let index = self.active.iter().position(|t| t.task_id == task_id)?;
        let mut task = self.active.remove(index);
        task.status = status;
        if status == TaskStatus::Interrupted {
            // Partial progress is discarded.
            task.worked_ticks = 0;
        }
        self.archive_task(task.clone());
        Some(task)
    }

    /// Archives a queued task that will never be assigned
    pub fn cancel(&mut self, queued: QueuedTask, catalog: &[TaskTypeConfig]) -> TaskInstance {
        let def = catalog.iter().find(|d| d.id == queued.type_id);
        let task = TaskInstance {
            task_id: queued.task_id,
            name: def.map(|d| d.name.clone()).unwrap_or_else(|| queued.type_id.clone()),
            icon: def.map(|d| d.icon.clone()).unwrap_or_default(),
            zone_type: def.and_then(|d| d.required_zone),
            target_zone: None,
            participants: queued.participants.unwrap_or_default(),
            worked_ticks: 0,
            duration_ticks: def.map(|d| d.duration_ticks.max(1)).unwrap_or(1),
            completion_mood_bonus: 0.0,
            status: TaskStatus::Cancelled,
            assigned_tick: queued.queued_tick,
            type_id: queued.type_id,
        };
        self.archive_task(task.clone());
        task
    }

    fn archive_task(&mut self, task: TaskInstance) {
        if self.archive_size > 0 {
            if self.archive.len() == self.archive_size {
                self.archive.pop_front();
            }
            self.archive.push_back(task);
        }
    }

    pub fn archive(&self) -> impl Iterator<Item = &TaskInstance> {
        self.archive.iter()
    }

    /// Queued, active and archived tasks in that order
    pub fn snapshots(&self, catalog: &[TaskTypeConfig]) -> Vec<TaskSnapshot> {
        let queued = self.queue.iter().map(|q| {
            let def = catalog.iter().find(|d| d.id == q.type_id);
            TaskSnapshot {
                task_id: q.task_id.clone(),
                type_id: q.type_id.clone(),
                name: def.map(|d| d.name.clone()).unwrap_or_else(|| q.type_id.clone()),
                icon: def.map(|d| d.icon.clone()).unwrap_or_default(),
                participants: q.participants.clone().unwrap_or_default(),
                progress: 0.0,
                status: TaskStatus::Queued,
                assigned_tick: q.queued_tick,
                zone_type: def.and_then(|d| d.required_zone),
            }
        });
        queued
            .chain(self.active.iter().map(TaskInstance::to_snapshot))
            .chain(self.archive.iter().map(TaskInstance::to_snapshot))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_task_types;

    fn report() -> TaskTypeConfig {
        default_task_types()
            .into_iter()
            .find(|t| t.id == "report")
            .unwrap()
    }

    #[test]
    fn test_task_ids_are_sequential() {
        let mut scheduler = TaskScheduler::new(4);
        assert_eq!(scheduler.next_id(), "task_0001");
        assert_eq!(scheduler.enqueue("report", None, 0), "task_0002");
    }

    #[test]
    fn test_progress_is_capped() {
        let mut task = TaskInstance::new("task_0001".into(), &report(), vec!["c1".into()], None, 0);
        task.worked_ticks = task.duration_ticks + 5;
        assert_eq!(task.progress(), 1.0);
        assert!(task.is_done());
    }

    #[test]
    fn test_interrupt_discards_progress_and_archives() {
        let mut scheduler = TaskScheduler::new(1);
        let mut task = TaskInstance::new("task_0001".into(), &report(), vec!["c1".into()], None, 0);
        task.worked_ticks = 7;
        scheduler.activate(task);
        let finished = scheduler.finish("task_0001", TaskStatus::Interrupted).unwrap();
        assert_eq!(finished.progress(), 0.0);
        assert!(scheduler.active().is_empty());
        assert_eq!(scheduler.archive().count(), 1);

        scheduler.activate(TaskInstance::new("task_0002".into(), &report(), vec![], None, 1));
        scheduler.finish("task_0002", TaskStatus::Completed);
        let archived: Vec<_> = scheduler.archive().map(|t| t.task_id.as_str()).collect();
        assert_eq!(archived, vec!["task_0002"]);
        assert!(scheduler.finish("missing", TaskStatus::Completed).is_none());
    }

    #[test]
    fn test_cancel_archives_queued_task() {
        let mut scheduler = TaskScheduler::new(4);
        let id = scheduler.enqueue("report", Some(vec!["c7".into()]), 3);
        let queued = scheduler.take_queue().pop_front().unwrap();
        let cancelled = scheduler.cancel(queued, &[report()]);
        assert_eq!(cancelled.task_id, id);
        assert_eq!(cancelled.status, TaskStatus::Cancelled);
        assert_eq!(cancelled.name, report().name);
        assert_eq!(scheduler.queued().count(), 0);
        let archived: Vec<_> = scheduler.archive().map(|t| t.status).collect();
        assert_eq!(archived, vec![TaskStatus::Cancelled]);
    }

    #[test]
    fn test_restore_queue_keeps_fifo_order() {
        let mut scheduler = TaskScheduler::new(4);
        scheduler.enqueue("report", None, 0);
        let taken = scheduler.take_queue();
        scheduler.enqueue("standup", None, 1);
        scheduler.restore_queue(taken);
        let order: Vec<_> = scheduler.queued().map(|q| q.type_id.as_str()).collect();
        assert_eq!(order, vec!["report", "standup"]);
    }
}
