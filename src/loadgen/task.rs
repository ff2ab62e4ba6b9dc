//! Weighted request mix.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::loadgen::LoadError;

/// One kind of request a simulated user may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    pub path: String,
    /// Relative frequency. Zero disables the task.
    pub weight: u32,
}

impl Task {
    pub fn new(name: impl Into<String>, path: impl Into<String>, weight: u32) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            weight,
        }
    }
}

/// 3:2:1 across the demo routes.
pub fn default_tasks() -> Vec<Task> {
    vec![
        Task::new("fast", "/fast", 3),
        Task::new("slow", "/slow", 2),
        Task::new("error", "/error", 1),
    ]
}

/// Picks tasks proportionally to their weight.
#[derive(Debug, Clone)]
pub struct TaskPicker {
    tasks: Vec<Task>,
    index: WeightedIndex<u32>,
}

impl TaskPicker {
    pub fn new(tasks: Vec<Task>) -> Result<Self, LoadError> {
        if tasks.is_empty() {
            return Err(LoadError::NoTasks);
        }
        let index = WeightedIndex::new(tasks.iter().map(|t| t.weight))?;
        Ok(Self { tasks, index })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Index into `tasks()` of the next task to run.
    pub fn pick_index<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        self.index.sample(rng)
    }

    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> &Task {
        &self.tasks[self.pick_index(rng)]
    }
}

/// One-off weighted pick. Users in a run share a `TaskPicker` instead.
pub fn pick_task<'a, R: Rng + ?Sized>(tasks: &'a [Task], rng: &mut R) -> Result<&'a Task, LoadError> {
    if tasks.is_empty() {
        return Err(LoadError::NoTasks);
    }
    let index = WeightedIndex::new(tasks.iter().map(|t| t.weight))?;
    Ok(&tasks[index.sample(rng)])
}
