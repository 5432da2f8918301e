//! Deferred control-surface calls.
//!
//! A UI or scripted driver submits [`Command`]s between ticks; the engine
//! applies them, in submission order, at the start of its next tick. This
//! keeps every mutation on the tick boundary so a run can be replayed.

use std::collections::VecDeque;

use crate::fixed::SimMillis;
use crate::id::{BagId, LaneId, PassengerId};

/// One control-surface call on the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SpawnPassenger,
    AssignPassengerToLane { passenger: PassengerId, lane: LaneId },
    Start,
    Pause,
    Reset,
    SetSpawnRate { per_minute: u32 },
    AcknowledgeBagAlerts { bag: BagId },
}

/// A command together with the simulated time it was taken off the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedCommand {
    pub time: SimMillis,
    pub command: Command,
}

#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: Vec<Command>,
    executed: VecDeque<ExecutedCommand>,
    /// 0 disables the log.
    log_limit: usize,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also remember the last `log_limit` drained commands.
    pub fn with_max_history(log_limit: usize) -> Self {
        Self {
            log_limit,
            ..Self::default()
        }
    }

    pub fn push(&mut self, command: Command) {
        self.pending.push(command);
    }

    pub fn push_batch(&mut self, commands: impl IntoIterator<Item = Command>) {
        self.pending.extend(commands);
    }

    /// Take every pending command, oldest first.
    pub fn drain(&mut self, time: SimMillis) -> Vec<Command> {
        let taken = std::mem::take(&mut self.pending);
        if self.log_limit > 0 {
            for command in &taken {
                if self.executed.len() == self.log_limit {
                    self.executed.pop_front();
                }
                self.executed.push_back(ExecutedCommand {
                    time,
                    command: command.clone(),
                });
            }
        }
        taken
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Logged commands, oldest first.
    pub fn history(&self) -> impl ExactSizeIterator<Item = &ExecutedCommand> {
        self.executed.iter()
    }

    pub fn clear_history(&mut self) {
        self.executed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assign(n: u64, lane: u32) -> Command {
        Command::AssignPassengerToLane {
            passenger: PassengerId::generate(0, n),
            lane: LaneId(lane),
        }
    }

    fn logged(queue: &CommandQueue) -> Vec<(SimMillis, Command)> {
        queue
            .history()
            .map(|e| (e.time, e.command.clone()))
            .collect()
    }

    #[test]
    fn drain_keeps_submission_order() {
        let mut queue = CommandQueue::new();
        queue.push(Command::Start);
        queue.push_batch([assign(1, 0), Command::SetSpawnRate { per_minute: 20 }]);
        assert_eq!(queue.pending_count(), 3);

        assert_eq!(
            queue.drain(100),
            vec![Command::Start, assign(1, 0), Command::SetSpawnRate { per_minute: 20 }]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn log_disabled_by_default() {
        let mut queue = CommandQueue::new();
        queue.push(Command::Pause);
        queue.drain(0);
        assert_eq!(queue.history().len(), 0);
    }

    #[test]
    fn log_keeps_newest_entries() {
        let mut queue = CommandQueue::with_max_history(2);
        queue.push(Command::Start);
        queue.drain(100);
        queue.push(Command::Pause);
        queue.push(Command::Reset);
        queue.drain(200);

        assert_eq!(
            logged(&queue),
            vec![(200, Command::Pause), (200, Command::Reset)]
        );
        queue.clear_history();
        assert_eq!(queue.history().len(), 0);
    }

    #[test]
    fn draining_nothing_logs_nothing() {
        let mut queue = CommandQueue::with_max_history(4);
        assert!(queue.drain(0).is_empty());
        assert_eq!(queue.history().len(), 0);
    }
}
