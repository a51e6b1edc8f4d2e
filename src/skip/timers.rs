use tokio::time::Instant;

use crate::{models::IntervalKey, session::SessionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Work a timer performs when it comes due.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimerTask {
    /// Seek-end debounce elapsed; drop the manual-seek flag.
    ClearManualSeek,
    /// Minimum watch for an override elapsed; decide whether to keep it.
    OverrideRecheck(IntervalKey),
    /// Look for the media element again.
    MediaRetry { attempt: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledTimer {
    pub id: TimerId,
    pub session: SessionId,
    pub due: Instant,
    pub task: TimerTask,
}

/// Pending timers for every session, ordered by deadline.
///
/// Timers are plain data: the manager loop sleeps until [`TimerQueue::next_deadline`]
/// and then drains [`TimerQueue::take_due`]. Cancellation is removal.
#[derive(Debug, Default)]
pub struct TimerQueue {
    next_id: u64,
    pending: Vec<ScheduledTimer>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, session: SessionId, due: Instant, task: TimerTask) -> TimerId {
        self.next_id = self.next_id.wrapping_add(1);
        let timer = ScheduledTimer {
            id: TimerId(self.next_id),
            session,
            due,
            task,
        };

        let index = self
            .pending
            .partition_point(|existing| (existing.due, existing.id) <= (due, timer.id));
        self.pending.insert(index, timer);
        timer.id
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|timer| timer.id != id);
        before != self.pending.len()
    }

    /// Drop every timer owned by `session`. Returns how many were cancelled.
    pub fn cancel_session(&mut self, session: SessionId) -> usize {
        let before = self.pending.len();
        self.pending.retain(|timer| timer.session != session);
        before - self.pending.len()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.first().map(|timer| timer.due)
    }

    /// Remove and return every timer due at or before `now`, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<ScheduledTimer> {
        let split = self.pending.partition_point(|timer| timer.due <= now);
        self.pending.drain(..split).collect()
    }

    pub fn pending_for(&self, session: SessionId) -> usize {
        self.pending
            .iter()
            .filter(|timer| timer.session == session)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Scheduling view bound to one session.
    pub fn scope(&mut self, session: SessionId) -> SessionTimers<'_> {
        SessionTimers {
            queue: self,
            session,
        }
    }
}

pub struct SessionTimers<'a> {
    queue: &'a mut TimerQueue,
    session: SessionId,
}

impl SessionTimers<'_> {
    pub fn schedule(&mut self, due: Instant, task: TimerTask) -> TimerId {
        self.queue.schedule(self.session, due, task)
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.queue.cancel(id)
    }

    pub fn cancel_all(&mut self) -> usize {
        self.queue.cancel_session(self.session)
    }

    pub fn session(&self) -> SessionId {
        self.session
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn due_timers_come_out_in_deadline_order() {
        let mut queue = TimerQueue::new();
        let session = SessionId::new();
        let base = Instant::now();

        queue.schedule(session, base + Duration::from_secs(3), TimerTask::ClearManualSeek);
        queue.schedule(session, base + Duration::from_secs(1), TimerTask::MediaRetry { attempt: 1 });
        queue.schedule(session, base + Duration::from_secs(2), TimerTask::MediaRetry { attempt: 2 });

        assert_eq!(queue.next_deadline(), Some(base + Duration::from_secs(1)));

        let due = queue.take_due(base + Duration::from_secs(2));
        let tasks: Vec<_> = due.iter().map(|timer| timer.task).collect();
        assert_eq!(
            tasks,
            vec![
                TimerTask::MediaRetry { attempt: 1 },
                TimerTask::MediaRetry { attempt: 2 }
            ]
        );
        assert_eq!(queue.next_deadline(), Some(base + Duration::from_secs(3)));
    }

    #[test]
    fn equal_deadlines_keep_scheduling_order() {
        let mut queue = TimerQueue::new();
        let session = SessionId::new();
        let due = Instant::now();

        let first = queue.schedule(session, due, TimerTask::ClearManualSeek);
        let second = queue.schedule(session, due, TimerTask::MediaRetry { attempt: 1 });

        let ids: Vec<_> = queue.take_due(due).into_iter().map(|timer| timer.id).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[test]
    fn cancelling_a_session_leaves_other_sessions_alone() {
        let mut queue = TimerQueue::new();
        let old = SessionId::new();
        let new = SessionId::new();
        let due = Instant::now() + Duration::from_secs(1);

        queue.schedule(old, due, TimerTask::ClearManualSeek);
        queue.schedule(old, due, TimerTask::MediaRetry { attempt: 1 });
        queue.schedule(new, due, TimerTask::ClearManualSeek);

        assert_eq!(queue.cancel_session(old), 2);
        assert_eq!(queue.pending_for(old), 0);
        assert_eq!(queue.pending_for(new), 1);
    }

    #[test]
    fn cancel_by_id() {
        let mut queue = TimerQueue::new();
        let session = SessionId::new();
        let id = queue
            .scope(session)
            .schedule(Instant::now(), TimerTask::ClearManualSeek);

        assert!(queue.cancel(id));
        assert!(!queue.cancel(id));
        assert!(queue.is_empty());
    }
}
