//! Queue store: ticket issuance and call/finish/reset transitions.
//!
//! All operations are synchronous read-modify-write against storage, scoped
//! to one company id. An empty company id makes every operation a silent
//! no-op. Concurrent writers are not coordinated; the last write wins.

use std::sync::Arc;

use crate::events::{EventBus, RecordKind};
use crate::models::QueueState;
use crate::storage::Storage;

type BoxError = Box<dyn std::error::Error>;

pub const TICKET_PREFIX: &str = "A";
pub const TICKET_PAD_WIDTH: usize = 3;
pub const HISTORY_CAP: usize = 50;

/// `A-007`; numbers past 999 simply widen.
fn format_ticket(number: u32) -> String {
    format!("{}-{:0width$}", TICKET_PREFIX, number, width = TICKET_PAD_WIDTH)
}

fn push_history(history: &mut Vec<String>, ticket: String) {
    history.insert(0, ticket);
    history.truncate(HISTORY_CAP);
}

#[derive(Clone)]
pub struct QueueStore {
    storage: Arc<Storage>,
    events: EventBus,
}

impl QueueStore {
    pub fn new(storage: Arc<Storage>, events: EventBus) -> Self {
        Self { storage, events }
    }

    /// Read-only view of a company's queue state.
    pub fn state(&self, company_id: &str) -> Result<QueueState, BoxError> {
        if company_id.is_empty() {
            return Ok(QueueState::default());
        }
        self.storage.queue_state(company_id)
    }

    /// Issue the next ticket: append to the queue tail, bump the counter,
    /// persist. Returns `None` when no company id is supplied.
    pub fn generate_ticket(&self, company_id: &str) -> Result<Option<String>, BoxError> {
        if company_id.is_empty() {
            return Ok(None);
        }
        let mut state = self.storage.queue_state(company_id)?;
        let ticket = format_ticket(state.next_ticket_number);
        state.queue.push(ticket.clone());
        state.next_ticket_number += 1;
        self.persist(company_id, &state)?;
        Ok(Some(ticket))
    }

    /// Pop the queue head into the serving slot; the ticket that was being
    /// served, if any, moves to the head of history. No-op on an empty queue.
    pub fn call_next_ticket(&self, company_id: &str) -> Result<(), BoxError> {
        if company_id.is_empty() {
            return Ok(());
        }
        let mut state = self.storage.queue_state(company_id)?;
        if state.queue.is_empty() {
            return Ok(());
        }
        let next = state.queue.remove(0);
        if let Some(previous) = state.current_ticket.replace(next) {
            push_history(&mut state.history, previous);
        }
        self.persist(company_id, &state)
    }

    /// Move the served ticket to history and clear the serving slot.
    /// No-op when nothing is being served.
    pub fn finish_current_ticket(&self, company_id: &str) -> Result<(), BoxError> {
        if company_id.is_empty() {
            return Ok(());
        }
        let mut state = self.storage.queue_state(company_id)?;
        let Some(current) = state.current_ticket.take() else {
            return Ok(());
        };
        push_history(&mut state.history, current);
        self.persist(company_id, &state)
    }

    /// Replace the whole record with the zero value: empty queue, no current
    /// ticket, empty history, counter back to 1.
    pub fn reset_queue(&self, company_id: &str) -> Result<(), BoxError> {
        if company_id.is_empty() {
            return Ok(());
        }
        self.persist(company_id, &QueueState::default())
    }

    fn persist(&self, company_id: &str, state: &QueueState) -> Result<(), BoxError> {
        self.storage.put_queue_state(company_id, state)?;
        self.events.publish(company_id, RecordKind::Queue);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::tests::temp_db;
    use std::fs;

    fn queue_store(name: &str) -> (QueueStore, std::path::PathBuf) {
        let (storage, dir) = temp_db(name);
        (QueueStore::new(Arc::new(storage), EventBus::new()), dir)
    }

    #[test]
    fn tickets_are_sequential_and_zero_padded() {
        let (store, dir) = queue_store("sequential");

        assert_eq!(store.generate_ticket("acme").unwrap().as_deref(), Some("A-001"));
        assert_eq!(store.generate_ticket("acme").unwrap().as_deref(), Some("A-002"));
        assert_eq!(store.generate_ticket("acme").unwrap().as_deref(), Some("A-003"));

        let state = store.state("acme").unwrap();
        assert_eq!(state.queue, vec!["A-001", "A-002", "A-003"]);
        assert_eq!(state.next_ticket_number, 4);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn counter_survives_emptying_the_queue() {
        let (store, dir) = queue_store("counter");

        store.generate_ticket("acme").unwrap();
        store.call_next_ticket("acme").unwrap();
        store.finish_current_ticket("acme").unwrap();

        // Queue is empty again but the counter keeps going.
        assert_eq!(store.generate_ticket("acme").unwrap().as_deref(), Some("A-002"));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn numbers_past_999_widen() {
        assert_eq!(format_ticket(7), "A-007");
        assert_eq!(format_ticket(999), "A-999");
        assert_eq!(format_ticket(1000), "A-1000");
    }

    #[test]
    fn call_next_on_empty_queue_is_a_no_op() {
        let (store, dir) = queue_store("call_empty");

        let before = store.state("acme").unwrap();
        store.call_next_ticket("acme").unwrap();
        assert_eq!(store.state("acme").unwrap(), before);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn finish_twice_is_idempotent() {
        let (store, dir) = queue_store("finish_twice");

        store.generate_ticket("acme").unwrap();
        store.call_next_ticket("acme").unwrap();
        store.finish_current_ticket("acme").unwrap();
        let after_first = store.state("acme").unwrap();

        store.finish_current_ticket("acme").unwrap();
        assert_eq!(store.state("acme").unwrap(), after_first);
        assert_eq!(after_first.history, vec!["A-001"]);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn call_finish_walkthrough() {
        let (store, dir) = queue_store("walkthrough");

        store.generate_ticket("acme").unwrap();
        store.generate_ticket("acme").unwrap();
        store.generate_ticket("acme").unwrap();

        store.call_next_ticket("acme").unwrap();
        let state = store.state("acme").unwrap();
        assert_eq!(state.current_ticket.as_deref(), Some("A-001"));
        assert_eq!(state.queue, vec!["A-002", "A-003"]);

        store.finish_current_ticket("acme").unwrap();
        let state = store.state("acme").unwrap();
        assert_eq!(state.current_ticket, None);
        assert_eq!(state.history, vec!["A-001"]);

        store.call_next_ticket("acme").unwrap();
        let state = store.state("acme").unwrap();
        assert_eq!(state.current_ticket.as_deref(), Some("A-002"));
        assert_eq!(state.queue, vec!["A-003"]);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn calling_over_a_served_ticket_moves_it_to_history() {
        let (store, dir) = queue_store("call_over");

        store.generate_ticket("acme").unwrap();
        store.generate_ticket("acme").unwrap();
        store.call_next_ticket("acme").unwrap();
        store.call_next_ticket("acme").unwrap();

        let state = store.state("acme").unwrap();
        assert_eq!(state.current_ticket.as_deref(), Some("A-002"));
        assert_eq!(state.history, vec!["A-001"]);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn history_is_capped_at_fifty() {
        let (store, dir) = queue_store("history_cap");

        for _ in 0..60 {
            store.generate_ticket("acme").unwrap();
            store.call_next_ticket("acme").unwrap();
            store.finish_current_ticket("acme").unwrap();
        }

        let state = store.state("acme").unwrap();
        assert_eq!(state.history.len(), HISTORY_CAP);
        // Most recent first; the oldest ten fell off.
        assert_eq!(state.history[0], "A-060");
        assert_eq!(state.history[HISTORY_CAP - 1], "A-011");

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn a_ticket_lives_in_exactly_one_place() {
        let (store, dir) = queue_store("one_place");

        for _ in 0..5 {
            store.generate_ticket("acme").unwrap();
        }
        store.call_next_ticket("acme").unwrap();
        store.finish_current_ticket("acme").unwrap();
        store.call_next_ticket("acme").unwrap();

        let state = store.state("acme").unwrap();
        let mut seen: Vec<&str> = state.queue.iter().map(String::as_str).collect();
        seen.extend(state.current_ticket.as_deref());
        seen.extend(state.history.iter().map(String::as_str));
        let total = seen.len();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), total);
        assert_eq!(total, 5);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn reset_returns_the_zero_value() {
        let (store, dir) = queue_store("reset");

        for _ in 0..6 {
            store.generate_ticket("acme").unwrap();
        }
        for _ in 0..4 {
            store.call_next_ticket("acme").unwrap();
        }
        store.reset_queue("acme").unwrap();

        assert_eq!(store.state("acme").unwrap(), QueueState::default());
        // Counter restarts as well.
        assert_eq!(store.generate_ticket("acme").unwrap().as_deref(), Some("A-001"));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn companies_are_isolated() {
        let (store, dir) = queue_store("isolated");

        store.generate_ticket("acme").unwrap();
        store.generate_ticket("other").unwrap();
        store.call_next_ticket("acme").unwrap();

        assert_eq!(store.state("acme").unwrap().current_ticket.as_deref(), Some("A-001"));
        assert_eq!(store.state("other").unwrap().current_ticket, None);
        assert_eq!(store.state("other").unwrap().queue, vec!["A-001"]);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn empty_company_id_is_a_silent_no_op() {
        let (store, dir) = queue_store("no_company");

        assert_eq!(store.generate_ticket("").unwrap(), None);
        store.call_next_ticket("").unwrap();
        store.finish_current_ticket("").unwrap();
        store.reset_queue("").unwrap();
        assert_eq!(store.state("").unwrap(), QueueState::default());

        let _ = fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn writes_publish_change_notices() {
        let (storage, dir) = temp_db("queue_events");
        let bus = EventBus::new();
        let store = QueueStore::new(Arc::new(storage), bus.clone());
        let mut rx = bus.subscribe();

        store.generate_ticket("acme").unwrap();
        let notice = rx.recv().await.unwrap();
        assert_eq!(notice.company_id, "acme");
        assert_eq!(notice.kind, RecordKind::Queue);

        let _ = fs::remove_dir_all(dir);
    }
}
