use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Generation counter for one view's filter. Every filter change advances
/// it; a load is only applied if its ticket is still the current one.
#[derive(Debug, Clone, Default)]
pub struct FilterGate {
    generation: Arc<AtomicU64>,
}

/// The generation a load was issued under.
#[derive(Debug, Clone)]
pub struct Ticket {
    generation: u64,
    gate: Arc<AtomicU64>,
}

impl FilterGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidates every outstanding ticket and issues a fresh one.
    pub fn advance(&self) -> Ticket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        Ticket {
            generation,
            gate: self.generation.clone(),
        }
    }

    pub fn current(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        Arc::ptr_eq(&self.generation, &ticket.gate) && ticket.is_current()
    }
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Usable from loader threads, which hold no reference to the view.
    pub fn is_current(&self) -> bool {
        self.gate.load(Ordering::SeqCst) == self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advancing_supersedes_older_tickets() {
        let gate = FilterGate::new();
        let a = gate.advance();
        assert!(gate.is_current(&a));
        let b = gate.advance();
        assert!(!a.is_current());
        assert!(gate.is_current(&b));
        assert_eq!(b.generation(), a.generation() + 1);
        assert_eq!(gate.current(), b.generation());
    }

    #[test]
    fn tickets_do_not_cross_gates() {
        let scores = FilterGate::new();
        let attendance = FilterGate::new();
        let t = scores.advance();
        attendance.advance();
        assert!(!attendance.is_current(&t));
    }

    #[test]
    fn clones_share_the_counter() {
        let gate = FilterGate::new();
        let t = gate.advance();
        let shared = gate.clone();
        shared.advance();
        assert!(!gate.is_current(&t));
    }
}
