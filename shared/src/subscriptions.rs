//! Teardowns registered while a scene is built, run when it goes away.

type Teardown = Box<dyn FnOnce() + Send + Sync>;

#[derive(Default)]
pub struct SubscriptionRegistry {
    teardowns: Vec<(&'static str, Teardown)>,
}

impl SubscriptionRegistry {
    pub fn register(&mut self, label: &'static str, teardown: impl FnOnce() + Send + Sync + 'static) {
        self.teardowns.push((label, Box::new(teardown)));
    }

    pub fn len(&self) -> usize {
        self.teardowns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teardowns.is_empty()
    }

    /// Runs the teardowns registered under `label` and forgets them.
    pub fn dispose(&mut self, label: &str) {
        let (matching, kept) = std::mem::take(&mut self.teardowns)
            .into_iter()
            .partition::<Vec<_>, _>(|(registered, _)| *registered == label);
        self.teardowns = kept;
        for (label, teardown) in matching.into_iter().rev() {
            log::debug!("disposing {label}");
            teardown();
        }
    }

    /// Runs every teardown, newest first.
    pub fn dispose_all(&mut self) {
        while let Some((label, teardown)) = self.teardowns.pop() {
            log::debug!("disposing {label}");
            teardown();
        }
    }
}

impl Drop for SubscriptionRegistry {
    fn drop(&mut self) {
        self.dispose_all();
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.teardowns.iter().map(|(label, _)| label))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn disposes_in_reverse_order_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = SubscriptionRegistry::default();
        for label in ["roster", "keyboard", "afk"] {
            let log = Arc::clone(&log);
            registry.register(label, move || log.lock().unwrap().push(label));
        }

        registry.dispose_all();
        registry.dispose_all();
        assert_eq!(*log.lock().unwrap(), vec!["afk", "keyboard", "roster"]);
        assert!(registry.is_empty());
    }

    #[test]
    fn dispose_by_label_leaves_the_rest() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = SubscriptionRegistry::default();
        for label in ["place", "finca", "place"] {
            let log = Arc::clone(&log);
            registry.register(label, move || log.lock().unwrap().push(label));
        }

        registry.dispose("place");
        assert_eq!(*log.lock().unwrap(), vec!["place", "place"]);
        assert_eq!(registry.len(), 1);

        registry.dispose_all();
        assert_eq!(*log.lock().unwrap(), vec!["place", "place", "finca"]);
    }

    #[test]
    fn drop_disposes() {
        let log = Arc::new(Mutex::new(0));
        {
            let mut registry = SubscriptionRegistry::default();
            let log = Arc::clone(&log);
            registry.register("counter", move || *log.lock().unwrap() += 1);
        }
        assert_eq!(*log.lock().unwrap(), 1);
    }
}
