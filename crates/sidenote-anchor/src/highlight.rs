use crate::{HostSurface, HIGHLIGHT_TINT};
use sidenote_core::HIGHLIGHT_DURATION;
use std::fmt::Debug;
use std::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
struct PendingRevert<E> {
    element: E,
    prior: Option<String>,
    due: Instant,
}

/// Temporary background tints with their scheduled reverts.
///
/// Each highlighted element has at most one pending revert. Highlighting it
/// again only pushes the deadline out, so the value restored is always the
/// one seen before the first tint.
#[derive(Debug)]
pub struct Highlighter<E> {
    pending: Vec<PendingRevert<E>>,
}

impl<E> Default for Highlighter<E> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
        }
    }
}

impl<E: Clone + Eq + Debug> Highlighter<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn highlight<S: HostSurface<E>>(&mut self, surface: &mut S, element: &E, now: Instant) {
        let due = now + HIGHLIGHT_DURATION;
        match self.pending.iter().position(|p| p.element == *element) {
            Some(index) => self.pending[index].due = due,
            None => self.pending.push(PendingRevert {
                element: element.clone(),
                prior: surface.background(element),
                due,
            }),
        }
        surface.set_background(element, Some(HIGHLIGHT_TINT.to_string()));
    }

    /// Apply every revert whose deadline has passed. Returns how many
    /// elements were restored; detached elements are dropped without a write.
    pub fn tick<S: HostSurface<E>>(&mut self, now: Instant, surface: &mut S) -> usize {
        let (expired, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|p| now >= p.due);
        self.pending = waiting;

        let mut restored = 0;
        for revert in expired {
            if surface.is_attached(&revert.element) {
                surface.set_background(&revert.element, revert.prior);
                restored += 1;
            } else {
                debug!(event = "highlight_dropped", element = ?revert.element);
            }
        }
        restored
    }

    /// Restore `element` now and cancel its pending revert.
    pub fn dismiss<S: HostSurface<E>>(&mut self, surface: &mut S, element: &E) -> bool {
        let Some(index) = self.pending.iter().position(|p| p.element == *element) else {
            return false;
        };
        let revert = self.pending.remove(index);
        if surface.is_attached(&revert.element) {
            surface.set_background(&revert.element, revert.prior);
        }
        true
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.pending.iter().map(|p| p.due).min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::time::Duration;

    #[derive(Default)]
    struct Styles {
        backgrounds: HashMap<u32, String>,
        detached: HashSet<u32>,
        writes: usize,
    }

    impl HostSurface<u32> for Styles {
        fn scroll_into_view(&mut self, _element: &u32) {}

        fn background(&self, element: &u32) -> Option<String> {
            self.backgrounds.get(element).cloned()
        }

        fn set_background(&mut self, element: &u32, color: Option<String>) {
            self.writes += 1;
            match color {
                Some(color) => self.backgrounds.insert(*element, color),
                None => self.backgrounds.remove(element),
            };
        }

        fn is_attached(&self, element: &u32) -> bool {
            !self.detached.contains(element)
        }
    }

    #[test]
    fn revert_restores_prior_value_once() {
        let mut styles = Styles::default();
        styles.backgrounds.insert(1, "white".to_string());
        let mut highlighter: Highlighter<u32> = Highlighter::new();
        let now = Instant::now();

        highlighter.highlight(&mut styles, &1, now);
        highlighter.highlight(&mut styles, &2, now);
        assert_eq!(styles.background(&1).as_deref(), Some(HIGHLIGHT_TINT));
        assert_eq!(highlighter.next_due(), Some(now + HIGHLIGHT_DURATION));

        assert_eq!(
            highlighter.tick(now + HIGHLIGHT_DURATION - Duration::from_millis(1), &mut styles),
            0
        );
        assert_eq!(highlighter.tick(now + HIGHLIGHT_DURATION, &mut styles), 2);
        assert_eq!(styles.background(&1).as_deref(), Some("white"));
        assert_eq!(styles.background(&2), None);

        let writes = styles.writes;
        assert_eq!(highlighter.tick(now + HIGHLIGHT_DURATION * 2, &mut styles), 0);
        assert_eq!(styles.writes, writes);
    }

    #[test]
    fn rehighlight_keeps_original_background() {
        let mut styles = Styles::default();
        styles.backgrounds.insert(7, "#eee".to_string());
        let mut highlighter: Highlighter<u32> = Highlighter::new();
        let now = Instant::now();

        highlighter.highlight(&mut styles, &7, now);
        highlighter.highlight(&mut styles, &7, now + Duration::from_secs(1));
        assert_eq!(highlighter.pending(), 1);

        assert_eq!(highlighter.tick(now + HIGHLIGHT_DURATION, &mut styles), 0);
        assert_eq!(
            highlighter.tick(now + HIGHLIGHT_DURATION + Duration::from_secs(1), &mut styles),
            1
        );
        assert_eq!(styles.background(&7).as_deref(), Some("#eee"));
    }

    #[test]
    fn detached_elements_are_skipped() {
        let mut styles = Styles::default();
        let mut highlighter: Highlighter<u32> = Highlighter::new();
        let now = Instant::now();

        highlighter.highlight(&mut styles, &3, now);
        styles.detached.insert(3);
        let writes = styles.writes;
        assert_eq!(highlighter.tick(now + HIGHLIGHT_DURATION, &mut styles), 0);
        assert_eq!(styles.writes, writes);
        assert_eq!(highlighter.pending(), 0);
    }

    #[test]
    fn dismiss_restores_and_cancels() {
        let mut styles = Styles::default();
        let mut highlighter: Highlighter<u32> = Highlighter::new();
        let now = Instant::now();

        highlighter.highlight(&mut styles, &4, now);
        assert!(highlighter.dismiss(&mut styles, &4));
        assert_eq!(styles.background(&4), None);
        assert!(!highlighter.dismiss(&mut styles, &4));
        assert_eq!(highlighter.tick(now + HIGHLIGHT_DURATION, &mut styles), 0);
    }
}
