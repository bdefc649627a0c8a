use std::sync::Arc;

/// Suppresses consecutive samples of the same window. Only the immediately preceding sample
/// is remembered, so returning to a window after visiting another one is a new event.
///
/// Checking and remembering are separate steps so the owner can remember a sample only once
/// it has been handled.
#[derive(Debug, Default)]
pub struct DedupGuard {
    last_seen: Option<(Arc<str>, Arc<str>)>,
}

impl DedupGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_repeat(&self, app: &str, title: &str) -> bool {
        matches!(
            &self.last_seen,
            Some((last_app, last_title)) if &**last_app == app && &**last_title == title
        )
    }

    /// Makes `(app, title)` the previous sample.
    pub fn remember(&mut self, app: &Arc<str>, title: &Arc<str>) {
        if !self.is_repeat(app, title) {
            self.last_seen = Some((app.clone(), title.clone()));
        }
    }

    pub fn last_seen(&self) -> Option<(&str, &str)> {
        self.last_seen
            .as_ref()
            .map(|(app, title)| (app.as_ref(), title.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::DedupGuard;

    fn pair(app: &str, title: &str) -> (Arc<str>, Arc<str>) {
        (app.into(), title.into())
    }

    /// Mirrors how the recorder uses the guard when every write succeeds.
    fn admit(guard: &mut DedupGuard, app: &Arc<str>, title: &Arc<str>) -> bool {
        if guard.is_repeat(app, title) {
            return false;
        }
        guard.remember(app, title);
        true
    }

    #[test]
    fn test_identical_samples_admit_once() {
        let mut guard = DedupGuard::new();
        let (app, title) = pair("code", "main.rs");

        let admitted = (0..50).filter(|_| admit(&mut guard, &app, &title)).count();

        assert_eq!(admitted, 1);
    }

    #[test]
    fn test_returning_to_window_is_new() {
        let mut guard = DedupGuard::new();
        let (a_app, a_title) = pair("code", "main.rs");
        let (b_app, b_title) = pair("slack", "general");

        assert!(admit(&mut guard, &a_app, &a_title));
        assert!(admit(&mut guard, &b_app, &b_title));
        assert!(admit(&mut guard, &a_app, &a_title));
        assert_eq!(guard.last_seen(), Some(("code", "main.rs")));
    }

    #[test]
    fn test_title_change_is_new() {
        let mut guard = DedupGuard::new();
        let (app, first) = pair("code", "main.rs");
        let (_, second) = pair("code", "lib.rs");

        assert!(admit(&mut guard, &app, &first));
        assert!(admit(&mut guard, &app, &second));
        assert!(!admit(&mut guard, &app, &second));
    }

    #[test]
    fn test_checking_does_not_remember() {
        let mut guard = DedupGuard::new();
        let (app, title) = pair("code", "main.rs");

        assert!(!guard.is_repeat(&app, &title));
        assert!(!guard.is_repeat(&app, &title));
        assert_eq!(guard.last_seen(), None);

        guard.remember(&app, &title);
        assert!(guard.is_repeat(&app, &title));
    }
}
