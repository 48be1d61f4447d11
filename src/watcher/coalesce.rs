//! Pure per-path event coalescing: folds a new raw filesystem event into
//! whatever is already queued for that path.

use super::types::{EventKind, RawEventKind};

/// Fold a new raw event into the existing coalesced state for one path.
/// `None` existing means no prior event this debounce window; `None`
/// result means the path's history collapses to nothing (`add;unlink`).
pub(crate) fn coalesce(existing: Option<EventKind>, incoming: RawEventKind) -> Option<EventKind> {
    use EventKind::*;
    use RawEventKind as R;

    match (existing, incoming) {
        (None, R::Add) => Some(Add),
        (None, R::Change) => Some(Change),
        (None, R::Unlink) => Some(Unlink),

        (Some(Add), R::Change) => Some(Add),
        (Some(Add), R::Unlink) => None,
        (Some(Add), R::Add) => Some(Add),

        (Some(Change), R::Change) => Some(Change),
        (Some(Change), R::Unlink) => Some(Unlink),
        (Some(Change), R::Add) => Some(Add),

        (Some(Unlink), R::Add) => Some(Add),
        (Some(Unlink), R::Change) => Some(Unlink),
        (Some(Unlink), R::Unlink) => Some(Unlink),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use EventKind::*;
    use RawEventKind as R;

    #[test]
    fn every_transition_matches_the_coalescing_table() {
        assert_eq!(coalesce(Some(Add), R::Change), Some(Add));
        assert_eq!(coalesce(Some(Add), R::Unlink), None);
        assert_eq!(coalesce(Some(Change), R::Change), Some(Change));
        assert_eq!(coalesce(Some(Change), R::Unlink), Some(Unlink));
        assert_eq!(coalesce(Some(Change), R::Add), Some(Add));
        assert_eq!(coalesce(Some(Unlink), R::Add), Some(Add));
        assert_eq!(coalesce(Some(Unlink), R::Change), Some(Unlink));
        assert_eq!(coalesce(Some(Add), R::Add), Some(Add));
        assert_eq!(coalesce(Some(Unlink), R::Unlink), Some(Unlink));
    }

    #[test]
    fn add_then_unlink_clears_entirely() {
        let mut state: Option<EventKind> = None;
        state = coalesce(state, R::Add);
        state = coalesce(state, R::Unlink);
        assert_eq!(state, None);
    }
}
