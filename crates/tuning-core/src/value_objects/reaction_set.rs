//! Per-(report, user) reaction bitmap

use bitflags::bitflags;

use crate::entities::ReactionKind;

bitflags! {
    /// Which reactions one user currently has on one report
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ReactionSet: u8 {
        const CELEBRATE = 1 << 0;
        const THUMBS_UP = 1 << 1;
        const LAUGH     = 1 << 2;
        const EYES      = 1 << 3;
        const HEART     = 1 << 4;
    }
}

impl ReactionSet {
    #[inline]
    pub fn has(&self, kind: ReactionKind) -> bool {
        self.contains(kind.flag())
    }

    /// Set or clear a single kind
    pub fn with(mut self, kind: ReactionKind, reacted: bool) -> Self {
        self.set(kind.flag(), reacted);
        self
    }

    /// Reacted kinds in storage order
    pub fn kinds(&self) -> impl Iterator<Item = ReactionKind> + '_ {
        ReactionKind::ALL.into_iter().filter(|k| self.has(*k))
    }
}

impl FromIterator<ReactionKind> for ReactionSet {
    fn from_iter<I: IntoIterator<Item = ReactionKind>>(iter: I) -> Self {
        iter.into_iter()
            .fold(ReactionSet::empty(), |set, kind| set | kind.flag())
    }
}
