use crate::segment::{Segment, SegmentRole};

use super::error::{ReelError, ReelResult};

/// Ordered segments for one video. Intro first and outro last by construction.
#[derive(Debug, Clone)]
pub struct RenderPlan {
    intro: Segment,
    games: Vec<Segment>,
}

impl RenderPlan {
    pub fn new(intro: Segment) -> Self {
        debug_assert_eq!(intro.role, SegmentRole::Intro);
        Self {
            intro,
            games: Vec::new(),
        }
    }

    pub fn push_game(&mut self, segment: Segment) {
        debug_assert_eq!(segment.role, SegmentRole::Game);
        self.games.push(segment);
    }

    pub fn game_count(&self) -> usize {
        self.games.len()
    }

    pub fn finish(self, outro: Segment) -> ReelResult<Vec<Segment>> {
        if self.games.is_empty() {
            return Err(ReelError::NoContent);
        }
        let mut segments = Vec::with_capacity(self.games.len() + 2);
        segments.push(self.intro);
        segments.extend(self.games);
        segments.push(outro);
        Ok(segments)
    }
}
