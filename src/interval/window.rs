/// interval/window.rs — Fixed-width windows around an anchor point
///
/// Every interval is replaced by a window of `size` positions centred on
/// an anchor: the interval start, its end, its midpoint, or a uniformly
/// drawn position inside it. Windows that would start before 0 are moved
/// right so the width is kept.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Start,
    End,
    #[default]
    #[serde(alias = "centre")]
    Center,
    #[serde(alias = "rand")]
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Window {
    pub size: u64,
    #[serde(default)]
    pub placement: Placement,
    /// Seed of the random placement.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_seed() -> u64 {
    64
}

impl Window {
    pub fn new(size: u64, placement: Placement, seed: u64) -> Self {
        Self { size, placement, seed }
    }

    /// Placer with a fresh RNG seeded from the window.
    pub fn placer(&self) -> WindowPlacer {
        WindowPlacer {
            window: *self,
            rng: StdRng::seed_from_u64(self.seed),
        }
    }
}

/// Applies one window to a stream of intervals.
pub struct WindowPlacer {
    window: Window,
    rng: StdRng,
}

impl WindowPlacer {
    /// New `(start, end)` for the interval `[start, end)`.
    pub fn place(&mut self, start: u64, end: u64) -> (u64, u64) {
        let anchor = match self.window.placement {
            Placement::Start => start,
            Placement::End => end,
            Placement::Center => start + (end - start) / 2,
            Placement::Random if end > start => self.rng.gen_range(start..end),
            Placement::Random => start,
        };
        let new_start = anchor.saturating_sub(self.window.size / 2);
        (new_start, new_start + self.window.size)
    }
}
