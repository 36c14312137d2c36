//! Selection operators drawing parents from a fitness ranking.

use super::normal_sample;
use rand::RngCore;
use std::sync::Arc;

/// Picks a parent position from a ranking ordered from the fittest down.
///
/// # Examples
/// ```
/// use hrd_trainer::ops::SelectionOperator;
/// use rand::thread_rng;
///
/// struct Fittest;
///
/// impl SelectionOperator for Fittest {
///     fn select_rank(&self, ranked: usize, _rng: &mut dyn rand::RngCore) -> Option<usize> {
///         (ranked > 0).then_some(0)
///     }
/// }
///
/// assert_eq!(Fittest.select_rank(4, &mut thread_rng()), Some(0));
/// assert_eq!(Fittest.select_rank(0, &mut thread_rng()), None);
/// ```
pub trait SelectionOperator: Send + Sync {
    /// Returns a zero-based position into a ranking of `ranked` individuals,
    /// position 0 being the fittest. `None` for an empty ranking.
    fn select_rank(&self, ranked: usize, rng: &mut dyn RngCore) -> Option<usize>;

    /// Draws two distinct positions. `None` when fewer than two individuals
    /// are ranked.
    fn select_distinct_pair(
        &self,
        ranked: usize,
        rng: &mut dyn RngCore,
    ) -> Option<(usize, usize)> {
        if ranked < 2 {
            return None;
        }
        let first = self.select_rank(ranked, rng)?;
        let mut second = self.select_rank(ranked, rng)?;
        while second == first {
            second = self.select_rank(ranked, rng)?;
        }
        Some((first, second))
    }
}

impl<T: SelectionOperator + ?Sized> SelectionOperator for &T {
    fn select_rank(&self, ranked: usize, rng: &mut dyn RngCore) -> Option<usize> {
        (**self).select_rank(ranked, rng)
    }
}

impl<T: SelectionOperator + ?Sized> SelectionOperator for Box<T> {
    fn select_rank(&self, ranked: usize, rng: &mut dyn RngCore) -> Option<usize> {
        (**self).select_rank(ranked, rng)
    }
}

impl<T: SelectionOperator + ?Sized> SelectionOperator for Arc<T> {
    fn select_rank(&self, ranked: usize, rng: &mut dyn RngCore) -> Option<usize> {
        (**self).select_rank(ranked, rng)
    }
}

/// Half-normal rank selection strongly biased towards the fittest.
///
/// A rank `r = ceil(|N(0, n / 3)|)` is drawn and redrawn while it is zero or
/// exceeds `n`; the individual at rank `r` (rank 1 being the fittest) is
/// returned.
#[derive(Debug, Clone, Copy, Default)]
pub struct RankBiasedSelection;

impl SelectionOperator for RankBiasedSelection {
    fn select_rank(&self, ranked: usize, rng: &mut dyn RngCore) -> Option<usize> {
        if ranked == 0 {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let size = ranked as f64;
        let sigma = size / 3.0;
        loop {
            let draw = (normal_sample(rng) * sigma).abs().ceil();
            if draw >= 1.0 && draw <= size {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let rank = draw as usize;
                return Some(rank - 1);
            }
        }
    }
}
