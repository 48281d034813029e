//! Parameter derivation: turning `(eps, N)` into the level count and budget
//! schedule every engine variant rebuilds against.

use todolist_core::{Error, Result};

/// The budget schedule derived from `eps` and the current population `N`.
///
/// ```
/// use todolist::engine::params::Params;
///
/// let p = Params::derive(0.4, 1000).unwrap();
/// assert!(p.a[p.k] >= 1000);
/// assert_eq!(p.n0max, 5); // ceil(2 / 0.4)
/// ```
#[derive(Debug, Clone)]
pub struct Params {
    /// The tuning parameter this schedule was derived from.
    pub eps: f64,
    /// Hard cap on the size of level 0.
    pub n0max: usize,
    /// The highest level index; there are `k + 1` levels, `0..=k`.
    pub k: usize,
    /// `a[i]` is the capacity budget for level `i`, `0 <= i <= k`.
    pub a: Vec<usize>,
}

impl Params {
    /// Derives `n0max`, `k`, and `a[0..=k]` for the given `eps` and current
    /// population `n`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidParameter`] unless `0 < eps < 1`.
    pub fn derive(eps: f64, n: usize) -> Result<Self> {
        if !(eps > 0.0 && eps < 1.0) {
            return Err(Error::InvalidParameter(format!(
                "eps must be in (0, 1), got {eps}"
            )));
        }

        let base = 2.0 - eps;
        let n0max = (2.0 / eps).ceil() as usize;
        let k = if n == 0 {
            1
        } else {
            1 + ((n as f64).ln() / base.ln()).ceil().max(0.0) as usize
        };
        let a = (0..=k).map(|i| base.powi(i as i32).floor() as usize).collect();

        Ok(Self { eps, n0max, k, a })
    }

    /// The hysteresis budget `b[i] = floor((2 - eps/2)^i)` used by the
    /// working-set variant's rebuild-trigger decision.
    pub(crate) fn hysteresis_budget(&self) -> Vec<usize> {
        let base = 2.0 - self.eps / 2.0;
        (0..=self.k).map(|i| base.powi(i as i32).floor() as usize).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_eps() {
        assert!(Params::derive(0.0, 10).is_err());
        assert!(Params::derive(1.0, 10).is_err());
        assert!(Params::derive(-0.1, 10).is_err());
        assert!(Params::derive(1.5, 10).is_err());
    }

    #[test]
    fn budget_ladder_grows_with_level() {
        let p = Params::derive(0.5, 1000).unwrap();
        for i in 1..p.a.len() {
            assert!(p.a[i] >= p.a[i - 1]);
        }
        assert!(p.a[p.k] >= 1000);
    }

    #[test]
    fn n0max_matches_formula() {
        let p = Params::derive(0.4, 0).unwrap();
        assert_eq!(p.n0max, 5);
        let p = Params::derive(0.5, 0).unwrap();
        assert_eq!(p.n0max, 4);
    }

    #[test]
    fn hysteresis_budget_is_never_smaller() {
        let p = Params::derive(0.5, 1000).unwrap();
        let b = p.hysteresis_budget();
        for i in 0..=p.k {
            assert!(b[i] >= p.a[i]);
        }
    }
}
