//! The dice roller contract resolvers depend on.
//!
//! Random number generation is explicitly out of scope for the core — the
//! resolver always takes an injected [`Roller`] — but a convenience
//! implementation backed by `fastrand` ships behind the `fastrand-roller`
//! feature (on by default) so consumers who don't need a scripted or
//! weighted distribution aren't forced to write their own.

/// Supplies die rolls to a resolver. Implementations are free to be
/// deterministic (scripted, for tests) or random (fastrand-backed, for
/// play).
pub trait Roller: Send + Sync {
    /// Roll a single d20.
    fn roll_d20(&self) -> i32;

    /// Roll a dice expression like `"1d8"` or `"2d6"` and return the total.
    fn roll_dice(&self, dice: &str) -> i32;
}

#[cfg(feature = "fastrand-roller")]
mod fastrand_impl {
    use super::Roller;

    /// A [`Roller`] backed by `fastrand`. Parses dice expressions of the
    /// form `NdM` (e.g. `"2d6"`); malformed expressions roll as zero rather
    /// than panicking, since a resolver has no good way to recover from a
    /// bad dice string mid-publish.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct FastrandRoller;

    impl FastrandRoller {
        pub fn new() -> Self {
            Self
        }
    }

    impl Roller for FastrandRoller {
        fn roll_d20(&self) -> i32 {
            fastrand::i32(1..=20)
        }

        fn roll_dice(&self, dice: &str) -> i32 {
            let Some((count, sides)) = parse_dice(dice) else {
                return 0;
            };
            (0..count).map(|_| fastrand::i32(1..=sides)).sum()
        }
    }

    fn parse_dice(dice: &str) -> Option<(i32, i32)> {
        let (count, sides) = dice.split_once('d')?;
        let count: i32 = count.parse().ok()?;
        let sides: i32 = sides.parse().ok()?;
        if count <= 0 || sides <= 0 {
            return None;
        }
        Some((count, sides))
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn rolls_stay_within_expected_bounds() {
            let roller = FastrandRoller::new();
            for _ in 0..200 {
                let d20 = roller.roll_d20();
                assert!((1..=20).contains(&d20));
                let two_d6 = roller.roll_dice("2d6");
                assert!((2..=12).contains(&two_d6));
            }
        }

        #[test]
        fn malformed_dice_expression_rolls_zero() {
            let roller = FastrandRoller::new();
            assert_eq!(roller.roll_dice("not-dice"), 0);
        }
    }
}

#[cfg(feature = "fastrand-roller")]
pub use fastrand_impl::FastrandRoller;
