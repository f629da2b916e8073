//! The roulette wheel: pocket draws and the pocket-to-color mapping.

use super::entities::RouletteColor;
use super::state_machine::{GameError, GameResult};

/// Smallest pocket on the wheel
pub const MIN_POCKET: i64 = 0;

/// Largest pocket on the wheel
pub const MAX_POCKET: i64 = 36;

/// Map a pocket number to its color on a European wheel.
///
/// 0 is green. In 1-10 and 19-28 even pockets are black and odd are red;
/// in 11-18 and 29-36 it is the other way around. Anything outside 0-36
/// violates the input contract and fails with `InvalidArgument`.
pub fn color_of(pocket: i64) -> GameResult<RouletteColor> {
    match pocket {
        0 => Ok(RouletteColor::Green),
        1..=10 | 19..=28 => Ok(if pocket % 2 == 0 {
            RouletteColor::Black
        } else {
            RouletteColor::Red
        }),
        11..=18 | 29..=36 => Ok(if pocket % 2 == 0 {
            RouletteColor::Red
        } else {
            RouletteColor::Black
        }),
        _ => Err(GameError::InvalidArgument(format!(
            "pocket {pocket} is not on the wheel"
        ))),
    }
}

/// Draw a uniformly random pocket.
pub fn random_pocket() -> i64 {
    rand::random_range(MIN_POCKET..=MAX_POCKET)
}
