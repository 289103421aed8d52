/// Interpolation method selection
use rand::{Rng, RngCore};

use crate::error::{Error, Result};

/// Every code the policy understands.
pub const ACCEPTED_CODES: [i32; 7] = [0, 1, 2, 3, 4, AUTO, RANDOM];

/// Bicubic when enlarging, area when shrinking, bilinear otherwise
pub const AUTO: i32 = 9;
/// Uniform pick among the five concrete methods
pub const RANDOM: i32 = 10;

/// Concrete resampling algorithms
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InterMethod {
    Nearest,
    Bilinear,
    Bicubic,
    Area,
    Lanczos4,
}

impl InterMethod {
    /// Map a direct code (0-4) to a method.
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(InterMethod::Nearest),
            1 => Some(InterMethod::Bilinear),
            2 => Some(InterMethod::Bicubic),
            3 => Some(InterMethod::Area),
            4 => Some(InterMethod::Lanczos4),
            _ => None,
        }
    }

    /// Resolve a configured code into a concrete method.
    ///
    /// `old` and `new` are `(width, height)`. Code 10 consumes exactly one
    /// integer draw from `rng`; every other code consumes none.
    pub fn select(
        code: i32,
        old: (usize, usize),
        new: (usize, usize),
        rng: &mut dyn RngCore,
    ) -> Result<Self> {
        match code {
            AUTO => {
                let method = if new.0 > old.0 && new.1 > old.1 {
                    InterMethod::Bicubic
                } else if new.0 < old.0 && new.1 < old.1 {
                    InterMethod::Area
                } else {
                    InterMethod::Bilinear
                };
                Ok(method)
            }
            RANDOM => {
                let pick = rng.gen_range(0..=4);
                Self::from_code(pick).ok_or(Error::InvalidInterMethod {
                    code: pick,
                    context: "random selection",
                    accepted: "0,1,2,3,4",
                })
            }
            _ => Self::from_code(code).ok_or(Error::InvalidInterMethod {
                code,
                context: "interpolation",
                accepted: "0,1,2,3,4,9,10",
            }),
        }
    }
}

/// Image-only resize and warp accept `1-4, 9, 10`.
pub fn ensure_image_mode_code(code: i32) -> Result<()> {
    if (1..=4).contains(&code) || code == AUTO || code == RANDOM {
        Ok(())
    } else {
        Err(Error::InvalidInterMethod {
            code,
            context: "image-only resize",
            accepted: "1,2,3,4,9,10",
        })
    }
}

/// Joint resize additionally accepts nearest (0).
pub fn ensure_joint_mode_code(code: i32) -> Result<()> {
    if ACCEPTED_CODES.contains(&code) {
        Ok(())
    } else {
        Err(Error::InvalidInterMethod {
            code,
            context: "joint resize",
            accepted: "0,1,2,3,4,9,10",
        })
    }
}
