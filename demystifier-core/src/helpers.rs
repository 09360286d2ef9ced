// Copyright (c) The demystifier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! General support code for demystifier.

use std::{fmt, time::Duration};

/// Utilities for pluralizing various words based on count.
pub mod plural {
    /// Returns "test" if `count` is 1, otherwise "tests".
    pub fn tests_str(count: usize) -> &'static str {
        if count == 1 { "test" } else { "tests" }
    }

    /// Returns "attempt" if `count` is 1, otherwise "attempts".
    pub fn attempts_str(count: usize) -> &'static str {
        if count == 1 { "attempt" } else { "attempts" }
    }

    /// Returns "pattern" if `count` is 1, otherwise "patterns".
    pub fn patterns_str(count: usize) -> &'static str {
        if count == 1 { "pattern" } else { "patterns" }
    }

    /// Returns "file" if `count` is 1, otherwise "files".
    pub fn files_str(count: usize) -> &'static str {
        if count == 1 { "file" } else { "files" }
    }

    /// Returns "error" if `count` is 1, otherwise "errors".
    pub fn errors_str(count: usize) -> &'static str {
        if count == 1 { "error" } else { "errors" }
    }
}

/// Displays a duration in compact form, for example `3m8.943s` or `250ms`.
///
/// Hours and minutes are shown only when non-zero (or, for minutes, when hours are shown).
/// Fractional parts are printed without trailing zeros.
#[derive(Clone, Copy, Debug)]
pub struct DisplayCompactDuration(pub Duration);

impl fmt::Display for DisplayCompactDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NANOS_PER_MICRO: u128 = 1_000;
        const NANOS_PER_MILLI: u128 = 1_000_000;
        const NANOS_PER_SEC: u128 = 1_000_000_000;

        let nanos = self.0.as_nanos();
        if nanos == 0 {
            return f.write_str("0s");
        }
        if nanos < NANOS_PER_MICRO {
            return write!(f, "{nanos}ns");
        }
        if nanos < NANOS_PER_MILLI {
            write_decimal(f, nanos, NANOS_PER_MICRO)?;
            return f.write_str("µs");
        }
        if nanos < NANOS_PER_SEC {
            write_decimal(f, nanos, NANOS_PER_MILLI)?;
            return f.write_str("ms");
        }

        let secs = self.0.as_secs();
        let hours = secs / 3600;
        let minutes = secs % 3600 / 60;
        if hours > 0 {
            write!(f, "{hours}h")?;
        }
        if hours > 0 || minutes > 0 {
            write!(f, "{minutes}m")?;
        }
        let sub_minute = u128::from(secs % 60) * NANOS_PER_SEC + u128::from(self.0.subsec_nanos());
        write_decimal(f, sub_minute, NANOS_PER_SEC)?;
        f.write_str("s")
    }
}

// `unit` must be a power of ten.
fn write_decimal(f: &mut fmt::Formatter<'_>, value: u128, unit: u128) -> fmt::Result {
    write!(f, "{}", value / unit)?;
    let frac = value % unit;
    if frac != 0 {
        let width = unit.ilog10() as usize;
        let digits = format!("{frac:0width$}");
        write!(f, ".{}", digits.trim_end_matches('0'))?;
    }
    Ok(())
}
