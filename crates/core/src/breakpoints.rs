//! Ordered breakpoint tables.
//!
//! Severity and risk mappings are expressed as static slices of
//! [`Breakpoint`]s, ordered from the most severe band downwards. The first
//! entry whose [`Cutoff`] admits the input wins; inputs admitted by no entry
//! map to the caller-supplied fallback.

/// Lower edge of a band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cutoff {
    /// Strictly greater than the value.
    Above(f64),
    /// Greater than or equal to the value.
    AtLeast(f64),
}

impl Cutoff {
    /// Whether `x` falls on or past this edge.
    pub fn admits(self, x: f64) -> bool {
        match self {
            Cutoff::Above(edge) => x > edge,
            Cutoff::AtLeast(edge) => x >= edge,
        }
    }
}

/// One band of a breakpoint table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoint<T> {
    pub cutoff: Cutoff,
    pub value: T,
}

impl<T> Breakpoint<T> {
    pub const fn above(edge: f64, value: T) -> Self {
        Self {
            cutoff: Cutoff::Above(edge),
            value,
        }
    }

    pub const fn at_least(edge: f64, value: T) -> Self {
        Self {
            cutoff: Cutoff::AtLeast(edge),
            value,
        }
    }
}

/// Classify `x` against a descending table.
pub fn classify<T: Copy>(table: &[Breakpoint<T>], x: f64, fallback: T) -> T {
    table
        .iter()
        .find(|bp| bp.cutoff.admits(x))
        .map_or(fallback, |bp| bp.value)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &[Breakpoint<u8>] = &[
        Breakpoint::above(0.2, 3),
        Breakpoint::at_least(0.1, 2),
        Breakpoint::above(0.01, 1),
    ];

    #[test]
    fn first_matching_band_wins() {
        assert_eq!(classify(TABLE, 0.5, 0), 3);
        assert_eq!(classify(TABLE, 0.15, 0), 2);
        assert_eq!(classify(TABLE, 0.05, 0), 1);
    }

    #[test]
    fn above_is_strict() {
        assert_eq!(classify(TABLE, 0.2, 0), 2);
        assert_eq!(classify(TABLE, 0.01, 0), 0);
    }

    #[test]
    fn at_least_is_inclusive() {
        assert_eq!(classify(TABLE, 0.1, 0), 2);
    }

    #[test]
    fn fallback_below_every_band() {
        assert_eq!(classify(TABLE, -3.0, 9), 9);
    }

    #[test]
    fn empty_table_returns_fallback() {
        assert_eq!(classify::<u8>(&[], 100.0, 4), 4);
    }
}
