//! Range request planning.
//!
//! [`RangeRequestPlanner::plan`] turns an object size and the raw text of a
//! `Range` header into a validated [`RangeSpec`]. It performs no I/O and is
//! total: every input string yields either a [`RangeSpec`] or a [`RangeRejection`].
//!
//! Only the single-range `bytes=start-end` / `bytes=start-` forms are
//! supported. Suffix ranges (`bytes=-500`) and multi-range lists are
//! rejected as malformed.

use crate::RangeSpec;

const BYTES_UNIT: &str = "bytes";

/// What to do when a request carries no `Range` header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingRangePolicy {
    /// Reject with [`RangeRejection::RangeRequired`]
    Require,
    /// Serve the whole object
    #[default]
    FullObject,
}

/// Why a range could not be planned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRejection {
    RangeRequired,
    MalformedRange,
    NotSatisfiable,
}

impl std::fmt::Display for RangeRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RangeRejection::RangeRequired => write!(f, "Range header required"),
            RangeRejection::MalformedRange => write!(f, "Malformed range"),
            RangeRejection::NotSatisfiable => write!(f, "Range not satisfiable"),
        }
    }
}

/// Pure planner for single byte-range requests
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeRequestPlanner {
    missing: MissingRangePolicy,
}

impl RangeRequestPlanner {
    pub fn new(missing: MissingRangePolicy) -> Self {
        Self { missing }
    }

    /// Planner that rejects requests without a `Range` header
    pub fn strict() -> Self {
        Self::new(MissingRangePolicy::Require)
    }

    /// Planner that serves the whole object when no range is given
    pub fn lenient() -> Self {
        Self::new(MissingRangePolicy::FullObject)
    }

    pub fn missing_range_policy(&self) -> MissingRangePolicy {
        self.missing
    }

    /// Plan the byte interval to serve for an object of `size` bytes.
    pub fn plan(&self, size: u64, range_header: Option<&str>) -> Result<RangeSpec, RangeRejection> {
        let Some(header) = range_header else {
            return match self.missing {
                MissingRangePolicy::Require => Err(RangeRejection::RangeRequired),
                MissingRangePolicy::FullObject if size == 0 => Err(RangeRejection::NotSatisfiable),
                MissingRangePolicy::FullObject => Ok(RangeSpec::full(size)),
            };
        };

        let (start, end) = parse_bounds(header)?;
        let end = match end {
            Some(end) => end,
            None if size == 0 => return Err(RangeRejection::NotSatisfiable),
            None => size - 1,
        };

        if start >= size || end >= size || start > end {
            return Err(RangeRejection::NotSatisfiable);
        }

        Ok(RangeSpec { start, end, total: size })
    }
}

/// A bound that is syntactically a number; `None` when it overflows u64.
type Bound = Option<u64>;

/// Split `bytes=start-end` into its bounds. Bounds too large for u64 are
/// reported as `u64::MAX` so they fail the size check instead of the syntax check.
fn parse_bounds(header: &str) -> Result<(u64, Option<u64>), RangeRejection> {
    let header = header.trim();
    let (unit, spec) = header.split_once('=').ok_or(RangeRejection::MalformedRange)?;
    if !unit.trim().eq_ignore_ascii_case(BYTES_UNIT) {
        return Err(RangeRejection::MalformedRange);
    }
    if spec.contains(',') {
        return Err(RangeRejection::MalformedRange);
    }

    let (start, end) = spec.trim().split_once('-').ok_or(RangeRejection::MalformedRange)?;
    let start = parse_offset(start)?
        .ok_or(RangeRejection::MalformedRange)?
        .unwrap_or(u64::MAX);
    let end = parse_offset(end)?.map(|bound| bound.unwrap_or(u64::MAX));

    Ok((start, end))
}

/// `Ok(None)` for an empty bound, `Ok(Some(..))` for a run of ASCII digits.
fn parse_offset(raw: &str) -> Result<Option<Bound>, RangeRejection> {
    if raw.is_empty() {
        return Ok(None);
    }
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RangeRejection::MalformedRange);
    }
    Ok(Some(raw.parse::<u64>().ok()))
}
