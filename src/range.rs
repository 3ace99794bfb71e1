//! Range header translation.
//!
//! Only the first satisfiable range of a `bytes` range header is honored.
//! Anything else (absent header, other units, garbage, nothing satisfiable)
//! means the whole entity is served.

/// Inclusive byte range, always `start <= end < size` of the entity it was
/// derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered, the `Content-Length` of a 206 response
    pub fn content_length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value of the `Content-Range` header for an entity of `size` bytes
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeDecision {
    Full,
    Bounded(ByteRange),
}

pub fn translate(header: Option<&str>, size: u64) -> RangeDecision {
    let Some(header) = header else {
        return RangeDecision::Full;
    };

    match parse(header, size) {
        Some((unit, ranges)) if unit.trim().eq_ignore_ascii_case("bytes") => ranges
            .first()
            .copied()
            .map_or(RangeDecision::Full, RangeDecision::Bounded),
        _ => RangeDecision::Full,
    }
}

/// Split `unit=spec[,spec...]` and keep every range satisfiable within `size`.
///
/// `a-b` is clamped to the end of the entity, `a-` runs to the end and `-n`
/// selects the last `n` bytes. Specs that are malformed or start past the
/// end are skipped.
fn parse(header: &str, size: u64) -> Option<(&str, Vec<ByteRange>)> {
    let (unit, specs) = header.split_once('=')?;
    let size = i128::from(size);
    let last = size - 1;

    let ranges = specs
        .split(',')
        .filter_map(|spec| {
            let (first, second) = spec.trim().split_once('-')?;
            let first = parse_bound(first)?;
            let second = parse_bound(second)?;

            let (start, end) = match (first, second) {
                (None, Some(suffix)) => (size - suffix, last),
                (Some(start), None) => (start, last),
                (Some(start), Some(end)) => (start, end.min(last)),
                (None, None) => return None,
            };

            if start < 0 || start > end {
                return None;
            }
            Some(ByteRange {
                start: u64::try_from(start).ok()?,
                end: u64::try_from(end).ok()?,
            })
        })
        .collect();

    Some((unit, ranges))
}

/// `Some(None)` for an empty bound, `None` when the bound is not a number.
fn parse_bound(bound: &str) -> Option<Option<i128>> {
    let bound = bound.trim();
    if bound.is_empty() {
        return Some(None);
    }
    if !bound.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    bound.parse::<u64>().ok().map(|n| Some(i128::from(n)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounded(start: u64, end: u64) -> RangeDecision {
        RangeDecision::Bounded(ByteRange { start, end })
    }

    #[test]
    fn absent_header_is_full() {
        assert_eq!(translate(None, 10), RangeDecision::Full);
    }

    #[test]
    fn simple_range() {
        let decision = translate(Some("bytes=0-4"), 10);
        assert_eq!(decision, bounded(0, 4));
        let RangeDecision::Bounded(range) = decision else {
            unreachable!()
        };
        assert_eq!(range.content_length(), 5);
        assert_eq!(range.content_range(10), "bytes 0-4/10");
    }

    #[test]
    fn open_ended_and_suffix_ranges() {
        assert_eq!(translate(Some("bytes=6-"), 10), bounded(6, 9));
        assert_eq!(translate(Some("bytes=-3"), 10), bounded(7, 9));
    }

    #[test]
    fn end_is_clamped_to_size() {
        assert_eq!(translate(Some("bytes=5-100"), 10), bounded(5, 9));
    }

    #[test]
    fn only_first_range_is_honored() {
        assert_eq!(translate(Some("bytes=2-3, 5-7"), 10), bounded(2, 3));
    }

    #[test]
    fn unsatisfiable_ranges_are_skipped() {
        assert_eq!(translate(Some("bytes=20-30,1-2"), 10), bounded(1, 2));
        assert_eq!(translate(Some("bytes=20-30"), 10), RangeDecision::Full);
        assert_eq!(translate(Some("bytes=-20"), 10), RangeDecision::Full);
        assert_eq!(translate(Some("bytes=0-0"), 0), RangeDecision::Full);
    }

    #[test]
    fn malformed_headers_fall_back_to_full() {
        assert_eq!(translate(Some("garbage"), 10), RangeDecision::Full);
        assert_eq!(translate(Some("bytes=abc"), 10), RangeDecision::Full);
        assert_eq!(translate(Some("bytes=4-2"), 10), RangeDecision::Full);
        assert_eq!(translate(Some("bytes=-"), 10), RangeDecision::Full);
    }

    #[test]
    fn other_units_fall_back_to_full() {
        assert_eq!(translate(Some("items=0-4"), 10), RangeDecision::Full);
    }
}
