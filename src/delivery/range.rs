// ---------------------------------------------------------------------------
// Range header parsing and resolution
// ---------------------------------------------------------------------------

/// A single `bytes=<start>-<end?>` request, before it is checked against
/// the object size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    /// `None` for an open-ended range (`bytes=100-`).
    pub end: Option<u64>,
}

/// The byte window to serve for an object of known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedRange {
    /// Whole object, 200.
    Full,
    /// Inclusive window, 206. `end` is already clamped to `total - 1`.
    Partial { start: u64, end: u64 },
    /// 416.
    Unsatisfiable,
}

/// Parse a `Range` header value.
///
/// Anything that is not a single `bytes=<start>-<end?>` window returns
/// `None` and the caller serves the full object. That covers multi-range
/// lists, other units, suffix ranges (`bytes=-500`) and non-numeric bounds.
pub fn parse_range_header(value: &str) -> Option<ByteRange> {
    let spec = value.trim().strip_prefix("bytes=")?;
    if spec.contains(',') {
        return None;
    }
    let (start, end) = spec.split_once('-')?;
    let start: u64 = start.parse().ok()?;
    let end = if end.is_empty() {
        None
    } else {
        Some(end.parse::<u64>().ok()?)
    };
    Some(ByteRange { start, end })
}

/// Resolve a parsed range against the object size.
///
/// The start is checked before the end is clamped, so `start >= total`
/// is always unsatisfiable and a zero-length object can never produce a
/// partial response.
pub fn resolve_range(range: Option<ByteRange>, total_bytes: u64) -> ResolvedRange {
    let Some(range) = range else {
        return ResolvedRange::Full;
    };

    if range.start >= total_bytes {
        return ResolvedRange::Unsatisfiable;
    }

    let last = total_bytes - 1;
    let end = range.end.unwrap_or(last);
    if range.start > end {
        return ResolvedRange::Unsatisfiable;
    }

    ResolvedRange::Partial {
        start: range.start,
        end: end.min(last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(start: u64, end: Option<u64>) -> Option<ByteRange> {
        Some(ByteRange { start, end })
    }

    #[test]
    fn test_parse_closed_and_open_ranges() {
        assert_eq!(parse_range_header("bytes=0-499"), window(0, Some(499)));
        assert_eq!(parse_range_header("bytes=500-"), window(500, None));
        assert_eq!(parse_range_header("  bytes=7-7 "), window(7, Some(7)));
    }

    #[test]
    fn test_parse_fallbacks() {
        for value in [
            "bytes=0-10,20-30",
            "items=0-10",
            "bytes=-500",
            "bytes=abc-10",
            "bytes=10-xyz",
            "bytes=10",
            "bytes=",
            "0-10",
        ] {
            assert_eq!(parse_range_header(value), None, "{value}");
        }
    }

    #[test]
    fn test_resolve_full_without_range() {
        assert_eq!(resolve_range(None, 1000), ResolvedRange::Full);
        assert_eq!(resolve_range(None, 0), ResolvedRange::Full);
    }

    #[test]
    fn test_resolve_partial_windows() {
        assert_eq!(
            resolve_range(window(0, Some(499)), 1000),
            ResolvedRange::Partial { start: 0, end: 499 }
        );
        assert_eq!(
            resolve_range(window(500, None), 1000),
            ResolvedRange::Partial { start: 500, end: 999 }
        );
        assert_eq!(
            resolve_range(window(999, Some(999)), 1000),
            ResolvedRange::Partial { start: 999, end: 999 }
        );
    }

    #[test]
    fn test_resolve_clamps_end() {
        assert_eq!(
            resolve_range(window(900, Some(5000)), 1000),
            ResolvedRange::Partial { start: 900, end: 999 }
        );
    }

    #[test]
    fn test_resolve_unsatisfiable() {
        assert_eq!(
            resolve_range(window(1000, None), 1000),
            ResolvedRange::Unsatisfiable
        );
        assert_eq!(
            resolve_range(window(1500, Some(2000)), 1000),
            ResolvedRange::Unsatisfiable
        );
        assert_eq!(
            resolve_range(window(10, Some(5)), 1000),
            ResolvedRange::Unsatisfiable
        );
    }

    #[test]
    fn test_zero_length_object_rejects_every_range() {
        assert_eq!(resolve_range(window(0, None), 0), ResolvedRange::Unsatisfiable);
        assert_eq!(resolve_range(window(0, Some(0)), 0), ResolvedRange::Unsatisfiable);
    }
}
