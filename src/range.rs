use std::ops::Bound;

use axum::headers::Range;

/// How a request's `Range` header applies to a resource of known length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved {
    /// No usable range; serve everything with 200.
    Full,
    /// Inclusive byte offsets to serve with 206.
    Partial { start: u64, end: u64 },
    /// Nothing to serve; 416.
    Unsatisfiable,
}

/// Resolves a single-range request. Multi-range and malformed specs fall back
/// to the full body.
pub fn resolve(range: Option<&Range>, length: u64) -> Resolved {
    let Some(range) = range else {
        return Resolved::Full;
    };
    let mut specs = range.iter();
    let (Some(spec), None) = (specs.next(), specs.next()) else {
        return Resolved::Full;
    };

    match spec {
        (Bound::Included(first), Bound::Included(last)) if last < first => Resolved::Full,
        (Bound::Included(first), _) if first >= length => Resolved::Unsatisfiable,
        (Bound::Included(start), Bound::Included(last)) => Resolved::Partial {
            start,
            end: last.min(length - 1),
        },
        (Bound::Included(start), Bound::Unbounded) => Resolved::Partial {
            start,
            end: length - 1,
        },
        // `bytes=-n` comes out of the header as `(Unbounded, Included(n))`,
        // meaning the final n bytes rather than bytes 0..=n
        (Bound::Unbounded, Bound::Included(n)) => {
            if n == 0 || length == 0 {
                Resolved::Unsatisfiable
            } else {
                Resolved::Partial {
                    start: length.saturating_sub(n),
                    end: length - 1,
                }
            }
        }
        _ => Resolved::Full,
    }
}
