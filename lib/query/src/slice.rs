use spargebra::algebra::GraphPattern;
use spargebra::Query;

/// Reads the top-level `OFFSET`/`LIMIT` window of a `SELECT`.
///
/// Returns `None` for non-`SELECT` operations, `(0, None)` for an
/// unconstrained `SELECT`.
pub fn select_slice(query: &Query) -> Option<(usize, Option<usize>)> {
    match query {
        Query::Select {
            pattern: GraphPattern::Slice { start, length, .. },
            ..
        } => Some((*start, *length)),
        Query::Select { .. } => Some((0, None)),
        _ => None,
    }
}

/// Rewrites a `SELECT` to the window `OFFSET start LIMIT length`, replacing
/// any user-written window. Everything underneath the window — projection,
/// `DISTINCT`, `ORDER BY` — is untouched, so ordering across windows stays
/// coherent. Non-`SELECT` operations are returned unchanged.
pub fn with_slice(query: &Query, start: usize, length: usize) -> Query {
    match query {
        Query::Select {
            dataset,
            pattern,
            base_iri,
        } => {
            let inner = match pattern {
                GraphPattern::Slice { inner, .. } => (**inner).clone(),
                other => other.clone(),
            };
            Query::Select {
                dataset: dataset.clone(),
                pattern: GraphPattern::Slice {
                    inner: Box::new(inner),
                    start,
                    length: Some(length),
                },
                base_iri: base_iri.clone(),
            }
        }
        other => other.clone(),
    }
}
