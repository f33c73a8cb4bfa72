//! Helpers shaping ranking filters and ranked result lists.

use std::collections::BTreeSet;

use super::types::{RankedHit, SelectDoc, SolrError};
use crate::store::RecordId;

/// Restrict a query to the `cutoff` largest ids of the hit set.
///
/// Returns an empty string when there is nothing to restrict to, otherwise `id:(a b c)` with the
/// ids in ascending order.
pub fn collection_filter(hitset: &BTreeSet<RecordId>, cutoff: usize) -> String {
    if hitset.is_empty() || cutoff == 0 {
        return String::new();
    }
    let skip = hitset.len().saturating_sub(cutoff);
    let ids: Vec<String> = hitset.iter().skip(skip).map(ToString::to_string).collect();
    format!("id:({})", ids.join(" "))
}

/// Turn Solr's best-first document list into a ranked list with the best hit last.
pub(crate) fn rank_documents(docs: &[SelectDoc]) -> Result<Vec<RankedHit>, SolrError> {
    let best = docs
        .iter()
        .filter_map(|doc| doc.score)
        .fold(0.0_f32, f32::max);

    let mut hits = docs
        .iter()
        .map(|doc| {
            let score = doc.score.unwrap_or(0.0);
            Ok(RankedHit {
                recid: doc.recid()?,
                score,
                relevance: relevance(score, best),
            })
        })
        .collect::<Result<Vec<_>, SolrError>>()?;
    hits.reverse();
    Ok(hits)
}

fn relevance(score: f32, best: f32) -> u8 {
    if best <= 0.0 {
        return 0;
    }
    ((score / best) * 100.0).round().clamp(0.0, 100.0) as u8
}
