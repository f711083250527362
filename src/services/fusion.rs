//! Score fusion for heterogeneous retrieval channels.
//!
//! Merges independently-scored semantic and keyword result sets into one
//! ranking by weighted sum. Result identity is the fingerprint (document
//! id, or a truncated-content key for anonymous chunks); a score missing
//! on one channel defaults to zero.

use std::collections::HashMap;

use crate::domain::models::SearchResult;

/// Combine semantic and keyword result sets into one descending ranking.
///
/// `combined_score = semantic_score * w_semantic + keyword_score *
/// w_keyword`. The sort is stable: results with equal combined scores
/// keep their first-seen input order (semantic results first, then
/// keyword-only results).
pub fn fuse(
    semantic: Vec<SearchResult>,
    keyword: Vec<SearchResult>,
    w_semantic: f32,
    w_keyword: f32,
) -> Vec<SearchResult> {
    let mut merged: Vec<SearchResult> = Vec::with_capacity(semantic.len() + keyword.len());
    let mut index_by_fingerprint: HashMap<String, usize> = HashMap::new();

    for result in semantic {
        let fingerprint = result.fingerprint();
        match index_by_fingerprint.get(&fingerprint) {
            Some(&i) => {
                // Duplicate within the semantic set: keep the better score.
                if result.semantic_score > merged[i].semantic_score {
                    merged[i].semantic_score = result.semantic_score;
                }
            }
            None => {
                index_by_fingerprint.insert(fingerprint, merged.len());
                merged.push(SearchResult {
                    keyword_score: 0.0,
                    ..result
                });
            }
        }
    }

    for result in keyword {
        let fingerprint = result.fingerprint();
        match index_by_fingerprint.get(&fingerprint) {
            Some(&i) => {
                if result.keyword_score > merged[i].keyword_score {
                    merged[i].keyword_score = result.keyword_score;
                }
            }
            None => {
                index_by_fingerprint.insert(fingerprint, merged.len());
                merged.push(SearchResult {
                    semantic_score: 0.0,
                    ..result
                });
            }
        }
    }

    for result in &mut merged {
        result.combined_score =
            result.semantic_score * w_semantic + result.keyword_score * w_keyword;
    }

    // Stable sort keeps input order for equal combined scores.
    merged.sort_by(|a, b| {
        b.combined_score
            .partial_cmp(&a.combined_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    merged
}
