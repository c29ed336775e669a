use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Times closer than this are considered the same submitted score.
pub const TIME_MATCH_EPSILON: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub time: f64,
}

impl LeaderboardEntry {
    pub fn new(name: impl Into<String>, time: f64) -> Self {
        Self {
            name: name.into(),
            time,
        }
    }
}

/// Best (lowest) time first. Stable, so equal times keep server order.
pub fn sort_entries(entries: Vec<LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    entries
        .into_iter()
        .sorted_by(|a, b| a.time.total_cmp(&b.time))
        .collect()
}

/// 1-based rank of a submission in a board returned by the server.
///
/// The server does not echo the new entry back, so the submission is
/// located by name plus a time within [`TIME_MATCH_EPSILON`]. Duplicate
/// names with near-identical times resolve to the first match.
pub fn find_rank(board: &[LeaderboardEntry], name: &str, time: f64) -> Option<usize> {
    board
        .iter()
        .position(|entry| entry.name == name && (entry.time - time).abs() < TIME_MATCH_EPSILON)
        .map(|idx| idx + 1)
}

/// Rank a time would take in an ascending board: one past every strictly
/// faster entry.
pub fn rank_by_time(board: &[LeaderboardEntry], time: f64) -> usize {
    1 + board.iter().filter(|entry| entry.time < time).count()
}
