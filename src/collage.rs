use serde::{Deserialize, Serialize};

use crate::leaderboard::LeaderboardEntry;

/// One layout slot in the 600x600 logical canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    #[serde(default)]
    pub rotate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub img_path: String,
    #[serde(default)]
    pub is_target: bool,
}

impl ImageRef {
    /// File name without directories, for labels.
    pub fn label(&self) -> &str {
        self.img_path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.img_path)
    }
}

/// Full round data as served by `GET /collage/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollageRecord {
    #[serde(default)]
    pub image_info: Vec<Slot>,
    #[serde(default)]
    pub images: Vec<ImageRef>,
    #[serde(default)]
    pub leaderboard: Vec<LeaderboardEntry>,
}

impl CollageRecord {
    /// Index of the search target; the first flagged image wins.
    pub fn target_index(&self) -> Option<usize> {
        self.images.iter().position(|img| img.is_target)
    }

    pub fn decoy_indices(&self) -> Vec<usize> {
        self.images
            .iter()
            .enumerate()
            .filter(|(_, img)| !img.is_target)
            .map(|(idx, _)| idx)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryItem {
    pub id: String,
    #[serde(default)]
    pub preview_src: String,
    #[serde(default)]
    pub updated_at: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Gallery {
    #[serde(default)]
    pub items: Vec<GalleryItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardResponse {
    #[serde(default)]
    pub leaderboard: Vec<LeaderboardEntry>,
}
