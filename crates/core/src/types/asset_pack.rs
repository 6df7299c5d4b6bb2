//! Asset pack promotion shown on the landing page.

use serde::{Deserialize, Serialize};

/// Promotional block for the downloadable asset pack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssetPack {
    pub show_ribbon: bool,
    pub ribbon_text: String,
    pub title: String,
    /// Display price; free text so it can read "TBA" before launch.
    pub price: String,
    pub description: String,
    pub features: Vec<String>,
    /// Launch state as understood by the front end (e.g. `coming_soon`).
    pub status: String,
}

impl Default for AssetPack {
    fn default() -> Self {
        Self {
            show_ribbon: true,
            ribbon_text: "COMING SOON".to_string(),
            title: "ALL-IN-ONE ASSET PACK".to_string(),
            price: String::new(),
            description: "Complete GFX Asset Collection".to_string(),
            features: vec![
                "Commercial License".to_string(),
                "50+ Thumbnails".to_string(),
                "Stream Overlays".to_string(),
                "Transition Pack".to_string(),
            ],
            status: "coming_soon".to_string(),
        }
    }
}
