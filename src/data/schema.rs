use serde_derive::Deserialize;

use crate::core::resources::OrganizerConfig;

/// 物品静态表条目
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ItemEntry {
    pub id:   String,
    pub name: String,
    #[serde(default = "default_max_stack")] pub max_stack: u32,
    #[serde(default)] pub category: String,
}

fn default_max_stack() -> u32 {
    999
}

impl Default for ItemEntry {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            max_stack: default_max_stack(),
            category: String::new(),
        }
    }
}

/// `organizer.toml` 的整体结构
#[derive(Debug, Default, Deserialize)]
pub struct DataFile {
    #[serde(default)] pub config: OrganizerConfig,
    #[serde(default)] pub items:  Vec<ItemEntry>,
}
