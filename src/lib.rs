//! 多箱整理：把低优先级箱子里可堆叠的物品并入高优先级箱子

use bevy::prelude::*;

pub mod core;
pub mod data;
pub mod interface;
pub mod inventory;
pub mod organizer;

/// 游戏逻辑插件合集（不含控制台）
pub struct GamePlugin;

impl Plugin for GamePlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            crate::core::CorePlugin,
            data::DataPlugin,
            inventory::InventoryPlugin,
            organizer::OrganizerPlugin,
        ));
    }
}
