pub mod schema;
pub mod loader;

use bevy::prelude::*;
use schema::ItemEntry;
use crate::core::{events::ConfigChanged, resources::OrganizerConfig, states::AppState};

// --------------------------- 资源 ---------------------------
/// 数据文件位置
#[derive(Resource, Clone, Debug)]
pub struct DataPath(pub String);

impl Default for DataPath {
    fn default() -> Self {
        Self("assets/organizer.toml".into())
    }
}

/// 物品静态表
#[derive(Resource, Default, Debug)]
pub struct ItemCatalog {
    pub items: Vec<ItemEntry>,
}

impl ItemCatalog {
    /// 按 id 或名称查找（忽略大小写）
    pub fn find(&self, token: &str) -> Option<&ItemEntry> {
        self.items
            .iter()
            .find(|e| e.id.eq_ignore_ascii_case(token) || e.name.eq_ignore_ascii_case(token))
    }

    /// 数据文件缺失时的内置表
    pub fn builtin() -> Self {
        let entry = |id: &str, name: &str, max_stack: u32, category: &str| ItemEntry {
            id: id.into(),
            name: name.into(),
            max_stack,
            category: category.into(),
        };
        Self {
            items: vec![
                entry("wood", "Wood", 999, "Resource"),
                entry("stone", "Stone", 999, "Resource"),
                entry("fiber", "Fiber", 999, "Resource"),
                entry("copper_ore", "Copper Ore", 999, "Resource"),
                entry("parsnip", "Parsnip", 999, "Vegetable"),
                entry("sword", "Rusty Sword", 1, "Weapon"),
            ],
        }
    }
}

// --------------------------- 插件 ---------------------------
pub struct DataPlugin;
impl Plugin for DataPlugin {
    fn build(&self, app: &mut App) {
        app
            .init_resource::<DataPath>()
            .init_resource::<ItemCatalog>()
            .add_systems(OnEnter(AppState::Loading), load_data)
            .add_systems(Update, reload_config.run_if(on_event::<ConfigChanged>));
    }
}

// --------------------------- 系统 ---------------------------
fn load_data(
    mut commands: Commands,
    mut next: ResMut<NextState<AppState>>,
    path: Res<DataPath>,
) {
    match loader::load_data_file(&path.0) {
        Ok(data) => {
            let catalog = if data.items.is_empty() {
                ItemCatalog::builtin()
            } else {
                ItemCatalog { items: data.items }
            };
            info!("✔ Items loaded: {}", catalog.items.len());
            commands.insert_resource(data.config);
            commands.insert_resource(catalog);
        }
        Err(e) => {
            warn!("{}: {e}，使用默认配置", path.0);
            commands.insert_resource(OrganizerConfig::default());
            commands.insert_resource(ItemCatalog::builtin());
        }
    }
    next.set(AppState::InGame);
}

/// 配置改动后重新读文件；读不到就保留当前配置
fn reload_config(
    mut events: EventReader<ConfigChanged>,
    mut config: ResMut<OrganizerConfig>,
    path: Res<DataPath>,
) {
    events.clear();
    match loader::load_data_file(&path.0) {
        Ok(data) => {
            info!("配置已重新载入: {:?}", data.config);
            *config = data.config;
        }
        Err(e) => warn!("重新载入 {} 失败: {e}", path.0),
    }
}
