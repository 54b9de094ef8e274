use bevy::prelude::*;

/// 应用大状态；整理会话只在 InGame 期间存在
#[derive(States, Debug, Clone, Eq, PartialEq, Hash, Default)]
pub enum AppState {
    #[default]
    Startup,
    Loading,
    /// 回到标题画面，会话已结束
    Title,
    InGame,
}
