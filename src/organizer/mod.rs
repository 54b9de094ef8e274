//! 跨箱整理：锁、注册表、整理引擎以及驱动它们的会话系统

pub mod container;
pub mod engine;
pub mod events;
pub mod lock;
pub mod registry;
pub mod session;
mod systems;

use bevy::prelude::*;
use crate::core::states::AppState;
use events::*;
use session::*;
use systems::*;

pub const MOD_ID: &str = "chest_organizer";

/// 本整理器分配的全局 id 前缀
pub const CHEST_PREFIX: &str = "chest_organizer-Chest-";

pub struct OrganizerPlugin;
impl Plugin for OrganizerPlugin {
    fn build(&self, app: &mut App) {
        app
            .init_resource::<OrganizerSession>()
            .init_resource::<ScreenStates>()
            .init_resource::<LastOrganizeReport>()
            .add_event::<ChestOpened>()
            .add_event::<ChestClosed>()
            .add_event::<OrganizeNow>()
            .add_event::<DayEnding>()
            .add_event::<OrganizerEdit>()
            .add_event::<OrganizeFinished>()
            .add_systems(OnEnter(AppState::InGame), begin_session)
            .add_systems(OnExit(AppState::InGame), end_session)
            .add_systems(
                Update,
                (
                    register_placed_chests,
                    on_chest_opened,
                    on_chest_closed,
                    apply_organizer_edits,
                    on_organize_now,
                    on_day_ending,
                )
                    .chain()
                    .run_if(in_state(AppState::InGame)),
            );
    }
}
