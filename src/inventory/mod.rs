pub mod components;
pub mod events;
mod systems;

use bevy::prelude::*;
use crate::core::states::AppState;
use events::*;
use systems::*;

pub use systems::find_chest;

pub struct InventoryPlugin;
impl Plugin for InventoryPlugin {
    fn build(&self, app: &mut App) {
        app
            .add_event::<PlaceChestEvent>()
            .add_event::<RemoveChestEvent>()
            .add_event::<GiveItemEvent>()
            .add_event::<ListChestsEvent>()
            .add_systems(
                Update,
                (
                    place_chest,
                    remove_chest,
                    give_item,
                    print_chests,
                ).run_if(in_state(AppState::InGame)),
            );
    }
}
