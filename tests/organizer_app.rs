use bevy::prelude::*;
use bevy::state::app::StatesPlugin;

use chest_organizer::core::resources::OrganizerConfig;
use chest_organizer::core::states::AppState;
use chest_organizer::data::schema::ItemEntry;
use chest_organizer::data::DataPath;
use chest_organizer::inventory::components::{Chest, ItemStack};
use chest_organizer::inventory::events::GiveItemEvent;
use chest_organizer::organizer::engine::ConsolidationReport;
use chest_organizer::organizer::events::*;
use chest_organizer::organizer::lock::{ActorId, LockHandle};
use chest_organizer::organizer::registry::is_organizer_id;
use chest_organizer::organizer::session::{
    LastOrganizeReport, OrganizerSession, PlayerId, ScreenStates,
};
use chest_organizer::GamePlugin;

// ------------------------- helpers -------------------------

fn app_with(config: OrganizerConfig) -> App {
    let mut app = App::new();
    app.add_plugins((MinimalPlugins, StatesPlugin))
        .insert_resource(DataPath("tests/no-such-file.toml".into()))
        .add_plugins(GamePlugin);

    app.world_mut()
        .resource_mut::<NextState<AppState>>()
        .set(AppState::Loading);
    app.update(); // Loading：读数据
    app.update(); // InGame：会话开始
    assert_eq!(
        *app.world().resource::<State<AppState>>().get(),
        AppState::InGame
    );
    assert!(app.world().resource::<OrganizerSession>().is_active());

    app.insert_resource(config);
    app
}

fn enabled() -> OrganizerConfig {
    OrganizerConfig {
        enabled_by_default: true,
        organize_nightly: true,
        ..Default::default()
    }
}

fn wood(count: u32) -> Option<ItemStack> {
    let proto = ItemEntry {
        id: "wood".into(),
        name: "Wood".into(),
        max_stack: 999,
        category: "Resource".into(),
    };
    Some(ItemStack::new(proto, count))
}

/// 放一个箱子并跑一帧，保证注册顺序就是放置顺序
fn place(app: &mut App, label: &str, slots: Vec<Option<ItemStack>>) -> Entity {
    let mut chest = Chest::new(label, 9);
    chest.slots = slots;
    let entity = app.world_mut().spawn(chest).id();
    app.update();
    entity
}

fn wood_in(app: &App, entity: Entity) -> u32 {
    app.world().get::<Chest>(entity).unwrap().count_item("wood")
}

fn global_id(app: &App, entity: Entity) -> String {
    app.world()
        .get::<Chest>(entity)
        .unwrap()
        .global_id
        .clone()
        .unwrap()
}

fn registered(app: &App) -> Vec<String> {
    app.world()
        .resource::<OrganizerSession>()
        .organizer()
        .map(|o| o.ids().map(str::to_string).collect())
        .unwrap_or_default()
}

fn organize(app: &mut App, player: Option<PlayerId>) -> ConsolidationReport {
    app.world_mut().send_event(OrganizeNow { player });
    app.update();
    last_report(app)
}

fn last_report(app: &App) -> ConsolidationReport {
    app.world()
        .resource::<LastOrganizeReport>()
        .0
        .clone()
        .expect("a pass should have run")
}

// ------------------------- cases -------------------------

#[test]
fn placed_chests_register_in_order_and_merge_by_priority() {
    let mut app = app_with(enabled());
    let a = place(&mut app, "a", vec![wood(1)]);
    let b = place(&mut app, "b", vec![wood(50)]);
    let c = place(&mut app, "c", vec![wood(30)]);

    let ids = registered(&app);
    assert_eq!(ids, vec![global_id(&app, a), global_id(&app, b), global_id(&app, c)]);
    assert!(ids.iter().all(|id| is_organizer_id(id)));

    let report = organize(&mut app, None);

    assert_eq!(wood_in(&app, a), 81);
    assert_eq!(wood_in(&app, b), 0);
    assert_eq!(wood_in(&app, c), 0);
    assert_eq!(report.units_moved, 80);

    // 代理快照跟着刷新
    let session = app.world().resource::<OrganizerSession>();
    let proxy = session.organizer().unwrap().get(&global_id(&app, a)).unwrap();
    assert_eq!(proxy.contents, app.world().get::<Chest>(a).unwrap().slots);
}

#[test]
fn finished_event_carries_report() {
    let mut app = app_with(enabled());
    place(&mut app, "a", vec![wood(1)]);
    place(&mut app, "b", vec![wood(2)]);

    let report = organize(&mut app, None);

    let events = app.world().resource::<Events<OrganizeFinished>>();
    let mut cursor = events.get_cursor();
    let finished: Vec<&OrganizeFinished> = cursor.read(events).collect();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].report, report);
    assert_eq!(finished[0].chest, None);
}

#[test]
fn disabled_auto_registration_needs_explicit_add() {
    let mut app = app_with(OrganizerConfig::default());
    let a = place(&mut app, "a", vec![wood(1)]);
    let b = place(&mut app, "b", vec![wood(2)]);
    assert!(registered(&app).is_empty());

    app.world_mut().send_event(OrganizerEdit::Add(a));
    app.world_mut().send_event(OrganizerEdit::Add(b));
    app.update();

    assert_eq!(registered(&app).len(), 2);
    organize(&mut app, None);
    assert_eq!(wood_in(&app, a), 3);
}

#[test]
fn day_ending_respects_schedule_flag() {
    let mut app = app_with(OrganizerConfig {
        enabled_by_default: true,
        organize_nightly: false,
        ..Default::default()
    });
    let a = place(&mut app, "a", vec![wood(1)]);
    place(&mut app, "b", vec![wood(2)]);

    app.world_mut().send_event(DayEnding);
    app.update();
    assert_eq!(wood_in(&app, a), 1);
    assert!(app.world().resource::<LastOrganizeReport>().0.is_none());

    app.world_mut().resource_mut::<OrganizerConfig>().organize_nightly = true;
    app.world_mut().send_event(DayEnding);
    app.update();
    assert_eq!(wood_in(&app, a), 3);
}

#[test]
fn chest_held_by_another_player_is_skipped_until_closed() {
    let mut app = app_with(enabled());
    let a = place(&mut app, "a", vec![wood(1)]);
    let b = place(&mut app, "b", vec![wood(50)]);
    let c = place(&mut app, "c", vec![wood(30)]);

    let guest = PlayerId(2);
    app.world_mut().send_event(ChestOpened { player: guest, chest: b });
    app.update();

    let report = organize(&mut app, None);
    assert_eq!(report.contended, vec![global_id(&app, b)]);
    assert!(report.incomplete());
    assert_eq!(wood_in(&app, b), 50);
    assert_eq!(wood_in(&app, a), 31);
    assert_eq!(wood_in(&app, c), 0);
    // 玩家的锁没被动过
    let chest_b = app.world().get::<Chest>(b).unwrap();
    assert!(chest_b.mutex().is_held_by(guest.actor()));

    app.world_mut().send_event(ChestClosed { player: guest });
    app.update();
    assert_eq!(app.world().get::<Chest>(b).unwrap().mutex().holder(), None);

    let report = organize(&mut app, None);
    assert!(!report.incomplete());
    assert_eq!(wood_in(&app, a), 81);
}

#[test]
fn outside_lock_is_never_released_by_a_pass() {
    let mut app = app_with(enabled());
    let a = place(&mut app, "a", vec![wood(1)]);
    let b = place(&mut app, "b", vec![wood(5)]);

    let outsider = ActorId(999);
    assert!(app.world().get::<Chest>(a).unwrap().mutex().try_acquire(outsider));

    let report = organize(&mut app, None);
    assert_eq!(report.skipped_pairs, 1);
    assert_eq!(wood_in(&app, b), 5);
    assert_eq!(
        app.world().get::<Chest>(a).unwrap().mutex().holder(),
        Some(outsider)
    );
    assert_eq!(app.world().get::<Chest>(b).unwrap().mutex().holder(), None);
}

#[test]
fn organize_from_open_chest_registers_it_and_reopens() {
    let mut app = app_with(OrganizerConfig::default());
    let a = place(&mut app, "a", vec![wood(1)]);
    let b = place(&mut app, "b", vec![wood(9)]);
    app.world_mut().send_event(OrganizerEdit::Add(a));
    app.update();

    let host = PlayerId(1);
    app.world_mut().send_event(ChestOpened { player: host, chest: b });
    app.update();
    assert_eq!(registered(&app).len(), 1);

    let report = organize(&mut app, Some(host));

    assert_eq!(registered(&app).len(), 2);
    assert_eq!(report.units_moved, 9);
    assert_eq!(wood_in(&app, a), 10);
    let chest_b = app.world().get::<Chest>(b).unwrap();
    assert!(chest_b.mutex().is_held_by(host.actor()));
}

#[test]
fn reorder_changes_who_receives() {
    let mut app = app_with(enabled());
    let a = place(&mut app, "a", vec![wood(1)]);
    let b = place(&mut app, "b", vec![wood(2)]);
    let order = vec![global_id(&app, b), global_id(&app, a)];

    app.world_mut().send_event(OrganizerEdit::Reorder(order.clone()));
    app.update();
    assert_eq!(registered(&app), order);

    organize(&mut app, None);
    assert_eq!(wood_in(&app, b), 3);
    assert_eq!(wood_in(&app, a), 0);
}

#[test]
fn destroyed_chest_is_reported_missing_but_stays_registered() {
    let mut app = app_with(enabled());
    let a = place(&mut app, "a", vec![wood(1)]);
    let b = place(&mut app, "b", vec![wood(2)]);
    let c = place(&mut app, "c", vec![wood(3)]);

    app.world_mut().entity_mut(b).despawn();
    let report = organize(&mut app, None);

    assert_eq!(report.missing, vec![1]);
    assert_eq!(wood_in(&app, a), 4);
    assert_eq!(wood_in(&app, c), 0);
    assert_eq!(registered(&app).len(), 3);
}

#[test]
fn removed_chest_reverts_to_local_when_opened() {
    let mut app = app_with(enabled());
    let a = place(&mut app, "a", vec![wood(1)]);
    let id = global_id(&app, a);

    app.insert_resource(OrganizerConfig::default());
    app.world_mut().send_event(OrganizerEdit::Remove(id.to_uppercase()));
    app.update();
    assert!(registered(&app).is_empty());

    app.world_mut().send_event(ChestOpened { player: PlayerId(1), chest: a });
    app.update();
    assert_eq!(app.world().get::<Chest>(a).unwrap().global_id, None);
}

#[test]
fn leaving_the_game_clears_session_and_player_locks() {
    let mut app = app_with(enabled());
    let a = place(&mut app, "a", vec![wood(1)]);
    app.world_mut().send_event(ChestOpened { player: PlayerId(1), chest: a });
    app.update();
    assert!(app.world().get::<Chest>(a).unwrap().mutex().holder().is_some());

    app.world_mut()
        .resource_mut::<NextState<AppState>>()
        .set(AppState::Title);
    app.update();

    assert!(!app.world().resource::<OrganizerSession>().is_active());
    assert_eq!(app.world().get::<Chest>(a).unwrap().mutex().holder(), None);

    app.world_mut()
        .resource_mut::<NextState<AppState>>()
        .set(AppState::InGame);
    app.update();
    assert!(registered(&app).is_empty());
}

#[test]
fn give_is_refused_while_chest_is_locked() {
    let mut app = app_with(enabled());
    let a = place(&mut app, "a", vec![]);
    let give = || GiveItemEvent {
        chest: "a".into(),
        id: "wood".into(),
        count: 5,
        quality: 0,
    };

    let outsider = ActorId(999);
    assert!(app.world().get::<Chest>(a).unwrap().mutex().try_acquire(outsider));
    app.world_mut().send_event(give());
    app.update();
    assert_eq!(wood_in(&app, a), 0);

    app.world().get::<Chest>(a).unwrap().mutex().release(outsider).unwrap();
    app.world_mut().send_event(give());
    app.update();
    assert_eq!(wood_in(&app, a), 5);
}

#[test]
fn oversized_give_respects_max_stack() {
    let mut app = app_with(enabled());
    let a = place(&mut app, "a", vec![]);

    app.world_mut().send_event(GiveItemEvent {
        chest: "a".into(),
        id: "sword".into(),
        count: 4,
        quality: 0,
    });
    app.update();

    let chest = app.world().get::<Chest>(a).unwrap();
    assert_eq!(chest.count_item("sword"), 4);
    assert_eq!(chest.used_slots(), 4);
}

#[test]
fn screen_is_organized_only_for_matching_kind() {
    let mut app = app_with(enabled());
    let a = place(&mut app, "a", vec![wood(1)]);
    let player = PlayerId(1);

    app.world_mut().send_event(ChestOpened { player, chest: a });
    app.update();
    assert!(app.world().resource::<ScreenStates>().get(player).unwrap().enabled);

    app.world_mut().send_event(ChestClosed { player });
    app.update();
    app.world_mut().get_mut::<Chest>(a).unwrap().kind = "StoneChest".into();
    app.world_mut().send_event(ChestOpened { player, chest: a });
    app.update();

    assert!(!app.world().resource::<ScreenStates>().get(player).unwrap().enabled);
    assert_eq!(registered(&app), vec![global_id(&app, a)]);
}

#[test]
fn reopening_own_chest_keeps_the_lock() {
    let mut app = app_with(enabled());
    let a = place(&mut app, "a", vec![wood(1)]);
    let player = PlayerId(1);

    app.world_mut().send_event(ChestOpened { player, chest: a });
    app.update();
    app.world_mut().send_event(ChestOpened { player, chest: a });
    app.update();

    let screens = app.world().resource::<ScreenStates>();
    assert_eq!(screens.open_chest(player), Some(a));
    assert!(app.world().get::<Chest>(a).unwrap().mutex().is_held_by(player.actor()));
}
