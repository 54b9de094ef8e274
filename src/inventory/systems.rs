use super::{components::*, events::*};
use crate::core::events::LogEvent;
use crate::data::ItemCatalog;
use crate::organizer::container::Container;
use crate::organizer::session::OrganizerSession;
use bevy::prelude::*;

/// 按名字找箱子（忽略大小写）
pub fn find_chest<'a>(
    mut chests: impl Iterator<Item = (Entity, &'a Chest)>,
    label: &str,
) -> Option<Entity> {
    chests
        .find(|(_, c)| c.label.eq_ignore_ascii_case(label))
        .map(|(e, _)| e)
}

/// 处理 "place"：放下新箱子
pub fn place_chest(
    mut commands: Commands,
    mut ev_place: EventReader<PlaceChestEvent>,
    chests: Query<(Entity, &Chest)>,
    mut log: EventWriter<LogEvent>,
) {
    let mut placed: Vec<String> = Vec::new();
    for ev in ev_place.read() {
        let taken = find_chest(chests.iter(), &ev.label).is_some()
            || placed.iter().any(|l| l.eq_ignore_ascii_case(&ev.label));
        if taken {
            log.write(LogEvent(format!("已经有名为 {} 的箱子", ev.label)));
            continue;
        }
        commands.spawn(Chest::new(ev.label.clone(), ev.capacity));
        placed.push(ev.label.clone());
        info!("放下箱子 {} ({} 格)", ev.label, ev.capacity);
    }
}

/// 拆箱子：里面的东西一起消失，注册表条目留着
pub fn remove_chest(
    mut commands: Commands,
    mut ev_remove: EventReader<RemoveChestEvent>,
    chests: Query<(Entity, &Chest)>,
    mut log: EventWriter<LogEvent>,
) {
    for ev in ev_remove.read() {
        match find_chest(chests.iter(), &ev.label) {
            Some(entity) => {
                commands.entity(entity).despawn();
                info!("拆掉箱子 {}", ev.label);
            }
            None => {
                log.write(LogEvent(format!("找不到箱子 {}", ev.label)));
            }
        }
    }
}

/// 处理 "give"：往箱子里塞 ItemStack
pub fn give_item(
    mut ev_give: EventReader<GiveItemEvent>,
    mut chests: Query<&mut Chest>,
    catalog: Res<ItemCatalog>,
    mut log: EventWriter<LogEvent>,
) {
    for ev in ev_give.read() {
        let Some(proto) = catalog.find(&ev.id) else {
            warn!("不存在物品 ID {}", ev.id);
            continue;
        };
        let Some(mut chest) = chests
            .iter_mut()
            .find(|c| c.label.eq_ignore_ascii_case(&ev.chest))
        else {
            warn!("找不到箱子 {}", ev.chest);
            continue;
        };
        // 有人持锁时不能从外面塞东西
        if let Some(holder) = chest.mutex().holder() {
            log.write(LogEvent(format!("{} 正被 {holder} 使用，无法放入物品", chest.label)));
            continue;
        }

        let stack = ItemStack::new(proto.clone(), ev.count).with_quality(ev.quality);
        match chest.add_stack(stack) {
            None => info!("{} 获得 {} ×{}", chest.label, proto.name, ev.count),
            Some(rest) => warn!(
                "{} 已满，{} 只放进了 {} 个",
                chest.label,
                proto.name,
                ev.count - rest.count
            ),
        }
    }
}

/// 打印箱子内容
pub fn print_chests(
    mut ev_list: EventReader<ListChestsEvent>,
    chests: Query<&Chest>,
    session: Res<OrganizerSession>,
) {
    if ev_list.is_empty() {
        return;
    }
    ev_list.clear();

    let organizer = session.organizer();
    let mut all: Vec<&Chest> = chests.iter().collect();
    all.sort_by(|a, b| a.label.cmp(&b.label));
    if all.is_empty() {
        println!("  (no chests)");
        return;
    }

    for chest in all {
        let priority = chest
            .global_id
            .as_deref()
            .and_then(|id| organizer.and_then(|o| o.position(id)));
        let priority = priority.map_or("-".to_string(), |p| p.to_string());
        let holder = chest
            .mutex()
            .holder()
            .map_or(String::new(), |a| format!(" 🔒{a}"));
        println!(
            "{} [priority {}] {}/{} 格{}",
            chest.label,
            priority,
            chest.used_slots(),
            chest.capacity,
            holder
        );

        let mut empty = true;
        for (idx, stack) in chest.slots.iter().enumerate() {
            if let Some(stack) = stack {
                empty = false;
                println!(
                    "  [{idx}] {} ×{} q{} (id={})",
                    stack.proto.name, stack.count, stack.quality, stack.proto.id
                );
            }
        }
        if empty {
            println!("  (empty)");
        }
    }
}
