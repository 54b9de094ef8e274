use bevy::prelude::*;
use std::collections::HashMap;

use super::engine::{ConsolidationReport, Consolidator};
use super::events::*;
use super::lock::{ActorId, LockHandle};
use super::registry::{ensure_global_id, is_organizer_id, Organizer};
use super::session::*;
use crate::core::events::LogEvent;
use crate::core::resources::OrganizerConfig;
use crate::inventory::components::Chest;

/* ---------------------------- 会话生命周期 ---------------------------- */

pub fn begin_session(
    mut session: ResMut<OrganizerSession>,
    mut last: ResMut<LastOrganizeReport>,
) {
    session.begin();
    last.0 = None;
    info!("整理器会话开始");
}

/// 离开 InGame：放掉玩家开箱时持有的锁，清空整理器
pub fn end_session(
    mut session: ResMut<OrganizerSession>,
    mut screens: ResMut<ScreenStates>,
    chests: Query<&Chest>,
) {
    for (player, screen) in screens.drain() {
        let Some(chest) = screen.open_chest.and_then(|e| chests.get(e).ok()) else {
            continue;
        };
        if chest.mutex().is_held_by(player.actor()) {
            let _ = chest.mutex().release(player.actor());
        }
    }
    session.end();
    info!("整理器会话结束");
}

/* ---------------------------- 自动注册 ---------------------------- */

/// 新放下的箱子
pub fn register_placed_chests(
    mut placed: Query<&mut Chest, Added<Chest>>,
    mut session: ResMut<OrganizerSession>,
    config: Res<OrganizerConfig>,
) {
    if !config.enabled_by_default {
        return;
    }
    let Some(organizer) = session.organizer_mut() else {
        return;
    };

    for mut chest in placed.iter_mut() {
        try_add_to_organizer(organizer, &mut chest);
    }
}

pub fn on_chest_opened(
    mut events: EventReader<ChestOpened>,
    mut chests: Query<&mut Chest>,
    mut session: ResMut<OrganizerSession>,
    mut screens: ResMut<ScreenStates>,
    config: Res<OrganizerConfig>,
    mut log: EventWriter<LogEvent>,
) {
    for ev in events.read() {
        // 同一玩家同时只开一个箱子
        if screens.open_chest(ev.player).is_some_and(|e| e != ev.chest) {
            close_screen(ev.player, &mut screens, &chests, session.organizer_mut());
        }

        let Ok(mut chest) = chests.get_mut(ev.chest) else {
            warn!("箱子 {:?} 不存在", ev.chest);
            continue;
        };
        let actor = ev.player.actor();
        // 锁不可重入：自己已经开着就不用再拿
        if !chest.mutex().is_held_by(actor) && !chest.mutex().try_acquire(actor) {
            log.write(LogEvent(format!("{} 正在被其他玩家使用", chest.label)));
            continue;
        }

        let screen = screens.entry(ev.player);
        screen.open_chest = Some(ev.chest);
        screen.enabled = false;
        let Some(organizer) = session.organizer_mut() else {
            continue;
        };

        if config.enabled_by_default {
            try_add_to_organizer(organizer, &mut chest);
        } else if chest
            .global_id
            .as_deref()
            .is_some_and(|id| is_organizer_id(id) && !organizer.contains(id))
        {
            // 已被移出整理器的箱子转回普通箱子
            debug!("{} 转回普通箱子", chest.label);
            chest.global_id = None;
        }

        screen.enabled = organizer.holds(&chest);
    }
}

/// 关界面时把活箱子同步回代理
pub fn on_chest_closed(
    mut events: EventReader<ChestClosed>,
    chests: Query<&mut Chest>,
    mut session: ResMut<OrganizerSession>,
    mut screens: ResMut<ScreenStates>,
) {
    for ev in events.read() {
        close_screen(ev.player, &mut screens, &chests, session.organizer_mut());
    }
}

/// 优先级编辑界面的改动
pub fn apply_organizer_edits(
    mut events: EventReader<OrganizerEdit>,
    mut chests: Query<&mut Chest>,
    mut session: ResMut<OrganizerSession>,
    mut log: EventWriter<LogEvent>,
) {
    for edit in events.read() {
        let Some(organizer) = session.organizer_mut() else {
            continue;
        };
        match edit {
            OrganizerEdit::Add(entity) => {
                if let Ok(mut chest) = chests.get_mut(*entity) {
                    if try_add_to_organizer(organizer, &mut chest) {
                        log.write(LogEvent(format!("{} 已加入整理器", chest.label)));
                    }
                }
            }
            OrganizerEdit::Remove(id) => {
                let line = match organizer.remove(id) {
                    Some(proxy) => format!("已移出 {}", proxy.display_name()),
                    None => format!("整理器里没有 {id}"),
                };
                log.write(LogEvent(line));
            }
            OrganizerEdit::Reorder(ids) => {
                let line = match organizer.reorder(ids) {
                    Ok(()) => "优先级已更新".to_string(),
                    Err(e) => format!("无法调整顺序: {e}"),
                };
                log.write(LogEvent(line));
            }
        }
    }
}

/* ---------------------------- 触发整理 ---------------------------- */

pub fn on_organize_now(
    mut events: EventReader<OrganizeNow>,
    mut chests: Query<&mut Chest>,
    mut session: ResMut<OrganizerSession>,
    mut screens: ResMut<ScreenStates>,
    config: Res<OrganizerConfig>,
    mut last: ResMut<LastOrganizeReport>,
    mut finished: EventWriter<OrganizeFinished>,
    mut log: EventWriter<LogEvent>,
) {
    for ev in events.read() {
        let Some(organizer) = session.organizer_mut() else {
            continue;
        };
        let open = ev
            .player
            .and_then(|p| screens.open_chest(p).map(|e| (p, e)));

        // 玩家开着的箱子先加入整理器，并暂时放开玩家的锁
        if let Some((player, entity)) = open {
            if let Ok(mut chest) = chests.get_mut(entity) {
                try_add_to_organizer(organizer, &mut chest);
                if chest.mutex().is_held_by(player.actor()) {
                    let _ = chest.mutex().release(player.actor());
                }
            }
        }

        let report = run_pass(organizer, &mut chests, &config);

        // 重新打开界面
        if let Some((player, entity)) = open {
            if let Ok(chest) = chests.get(entity) {
                if !chest.mutex().try_acquire(player.actor()) {
                    warn!("{} 整理后被他人占用，界面关闭", chest.label);
                    screens.entry(player).open_chest = None;
                } else {
                    screens.entry(player).enabled = organizer.holds(chest);
                }
            }
        }

        log.write(LogEvent(summary(&report)));
        last.0 = Some(report.clone());
        finished.write(OrganizeFinished {
            report,
            chest: open.map(|(_, e)| e),
        });
    }
}

/// 一天结束时整理；配置每次现读
pub fn on_day_ending(
    mut events: EventReader<DayEnding>,
    mut chests: Query<&mut Chest>,
    mut session: ResMut<OrganizerSession>,
    config: Res<OrganizerConfig>,
    mut last: ResMut<LastOrganizeReport>,
    mut finished: EventWriter<OrganizeFinished>,
    mut log: EventWriter<LogEvent>,
) {
    if events.is_empty() {
        return;
    }
    events.clear();

    if !config.organize_nightly {
        return;
    }
    let Some(organizer) = session.organizer_mut() else {
        return;
    };

    let report = run_pass(organizer, &mut chests, &config);
    log.write(LogEvent(summary(&report)));
    last.0 = Some(report.clone());
    finished.write(OrganizeFinished { report, chest: None });
}

/* ---------------------------- 工具函数 ---------------------------- */

fn try_add_to_organizer(organizer: &mut Organizer, chest: &mut Chest) -> bool {
    if !chest.player_chest || organizer.holds(chest) {
        return false;
    }
    ensure_global_id(chest);
    match organizer.add_proxy(chest) {
        Ok(added) => {
            if added {
                info!("Adding chest {} to organizer", chest.label);
            }
            added
        }
        Err(e) => {
            warn!("{e}");
            false
        }
    }
}

fn close_screen(
    player: PlayerId,
    screens: &mut ScreenStates,
    chests: &Query<&mut Chest>,
    organizer: Option<&mut Organizer>,
) {
    let screen = screens.entry(player);
    screen.enabled = false;
    let Some(entity) = screen.open_chest.take() else {
        return;
    };
    // 箱子已被拆掉
    let Ok(chest) = chests.get(entity) else {
        return;
    };

    if let Some(organizer) = organizer {
        if organizer.sync_backup(chest) {
            debug!("proxy of {} synchronized", chest.label);
        }
    }
    if let Err(e) = chest.mutex().release(player.actor()) {
        warn!("{e}");
    }
}

/// 把注册表解析成活箱子，跑一趟整理，然后刷新代理
fn run_pass(
    organizer: &mut Organizer,
    chests: &mut Query<&mut Chest>,
    config: &OrganizerConfig,
) -> ConsolidationReport {
    let mut live: HashMap<String, Mut<Chest>> = HashMap::new();
    for chest in chests.iter_mut() {
        let Some(key) = chest.global_id.as_ref().map(|id| id.to_ascii_lowercase()) else {
            continue;
        };
        live.insert(key, chest);
    }

    let mut resolved: Vec<Option<Mut<Chest>>> = organizer
        .ids()
        .map(|id| live.remove(&id.to_ascii_lowercase()))
        .collect();
    let mut slots: Vec<Option<&mut Chest>> =
        resolved.iter_mut().map(|c| c.as_deref_mut()).collect();

    let report = Consolidator::new(ActorId::ORGANIZER)
        .with_log_amount(config.log_amount)
        .consolidate(&mut slots);
    drop(slots);

    for chest in resolved.iter().flatten() {
        organizer.sync_backup(chest);
    }
    report
}

fn summary(report: &ConsolidationReport) -> String {
    let mut line = format!(
        "整理完成：移动 {} 堆 / {} 个物品",
        report.stacks_moved, report.units_moved
    );
    if !report.contended.is_empty() {
        line.push_str(&format!("，{} 个箱子被占用已跳过", report.contended.len()));
    }
    if !report.missing.is_empty() {
        line.push_str(&format!("，{} 个箱子不存在", report.missing.len()));
    }
    line
}
