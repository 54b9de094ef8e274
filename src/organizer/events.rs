use bevy::prelude::*;

use super::engine::ConsolidationReport;
use super::session::PlayerId;

/// 玩家打开箱子
#[derive(Event, Debug, Clone)]
pub struct ChestOpened {
    pub player: PlayerId,
    pub chest:  Entity,
}

/// 玩家关掉当前箱子界面
#[derive(Event, Debug, Clone)]
pub struct ChestClosed {
    pub player: PlayerId,
}

/// 手动整理；`player` 有箱子开着时先把那个箱子加入整理器
#[derive(Event, Debug, Clone)]
pub struct OrganizeNow {
    pub player: Option<PlayerId>,
}

/// 一天结束（定时触发）
#[derive(Event, Debug, Clone)]
pub struct DayEnding;

/// 优先级编辑界面提交的改动
#[derive(Event, Debug, Clone)]
pub enum OrganizerEdit {
    Add(Entity),
    Remove(String),
    Reorder(Vec<String>),
}

/// 整理完成；播放音效 / 重开界面由调用方处理
#[derive(Event, Debug, Clone)]
pub struct OrganizeFinished {
    pub report: ConsolidationReport,
    pub chest:  Option<Entity>,
}
