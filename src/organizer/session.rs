use bevy::prelude::*;
use std::collections::HashMap;

use super::engine::ConsolidationReport;
use super::lock::ActorId;
use super::registry::Organizer;

/// 会话级整理器：进入 InGame 时创建，离开时清空
#[derive(Resource, Default, Debug)]
pub struct OrganizerSession {
    organizer: Option<Organizer>,
}

impl OrganizerSession {
    pub fn begin(&mut self) {
        self.organizer = Some(Organizer::new());
    }

    pub fn end(&mut self) {
        self.organizer = None;
    }

    pub fn is_active(&self) -> bool {
        self.organizer.is_some()
    }

    pub fn organizer(&self) -> Option<&Organizer> {
        self.organizer.as_ref()
    }

    pub fn organizer_mut(&mut self) -> Option<&mut Organizer> {
        self.organizer.as_mut()
    }
}

/// 玩家编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u32);

impl PlayerId {
    /// 玩家打开箱子时以这个身份持锁；0 留给整理引擎
    pub fn actor(self) -> ActorId {
        ActorId(u64::from(self.0) + 1)
    }
}

/// 单个玩家当前的界面状态
#[derive(Debug, Clone, Default)]
pub struct ScreenState {
    pub open_chest: Option<Entity>,
    /// 打开的箱子是否在整理器里
    pub enabled: bool,
}

/// 按玩家分开的界面状态
#[derive(Resource, Default, Debug)]
pub struct ScreenStates(HashMap<PlayerId, ScreenState>);

impl ScreenStates {
    pub fn get(&self, player: PlayerId) -> Option<&ScreenState> {
        self.0.get(&player)
    }

    pub fn entry(&mut self, player: PlayerId) -> &mut ScreenState {
        self.0.entry(player).or_default()
    }

    pub fn open_chest(&self, player: PlayerId) -> Option<Entity> {
        self.get(player).and_then(|s| s.open_chest)
    }

    pub fn drain(&mut self) -> impl Iterator<Item = (PlayerId, ScreenState)> + '_ {
        self.0.drain()
    }
}

/// 最近一次整理的结果
#[derive(Resource, Default, Debug)]
pub struct LastOrganizeReport(pub Option<ConsolidationReport>);
