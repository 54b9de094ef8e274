use bevy::prelude::*;
use serde_derive::Deserialize;

/// 日志详细程度
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum LogAmount {
    #[default]
    Less,
    More,
}

/// 整理功能配置，每次触发时现读
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OrganizerConfig {
    /// 新放下 / 新打开的箱子自动加入整理
    pub enabled_by_default: bool,
    /// 每天结束时自动整理
    pub organize_nightly: bool,
    pub log_amount: LogAmount,
}
