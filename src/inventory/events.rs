use bevy::prelude::*;

/// 在世界里放一个箱子
#[derive(Event)]
pub struct PlaceChestEvent {
    pub label:    String,
    pub capacity: usize,
}

/// 拆掉箱子（注册表里的条目保留，整理时视为缺失）
#[derive(Event)]
pub struct RemoveChestEvent {
    pub label: String,
}

#[derive(Event)]
pub struct GiveItemEvent {
    pub chest:   String,
    pub id:      String,
    pub count:   u32,
    pub quality: u8,
}

#[derive(Event)]
pub struct ListChestsEvent;   // 让 CLI 请求打印所有箱子
