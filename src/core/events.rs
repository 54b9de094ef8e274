use bevy::prelude::*;

/// 打到控制台的一行输出
#[derive(Event)]
pub struct LogEvent(pub String);

/// 配置文件被改动，需要重新读取
#[derive(Event)]
pub struct ConfigChanged;
