use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy::state::app::StatesPlugin;
use std::time::Duration;

use chest_organizer::core::{events::LogEvent, states::AppState};
use chest_organizer::data::DataPath;
use chest_organizer::interface::debug_cli::DebugCliPlugin;
use chest_organizer::organizer::MOD_ID;
use chest_organizer::GamePlugin;

fn main() -> anyhow::Result<()> {
    // 第一个参数可以指定数据文件
    let data_path = std::env::args().nth(1).map_or_else(DataPath::default, DataPath);

    let exit = App::new()
        .add_plugins(
            MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(
                1.0 / 30.0,
            ))), // 无窗口，实现“无 UI”
        )
        .add_plugins(LogPlugin {
            filter: format!("warn,{MOD_ID}=info"),
            ..default()
        })
        .add_plugins(StatesPlugin)
        .insert_resource(data_path)
        .add_plugins(GamePlugin)
        .add_plugins(DebugCliPlugin)
        .add_systems(Update, forward_log_event) // 简单打印
        .add_systems(Startup, |mut next: ResMut<NextState<AppState>>| {
            next.set(AppState::Loading);
        })
        .run();

    match exit {
        AppExit::Success => Ok(()),
        AppExit::Error(code) => anyhow::bail!("{MOD_ID} exited with code {code}"),
    }
}

fn forward_log_event(mut reader: EventReader<LogEvent>) {
    for e in reader.read() {
        println!("> {}", e.0);
    }
}
