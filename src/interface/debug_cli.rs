//! 文字 CLI：读取 stdin → 解析命令 → 执行并打印

use bevy::app::AppExit;
use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use once_cell::sync::Lazy;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crate::core::events::{ConfigChanged, LogEvent};
use crate::core::states::AppState;
use crate::data::ItemCatalog;
use crate::inventory::components::Chest;
use crate::inventory::events::{GiveItemEvent, ListChestsEvent, PlaceChestEvent, RemoveChestEvent};
use crate::inventory::find_chest;
use crate::organizer::events::{ChestClosed, ChestOpened, DayEnding, OrganizeNow, OrganizerEdit};
use crate::organizer::lock::{ActorId, LockHandle};
use crate::organizer::session::{LastOrganizeReport, OrganizerSession, PlayerId};

static CLI_BUFFER: Lazy<Arc<Mutex<VecDeque<String>>>> =
    Lazy::new(|| Arc::new(Mutex::new(VecDeque::new())));

/// 控制台里模拟的"另一个玩家"，用来占住箱子锁
const OUTSIDER: ActorId = ActorId(999);

/// 插件入口
pub struct DebugCliPlugin;
impl Plugin for DebugCliPlugin {
    fn build(&self, app: &mut App) {
        {
            let buffer = CLI_BUFFER.clone();
            std::thread::spawn(move || {
                use std::io::{self, BufRead};
                let stdin = io::stdin();
                for line in stdin.lock().lines().map_while(Result::ok) {
                    let line = line.trim();
                    if !line.is_empty() {
                        let mut buf = buffer.lock().unwrap_or_else(PoisonError::into_inner);
                        buf.push_back(line.to_string());
                    }
                }
            });
        }
        app
            // 事件：原始输入行
            .add_event::<CliLine>()
            // 每帧从 buffer 取出所有命令行写入事件
            .add_systems(Update, read_stdin)
            .add_systems(Update, execute_cli_commands);
    }
}

/* ---------------------------- 事件与枚举 ---------------------------- */

/// 终端敲的一整行
#[derive(Event)]
struct CliLine(String);

/// 我们支持的命令
#[derive(Debug, PartialEq)]
enum Command {
    Help,
    Status,
    Exit,
    Items,
    Chests,
    Place { label: String, capacity: usize },
    Destroy(String),
    Give { chest: String, id: String, count: u32, quality: u8 },
    Open { chest: String, player: PlayerId },
    Close(PlayerId),
    Organize(Option<PlayerId>),
    Sleep,
    Enable(String),
    Remove(String),
    Order(Vec<String>),
    Lock(String),
    Unlock(String),
    Report,
    Reload,
    Title,
    Load,
    Unsupported(String),
}

/// 命令执行需要的世界数据
#[derive(SystemParam)]
struct Cli<'w, 's> {
    state: Res<'w, State<AppState>>,
    next_state: ResMut<'w, NextState<AppState>>,
    catalog: Res<'w, ItemCatalog>,
    session: Res<'w, OrganizerSession>,
    last: Res<'w, LastOrganizeReport>,
    chests: Query<'w, 's, (Entity, &'static Chest)>,
    log: EventWriter<'w, LogEvent>,
    app_exit: EventWriter<'w, AppExit>,
    config_changed: EventWriter<'w, ConfigChanged>,
}

/// 转发给各插件的事件
#[derive(SystemParam)]
struct CliWriters<'w> {
    place: EventWriter<'w, PlaceChestEvent>,
    destroy: EventWriter<'w, RemoveChestEvent>,
    give: EventWriter<'w, GiveItemEvent>,
    list: EventWriter<'w, ListChestsEvent>,
    open: EventWriter<'w, ChestOpened>,
    close: EventWriter<'w, ChestClosed>,
    organize: EventWriter<'w, OrganizeNow>,
    sleep: EventWriter<'w, DayEnding>,
    edit: EventWriter<'w, OrganizerEdit>,
}

/* ---------------------------- 读取 stdin ---------------------------- */

fn read_stdin(mut writer: EventWriter<CliLine>) {
    let mut buffer = CLI_BUFFER.lock().unwrap_or_else(PoisonError::into_inner);
    while let Some(line) = buffer.pop_front() {
        writer.write(CliLine(line));
    }
}

/* ---------------------------- 命令执行 ---------------------------- */

fn execute_cli_commands(
    mut line_reader: EventReader<CliLine>,
    mut cli: Cli,
    mut out: CliWriters,
) {
    for CliLine(input) in line_reader.read() {
        let command = parse_command(input);

        // 会话外只接受少数命令
        let in_game = *cli.state.get() == AppState::InGame;
        if !in_game
            && !matches!(
                command,
                Command::Help | Command::Status | Command::Exit | Command::Load | Command::Items
            )
        {
            cli.log.write(LogEvent("当前不在游戏中，先 load".into()));
            continue;
        }

        match command {
            Command::Help => {
                cli.log.write(LogEvent(
                    "命令列表:
  help                          查看帮助
  status                        查看当前状态
  exit / quit                   退出程序
  items                         列出所有物品
  chests                        列出所有箱子
  place <name> [slots]          放下箱子
  destroy <name>                拆掉箱子
  give <chest> <id> [n] [q]     往箱子里放物品
  open <chest> [player]         打开箱子
  close [player]                关闭界面
  organize [player]             立即整理
  sleep                         结束这一天（夜间整理）
  enable <chest>                加入整理器
  remove <chest|id>             移出整理器
  order <chest> <chest> ...     设置优先级顺序
  lock / unlock <chest>         模拟其他玩家占用箱子
  report                        上一次整理结果 (JSON)
  reload                        重新读取配置
  title / load                  回到标题 / 读档
  ".into()));
            }

            Command::Status => {
                let registered = cli.session.organizer().map_or(0, |o| o.len());
                cli.log.write(LogEvent(format!(
                    "State: {:?}, Items Loaded: {}, Chests: {}, Organized: {}",
                    cli.state.get(),
                    cli.catalog.items.len(),
                    cli.chests.iter().count(),
                    registered
                )));
            }

            Command::Exit => {
                cli.log.write(LogEvent("Bye~".into()));
                cli.app_exit.write(AppExit::Success);
            }

            Command::Items => {
                for entry in &cli.catalog.items {
                    cli.log.write(LogEvent(format!(
                        "{} | {} | max {} | {}",
                        entry.id, entry.name, entry.max_stack, entry.category
                    )));
                }
            }

            Command::Chests => {
                out.list.write(ListChestsEvent);
            }

            Command::Place { label, capacity } => {
                out.place.write(PlaceChestEvent { label, capacity });
            }

            Command::Destroy(label) => {
                out.destroy.write(RemoveChestEvent { label });
            }

            Command::Give { chest, id, count, quality } => {
                out.give.write(GiveItemEvent { chest, id, count, quality });
            }

            Command::Open { chest, player } => match find_chest(cli.chests.iter(), &chest) {
                Some(entity) => {
                    out.open.write(ChestOpened { player, chest: entity });
                }
                None => {
                    cli.log.write(LogEvent(format!("找不到箱子 {chest}")));
                }
            },

            Command::Close(player) => {
                out.close.write(ChestClosed { player });
            }

            Command::Organize(player) => {
                out.organize.write(OrganizeNow { player });
            }

            Command::Sleep => {
                cli.log.write(LogEvent("一天结束了…".into()));
                out.sleep.write(DayEnding);
            }

            Command::Enable(label) => match find_chest(cli.chests.iter(), &label) {
                Some(entity) => {
                    out.edit.write(OrganizerEdit::Add(entity));
                }
                None => {
                    cli.log.write(LogEvent(format!("找不到箱子 {label}")));
                }
            },

            Command::Remove(token) => {
                let id = resolve_id(&cli, &token);
                out.edit.write(OrganizerEdit::Remove(id));
            }

            Command::Order(tokens) => {
                let ids = tokens.iter().map(|t| resolve_id(&cli, t)).collect();
                out.edit.write(OrganizerEdit::Reorder(ids));
            }

            Command::Lock(label) => {
                let line = with_chest(&cli, &label, |chest| {
                    if chest.mutex().try_acquire(OUTSIDER) {
                        format!("{} 被 {OUTSIDER} 占用", chest.label)
                    } else {
                        format!("{} 已被占用", chest.label)
                    }
                });
                cli.log.write(LogEvent(line));
            }

            Command::Unlock(label) => {
                let line = with_chest(&cli, &label, |chest| match chest.mutex().release(OUTSIDER) {
                    Ok(()) => format!("{} 已释放", chest.label),
                    Err(e) => e.to_string(),
                });
                cli.log.write(LogEvent(line));
            }

            Command::Report => {
                let line = match &cli.last.0 {
                    Some(report) => serde_json::to_string_pretty(report)
                        .unwrap_or_else(|e| format!("无法序列化: {e}")),
                    None => "还没有整理过".into(),
                };
                cli.log.write(LogEvent(line));
            }

            Command::Reload => {
                cli.config_changed.write(ConfigChanged);
            }

            Command::Title => {
                cli.next_state.set(AppState::Title);
                cli.log.write(LogEvent("回到标题画面".into()));
            }

            Command::Load => {
                cli.next_state.set(AppState::InGame);
            }

            Command::Unsupported(cmd) => {
                cli.log.write(LogEvent(format!("不支持的命令: {cmd}")));
            }
        }
    }
}

/* ---------------------------- 工具函数 ---------------------------- */

/// 箱子名 → 全局 id；找不到就当作 id 原样使用
fn resolve_id(cli: &Cli, token: &str) -> String {
    cli.chests
        .iter()
        .find(|(_, c)| c.label.eq_ignore_ascii_case(token))
        .and_then(|(_, c)| c.global_id.clone())
        .unwrap_or_else(|| token.to_string())
}

fn with_chest(cli: &Cli, label: &str, f: impl FnOnce(&Chest) -> String) -> String {
    match cli.chests.iter().find(|(_, c)| c.label.eq_ignore_ascii_case(label)) {
        Some((_, chest)) => f(chest),
        None => format!("找不到箱子 {label}"),
    }
}

fn parse_player(token: Option<&str>) -> PlayerId {
    PlayerId(token.and_then(|t| t.parse().ok()).unwrap_or(1))
}

fn parse_command(input: &str) -> Command {
    let mut parts = input.split_whitespace();
    let cmd = parts.next().unwrap_or("").to_lowercase();
    let args: Vec<&str> = parts.collect();
    let mut rest = args.iter();
    let mut arg = || rest.next().map_or_else(String::new, |s| s.to_string());
    match cmd.as_str() {
        "help" | "h" | "?" => Command::Help,
        "status" | "s" => Command::Status,
        "exit" | "quit" | "q" => Command::Exit,
        "items" | "item" | "i" => Command::Items,
        "chests" | "ls" => Command::Chests,
        "place" => {
            let label = arg();
            let capacity = arg().parse().unwrap_or(Chest::DEFAULT_CAPACITY);
            Command::Place { label, capacity }
        }
        "destroy" => Command::Destroy(arg()),
        "give" => {
            let chest = arg();
            let id = arg();
            let count = arg().parse().unwrap_or(1);
            let quality = arg().parse().unwrap_or(0);
            Command::Give { chest, id, count, quality }
        }
        "open" => {
            let chest = arg();
            let player = parse_player(Some(arg().as_str()));
            Command::Open { chest, player }
        }
        "close" => Command::Close(parse_player(Some(arg().as_str()))),
        "organize" | "o" => {
            let token = arg();
            Command::Organize((!token.is_empty()).then(|| parse_player(Some(token.as_str()))))
        }
        "sleep" => Command::Sleep,
        "enable" => Command::Enable(arg()),
        "remove" => Command::Remove(arg()),
        "order" => Command::Order(args.iter().map(|s| s.to_string()).collect()),
        "lock" => Command::Lock(arg()),
        "unlock" => Command::Unlock(arg()),
        "report" => Command::Report,
        "reload" => Command::Reload,
        "title" => Command::Title,
        "load" => Command::Load,
        other => Command::Unsupported(other.into()),
    }
}
