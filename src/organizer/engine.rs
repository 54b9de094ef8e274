//! 跨箱整理：按优先级把低优先级箱子里可堆叠的物品并入高优先级箱子
//!
//! 一次整理（pass）里：
//! - 接收方按注册顺序从前往后，发送方是接收方之后的每一个箱子；
//! - 锁只 try-acquire，拿不到就跳过相关的箱子对，整趟照样跑完；
//! - 本趟拿到的锁记在账上，返回前（包括 panic 展开时）逐个确认后释放。

use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};

use bevy::log::{error, info, trace, warn};
use serde_derive::Serialize;

use super::container::{Container, Stack};
use super::lock::{ActorId, LockHandle, LockId};
use crate::core::resources::LogAmount;

/// 一趟整理的结果摘要
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsolidationReport {
    /// 因锁被占用而跳过的箱子
    pub contended: Vec<String>,
    /// 世界里已不存在或不可作为目标的注册位
    pub missing: Vec<usize>,
    /// 移动过的堆叠数（整堆或部分）
    pub stacks_moved: usize,
    pub units_moved: u64,
    /// 因锁被占用没处理的箱子对
    pub skipped_pairs: usize,
    /// 能力接口 panic 而放弃的箱子对
    pub failed_pairs: usize,
}

impl ConsolidationReport {
    /// 有箱子对没处理（非致命，下一趟自然重试）
    pub fn incomplete(&self) -> bool {
        self.skipped_pairs > 0 || self.failed_pairs > 0
    }
}

/// 整理引擎
#[derive(Debug, Clone, Copy)]
pub struct Consolidator {
    pub actor: ActorId,
    pub log_amount: LogAmount,
}

impl Default for Consolidator {
    fn default() -> Self {
        Self {
            actor: ActorId::ORGANIZER,
            log_amount: LogAmount::Less,
        }
    }
}

impl Consolidator {
    pub fn new(actor: ActorId) -> Self {
        Self {
            actor,
            ..Default::default()
        }
    }

    pub fn with_log_amount(mut self, log_amount: LogAmount) -> Self {
        self.log_amount = log_amount;
        self
    }

    /// `slots` 按优先级排列（0 最高），`None` 表示该注册位在世界里找不到箱子
    pub fn consolidate<C: Container>(&self, slots: &mut [Option<C>]) -> ConsolidationReport {
        let mut report = ConsolidationReport::default();
        let mut locks = PassLocks::new(self.actor);
        let n = slots.len();

        for (index, slot) in slots.iter().enumerate() {
            if !slot.as_ref().is_some_and(|c| c.is_valid_target()) {
                report.missing.push(index);
            }
        }

        for r in 0..n.saturating_sub(1) {
            let (head, tail) = slots.split_at_mut(r + 1);
            let Some(receiver) = head[r].as_mut().filter(|c| c.is_valid_target()) else {
                continue;
            };

            if !locks.ensure(receiver.lock()) {
                note_contended(&mut report, receiver.id());
                report.skipped_pairs += tail
                    .iter()
                    .flatten()
                    .filter(|c| c.is_valid_target())
                    .count();
                continue;
            }

            let organized =
                panic::catch_unwind(AssertUnwindSafe(|| receiver.organize())).is_ok();
            if !organized {
                error!("organizing {} panicked; its pairs are skipped", receiver.id());
                report.failed_pairs += tail
                    .iter()
                    .flatten()
                    .filter(|c| c.is_valid_target())
                    .count();
                continue;
            }

            for sender in tail.iter_mut().flatten() {
                if !sender.is_valid_target() {
                    continue;
                }

                if !locks.ensure(sender.lock()) {
                    note_contended(&mut report, sender.id());
                    report.skipped_pairs += 1;
                    continue;
                }

                // 两把锁都得在手上
                if !receiver.lock().is_held_by(self.actor) || !sender.lock().is_held_by(self.actor)
                {
                    report.skipped_pairs += 1;
                    continue;
                }

                let merged = panic::catch_unwind(AssertUnwindSafe(|| {
                    self.merge_pair(&mut *receiver, &mut *sender)
                }));
                match merged {
                    Ok((stacks, units)) => {
                        report.stacks_moved += stacks;
                        report.units_moved += units;
                    }
                    Err(_) => {
                        error!(
                            "merging {} into {} panicked; pair abandoned",
                            sender.id(),
                            receiver.id()
                        );
                        report.failed_pairs += 1;
                    }
                }
            }
        }

        locks.release_all();
        report
    }

    /// 从发送方末尾往前扫；整堆并入就立即删除该格
    fn merge_pair<C: Container>(&self, receiver: &mut C, sender: &mut C) -> (usize, u64) {
        let mut stacks = 0;
        let mut units = 0u64;
        let mut removed_any = false;

        for i in (0..sender.items().len()).rev() {
            let Some(item) = sender.items()[i].clone() else {
                continue;
            };
            if !receiver.has_stackable(&item) {
                continue;
            }

            let amount = item.quantity();
            let remaining = receiver.add_stack(item.clone());
            let left = remaining.as_ref().map_or(0, Stack::quantity);
            if left == amount {
                continue;
            }

            stacks += 1;
            units += u64::from(amount - left);
            self.log_move(&item, amount - left, sender.id(), receiver.id());

            match remaining {
                Some(rest) => sender.items_mut()[i] = Some(rest),
                None => {
                    sender.items_mut().remove(i);
                    removed_any = true;
                }
            }
        }

        if removed_any {
            sender.remove_empty_slots();
        }
        (stacks, units)
    }

    fn log_move<S: Stack>(&self, item: &S, units: u32, from: &str, to: &str) {
        match self.log_amount {
            LogAmount::More => info!("Added item {} x{} from {} to {}", item.name(), units, from, to),
            LogAmount::Less => trace!("Added item {} x{} from {} to {}", item.name(), units, from, to),
        }
    }
}

fn note_contended(report: &mut ConsolidationReport, id: &str) {
    if !report.contended.iter().any(|c| c == id) {
        report.contended.push(id.to_string());
    }
}

/// 本趟持有的锁；drop 时保证释放
struct PassLocks<L: LockHandle> {
    actor: ActorId,
    held: HashMap<LockId, L>,
    contended: HashSet<LockId>,
}

impl<L: LockHandle + Clone> PassLocks<L> {
    fn new(actor: ActorId) -> Self {
        Self {
            actor,
            held: HashMap::new(),
            contended: HashSet::new(),
        }
    }

    /// 已在账上就直接确认；本趟失败过的不再请求。
    /// 趟前就被持有的锁（哪怕持有者身份与本趟相同）算作被占用，不记账也不释放
    fn ensure(&mut self, lock: &L) -> bool {
        let id = lock.id();
        if self.held.contains_key(&id) {
            return lock.is_held_by(self.actor);
        }
        if self.contended.contains(&id) {
            return false;
        }

        if lock.try_acquire(self.actor) {
            self.held.insert(id, lock.clone());
            true
        } else {
            self.contended.insert(id);
            false
        }
    }

    fn release_all(&mut self) {
        for (id, lock) in self.held.drain() {
            if !lock.is_held_by(self.actor) {
                warn!("lock {:?} was no longer held at release time", id);
                continue;
            }
            if let Err(e) = lock.release(self.actor) {
                error!("{e}");
            }
        }
    }
}

impl<L: LockHandle> Drop for PassLocks<L> {
    fn drop(&mut self) {
        for (id, lock) in self.held.drain() {
            if lock.is_held_by(self.actor) {
                trace!("releasing lock {:?} during unwind", id);
                let _ = lock.release(self.actor);
            }
        }
    }
}
