//! 箱子互斥锁：只支持 try-acquire，拿不到立即返回

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// 持锁者身份（整理流程 / 其他玩家 / 测试里的模拟并发方）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(pub u64);

impl ActorId {
    /// 整理引擎自己用的身份
    pub const ORGANIZER: ActorId = ActorId(0);
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor#{}", self.0)
    }
}

/// 每把锁的全局编号，整理流程用它记账
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LockId(u64);

impl LockId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        LockId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// 请求与裁决在同一次 `try_acquire` 内完成，外部只看得到这两种状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Unheld,
    Held(ActorId),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LockError {
    #[error("{actor} tried to release lock {lock:?} it does not hold")]
    NotHeld { lock: LockId, actor: ActorId },
}

/// 引擎看到的锁能力
pub trait LockHandle {
    fn id(&self) -> LockId;

    /// 非阻塞获取；不可重入，已被持有（包括被自己持有）时返回 false
    fn try_acquire(&self, actor: ActorId) -> bool;

    fn is_held_by(&self, actor: ActorId) -> bool;

    fn release(&self, actor: ActorId) -> Result<(), LockError>;
}

/// 挂在箱子上的锁，clone 出来的句柄共享同一个状态
#[derive(Clone)]
pub struct ContainerLock {
    id: LockId,
    state: Arc<Mutex<LockState>>,
}

impl Default for ContainerLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContainerLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerLock")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

impl ContainerLock {
    pub fn new() -> Self {
        Self {
            id: LockId::next(),
            state: Arc::new(Mutex::new(LockState::Unheld)),
        }
    }

    pub fn state(&self) -> LockState {
        *self.guard()
    }

    pub fn holder(&self) -> Option<ActorId> {
        match self.state() {
            LockState::Held(actor) => Some(actor),
            _ => None,
        }
    }

    // 持锁方 panic 不应让箱子永久锁死，中毒了照样取出
    fn guard(&self) -> MutexGuard<'_, LockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LockHandle for ContainerLock {
    fn id(&self) -> LockId {
        self.id
    }

    fn try_acquire(&self, actor: ActorId) -> bool {
        let mut state = self.guard();
        if *state != LockState::Unheld {
            return false;
        }
        *state = LockState::Held(actor);
        true
    }

    fn is_held_by(&self, actor: ActorId) -> bool {
        *self.guard() == LockState::Held(actor)
    }

    fn release(&self, actor: ActorId) -> Result<(), LockError> {
        let mut state = self.guard();
        if *state != LockState::Held(actor) {
            return Err(LockError::NotHeld { lock: self.id, actor });
        }
        *state = LockState::Unheld;
        Ok(())
    }
}
