//! 整理引擎依赖的能力接口，引擎不关心具体的箱子类型

use super::lock::LockHandle;

/// 可堆叠的物品
pub trait Stack: Clone {
    fn quantity(&self) -> u32;

    /// 日志里显示的名字
    fn name(&self) -> &str;

    /// 能否与 `other` 叠在同一格
    fn is_stackable_with(&self, other: &Self) -> bool;
}

/// 参与整理的容器
pub trait Container {
    type Item: Stack;
    type Lock: LockHandle + Clone;

    /// 全局 id，比较时忽略大小写
    fn id(&self) -> &str;

    /// 是否可以作为合并目标（已拆除 / 非玩家箱子返回 false）
    fn is_valid_target(&self) -> bool;

    /// 物品格，`None` 为空格
    fn items(&self) -> &[Option<Self::Item>];

    fn items_mut(&mut self) -> &mut Vec<Option<Self::Item>>;

    fn lock(&self) -> &Self::Lock;

    /// 尽量放入 `stack`；放不下的部分原样返回
    fn add_stack(&mut self, stack: Self::Item) -> Option<Self::Item>;

    /// 本箱内部排序并合并堆叠
    fn organize(&mut self);

    fn has_stackable(&self, stack: &Self::Item) -> bool {
        self.items()
            .iter()
            .flatten()
            .any(|held| stack.is_stackable_with(held))
    }

    /// 去掉空格
    fn remove_empty_slots(&mut self) {
        self.items_mut().retain(Option::is_some);
    }
}

impl<C: Container + ?Sized> Container for &mut C {
    type Item = C::Item;
    type Lock = C::Lock;

    fn id(&self) -> &str {
        (**self).id()
    }

    fn is_valid_target(&self) -> bool {
        (**self).is_valid_target()
    }

    fn items(&self) -> &[Option<Self::Item>] {
        (**self).items()
    }

    fn items_mut(&mut self) -> &mut Vec<Option<Self::Item>> {
        (**self).items_mut()
    }

    fn lock(&self) -> &Self::Lock {
        (**self).lock()
    }

    fn add_stack(&mut self, stack: Self::Item) -> Option<Self::Item> {
        (**self).add_stack(stack)
    }

    fn organize(&mut self) {
        (**self).organize()
    }
}

/// 忽略大小写比较全局 id
pub fn same_id(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}
