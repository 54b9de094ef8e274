use bevy::prelude::*;
use std::cmp::Reverse;
use std::collections::BTreeMap;

use crate::data::schema::ItemEntry;
use crate::organizer::container::{Container, Stack};
use crate::organizer::lock::ContainerLock;

/// 运行时物品实例
#[derive(Clone, Debug, PartialEq)]
pub struct ItemStack {
    pub proto: ItemEntry, // 直接复制静态表条目即可
    pub count: u32,
    pub quality: u8,
    /// 稀疏的自定义属性，参与堆叠判定
    pub attrs: BTreeMap<String, String>,
}

impl ItemStack {
    pub fn new(proto: ItemEntry, count: u32) -> Self {
        Self {
            proto,
            count,
            quality: 0,
            attrs: BTreeMap::new(),
        }
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    pub fn max_stack(&self) -> u32 {
        self.proto.max_stack.max(1)
    }

    /// 把 `other` 尽量并进来，返回并入的数量
    fn absorb(&mut self, other: &mut ItemStack) -> u32 {
        let room = self.max_stack().saturating_sub(self.count);
        let moved = room.min(other.count);
        self.count += moved;
        other.count -= moved;
        moved
    }
}

impl Stack for ItemStack {
    fn quantity(&self) -> u32 {
        self.count
    }

    fn name(&self) -> &str {
        &self.proto.name
    }

    fn is_stackable_with(&self, other: &Self) -> bool {
        self.proto.id.eq_ignore_ascii_case(&other.proto.id)
            && self.quality == other.quality
            && self.attrs == other.attrs
    }
}

/// 外观字段，代理快照时整份复制
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChestAppearance {
    pub name: Option<String>,
    pub category: Option<String>,
    pub color: Option<[u8; 3]>,
}

/// 放在世界里的箱子
#[derive(Component, Clone, Debug)]
pub struct Chest {
    /// 世界内的名字（控制台用它找箱子）
    pub label: String,
    pub kind: String,
    /// 参与整理时才有
    pub global_id: Option<String>,
    pub player_chest: bool,
    pub appearance: ChestAppearance,
    pub slots: Vec<Option<ItemStack>>, // 空位用 None 占位
    pub capacity: usize,
    lock: ContainerLock,
}

impl Chest {
    pub const DEFAULT_CAPACITY: usize = 36;

    pub fn new(label: impl Into<String>, capacity: usize) -> Self {
        Self {
            label: label.into(),
            kind: "Chest".into(),
            global_id: None,
            player_chest: true,
            appearance: ChestAppearance::default(),
            slots: Vec::new(),
            capacity,
            lock: ContainerLock::new(),
        }
    }

    pub fn with_global_id(mut self, id: impl Into<String>) -> Self {
        self.global_id = Some(id.into());
        self
    }

    pub fn mutex(&self) -> &ContainerLock {
        &self.lock
    }

    pub fn used_slots(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn count_item(&self, id: &str) -> u32 {
        self.slots
            .iter()
            .flatten()
            .filter(|s| s.proto.id.eq_ignore_ascii_case(id))
            .map(|s| s.count)
            .sum()
    }

    pub fn stacks(&self) -> impl Iterator<Item = &ItemStack> {
        self.slots.iter().flatten()
    }
}

impl Container for Chest {
    type Item = ItemStack;
    type Lock = ContainerLock;

    fn id(&self) -> &str {
        self.global_id.as_deref().unwrap_or_default()
    }

    fn is_valid_target(&self) -> bool {
        self.player_chest && self.global_id.is_some()
    }

    fn items(&self) -> &[Option<ItemStack>] {
        &self.slots
    }

    fn items_mut(&mut self) -> &mut Vec<Option<ItemStack>> {
        &mut self.slots
    }

    fn lock(&self) -> &ContainerLock {
        &self.lock
    }

    fn add_stack(&mut self, mut stack: ItemStack) -> Option<ItemStack> {
        // 先补已有堆叠
        for held in self.slots.iter_mut().flatten() {
            if held.is_stackable_with(&stack) {
                held.absorb(&mut stack);
            }
            if stack.count == 0 {
                return None;
            }
        }

        // 再占空位，每格不超过堆叠上限
        while stack.count > 0 && self.used_slots() < self.capacity {
            let mut part = stack.clone();
            part.count = stack.count.min(stack.max_stack());
            stack.count -= part.count;
            match self.slots.iter_mut().find(|s| s.is_none()) {
                Some(slot) => *slot = Some(part),
                None => self.slots.push(Some(part)),
            }
        }
        (stack.count > 0).then_some(stack)
    }

    fn organize(&mut self) {
        let mut merged: Vec<ItemStack> = Vec::with_capacity(self.slots.len());
        for mut stack in self.slots.drain(..).flatten() {
            for held in merged.iter_mut() {
                if stack.count == 0 {
                    break;
                }
                if held.is_stackable_with(&stack) {
                    held.absorb(&mut stack);
                }
            }
            if stack.count > 0 {
                merged.push(stack);
            }
        }

        merged.sort_by(|a, b| {
            (&a.proto.category, &a.proto.name, Reverse(a.quality), Reverse(a.count)).cmp(&(
                &b.proto.category,
                &b.proto.name,
                Reverse(b.quality),
                Reverse(b.count),
            ))
        });
        self.slots = merged.into_iter().map(Some).collect();
    }
}
