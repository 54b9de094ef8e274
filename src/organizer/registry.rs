//! 整理器：按优先级排好的箱子代理列表

use thiserror::Error;
use uuid::Uuid;

use super::container::same_id;
use super::CHEST_PREFIX;
use crate::inventory::components::{Chest, ChestAppearance, ItemStack};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("chest '{0}' has no global id")]
    MissingGlobalId(String),
    #[error("unknown chest id '{0}'")]
    UnknownId(String),
    #[error("chest id '{0}' listed more than once")]
    DuplicateId(String),
    #[error("new order leaves out {0:?}")]
    MissingEntries(Vec<String>),
}

/// 注册表里记录的箱子快照
#[derive(Debug, Clone, PartialEq)]
pub struct ChestProxy {
    pub global_id: String,
    pub kind: String,
    pub appearance: ChestAppearance,
    pub contents: Vec<Option<ItemStack>>,
}

impl ChestProxy {
    pub fn from_chest(chest: &Chest) -> Result<Self, RegistryError> {
        let global_id = chest
            .global_id
            .clone()
            .ok_or_else(|| RegistryError::MissingGlobalId(chest.label.clone()))?;
        Ok(Self {
            global_id,
            kind: chest.kind.clone(),
            appearance: chest.appearance.clone(),
            contents: chest.slots.clone(),
        })
    }

    /// 整份覆盖，不做部分复制
    pub fn copy_fields_from(&mut self, chest: &Chest) {
        self.kind.clone_from(&chest.kind);
        self.appearance.clone_from(&chest.appearance);
        self.contents.clone_from(&chest.slots);
    }

    /// 提示框标题：有自定义名字用名字，否则用箱子种类
    pub fn display_name(&self) -> &str {
        self.appearance.name.as_deref().unwrap_or(&self.kind)
    }
}

/// 给还没有全局 id 的箱子分配一个
pub fn ensure_global_id(chest: &mut Chest) -> &str {
    chest
        .global_id
        .get_or_insert_with(|| format!("{CHEST_PREFIX}{}", Uuid::new_v4()))
}

/// 判断 id 是否由本整理器分配
pub fn is_organizer_id(id: &str) -> bool {
    id.get(..CHEST_PREFIX.len())
        .is_some_and(|head| same_id(head, CHEST_PREFIX))
}

/// 下标 0 优先级最高；id 忽略大小写唯一
#[derive(Debug, Clone, Default)]
pub struct Organizer {
    entries: Vec<ChestProxy>,
}

impl Organizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChestProxy> {
        self.entries.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|p| p.global_id.as_str())
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|p| same_id(&p.global_id, id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<&ChestProxy> {
        self.position(id).map(|i| &self.entries[i])
    }

    /// 活箱子是否就是某个已注册代理：id 忽略大小写相同，且箱子种类一致
    pub fn holds(&self, chest: &Chest) -> bool {
        chest
            .global_id
            .as_deref()
            .and_then(|id| self.get(id))
            .is_some_and(|proxy| proxy.kind == chest.kind)
    }

    /// 追加到末尾（最低优先级）；同 id 已存在时什么都不做
    pub fn add(&mut self, proxy: ChestProxy) -> bool {
        if self.contains(&proxy.global_id) {
            return false;
        }
        self.entries.push(proxy);
        debug_assert!(self.ids_unique());
        true
    }

    pub fn add_proxy(&mut self, chest: &Chest) -> Result<bool, RegistryError> {
        Ok(self.add(ChestProxy::from_chest(chest)?))
    }

    pub fn remove(&mut self, id: &str) -> Option<ChestProxy> {
        let index = self.position(id)?;
        Some(self.entries.remove(index))
    }

    /// 整体替换顺序；新顺序必须恰好是现有条目的一个排列
    pub fn reorder<I, S>(&mut self, ids: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut pool: Vec<Option<ChestProxy>> = self.entries.iter().cloned().map(Some).collect();
        let mut ordered = Vec::with_capacity(pool.len());

        for id in ids {
            let id = id.as_ref();
            let index = self
                .position(id)
                .ok_or_else(|| RegistryError::UnknownId(id.to_string()))?;
            let proxy = pool[index]
                .take()
                .ok_or_else(|| RegistryError::DuplicateId(id.to_string()))?;
            ordered.push(proxy);
        }

        let missing: Vec<String> = pool.into_iter().flatten().map(|p| p.global_id).collect();
        if !missing.is_empty() {
            return Err(RegistryError::MissingEntries(missing));
        }

        self.entries = ordered;
        Ok(())
    }

    /// 用活箱子的字段刷新对应代理；不是已注册的代理（见 [`Organizer::holds`]）则忽略
    pub fn sync_backup(&mut self, chest: &Chest) -> bool {
        if !self.holds(chest) {
            return false;
        }
        match chest.global_id.as_deref().and_then(|id| self.position(id)) {
            Some(index) => {
                self.entries[index].copy_fields_from(chest);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn ids_unique(&self) -> bool {
        self.entries
            .iter()
            .enumerate()
            .all(|(i, a)| self.entries[i + 1..].iter().all(|b| !same_id(&a.global_id, &b.global_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::ItemEntry;

    fn chest(id: &str) -> Chest {
        Chest::new(id, 9).with_global_id(id)
    }

    fn organizer(ids: &[&str]) -> Organizer {
        let mut org = Organizer::new();
        for id in ids {
            assert!(org.add_proxy(&chest(id)).unwrap());
        }
        org
    }

    #[test]
    fn add_is_idempotent_ignoring_case() {
        let mut org = organizer(&["Alpha"]);

        assert!(!org.add_proxy(&chest("ALPHA")).unwrap());
        assert!(!org.add_proxy(&chest("alpha")).unwrap());
        assert_eq!(org.len(), 1);
        assert!(org.contains("aLpHa"));
    }

    #[test]
    fn add_requires_global_id() {
        let mut org = Organizer::new();
        let err = org.add_proxy(&Chest::new("shed", 9)).unwrap_err();
        assert_eq!(err, RegistryError::MissingGlobalId("shed".into()));
        assert!(org.is_empty());
    }

    #[test]
    fn insertion_order_is_priority() {
        let org = organizer(&["a", "b", "c"]);
        assert_eq!(org.ids().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(org.position("C"), Some(2));
    }

    #[test]
    fn remove_by_id() {
        let mut org = organizer(&["a", "b", "c"]);

        let removed = org.remove("B").unwrap();
        assert_eq!(removed.global_id, "b");
        assert_eq!(org.ids().collect::<Vec<_>>(), vec!["a", "c"]);
        assert!(org.remove("b").is_none());
    }

    #[test]
    fn reorder_replaces_order_and_keeps_identity() {
        let mut org = organizer(&["a", "b", "c"]);
        let before = org.get("b").cloned().unwrap();

        org.reorder(["C", "a", "b"]).unwrap();

        assert_eq!(org.ids().collect::<Vec<_>>(), vec!["c", "a", "b"]);
        assert_eq!(org.get("b"), Some(&before));
    }

    #[test]
    fn reorder_rejects_bad_sequences() {
        let mut org = organizer(&["a", "b", "c"]);

        assert_eq!(
            org.reorder(["a", "b", "x"]),
            Err(RegistryError::UnknownId("x".into()))
        );
        assert_eq!(
            org.reorder(["a", "B", "b"]),
            Err(RegistryError::DuplicateId("b".into()))
        );
        assert_eq!(
            org.reorder(["c", "a"]),
            Err(RegistryError::MissingEntries(vec!["b".into()]))
        );
        // 失败不改变原顺序
        assert_eq!(org.ids().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn sync_backup_copies_everything() {
        let mut live = chest("a");
        let mut org = Organizer::new();
        org.add_proxy(&live).unwrap();

        let wood = ItemEntry {
            id: "wood".into(),
            name: "Wood".into(),
            ..Default::default()
        };
        live.slots.push(Some(ItemStack::new(wood, 12)));
        live.appearance.name = Some("Lumber".into());
        live.appearance.color = Some([200, 120, 40]);

        assert!(org.sync_backup(&live));
        let proxy = org.get("A").unwrap();
        assert_eq!(proxy.contents, live.slots);
        assert_eq!(proxy.appearance, live.appearance);
        assert_eq!(proxy.kind, "Chest");
        assert_eq!(proxy.display_name(), "Lumber");
    }

    #[test]
    fn identity_needs_matching_kind() {
        let mut org = organizer(&["a"]);
        let mut other_kind = chest("A");
        other_kind.kind = "StoneChest".into();
        other_kind.slots.push(None);

        assert!(org.holds(&chest("a")));
        assert!(!org.holds(&other_kind));
        assert!(!org.holds(&Chest::new("loose", 9)));

        // id 仍然唯一，种类不同也不会再加一条
        assert!(!org.add_proxy(&other_kind).unwrap());
        assert!(!org.sync_backup(&other_kind));
        assert_eq!(org.len(), 1);
        assert!(org.get("a").unwrap().contents.is_empty());
    }

    #[test]
    fn sync_backup_ignores_unregistered() {
        let mut org = organizer(&["a"]);
        let snapshot = org.get("a").cloned();

        assert!(!org.sync_backup(&chest("b")));
        assert!(!org.sync_backup(&Chest::new("loose", 9)));
        assert_eq!(org.get("a").cloned(), snapshot);
        assert_eq!(org.len(), 1);
    }

    #[test]
    fn iter_follows_priority_and_clear_empties() {
        let mut org = organizer(&["a", "b"]);
        let kinds: Vec<&str> = org.iter().map(|p| p.global_id.as_str()).collect();
        assert_eq!(kinds, vec!["a", "b"]);

        org.clear();
        assert!(org.is_empty());
        assert!(!org.contains("a"));
    }

    #[test]
    fn generated_ids_carry_prefix_and_are_stable() {
        let mut c = Chest::new("shed", 9);
        let id = ensure_global_id(&mut c).to_string();

        assert!(is_organizer_id(&id));
        assert_eq!(ensure_global_id(&mut c), id);
        assert!(!is_organizer_id("someone-else-chest"));
        assert!(!is_organizer_id("箱子箱子箱子箱子"));
    }
}
