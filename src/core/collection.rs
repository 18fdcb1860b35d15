//! # 有序键控集合
//!
//! 保持插入顺序的集合，按条目键（原子标签、实验名等）访问。
//!
//! ## 依赖关系
//! - 被 `sample_models/`、`experiments/`、`analysis/` 的集合类别使用

/// 可作为集合条目的类型
pub trait Keyed {
    fn key(&self) -> &str;
}

/// 有序键控集合
#[derive(Debug, Clone)]
pub struct Collection<T: Keyed> {
    items: Vec<T>,
}

impl<T: Keyed> Default for Collection<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Keyed> Collection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加条目；键已存在时原位替换并返回旧条目
    pub fn add(&mut self, item: T) -> Option<T> {
        match self.items.iter().position(|i| i.key() == item.key()) {
            Some(pos) => Some(std::mem::replace(&mut self.items[pos], item)),
            None => {
                self.items.push(item);
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.items.iter().find(|i| i.key() == key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        self.items.iter_mut().find(|i| i.key() == key)
    }

    pub fn remove(&mut self, key: &str) -> Option<T> {
        let pos = self.items.iter().position(|i| i.key() == key)?;
        Some(self.items.remove(pos))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> Vec<String> {
        self.items.iter().map(|i| i.key().to_string()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// 按键重新排序
    pub fn sort_by<F>(&mut self, compare: F)
    where
        F: FnMut(&T, &T) -> std::cmp::Ordering,
    {
        self.items.sort_by(compare);
    }
}

impl<'a, T: Keyed> IntoIterator for &'a Collection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<'a, T: Keyed> IntoIterator for &'a mut Collection<T> {
    type Item = &'a mut T;
    type IntoIter = std::slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Item(String, i32);

    impl Keyed for Item {
        fn key(&self) -> &str {
            &self.0
        }
    }

    #[test]
    fn test_insertion_order_and_replace() {
        let mut c = Collection::new();
        c.add(Item("b".into(), 1));
        c.add(Item("a".into(), 2));
        assert_eq!(c.keys(), vec!["b", "a"]);

        let old = c.add(Item("b".into(), 3));
        assert_eq!(old, Some(Item("b".into(), 1)));
        assert_eq!(c.keys(), vec!["b", "a"]);
        assert_eq!(c.get("b").map(|i| i.1), Some(3));
    }

    #[test]
    fn test_remove() {
        let mut c = Collection::new();
        c.add(Item("x".into(), 1));
        assert!(c.remove("x").is_some());
        assert!(c.remove("x").is_none());
        assert!(c.is_empty());
    }
}
