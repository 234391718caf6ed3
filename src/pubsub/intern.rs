use std::{borrow::Borrow, fmt, sync::Arc};

use dashmap::DashMap;

/// Непрозрачный идентификатор темы шины событий.
///
/// Содержит только символы `[0-9a-z]`, поэтому шина может считать его
/// неделимым токеном. Клонирование дешёвое (`Arc<str>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicId(Arc<str>);

impl TopicId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for TopicId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TopicId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TopicId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Пул для повторного использования `Arc<str>` по одинаковым темам.
///
/// Принадлежит кодеку конкретного реестра. Запись живёт, пока на тему
/// ссылается кто-то кроме пула (подписка на шине, список тем дескриптора):
/// `release` выселяет темы, оставшиеся только в пуле.
#[derive(Debug, Default)]
pub(crate) struct TopicInterner {
    pool: DashMap<String, TopicId>,
}

impl TopicInterner {
    /// Возвращает interned `TopicId` для данной строки.
    /// При первом вызове для новой строки создаёт `Arc<str>` и сохраняет его.
    pub(crate) fn intern(
        &self,
        encoded: String,
    ) -> TopicId {
        if let Some(existing) = self.pool.get(encoded.as_str()) {
            return existing.clone();
        }
        let id = TopicId(Arc::from(encoded.as_str()));
        self.pool.entry(encoded).or_insert(id).value().clone()
    }

    /// Уже выданный `TopicId` без добавления в пул; иначе отдельный `Arc`.
    pub(crate) fn lookup(
        &self,
        encoded: String,
    ) -> TopicId {
        match self.pool.get(encoded.as_str()) {
            Some(existing) => existing.clone(),
            None => TopicId(Arc::from(encoded)),
        }
    }

    /// Удаляет запись, если на неё больше никто не ссылается.
    pub(crate) fn release(
        &self,
        encoded: &str,
    ) -> bool {
        self.pool
            .remove_if(encoded, |_, id| Arc::strong_count(&id.0) == 1)
            .is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.pool.len()
    }

    pub(crate) fn clear(&self) {
        self.pool.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Проверяет, что повторный вызов возвращает тот же самый `Arc`.
    #[test]
    fn intern_new_and_repeats() {
        let pool = TopicInterner::default();
        let a1 = pool.intern("ev0001".to_string());
        assert_eq!(a1.as_str(), "ev0001");

        let a2 = pool.intern("ev0001".to_string());
        assert!(
            Arc::ptr_eq(&a1.0, &a2.0),
            "Должен вернуть тот же Arc по указателю"
        );
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn intern_different_keys() {
        let pool = TopicInterner::default();
        let a1 = pool.intern("dzadza".to_string());
        let a2 = pool.intern("maz".to_string());
        assert_ne!(a1, a2);
        assert!(!Arc::ptr_eq(&a1.0, &a2.0), "Разные ключи - разные Arc");
    }

    /// Проверяет, что после `clear` пул пуст, а новые id равны старым по
    /// содержимому.
    #[test]
    fn intern_clear_keeps_equality() {
        let pool = TopicInterner::default();
        let before = pool.intern("kin".to_string());
        pool.clear();
        assert_eq!(pool.len(), 0);
        let after = pool.intern("kin".to_string());
        assert_eq!(before, after);
    }

    /// Проверяет, что `lookup` не растит пул, а `release` выселяет только
    /// темы без внешних ссылок.
    #[test]
    fn lookup_and_release() {
        let pool = TopicInterner::default();
        let miss = pool.lookup("ev42".to_string());
        assert_eq!(miss.as_str(), "ev42");
        assert_eq!(pool.len(), 0);

        let held = pool.intern("ev42".to_string());
        assert!(Arc::ptr_eq(&held.0, &pool.lookup("ev42".to_string()).0));
        assert!(!pool.release("ev42"));
        assert_eq!(pool.len(), 1);

        drop(held);
        assert!(pool.release("ev42"));
        assert_eq!(pool.len(), 0);
        assert!(!pool.release("ev42"));
    }

    /// Проверяет, что при конкурентных вызовах для одной строки все потоки
    /// получают один и тот же `Arc<str>`.
    #[test]
    fn intern_concurrent() {
        let pool = Arc::new(TopicInterner::default());
        let handles: Vec<_> = (0..6)
            .map(|_| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || pool.intern("a".to_string()))
            })
            .collect();

        let ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for id in &ids {
            assert!(Arc::ptr_eq(&ids[0].0, &id.0));
        }
    }
}
