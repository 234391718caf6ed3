use std::sync::{
    atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    Arc,
};

use dashmap::DashMap;
use scopebus_error::{RegistryError, RegistryResult};
use serde_json::Value;
use tracing::trace;

use super::{Event, TopicId};
use crate::logging::log_error;

/// Обработчик уровня шины: получает служебный [`Event`] и позиционные
/// аргументы публикации.
pub type BusHandler = Arc<dyn Fn(&Event, &[Value]) -> anyhow::Result<()> + Send + Sync>;

#[derive(Clone)]
struct Subscriber {
    id: u64,
    handler: BusHandler,
    /// Флаг срабатывания одноразовой подписки, общий для всех снимков
    fired: Option<Arc<AtomicBool>>,
}

/// Синхронная шина событий по темам.
///
/// - Доставка синхронная, в порядке подписки.
/// - `publish` работает по снимку списка подписчиков: обработчики могут
///   подписываться, отписываться и публиковать рекурсивно, изменения видны
///   со следующей публикации.
/// - Одноразовая подписка помечается сработавшей и снимается с шины
///   непосредственно перед вызовом, поэтому вложенные публикации не
///   доставят её повторно. Отписка из соседнего обработчика не отменяет её
///   доставку в текущей публикации, как и для обычных подписок.
/// - Ошибка обработчика прерывает текущую публикацию, пишется в лог и
///   возвращается вызывающей стороне.
pub struct EventBus {
    /// Тема → подписчики в порядке подписки
    topics: DashMap<TopicId, Vec<Subscriber>>,
    next_subscriber: AtomicU64,
    /// Общее количество вызовов `publish`
    pub publish_count: AtomicUsize,
    /// Количество вызванных обработчиков
    pub delivery_count: AtomicUsize,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            topics: DashMap::new(),
            next_subscriber: AtomicU64::new(1),
            publish_count: AtomicUsize::new(0),
            delivery_count: AtomicUsize::new(0),
        }
    }

    /// Регистрирует обработчик темы. Возвращает номер подписки.
    pub fn subscribe(
        &self,
        topic: TopicId,
        handler: BusHandler,
        once: bool,
    ) -> u64 {
        let id = self.next_subscriber.fetch_add(1, Ordering::Relaxed);
        trace!(%topic, subscriber = id, once, "subscribe");
        self.topics
            .entry(topic)
            .or_default()
            .push(Subscriber {
                id,
                handler,
                fired: once.then(|| Arc::new(AtomicBool::new(false))),
            });
        id
    }

    /// Снимает все обработчики указанных тем. Неизвестные темы игнорируются.
    ///
    /// Возвращает количество снятых обработчиков.
    pub fn unsubscribe(
        &self,
        topics: &[TopicId],
    ) -> usize {
        topics
            .iter()
            .filter_map(|topic| self.topics.remove(topic))
            .map(|(topic, subs)| {
                trace!(%topic, removed = subs.len(), "unsubscribe");
                subs.len()
            })
            .sum()
    }

    /// Публикует событие в тему.
    ///
    /// Возвращает количество вызванных обработчиков.
    pub fn publish(
        &self,
        topic: &TopicId,
        args: &[Value],
    ) -> RegistryResult<usize> {
        self.publish_count.fetch_add(1, Ordering::Relaxed);

        // Снимок берётся под блокировкой шарда, обработчики вызываются без неё
        let snapshot = match self.topics.get(topic) {
            Some(entry) => entry.value().clone(),
            None => return Ok(0),
        };
        trace!(%topic, subscribers = snapshot.len(), args = args.len(), "publish");

        let mut delivered = 0;
        for sub in snapshot {
            if let Some(fired) = &sub.fired {
                if fired.swap(true, Ordering::AcqRel) {
                    continue;
                }
                self.remove_subscriber(topic, sub.id);
            }
            let event = Event::new(topic.clone(), sub.id, sub.fired.is_some());
            if let Err(source) = (sub.handler)(&event, args) {
                let err = RegistryError::handler(topic.as_str(), source);
                log_error(&err);
                return Err(err);
            }
            delivered += 1;
            self.delivery_count.fetch_add(1, Ordering::Relaxed);
        }

        Ok(delivered)
    }

    /// Количество обработчиков темы.
    pub fn subscriber_count(
        &self,
        topic: &TopicId,
    ) -> usize {
        self.topics.get(topic).map_or(0, |entry| entry.len())
    }

    /// Количество тем с хотя бы одним обработчиком.
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    // Снимает сработавшую одноразовую подписку, если её ещё не сняла отписка.
    fn remove_subscriber(
        &self,
        topic: &TopicId,
        id: u64,
    ) {
        let mut now_empty = false;
        if let Some(mut entry) = self.topics.get_mut(topic) {
            let subs = entry.value_mut();
            subs.retain(|s| s.id != id);
            now_empty = subs.is_empty();
        }
        if now_empty {
            self.topics.remove_if(topic, |_, subs| subs.is_empty());
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
