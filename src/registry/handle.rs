use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Weak,
    },
};

use parking_lot::Mutex;
use scopebus_error::{RegistryError, RegistryResult};
use serde_json::Value;
use tracing::debug;

use super::{registry::RegistryInner, Listener, Registry};
use crate::pubsub::{BusHandler, Event, InstanceId, Scope, TopicId};

/// Имя события для `off`, снимающее все подписки дескриптора.
pub const ALL_EVENTS: &str = "*";

/// Дескриптор экземпляра модуля или свободной глобальной области.
///
/// Клонирование дешёвое: все клоны ссылаются на один и тот же дескриптор.
/// Все глаголы возвращают `&Self` для цепочек вызовов. После `destroy()`
/// каждый глагол становится no-op, в том числе для доставок, уже
/// находящихся в полёте через замыкания со старой ссылкой на дескриптор.
#[derive(Clone)]
pub struct Handle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    scope: Scope,
    /// Монотонный флаг: однажды `true`, навсегда `true`. Выставляется
    /// только под блокировкой `topics`
    killed: AtomicBool,
    /// Активные темы для массовой отписки. Подписка на шину и отписка
    /// выполняются под этой блокировкой, чтобы не разойтись с `destroy`
    topics: Mutex<Vec<TopicId>>,
    /// Регистрация в индексе имён выполняется под этой блокировкой
    name: Mutex<Option<String>>,
    registry: Weak<RegistryInner>,
}

impl Handle {
    pub(crate) fn new(
        scope: Scope,
        registry: Weak<RegistryInner>,
    ) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                scope,
                killed: AtomicBool::new(false),
                topics: Mutex::new(Vec::new()),
                name: Mutex::new(None),
                registry,
            }),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.inner.scope
    }

    /// Пространство имён экземпляра или ключ глобальной области.
    pub fn namespace(&self) -> &str {
        self.inner.scope.namespace()
    }

    /// Номер экземпляра; `None` для глобального дескриптора.
    pub fn instance_id(&self) -> Option<InstanceId> {
        self.inner.scope.instance_id()
    }

    pub fn is_global(&self) -> bool {
        matches!(self.inner.scope, Scope::Global(_))
    }

    /// Имя, заданное через [`Handle::id`].
    pub fn name(&self) -> Option<String> {
        self.inner.name.lock().clone()
    }

    pub fn is_killed(&self) -> bool {
        self.inner.killed.load(Ordering::Acquire)
    }

    /// Снимок активных тем дескриптора.
    pub fn topics(&self) -> Vec<TopicId> {
        self.inner.topics.lock().clone()
    }

    /// Реестр, которому принадлежит дескриптор, если он ещё существует.
    pub fn registry(&self) -> Option<Registry> {
        self.inner.registry.upgrade().map(Registry::from_inner)
    }

    /// `true`, если оба значения являются клонами одного дескриптора.
    pub fn ptr_eq(
        &self,
        other: &Handle,
    ) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Подписывает обработчик на событие этого дескриптора.
    pub fn on<F>(
        &self,
        event: &str,
        callback: F,
    ) -> &Self
    where
        F: Fn(&Handle, &[Value]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.attach(event, Arc::new(callback), false);
        self
    }

    /// Как [`Handle::on`], но подписка снимается после первой доставки.
    pub fn one<F>(
        &self,
        event: &str,
        callback: F,
    ) -> &Self
    where
        F: Fn(&Handle, &[Value]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.attach(event, Arc::new(callback), true);
        self
    }

    /// Подписка готовым (возможно, общим) обработчиком.
    ///
    /// Возвращает `CallbackRequired`, если обработчик не передан.
    pub fn subscribe(
        &self,
        event: &str,
        callback: Option<Listener>,
        once: bool,
    ) -> RegistryResult<&Self> {
        if self.is_killed() {
            return Ok(self);
        }
        let listener = callback.ok_or_else(|| RegistryError::CallbackRequired {
            event: event.to_string(),
        })?;
        self.attach(event, listener, once);
        Ok(self)
    }

    /// Снимает подписки на событие. `off("*")` снимает все подписки
    /// дескриптора.
    pub fn off(
        &self,
        event: &str,
    ) -> &Self {
        let Some(registry) = self.registry() else {
            return self;
        };
        let released = {
            let mut topics = self.inner.topics.lock();
            if self.is_killed() {
                return self;
            }
            if event == ALL_EVENTS {
                std::mem::take(&mut *topics)
            } else {
                let topic = registry.codec().lookup(&self.inner.scope, event);
                topics.retain(|t| *t != topic);
                vec![topic]
            }
        };
        registry.bus().unsubscribe(&released);
        registry.codec().release(released);
        self
    }

    /// Публикует событие в собственную тему дескриптора.
    ///
    /// Ошибка обработчика прерывает доставку остальным обработчикам и
    /// возвращается отсюда.
    pub fn trigger(
        &self,
        event: &str,
        args: &[Value],
    ) -> RegistryResult<&Self> {
        if self.is_killed() {
            return Ok(self);
        }
        if let Some(registry) = self.registry() {
            let topic = registry.codec().lookup(&self.inner.scope, event);
            let result = registry.bus().publish(&topic, args);
            // Обработчик мог снять последнюю подписку на эту тему
            if registry.bus().subscriber_count(&topic) == 0 {
                registry.codec().release([topic]);
            }
            result?;
        }
        Ok(self)
    }

    /// Для каждой пары `event -> target` получение `event` повторно
    /// публикует `target` на этом же дескрипторе (без аргументов).
    pub fn connect<I, K, V>(
        &self,
        map: I,
    ) -> &Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        if self.is_killed() {
            return self;
        }
        for (event, target) in map {
            let target: String = target.into();
            self.on(event.as_ref(), move |handle, _| {
                handle.trigger(&target, &[])?;
                Ok(())
            });
        }
        self
    }

    /// Регистрирует дескриптор в глобальном индексе имён реестра.
    /// При совпадении имён побеждает последний.
    pub fn id(
        &self,
        name: impl Into<String>,
    ) -> &Self {
        let name = name.into();
        let mut current = self.inner.name.lock();
        // destroy() выставляет флаг до того, как читает имя
        if self.is_killed() {
            return self;
        }
        let previous = current.replace(name.clone());
        if let Some(registry) = self.registry() {
            if let Some(previous) = previous.filter(|p| *p != name) {
                registry.forget_id(&previous, self);
            }
            registry.register_id(name, self.clone());
        }
        self
    }

    /// Уничтожает дескриптор: снимает все подписки, убирает его из коллекции
    /// пространства имён и из индекса имён. Повторный вызов ничего не делает.
    pub fn destroy(&self) -> &Self {
        let topics = {
            let mut topics = self.inner.topics.lock();
            if self.inner.killed.swap(true, Ordering::AcqRel) {
                return self;
            }
            std::mem::take(&mut *topics)
        };
        if let Some(registry) = self.registry() {
            registry.bus().unsubscribe(&topics);
            registry.codec().release(topics);
            if let Scope::Instance { namespace, id } = &self.inner.scope {
                registry.unregister(namespace, *id);
            }
            if let Some(name) = self.name() {
                registry.forget_id(&name, self);
            }
        }
        debug!(scope = %self.inner.scope, "handle destroyed");
        self
    }

    pub(crate) fn attach(
        &self,
        event: &str,
        listener: Listener,
        once: bool,
    ) {
        let Some(registry) = self.registry() else {
            return;
        };
        let mut topics = self.inner.topics.lock();
        if self.is_killed() {
            return;
        }
        let topic = registry.codec().encode(&self.inner.scope, event);

        let handle = self.clone();
        let wrapper: BusHandler = Arc::new(move |_: &Event, args: &[Value]| -> anyhow::Result<()> {
            // Доставка из публикации, начатой до destroy()
            if handle.is_killed() {
                return Ok(());
            }
            listener(&handle, args)
        });
        registry.bus().subscribe(topic.clone(), wrapper, once);

        if !topics.contains(&topic) {
            topics.push(topic);
        }
    }
}

impl PartialEq for Handle {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Handle {}

impl fmt::Debug for Handle {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Handle")
            .field("scope", &self.inner.scope)
            .field("name", &self.name())
            .field("killed", &self.is_killed())
            .field("topics", &self.inner.topics.lock().len())
            .finish()
    }
}
