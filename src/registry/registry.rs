use std::{
    collections::{btree_map::BTreeMap, hash_map::Entry, HashMap},
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
};

use parking_lot::RwLock;
use scopebus_error::{RegistryError, RegistryResult};
use serde_json::Value;
use tracing::{debug, warn};

use super::{BulkHandle, Constructor, Handle, RedefinitionPolicy};
use crate::{
    config::Settings,
    logging::log_error,
    pubsub::{EventBus, InstanceId, Scope, TopicCodec},
};

pub(crate) struct RegistryInner {
    codec: TopicCodec,
    bus: EventBus,
    policy: RedefinitionPolicy,
    next_instance: AtomicU64,
    /// Структурное состояние; блокировка никогда не удерживается во время
    /// вызова пользовательского кода
    state: RwLock<RegistryState>,
}

#[derive(Default)]
struct RegistryState {
    /// Пространство имён → конструктор
    constructors: HashMap<String, Constructor>,
    /// Пространство имён → живые экземпляры в порядке создания
    instances: HashMap<String, BTreeMap<InstanceId, Handle>>,
    /// Имя → дескриптор (последний `id(name)` побеждает)
    ids: HashMap<String, Handle>,
}

impl RegistryState {
    fn register(
        &mut self,
        handle: Handle,
    ) {
        if let Scope::Instance { namespace, id } = handle.scope() {
            let id = *id;
            self.instances
                .entry(namespace.clone())
                .or_default()
                .insert(id, handle);
        }
    }

    fn unregister(
        &mut self,
        namespace: &str,
        id: InstanceId,
    ) -> Option<Handle> {
        let slot = self.instances.get_mut(namespace)?;
        let removed = slot.remove(&id);
        if slot.is_empty() {
            self.instances.remove(namespace);
        }
        removed
    }
}

/// Реестр модулей: явный контекст вместо глобального состояния.
///
/// Хранит конструкторы пространств имён, живые экземпляры и индекс имён,
/// а также шину событий и кодек тем, через которые работают все его
/// дескрипторы. Клонирование дешёвое: клоны разделяют одно состояние.
///
/// `destroy_all(None)` выполняет полный сброс (удобно для изоляции тестов).
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Registry {
    /// Реестр со случайной солью тем и политикой `Reject`.
    pub fn new() -> Self {
        Self::with_parts(TopicCodec::random(), RedefinitionPolicy::default())
    }

    /// Реестр по загруженной конфигурации.
    pub fn with_settings(settings: &Settings) -> Self {
        let codec = settings
            .topic_salt
            .map_or_else(TopicCodec::random, TopicCodec::new);
        Self::with_parts(codec, settings.redefinition)
    }

    /// Реестр из готового кодека и политики. Соль тем задаёт вызывающая
    /// сторона через кодек, например `TopicCodec::new(salt)` для
    /// воспроизводимых тем в тестах.
    pub fn with_parts(
        codec: TopicCodec,
        policy: RedefinitionPolicy,
    ) -> Self {
        debug!(salt = codec.salt(), %policy, "registry created");
        Self {
            inner: Arc::new(RegistryInner {
                codec,
                bus: EventBus::new(),
                policy,
                next_instance: AtomicU64::new(1),
                state: RwLock::new(RegistryState::default()),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<RegistryInner>) -> Self {
        Self { inner }
    }

    fn downgrade(&self) -> Weak<RegistryInner> {
        Arc::downgrade(&self.inner)
    }

    /// Кодек тем реестра.
    pub fn codec(&self) -> &TopicCodec {
        &self.inner.codec
    }

    /// Шина событий, общая для всех дескрипторов реестра.
    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    /// Политика повторного `define`, заданная при создании.
    pub fn policy(&self) -> RedefinitionPolicy {
        self.inner.policy
    }

    /// Определяет модуль: конструктор вызывается для каждого нового
    /// экземпляра пространства имён.
    pub fn define<F>(
        &self,
        namespace: &str,
        constructor: F,
    ) -> RegistryResult<()>
    where
        F: Fn(&Handle, &[Value]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.define_constructor(namespace, Some(Arc::new(constructor)))
    }

    /// Определение модуля готовым конструктором.
    ///
    /// Ошибки: `NamespaceRequired`, `ConstructorRequired`,
    /// `ModuleRedefinition` (при политике `Reject`).
    pub fn define_constructor(
        &self,
        namespace: &str,
        constructor: Option<Constructor>,
    ) -> RegistryResult<()> {
        if namespace.is_empty() {
            return Err(RegistryError::NamespaceRequired);
        }
        let constructor = constructor.ok_or_else(|| RegistryError::ConstructorRequired {
            namespace: namespace.to_string(),
        })?;

        let mut state = self.inner.state.write();
        match state.constructors.entry(namespace.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(constructor);
            }
            Entry::Occupied(mut slot) => match self.inner.policy {
                RedefinitionPolicy::Reject => {
                    return Err(RegistryError::ModuleRedefinition {
                        namespace: namespace.to_string(),
                    });
                }
                RedefinitionPolicy::Overwrite => {
                    warn!(namespace, "module constructor overwritten");
                    slot.insert(constructor);
                }
            },
        }
        debug!(namespace, "module defined");
        Ok(())
    }

    /// Конструктор пространства имён, если он определён.
    pub fn lookup_constructor(
        &self,
        namespace: &str,
    ) -> Option<Constructor> {
        self.inner.state.read().constructors.get(namespace).cloned()
    }

    pub fn is_defined(
        &self,
        namespace: &str,
    ) -> bool {
        self.inner.state.read().constructors.contains_key(namespace)
    }

    /// Пространства имён с определённым конструктором (отсортированы).
    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .inner
            .state
            .read()
            .constructors
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Создаёт экземпляр модуля.
    ///
    /// Дескриптор регистрируется до вызова конструктора, поэтому
    /// конструктор уже может подписываться на события. Если конструктор
    /// вернул ошибку, экземпляр уничтожается и ошибка возвращается.
    pub fn instantiate(
        &self,
        namespace: &str,
        args: &[Value],
    ) -> RegistryResult<Handle> {
        if namespace.is_empty() {
            return Err(RegistryError::NamespaceRequired);
        }

        let (handle, constructor) = {
            let mut state = self.inner.state.write();
            let constructor = state.constructors.get(namespace).cloned().ok_or_else(|| {
                RegistryError::UndefinedConstructor {
                    namespace: namespace.to_string(),
                }
            })?;
            let id = self.inner.next_instance.fetch_add(1, Ordering::Relaxed);
            let handle = Handle::new(Scope::instance(namespace, id), self.downgrade());
            state.register(handle.clone());
            (handle, constructor)
        };

        debug!(
            namespace,
            instance = handle.instance_id(),
            args = args.len(),
            "module instantiated"
        );

        if let Err(source) = constructor(&handle, args) {
            handle.destroy();
            let err = RegistryError::ConstructorFailed {
                namespace: namespace.to_string(),
                source,
            };
            log_error(&err);
            return Err(err);
        }
        Ok(handle)
    }

    /// Свободный глобальный дескриптор по произвольному ключу.
    ///
    /// Не попадает в коллекции пространств имён, не виден в `find_all` и не
    /// уничтожается `destroy_all`. Дескрипторы с одинаковым ключом делят
    /// события.
    pub fn global(
        &self,
        scope: impl Into<String>,
    ) -> Handle {
        Handle::new(Scope::global(scope), self.downgrade())
    }

    /// Снимок живых экземпляров пространства имён в порядке создания.
    pub fn list_instances(
        &self,
        namespace: &str,
    ) -> Vec<Handle> {
        self.inner
            .state
            .read()
            .instances
            .get(namespace)
            .map(|slot| slot.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn instance_count(
        &self,
        namespace: &str,
    ) -> usize {
        self.inner
            .state
            .read()
            .instances
            .get(namespace)
            .map_or(0, BTreeMap::len)
    }

    /// Групповой дескриптор над текущими экземплярами пространства имён.
    pub fn find_all(
        &self,
        namespace: &str,
    ) -> BulkHandle {
        BulkHandle::new(namespace, self.list_instances(namespace))
    }

    /// Дескриптор, зарегистрированный через [`Handle::id`].
    pub fn find_by_id(
        &self,
        name: &str,
    ) -> Option<Handle> {
        self.inner.state.read().ids.get(name).cloned()
    }

    /// Уничтожает все экземпляры пространства имён и удаляет его
    /// конструктор. Без пространства имён выполняет полный сброс реестра: все
    /// экземпляры, все конструкторы и индекс имён.
    ///
    /// Глобальные дескрипторы не уничтожаются.
    pub fn destroy_all(
        &self,
        namespace: Option<&str>,
    ) {
        let doomed: Vec<Handle> = {
            let mut state = self.inner.state.write();
            match namespace {
                Some(namespace) => {
                    state.constructors.remove(namespace);
                    state
                        .instances
                        .remove(namespace)
                        .map(|slot| slot.into_values().collect())
                        .unwrap_or_default()
                }
                None => {
                    state.constructors.clear();
                    state.ids.clear();
                    state
                        .instances
                        .drain()
                        .flat_map(|(_, slot)| slot.into_values())
                        .collect()
                }
            }
        };

        for handle in &doomed {
            handle.destroy();
        }
        if namespace.is_none() {
            self.inner.codec.clear_interned();
        }
        debug!(?namespace, destroyed = doomed.len(), "destroy_all");
    }

    pub(crate) fn unregister(
        &self,
        namespace: &str,
        id: InstanceId,
    ) -> bool {
        self.inner.state.write().unregister(namespace, id).is_some()
    }

    pub(crate) fn register_id(
        &self,
        name: String,
        handle: Handle,
    ) {
        debug!(name = %name, scope = %handle.scope(), "handle id registered");
        self.inner.state.write().ids.insert(name, handle);
    }

    /// Удаляет имя из индекса, только если оно всё ещё указывает на этот
    /// дескриптор.
    pub(crate) fn forget_id(
        &self,
        name: &str,
        handle: &Handle,
    ) {
        let mut state = self.inner.state.write();
        if state.ids.get(name).is_some_and(|h| h.ptr_eq(handle)) {
            state.ids.remove(name);
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("Registry")
            .field("policy", &self.inner.policy)
            .field("constructors", &state.constructors.len())
            .field(
                "instances",
                &state.instances.values().map(BTreeMap::len).sum::<usize>(),
            )
            .field("ids", &state.ids.len())
            .finish()
    }
}
