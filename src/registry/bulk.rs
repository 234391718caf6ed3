use std::{fmt, slice, sync::Arc};

use scopebus_error::RegistryResult;
use serde_json::Value;

use super::{Handle, Listener};

/// Групповой дескриптор над экземплярами пространства имён.
///
/// Состав фиксируется при создании (`Registry::find_all`): экземпляры,
/// созданные позже, в него не попадают, а уничтоженные остаются в снимке
/// и просто игнорируют глаголы. `len()` возвращает размер снимка.
pub struct BulkHandle {
    namespace: String,
    members: Vec<Handle>,
}

impl BulkHandle {
    pub(crate) fn new(
        namespace: impl Into<String>,
        members: Vec<Handle>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            members,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Сколько дескрипторов снимка ещё не уничтожено.
    pub fn live_count(&self) -> usize {
        self.members.iter().filter(|h| !h.is_killed()).count()
    }

    pub fn handles(&self) -> &[Handle] {
        &self.members
    }

    pub fn iter(&self) -> slice::Iter<'_, Handle> {
        self.members.iter()
    }

    /// Подписывает один общий обработчик на событие каждого экземпляра.
    pub fn on<F>(
        &self,
        event: &str,
        callback: F,
    ) -> &Self
    where
        F: Fn(&Handle, &[Value]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.attach_all(event, Arc::new(callback), false);
        self
    }

    pub fn one<F>(
        &self,
        event: &str,
        callback: F,
    ) -> &Self
    where
        F: Fn(&Handle, &[Value]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.attach_all(event, Arc::new(callback), true);
        self
    }

    pub fn off(
        &self,
        event: &str,
    ) -> &Self {
        for handle in &self.members {
            handle.off(event);
        }
        self
    }

    /// Публикует событие на каждом экземпляре по порядку. Первая ошибка
    /// обработчика прерывает рассылку.
    pub fn trigger(
        &self,
        event: &str,
        args: &[Value],
    ) -> RegistryResult<&Self> {
        for handle in &self.members {
            handle.trigger(event, args)?;
        }
        Ok(self)
    }

    fn attach_all(
        &self,
        event: &str,
        listener: Listener,
        once: bool,
    ) {
        for handle in &self.members {
            handle.attach(event, Arc::clone(&listener), once);
        }
    }
}

impl<'a> IntoIterator for &'a BulkHandle {
    type Item = &'a Handle;
    type IntoIter = slice::Iter<'a, Handle>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for BulkHandle {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("BulkHandle")
            .field("namespace", &self.namespace)
            .field("len", &self.members.len())
            .finish()
    }
}
