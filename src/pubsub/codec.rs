//! Кодирование областей видимости и имён событий в идентификаторы тем.
//!
//! Формат идентификатора:
//!
//! ```text
//! ev <salt: 8 hex> g <hex(key)>                  z <hex(event)>   глобальная область
//! ev <salt: 8 hex> i <hex(namespace)> n <id hex> z <hex(event)>   экземпляр модуля
//! ```
//!
//! Каждый символ строки записывается ровно шестью шестнадцатеричными
//! цифрами (покрывает весь диапазон Unicode). Разделители `g`, `i`, `n`, `z`
//! не являются hex-цифрами, поэтому кодирование однозначно, а в теме никогда
//! не появляются пробелы, `*` и другие символы, которые шина могла бы
//! трактовать особо.

use std::fmt;

use super::{intern::TopicInterner, TopicId};

/// Монотонный номер экземпляра модуля, уникальный в пределах реестра.
pub type InstanceId = u64;

const HEX: &[u8; 16] = b"0123456789abcdef";
const CHAR_WIDTH: u32 = 6;

/// Область видимости событий дескриптора.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Свободная глобальная область по произвольному ключу.
    Global(String),
    /// Конкретный экземпляр модуля.
    Instance {
        namespace: String,
        id: InstanceId,
    },
}

impl Scope {
    pub fn global(key: impl Into<String>) -> Self {
        Self::Global(key.into())
    }

    pub fn instance(
        namespace: impl Into<String>,
        id: InstanceId,
    ) -> Self {
        Self::Instance {
            namespace: namespace.into(),
            id,
        }
    }

    /// Пространство имён экземпляра или ключ глобальной области.
    pub fn namespace(&self) -> &str {
        match self {
            Self::Global(key) => key,
            Self::Instance { namespace, .. } => namespace,
        }
    }

    pub fn instance_id(&self) -> Option<InstanceId> {
        match self {
            Self::Global(_) => None,
            Self::Instance { id, .. } => Some(*id),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Global(key) => write!(f, "global:{key}"),
            Self::Instance { namespace, id } => write!(f, "{namespace}#{id}"),
        }
    }
}

/// Кодек тем: `(Scope, event) -> TopicId`.
///
/// Соль выбирается один раз при создании кодека и не меняется, так что два
/// реестра с разной солью никогда не делят пространство тем.
#[derive(Debug)]
pub struct TopicCodec {
    salt: u32,
    interner: TopicInterner,
}

impl TopicCodec {
    pub fn new(salt: u32) -> Self {
        Self {
            salt,
            interner: TopicInterner::default(),
        }
    }

    /// Кодек со случайной солью.
    pub fn random() -> Self {
        Self::new(rand::random())
    }

    pub fn salt(&self) -> u32 {
        self.salt
    }

    /// Детерминированно кодирует область и имя события в тему и сохраняет
    /// её в пуле. Используется при подписке.
    pub fn encode(
        &self,
        scope: &Scope,
        event: &str,
    ) -> TopicId {
        self.interner.intern(Self::encode_raw(self.salt, scope, event))
    }

    /// Та же тема, что и [`TopicCodec::encode`], но без роста пула: для
    /// публикации и отписки.
    pub fn lookup(
        &self,
        scope: &Scope,
        event: &str,
    ) -> TopicId {
        self.interner.lookup(Self::encode_raw(self.salt, scope, event))
    }

    /// Выселяет темы из пула, если на них больше не ссылается ни подписка,
    /// ни дескриптор. Возвращает число выселенных тем.
    pub fn release<I>(
        &self,
        topics: I,
    ) -> usize
    where
        I: IntoIterator<Item = TopicId>,
    {
        // Каждый TopicId отпускается до проверки счётчика ссылок
        topics
            .into_iter()
            .map(|topic| topic.as_str().to_owned())
            .filter(|encoded| self.interner.release(encoded))
            .count()
    }

    fn encode_raw(
        salt: u32,
        scope: &Scope,
        event: &str,
    ) -> String {
        let mut out = String::with_capacity(
            12 + (scope.namespace().len() + event.len()) * CHAR_WIDTH as usize,
        );
        out.push_str("ev");
        push_hex(&mut out, salt, 8);

        match scope {
            Scope::Global(key) => {
                out.push('g');
                push_hex_str(&mut out, key);
            }
            Scope::Instance { namespace, id } => {
                out.push('i');
                push_hex_str(&mut out, namespace);
                out.push('n');
                push_hex_u64(&mut out, *id);
            }
        }

        out.push('z');
        push_hex_str(&mut out, event);
        out
    }

    /// Количество различных тем, выданных кодеком.
    pub fn interned_count(&self) -> usize {
        self.interner.len()
    }

    pub(crate) fn clear_interned(&self) {
        self.interner.clear();
    }
}

impl Default for TopicCodec {
    fn default() -> Self {
        Self::random()
    }
}

fn push_hex_str(
    out: &mut String,
    text: &str,
) {
    for ch in text.chars() {
        push_hex(out, ch as u32, CHAR_WIDTH);
    }
}

fn push_hex(
    out: &mut String,
    value: u32,
    width: u32,
) {
    for shift in (0..width).rev() {
        let nibble = (value >> (shift * 4)) & 0xf;
        out.push(HEX[nibble as usize] as char);
    }
}

// Без ведущих нулей: число отделено от соседних полей символами `n` и `z`.
fn push_hex_u64(
    out: &mut String,
    value: u64,
) {
    let digits = (64 - value.leading_zeros()).div_ceil(4).max(1);
    for shift in (0..digits).rev() {
        let nibble = (value >> (shift * 4)) & 0xf;
        out.push(HEX[nibble as usize] as char);
    }
}
