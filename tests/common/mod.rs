#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use scopebus::{Handle, RedefinitionPolicy, Registry, TopicCodec, Value};

/// Реестр с фиксированной солью, изолированный для одного теста.
pub fn registry() -> Registry {
    Registry::with_parts(TopicCodec::new(0x5eed), RedefinitionPolicy::Reject)
}

/// Записывает аргументы каждого вызова.
#[derive(Clone, Default)]
pub struct Spy {
    calls: Arc<Mutex<Vec<Vec<Value>>>>,
}

impl Spy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Замыкание, пригодное и как обработчик, и как конструктор.
    pub fn callback(&self) -> impl Fn(&Handle, &[Value]) -> anyhow::Result<()> + Send + Sync + 'static {
        let calls = Arc::clone(&self.calls);
        move |_, args| {
            calls.lock().unwrap().push(args.to_vec());
            Ok(())
        }
    }

    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<Vec<Value>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn reset(&self) {
        self.calls.lock().unwrap().clear();
    }
}
