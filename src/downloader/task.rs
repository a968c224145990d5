use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// 注册表里一个在途传输的句柄
/// 暂停只翻转标志位，句柄本身保留，恢复后继续用同一条流
pub struct TaskHandle {
    paused: Arc<AtomicBool>,
    cancel: CancellationToken,
    join: Option<JoinHandle<()>>,
}

impl TaskHandle {
    pub fn new(paused: Arc<AtomicBool>, cancel: CancellationToken) -> Self {
        Self {
            paused,
            cancel,
            join: None,
        }
    }

    pub fn set_join(&mut self, join: JoinHandle<()>) {
        self.join = Some(join);
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn take_join(&mut self) -> Option<JoinHandle<()>> {
        self.join.take()
    }
}
