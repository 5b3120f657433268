// Delays in the bridge: awaited ones (retry backoff, tab warm-up) and
// fire-and-forget ones (init post, success auto-revert, result timeout).

use async_trait::async_trait;

#[async_trait(?Send)]
pub trait Sleeper {
    async fn sleep_ms(&self, ms: u32);
}

pub trait Timer {
    fn schedule(&self, delay_ms: u32, task: Box<dyn FnOnce()>);
}

/// setTimeout-backed scheduler for every extension context.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserScheduler;

#[async_trait(?Send)]
impl Sleeper for BrowserScheduler {
    async fn sleep_ms(&self, ms: u32) {
        gloo_timers::future::TimeoutFuture::new(ms).await;
    }
}

impl Timer for BrowserScheduler {
    fn schedule(&self, delay_ms: u32, task: Box<dyn FnOnce()>) {
        gloo_timers::callback::Timeout::new(delay_ms, task).forget();
    }
}
