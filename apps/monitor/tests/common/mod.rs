#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use uppe_monitor::monitoring::ProbeResponse;
use uppe_monitor::{Checker, Error, MonitorEngine, Repositories, Result, Target, UuidGenerator};

/// Checker that replays queued status codes; with an empty queue it keeps
/// returning the fallback code.
pub struct ScriptedChecker {
    queue: Mutex<VecDeque<(u16, Duration)>>,
    fallback: Option<u16>,
    delay: Duration,
}

impl ScriptedChecker {
    pub fn new(responses: &[(u16, u64)]) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(
                responses.iter().map(|&(code, ms)| (code, Duration::from_millis(ms))).collect(),
            ),
            fallback: None,
            delay: Duration::ZERO,
        })
    }

    /// Always answer `code` after sleeping `delay`
    pub fn constant(code: u16, delay: Duration) -> Arc<Self> {
        Arc::new(Self { queue: Mutex::new(VecDeque::new()), fallback: Some(code), delay })
    }

    pub fn push(&self, code: u16, ms: u64) {
        self.queue.lock().unwrap().push_back((code, Duration::from_millis(ms)));
    }
}

#[async_trait]
impl Checker for ScriptedChecker {
    async fn check(&self, _url: &str, _timeout: Duration) -> Result<ProbeResponse> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let next = self.queue.lock().unwrap().pop_front();
        match (next, self.fallback) {
            (Some((status_code, response_time)), _) => {
                Ok(ProbeResponse { status_code, response_time })
            }
            (None, Some(status_code)) => {
                Ok(ProbeResponse { status_code, response_time: self.delay })
            }
            (None, None) => Err(Error::Transport("script exhausted".into())),
        }
    }
}

pub const TARGET_ID: &str = "target-1";

pub fn example_target() -> Target {
    Target::new(TARGET_ID, "https://example.com", "Example", Duration::from_secs(30))
}

/// Engine over fresh in-memory repositories holding `example_target()`
pub async fn engine_with(checker: Arc<dyn Checker>) -> (MonitorEngine, Repositories) {
    let repos = Repositories::in_memory();
    repos.targets.save(&example_target()).await.unwrap();
    let engine = MonitorEngine::new(repos.clone(), checker, Arc::new(UuidGenerator));
    (engine, repos)
}
