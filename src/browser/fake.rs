//! Scripted in-memory collaborator for unit tests.
//!
//! Outcomes for `wait_for_request` are queued per pattern with a virtual
//! delay, so tests drive the keep-alive loops under tokio's paused clock
//! without a real automation engine.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::sleep;

use super::{BrowserError, BrowserSession, CapturedRequest};

#[derive(Default)]
pub struct ScriptedBrowser {
    waits: Mutex<HashMap<String, VecDeque<(Duration, CapturedRequest)>>>,
    execute_results: Mutex<VecDeque<Result<Value, String>>>,
    navigations: Mutex<Vec<String>>,
    executions: Mutex<Vec<String>>,
    fail_executes: AtomicBool,
}

impl ScriptedBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a request that completes `after` the waiter starts listening.
    /// Delays longer than the waiter's timeout carry over to the next wait.
    pub fn expect_request(&self, pattern: &str, after: Duration, request: CapturedRequest) {
        self.waits
            .lock()
            .unwrap()
            .entry(pattern.to_string())
            .or_default()
            .push_back((after, request));
    }

    /// Queue an explicit result for the next `execute` call.
    pub fn push_execute_result(&self, result: Result<Value, String>) {
        self.execute_results.lock().unwrap().push_back(result);
    }

    /// Make every unscripted `execute` call fail.
    pub fn fail_executes(&self, fail: bool) {
        self.fail_executes.store(fail, Ordering::SeqCst);
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }

    pub fn executions(&self) -> Vec<String> {
        self.executions.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrowserSession for ScriptedBrowser {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.navigations.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn wait_for_request(
        &self,
        pattern: &str,
        timeout: Duration,
    ) -> Result<CapturedRequest, BrowserError> {
        let next = {
            let mut waits = self.waits.lock().unwrap();
            waits.get_mut(pattern).and_then(|queue| queue.pop_front())
        };

        match next {
            Some((delay, request)) if delay <= timeout => {
                sleep(delay).await;
                Ok(request)
            }
            Some((delay, request)) => {
                // arrives during a later wait
                self.waits
                    .lock()
                    .unwrap()
                    .entry(pattern.to_string())
                    .or_default()
                    .push_front((delay - timeout, request));
                sleep(timeout).await;
                Err(BrowserError::Timeout {
                    pattern: pattern.to_string(),
                    timeout,
                })
            }
            None => {
                sleep(timeout).await;
                Err(BrowserError::Timeout {
                    pattern: pattern.to_string(),
                    timeout,
                })
            }
        }
    }

    async fn execute(&self, script: &str) -> Result<Value, BrowserError> {
        self.executions.lock().unwrap().push(script.to_string());
        if self.fail_executes.load(Ordering::SeqCst) {
            return Err(BrowserError::Engine("scripted failure".to_string()));
        }
        match self.execute_results.lock().unwrap().pop_front() {
            Some(Ok(value)) => Ok(value),
            Some(Err(message)) => Err(BrowserError::Engine(message)),
            None => Ok(Value::Null),
        }
    }
}
