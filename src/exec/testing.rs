//! Scriptable runner for unit tests

use super::{OutputSink, ProcessOutcome, ProcessRequest, ProcessRunner};
use crate::error::{CistepError, CistepResult};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

type Script = dyn Fn(&ProcessRequest, &dyn OutputSink) -> CistepResult<i32> + Send + Sync;

/// Records every request and answers with a scripted exit code
pub(crate) struct FakeRunner {
    script: Box<Script>,
    pub requests: Mutex<Vec<ProcessRequest>>,
}

impl FakeRunner {
    /// Every process succeeds silently
    pub fn ok() -> Self {
        Self::with(|_, _| Ok(0))
    }

    pub fn with<F>(script: F) -> Self
    where
        F: Fn(&ProcessRequest, &dyn OutputSink) -> CistepResult<i32> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ProcessRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn run(
        &self,
        request: &ProcessRequest,
        sink: &dyn OutputSink,
    ) -> CistepResult<ProcessOutcome> {
        self.requests.lock().unwrap().push(request.clone());
        let exit_code = (self.script)(request, sink)?;
        if exit_code != 0 && !request.ignore_exit_code {
            return Err(CistepError::ProcessExit {
                command: request.program.display().to_string(),
                code: exit_code,
            });
        }
        Ok(ProcessOutcome {
            exit_code,
            duration: Duration::from_millis(1),
        })
    }
}
