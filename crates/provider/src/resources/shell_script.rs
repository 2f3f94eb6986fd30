//! Shell script resource
//!
//! Lifecycle driver for resources whose create, read, update, and delete
//! steps are user commands. The auxiliary output of create and read becomes
//! the resource's `update_trigger`, which is piped back into every later
//! command and compared between refreshes to detect drift.

use std::sync::Arc;

use async_trait::async_trait;
use shellform_common::{
    crypto::generate_resource_id, Action, ResourceConfig, ResourceState, Result,
    SHELL_SCRIPT_TYPE,
};
use tracing::{debug, info};

use super::Resource;
use crate::gate::ExecutionGate;
use crate::interpreter::classify;
use crate::resolver::{resolve, ResolvedCommand};
use crate::runner::{CommandOutput, CommandRequest, CommandRunner};

pub struct ShellScriptResource {
    runner: Arc<dyn CommandRunner>,
    gate: Arc<ExecutionGate>,
    gate_key: String,
}

impl ShellScriptResource {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        gate: Arc<ExecutionGate>,
        gate_key: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            gate,
            gate_key: gate_key.into(),
        }
    }

    pub fn gate_key(&self) -> &str {
        &self.gate_key
    }

    fn request(command: ResolvedCommand, config: &ResourceConfig, stdin: &str) -> CommandRequest {
        CommandRequest {
            action: command.action,
            command: command.text,
            stdin: stdin.to_string(),
            environment: config.environment.clone(),
            working_directory: config.working_directory.clone(),
        }
    }

    /// Run a command while holding the gate, releasing it on every path
    async fn run_exclusive(&self, request: &CommandRequest) -> Result<CommandOutput> {
        let guard = self.gate.acquire(&self.gate_key).await;
        let result = self.runner.run(request).await;
        guard.release();
        result
    }
}

#[async_trait]
impl Resource for ShellScriptResource {
    fn type_name() -> &'static str {
        SHELL_SCRIPT_TYPE
    }

    async fn create(&self, config: &ResourceConfig) -> Result<ResourceState> {
        let command = resolve(Action::Create, config).await?;
        let request = Self::request(command, config, "");

        let guard = self.gate.acquire(&self.gate_key).await;
        let output = self.runner.run(&request).await?;

        let interpretation = classify(&output.extraout);
        let mut state = ResourceState {
            id: generate_resource_id()?,
            output: interpretation.output.clone().into_map(),
            ..Default::default()
        };
        info!("Created {} {}", SHELL_SCRIPT_TYPE, state.id);

        if interpretation.resource_exists() {
            state.update_trigger = interpretation.trigger;
            guard.release();
            return Ok(state);
        }

        guard.release();
        debug!("Create produced no output, reading back state");
        self.read(config, &state).await
    }

    async fn read(&self, config: &ResourceConfig, state: &ResourceState) -> Result<ResourceState> {
        let command = resolve(Action::Read, config).await?;
        let request = Self::request(command, config, &state.update_trigger);
        let output = self.run_exclusive(&request).await?;

        let interpretation = classify(&output.extraout);
        let mut next = state.clone();
        next.output = interpretation.output.clone().into_map();

        if interpretation.resource_exists() {
            debug!("Have update_trigger: {}", state.update_trigger);
            debug!("Setting as update_trigger: {}", interpretation.trigger);
            next.update_trigger = interpretation.trigger;
        } else {
            info!("{} {} no longer exists", SHELL_SCRIPT_TYPE, state.id);
            next.clear();
        }
        Ok(next)
    }

    async fn update(&self, config: &ResourceConfig, state: &ResourceState) -> Result<ResourceState> {
        let command = resolve(config.update_action(), config).await?;
        let request = Self::request(command, config, &state.update_trigger);
        self.run_exclusive(&request).await?;

        info!("Updated {} {}", SHELL_SCRIPT_TYPE, state.id);
        self.read(config, state).await
    }

    async fn delete(&self, config: &ResourceConfig, state: &ResourceState) -> Result<ResourceState> {
        debug!("Deleting {} {}", SHELL_SCRIPT_TYPE, state.id);
        let command = resolve(Action::Delete, config).await?;
        let request = Self::request(command, config, &state.update_trigger);
        self.run_exclusive(&request).await?;

        info!("Deleted {} {}", SHELL_SCRIPT_TYPE, state.id);
        let mut next = state.clone();
        next.clear();
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::DEFAULT_READ_COMMAND;
    use crate::runner::mock::MockRunner;
    use shellform_common::Error;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn config() -> ResourceConfig {
        ResourceConfig {
            command_create: "create-cmd".to_string(),
            command_read: "read-cmd".to_string(),
            command_update: "update-cmd".to_string(),
            command_delete: "delete-cmd".to_string(),
            ..Default::default()
        }
    }

    fn resource(runner: &Arc<MockRunner>) -> ShellScriptResource {
        ShellScriptResource::new(runner.clone(), Arc::new(ExecutionGate::new()), "shell_script")
    }

    fn existing(trigger: &str) -> ResourceState {
        ResourceState {
            id: "abc".to_string(),
            update_trigger: trigger.to_string(),
            output: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_create_with_structured_output() {
        let runner = Arc::new(MockRunner::new());
        runner.respond(Action::Create, r#"{"ok":"1"}"#);

        let state = resource(&runner).create(&config()).await.unwrap();
        assert_eq!(state.id.len(), 64);
        assert_eq!(state.update_trigger, r#"{"ok":"1"}"#);
        assert_eq!(state.output.get("ok").map(String::as_str), Some("1"));

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].command, "create-cmd");
        assert_eq!(calls[0].stdin, "");
    }

    #[tokio::test]
    async fn test_create_with_plain_output() {
        let runner = Arc::new(MockRunner::new());
        runner.respond(Action::Create, "plain");

        let state = resource(&runner).create(&config()).await.unwrap();
        assert_eq!(state.update_trigger, "plain");
        assert!(state.output.is_empty());
        assert!(state.exists());
    }

    #[tokio::test]
    async fn test_create_without_output_reads_back() {
        let runner = Arc::new(MockRunner::new());
        runner.respond(Action::Create, "");
        runner.respond(Action::Read, r#"{"from":"read"}"#);

        let state = resource(&runner).create(&config()).await.unwrap();
        assert!(state.exists());
        assert_eq!(state.update_trigger, r#"{"from":"read"}"#);
        assert_eq!(state.output.get("from").map(String::as_str), Some("read"));

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].action, Action::Read);
        assert_eq!(calls[1].stdin, "created");
    }

    #[tokio::test]
    async fn test_create_failure_propagates() {
        let runner = Arc::new(MockRunner::new());
        runner.fail(Action::Create, 1);

        let err = resource(&runner).create(&config()).await.unwrap_err();
        assert!(matches!(err, Error::CommandFailed { action: Action::Create, .. }));
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_create_failure_releases_gate() {
        let runner = Arc::new(MockRunner::new());
        runner.fail(Action::Create, 1);
        runner.respond(Action::Create, "second");
        let resource = resource(&runner);

        assert!(resource.create(&config()).await.is_err());
        let state = tokio::time::timeout(Duration::from_secs(1), resource.create(&config()))
            .await
            .expect("gate left locked")
            .unwrap();
        assert_eq!(state.update_trigger, "second");
    }

    #[tokio::test]
    async fn test_resolution_failure_runs_nothing() {
        let runner = Arc::new(MockRunner::new());
        let err = resource(&runner)
            .create(&ResourceConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoCommandSource));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_read_resolution_failure_leaves_state() {
        let runner = Arc::new(MockRunner::new());
        let state = existing("t1");
        let err = resource(&runner)
            .read(&ResourceConfig::default(), &state)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoCommandSource));
        assert!(runner.calls().is_empty());
        assert_eq!(state, existing("t1"));
    }

    #[tokio::test]
    async fn test_read_updates_trigger() {
        let runner = Arc::new(MockRunner::new());
        runner.respond(Action::Read, "t2");

        let state = resource(&runner)
            .read(&config(), &existing("t1"))
            .await
            .unwrap();
        assert_eq!(state.id, "abc");
        assert_eq!(state.update_trigger, "t2");
        assert_eq!(runner.calls()[0].stdin, "t1");
    }

    #[tokio::test]
    async fn test_read_empty_output_clears_id() {
        let runner = Arc::new(MockRunner::new());
        runner.respond(Action::Read, "");

        let state = resource(&runner)
            .read(&config(), &existing("t1"))
            .await
            .unwrap();
        assert!(!state.exists());
        assert!(state.output.is_empty());
    }

    #[tokio::test]
    async fn test_read_uses_default_command() {
        let runner = Arc::new(MockRunner::new());
        runner.respond(Action::Read, "t1");
        let config = ResourceConfig {
            command_read: String::new(),
            ..config()
        };

        resource(&runner).read(&config, &existing("t1")).await.unwrap();
        assert_eq!(runner.calls()[0].command, DEFAULT_READ_COMMAND);
    }

    #[tokio::test]
    async fn test_update_then_reads() {
        let runner = Arc::new(MockRunner::new());
        runner.respond(Action::Update, "ignored");
        runner.respond(Action::Read, "t2");

        let state = resource(&runner)
            .update(&config(), &existing("t1"))
            .await
            .unwrap();
        assert_eq!(state.update_trigger, "t2");

        let calls = runner.calls();
        assert_eq!(calls[0].command, "update-cmd");
        assert_eq!(calls[0].stdin, "t1");
        assert_eq!(calls[1].action, Action::Read);
    }

    #[tokio::test]
    async fn test_idempotent_update_runs_create_command() {
        let runner = Arc::new(MockRunner::new());
        runner.respond(Action::Read, "t2");
        let config = ResourceConfig {
            idempotent: true,
            ..config()
        };

        resource(&runner).update(&config, &existing("t1")).await.unwrap();
        let calls = runner.calls();
        assert_eq!(calls[0].action, Action::Create);
        assert_eq!(calls[0].command, "create-cmd");
        assert_eq!(calls[0].stdin, "t1");
    }

    #[tokio::test]
    async fn test_update_failure_skips_read() {
        let runner = Arc::new(MockRunner::new());
        runner.fail(Action::Update, 4);

        let err = resource(&runner)
            .update(&config(), &existing("t1"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CommandFailed { code: Some(4), .. }));
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_clears_id() {
        let runner = Arc::new(MockRunner::new());
        let mut prior = existing("t1");
        prior.output.insert("k".to_string(), "v".to_string());

        let state = resource(&runner).delete(&config(), &prior).await.unwrap();
        assert!(!state.exists());
        assert_eq!(runner.calls()[0].stdin, "t1");
    }

    #[tokio::test]
    async fn test_delete_failure_propagates() {
        let runner = Arc::new(MockRunner::new());
        runner.fail(Action::Delete, 2);

        let result = resource(&runner).delete(&config(), &existing("t1")).await;
        assert!(result.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_do_not_overlap() {
        let runner = Arc::new(MockRunner::new().with_delay(Duration::from_millis(20)));
        runner.respond(Action::Create, "a");
        runner.respond(Action::Create, "b");
        let gate = Arc::new(ExecutionGate::new());
        let first = ShellScriptResource::new(runner.clone(), gate.clone(), "shell_script");
        let second = ShellScriptResource::new(runner.clone(), gate, "shell_script");

        let cfg = config();
        let (a, b) = tokio::join!(first.create(&cfg), second.create(&cfg));
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(runner.max_concurrency(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_update_shares_gate_with_delete() {
        let runner = Arc::new(MockRunner::new().with_delay(Duration::from_millis(20)));
        runner.respond(Action::Read, "t2");
        let gate = Arc::new(ExecutionGate::new());
        let updater = ShellScriptResource::new(runner.clone(), gate.clone(), "shell_script");
        let deleter = ShellScriptResource::new(runner.clone(), gate, "shell_script");

        let cfg = config();
        let state = existing("t1");
        let (updated, deleted) = tokio::join!(updater.update(&cfg, &state), deleter.delete(&cfg, &state));
        assert!(updated.is_ok() && deleted.is_ok());
        assert_eq!(runner.max_concurrency(), 1);
    }
}
