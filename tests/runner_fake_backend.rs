// tests/runner_fake_backend.rs

use std::error::Error;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use watchpty::engine::{control_channels, CoordinatorEndpoints, RestartOutcome, WatcherEndpoints};
use watchpty::errors::WatchptyError;
use watchpty::exec::{KillOutcome, Runner, RunnerState, RunnerStatus};
use watchpty::types::CommandSpec;
use watchpty_test_utils::{init_tracing, with_timeout, CaptureSink, FakeBackend};

type TestResult = Result<(), Box<dyn Error>>;

struct Harness {
    backend: FakeBackend,
    sink: CaptureSink,
    status: watch::Receiver<RunnerStatus>,
    watcher: WatcherEndpoints,
    coordinator: CoordinatorEndpoints,
    handle: JoinHandle<()>,
}

fn start(backend: FakeBackend, input: Option<mpsc::Receiver<Vec<u8>>>) -> Harness {
    let sink = CaptureSink::new();
    let (watcher, runner_ends, coordinator) = control_channels();

    let mut runner = Runner::new(
        CommandSpec::from("echo hello"),
        backend.clone(),
        sink.clone(),
        runner_ends,
    );
    if let Some(input) = input {
        runner = runner.with_input(input);
    }
    let status = runner.subscribe();
    let handle = tokio::spawn(runner.run());

    Harness {
        backend,
        sink,
        status,
        watcher,
        coordinator,
        handle,
    }
}

async fn wait_until(
    status: &mut watch::Receiver<RunnerStatus>,
    pred: impl FnMut(&RunnerStatus) -> bool,
) -> RunnerStatus {
    *with_timeout(status.wait_for(pred))
        .await
        .expect("runner status channel closed")
}

async fn stop(h: Harness) -> TestResult {
    h.coordinator
        .stop_runner
        .send(())
        .map_err(|_| "runner already gone")?;
    with_timeout(h.coordinator.runner_done).await?;
    with_timeout(h.handle).await?;
    Ok(())
}

#[tokio::test]
async fn first_run_output_reaches_sink() -> TestResult {
    init_tracing();

    let mut h = start(FakeBackend::new().with_output("hello\n"), None);

    let status = wait_until(&mut h.status, |s| s.state == RunnerState::Running).await;
    assert_eq!(status.generation, 1);
    assert_eq!(status.pgid, Some(1001));
    assert!(h.sink.wait_for_count("hello\n", 1, Duration::from_secs(2)).await);
    assert_eq!(h.backend.spawned(), vec![("echo hello".to_string(), 1001)]);

    stop(h).await
}

#[tokio::test]
async fn restart_kills_old_group_before_new_one_starts() -> TestResult {
    init_tracing();

    let mut h = start(FakeBackend::new().with_output("hello\n"), None);
    wait_until(&mut h.status, |s| s.state == RunnerState::Running).await;

    assert_eq!(h.watcher.restart.notify(), RestartOutcome::Sent);
    let status = wait_until(&mut h.status, |s| {
        s.generation == 2 && s.state == RunnerState::Running
    })
    .await;

    assert_eq!(status.pgid, Some(1002));
    assert_eq!(h.backend.spawned_pgids(), vec![1001, 1002]);
    assert_eq!(h.backend.kills(), vec![(1001, KillOutcome::Killed)]);
    assert!(!h.backend.is_alive(1001));
    assert!(h.backend.is_alive(1002));
    assert!(h.sink.wait_for_count("hello\n", 2, Duration::from_secs(2)).await);

    stop(h).await
}

#[tokio::test]
async fn burst_of_requests_causes_one_restart() -> TestResult {
    init_tracing();

    let mut h = start(FakeBackend::new(), None);
    wait_until(&mut h.status, |s| s.state == RunnerState::Running).await;

    let outcomes: Vec<_> = (0..5).map(|_| h.watcher.restart.notify()).collect();
    assert_eq!(outcomes[0], RestartOutcome::Sent);
    assert!(outcomes[1..].iter().all(|o| *o == RestartOutcome::Coalesced));

    wait_until(&mut h.status, |s| {
        s.generation == 2 && s.state == RunnerState::Running
    })
    .await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(h.status.borrow().generation, 2);
    assert_eq!(h.backend.spawned_pgids(), vec![1001, 1002]);

    stop(h).await
}

#[tokio::test]
async fn stop_kills_the_group_and_reports_done() -> TestResult {
    init_tracing();

    let mut h = start(FakeBackend::new(), None);
    wait_until(&mut h.status, |s| s.state == RunnerState::Running).await;

    let backend = h.backend.clone();
    let mut status = h.status.clone();
    stop(h).await?;

    assert_eq!(backend.kills(), vec![(1001, KillOutcome::Killed)]);
    assert_eq!(status.borrow_and_update().state, RunnerState::Stopped);
    Ok(())
}

#[tokio::test]
async fn exited_command_waits_for_next_change() -> TestResult {
    init_tracing();

    let mut h = start(FakeBackend::new(), None);
    wait_until(&mut h.status, |s| s.state == RunnerState::Running).await;

    h.backend.exit(1001, 0);
    wait_until(&mut h.status, |s| s.state == RunnerState::Exited).await;
    assert_eq!(h.backend.spawned_pgids(), vec![1001]);

    // Killing the vanished group is tolerated, then the command starts again.
    h.watcher.restart.notify();
    let status = wait_until(&mut h.status, |s| {
        s.generation == 2 && s.state == RunnerState::Running
    })
    .await;
    assert_eq!(status.pgid, Some(1002));
    assert_eq!(h.backend.kills(), vec![(1001, KillOutcome::AlreadyExited)]);

    stop(h).await
}

#[tokio::test]
async fn stop_after_exit_still_reports_done() -> TestResult {
    init_tracing();

    let mut h = start(FakeBackend::new(), None);
    wait_until(&mut h.status, |s| s.state == RunnerState::Running).await;
    h.backend.exit(1001, 3);
    wait_until(&mut h.status, |s| s.state == RunnerState::Exited).await;

    let backend = h.backend.clone();
    stop(h).await?;
    assert_eq!(backend.kills(), vec![(1001, KillOutcome::AlreadyExited)]);
    Ok(())
}

#[tokio::test]
async fn input_goes_to_the_current_command() -> TestResult {
    init_tracing();

    let (input_tx, input_rx) = mpsc::channel(4);
    let mut h = start(FakeBackend::new(), Some(input_rx));
    wait_until(&mut h.status, |s| s.state == RunnerState::Running).await;

    input_tx.send(b"first\n".to_vec()).await?;
    with_timeout(async {
        while h.backend.input_for(1001) != "first\n" {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;

    h.watcher.restart.notify();
    wait_until(&mut h.status, |s| {
        s.generation == 2 && s.state == RunnerState::Running
    })
    .await;

    input_tx.send(b"second\n".to_vec()).await?;
    with_timeout(async {
        while h.backend.input_for(1002) != "second\n" {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert_eq!(h.backend.input_for(1001), "first\n");

    stop(h).await
}

#[tokio::test]
async fn failed_kill_is_fatal() -> TestResult {
    init_tracing();

    let mut h = start(FakeBackend::new().failing_kills(), None);
    wait_until(&mut h.status, |s| s.state == RunnerState::Running).await;

    h.watcher.restart.notify();

    let err = with_timeout(h.coordinator.fatal_rx.recv())
        .await
        .ok_or("fatal channel closed")?;
    assert!(matches!(err, WatchptyError::Other(_)), "got {err:?}");

    with_timeout(h.handle).await?;
    assert!(h.coordinator.runner_done.await.is_err());
    Ok(())
}

#[tokio::test]
async fn failed_spawn_is_fatal() -> TestResult {
    init_tracing();

    let mut h = start(FakeBackend::new().failing_spawns(), None);

    let err = with_timeout(h.coordinator.fatal_rx.recv())
        .await
        .ok_or("fatal channel closed")?;
    assert!(matches!(err, WatchptyError::Pty(_)), "got {err:?}");
    assert!(h.backend.spawned().is_empty());

    with_timeout(h.handle).await?;
    Ok(())
}

#[tokio::test]
async fn escaped_process_does_not_hold_up_restart() -> TestResult {
    init_tracing();

    let mut h = start(FakeBackend::new().with_output("hello\n").with_stray_process(), None);
    wait_until(&mut h.status, |s| s.state == RunnerState::Running).await;
    assert!(h.sink.wait_for_count("hello\n", 1, Duration::from_secs(2)).await);

    h.watcher.restart.notify();
    let status = wait_until(&mut h.status, |s| {
        s.generation == 2 && s.state == RunnerState::Running
    })
    .await;
    assert_eq!(status.pgid, Some(1002));
    assert!(h.sink.wait_for_count("hello\n", 2, Duration::from_secs(2)).await);

    // The old session's leftover writer no longer reaches the terminal.
    h.backend.write_stray(1001, "late\n")?;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!h.sink.contents().contains("late"));

    // Later restarts keep working.
    h.watcher.restart.notify();
    wait_until(&mut h.status, |s| {
        s.generation == 3 && s.state == RunnerState::Running
    })
    .await;

    h.backend.end_stray(1001);
    h.backend.end_stray(1002);
    h.backend.end_stray(1003);
    stop(h).await
}

#[tokio::test]
async fn exited_command_is_reaped_only_after_its_group_is_killed() -> TestResult {
    init_tracing();

    let mut h = start(FakeBackend::new(), None);
    wait_until(&mut h.status, |s| s.state == RunnerState::Running).await;

    h.backend.exit(1001, 0);
    wait_until(&mut h.status, |s| s.state == RunnerState::Exited).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(h.backend.reaped().is_empty(), "reaped before the kill");

    h.watcher.restart.notify();
    wait_until(&mut h.status, |s| {
        s.generation == 2 && s.state == RunnerState::Running
    })
    .await;
    assert_eq!(h.backend.kills(), vec![(1001, KillOutcome::AlreadyExited)]);

    let backend = h.backend.clone();
    with_timeout(async {
        while backend.reaped() != vec![1001] {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;

    stop(h).await?;
    with_timeout(async {
        while backend.reaped() != vec![1001, 1002] {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    Ok(())
}
