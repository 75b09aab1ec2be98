//! Network-resilience state machine
//!
//! The monitor runs as its own task for the duration of a scheduler run. It
//! owns the `NetworkState` exclusively; other components only ever see the
//! derived pause flag and the events sent over the escalation channel.
//!
//! State machine:
//!
//! - `Online` -- probe failure sets the pause flag, emits
//!   [`NetEvent::ConnectivityLost`] and moves to `Degraded(1)`.
//! - `Degraded(n)` -- re-probes every interval; a success returns to
//!   `Online`, reaching the failure threshold moves to `Waiting`.
//! - `Waiting` -- a bounded countdown, re-probing each tick; exhaustion
//!   raises a [`NetEvent::DecisionNeeded`] and moves to `RetryMode`.
//! - `RetryMode` -- dispatch stays paused. While the decision is pending the
//!   monitor keeps re-probing and recovers on its own if the network comes
//!   back. A "retry" answer probes immediately and re-prompts on failure; a
//!   "cancel" answer cancels the whole run.

use crate::config::ConnectivityConfig;
use crate::events::ReconnectDecision;
use crate::net::ConnectivityProbe;
use crate::signals::RunSignals;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Connectivity-loss escalation states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkState {
    Online,
    Degraded(u32),
    Waiting,
    RetryMode,
}

/// Events sent to the coordinator over the escalation channel.
#[derive(Debug)]
pub enum NetEvent {
    /// The network went away; dispatch is paused.
    ConnectivityLost,
    /// The network came back; dispatch resumes.
    ConnectivityRestored,
    /// Automatic recovery gave up; the user must choose retry or cancel.
    DecisionNeeded(oneshot::Sender<ReconnectDecision>),
}

/// How a pending reconnect prompt resolved.
enum DecisionOutcome {
    /// The network recovered on its own while the prompt was pending.
    Recovered,
    /// The user asked for another probe attempt.
    Retry,
    /// The user cancelled, or the prompt could not be delivered.
    Cancelled,
}

/// Background connectivity watcher.
pub struct NetworkMonitor<P> {
    probe: P,
    config: ConnectivityConfig,
    signals: Arc<RunSignals>,
    events: mpsc::Sender<NetEvent>,
}

impl<P: ConnectivityProbe> NetworkMonitor<P> {
    pub fn new(
        probe: P,
        config: ConnectivityConfig,
        signals: Arc<RunSignals>,
        events: mpsc::Sender<NetEvent>,
    ) -> Self {
        Self {
            probe,
            config,
            signals,
            events,
        }
    }

    /// Runs the state machine until the run is cancelled or the escalation
    /// channel closes. Normal end-of-run shutdown is an abort of this task.
    pub async fn run(self) {
        let mut state = NetworkState::Online;

        while !self.signals.is_cancelled() {
            state = match state {
                NetworkState::Online => {
                    if self.probe.check().await {
                        tokio::time::sleep(self.config.probe_interval()).await;
                        NetworkState::Online
                    } else {
                        tracing::warn!("connectivity lost; pausing dispatch");
                        self.enter_offline().await;
                        NetworkState::Degraded(1)
                    }
                }

                NetworkState::Degraded(fails) => {
                    if fails >= self.config.fail_threshold {
                        NetworkState::Waiting
                    } else {
                        tokio::time::sleep(self.config.probe_interval()).await;
                        if self.signals.is_cancelled() {
                            return;
                        }
                        if self.probe.check().await {
                            self.back_online().await;
                            NetworkState::Online
                        } else {
                            NetworkState::Degraded(fails + 1)
                        }
                    }
                }

                NetworkState::Waiting => {
                    let mut recovered = false;
                    for remaining in (0..self.config.countdown_ticks).rev() {
                        if self.signals.is_cancelled() {
                            return;
                        }
                        if self.probe.check().await {
                            recovered = true;
                            break;
                        }
                        tracing::debug!("reconnect countdown: {} ticks left", remaining);
                        tokio::time::sleep(self.config.tick()).await;
                    }
                    if recovered {
                        self.back_online().await;
                        NetworkState::Online
                    } else if self.signals.is_cancelled() {
                        return;
                    } else {
                        NetworkState::RetryMode
                    }
                }

                NetworkState::RetryMode => {
                    let (reply_tx, reply_rx) = oneshot::channel();
                    if self
                        .events
                        .send(NetEvent::DecisionNeeded(reply_tx))
                        .await
                        .is_err()
                    {
                        // Escalation consumer is gone; the run is over.
                        return;
                    }
                    match self.await_decision(reply_rx).await {
                        DecisionOutcome::Recovered => {
                            self.back_online().await;
                            NetworkState::Online
                        }
                        DecisionOutcome::Retry => {
                            if self.probe.check().await {
                                self.back_online().await;
                                NetworkState::Online
                            } else {
                                // Still down: prompt again.
                                NetworkState::RetryMode
                            }
                        }
                        DecisionOutcome::Cancelled => {
                            tracing::warn!("run cancelled from reconnect prompt");
                            self.signals.cancel();
                            return;
                        }
                    }
                }
            };
        }
    }

    /// Waits for the user's answer while keeping background re-probes going,
    /// so the run recovers on its own if the network returns mid-prompt.
    async fn await_decision(
        &self,
        mut reply: oneshot::Receiver<ReconnectDecision>,
    ) -> DecisionOutcome {
        loop {
            tokio::select! {
                answer = &mut reply => {
                    return match answer {
                        Ok(ReconnectDecision::Retry) => DecisionOutcome::Retry,
                        Ok(ReconnectDecision::Cancel) | Err(_) => DecisionOutcome::Cancelled,
                    };
                }
                _ = tokio::time::sleep(self.config.probe_interval()) => {
                    if self.signals.is_cancelled() {
                        return DecisionOutcome::Cancelled;
                    }
                    if self.probe.check().await {
                        return DecisionOutcome::Recovered;
                    }
                }
            }
        }
    }

    async fn enter_offline(&self) {
        self.signals.set_paused(true);
        let _ = self.events.send(NetEvent::ConnectivityLost).await;
    }

    async fn back_online(&self) {
        tracing::info!("connectivity restored; resuming dispatch");
        self.signals.set_paused(false);
        let _ = self.events.send(NetEvent::ConnectivityRestored).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Probe driven by a scripted prefix of outcomes, then a settable flag.
    struct ScriptedProbe {
        script: Mutex<VecDeque<bool>>,
        fallback: AtomicBool,
        calls: AtomicU32,
    }

    impl ScriptedProbe {
        fn new(prefix: Vec<bool>, fallback: bool) -> Self {
            Self {
                script: Mutex::new(prefix.into()),
                fallback: AtomicBool::new(fallback),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ConnectivityProbe for Arc<ScriptedProbe> {
        async fn check(&self) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.fallback.load(Ordering::SeqCst))
        }
    }

    fn fast_config() -> ConnectivityConfig {
        ConnectivityConfig {
            fail_threshold: 3,
            probe_interval_ms: 5,
            countdown_ticks: 10,
            tick_ms: 5,
            ..ConnectivityConfig::default()
        }
    }

    async fn recv_or_panic(rx: &mut mpsc::Receiver<NetEvent>) -> NetEvent {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for monitor event")
            .expect("monitor event channel closed")
    }

    #[tokio::test]
    async fn test_recovers_without_prompting() {
        let probe = Arc::new(ScriptedProbe::new(vec![false, false, true], true));
        let signals = Arc::new(RunSignals::new());
        let (tx, mut rx) = mpsc::channel(8);
        let monitor = NetworkMonitor::new(probe, fast_config(), signals.clone(), tx);
        let handle = tokio::spawn(monitor.run());

        assert!(matches!(
            recv_or_panic(&mut rx).await,
            NetEvent::ConnectivityLost
        ));
        assert!(signals.is_paused());
        assert!(matches!(
            recv_or_panic(&mut rx).await,
            NetEvent::ConnectivityRestored
        ));
        assert!(!signals.is_paused());
        assert!(!signals.is_cancelled());

        signals.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_prompt_only_after_threshold_and_countdown() {
        let probe = Arc::new(ScriptedProbe::new(vec![], false));
        let signals = Arc::new(RunSignals::new());
        let (tx, mut rx) = mpsc::channel(8);
        let monitor = NetworkMonitor::new(probe.clone(), fast_config(), signals.clone(), tx);
        let handle = tokio::spawn(monitor.run());

        assert!(matches!(
            recv_or_panic(&mut rx).await,
            NetEvent::ConnectivityLost
        ));

        let event = recv_or_panic(&mut rx).await;
        let NetEvent::DecisionNeeded(reply) = event else {
            panic!("expected a decision request, got {:?}", event);
        };
        // 3 consecutive failures plus all 10 countdown probes must have run
        // before the prompt was raised.
        assert!(probe.calls() >= 13, "only {} probes ran", probe.calls());

        reply.send(ReconnectDecision::Cancel).unwrap();
        handle.await.unwrap();
        assert!(signals.is_cancelled());
    }

    #[tokio::test]
    async fn test_retry_decision_reprobes_and_recovers() {
        let probe = Arc::new(ScriptedProbe::new(vec![], false));
        let signals = Arc::new(RunSignals::new());
        let (tx, mut rx) = mpsc::channel(8);
        let monitor = NetworkMonitor::new(probe.clone(), fast_config(), signals.clone(), tx);
        let handle = tokio::spawn(monitor.run());

        assert!(matches!(
            recv_or_panic(&mut rx).await,
            NetEvent::ConnectivityLost
        ));
        let event = recv_or_panic(&mut rx).await;
        let NetEvent::DecisionNeeded(reply) = event else {
            panic!("expected a decision request, got {:?}", event);
        };

        // The network comes back right before the user clicks retry.
        probe.fallback.store(true, Ordering::SeqCst);
        reply.send(ReconnectDecision::Retry).unwrap();

        assert!(matches!(
            recv_or_panic(&mut rx).await,
            NetEvent::ConnectivityRestored
        ));
        assert!(!signals.is_paused());

        signals.cancel();
        handle.await.unwrap();
    }
}
