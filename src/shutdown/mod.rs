/*
 * Copyright (C) 2025 Pedro Henrique / phdev13
 *
 * File: src/shutdown/mod.rs
 *
 * Signal-driven shutdown. The SIGINT listener does nothing but flip a shared
 * flag; the acquisition loop checks that flag at the top of every iteration
 * and wakes from its poll sleep when it changes. Releasing the shared-memory
 * channel happens afterwards in `main`, outside any signal context.
 *
 * The flag is a `tokio::sync::watch` channel so the loop can both read it
 * cheaply and `await` a change.
 *
 * Dependencies:
 *   - tokio: For the signal listener and the watch channel.
 *   - log: For structured logging.
 *
 * SPDX-License-Identifier: AGPL-3.0 license
 */

//! # Signal-Driven Cleanup

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Creates a linked trigger/token pair.
pub fn channel() -> (ShutdownTrigger, ShutdownToken) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, ShutdownToken { rx })
}

/// The write end of the shutdown flag.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Requests shutdown. Repeated calls are harmless.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

/// The read end of the shutdown flag.
#[derive(Debug, Clone)]
pub struct ShutdownToken {
    rx: watch::Receiver<bool>,
}

impl ShutdownToken {
    /// `true` once shutdown has been requested.
    pub fn is_requested(&self) -> bool {
        *self.rx.borrow()
    }

    /// Completes when shutdown is requested.
    ///
    /// If every trigger is dropped without firing, this never completes.
    pub async fn requested(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Registers the SIGINT handler and spawns the task that fires `trigger`.
///
/// Registration happens before this returns, so a failure here is reported
/// to the caller instead of being lost inside the task.
pub fn install_interrupt_handler(trigger: ShutdownTrigger) -> std::io::Result<JoinHandle<()>> {
    let mut interrupts = signal(SignalKind::interrupt())?;

    Ok(tokio::spawn(async move {
        if interrupts.recv().await.is_some() {
            log::info!("Interrupt received, shutting down");
            trigger.trigger();
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_token_starts_clear() {
        let (_trigger, token) = channel();
        assert!(!token.is_requested());
    }

    #[test]
    fn test_trigger_is_seen_by_every_token() {
        let (trigger, token) = channel();
        let other = token.clone();
        trigger.trigger();
        trigger.trigger();
        assert!(token.is_requested());
        assert!(other.is_requested());
    }

    #[tokio::test]
    async fn test_requested_wakes_on_trigger() {
        let (trigger, mut token) = channel();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            trigger.trigger();
        });
        tokio::time::timeout(Duration::from_secs(2), token.requested())
            .await
            .expect("shutdown was not observed");
    }

    #[tokio::test]
    async fn test_requested_returns_immediately_when_already_set() {
        let (trigger, mut token) = channel();
        trigger.trigger();
        tokio::time::timeout(Duration::from_millis(100), token.requested())
            .await
            .expect("already-set flag should complete at once");
    }

    // SIGINT is process-wide, so other tests with a handler installed may
    // see this one too. They only ever wait for it.
    #[tokio::test]
    async fn test_sigint_reaches_the_token() {
        let (trigger, mut token) = channel();
        let handle = install_interrupt_handler(trigger).unwrap();

        assert_eq!(unsafe { libc::raise(libc::SIGINT) }, 0);

        tokio::time::timeout(Duration::from_secs(2), token.requested())
            .await
            .expect("SIGINT was not observed");
        assert!(token.is_requested());
        handle.await.unwrap();
    }
}
