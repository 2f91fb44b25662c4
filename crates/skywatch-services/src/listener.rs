//! Bus reactions for the coordinators.
//!
//! A listener's handler runs inside [`EventBus::publish`], so state changes
//! are visible as soon as `publish` returns. Network work a handler needs
//! comes back as a [`FollowUp`] and runs on its own tracked task, so a slow
//! fetch never holds up later messages.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::bus::{EventBus, Message, MessageKind, Subscription};

/// Deferred async work returned by a listener handler
pub type FollowUp = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Box `work` as a handler's follow-up.
pub fn follow_up<F>(work: F) -> Option<FollowUp>
where
    F: Future<Output = ()> + Send + 'static,
{
    let boxed: FollowUp = Box::pin(work);
    Some(boxed)
}

/// Owns a listener's subscriptions and follow-up tasks. Dropping it
/// unsubscribes and cancels pending follow-ups.
#[derive(Debug)]
pub struct ListenerHandle {
    name: &'static str,
    subscriptions: Vec<Subscription>,
    cancel: CancellationToken,
    tasks: TaskTracker,
}

impl ListenerHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Unsubscribe, cancel pending follow-ups and wait for them to stop.
    pub async fn shutdown(mut self) {
        self.subscriptions.clear();
        self.cancel.cancel();
        self.tasks.close();
        self.tasks.wait().await;
        tracing::debug!("Listener {} stopped", self.name);
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.tasks.close();
    }
}

/// Subscribe `on_message` to `kinds`.
///
/// The handler runs synchronously during `publish`. A returned follow-up is
/// spawned at once, so follow-ups of successive messages run concurrently.
/// Must be called inside a tokio runtime.
pub fn spawn_listener<F>(
    name: &'static str,
    bus: &EventBus,
    kinds: &[MessageKind],
    on_message: F,
) -> ListenerHandle
where
    F: Fn(&Message) -> Option<FollowUp> + Send + Sync + 'static,
{
    let runtime = Handle::current();
    let cancel = CancellationToken::new();
    let tasks = TaskTracker::new();
    let on_message = Arc::new(on_message);

    let subscriptions = kinds
        .iter()
        .map(|kind| {
            let on_message = Arc::clone(&on_message);
            let token = cancel.clone();
            let tasks = tasks.clone();
            let runtime = runtime.clone();
            bus.subscribe(*kind, move |message| {
                if token.is_cancelled() {
                    return;
                }
                let Some(work) = on_message(message) else {
                    return;
                };
                let token = token.clone();
                tasks.spawn_on(
                    async move {
                        tokio::select! {
                            _ = token.cancelled() => {
                                tracing::debug!("Listener {} dropped pending work", name);
                            }
                            () = work => {}
                        }
                    },
                    &runtime,
                );
            })
        })
        .collect();

    tracing::debug!("Listener {} subscribed to {} kinds", name, kinds.len());

    ListenerHandle {
        name,
        subscriptions,
        cancel,
        tasks,
    }
}
