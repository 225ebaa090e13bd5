use crate::backoff::{ReconnectionBackoffPolicy, ReconnectionState};
use futures::Stream;
use futures_util::StreamExt;
use std::{fmt::Debug, future, future::Future};
use tracing::{info, warn};

/// The connection lifecycle state machine shared by both Transaction Source
/// implementations (§4.1). Owned by a single ingestion task; transitions are
/// driven by that task alone, never by listener callbacks (§9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Running,
    Reconnecting,
}

/// Wrapper around a `Stream` of connection-attempt results that applies the
/// fixed reconnect-backoff policy and logs each transition.
///
/// Adapted from the reconnecting-stream combinator pattern: each `Err` pauses
/// for the current backoff duration (scaling up to the policy max) before
/// re-polling, and each `Ok` resets the backoff and proceeds.
pub trait ReconnectingStream
where
    Self: Stream + Sized,
{
    fn with_reconnect_backoff<St, InitError>(
        self,
        policy: ReconnectionBackoffPolicy,
        label: &'static str,
    ) -> impl Stream<Item = St>
    where
        Self: Stream<Item = Result<St, InitError>>,
        InitError: Debug,
    {
        self.enumerate().scan(
            ReconnectionState::from(policy),
            move |state, (attempt, result)| match result {
                Ok(stream) => {
                    info!(attempt, label, "transaction source connected");
                    state.reset();
                    futures::future::Either::Left(future::ready(Some(Ok(stream))))
                }
                Err(error) => {
                    warn!(attempt, label, ?error, "transaction source reconnect failed");
                    let delay = state.next_delay();
                    futures::future::Either::Right(Box::pin(async move {
                        info!(label, ?delay, "waiting before reconnect attempt");
                        tokio::time::sleep(delay).await;
                        Some(Err(error))
                    }))
                }
            },
        )
        .filter_map(|result| future::ready(result.ok()))
    }
}

impl<T> ReconnectingStream for T where T: Stream {}

/// Initialise a stream-of-connection-attempts from a fallible async
/// constructor: the first attempt's error (if any) is surfaced to the
/// caller once (per §4.1 "connection-establishment errors are surfaced once
/// via the return value of the initial connect call"); every subsequent
/// attempt is folded into the returned stream for `with_reconnect_backoff`
/// to consume.
pub async fn init_reconnecting_stream<FnInit, St, FnInitError, FnInitFut>(
    connect: FnInit,
) -> Result<impl Stream<Item = Result<St, FnInitError>>, FnInitError>
where
    FnInit: Fn() -> FnInitFut,
    FnInitFut: Future<Output = Result<St, FnInitError>>,
{
    let initial = connect().await?;
    let reconnections = futures::stream::repeat_with(connect).then(std::convert::identity);
    Ok(futures::stream::once(future::ready(Ok(initial))).chain(reconnections))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use tokio_stream::StreamExt as TokioStreamExt;

    #[tokio::test]
    async fn reconnects_after_failure_and_resets_backoff() {
        tokio::time::pause();

        let attempts = Arc::new(AtomicUsize::new(0));
        let connect = {
            let attempts = attempts.clone();
            move || {
                let attempts = attempts.clone();
                async move {
                    let count = attempts.fetch_add(1, Ordering::SeqCst);
                    if count == 0 {
                        Ok(tokio_stream::iter(vec![1, 2]))
                    } else if count == 1 {
                        Err("boom")
                    } else {
                        Ok(tokio_stream::iter(vec![3]))
                    }
                }
            }
        };

        let policy = ReconnectionBackoffPolicy {
            backoff_ms_initial: 0,
            backoff_multiplier: 1,
            backoff_ms_max: 0,
        };

        let stream = init_reconnecting_stream(connect)
            .await
            .unwrap()
            .with_reconnect_backoff(policy, "test")
            .flatten();

        let collected: Vec<_> = stream.take(3).collect().await;
        assert_eq!(collected, vec![1, 2, 3]);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
