// Copyright (C) 2022-2024 Webb Technologies Inc.
//
// Tangle is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// Tangle is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should receive a copy of the GNU General Public License
// If not, see <http://www.gnu.org/licenses/>.

//! Retry logic for async calls

use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;

/// Constant with Max Retry Count is a backoff policy which always returns
/// a constant duration, until it exceeds the maximum retry count.
#[derive(Debug, Clone)]
pub struct ConstantWithMaxRetryCount {
    interval: Duration,
    max_retry_count: usize,
    count: usize,
}

impl ConstantWithMaxRetryCount {
    /// Creates a new Constant backoff with `interval` and `max_retry_count`.
    /// `interval` is the duration to wait between retries, and `max_retry_count` is the maximum
    /// number of retries, after which we return `None` to indicate that we should stop retrying.
    pub fn new(interval: Duration, max_retry_count: usize) -> Self {
        Self {
            interval,
            max_retry_count,
            count: 0,
        }
    }

    /// How many more times [`Backoff::next_backoff`] will return `Some`.
    pub fn retries_left(&self) -> usize {
        self.max_retry_count.saturating_sub(self.count)
    }

    /// The maximum number of retries of this policy.
    pub fn max_retry_count(&self) -> usize {
        self.max_retry_count
    }
}

impl Backoff for ConstantWithMaxRetryCount {
    fn next_backoff(&mut self) -> Option<Duration> {
        (self.count < self.max_retry_count).then(|| {
            self.count += 1;
            self.interval
        })
    }

    fn reset(&mut self) {
        self.count = 0;
    }
}

/// A bounded retry policy: how many attempts an operation gets in total and
/// how long to wait between two of them.
///
/// Both the block poller and the redemption writer are driven by this type,
/// so the attempt limits are configured in a single place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: usize,
    /// Delay between two attempts.
    pub interval: Duration,
}

impl RetryPolicy {
    /// Creates a new policy.
    pub const fn new(max_attempts: usize, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Returns a copy of this policy whose interval is multiplied by
    /// `numerator / denominator`.
    ///
    /// A zero denominator leaves the interval untouched.
    #[must_use]
    pub fn scaled(self, numerator: u32, denominator: u32) -> Self {
        if denominator == 0 {
            return self;
        }
        Self {
            interval: self.interval * numerator / denominator,
            ..self
        }
    }

    /// The backoff driving this policy. It yields `max_attempts - 1` delays,
    /// one before each retry.
    pub fn backoff(&self) -> ConstantWithMaxRetryCount {
        ConstantWithMaxRetryCount::new(
            self.interval,
            self.max_attempts.saturating_sub(1),
        )
    }

    /// Below this number of remaining retries a loop should start warning.
    pub fn warn_threshold(&self) -> usize {
        self.max_attempts / 2
    }
}

/// Runs `op` until it succeeds, fails with a non transient error, or
/// `backoff` stops.
///
/// Errors are classified with [`crate::Error::is_transient`].
pub async fn retry_transient<T, B, F, Fut>(
    backoff: B,
    mut op: F,
) -> crate::Result<T>
where
    B: Backoff,
    F: FnMut() -> Fut,
    Fut: Future<Output = crate::Result<T>>,
{
    let task = || {
        let fut = op();
        async move {
            fut.await.map_err(|e| {
                if e.is_transient() {
                    tracing::event!(
                        target: crate::probe::TARGET,
                        tracing::Level::DEBUG,
                        kind = %crate::probe::Kind::Retry,
                        error = %e,
                    );
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        }
    };
    backoff::future::retry(backoff, task).await
}
