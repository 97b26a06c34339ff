// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Rate limiter implementations
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

fn duration_since_epoch() -> Duration {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap()
}

/// Token bucket rate limiter
///
/// This rate limiter is based on the token bucket algorithm. It allows for a burst of requests
/// up to the capacity of the bucket, with a refill rate of `capacity` per `interval` nanoseconds.
///
/// The rate limiter keeps track of the number of tokens consumed and the number of tokens allowed
/// in the current window. It also keeps track of the previous window rate to calculate the
/// effective rate.
///
/// The effective rate is calculated as the average of the current window rate and the previous
/// window rate.
///
/// <div class="warning">This implementation is not thread safe, consider wrapping in a <code>Mutex</code></div>
///
/// # Example
///
/// ```rust
/// use ddcommon::rate_limiter::TokenBucketRateLimiter;
/// use std::time::Duration;
///
/// // Create a rate limiter with a capacity of 100 tokens per second
/// let mut limiter = TokenBucketRateLimiter::new(100.0, 1e9);
///
/// fn some_protected_function(limiter: &mut TokenBucketRateLimiter) {
///     if limiter.is_allowed(None) {
///         println!("Request allowed");
///     } else {
///         println!("Request denied");
///     }
/// }
/// ```
#[derive(Debug)]
pub struct TokenBucketRateLimiter {
    capacity: f64,
    interval: f64,
    tokens: f64,
    last_update: Duration,
    current_window: u64,
    tokens_total: u64,
    tokens_allowed: u64,
    previous_window_rate: Option<f64>,
}

impl TokenBucketRateLimiter {
    /// Create a new token bucket rate limiter
    ///
    /// # Arguments
    ///
    /// * `capacity` - The capacity of the token bucket per `interval`
    /// * `interval` - The refill interval in nanoseconds
    ///
    /// # Notes
    /// * If `capacity` is negative, all requests are allowed
    /// * If `capacity` is zero, no requests are allowed
    ///
    /// # Example
    ///
    /// ```rust
    /// use ddcommon::rate_limiter::TokenBucketRateLimiter;
    ///
    /// // Create a rate limiter with a capacity of 100 tokens per second
    /// let limiter = TokenBucketRateLimiter::new(100.0, 1e9);
    /// ```
    pub fn new(capacity: f64, interval: f64) -> Self {
        TokenBucketRateLimiter {
            capacity,
            interval,
            tokens: capacity,
            last_update: Duration::from_nanos(0),
            current_window: 0,
            tokens_total: 0,
            tokens_allowed: 0,
            previous_window_rate: None,
        }
    }

    /// Check if a request is allowed
    ///
    /// This method checks if a request is allowed based on the current state of the token bucket.
    ///
    /// # Arguments
    ///
    /// * `ts` - The timestamp of the request as a `Duration` since Unix Epoch. If `None`, the current time is used.
    ///
    /// # Returns
    ///
    /// * `true` if the request is allowed, `false` otherwise
    ///
    /// # Notes
    ///
    /// * If the ts time window is in the past, no requests are allowed
    ///   * These requests are not processed and do not affect the token counts
    ///
    /// # Example
    ///
    /// ```rust
    /// use ddcommon::rate_limiter::TokenBucketRateLimiter;
    ///
    /// let mut limiter = TokenBucketRateLimiter::new(100.0, 1e9);
    ///
    /// if limiter.is_allowed(None) {
    ///     println!("Request allowed");
    /// } else {
    ///     println!("Request denied");
    /// }
    /// ```
    ///
    /// ```rust
    /// use ddcommon::rate_limiter::TokenBucketRateLimiter;
    /// use std::time::Duration;
    ///
    /// let mut limiter = TokenBucketRateLimiter::new(100.0, 1e9);
    ///
    /// // Use a specific timestamp for the request
    /// let now = Duration::from_secs(1_722_079_058_866_801_000);
    ///
    /// if limiter.is_allowed(Some(now)) {
    ///     println!("Request allowed");
    /// } else {
    ///     println!("Request denied");
    /// }
    /// ```
    pub fn is_allowed(&mut self, ts: Option<Duration>) -> bool {
        if self.capacity < 0.0 {
            return true;
        } else if self.capacity == 0.0 {
            return false;
        }

        let now = ts.unwrap_or(duration_since_epoch());
        let now_ns = now.as_secs_f64() * 1e9;
        let window = (now_ns / self.interval).trunc() as u64;

        // Current window is in the past, always return false
        // DEV: This check MUST happen before the `allowed` check
        if window < self.current_window {
            return false;
        }

        if self.last_update == Duration::from_nanos(0) {
            self.last_update = now;
        }

        let allowed = (|| -> bool {
            let mut elapsed = Duration::from_nanos(0);
            if self.last_update < now {
                elapsed = now - self.last_update;
            }
            let elapsed_ns = elapsed.as_secs_f64() * 1e9;

            // Refill tokens if needed
            if self.tokens < self.capacity {
                let tokens_to_add = (elapsed_ns / self.interval) * self.capacity;
                if tokens_to_add > 0.0 {
                    self.tokens += tokens_to_add;
                    self.tokens = self.tokens.min(self.capacity);
                    self.last_update = now;
                }
            }

            if self.tokens >= 1.0 {
                self.tokens -= 1.0;
                return true;
            }
            false
        })();

        if window > self.current_window {
            if self.current_window != 0 {
                self.previous_window_rate = Some(self.current_window_rate());
            }
            self.current_window = window;
            self.tokens_total = 0;
            self.tokens_allowed = 0;
        }

        // Update the token counts
        self.tokens_total += 1;
        if allowed {
            self.tokens_allowed += 1;
        }

        allowed
    }

    /// Calculate the effective rate
    ///
    /// The effective rate is calculated as the average of the current window rate and the previous
    /// window rate.
    ///
    /// # Returns
    ///
    /// * The effective rate as a `f64`
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use std::time::SystemTime;
    /// use std::time::UNIX_EPOCH;
    /// use ddcommon::rate_limiter::TokenBucketRateLimiter;
    ///
    /// let mut limiter = TokenBucketRateLimiter::new(100.0, 1e9);
    ///
    /// // Consume 200% of tokens in a single window
    /// let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap();
    /// for _ in 0..200 {
    ///     limiter.is_allowed(Some(now));
    /// }
    /// let rate = limiter.effective_rate();
    /// assert_eq!(rate, 0.50);
    ///
    /// println!("Effective rate: {}", rate);
    /// ```
    pub fn effective_rate(&self) -> f64 {
        if self.capacity == 0.0 {
            return 0.0;
        } else if self.capacity < 0.0 {
            return 1.0;
        }

        let current_rate: f64 = self.current_window_rate();

        match self.previous_window_rate {
            None => current_rate,
            Some(prev_rate) => (current_rate + prev_rate) / 2.0,
        }
    }

    /// Calculate the current windows rate
    ///
    /// The current window rate is calculated as the number of tokens allowed divided by the total
    /// number of tokens seen.
    ///
    /// # Returns
    ///
    /// * The current window rate as a `f64`
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use std::time::SystemTime;
    /// use std::time::UNIX_EPOCH;
    /// use ddcommon::rate_limiter::TokenBucketRateLimiter;
    ///
    /// let mut limiter = TokenBucketRateLimiter::new(100.0, 1e9);
    ///
    /// // Consume 200% of tokens in a single window
    /// let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap();
    /// for _ in 0..200 {
    ///     limiter.is_allowed(Some(now));
    /// }
    /// let rate = limiter.current_window_rate();
    /// assert_eq!(rate, 0.50);
    ///
    /// println!("Current window rate: {}", rate);
    /// ```
    pub fn current_window_rate(&self) -> f64 {
        // If no tokens have been seen then return 1.0
        // DEV: This is to avoid a division by zero error
        if self.tokens_total == 0 {
            return 1.0;
        }

        self.tokens_allowed as f64 / self.tokens_total as f64
    }
}
