use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleDecision {
    pub allowed: bool,
    pub retry_after: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleWindow {
    pub count: i32,
    pub reset_at: DateTime<Utc>,
}

/// Advances a fixed-window counter by one hit and decides the outcome.
///
/// The counter keeps incrementing past the limit; denials report how long
/// until the window resets. A fixed window admits up to twice the limit
/// across a window boundary, which is the documented trade-off of this
/// limiter.
pub fn advance_window(
    window: ThrottleWindow,
    now: DateTime<Utc>,
    max_attempts: i32,
    window_seconds: i64,
) -> (ThrottleWindow, ThrottleDecision) {
    if now >= window.reset_at {
        let next = ThrottleWindow {
            count: 1,
            reset_at: now + Duration::seconds(window_seconds),
        };
        return (
            next,
            ThrottleDecision {
                allowed: true,
                retry_after: 0,
            },
        );
    }

    let count = window.count + 1;
    let next = ThrottleWindow {
        count,
        reset_at: window.reset_at,
    };

    if count > max_attempts {
        let retry_after = (window.reset_at - now).num_seconds().max(1);
        return (
            next,
            ThrottleDecision {
                allowed: false,
                retry_after,
            },
        );
    }

    (
        next,
        ThrottleDecision {
            allowed: true,
            retry_after: 0,
        },
    )
}
