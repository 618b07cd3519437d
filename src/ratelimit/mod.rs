//! Download rate limiting.
//!
//! A fixed-window counter keyed by `{client}:{author}/{slug}` that keeps one
//! client from inflating a theme's download count.

mod clock;
mod entry;
mod key;
mod limiter;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{RateLimitEntry, RateLimitStatus};
pub use key::{client_identity, ClientHeaders, RateLimitKey, UNKNOWN_CLIENT};
pub use limiter::{RateLimiter, RateLimiterSettings};
