//! # Fatal error codes
//!
//! Every error the kernel can detect is unrecoverable: the system stops
//! and blinks the code on the board's LEDs forever. Codes fall into two
//! classes with distinct blink signatures, so a code can be read off the
//! hardware without a debugger:
//!
//! - **Build errors** — mistakes in how the application assembled the
//!   system (an impossible periodic budget, too many services). Reported
//!   with a long steady lead-in.
//! - **Run errors** — violations detected while scheduling. Reported
//!   with a long-short-long preamble.
//!
//! Within its class, a code blinks `position + 1` times.

/// Everything that can go fatally wrong.
///
/// The discriminants are stable: they define the blink counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
    /// A periodic task was created with a worst-case execution time
    /// longer than its period.
    WcetGreaterThanPeriod = 0,
    /// `service_init` was called with every service slot already handed
    /// out.
    MaxServicesReached = 1,

    /// The application called `abort` itself.
    UserAbort = 2,
    /// Task creation found the dead pool empty.
    TooManyTasks = 3,
    /// A periodic task was still running when its slot budget ran out.
    PeriodicOverran = 4,
    /// The kernel reached a state it believes unreachable.
    RtosInternal = 5,
    /// Two periodic tasks became due on the same tick.
    PeriodicCollision = 6,
    /// A periodic task tried to subscribe to a service.
    PeriodicSubscribed = 7,
    /// A publish found a periodic task on a waiter queue.
    PeriodicFoundSubscribed = 8,
}

/// Discriminant of the first run-class code.
const FIRST_RUN_ERROR: u8 = ErrorCode::UserAbort as u8;

impl ErrorCode {
    /// True for errors in the application-assembly class.
    pub fn is_build_error(self) -> bool {
        (self as u8) < FIRST_RUN_ERROR
    }

    /// Number of flashes identifying this code within its class.
    pub fn blink_count(self) -> u8 {
        if self.is_build_error() {
            self as u8 + 1
        } else {
            self as u8 - FIRST_RUN_ERROR + 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_errors_count_from_one() {
        assert!(ErrorCode::WcetGreaterThanPeriod.is_build_error());
        assert!(ErrorCode::MaxServicesReached.is_build_error());
        assert_eq!(ErrorCode::WcetGreaterThanPeriod.blink_count(), 1);
        assert_eq!(ErrorCode::MaxServicesReached.blink_count(), 2);
    }

    #[test]
    fn run_errors_count_from_one() {
        assert!(!ErrorCode::UserAbort.is_build_error());
        assert_eq!(ErrorCode::UserAbort.blink_count(), 1);
        assert_eq!(ErrorCode::TooManyTasks.blink_count(), 2);
        assert_eq!(ErrorCode::PeriodicOverran.blink_count(), 3);
        assert_eq!(ErrorCode::RtosInternal.blink_count(), 4);
        assert_eq!(ErrorCode::PeriodicCollision.blink_count(), 5);
        assert_eq!(ErrorCode::PeriodicSubscribed.blink_count(), 6);
        assert_eq!(ErrorCode::PeriodicFoundSubscribed.blink_count(), 7);
    }
}
