//! # Abort reporter
//!
//! The end of the line: blink the fatal error code on the board's LEDs
//! until power-off. The signature distinguishes the two error classes
//! without a debugger attached:
//!
//! ```text
//! build error:  ████████████ (2.5 s steady) ░░ ▌▌▌        repeat
//! run error:    ████ ░ ████  (long-short-long) ░░ ▌▌▌     repeat
//! ```
//!
//! where `▌` is one short flash and the flash count names the code
//! within its class. All timing is in 25 ms units.

use crate::arch;
use crate::error::ErrorCode;
use crate::os::Board;

/// Blink `err` forever. Interrupts must already be disabled; nothing
/// here ever yields.
pub fn blink_forever(err: ErrorCode, board: Board) -> ! {
    let flashes = err.blink_count();

    loop {
        (board.leds_on)();
        if err.is_build_error() {
            delay_units(100);
        } else {
            delay_units(40);
            (board.leds_off)();
            delay_units(20);
            (board.leds_on)();
            delay_units(40);
        }

        (board.leds_off)();
        delay_units(60);

        for _ in 0..flashes {
            (board.leds_on)();
            delay_units(10);
            (board.leds_off)();
            delay_units(10);
        }

        delay_units(20);
    }
}

fn delay_units(units: u8) {
    for _ in 0..units {
        arch::delay_25ms();
    }
}
