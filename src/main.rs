//! # trios demo firmware
//!
//! Exercises every scheduling class and the service rendezvous:
//!
//! | Task | Class | Role |
//! |------|-------|------|
//! | `app_main` | System | Boots the others, then terminates |
//! | `sampler` | Periodic | Publishes the clock every 20 ticks |
//! | `logger` | System | Subscribes and re-publishes a heartbeat |
//! | `worker` ×2 | Round-robin | Count in the background |
//!
//! The sampler publishing to the system-class logger demonstrates the
//! rendezvous preemption path: the publish wakes the logger, the
//! sampler is interrupted, and the logger runs before the sampler's
//! release continues. The two workers share the remaining time in
//! round-robin slices.

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
mod firmware {
    use cortex_m_rt::entry;
    use panic_halt as _;

    use trios::os::{self, Board};
    use trios::service::ServiceHandle;

    /// GPIOB output registers (STM32F4): MODER to make the LED pins
    /// outputs, ODR to drive them. The abort reporter owns these once
    /// anything goes wrong.
    const GPIOB_MODER: *mut u32 = 0x4002_0400 as *mut u32;
    const GPIOB_ODR: *mut u32 = 0x4002_0414 as *mut u32;
    const RCC_AHB1ENR: *mut u32 = 0x4002_3830 as *mut u32;

    const LED_MASK: u32 = 0b1111; // PB0..PB3

    fn leds_on() {
        unsafe {
            let v = core::ptr::read_volatile(GPIOB_ODR);
            core::ptr::write_volatile(GPIOB_ODR, v | LED_MASK);
        }
    }

    fn leds_off() {
        unsafe {
            let v = core::ptr::read_volatile(GPIOB_ODR);
            core::ptr::write_volatile(GPIOB_ODR, v & !LED_MASK);
        }
    }

    fn led_init() {
        unsafe {
            // clock GPIOB, then PB0..PB3 as push-pull outputs
            let v = core::ptr::read_volatile(RCC_AHB1ENR);
            core::ptr::write_volatile(RCC_AHB1ENR, v | (1 << 1));
            let v = core::ptr::read_volatile(GPIOB_MODER) & !0xFF;
            core::ptr::write_volatile(GPIOB_MODER, v | 0b01010101);
        }
    }

    /// The service the sampler and logger meet on. Written once by
    /// `app_main` before either party runs.
    static mut CLOCK_FEED: Option<ServiceHandle> = None;

    fn clock_feed() -> ServiceHandle {
        // Safety: written once during app_main, read only afterwards.
        unsafe { core::ptr::addr_of!(CLOCK_FEED).read() }.unwrap_or_else(|| os::abort())
    }

    /// Periodic sampler: every release grabs the millisecond clock and
    /// publishes it, finishing well inside its two-tick budget.
    extern "C" fn sampler() {
        let feed = clock_feed();
        loop {
            let stamp = os::now() as i16;
            // wakes the logger; being interrupted for it is expected
            os::service_publish(feed, stamp);
            os::task_next();
        }
    }

    /// System-class consumer: naps on the feed, toggles the LEDs as a
    /// heartbeat whenever a sample arrives.
    extern "C" fn logger() {
        let feed = clock_feed();
        let mut lit = false;
        loop {
            let mut sample: i16 = 0;
            os::service_subscribe(feed, &mut sample);
            lit = !lit;
            if lit {
                leds_on();
            } else {
                leds_off();
            }
        }
    }

    /// Background round-robin worker; the argument tells the two
    /// instances apart.
    extern "C" fn worker() {
        let _id = os::task_get_arg();
        let mut count: u32 = 0;
        loop {
            count = count.wrapping_add(1);
            if count % 50_000 == 0 {
                os::task_next();
            }
        }
    }

    /// First system task: wire up the application, then get out of the
    /// way.
    extern "C" fn app_main() {
        let feed = os::service_init();
        unsafe { core::ptr::addr_of_mut!(CLOCK_FEED).write(Some(feed)) };

        os::task_create_system(logger, 0);
        os::task_create_periodic(sampler, 0, 20, 2, 1);
        os::task_create_rr(worker, 1);
        os::task_create_rr(worker, 2);

        os::task_terminate();
    }

    #[entry]
    fn main() -> ! {
        led_init();
        os::start(
            Board {
                leds_on,
                leds_off,
            },
            app_main,
        )
    }
}

#[cfg(not(target_os = "none"))]
fn main() {}
