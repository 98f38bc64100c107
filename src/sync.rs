//! # Synchronization
//!
//! Interrupt masking for the kernel and its system-call stubs. The mask
//! is `BASEPRI`, not `PRIMASK`: the tick interrupt sits below the mask
//! boundary and is shut out, while the system-call exception runs at
//! priority zero and stays deliverable — executing `svc` with `PRIMASK`
//! set would escalate to a hard fault instead of entering the kernel.
//!
//! On the host there is nothing to mask and the closure just runs; the
//! kernel logic under test is single-threaded.

/// Priority boundary while the kernel or a stub runs. Everything at
/// this priority value or below (numerically higher) is masked; the
/// system-call exception at priority zero is not.
pub const KERNEL_MASK: u8 = 0x80;

/// Run `f` with the tick masked, restoring the previous mask level on
/// the way out. Keep the enclosed work short: the tick is late by
/// however long this takes.
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[inline]
pub fn with_kernel_masked<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    use cortex_m::register::basepri;

    let saved = basepri::read();
    unsafe { basepri::write(KERNEL_MASK) };
    let result = f();
    unsafe { basepri::write(saved) };
    result
}

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
#[inline]
pub fn with_kernel_masked<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    f()
}

/// Raise the mask for good. Called once at boot, before the kernel's
/// main loop first hands the processor to a task.
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[inline]
pub fn raise_kernel_mask() {
    unsafe { cortex_m::register::basepri::write(KERNEL_MASK) };
}

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
#[inline]
pub fn raise_kernel_mask() {}
