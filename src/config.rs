//! # Kernel Configuration
//!
//! Compile-time constants governing scheduler and system behavior.
//! All limits are fixed at compile time — no dynamic allocation.

/// Maximum number of tasks the kernel can hold, the idle task included.
/// Bounds the static TCB array. Increase with care — each task carries
/// `STACK_SIZE` bytes of RAM inline in its TCB.
pub const MAX_TASKS: usize = 8;

/// Number of priority bands. Band 0 is the idle band; band 1 is the
/// deadline-scheduled band; higher bands are free for ordinary
/// fixed-priority tasks.
pub const NUM_PRIORITIES: usize = 8;

/// Priority band reserved for the idle task.
pub const IDLE_PRIORITY: u8 = 0;

/// The single priority band all deadline-scheduled tasks share. Within
/// this band ordering comes from absolute deadlines, not from the band
/// value itself.
pub const EDF_PRIORITY: u8 = 1;

/// SysTick frequency in Hz. Determines tick granularity: at 1000 Hz one
/// tick is one millisecond, and all task parameters (WCET, deadline,
/// period) are expressed in these units.
pub const TICK_HZ: u32 = 1000;

/// Time slice in ticks for round-robin tasks. Deadline-scheduled tasks
/// are not time-sliced; they run until preempted by an earlier deadline
/// or until they sleep for their next period.
pub const DEFAULT_TIME_SLICE: u32 = 10;

/// Per-task stack size in bytes. Must cover the deepest call chain plus
/// the hardware exception frame (32 bytes) and the software-saved
/// context (32 bytes for R4–R11).
pub const STACK_SIZE: usize = 1024;

/// System clock frequency in Hz (STM32F4 on the 16 MHz HSI).
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;

/// Capacity of the admitted-parameter registry. Admission rejects with
/// an out-of-capacity error once this many task parameter records exist.
#[cfg(feature = "edf")]
pub const REGISTRY_CAPACITY: usize = 128;

/// Fixed-point scale for the utilization bound test. `10_000` gives
/// 0.01% resolution; per-term contributions are rounded down, so the
/// test can over-accept by at most one LSB per task.
#[cfg(feature = "edf")]
pub const UTILIZATION_SCALE: u64 = 10_000;

/// Processor-demand analysis tests deadlines up to
/// `min(DEMAND_HORIZON_PERIODS * max_period, DEMAND_HORIZON_CAP_SECS * TICK_HZ)`.
/// The cap bounds the work when one task has an unusually long period;
/// it can falsely reject sets whose feasibility proof needs a longer
/// window.
#[cfg(feature = "edf")]
pub const DEMAND_HORIZON_PERIODS: u64 = 4;

/// Wall-clock cap, in seconds, on the demand-analysis horizon.
#[cfg(feature = "edf")]
pub const DEMAND_HORIZON_CAP_SECS: u64 = 60;
