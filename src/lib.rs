//! # edfos — an earliest-deadline-first kernel for Cortex-M4
//!
//! A small preemptive kernel whose scheduling core dispatches periodic
//! tasks by absolute deadline. Task creation is gated by admission
//! control — a candidate joins the system only if the joint task set is
//! provably schedulable — so a correctly declared task set never misses
//! a deadline, and a miss that does happen (a task lying about its
//! WCET) is detected and counted rather than silently absorbed.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    Application tasks                      │
//! ├──────────────────────────────────────────────────────────┤
//! │                 Kernel API (kernel.rs)                    │
//! │  init · create_edf_task · create_task · delay_until       │
//! │  test_admission · delete_task · yield · start             │
//! ├───────────────┬─────────────────────┬────────────────────┤
//! │  Scheduler    │  Admission Control  │  Sync Primitives   │
//! │  scheduler.rs │  admission.rs       │  sync.rs           │
//! │  ─ tick()     │  ─ utilization bound│  ─ critical_section│
//! │  ─ schedule() │  ─ demand analysis  │                    │
//! │  ─ preemption │  registry.rs        │                    │
//! ├───────────────┴─────────────────────┴────────────────────┤
//! │        Task model (task.rs) · Ready queue (ready.rs)      │
//! ├──────────────────────────────────────────────────────────┤
//! │             Arch port (arch/cortex_m4.rs)                 │
//! │     PendSV · SysTick · stack frames · first launch        │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Scheduling model
//!
//! - One deadline band (priority 1). Every admitted periodic task lives
//!   there; dispatch within the band is earliest-absolute-deadline
//!   first, ties broken by release order.
//! - Plain bands everywhere else, round-robin with time slices. Band 0
//!   is the idle task. Deadline tasks and plain tasks are never
//!   compared by deadline: across bands, the higher band simply wins.
//! - Admission runs the exact test for the set at hand: the Liu &
//!   Layland utilization bound when every deadline equals its period,
//!   processor demand analysis otherwise. All integer arithmetic; the
//!   target has no FPU.
//!
//! ## Memory model
//!
//! - No heap, no `alloc`: a fixed TCB array with inline per-task
//!   stacks, a fixed-capacity ready queue and registry (`heapless`).
//! - One critical-section domain (`cortex_m::interrupt::free`) guards
//!   every mutation; tick-handler access is serialized by exception
//!   priority on the single core.
//!
//! ## The `edf` feature
//!
//! The deadline core is compiled in by default. Building with
//! `--no-default-features` strips the registry, admission control, the
//! ready queue, and every deadline comparison: what remains is a stock
//! preemptive round-robin kernel with identical observable behavior
//! for plain tasks.

#![cfg_attr(not(test), no_std)]

pub mod arch;
pub mod config;
pub mod kernel;
pub mod scheduler;
pub mod sync;
pub mod task;

#[cfg(feature = "edf")]
pub mod admission;
#[cfg(feature = "edf")]
pub mod ready;
#[cfg(feature = "edf")]
pub mod registry;
