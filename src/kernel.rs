//! # Kernel
//!
//! Top-level kernel initialization and the public task API.
//!
//! The kernel owns the global scheduler instance, exposes task creation
//! and lifecycle calls, and coordinates startup. All public functions
//! enter a critical section; the arch layer reaches the same scheduler
//! through a raw pointer from handler context, where interrupts are
//! already serialized by priority.
//!
//! ## Startup sequence
//!
//! ```text
//! reset_handler (cortex-m-rt)
//!   └─► main()
//!         ├─► kernel::init()             ← scheduler + idle task
//!         ├─► kernel::create_edf_task()  ← admit periodic tasks (×N)
//!         ├─► kernel::create_task()      ← any plain banded tasks
//!         └─► kernel::start()            ← launch (no return)
//!               ├─► configure SysTick
//!               ├─► set PendSV/SysTick priorities
//!               └─► arch::start_first_task()
//! ```

use crate::scheduler::{Scheduler, TraceHooks};
use crate::sync;
use crate::task::TaskEntry;

#[cfg(feature = "edf")]
use crate::admission::{self, AdmissionError};
#[cfg(feature = "edf")]
use crate::task::EdfParams;

/// Task handle: the task's index in the scheduler's TCB array.
pub type TaskId = usize;

// ---------------------------------------------------------------------------
// Global scheduler instance
// ---------------------------------------------------------------------------

/// The one scheduler. Lives here for the whole uptime of the system.
///
/// # Safety
/// Accessed through `SCHEDULER_PTR`, which is set once in `init()`.
/// Thread-mode access goes through critical sections; handler-mode
/// access is serialized by exception priority.
static mut SCHEDULER: Scheduler = Scheduler::new();

/// Raw pointer to the global scheduler for the arch layer (PendSV and
/// SysTick handlers cannot comfortably take references).
///
/// # Safety
/// Written once during `init()`, before any interrupt can fire.
#[no_mangle]
pub static mut SCHEDULER_PTR: *mut Scheduler = core::ptr::null_mut();

/// The idle task: runs when nothing else is ready, at the bottom band.
extern "C" fn idle_task(_arg: *mut ()) -> ! {
    loop {
        #[cfg(all(target_arch = "arm", target_os = "none"))]
        cortex_m::asm::wfi();
        #[cfg(not(all(target_arch = "arm", target_os = "none")))]
        core::hint::spin_loop();
    }
}

// ---------------------------------------------------------------------------
// Kernel API
// ---------------------------------------------------------------------------

/// Initialize the kernel: reset the scheduler and install the idle
/// task at band 0.
///
/// Must be called exactly once, from the main thread, before any other
/// kernel function.
pub fn init() {
    unsafe {
        SCHEDULER = Scheduler::new();
        SCHEDULER_PTR = core::ptr::addr_of_mut!(SCHEDULER);
        let sched = &mut *SCHEDULER_PTR;
        // The TCB array is empty here; installing idle cannot fail.
        let _ = sched.install_idle_task(idle_task, core::ptr::null_mut());
    }
}

/// Install context-switch trace callbacks (GPIO toggling, trace
/// capture). Pass `TraceHooks::none()` to remove them.
pub fn set_trace_hooks(hooks: TraceHooks) {
    sync::critical_section(|_cs| unsafe {
        (*SCHEDULER_PTR).set_trace_hooks(hooks);
    });
}

/// Create a plain round-robin task in `priority` band.
///
/// Fails if the band is out of range, reserved for the deadline
/// scheduler, or the TCB array is full.
pub fn create_task(
    entry: TaskEntry,
    name: &'static str,
    arg: *mut (),
    priority: u8,
) -> Result<TaskId, ()> {
    let (result, resched) = sync::critical_section(|_cs| unsafe {
        let sched = &mut *SCHEDULER_PTR;
        let r = sched.create_task(entry, name, arg, priority);
        (r, sched.started && sched.needs_reschedule)
    });
    if resched {
        crate::arch::cortex_m4::trigger_pendsv();
    }
    result
}

/// Admit and create a deadline-scheduled periodic task.
///
/// The candidate is validated and the joint set's feasibility proven
/// before anything is allocated; any rejection leaves the kernel
/// bit-identical to its pre-call state. On success the first job is
/// released at the current tick and, if the scheduler is running and
/// the new deadline is the earliest, a context switch is requested.
#[cfg(feature = "edf")]
pub fn create_edf_task(
    entry: TaskEntry,
    name: &'static str,
    arg: *mut (),
    params: EdfParams,
) -> Result<TaskId, AdmissionError> {
    let (result, resched) = sync::critical_section(|_cs| unsafe {
        let sched = &mut *SCHEDULER_PTR;
        let r = sched.create_edf_task(entry, name, arg, params);
        (r, sched.started && sched.needs_reschedule)
    });
    if resched {
        crate::arch::cortex_m4::trigger_pendsv();
    }
    result
}

/// Run both admission tests for a candidate against the live registry,
/// without admitting anything: `(utilization_ok, demand_ok)`.
///
/// Repeated calls against an unchanged registry return identical
/// results.
#[cfg(feature = "edf")]
pub fn test_admission(wcet: u32, deadline: u32, period: u32) -> (bool, bool) {
    let params = EdfParams::new(wcet, deadline, period);
    sync::critical_section(|_cs| unsafe {
        admission::evaluate(&(*SCHEDULER_PTR).registry, &params)
    })
}

/// Delete a task: removes it from the ready/delayed state and drops its
/// registry record in the same critical section. The TCB slot is not
/// reused.
pub fn delete_task(id: TaskId) -> bool {
    let (deleted, resched) = sync::critical_section(|_cs| unsafe {
        let sched = &mut *SCHEDULER_PTR;
        let d = sched.delete_task(id);
        (d, sched.started && sched.needs_reschedule)
    });
    if resched {
        crate::arch::cortex_m4::trigger_pendsv();
    }
    deleted
}

/// Sleep until `*last_wake + period`, then advance `*last_wake` by
/// `period`. The caller keeps `last_wake` across iterations, so a slow
/// iteration shortens the next sleep instead of drifting the schedule.
///
/// If the wake tick has already passed the call returns immediately.
pub fn delay_until(last_wake: &mut u64, period: u64) {
    let wake = *last_wake + period;
    *last_wake = wake;

    let resched = sync::critical_section(|_cs| unsafe {
        let sched = &mut *SCHEDULER_PTR;
        sched.delay_current_until(wake);
        sched.needs_reschedule
    });
    if resched {
        crate::arch::cortex_m4::trigger_pendsv();
    }
}

/// Voluntarily offer the CPU to the rest of the current band.
pub fn yield_task() {
    sync::critical_section(|_cs| unsafe {
        (*SCHEDULER_PTR).yield_current();
    });
    crate::arch::cortex_m4::trigger_pendsv();
}

/// Current kernel tick.
pub fn tick_count() -> u64 {
    sync::critical_section(|_cs| unsafe { (*SCHEDULER_PTR).tick_count })
}

/// Lifetime deadline-miss count of a task.
pub fn miss_count(id: TaskId) -> u32 {
    sync::critical_section(|_cs| unsafe {
        let sched = &*SCHEDULER_PTR;
        if id < sched.task_count {
            sched.tasks[id].miss_count
        } else {
            0
        }
    })
}

/// Start the scheduler. **Does not return.**
///
/// Configures SysTick, drops PendSV and SysTick to the lowest exception
/// priority, selects the earliest-deadline (or highest-band) task, and
/// launches it.
///
/// # Safety contract
/// `init()` must have run; call from the main thread only.
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub fn start(mut core_peripherals: cortex_m::Peripherals) -> ! {
    use crate::arch::cortex_m4;

    cortex_m4::configure_systick(&mut core_peripherals.SYST);
    cortex_m4::set_exception_priorities();

    let first_sp = sync::critical_section(|_cs| unsafe {
        let sched = &mut *SCHEDULER_PTR;
        sched.started = true;
        let first = sched.schedule();
        sched.tasks[first].stack_pointer as *const u32
    });

    unsafe { cortex_m4::start_first_task(first_sp) }
}
