//! # EDF Demo Firmware
//!
//! Three periodic tasks with known timing, dispatched by deadline.
//! Each task busy-loops for its declared WCET and then sleeps until its
//! next period, so the schedule is fully determined by the parameters:
//!
//! | Task   | C   | D    | T    | U     |
//! |--------|-----|------|------|-------|
//! | red    | 80  | 200  | 400  | 0.200 |
//! | yellow | 150 | 400  | 800  | 0.187 |
//! | green  | 400 | 1000 | 1600 | 0.250 |
//!
//! Total utilization ≈ 0.64 — comfortably schedulable, but green's
//! 400-tick jobs span several red periods, so red preempts green
//! mid-job on every release. No task should ever miss a deadline.
//!
//! A fourth creation with C=150, D=T=200 (a 75% hog on top of the 64%)
//! is attempted deliberately and must be rejected by admission control
//! while the first three keep running untouched.
//!
//! The switch hooks mirror the running task into a word a debugger or
//! trace capture can watch, standing in for the GPIO toggling a logic
//! analyzer would record.

#![cfg_attr(all(target_arch = "arm", target_os = "none"), no_std)]
#![cfg_attr(all(target_arch = "arm", target_os = "none"), no_main)]

#[cfg(all(target_arch = "arm", target_os = "none"))]
mod firmware {
    use core::sync::atomic::{AtomicUsize, Ordering};

    use cortex_m_rt::entry;
    use cortex_m_semihosting::hprintln;
    use panic_halt as _;

    use edfos::kernel;
    use edfos::scheduler::TraceHooks;
    use edfos::task::EdfParams;

    // -----------------------------------------------------------------------
    // Task parameters (ticks; 1 tick = 1 ms)
    // -----------------------------------------------------------------------

    static RED: EdfParams = EdfParams::new(80, 200, 400);
    static YELLOW: EdfParams = EdfParams::new(150, 400, 800);
    static GREEN: EdfParams = EdfParams::new(400, 1000, 1600);

    // -----------------------------------------------------------------------
    // Trace hooks
    // -----------------------------------------------------------------------

    /// Task currently on the CPU, `usize::MAX` between switches.
    /// Watchable from a debugger in lieu of a logic analyzer.
    static ACTIVE_TASK: AtomicUsize = AtomicUsize::new(usize::MAX);

    fn trace_switch_in(task: usize) {
        ACTIVE_TASK.store(task, Ordering::Relaxed);
    }

    fn trace_switch_out(_task: usize) {
        ACTIVE_TASK.store(usize::MAX, Ordering::Relaxed);
    }

    // -----------------------------------------------------------------------
    // Task body
    // -----------------------------------------------------------------------

    /// Spin for `ticks` of wall-clock time, standing in for real work.
    fn busy_run(ticks: u64) {
        let start = kernel::tick_count();
        while kernel::tick_count().wrapping_sub(start) < ticks {
            cortex_m::asm::nop();
        }
    }

    /// Shared body for all demo tasks: burn the declared WCET, then
    /// sleep until the next period boundary.
    extern "C" fn periodic_task(arg: *mut ()) -> ! {
        let params = unsafe { &*(arg as *const EdfParams) };
        let mut last_wake = kernel::tick_count();

        loop {
            busy_run(params.wcet as u64);
            kernel::delay_until(&mut last_wake, params.period as u64);
        }
    }

    // -----------------------------------------------------------------------
    // Entry
    // -----------------------------------------------------------------------

    /// Utilization in thousandths, for float-free reporting.
    fn util_x1000(p: &EdfParams) -> u64 {
        p.wcet as u64 * 1000 / p.period as u64
    }

    fn report(name: &str, p: &EdfParams) {
        let _ = hprintln!(
            "  {}: C={} D={} T={} U=0.{:03}",
            name,
            p.wcet,
            p.deadline,
            p.period,
            util_x1000(p)
        );
    }

    fn ok_or_fail<T, E>(r: &Result<T, E>) -> &'static str {
        if r.is_ok() {
            "OK"
        } else {
            "FAIL"
        }
    }

    #[entry]
    fn main() -> ! {
        let cp = cortex_m::Peripherals::take().unwrap();

        kernel::init();
        kernel::set_trace_hooks(TraceHooks {
            on_switch_in: Some(trace_switch_in),
            on_switch_out: Some(trace_switch_out),
        });

        let _ = hprintln!("========================================");
        let _ = hprintln!("deadline scheduler demo");
        let _ = hprintln!("========================================");
        report("red   ", &RED);
        report("yellow", &YELLOW);
        report("green ", &GREEN);
        let _ = hprintln!(
            "  total U = 0.{:03}",
            util_x1000(&RED) + util_x1000(&YELLOW) + util_x1000(&GREEN)
        );

        let red = kernel::create_edf_task(
            periodic_task,
            "red",
            &RED as *const EdfParams as *mut (),
            RED,
        );
        let _ = hprintln!("create red:    {}", ok_or_fail(&red));

        let yellow = kernel::create_edf_task(
            periodic_task,
            "yellow",
            &YELLOW as *const EdfParams as *mut (),
            YELLOW,
        );
        let _ = hprintln!("create yellow: {}", ok_or_fail(&yellow));

        let green = kernel::create_edf_task(
            periodic_task,
            "green",
            &GREEN as *const EdfParams as *mut (),
            GREEN,
        );
        let _ = hprintln!("create green:  {}", ok_or_fail(&green));

        // Probe both admission tests for the infeasible candidate, then
        // confirm creation really refuses it.
        let (util_ok, demand_ok) = kernel::test_admission(150, 200, 200);
        let _ = hprintln!(
            "admission probe C=150 D=200 T=200: utilization={} demand={}",
            util_ok,
            demand_ok
        );

        let reject = kernel::create_edf_task(
            periodic_task,
            "reject",
            &RED as *const EdfParams as *mut (),
            EdfParams::new(150, 200, 200),
        );
        let _ = hprintln!("create reject: {} (expected FAIL)", ok_or_fail(&reject));

        let _ = hprintln!("starting scheduler");
        kernel::start(cp)
    }
}

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
fn main() {}
