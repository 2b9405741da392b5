//! # Cortex-M4 Port
//!
//! Context switching via PendSV, the SysTick tick source, and task
//! stack frame initialization for the ARM Cortex-M4 (Thumb-2).
//!
//! ## Context switch
//!
//! The core uses the split-stack model: MSP for handlers, PSP for
//! tasks. Exception entry hardware-stacks R0–R3, R12, LR, PC, xPSR on
//! the process stack; the PendSV handler saves and restores R4–R11 to
//! complete the context.
//!
//! Both PendSV and SysTick run at the lowest exception priority, so a
//! context switch can never preempt another handler.

#[cfg(all(target_arch = "arm", target_os = "none"))]
use core::arch::asm;

use crate::config::{SYSTEM_CLOCK_HZ, TICK_HZ};
use crate::task::{TaskControlBlock, TaskEntry};

// ---------------------------------------------------------------------------
// SysTick configuration
// ---------------------------------------------------------------------------

/// Program SysTick to fire at `TICK_HZ` from the core clock. Each tick
/// runs the scheduler's release engine and miss monitor.
pub fn configure_systick(syst: &mut cortex_m::peripheral::SYST) {
    use cortex_m::peripheral::syst::SystClkSource;

    let reload = SYSTEM_CLOCK_HZ / TICK_HZ - 1;
    syst.set_reload(reload);
    syst.clear_current();
    syst.set_clock_source(SystClkSource::Core);
    syst.enable_counter();
    syst.enable_interrupt();
}

// ---------------------------------------------------------------------------
// PendSV trigger
// ---------------------------------------------------------------------------

/// Request a context switch by pending PendSV (ICSR.PENDSVSET). The
/// switch itself happens once no other handler is active.
#[inline]
pub fn trigger_pendsv() {
    const ICSR: *mut u32 = 0xE000_ED04 as *mut u32;
    unsafe {
        core::ptr::write_volatile(ICSR, 1 << 28);
    }
}

/// Drop PendSV and SysTick to the lowest exception priority (SHPR3).
/// Context switches must never preempt application interrupt handlers.
pub fn set_exception_priorities() {
    const SHPR3: *mut u32 = 0xE000_ED20 as *mut u32;
    unsafe {
        let val = core::ptr::read_volatile(SHPR3);
        core::ptr::write_volatile(SHPR3, val | (0xFF << 16) | (0xFF << 24));
    }
}

// ---------------------------------------------------------------------------
// Stack frame initialization
// ---------------------------------------------------------------------------

/// Build the initial stack frame for a new task so the first PendSV
/// "return" into it starts the entry function with `arg` in R0.
///
/// ```text
/// [Hardware-stacked frame]      high addresses
///   xPSR  (Thumb bit set)
///   PC    (entry)
///   LR    (task_exit)
///   R12, R3, R2, R1
///   R0    (arg)
/// [Software-saved context]
///   R11 … R4                    <- stack_pointer after init
/// ```
pub fn init_stack(tcb: &mut TaskControlBlock, entry: TaskEntry, arg: *mut ()) {
    let stack_top = tcb.stack.0.as_ptr() as usize + tcb.stack.0.len();
    // AAPCS: 8-byte alignment
    let aligned_top = stack_top & !0x07;

    // 16 words: 8 hardware-stacked + 8 software-saved
    let frame_ptr = (aligned_top - 16 * 4) as *mut u32;

    unsafe {
        // Software-saved R4–R11
        for i in 0..8 {
            *frame_ptr.add(i) = 0;
        }

        // Hardware frame
        *frame_ptr.add(8) = arg as u32; // R0 — entry argument
        *frame_ptr.add(9) = 0; // R1
        *frame_ptr.add(10) = 0; // R2
        *frame_ptr.add(11) = 0; // R3
        *frame_ptr.add(12) = 0; // R12
        *frame_ptr.add(13) = task_exit as u32; // LR
        *frame_ptr.add(14) = entry as u32; // PC
        *frame_ptr.add(15) = 0x0100_0000; // xPSR — Thumb bit
    }

    tcb.stack_pointer = frame_ptr;
}

/// Landing pad for a task entry that returns. Entries are `fn() -> !`
/// so this is unreachable in a correct build; parking the core is safer
/// than running off into arbitrary memory.
extern "C" fn task_exit() -> ! {
    loop {
        #[cfg(all(target_arch = "arm", target_os = "none"))]
        cortex_m::asm::wfi();
        #[cfg(not(all(target_arch = "arm", target_os = "none")))]
        core::hint::spin_loop();
    }
}

// ---------------------------------------------------------------------------
// First task launch
// ---------------------------------------------------------------------------

/// Switch Thread mode onto the PSP and branch into the first task.
/// Called once from `kernel::start`; never returns.
///
/// # Safety
/// `psp` must point at a frame built by [`init_stack`].
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub unsafe fn start_first_task(psp: *const u32) -> ! {
    asm!(
        // Skip the software-saved R4-R11 (8 words)
        "adds r0, #32",
        "msr psp, r0",
        // Thread mode uses PSP from here on (CONTROL.SPSEL = 1)
        "movs r0, #2",
        "msr control, r0",
        "isb",
        // Unstack the hardware frame by hand; this is a launch, not an
        // exception return.
        "pop {{r0-r3, r12}}",
        "pop {{r4}}", // LR slot (task_exit; entries never return)
        "pop {{r5}}", // PC — task entry
        "pop {{r6}}", // xPSR (discarded)
        "cpsie i",
        "bx r5",
        in("r0") psp,
        options(noreturn)
    );
}

// ---------------------------------------------------------------------------
// Exception handlers
// ---------------------------------------------------------------------------

/// PendSV — the context switch itself.
///
/// Saves R4–R11 on the outgoing task's process stack, records its PSP,
/// asks the scheduler for the next task, and unstacks the incoming
/// task's context. The exception return then restores its hardware
/// frame.
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[unsafe(naked)]
#[no_mangle]
pub unsafe extern "C" fn PendSV() {
    core::arch::naked_asm!(
        "mrs r0, psp",
        "stmdb r0!, {{r4-r11}}",
        "bl {save}",
        "bl {select}",
        "ldmia r0!, {{r4-r11}}",
        "msr psp, r0",
        // Return to Thread mode on the PSP
        "ldr r0, =0xFFFFFFFD",
        "bx r0",
        save = sym save_context,
        select = sym switch_context,
    );
}

/// Record the outgoing task's stack pointer. Called from PendSV with
/// interrupts implicitly serialized.
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[no_mangle]
unsafe extern "C" fn save_context(psp: *mut u32) {
    let sched = &mut *crate::kernel::SCHEDULER_PTR;
    let current = sched.current_task;
    if current < sched.task_count {
        sched.tasks[current].stack_pointer = psp;
    }
}

/// Run the selection and hand back the incoming task's stack pointer.
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[no_mangle]
unsafe extern "C" fn switch_context() -> *mut u32 {
    let sched = &mut *crate::kernel::SCHEDULER_PTR;
    let next = sched.schedule();
    sched.tasks[next].stack_pointer
}

/// SysTick — the kernel tick. Advances the release engine and the miss
/// monitor, then pends a context switch if one was requested.
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[no_mangle]
pub unsafe extern "C" fn SysTick() {
    let sched = &mut *crate::kernel::SCHEDULER_PTR;
    sched.tick();

    if sched.needs_reschedule {
        trigger_pendsv();
    }
}
