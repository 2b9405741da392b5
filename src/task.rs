//! # Task Control Block
//!
//! Defines the task model for the kernel. A task is either
//! *deadline-scheduled* — a periodic task admitted with worst-case
//! execution time, relative deadline, and period, dispatched earliest
//! deadline first — or a plain *round-robin* task living in a fixed
//! priority band (the idle task, housekeeping tasks).
//!
//! ## Job model
//!
//! A deadline-scheduled task releases one *job* per period. The live job
//! is described by three ticks derived from the admission parameters:
//!
//! ```text
//! release_time                    abs_deadline        next_release
//!      │◄──────────── D ──────────────►│                   │
//!      │◄──────────────────── T ───────────────────────────►│
//! ```
//!
//! The fields advance by exactly one period per job, at the moment the
//! task wakes for its next period (never at the moment it goes to
//! sleep). A task that is late therefore keeps the deadline of the job
//! it is still running.

use crate::config::{DEFAULT_TIME_SLICE, STACK_SIZE};

// ---------------------------------------------------------------------------
// Task state machine
// ---------------------------------------------------------------------------

/// Execution state of a task.
///
/// ```text
///   ┌──────────┐     schedule()      ┌─────────┐
///   │  Ready   │ ──────────────────► │ Running │
///   └──────────┘                     └─────────┘
///        ▲          preempt / yield       │
///        └────────────────────────────────┤
///        ▲                                │ delay_until()
///        │          wake tick             ▼
///        │                          ┌──────────┐
///        └───────────────────────── │ Delayed  │
///                                   └──────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Released and waiting for the CPU.
    Ready,
    /// Currently executing.
    Running,
    /// Sleeping until `wake_tick` (waiting for its next period).
    Delayed,
    /// Not schedulable: a free TCB slot or an explicitly removed task.
    Suspended,
}

// ---------------------------------------------------------------------------
// Timing parameters
// ---------------------------------------------------------------------------

/// Admission parameters of a deadline-scheduled task, in ticks.
/// Immutable once the task is admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdfParams {
    /// Worst-case execution time `C`.
    pub wcet: u32,
    /// Relative deadline `D`, measured from each release.
    pub deadline: u32,
    /// Period `T` between releases.
    pub period: u32,
}

impl EdfParams {
    pub const fn new(wcet: u32, deadline: u32, period: u32) -> Self {
        Self {
            wcet,
            deadline,
            period,
        }
    }

    /// The constrained-deadline task model: `1 ≤ C ≤ D ≤ T`.
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.wcet >= 1 && self.wcet <= self.deadline && self.deadline <= self.period
    }

    /// Implicit deadline: `D == T`.
    #[inline]
    pub const fn is_implicit(&self) -> bool {
        self.deadline == self.period
    }

    const fn zeroed() -> Self {
        Self::new(0, 0, 0)
    }
}

/// Task entry point. The opaque argument is the pointer handed to task
/// creation; it lands in R0 when the task first runs.
pub type TaskEntry = extern "C" fn(*mut ()) -> !;

// ---------------------------------------------------------------------------
// Task Control Block
// ---------------------------------------------------------------------------

/// Per-task stack memory, aligned to 8 bytes as required by the AAPCS.
#[repr(align(8))]
pub struct TaskStack(pub [u8; STACK_SIZE]);

/// Task Control Block — the central per-task structure.
///
/// TCBs live in a fixed array inside the scheduler; no heap allocation.
/// The deadline bookkeeping fields (`release_time`, `abs_deadline`,
/// `next_release`, `job_seq`) are meaningful only while `is_edf` is set;
/// round-robin tasks leave them at zero.
pub struct TaskControlBlock {
    /// Index in the scheduler's task array.
    pub id: usize,

    /// Task name, for reports and traces.
    pub name: &'static str,

    /// Current execution state.
    pub state: TaskState,

    /// Priority band. Deadline-scheduled tasks all sit in
    /// [`EDF_PRIORITY`](crate::config::EDF_PRIORITY).
    pub priority: u8,

    /// True for deadline-scheduled tasks.
    pub is_edf: bool,

    /// Admission parameters; zeroed for round-robin tasks.
    pub edf: EdfParams,

    /// Tick at which the current job was released.
    pub release_time: u64,

    /// `release_time + D` for the current job. The dispatch key.
    pub abs_deadline: u64,

    /// Tick at which the next job becomes ready; always
    /// `release_time + T`.
    pub next_release: u64,

    /// Sequence number of the current job. Assigned at release and
    /// reused when a preempted job is put back in the ready queue, so
    /// jobs with equal deadlines keep first-release-first order.
    pub job_seq: u64,

    /// Wake tick while `Delayed`.
    pub wake_tick: u64,

    /// Deadline misses over the task's lifetime. Monotone.
    pub miss_count: u32,

    /// Latch: the current job has already been counted as missed.
    /// Cleared at every release.
    pub missed_current_job: bool,

    /// Slot of this task's parameter record in the admission registry.
    pub registry_slot: usize,

    /// Remaining ticks of the current time slice (round-robin tasks).
    pub ticks_remaining: u32,

    /// Total ticks this task has spent in `Running`.
    pub total_ticks: u64,

    /// Saved process stack pointer. Updated on every context switch;
    /// always points into `stack`.
    pub stack_pointer: *mut u32,

    /// Inline stack memory.
    pub stack: TaskStack,

    /// Whether this slot holds a live task.
    pub active: bool,
}

// The raw stack_pointer always points into the TCB's own stack array,
// and TCBs are only touched inside critical sections or from handler
// context on a single core.
unsafe impl Send for TaskControlBlock {}
unsafe impl Sync for TaskControlBlock {}

impl TaskControlBlock {
    /// An unallocated TCB slot, used to build the static task array.
    pub const EMPTY: Self = Self {
        id: 0,
        name: "",
        state: TaskState::Suspended,
        priority: 0,
        is_edf: false,
        edf: EdfParams::zeroed(),
        release_time: 0,
        abs_deadline: 0,
        next_release: 0,
        job_seq: 0,
        wake_tick: 0,
        miss_count: 0,
        missed_current_job: false,
        registry_slot: 0,
        ticks_remaining: 0,
        total_ticks: 0,
        stack_pointer: core::ptr::null_mut(),
        stack: TaskStack([0u8; STACK_SIZE]),
        active: false,
    };

    /// Initialize this slot as a round-robin task in the given band.
    /// The stack frame is set up separately by the arch layer.
    pub fn init(&mut self, id: usize, name: &'static str, priority: u8) {
        self.id = id;
        self.name = name;
        self.state = TaskState::Ready;
        self.priority = priority;
        self.is_edf = false;
        self.edf = EdfParams::zeroed();
        self.release_time = 0;
        self.abs_deadline = 0;
        self.next_release = 0;
        self.job_seq = 0;
        self.wake_tick = 0;
        self.miss_count = 0;
        self.missed_current_job = false;
        self.registry_slot = 0;
        self.ticks_remaining = DEFAULT_TIME_SLICE;
        self.total_ticks = 0;
        self.active = true;
    }

    /// Initialize this slot as a deadline-scheduled task whose first job
    /// is released at `now`: the first absolute deadline is `now + D`
    /// and the next release `now + T`.
    pub fn init_edf(
        &mut self,
        id: usize,
        name: &'static str,
        priority: u8,
        params: EdfParams,
        now: u64,
    ) {
        self.init(id, name, priority);
        self.is_edf = true;
        self.edf = params;
        self.release_time = now;
        self.abs_deadline = now + params.deadline as u64;
        self.next_release = now + params.period as u64;
    }

    /// Advance the job bookkeeping by one period. Called when the task
    /// wakes for its next period — the stored `next_release` becomes the
    /// new release time, so deadlines advance in exact steps of `T`
    /// regardless of when the wake is actually processed.
    pub fn start_next_job(&mut self) {
        let release = self.next_release;
        self.release_time = release;
        self.abs_deadline = release + self.edf.deadline as u64;
        self.next_release = release + self.edf.period as u64;
        self.missed_current_job = false;
    }

    /// Count a deadline miss for the current job. Returns `true` if this
    /// call recorded a new miss; at most one miss is recorded per job.
    pub fn record_miss(&mut self) -> bool {
        if self.missed_current_job {
            return false;
        }
        self.missed_current_job = true;
        self.miss_count += 1;
        true
    }

    /// Ready to run and holding a live slot.
    #[inline]
    pub fn is_runnable(&self) -> bool {
        self.active && self.state == TaskState::Ready
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_validation() {
        assert!(EdfParams::new(1, 1, 1).is_valid());
        assert!(EdfParams::new(100, 250, 500).is_valid());
        // C must be at least one tick
        assert!(!EdfParams::new(0, 10, 10).is_valid());
        // D < C
        assert!(!EdfParams::new(20, 10, 100).is_valid());
        // T < D
        assert!(!EdfParams::new(10, 200, 100).is_valid());
    }

    #[test]
    fn implicit_deadline_detection() {
        assert!(EdfParams::new(10, 100, 100).is_implicit());
        assert!(!EdfParams::new(10, 80, 100).is_implicit());
    }

    #[test]
    fn first_job_fields() {
        let mut tcb = TaskControlBlock::EMPTY;
        tcb.init_edf(2, "sense", 1, EdfParams::new(10, 40, 100), 7);

        assert!(tcb.active);
        assert!(tcb.is_edf);
        assert_eq!(tcb.state, TaskState::Ready);
        assert_eq!(tcb.release_time, 7);
        assert_eq!(tcb.abs_deadline, 47);
        assert_eq!(tcb.next_release, 107);
    }

    #[test]
    fn deadlines_advance_in_period_steps() {
        let mut tcb = TaskControlBlock::EMPTY;
        tcb.init_edf(0, "ctl", 1, EdfParams::new(10, 40, 100), 0);

        let mut last_deadline = tcb.abs_deadline;
        for _ in 0..5 {
            tcb.start_next_job();
            assert_eq!(tcb.abs_deadline, last_deadline + 100);
            assert_eq!(tcb.next_release - tcb.release_time, 100);
            last_deadline = tcb.abs_deadline;
        }
    }

    #[test]
    fn miss_latch_counts_once_per_job() {
        let mut tcb = TaskControlBlock::EMPTY;
        tcb.init_edf(0, "late", 1, EdfParams::new(10, 40, 100), 0);

        assert!(tcb.record_miss());
        assert!(!tcb.record_miss());
        assert!(!tcb.record_miss());
        assert_eq!(tcb.miss_count, 1);

        // The latch clears at the next release
        tcb.start_next_job();
        assert!(tcb.record_miss());
        assert_eq!(tcb.miss_count, 2);
    }

    #[test]
    fn plain_task_init_resets_slot() {
        let mut tcb = TaskControlBlock::EMPTY;
        tcb.init_edf(1, "edf", 1, EdfParams::new(5, 20, 50), 0);
        tcb.miss_count = 3;

        tcb.init(1, "plain", 4);
        assert!(!tcb.is_edf);
        assert_eq!(tcb.priority, 4);
        assert_eq!(tcb.miss_count, 0);
        assert_eq!(tcb.ticks_remaining, DEFAULT_TIME_SLICE);
    }
}
