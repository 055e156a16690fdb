//! Simulation kernel with event queue, driver resolution, and delta-cycle loop.
//!
//! [`SimKernel`] owns every signal, driver, and process. The testbench holds
//! the kernel and advances it explicitly: each `advance`, `settle`, or
//! `wait_for_logic` call is a suspension point during which device processes
//! run. Between those calls nothing moves, which gives the testbench strict
//! sequential control over the stimulus.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

use regbench_common::{Logic, LogicVec};

use crate::error::SimError;
use crate::process::{Process, ProcessContext, ScheduledDrive};
use crate::time::SimTime;
use crate::value::{
    resolve_drivers, DriveStrength, Driver, DriverId, SimSignalId, SimSignalState,
};
use crate::waveform::WaveformRecorder;

/// A driver update scheduled in the event queue.
#[derive(Debug, Clone)]
struct SimEvent {
    /// When this event should be applied.
    time: SimTime,
    /// Insertion order, so simultaneous events apply first-come first-served.
    seq: u64,
    /// The driver being updated.
    driver: DriverId,
    /// The driver's new value.
    value: LogicVec,
}

impl PartialEq for SimEvent {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for SimEvent {}

impl PartialOrd for SimEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.time.cmp(&other.time).then(self.seq.cmp(&other.seq))
    }
}

/// Statistics returned when a simulation is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimSummary {
    /// The simulation time when the run ended.
    pub final_time: SimTime,
    /// The total number of delta cycles executed.
    pub total_deltas: u64,
}

/// The result of a single delta-cycle step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// A delta cycle was executed.
    Continued,
    /// The event queue is empty.
    Done,
}

/// The simulation kernel: signals, drivers, processes, and the event queue.
pub struct SimKernel {
    /// Current simulation time.
    current_time: SimTime,
    /// Min-heap event queue (earliest events first).
    event_queue: BinaryHeap<Reverse<SimEvent>>,
    /// All simulation signals, indexed by `SimSignalId`.
    signals: Vec<SimSignalState>,
    /// Lookup from signal name to ID.
    names: HashMap<String, SimSignalId>,
    /// All device processes.
    processes: Vec<Box<dyn Process>>,
    /// Mapping from signal to the processes sensitive to it.
    sensitivity_map: HashMap<SimSignalId, Vec<usize>>,
    /// Optional waveform recorder.
    recorder: Option<Box<dyn WaveformRecorder>>,
    /// Number of signals registered with the recorder.
    recorded_signals: usize,
    /// Optional time limit in femtoseconds.
    time_limit: Option<u64>,
    /// Maximum delta cycles per time step (default 10,000).
    max_delta_per_step: u32,
    /// Delta cycles executed at the current femtosecond.
    deltas_at_current_time: u32,
    /// Total delta cycles executed.
    total_deltas: u64,
    /// Next event sequence number.
    next_seq: u64,
}

impl Default for SimKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl SimKernel {
    /// Creates an empty kernel at time zero.
    pub fn new() -> Self {
        Self {
            current_time: SimTime::zero(),
            event_queue: BinaryHeap::new(),
            signals: Vec::new(),
            names: HashMap::new(),
            processes: Vec::new(),
            sensitivity_map: HashMap::new(),
            recorder: None,
            recorded_signals: 0,
            time_limit: None,
            max_delta_per_step: 10_000,
            deltas_at_current_time: 0,
            total_deltas: 0,
            next_seq: 0,
        }
    }

    /// Adds a signal initialized to all-X.
    pub fn add_signal(&mut self, name: &str, width: u32) -> Result<SimSignalId, SimError> {
        self.add_signal_with_init(name, LogicVec::filled(width, Logic::X))
    }

    /// Adds a signal holding `init` until something drives it.
    pub fn add_signal_with_init(
        &mut self,
        name: &str,
        init: LogicVec,
    ) -> Result<SimSignalId, SimError> {
        if self.names.contains_key(name) {
            return Err(SimError::DuplicateSignal {
                name: name.to_string(),
            });
        }
        let id = SimSignalId::from_raw(self.signals.len() as u32);
        self.signals.push(SimSignalState::new(name.to_string(), init));
        self.names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Attaches a new driver to a signal. It starts released (all-Z).
    pub fn add_driver(&mut self, signal: SimSignalId, strength: DriveStrength) -> DriverId {
        let state = &mut self.signals[signal.index()];
        state.drivers.push(Driver {
            value: LogicVec::filled(state.width, Logic::Z),
            strength,
        });
        DriverId::new(signal, state.drivers.len() - 1)
    }

    /// Attaches a pull-up resistor to a signal.
    ///
    /// The pull-up takes effect in the next delta cycle.
    pub fn add_pullup(&mut self, signal: SimSignalId) -> DriverId {
        let driver = self.add_driver(signal, DriveStrength::Pull);
        let width = self.signals[signal.index()].width;
        let value = LogicVec::filled(width, Logic::One);
        self.push_event(self.current_time.next_delta(), driver, value);
        driver
    }

    /// Registers a process, evaluated whenever one of `sensitivity` changes.
    pub fn add_process(&mut self, process: Box<dyn Process>, sensitivity: &[SimSignalId]) {
        let index = self.processes.len();
        tracing::trace!(process = process.name(), "registered process");
        self.processes.push(process);
        for &signal in sensitivity {
            let entry = self.sensitivity_map.entry(signal).or_default();
            if !entry.contains(&index) {
                entry.push(index);
            }
        }
    }

    /// Schedules a driver value for the next delta cycle.
    pub fn drive(&mut self, driver: DriverId, value: LogicVec) -> Result<(), SimError> {
        self.check_width(driver, &value)?;
        self.push_event(self.current_time.next_delta(), driver, value);
        Ok(())
    }

    /// Schedules a driver value `delay_fs` femtoseconds from now.
    pub fn drive_after(
        &mut self,
        driver: DriverId,
        value: LogicVec,
        delay_fs: u64,
    ) -> Result<(), SimError> {
        self.check_width(driver, &value)?;
        let time = if delay_fs == 0 {
            self.current_time.next_delta()
        } else {
            SimTime::from_fs(self.current_time.fs.saturating_add(delay_fs))
        };
        self.push_event(time, driver, value);
        Ok(())
    }

    /// Sets the time limit for the simulation.
    pub fn set_time_limit(&mut self, limit_fs: u64) {
        self.time_limit = Some(limit_fs);
    }

    /// Sets the maximum number of delta cycles per time step.
    pub fn set_max_delta(&mut self, max: u32) {
        self.max_delta_per_step = max;
    }

    /// Attaches a waveform recorder and dumps every existing signal into it.
    ///
    /// Signals added afterwards are not recorded.
    pub fn attach_recorder(
        &mut self,
        mut recorder: Box<dyn WaveformRecorder>,
        scope: &str,
    ) -> Result<(), SimError> {
        recorder.begin_scope(scope)?;
        for (index, state) in self.signals.iter().enumerate() {
            let id = SimSignalId::from_raw(index as u32);
            recorder.register_signal(id, &state.name, state.width)?;
        }
        recorder.end_scope()?;
        for (index, state) in self.signals.iter().enumerate() {
            recorder.record_change(
                self.current_time.fs,
                SimSignalId::from_raw(index as u32),
                &state.value,
            )?;
        }
        self.recorder = Some(recorder);
        self.recorded_signals = self.signals.len();
        Ok(())
    }

    /// Returns the current simulation time.
    pub fn current_time(&self) -> SimTime {
        self.current_time
    }

    /// Returns the value of a signal.
    pub fn value(&self, signal: SimSignalId) -> &LogicVec {
        &self.signals[signal.index()].value
    }

    /// Returns bit 0 of a signal.
    pub fn logic(&self, signal: SimSignalId) -> Logic {
        self.signals[signal.index()].logic()
    }

    /// Finds a signal by name.
    pub fn find_signal(&self, name: &str) -> Result<SimSignalId, SimError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| SimError::UnknownSignal {
                name: name.to_string(),
            })
    }

    /// Returns the name of a signal.
    pub fn signal_name(&self, signal: SimSignalId) -> &str {
        &self.signals[signal.index()].name
    }

    /// Runs every delta cycle scheduled at the current femtosecond.
    pub fn settle(&mut self) -> Result<(), SimError> {
        while self
            .peek_time()
            .is_some_and(|t| t.fs == self.current_time.fs)
        {
            self.step_delta()?;
        }
        Ok(())
    }

    /// Runs the simulation for `duration_fs` femtoseconds.
    pub fn advance(&mut self, duration_fs: u64) -> Result<(), SimError> {
        self.run_until(self.current_time.fs.saturating_add(duration_fs))
    }

    /// Processes every event up to and including `target_fs`, then moves
    /// time to `target_fs`.
    pub fn run_until(&mut self, target_fs: u64) -> Result<(), SimError> {
        let limit = self.time_limit.filter(|&limit| target_fs > limit);
        let stop = limit.unwrap_or(target_fs);

        while self.peek_time().is_some_and(|t| t.fs <= stop) {
            self.step_delta()?;
        }
        if self.current_time.fs < stop {
            self.current_time = self.current_time.advance_to(stop);
            self.deltas_at_current_time = 0;
        }

        match limit {
            Some(limit_fs) => Err(SimError::TimeLimitExceeded { limit_fs }),
            None => Ok(()),
        }
    }

    /// Runs until bit 0 of `signal` reads `level`, giving up after
    /// `timeout_fs` femtoseconds.
    ///
    /// Returns immediately if the signal already has the level.
    pub fn wait_for_logic(
        &mut self,
        signal: SimSignalId,
        level: Logic,
        timeout_fs: u64,
    ) -> Result<SimTime, SimError> {
        let deadline = self.current_time.fs.saturating_add(timeout_fs);
        loop {
            if self.logic(signal) == level {
                return Ok(self.current_time);
            }
            match self.peek_time() {
                Some(t) if t.fs <= deadline => {
                    if let Some(limit_fs) = self.time_limit.filter(|&limit| t.fs > limit) {
                        return Err(SimError::TimeLimitExceeded { limit_fs });
                    }
                    self.step_delta()?;
                }
                _ => {
                    self.run_until(deadline)?;
                    return Err(SimError::WaitTimeout {
                        signal: self.signal_name(signal).to_string(),
                        level,
                        time_fs: deadline,
                    });
                }
            }
        }
    }

    /// Executes a single delta cycle: applies the earliest batch of events,
    /// resolves the touched signals, and evaluates sensitive processes.
    pub fn step_delta(&mut self) -> Result<StepResult, SimError> {
        let Some(next_time) = self.peek_time() else {
            return Ok(StepResult::Done);
        };

        if next_time.fs != self.current_time.fs {
            self.deltas_at_current_time = 0;
        }
        self.current_time = next_time;

        // Apply every driver update scheduled for this exact delta
        let mut touched = BTreeSet::new();
        while let Some(Reverse(event)) = self.event_queue.peek() {
            if event.time != next_time {
                break;
            }
            let Some(Reverse(event)) = self.event_queue.pop() else {
                break;
            };
            let state = &mut self.signals[event.driver.signal().index()];
            state.drivers[event.driver.slot()].value = event.value;
            touched.insert(event.driver.signal());
        }

        // Re-resolve touched signals
        let mut changed = BTreeSet::new();
        for signal in touched {
            let state = &mut self.signals[signal.index()];
            let resolved = resolve_drivers(&state.drivers, state.width);
            if resolved != state.value {
                state.previous_value = std::mem::replace(&mut state.value, resolved);
                changed.insert(signal);
            }
        }

        if let Some(recorder) = &mut self.recorder {
            for &signal in changed.iter().filter(|s| s.index() < self.recorded_signals) {
                let value = &self.signals[signal.index()].value;
                recorder.record_change(next_time.fs, signal, value)?;
            }
        }

        // Evaluate sensitive processes in registration order
        let to_run: BTreeSet<usize> = changed
            .iter()
            .filter_map(|signal| self.sensitivity_map.get(signal))
            .flatten()
            .copied()
            .collect();

        let mut pending = Vec::new();
        {
            let Self {
                processes, signals, ..
            } = self;
            for index in to_run {
                let mut ctx = ProcessContext {
                    time: next_time,
                    signals: signals.as_slice(),
                    changed: &changed,
                    pending: &mut pending,
                };
                processes[index].evaluate(&mut ctx)?;
            }
        }

        for ScheduledDrive {
            driver,
            value,
            delay_fs,
        } in pending
        {
            self.drive_after(driver, value, delay_fs)?;
        }

        self.total_deltas += 1;
        self.deltas_at_current_time += 1;
        if self.deltas_at_current_time >= self.max_delta_per_step {
            return Err(SimError::DeltaCycleLimit {
                fs: self.current_time.fs,
                max_deltas: self.max_delta_per_step,
            });
        }

        Ok(StepResult::Continued)
    }

    /// Settles pending deltas, flushes the waveform, and reports statistics.
    pub fn finish(&mut self) -> Result<SimSummary, SimError> {
        self.settle()?;
        if let Some(recorder) = &mut self.recorder {
            recorder.finalize()?;
        }
        Ok(SimSummary {
            final_time: self.current_time,
            total_deltas: self.total_deltas,
        })
    }

    fn peek_time(&self) -> Option<SimTime> {
        self.event_queue.peek().map(|Reverse(event)| event.time)
    }

    fn push_event(&mut self, time: SimTime, driver: DriverId, value: LogicVec) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.event_queue.push(Reverse(SimEvent {
            time,
            seq,
            driver,
            value,
        }));
    }

    fn check_width(&self, driver: DriverId, value: &LogicVec) -> Result<(), SimError> {
        let state = &self.signals[driver.signal().index()];
        if state.width != value.width() {
            return Err(SimError::WidthMismatch {
                signal: state.name.clone(),
                expected: state.width,
                actual: value.width(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::Edge;
    use regbench_common::FS_PER_US;

    /// Copies its input to its output one delta later.
    struct Buffer {
        input: SimSignalId,
        output: DriverId,
    }

    impl Process for Buffer {
        fn name(&self) -> &str {
            "buffer"
        }

        fn evaluate(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), SimError> {
            let value = ctx.value(self.input).clone();
            ctx.drive(self.output, value);
            Ok(())
        }
    }

    /// Counts rising edges of its clock.
    struct EdgeCounter {
        clock: SimSignalId,
        count: std::rc::Rc<std::cell::Cell<u32>>,
    }

    impl Process for EdgeCounter {
        fn name(&self) -> &str {
            "edge_counter"
        }

        fn evaluate(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), SimError> {
            if ctx.edge(self.clock) == Some(Edge::Rising) {
                self.count.set(self.count.get() + 1);
            }
            Ok(())
        }
    }

    /// Inverts its own output forever.
    struct Oscillator {
        node: SimSignalId,
        driver: DriverId,
    }

    impl Process for Oscillator {
        fn name(&self) -> &str {
            "oscillator"
        }

        fn evaluate(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), SimError> {
            let next = match ctx.logic(self.node) {
                Logic::One => Logic::Zero,
                _ => Logic::One,
            };
            ctx.drive(self.driver, LogicVec::from(next));
            Ok(())
        }
    }

    #[test]
    fn new_signal_is_unknown_until_driven() {
        let mut k = SimKernel::new();
        let s = k.add_signal("rstb", 1).unwrap();
        assert_eq!(k.logic(s), Logic::X);
        let d = k.add_driver(s, DriveStrength::Strong);
        k.drive(d, LogicVec::from_bool(false)).unwrap();
        assert_eq!(k.logic(s), Logic::X);
        k.settle().unwrap();
        assert_eq!(k.logic(s), Logic::Zero);
    }

    #[test]
    fn duplicate_and_unknown_names() {
        let mut k = SimKernel::new();
        k.add_signal("a", 1).unwrap();
        assert!(matches!(
            k.add_signal("a", 1),
            Err(SimError::DuplicateSignal { .. })
        ));
        assert!(matches!(
            k.find_signal("b"),
            Err(SimError::UnknownSignal { .. })
        ));
    }

    #[test]
    fn drive_rejects_wrong_width() {
        let mut k = SimKernel::new();
        let s = k.add_signal("data_in", 9).unwrap();
        let d = k.add_driver(s, DriveStrength::Strong);
        let err = k.drive(d, LogicVec::from_u64(0xFF, 8)).unwrap_err();
        assert!(matches!(err, SimError::WidthMismatch { expected: 9, actual: 8, .. }));
    }

    #[test]
    fn pullup_resolves_released_bus_high() {
        let mut k = SimKernel::new();
        let sda = k.add_signal("i2c_sda", 1).unwrap();
        k.add_pullup(sda);
        let master = k.add_driver(sda, DriveStrength::Strong);
        k.settle().unwrap();
        assert_eq!(k.logic(sda), Logic::One);

        k.drive(master, LogicVec::from_bool(false)).unwrap();
        k.settle().unwrap();
        assert_eq!(k.logic(sda), Logic::Zero);

        k.drive(master, LogicVec::filled(1, Logic::Z)).unwrap();
        k.settle().unwrap();
        assert_eq!(k.logic(sda), Logic::One);
    }

    #[test]
    fn process_output_lands_one_delta_later() {
        let mut k = SimKernel::new();
        let a = k.add_signal("a", 1).unwrap();
        let y = k.add_signal("y", 1).unwrap();
        let a_drv = k.add_driver(a, DriveStrength::Strong);
        let y_drv = k.add_driver(y, DriveStrength::Strong);
        k.add_process(
            Box::new(Buffer {
                input: a,
                output: y_drv,
            }),
            &[a],
        );

        k.drive(a_drv, LogicVec::from_bool(true)).unwrap();
        assert_eq!(k.step_delta().unwrap(), StepResult::Continued);
        assert_eq!(k.logic(a), Logic::One);
        assert_eq!(k.logic(y), Logic::X);
        k.step_delta().unwrap();
        assert_eq!(k.logic(y), Logic::One);
        assert_eq!(k.current_time(), SimTime { fs: 0, delta: 2 });
        assert_eq!(k.step_delta().unwrap(), StepResult::Done);
    }

    #[test]
    fn edges_are_only_clean_transitions() {
        let mut k = SimKernel::new();
        let clk = k.add_signal("clk", 1).unwrap();
        let drv = k.add_driver(clk, DriveStrength::Strong);
        let count = std::rc::Rc::new(std::cell::Cell::new(0));
        k.add_process(
            Box::new(EdgeCounter {
                clock: clk,
                count: count.clone(),
            }),
            &[clk],
        );

        // X -> 1 is not a rising edge
        k.drive(drv, LogicVec::from_bool(true)).unwrap();
        k.advance(10).unwrap();
        for _ in 0..3 {
            k.drive(drv, LogicVec::from_bool(false)).unwrap();
            k.advance(10).unwrap();
            k.drive(drv, LogicVec::from_bool(true)).unwrap();
            k.advance(10).unwrap();
        }
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn advance_moves_time_without_events() {
        let mut k = SimKernel::new();
        k.advance(FS_PER_US).unwrap();
        assert_eq!(k.current_time(), SimTime::from_us(1));
    }

    #[test]
    fn delayed_drive_applies_at_its_time() {
        let mut k = SimKernel::new();
        let s = k.add_signal("ready", 1).unwrap();
        let d = k.add_driver(s, DriveStrength::Strong);
        k.drive_after(d, LogicVec::from_bool(true), 500).unwrap();
        k.advance(499).unwrap();
        assert_eq!(k.logic(s), Logic::X);
        k.advance(1).unwrap();
        assert_eq!(k.logic(s), Logic::One);
    }

    #[test]
    fn wait_for_logic_returns_time_of_change() {
        let mut k = SimKernel::new();
        let s = k.add_signal("i2c_scl", 1).unwrap();
        let d = k.add_driver(s, DriveStrength::Strong);
        k.drive_after(d, LogicVec::from_bool(true), 300).unwrap();
        let at = k.wait_for_logic(s, Logic::One, 1_000).unwrap();
        assert_eq!(at.fs, 300);
    }

    #[test]
    fn wait_for_logic_times_out() {
        let mut k = SimKernel::new();
        let s = k.add_signal("i2c_scl", 1).unwrap();
        let err = k.wait_for_logic(s, Logic::One, 1_000).unwrap_err();
        assert!(matches!(err, SimError::WaitTimeout { time_fs: 1_000, .. }));
        assert_eq!(k.current_time().fs, 1_000);
    }

    #[test]
    fn time_limit_stops_advance() {
        let mut k = SimKernel::new();
        k.set_time_limit(100);
        k.advance(50).unwrap();
        let err = k.advance(100).unwrap_err();
        assert!(matches!(err, SimError::TimeLimitExceeded { limit_fs: 100 }));
        assert_eq!(k.current_time().fs, 100);
    }

    #[test]
    fn combinational_loop_hits_delta_limit() {
        let mut k = SimKernel::new();
        let node = k.add_signal("node", 1).unwrap();
        let driver = k.add_driver(node, DriveStrength::Strong);
        k.add_process(Box::new(Oscillator { node, driver }), &[node]);
        k.set_max_delta(50);
        k.drive(driver, LogicVec::from_bool(false)).unwrap();
        let err = k.settle().unwrap_err();
        assert!(matches!(err, SimError::DeltaCycleLimit { max_deltas: 50, .. }));
    }

    #[test]
    fn delta_budget_is_per_time_step() {
        let mut k = SimKernel::new();
        let s = k.add_signal("ready", 1).unwrap();
        let d = k.add_driver(s, DriveStrength::Strong);
        k.set_max_delta(4);
        for i in 0..100 {
            k.drive(d, LogicVec::from_bool(i % 2 == 0)).unwrap();
            k.advance(10).unwrap();
        }
        assert_eq!(k.current_time().fs, 1_000);
    }

    #[test]
    fn huge_durations_saturate() {
        let mut k = SimKernel::new();
        let s = k.add_signal("i2c_scl", 1).unwrap();
        let d = k.add_driver(s, DriveStrength::Strong);
        k.advance(1_000).unwrap();
        k.drive_after(d, LogicVec::from_bool(true), u64::MAX).unwrap();
        assert_eq!(k.peek_time(), Some(SimTime::from_fs(u64::MAX)));
        let at = k.wait_for_logic(s, Logic::One, u64::MAX).unwrap();
        assert_eq!(at.fs, u64::MAX);
    }

    #[test]
    fn finish_reports_statistics() {
        let mut k = SimKernel::new();
        let s = k.add_signal("ready", 1).unwrap();
        let d = k.add_driver(s, DriveStrength::Strong);
        k.drive(d, LogicVec::from_bool(true)).unwrap();
        k.advance(1_000).unwrap();
        let summary = k.finish().unwrap();
        assert_eq!(summary.final_time, SimTime::from_fs(1_000));
        assert_eq!(summary.total_deltas, 1);
    }
}
