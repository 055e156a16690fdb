//! Waveform recording of pin activity.
//!
//! The [`WaveformRecorder`] trait abstracts waveform output. [`VcdRecorder`]
//! writes IEEE 1364 Value Change Dump text that GTKWave or Surfer can open,
//! which is the first thing to look at when a bus transaction misbehaves.

use std::collections::HashMap;
use std::io::Write;

use regbench_common::{Logic, LogicVec};

use crate::error::SimError;
use crate::value::SimSignalId;

/// Sink for signal value changes.
pub trait WaveformRecorder {
    /// Declares a signal inside the current scope.
    fn register_signal(&mut self, id: SimSignalId, name: &str, width: u32) -> Result<(), SimError>;

    /// Opens a new scope (hierarchy level).
    fn begin_scope(&mut self, name: &str) -> Result<(), SimError>;

    /// Closes the current scope.
    fn end_scope(&mut self) -> Result<(), SimError>;

    /// Records a value change at the given time (in femtoseconds).
    fn record_change(
        &mut self,
        time_fs: u64,
        id: SimSignalId,
        value: &LogicVec,
    ) -> Result<(), SimError>;

    /// Flushes all buffered output.
    fn finalize(&mut self) -> Result<(), SimError>;
}

/// VCD (Value Change Dump) recorder.
///
/// Identifier codes are printable ASCII starting at `!`; more than 94
/// signals get multi-character codes.
pub struct VcdRecorder<W: Write> {
    writer: W,
    /// Per-signal identifier code and width.
    vars: HashMap<SimSignalId, (String, u32)>,
    header_written: bool,
    definitions_closed: bool,
    current_time: Option<u64>,
}

impl<W: Write> VcdRecorder<W> {
    /// Creates a new VCD recorder writing to the given output.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            vars: HashMap::new(),
            header_written: false,
            definitions_closed: false,
            current_time: None,
        }
    }

    /// Consumes the recorder and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn ensure_header(&mut self) -> Result<(), SimError> {
        if !self.header_written {
            writeln!(self.writer, "$version")?;
            writeln!(self.writer, "  regbench {}", env!("CARGO_PKG_VERSION"))?;
            writeln!(self.writer, "$end")?;
            writeln!(self.writer, "$timescale 1fs $end")?;
            self.header_written = true;
        }
        Ok(())
    }

    /// Generates a VCD identifier code from a sequential index.
    fn make_id_code(index: usize) -> String {
        let mut result = String::new();
        let mut idx = index;
        loop {
            result.push((b'!' + (idx % 94) as u8) as char);
            idx /= 94;
            if idx == 0 {
                break;
            }
            idx -= 1;
        }
        result
    }

    fn vcd_char(level: Logic) -> char {
        match level {
            Logic::Zero => '0',
            Logic::One => '1',
            Logic::X => 'x',
            Logic::Z => 'z',
        }
    }
}

impl<W: Write> WaveformRecorder for VcdRecorder<W> {
    fn register_signal(&mut self, id: SimSignalId, name: &str, width: u32) -> Result<(), SimError> {
        self.ensure_header()?;
        let code = Self::make_id_code(self.vars.len());
        writeln!(self.writer, "$var wire {width} {code} {name} $end")?;
        self.vars.insert(id, (code, width));
        Ok(())
    }

    fn begin_scope(&mut self, name: &str) -> Result<(), SimError> {
        self.ensure_header()?;
        writeln!(self.writer, "$scope module {name} $end")?;
        Ok(())
    }

    fn end_scope(&mut self) -> Result<(), SimError> {
        writeln!(self.writer, "$upscope $end")?;
        Ok(())
    }

    fn record_change(
        &mut self,
        time_fs: u64,
        id: SimSignalId,
        value: &LogicVec,
    ) -> Result<(), SimError> {
        self.ensure_header()?;
        if !self.definitions_closed {
            writeln!(self.writer, "$enddefinitions $end")?;
            self.definitions_closed = true;
        }
        if self.current_time != Some(time_fs) {
            writeln!(self.writer, "#{time_fs}")?;
            self.current_time = Some(time_fs);
        }

        let (code, width) = self.vars.get(&id).ok_or_else(|| SimError::UnknownSignal {
            name: format!("<vcd id {}>", id.as_raw()),
        })?;

        if *width == 1 {
            writeln!(self.writer, "{}{code}", Self::vcd_char(value.get(0)))?;
        } else {
            let bits: String = (0..*width).rev().map(|i| Self::vcd_char(value.get(i))).collect();
            writeln!(self.writer, "b{bits} {code}")?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), SimError> {
        self.ensure_header()?;
        if !self.definitions_closed {
            writeln!(self.writer, "$enddefinitions $end")?;
            self.definitions_closed = true;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(rec: VcdRecorder<Vec<u8>>) -> String {
        String::from_utf8(rec.into_inner()).unwrap()
    }

    #[test]
    fn id_codes() {
        assert_eq!(VcdRecorder::<Vec<u8>>::make_id_code(0), "!");
        assert_eq!(VcdRecorder::<Vec<u8>>::make_id_code(93), "~");
        assert_eq!(VcdRecorder::<Vec<u8>>::make_id_code(94).len(), 2);
    }

    #[test]
    fn scope_and_vars() {
        let mut rec = VcdRecorder::new(Vec::new());
        rec.begin_scope("dut").unwrap();
        rec.register_signal(SimSignalId::from_raw(0), "i2c_scl", 1)
            .unwrap();
        rec.register_signal(SimSignalId::from_raw(1), "data_in", 9)
            .unwrap();
        rec.end_scope().unwrap();
        rec.finalize().unwrap();

        let out = output(rec);
        assert!(out.starts_with("$version"));
        assert!(out.contains("$timescale 1fs $end"));
        assert!(out.contains("$scope module dut $end"));
        assert!(out.contains("$var wire 1 ! i2c_scl $end"));
        assert!(out.contains("$var wire 9 \" data_in $end"));
        assert!(out.trim_end().ends_with("$enddefinitions $end"));
    }

    #[test]
    fn value_changes_group_by_timestamp() {
        let mut rec = VcdRecorder::new(Vec::new());
        rec.begin_scope("dut").unwrap();
        rec.register_signal(SimSignalId::from_raw(0), "i2c_sda", 1)
            .unwrap();
        rec.register_signal(SimSignalId::from_raw(1), "data_in", 4)
            .unwrap();
        rec.end_scope().unwrap();

        let sda = SimSignalId::from_raw(0);
        let bus = SimSignalId::from_raw(1);
        rec.record_change(0, sda, &LogicVec::filled(1, Logic::Z))
            .unwrap();
        rec.record_change(0, bus, &LogicVec::from_binary_str("10X1").unwrap())
            .unwrap();
        rec.record_change(500, sda, &LogicVec::from_bool(false))
            .unwrap();
        rec.finalize().unwrap();

        let out = output(rec);
        let body: Vec<&str> = out
            .lines()
            .skip_while(|l| !l.starts_with("$enddefinitions"))
            .collect();
        assert_eq!(
            body,
            ["$enddefinitions $end", "#0", "z!", "b10x1 \"", "#500", "0!"]
        );
    }

    #[test]
    fn unregistered_signal_is_an_error() {
        let mut rec = VcdRecorder::new(Vec::new());
        let err = rec
            .record_change(0, SimSignalId::from_raw(3), &LogicVec::from_bool(true))
            .unwrap_err();
        assert!(matches!(err, SimError::UnknownSignal { .. }));
    }
}
