//! Scripted devices for exercising the synchronizer.
//!
//! These ignore the bus entirely and play back a fixed waveform.

use crate::device::Device;
use crate::lines::{BusLines, Level, LineId, OutputBus, OutputLines};
use crate::types::{SimTime, TickCount};

/// Plays back a list of `(level, ticks)` segments on a single output line.
///
/// After the last segment the waveform either repeats or holds its final
/// level forever.
#[derive(Clone, Debug)]
pub struct WaveformDevice {
    line: LineId,
    segments: Vec<(Level, TickCount)>,
    repeat: bool,
    /// Ticks since reset
    elapsed: TickCount,
    level: Level,
}

impl WaveformDevice {
    /// A waveform that holds its last level once the segments run out.
    pub fn once(line: LineId, segments: Vec<(Level, TickCount)>) -> Self {
        Self::new(line, segments, false)
    }

    /// A waveform that loops over its segments.
    pub fn repeating(line: LineId, segments: Vec<(Level, TickCount)>) -> Self {
        Self::new(line, segments, true)
    }

    /// A square wave: `high_ticks` high, then low for the rest of `period_ticks`.
    pub fn square(line: LineId, period_ticks: TickCount, high_ticks: TickCount) -> Self {
        Self::repeating(
            line,
            vec![
                (Level::High, high_ticks),
                (Level::Low, period_ticks - high_ticks),
            ],
        )
    }

    /// A line stuck at one level.
    pub fn constant(line: LineId, level: Level) -> Self {
        Self::once(line, vec![(level, 1)])
    }

    fn new(line: LineId, segments: Vec<(Level, TickCount)>, repeat: bool) -> Self {
        let level = segments.first().map(|(l, _)| *l).unwrap_or_default();
        Self {
            line,
            segments,
            repeat,
            elapsed: 0,
            level,
        }
    }

    fn level_at(&self, elapsed: TickCount) -> Level {
        let total: TickCount = self.segments.iter().map(|(_, n)| n).sum();
        if total == 0 {
            return self.level;
        }
        let mut offset = if self.repeat {
            elapsed % total
        } else if elapsed >= total {
            return self.segments.last().map(|(l, _)| *l).unwrap_or_default();
        } else {
            elapsed
        };
        for &(level, len) in &self.segments {
            if offset < len {
                return level;
            }
            offset -= len;
        }
        self.level
    }
}

impl Device for WaveformDevice {
    fn reset(&mut self) {
        self.elapsed = 0;
        self.level = self.level_at(0);
    }

    fn on_tick(&mut self, _time: SimTime, _bus: BusLines) {
        self.elapsed += 1;
        self.level = self.level_at(self.elapsed);
    }

    fn outputs(&self) -> OutputLines {
        let bits = if self.level.is_high() { self.line.mask() } else { 0 };
        match self.line.bus {
            OutputBus::Out => OutputLines::new(bits, 0),
            OutputBus::InOut => OutputLines::new(0, bits),
        }
    }

    fn name(&self) -> &str {
        "waveform"
    }
}
