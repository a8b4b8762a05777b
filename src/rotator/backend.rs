use std::collections::HashMap;

use strum_macros::Display;

use crate::calibration::{CalibrationAxis, CalibrationModel, RawUnit};
use crate::rotator::error::BackendError;

/// Sensor inputs of the rotator interface circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum InputChannel {
    AzPosition,
    ElPosition,
    PowerSense,
}

/// Motor drive outputs. One per direction per axis; driving one direction
/// requires the opposite channel to be stopped first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum OutputChannel {
    AzLeft,
    AzRight,
    ElUp,
    ElDown,
}

pub const ALL_OUTPUTS: [OutputChannel; 4] = [
    OutputChannel::AzLeft,
    OutputChannel::AzRight,
    OutputChannel::ElUp,
    OutputChannel::ElDown,
];

/// Drive level for an output channel. The actuators are bang-bang: a channel
/// either drives its motor or it doesn't.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Drive {
    Move,
    Stop,
}

/// Capability contract for the hardware behind the rotator: batched sensor
/// reads and single-channel actuator writes. Implementations for real
/// interface hardware (LabJack T4, FT232H) live out of tree; the controller
/// is generic over this trait and never talks to a device directly.
pub trait RotatorBackend {
    /// Unit system of the position samples this backend reports.
    fn raw_unit(&self) -> RawUnit;

    /// Sample the requested input channels together. One logical read; the
    /// channels must not be sampled at visibly different instants.
    fn read(
        &mut self,
        channels: &[InputChannel],
    ) -> Result<HashMap<InputChannel, f64>, BackendError>;

    /// Set one output channel's drive level.
    fn write(&mut self, channel: OutputChannel, drive: Drive) -> Result<(), BackendError>;
}

/// Software stand-in for the rotator. Each sensor read advances the
/// simulated position according to the currently driven outputs, which is a
/// fair model of a polling control loop: motion happens between polls.
pub struct SimulatedBackend {
    cal: CalibrationModel,
    az_deg: f64,
    el_deg: f64,
    power_on: bool,
    deg_per_read: f64,
    az_jammed: bool,
    fail_read_after: Option<usize>,
    reads: usize,
    outputs: HashMap<OutputChannel, Drive>,
    write_log: Vec<(OutputChannel, Drive)>,
}

#[allow(dead_code)]
impl SimulatedBackend {
    pub fn new(cal: CalibrationModel) -> Self {
        Self {
            cal,
            az_deg: 0.0,
            el_deg: 0.0,
            power_on: true,
            deg_per_read: 1.0,
            az_jammed: false,
            fail_read_after: None,
            reads: 0,
            outputs: HashMap::new(),
            write_log: Vec::new(),
        }
    }

    pub fn with_position(mut self, az_deg: f64, el_deg: f64) -> Self {
        self.az_deg = az_deg;
        self.el_deg = el_deg;
        self
    }

    pub fn with_power(mut self, power_on: bool) -> Self {
        self.power_on = power_on;
        self
    }

    /// Degrees of travel per sensor read while a direction is driven.
    pub fn with_rate(mut self, deg_per_read: f64) -> Self {
        self.deg_per_read = deg_per_read;
        self
    }

    /// Azimuth ignores all drive commands, like a seized motor.
    pub fn with_jammed_azimuth(mut self) -> Self {
        self.az_jammed = true;
        self
    }

    /// The Nth and all later reads fail, as a stuck ADC would.
    pub fn with_read_failure_after(mut self, reads: usize) -> Self {
        self.fail_read_after = Some(reads);
        self
    }

    /// Every write issued since construction, in order.
    pub fn write_log(&self) -> &[(OutputChannel, Drive)] {
        &self.write_log
    }

    pub fn position(&self) -> (f64, f64) {
        (self.az_deg, self.el_deg)
    }

    fn driven(&self, channel: OutputChannel) -> bool {
        self.outputs.get(&channel) == Some(&Drive::Move)
    }

    fn advance(&mut self) {
        if !self.az_jammed {
            if self.driven(OutputChannel::AzRight) {
                self.az_deg += self.deg_per_read;
            }
            if self.driven(OutputChannel::AzLeft) {
                self.az_deg -= self.deg_per_read;
            }
        }
        if self.driven(OutputChannel::ElUp) {
            self.el_deg += self.deg_per_read;
        }
        if self.driven(OutputChannel::ElDown) {
            self.el_deg -= self.deg_per_read;
        }
        // Mechanical end stops.
        self.az_deg = self.az_deg.clamp(self.cal.az.min_angle, self.cal.az.max_angle);
        self.el_deg = self.el_deg.clamp(self.cal.el.min_angle, self.cal.el.max_angle);
    }
}

fn degrees_to_voltage(axis: &CalibrationAxis, angle: f64) -> f64 {
    (angle - axis.min_angle) * (axis.max_voltage - axis.min_voltage)
        / (axis.max_angle - axis.min_angle)
        + axis.min_voltage
}

impl RotatorBackend for SimulatedBackend {
    fn raw_unit(&self) -> RawUnit {
        RawUnit::Voltage
    }

    fn read(
        &mut self,
        channels: &[InputChannel],
    ) -> Result<HashMap<InputChannel, f64>, BackendError> {
        self.advance();
        self.reads += 1;
        if let Some(limit) = self.fail_read_after {
            if self.reads >= limit {
                return Err(BackendError::Read("simulated ADC failure".to_string()));
            }
        }

        let mut values = HashMap::new();
        for channel in channels {
            let value = match channel {
                InputChannel::AzPosition => degrees_to_voltage(&self.cal.az, self.az_deg),
                InputChannel::ElPosition => degrees_to_voltage(&self.cal.el, self.el_deg),
                InputChannel::PowerSense => {
                    if self.power_on {
                        5.0
                    } else {
                        0.0
                    }
                }
            };
            values.insert(*channel, value);
        }
        Ok(values)
    }

    fn write(&mut self, channel: OutputChannel, drive: Drive) -> Result<(), BackendError> {
        self.outputs.insert(channel, drive);
        self.write_log.push((channel, drive));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cal() -> CalibrationModel {
        CalibrationModel::from_str(
            "Az, 0, 0, 0, 540, 32000, 4.0\nEl, 0, 0, 0, 180, 32000, 4.0\n",
        )
        .unwrap()
    }

    #[test]
    fn reports_position_as_voltage() {
        let mut backend = SimulatedBackend::new(cal()).with_position(270.0, 90.0);
        let values = backend
            .read(&[InputChannel::AzPosition, InputChannel::ElPosition])
            .unwrap();
        assert!((values[&InputChannel::AzPosition] - 2.0).abs() < 1e-9);
        assert!((values[&InputChannel::ElPosition] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn motion_happens_between_reads() {
        let mut backend = SimulatedBackend::new(cal()).with_position(100.0, 0.0);
        backend.write(OutputChannel::AzLeft, Drive::Move).unwrap();
        backend.read(&[InputChannel::AzPosition]).unwrap();
        backend.read(&[InputChannel::AzPosition]).unwrap();
        assert_eq!(backend.position().0, 98.0);
        backend.write(OutputChannel::AzLeft, Drive::Stop).unwrap();
        backend.read(&[InputChannel::AzPosition]).unwrap();
        assert_eq!(backend.position().0, 98.0);
    }

    #[test]
    fn travel_stops_at_end_stop() {
        let mut backend = SimulatedBackend::new(cal()).with_position(1.0, 0.0).with_rate(5.0);
        backend.write(OutputChannel::AzLeft, Drive::Move).unwrap();
        backend.read(&[InputChannel::AzPosition]).unwrap();
        assert_eq!(backend.position().0, 0.0);
    }

    #[test]
    fn injected_read_failure() {
        let mut backend = SimulatedBackend::new(cal()).with_read_failure_after(2);
        assert!(backend.read(&[InputChannel::AzPosition]).is_ok());
        assert!(backend.read(&[InputChannel::AzPosition]).is_err());
    }
}
