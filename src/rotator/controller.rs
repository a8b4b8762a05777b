use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::calibration::{CalibrationModel, POWER_ON_THRESHOLD_V};
use crate::rotator::backend::{
    Drive, InputChannel, OutputChannel, RotatorBackend, ALL_OUTPUTS,
};
use crate::rotator::error::{BackendError, RotatorError};

/// Angular tolerance around a target within which an axis counts as arrived.
pub const DEADBAND_DEG: f64 = 0.5;

/// The first seek tends to overshoot from motor momentum and backlash; the
/// second pass takes out the residual error.
const SEEK_TRIES: u32 = 2;

pub const DEFAULT_MAX_SEEK_TICKS: u32 = 10_000;

/// Last known view of the rotator, refreshed on every sensor read. Positions
/// stay `None` until the first read.
#[derive(Debug, Clone, Copy, Default)]
pub struct RotatorState {
    pub az_deg: Option<f64>,
    pub el_deg: Option<f64>,
    pub power_on: bool,
}

/// Which way an axis approaches its target during a seek.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increasing,
    Decreasing,
}

/// Deadband test relative to the approach direction. Reaching the near edge
/// of the band counts as arrival, and so does anything past it, so an
/// overshoot is still "arrived" rather than a reason to keep driving.
pub fn at_target(current: f64, target: f64, approach: Direction) -> bool {
    match approach {
        Direction::Increasing => (target - DEADBAND_DEG) < current,
        Direction::Decreasing => current < (target + DEADBAND_DEG),
    }
}

/// Cooperative cancellation for an in-progress seek. Cloneable; any holder
/// may cancel, and the seek loop checks it once per tick.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Closed-loop dual-axis controller. Owns the backend and the rotator state;
/// everything it knows about the hardware comes from `read_sensors` and
/// everything it does to it goes through the backend's output channels.
pub struct MotionController<B: RotatorBackend> {
    backend: B,
    cal: CalibrationModel,
    state: RotatorState,
    max_seek_ticks: u32,
}

impl<B: RotatorBackend> MotionController<B> {
    pub fn new(backend: B, cal: CalibrationModel, max_seek_ticks: u32) -> Self {
        Self {
            backend,
            cal,
            state: RotatorState::default(),
            max_seek_ticks,
        }
    }

    pub fn state(&self) -> RotatorState {
        self.state
    }

    #[allow(dead_code)]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Sample all three inputs in one batched read, convert to degrees with
    /// the calibration for the backend's unit system, and refresh the state.
    /// Never touches the actuator outputs.
    pub fn read_sensors(&mut self) -> Result<(f64, f64, bool), RotatorError> {
        let channels = [
            InputChannel::AzPosition,
            InputChannel::ElPosition,
            InputChannel::PowerSense,
        ];
        let values = self
            .backend
            .read(&channels)
            .map_err(RotatorError::SensorRead)?;

        let sample = |channel: InputChannel| {
            values.get(&channel).copied().ok_or_else(|| {
                RotatorError::SensorRead(BackendError::Read(format!("missing {channel} sample")))
            })
        };

        let unit = self.backend.raw_unit();
        let az = self.cal.az.raw_to_degrees(sample(InputChannel::AzPosition)?, unit);
        let el = self.cal.el.raw_to_degrees(sample(InputChannel::ElPosition)?, unit);
        let power_on = sample(InputChannel::PowerSense)? > POWER_ON_THRESHOLD_V;

        self.state = RotatorState {
            az_deg: Some(az),
            el_deg: Some(el),
            power_on,
        };
        Ok((az, el, power_on))
    }

    /// Stop every output. Idempotent.
    pub fn stop_motion(&mut self) -> Result<(), RotatorError> {
        for channel in ALL_OUTPUTS {
            self.write(channel, Drive::Stop)?;
        }
        Ok(())
    }

    pub fn stop_az_motion(&mut self) -> Result<(), RotatorError> {
        self.write(OutputChannel::AzLeft, Drive::Stop)?;
        self.write(OutputChannel::AzRight, Drive::Stop)
    }

    pub fn stop_el_motion(&mut self) -> Result<(), RotatorError> {
        self.write(OutputChannel::ElUp, Drive::Stop)?;
        self.write(OutputChannel::ElDown, Drive::Stop)
    }

    /// Start azimuth travel toward larger angles. The opposing channel is
    /// stopped first so both drives are never energized at once.
    pub fn move_az_right(&mut self) -> Result<(), RotatorError> {
        self.write(OutputChannel::AzLeft, Drive::Stop)?;
        self.write(OutputChannel::AzRight, Drive::Move)
    }

    pub fn move_az_left(&mut self) -> Result<(), RotatorError> {
        self.write(OutputChannel::AzRight, Drive::Stop)?;
        self.write(OutputChannel::AzLeft, Drive::Move)
    }

    pub fn move_el_up(&mut self) -> Result<(), RotatorError> {
        self.write(OutputChannel::ElDown, Drive::Stop)?;
        self.write(OutputChannel::ElUp, Drive::Move)
    }

    pub fn move_el_down(&mut self) -> Result<(), RotatorError> {
        self.write(OutputChannel::ElUp, Drive::Stop)?;
        self.write(OutputChannel::ElDown, Drive::Move)
    }

    /// Drive both axes to the target and block until they arrive.
    ///
    /// Power and range preconditions are checked against a fresh sensor poll
    /// before anything is actuated. The seek then runs twice: the first pass
    /// routinely overshoots, the second corrects the residual. Every exit
    /// path out of a seek, including cancellation and the tick cap, drives
    /// all four outputs to stop before the result is reported.
    pub fn move_to(
        &mut self,
        target_az: f64,
        target_el: f64,
        cancel: &CancelToken,
    ) -> Result<(), RotatorError> {
        let (_, _, power_on) = match self.read_sensors() {
            Ok(reading) => reading,
            Err(e) => {
                // The motors may already be running from a jog command, so a
                // dead sensor still forces the full stop.
                self.best_effort_stop();
                return Err(e);
            }
        };
        if !power_on {
            return Err(RotatorError::PowerOff);
        }
        self.check_range("azimuth", target_az, |cal| &cal.az)?;
        self.check_range("elevation", target_el, |cal| &cal.el)?;

        for attempt in 1..=SEEK_TRIES {
            log::info!(
                "Move attempt {attempt} to az={target_az:.2} el={target_el:.2}"
            );
            let mut authority = MotorAuthority::new(self);
            authority.seek(target_az, target_el, cancel)?;
            authority.release()?;
        }

        let state = self.state;
        log::info!(
            "Azimuth target {target_az:.2} reached {:.2}, elevation target {target_el:.2} reached {:.2}",
            state.az_deg.unwrap_or(f64::NAN),
            state.el_deg.unwrap_or(f64::NAN),
        );
        Ok(())
    }

    fn check_range(
        &self,
        axis: &'static str,
        target: f64,
        pick: impl Fn(&CalibrationModel) -> &crate::calibration::CalibrationAxis,
    ) -> Result<(), RotatorError> {
        let axis_cal = pick(&self.cal);
        if !axis_cal.contains(target) {
            return Err(RotatorError::OutOfRange {
                axis,
                target,
                min: axis_cal.min_angle,
                max: axis_cal.max_angle,
            });
        }
        Ok(())
    }

    fn write(&mut self, channel: OutputChannel, drive: Drive) -> Result<(), RotatorError> {
        self.backend
            .write(channel, drive)
            .map_err(RotatorError::ActuatorWrite)
    }

    fn best_effort_stop(&mut self) {
        if let Err(e) = self.stop_motion() {
            log::error!("Fail-safe stop failed: {e}");
        }
    }
}

/// Scoped motor authority: constructed at the start of a seek, and its drop
/// handler drives every output to stop unless `release` already did so with
/// proper error reporting. Early returns and panics inside the seek can
/// therefore never leave a motor running.
struct MotorAuthority<'a, B: RotatorBackend> {
    ctl: &'a mut MotionController<B>,
    armed: bool,
}

impl<'a, B: RotatorBackend> MotorAuthority<'a, B> {
    fn new(ctl: &'a mut MotionController<B>) -> Self {
        Self { ctl, armed: true }
    }

    /// One convergence loop: pick each axis's direction from the latest
    /// reading, then tick until both axes sit in their deadband. Each tick
    /// commands both axes and ends with one batched sensor read.
    fn seek(
        &mut self,
        target_az: f64,
        target_el: f64,
        cancel: &CancelToken,
    ) -> Result<(), RotatorError> {
        let ctl = &mut *self.ctl;
        let (mut az, mut el, _) = ctl.read_sensors()?;

        let az_dir = if target_az < az {
            Direction::Decreasing
        } else {
            Direction::Increasing
        };
        let el_dir = if target_el < el {
            Direction::Decreasing
        } else {
            Direction::Increasing
        };

        let mut ticks = 0u32;
        while !(at_target(az, target_az, az_dir) && at_target(el, target_el, el_dir)) {
            if cancel.is_cancelled() {
                return Err(RotatorError::Cancelled);
            }
            if ticks >= ctl.max_seek_ticks {
                return Err(RotatorError::SeekTimeout(ctl.max_seek_ticks));
            }
            ticks += 1;

            if at_target(az, target_az, az_dir) {
                ctl.stop_az_motion()?;
            } else {
                match az_dir {
                    Direction::Increasing => ctl.move_az_right()?,
                    Direction::Decreasing => ctl.move_az_left()?,
                }
            }

            if at_target(el, target_el, el_dir) {
                ctl.stop_el_motion()?;
            } else {
                match el_dir {
                    Direction::Increasing => ctl.move_el_up()?,
                    Direction::Decreasing => ctl.move_el_down()?,
                }
            }

            (az, el, _) = ctl.read_sensors()?;
        }

        Ok(())
    }

    /// Normal-path stop with error reporting; disarms the drop handler.
    fn release(mut self) -> Result<(), RotatorError> {
        self.armed = false;
        self.ctl.stop_motion()
    }
}

impl<B: RotatorBackend> Drop for MotorAuthority<'_, B> {
    fn drop(&mut self) {
        if self.armed {
            self.ctl.best_effort_stop();
        }
    }
}
