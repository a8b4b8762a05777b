use std::path::Path;

use thiserror::Error;

/// Threshold for the power-sense input. The G-5500 control box feeds roughly
/// 5 V through a divider when switched on, so anything above half scale
/// counts as powered.
pub const POWER_ON_THRESHOLD_V: f64 = 2.5;

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("calibration line {line}: {message}")]
    Format { line: usize, message: String },
    #[error("missing {0} line in calibration data")]
    MissingAxis(&'static str),
    #[error("{axis} axis: {message}")]
    InvalidRange { axis: String, message: String },
}

/// Which unit system a raw sensor sample is expressed in. ADC-style backends
/// report voltages, counter-style backends report counts; the calibration
/// file carries both mappings and they must agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawUnit {
    Voltage,
    Count,
}

/// Linear mapping between raw sensor output and angle for one axis.
#[derive(Debug, Clone)]
pub struct CalibrationAxis {
    pub min_angle: f64,
    pub max_angle: f64,
    pub min_count: i64,
    pub max_count: i64,
    pub min_voltage: f64,
    pub max_voltage: f64,
}

impl CalibrationAxis {
    /// Parse one `Axis,MinAngle,MinCount,MinVoltage,MaxAngle,MaxCount,MaxVoltage`
    /// line. The axis label has already been matched by the caller.
    fn parse(line: &str, linenum: usize) -> Result<Self, CalibrationError> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != 7 {
            return Err(CalibrationError::Format {
                line: linenum,
                message: format!("wrong number of fields, should be 7: {line}"),
            });
        }

        let num = |ndx: usize| -> Result<f64, CalibrationError> {
            fields[ndx].parse().map_err(|_| CalibrationError::Format {
                line: linenum,
                message: format!("field {} is not a number: {}", ndx, fields[ndx]),
            })
        };
        let count = |ndx: usize| -> Result<i64, CalibrationError> {
            fields[ndx].parse().map_err(|_| CalibrationError::Format {
                line: linenum,
                message: format!("field {} is not an integer count: {}", ndx, fields[ndx]),
            })
        };

        let axis = Self {
            min_angle: num(1)?,
            min_count: count(2)?,
            min_voltage: num(3)?,
            max_angle: num(4)?,
            max_count: count(5)?,
            max_voltage: num(6)?,
        };
        axis.validate(fields[0])?;
        Ok(axis)
    }

    fn validate(&self, name: &str) -> Result<(), CalibrationError> {
        let err = |message: &str| CalibrationError::InvalidRange {
            axis: name.to_string(),
            message: message.to_string(),
        };
        if self.min_angle >= self.max_angle {
            return Err(err("min angle must be below max angle"));
        }
        if self.min_count > self.max_count {
            return Err(err("min count must not exceed max count"));
        }
        if self.min_voltage >= self.max_voltage {
            return Err(err("min voltage must be below max voltage"));
        }
        Ok(())
    }

    pub fn voltage_to_degrees(&self, voltage: f64) -> f64 {
        (voltage - self.min_voltage) * (self.max_angle - self.min_angle)
            / (self.max_voltage - self.min_voltage)
            + self.min_angle
    }

    pub fn count_to_degrees(&self, count: f64) -> f64 {
        (count - self.min_count as f64) * (self.max_angle - self.min_angle)
            / (self.max_count - self.min_count) as f64
            + self.min_angle
    }

    pub fn raw_to_degrees(&self, raw: f64, unit: RawUnit) -> f64 {
        match unit {
            RawUnit::Voltage => self.voltage_to_degrees(raw),
            RawUnit::Count => self.count_to_degrees(raw),
        }
    }

    /// True if `angle` lies inside the calibrated travel of this axis.
    pub fn contains(&self, angle: f64) -> bool {
        self.min_angle <= angle && angle <= self.max_angle
    }
}

/// Calibration for both rotator axes. Built once at startup and shared by
/// reference; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct CalibrationModel {
    pub az: CalibrationAxis,
    pub el: CalibrationAxis,
}

impl CalibrationModel {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CalibrationError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    pub fn from_str(content: &str) -> Result<Self, CalibrationError> {
        let mut az = None;
        let mut el = None;

        for (ndx, raw_line) in content.lines().enumerate() {
            let linenum = ndx + 1;
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.starts_with("Az") {
                az = Some(CalibrationAxis::parse(line, linenum)?);
            } else if line.starts_with("El") {
                el = Some(CalibrationAxis::parse(line, linenum)?);
            } else {
                return Err(CalibrationError::Format {
                    line: linenum,
                    message: format!("unrecognized contents: {line}"),
                });
            }
        }

        Ok(Self {
            az: az.ok_or(CalibrationError::MissingAxis("Az"))?,
            el: el.ok_or(CalibrationError::MissingAxis("El"))?,
        })
    }
}
