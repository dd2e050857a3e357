//! Scaling between raw register values and physical units.
//!
//! Scale factors follow the MAX17055 standard register formats (AN6358,
//! figure 1.3). Capacity and current depend on the external sense resistor;
//! voltage, time and percentage are fixed.

/// Capacity LSB numerator: LSB(mAh) = 5e-3 / Rsense.
pub const CAPACITY_LSB_OHM_MAH: f32 = 5.0e-3;
/// Current LSB numerator: LSB(mA) = 1.5625e-3 / Rsense.
pub const CURRENT_LSB_OHM_MA: f32 = 1.5625e-3;
/// MaxMinCurr halves use a coarser LSB: 0.4 / Rsense mA.
pub const MAXMIN_CURRENT_LSB_OHM_MA: f32 = 0.4;
/// Voltage LSB in volts.
pub const VOLTAGE_LSB_V: f32 = 78.125e-6;
/// Time LSB: 5.625 s, expressed in hours.
pub const TIME_LSB_HOURS: f32 = 5.625 / 3600.0;
/// Percentage LSB (also the temperature LSB in °C).
pub const PERCENT_LSB: f32 = 1.0 / 256.0;

/// Per-instance scale factors derived from the sense resistor.
///
/// The resistance-dependent factors are only ever recomputed together, so
/// they cannot get out of step with the stored resistor value.
#[derive(Copy, Clone, Debug)]
pub struct ConversionProfile {
    resist_sensor: f32,
    capacity_lsb_mah: f32,
    current_lsb_ma: f32,
}

impl ConversionProfile {
    pub fn new(resist_sensor: f32) -> Self {
        Self {
            resist_sensor,
            capacity_lsb_mah: CAPACITY_LSB_OHM_MAH / resist_sensor,
            current_lsb_ma: CURRENT_LSB_OHM_MA / resist_sensor,
        }
    }

    /// Replace the sense resistor value, rederiving the dependent factors.
    pub fn set_resist_sensor(&mut self, resist_sensor: f32) {
        *self = Self::new(resist_sensor);
    }

    pub fn resist_sensor(&self) -> f32 {
        self.resist_sensor
    }

    pub fn capacity_lsb_mah(&self) -> f32 {
        self.capacity_lsb_mah
    }

    pub fn current_lsb_ma(&self) -> f32 {
        self.current_lsb_ma
    }

    /// Capacity register value to mAh.
    pub fn capacity_mah(&self, raw: u16) -> f32 {
        raw as f32 * self.capacity_lsb_mah
    }

    /// mAh to capacity register value.
    pub fn capacity_raw(&self, mah: f32) -> u16 {
        (mah / self.capacity_lsb_mah) as u16
    }

    /// Current register value (signed) to mA. Positive is charging.
    pub fn current_ma(&self, raw: u16) -> f32 {
        raw as i16 as f32 * self.current_lsb_ma
    }

    /// mA to current register value (signed).
    pub fn current_raw(&self, ma: f32) -> u16 {
        (ma / self.current_lsb_ma) as i16 as u16
    }

    /// One signed byte of MaxMinCurr to mA.
    pub fn maxmin_current_ma(&self, raw: i8) -> f32 {
        raw as f32 * (MAXMIN_CURRENT_LSB_OHM_MA / self.resist_sensor)
    }

    /// Voltage register value to volts.
    pub fn voltage_v(&self, raw: u16) -> f32 {
        raw as f32 * VOLTAGE_LSB_V
    }

    /// Time register value to hours.
    pub fn time_hours(&self, raw: u16) -> f32 {
        raw as f32 * TIME_LSB_HOURS
    }

    /// Percentage register value to percent.
    pub fn percent(&self, raw: u16) -> f32 {
        raw as f32 * PERCENT_LSB
    }

    /// Temperature register value (signed) to °C.
    pub fn temperature_c(&self, raw: u16) -> f32 {
        raw as i16 as f32 * PERCENT_LSB
    }
}

impl Default for ConversionProfile {
    fn default() -> Self {
        Self::new(crate::device::DEFAULT_RSENSE_OHMS)
    }
}
