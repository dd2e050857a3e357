//! High-level driver API (blocking, owns the I²C device).

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::conv::ConversionProfile;
use crate::regs::*;
use crate::types::*;

/// Default external sense resistor in ohms.
pub const DEFAULT_RSENSE_OHMS: f32 = 0.01;

/// Delay between FStat and ModelCfg polls during `init`.
const POLL_INTERVAL_MS: u32 = 10;
/// Iteration bound for the ModelCfg refresh poll (model load takes well
/// under a second when the chip is healthy).
const MODEL_REFRESH_TRIES: u32 = 100;
/// Settling delay during learned-parameter restore.
const RESTORE_SETTLE_MS: u32 = 350;

/// MAX17055 blocking driver over I²C.
pub struct Max17055<I2C> {
    i2c: I2C,
    addr: u8,
    profile: ConversionProfile,
}

impl<I2C, E> Max17055<I2C>
where
    I2C: I2c<Error = E>,
{
    /// Create a driver instance using the default 7-bit address (0x36).
    ///
    /// The driver takes ownership of the I²C peripheral instance.
    pub fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, I2C_ADDR)
    }

    /// Create a driver instance using an explicit 7-bit address.
    pub fn with_address(i2c: I2C, addr: u8) -> Self {
        Self {
            i2c,
            addr,
            profile: ConversionProfile::new(DEFAULT_RSENSE_OHMS),
        }
    }

    /// Consume the driver and return the owned I²C peripheral.
    pub fn release(self) -> I2C {
        self.i2c
    }

    // ------------------ Register access ------------------

    /// Read a 16-bit register. One write-read transaction, LSB first.
    fn read_u16(&mut self, reg: Register) -> Result<u16, Error<E>> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.addr, &[reg as u8], &mut buf)
            .map_err(Error::I2c)?;
        Ok(u16::from_le_bytes(buf))
    }

    /// Write a 16-bit register. One write transaction, LSB first.
    fn write_u16(&mut self, reg: Register, val: u16) -> Result<(), Error<E>> {
        let bytes = val.to_le_bytes();
        self.i2c
            .write(self.addr, &[reg as u8, bytes[0], bytes[1]])
            .map_err(Error::I2c)
    }

    // ------------------ Initialization ------------------

    /// Run the power-up configuration sequence from the MAX17055 software
    /// implementation guide.
    ///
    /// Returns `Ok(true)` when a power-on reset was detected and the EZ
    /// model was loaded, `Ok(false)` when the gauge still held valid state
    /// and nothing was written. The fast path keeps re-running `init` after
    /// a warm boot from disturbing the learned parameters.
    ///
    /// After a genuine reset the caller should also restore a persisted
    /// [`LearnedParams`] snapshot, if one exists.
    pub fn init<D: DelayNs>(
        &mut self,
        delay: &mut D,
        config: &CellConfig,
    ) -> Result<bool, Error<E>> {
        self.profile.set_resist_sensor(config.sense_resistor);

        if !self.por()? {
            return Ok(false);
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("max17055: POR set, loading EZ config");

        // Do not touch configuration until the ADC conversions settle
        // (FStat.DNR == 0).
        while self.read_u16(Register::FStat)? & FSTAT_DNR != 0 {
            delay.delay_ms(POLL_INTERVAL_MS);
        }

        // Exit hibernation so the model load runs at full speed. The
        // original HibCfg is restored afterwards.
        let hib_cfg = self.read_u16(Register::HibCfg)?;
        self.write_u16(Register::Command, CMD_SOFT_WAKEUP)?;
        self.write_u16(Register::HibCfg, 0x0000)?;
        self.write_u16(Register::Command, CMD_CLEAR)?;

        // EZ config. IchgTerm is left at its default; chargers with a
        // non-standard termination current use `set_ichg_term`.
        self.set_design_capacity(config.design_capacity_mah)?;
        self.write_u16(Register::DQAcc, config.design_capacity_mah / 16)?;
        self.set_empty_voltage(config.v_empty, config.v_recovery)?;
        self.set_model_cfg(config.high_charge_voltage, config.model)?;

        // The gauge clears ModelCfg.Refresh once the model load completed.
        let mut tries = MODEL_REFRESH_TRIES;
        while self.read_u16(Register::ModelCfg)? & MODELCFG_REFRESH != 0 {
            tries -= 1;
            if tries == 0 {
                // POR stays set, so a retried init reconfigures from scratch.
                #[cfg(feature = "defmt")]
                defmt::warn!("max17055: ModelCfg.Refresh never cleared");
                return Err(Error::ModelRefreshTimeout);
            }
            delay.delay_ms(POLL_INTERVAL_MS);
        }

        self.write_u16(Register::HibCfg, hib_cfg)?;

        // Acknowledge the reset so later boots take the fast path.
        self.reset_por()?;

        #[cfg(feature = "defmt")]
        defmt::debug!("max17055: model load complete");

        Ok(true)
    }

    /// Power-on-reset flag: the gauge booted from a true power loss and
    /// needs reconfiguration.
    pub fn por(&mut self) -> Result<bool, Error<E>> {
        Ok(self.read_u16(Register::Status)? & STATUS_POR != 0)
    }

    /// Clear the POR bit without reconfiguring, for callers managing their
    /// own reset acknowledgement.
    pub fn reset_por(&mut self) -> Result<(), Error<E>> {
        let status = self.read_u16(Register::Status)?;
        self.write_u16(Register::Status, status & !STATUS_POR)
    }

    // ------------------ Learned parameters ------------------

    /// Read the five learned parameters as one bundle, for external
    /// persistence.
    pub fn learned_parameters(&mut self) -> Result<LearnedParams, Error<E>> {
        Ok(LearnedParams {
            rcomp0: self.read_u16(Register::RComp0)?,
            temp_co: self.read_u16(Register::TempCo)?,
            full_cap_rep: self.read_u16(Register::FullCapRep)?,
            cycles: self.read_u16(Register::Cycles)?,
            full_cap_nom: self.read_u16(Register::FullCapNom)?,
        })
    }

    /// Write a previously saved bundle back, re-seeding the mixing capacity
    /// and the dQ/dP accumulators so the algorithm resumes from the restored
    /// state. Restore all five together; partial restores leave the model
    /// inconsistent.
    pub fn restore_learned_parameters<D: DelayNs>(
        &mut self,
        delay: &mut D,
        params: &LearnedParams,
    ) -> Result<(), Error<E>> {
        self.write_u16(Register::RComp0, params.rcomp0)?;
        self.write_u16(Register::TempCo, params.temp_co)?;
        self.write_u16(Register::FullCapNom, params.full_cap_nom)?;

        delay.delay_ms(RESTORE_SETTLE_MS);

        let mix_soc = self.read_u16(Register::MixSoc)?;
        let mix_cap = ((mix_soc as u32 * params.full_cap_nom as u32) / 25600) as u16;
        self.write_u16(Register::MixCap, mix_cap)?;
        self.write_u16(Register::FullCapRep, params.full_cap_rep)?;

        // dQAcc/dPAcc at 200 % of the restored capacity.
        self.write_u16(Register::DPAcc, DPACC_200_PCT)?;
        self.write_u16(Register::DQAcc, params.full_cap_nom / 16)?;

        delay.delay_ms(RESTORE_SETTLE_MS);

        self.write_u16(Register::Cycles, params.cycles)
    }

    // ------------------ Measurements ------------------

    /// Reported state of charge in percent.
    pub fn soc(&mut self) -> Result<f32, Error<E>> {
        let raw = self.read_u16(Register::RepSoc)?;
        Ok(self.profile.percent(raw))
    }

    /// Reported remaining capacity in mAh.
    pub fn reported_capacity(&mut self) -> Result<f32, Error<E>> {
        let raw = self.read_u16(Register::RepCap)?;
        Ok(self.profile.capacity_mah(raw))
    }

    /// Programmed design capacity in mAh.
    pub fn design_capacity(&mut self) -> Result<f32, Error<E>> {
        let raw = self.read_u16(Register::DesignCap)?;
        Ok(self.profile.capacity_mah(raw))
    }

    pub fn set_design_capacity(&mut self, mah: u16) -> Result<(), Error<E>> {
        let raw = self.profile.capacity_raw(mah as f32);
        self.write_u16(Register::DesignCap, raw)
    }

    /// Instantaneous current in mA. Positive is charging.
    pub fn current(&mut self) -> Result<f32, Error<E>> {
        let raw = self.read_u16(Register::Current)?;
        Ok(self.profile.current_ma(raw))
    }

    /// Averaged current in mA. Positive is charging.
    pub fn average_current(&mut self) -> Result<f32, Error<E>> {
        let raw = self.read_u16(Register::AvgCurrent)?;
        Ok(self.profile.current_ma(raw))
    }

    /// Highest current since the last reset of MaxMinCurr, in mA.
    pub fn max_current(&mut self) -> Result<f32, Error<E>> {
        let raw = self.read_u16(Register::MaxMinCurr)?;
        Ok(self.profile.maxmin_current_ma((raw >> 8) as i8))
    }

    /// Lowest current since the last reset of MaxMinCurr, in mA.
    pub fn min_current(&mut self) -> Result<f32, Error<E>> {
        let raw = self.read_u16(Register::MaxMinCurr)?;
        Ok(self.profile.maxmin_current_ma((raw & 0x00FF) as i8))
    }

    pub fn reset_max_min_current(&mut self) -> Result<(), Error<E>> {
        self.write_u16(Register::MaxMinCurr, MAXMIN_RESET)
    }

    /// Cell voltage in volts.
    pub fn voltage(&mut self) -> Result<f32, Error<E>> {
        let raw = self.read_u16(Register::VCell)?;
        Ok(self.profile.voltage_v(raw))
    }

    /// Averaged cell voltage in volts.
    pub fn average_voltage(&mut self) -> Result<f32, Error<E>> {
        let raw = self.read_u16(Register::AvgVCell)?;
        Ok(self.profile.voltage_v(raw))
    }

    /// Estimated time to empty in hours.
    pub fn time_to_empty(&mut self) -> Result<f32, Error<E>> {
        let raw = self.read_u16(Register::Tte)?;
        Ok(self.profile.time_hours(raw))
    }

    /// Die temperature in °C.
    pub fn temperature(&mut self) -> Result<f32, Error<E>> {
        let raw = self.read_u16(Register::Temp)?;
        Ok(self.profile.temperature_c(raw))
    }

    /// Battery age in percent of the design capacity; 100 % is a new cell.
    pub fn age(&mut self) -> Result<f32, Error<E>> {
        let raw = self.read_u16(Register::Age)?;
        Ok(self.profile.percent(raw))
    }

    /// Cycle odometer, 1 % of a full cycle per LSB.
    pub fn cycles(&mut self) -> Result<u16, Error<E>> {
        self.read_u16(Register::Cycles)
    }

    /// Battery insertion indicator from Status.BST.
    pub fn present(&mut self) -> Result<bool, Error<E>> {
        Ok(self.read_u16(Register::Status)? & STATUS_BST == 0)
    }

    // ------------------ Thresholds and configuration ------------------

    /// Program the empty and recovery voltage thresholds, both in 10 mV
    /// units (recovery floors to 40 mV resolution).
    pub fn set_empty_voltage(&mut self, v_empty: u16, v_recovery: u16) -> Result<(), Error<E>> {
        self.write_u16(Register::VEmpty, pack_vempty(v_empty, v_recovery))
    }

    /// Read back the `(v_empty, v_recovery)` thresholds in 10 mV units.
    pub fn empty_voltage(&mut self) -> Result<(u16, u16), Error<E>> {
        Ok(unpack_vempty(self.read_u16(Register::VEmpty)?))
    }

    /// Request a model reload for the given chemistry. `init` polls the
    /// refresh bit afterwards; direct callers must do the same.
    pub fn set_model_cfg(&mut self, high_charge_voltage: bool, model: ModelId) -> Result<(), Error<E>> {
        self.write_u16(Register::ModelCfg, pack_model_cfg(high_charge_voltage, model))
    }

    /// Raw ModelCfg value, including the refresh bit.
    pub fn model_cfg(&mut self) -> Result<u16, Error<E>> {
        self.read_u16(Register::ModelCfg)
    }

    /// Hold the reported SOC at empty below the given percentage
    /// (0.5 % steps).
    pub fn set_empty_soc_hold(&mut self, percent: f32) -> Result<(), Error<E>> {
        let hold = self.read_u16(Register::SocHold)? & !SOCHOLD_EMPTY_MASK;
        let code = (percent * 2.0) as u16 & SOCHOLD_EMPTY_MASK;
        self.write_u16(Register::SocHold, hold | code)
    }

    pub fn empty_soc_hold(&mut self) -> Result<f32, Error<E>> {
        let code = self.read_u16(Register::SocHold)? & SOCHOLD_EMPTY_MASK;
        Ok(code as f32 / 2.0)
    }

    /// End-of-charge detection current in mA. Not touched by `init`.
    pub fn set_ichg_term(&mut self, ma: f32) -> Result<(), Error<E>> {
        let raw = self.profile.current_raw(ma);
        self.write_u16(Register::IchgTerm, raw)
    }

    pub fn ichg_term(&mut self) -> Result<f32, Error<E>> {
        let raw = self.read_u16(Register::IchgTerm)?;
        Ok(self.profile.current_ma(raw))
    }

    /// Raw FilterCfg access (A/D averaging periods). Not touched by `init`.
    pub fn set_filter_cfg(&mut self, val: u16) -> Result<(), Error<E>> {
        self.write_u16(Register::FilterCfg, val)
    }

    pub fn filter_cfg(&mut self) -> Result<u16, Error<E>> {
        self.read_u16(Register::FilterCfg)
    }

    /// Replace the sense resistor value; capacity and current scaling follow
    /// immediately.
    pub fn set_resist_sensor(&mut self, ohms: f32) {
        self.profile.set_resist_sensor(ohms);
    }

    pub fn resist_sensor(&self) -> f32 {
        self.profile.resist_sensor()
    }

    /// The active conversion profile.
    pub fn conversion_profile(&self) -> &ConversionProfile {
        &self.profile
    }
}
