//! Register addresses and bit masks for the MAX17055.
//!
//! Addresses and field layouts follow the datasheet and the standard
//! register formats of AN6358; they are the binary contract with the chip.

use crate::types::ModelId;

/// Default 7-bit I²C address.
pub const I2C_ADDR: u8 = 0x36;

/// Register address table.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    /// Alert, reset and battery-insertion flags.
    Status = 0x00,
    /// Reported remaining capacity.
    RepCap = 0x05,
    /// Reported state of charge.
    RepSoc = 0x06,
    /// Capacity relative to the original design capacity, in percent.
    Age = 0x07,
    /// Die temperature.
    Temp = 0x08,
    /// Voltage between BATT and CSP.
    VCell = 0x09,
    /// Instantaneous current (voltage across the sense resistor).
    Current = 0x0A,
    /// Average of Current readings.
    AvgCurrent = 0x0B,
    /// Mixed (coulomb count + OCV) state of charge.
    MixSoc = 0x0D,
    /// Mixed remaining capacity.
    MixCap = 0x0F,
    FullCapRep = 0x10,
    /// Time to empty.
    Tte = 0x11,
    /// Cycle odometer, 1 % of a full cycle per LSB.
    Cycles = 0x17,
    DesignCap = 0x18,
    /// Average of VCell readings.
    AvgVCell = 0x19,
    /// Max (high byte) and min (low byte) current since last reset.
    MaxMinCurr = 0x1C,
    /// End-of-charge detection current.
    IchgTerm = 0x1E,
    FullCapNom = 0x23,
    /// Averaging periods for the A/D readings and SOC mixing.
    FilterCfg = 0x29,
    RComp0 = 0x38,
    TempCo = 0x39,
    /// Empty and recovery voltage thresholds, packed.
    VEmpty = 0x3A,
    FStat = 0x3D,
    DQAcc = 0x45,
    DPAcc = 0x46,
    /// Command register (soft wakeup).
    Command = 0x60,
    HibCfg = 0xBA,
    /// Empty/full SOC hold thresholds.
    SocHold = 0xD3,
    /// Battery characterization and model reload.
    ModelCfg = 0xDB,
}

// Status bits
pub const STATUS_POR: u16 = 1 << 1;
pub const STATUS_BST: u16 = 1 << 3; // 1 = battery absent

// FStat bits
pub const FSTAT_DNR: u16 = 1 << 0; // data not ready after reset

// ModelCfg bits
pub const MODELCFG_REFRESH: u16 = 1 << 15;
pub const MODELCFG_VCHG: u16 = 1 << 10;
pub const MODELCFG_ID_MASK: u16 = 0x00F0;

// VEmpty fields: VE in bits 15:7 (10 mV/LSB), VR in bits 6:0 (40 mV/LSB)
pub const VEMPTY_VE_MASK: u16 = 0xFF80;
pub const VEMPTY_VE_SHIFT: u8 = 7;
pub const VEMPTY_VR_MASK: u16 = 0x007F;

// SocHold: empty hold threshold in bits 4:0, 0.5 %/LSB
pub const SOCHOLD_EMPTY_MASK: u16 = 0x001F;

// Command register soft-wakeup sequence
pub const CMD_SOFT_WAKEUP: u16 = 0x0090;
pub const CMD_CLEAR: u16 = 0x0000;

/// dPAcc code for 200 % of capacity, used when restoring learned state.
pub const DPACC_200_PCT: u16 = 0x0C80;

/// MaxMinCurr reset value (min = +127 LSB, max = -128 LSB).
pub const MAXMIN_RESET: u16 = 0x807F;

/// Pack VEmpty from the empty and recovery thresholds, both in 10 mV units.
///
/// VR is stored at 40 mV resolution, so the low two bits of `v_recovery`
/// are dropped.
#[inline]
pub fn pack_vempty(v_empty: u16, v_recovery: u16) -> u16 {
    let ve = ((v_empty as u32) << VEMPTY_VE_SHIFT) as u16 & VEMPTY_VE_MASK;
    ve | ((v_recovery >> 2) & VEMPTY_VR_MASK)
}

/// Split a VEmpty value back into `(v_empty, v_recovery)`, both in 10 mV units.
#[inline]
pub fn unpack_vempty(reg: u16) -> (u16, u16) {
    let ve = (reg & VEMPTY_VE_MASK) >> VEMPTY_VE_SHIFT;
    let vr = (reg & VEMPTY_VR_MASK) << 2;
    (ve, vr)
}

/// Build the ModelCfg word: refresh request, optional high-charge-voltage
/// flag, and the model identifier nibble.
#[inline]
pub fn pack_model_cfg(high_charge_voltage: bool, model: ModelId) -> u16 {
    let mut val = MODELCFG_REFRESH;
    if high_charge_voltage {
        val |= MODELCFG_VCHG;
    }
    val | (model as u16 & MODELCFG_ID_MASK)
}
