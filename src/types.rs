//! Public types: driver error, model selection, cell configuration and the
//! learned-parameter bundle.

/// Driver error.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Underlying I²C transport failure.
    I2c(E),
    /// ModelCfg.Refresh did not clear within the bounded poll. The gauge is
    /// possibly unconfigured and must not be used for measurement until
    /// `init` succeeds; the POR bit is left set so a retry reconfigures.
    ModelRefreshTimeout,
}

/// Battery chemistry selector, placed in the upper nibble of ModelCfg's
/// low byte.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModelId {
    /// Most lithium chemistries.
    Generic = 0x00,
    /// Lithium NCR/NCA cells.
    NcrNca = 0x20,
    /// LiFePO4 cells.
    LiFePo4 = 0x60,
}

/// Battery-matched EZ configuration, applied by `init` after a power-on
/// reset.
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CellConfig {
    /// Design capacity in mAh.
    pub design_capacity_mah: u16,
    /// Empty voltage threshold in 10 mV units (330 = 3.3 V).
    pub v_empty: u16,
    /// Recovery voltage threshold in 10 mV units. Stored at 40 mV
    /// resolution, so the value floors to a multiple of 4.
    pub v_recovery: u16,
    /// Chemistry model to load.
    pub model: ModelId,
    /// Set when the charge voltage is above 4.275 V.
    pub high_charge_voltage: bool,
    /// External sense resistor in ohms.
    pub sense_resistor: f32,
}

/// The five parameters the ModelGauge algorithm learns over battery life.
///
/// Persist and restore these as one unit; the algorithm assumes they are
/// mutually consistent. Saving a snapshot each time bit 6 of the Cycles
/// register toggles is recommended.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LearnedParams {
    pub rcomp0: u16,
    pub temp_co: u16,
    pub full_cap_rep: u16,
    pub cycles: u16,
    pub full_cap_nom: u16,
}
