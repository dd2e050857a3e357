//! Initialization protocol and learned-parameter tests against a scripted
//! fake bus.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{self, I2c, Operation};

use max17055_ez::regs::{self, Register};
use max17055_ez::{CellConfig, Error, LearnedParams, Max17055, ModelId};

use std::collections::HashMap;

struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

/// Register-level simulation of the gauge: a u16 map keyed by register
/// address, a log of every write, and scripted clearing of the self-clearing
/// bits the init sequence polls.
#[derive(Default)]
struct FakeGauge {
    regs: HashMap<u8, u16>,
    writes: Vec<(u8, u16)>,
    /// Number of ModelCfg reads after which the refresh bit reads as
    /// cleared; `None` keeps it set forever.
    refresh_clears_after: Option<u32>,
    model_cfg_reads: u32,
    /// Same scripting for FStat.DNR.
    dnr_clears_after: Option<u32>,
    fstat_reads: u32,
    fail: bool,
}

impl FakeGauge {
    fn with_regs(values: &[(Register, u16)]) -> Self {
        let mut fake = Self::default();
        for &(reg, val) in values {
            fake.regs.insert(reg as u8, val);
        }
        fake
    }

    fn reg(&self, reg: Register) -> u16 {
        *self.regs.get(&(reg as u8)).unwrap_or(&0)
    }

    fn writes_to(&self, reg: Register) -> Vec<u16> {
        self.writes
            .iter()
            .filter(|(addr, _)| *addr == reg as u8)
            .map(|&(_, val)| val)
            .collect()
    }

    fn read_reg(&mut self, addr: u8) -> u16 {
        let val = *self.regs.get(&addr).unwrap_or(&0);
        if addr == Register::ModelCfg as u8 && val & regs::MODELCFG_REFRESH != 0 {
            self.model_cfg_reads += 1;
            if let Some(n) = self.refresh_clears_after {
                if self.model_cfg_reads >= n {
                    let cleared = val & !regs::MODELCFG_REFRESH;
                    self.regs.insert(addr, cleared);
                    return cleared;
                }
            }
        }
        if addr == Register::FStat as u8 && val & regs::FSTAT_DNR != 0 {
            self.fstat_reads += 1;
            if let Some(n) = self.dnr_clears_after {
                if self.fstat_reads >= n {
                    let cleared = val & !regs::FSTAT_DNR;
                    self.regs.insert(addr, cleared);
                    return cleared;
                }
            }
        }
        val
    }
}

impl i2c::ErrorType for FakeGauge {
    type Error = i2c::ErrorKind;
}

impl I2c for FakeGauge {
    fn transaction(
        &mut self,
        _address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if self.fail {
            return Err(i2c::ErrorKind::Other);
        }
        let mut selected = None;
        for op in operations {
            match op {
                Operation::Write(bytes) => match bytes.len() {
                    1 => selected = Some(bytes[0]),
                    3 => {
                        let val = u16::from_le_bytes([bytes[1], bytes[2]]);
                        self.regs.insert(bytes[0], val);
                        self.writes.push((bytes[0], val));
                    }
                    n => panic!("unexpected write length {n}"),
                },
                Operation::Read(buf) => {
                    let addr = selected.take().expect("read without register select");
                    let val = self.read_reg(addr);
                    buf.copy_from_slice(&val.to_le_bytes());
                }
            }
        }
        Ok(())
    }
}

fn test_config() -> CellConfig {
    CellConfig {
        design_capacity_mah: 3000,
        v_empty: 300,
        v_recovery: 344,
        model: ModelId::Generic,
        high_charge_voltage: false,
        sense_resistor: 0.01,
    }
}

#[test]
fn init_after_por_loads_ez_config() {
    let mut fake = FakeGauge::with_regs(&[
        (Register::Status, regs::STATUS_POR),
        (Register::HibCfg, 0x890C),
    ]);
    // Refresh clears on the second poll of ModelCfg.
    fake.refresh_clears_after = Some(2);

    let mut gauge = Max17055::new(fake);
    let mut delay = NoDelay;

    let por = gauge.init(&mut delay, &test_config()).unwrap();
    assert!(por);

    let fake = gauge.release();

    // DesignCap: 3000 mAh at 0.5 mAh/LSB.
    assert_eq!(fake.writes_to(Register::DesignCap), vec![6000]);
    assert_eq!(fake.writes_to(Register::DQAcc), vec![3000 / 16]);
    assert_eq!(
        fake.writes_to(Register::VEmpty),
        vec![regs::pack_vempty(300, 344)]
    );
    assert_eq!(fake.writes_to(Register::ModelCfg), vec![0x8000]);

    // Hibernation exit, then HibCfg restored once the model loaded.
    assert_eq!(fake.writes_to(Register::Command), vec![0x0090, 0x0000]);
    assert_eq!(fake.writes_to(Register::HibCfg), vec![0x0000, 0x890C]);
    assert_eq!(fake.reg(Register::HibCfg), 0x890C);

    // POR acknowledged.
    assert_eq!(fake.reg(Register::Status) & regs::STATUS_POR, 0);
}

#[test]
fn init_without_por_is_a_no_op() {
    let fake = FakeGauge::with_regs(&[(Register::Status, 0)]);
    let mut gauge = Max17055::new(fake);
    let mut delay = NoDelay;

    let por = gauge.init(&mut delay, &test_config()).unwrap();
    assert!(!por);

    // The fast path issues no writes at all.
    let fake = gauge.release();
    assert!(fake.writes.is_empty());
}

#[test]
fn init_waits_for_settling_before_configuring() {
    let mut fake = FakeGauge::with_regs(&[
        (Register::Status, regs::STATUS_POR),
        (Register::FStat, regs::FSTAT_DNR),
    ]);
    fake.dnr_clears_after = Some(3);
    fake.refresh_clears_after = Some(1);

    let mut gauge = Max17055::new(fake);
    let mut delay = NoDelay;

    let por = gauge.init(&mut delay, &test_config()).unwrap();
    assert!(por);

    let fake = gauge.release();
    // The poll loop kept reading FStat until DNR cleared, and no register
    // was written before that.
    assert_eq!(fake.fstat_reads, 3);
    assert_eq!(fake.writes[0].0, Register::Command as u8);
}

#[test]
fn stuck_model_refresh_fails_and_keeps_por() {
    let mut fake = FakeGauge::with_regs(&[
        (Register::Status, regs::STATUS_POR),
        (Register::HibCfg, 0x890C),
    ]);
    fake.refresh_clears_after = None;

    let mut gauge = Max17055::new(fake);
    let mut delay = NoDelay;

    let err = gauge.init(&mut delay, &test_config()).unwrap_err();
    assert_eq!(err, Error::ModelRefreshTimeout);

    // Configuration is not marked complete: POR stays set and HibCfg was
    // not restored.
    let fake = gauge.release();
    assert_ne!(fake.reg(Register::Status) & regs::STATUS_POR, 0);
    assert_eq!(fake.writes_to(Register::HibCfg), vec![0x0000]);
}

#[test]
fn learned_parameters_round_trip() {
    let fake = FakeGauge::with_regs(&[
        (Register::RComp0, 0x0055),
        (Register::TempCo, 0x1234),
        (Register::FullCapRep, 0x1770),
        (Register::Cycles, 0x0123),
        (Register::FullCapNom, 0x1790),
        (Register::MixSoc, 0x6400),
    ]);
    let mut gauge = Max17055::new(fake);
    let mut delay = NoDelay;

    let params = gauge.learned_parameters().unwrap();
    assert_eq!(
        params,
        LearnedParams {
            rcomp0: 0x0055,
            temp_co: 0x1234,
            full_cap_rep: 0x1770,
            cycles: 0x0123,
            full_cap_nom: 0x1790,
        }
    );

    gauge.restore_learned_parameters(&mut delay, &params).unwrap();

    let fake = gauge.release();
    assert_eq!(fake.reg(Register::RComp0), 0x0055);
    assert_eq!(fake.reg(Register::TempCo), 0x1234);
    assert_eq!(fake.reg(Register::FullCapRep), 0x1770);
    assert_eq!(fake.reg(Register::Cycles), 0x0123);
    assert_eq!(fake.reg(Register::FullCapNom), 0x1790);

    // The accumulators are re-seeded from the restored bundle.
    assert_eq!(fake.reg(Register::DPAcc), regs::DPACC_200_PCT);
    assert_eq!(fake.reg(Register::DQAcc), 0x1790 / 16);
    // MixCap = MixSoc * FullCapNom / 25600; at 100 % SOC it equals
    // FullCapNom.
    assert_eq!(fake.reg(Register::MixCap), 0x1790);
}

#[test]
fn getters_apply_conversions() {
    let fake = FakeGauge::with_regs(&[
        (Register::RepSoc, 0x6400),
        (Register::VCell, 51200),
        (Register::Current, 0xFFFF),
        (Register::Status, 0),
    ]);
    let mut gauge = Max17055::new(fake);
    gauge.set_resist_sensor(0.01);

    assert_eq!(gauge.soc().unwrap(), 100.0);
    assert!((gauge.voltage().unwrap() - 4.0).abs() < 1e-4);
    assert!((gauge.current().unwrap() + 0.15625).abs() < 1e-4);
    // BST clear means a battery is present.
    assert!(gauge.present().unwrap());
}

#[test]
fn empty_voltage_round_trip() {
    let fake = FakeGauge::default();
    let mut gauge = Max17055::new(fake);

    gauge.set_empty_voltage(330, 360).unwrap();
    assert_eq!(gauge.empty_voltage().unwrap(), (330, 360));
}

#[test]
fn soc_hold_round_trip() {
    let fake = FakeGauge::with_regs(&[(Register::SocHold, 0xABE0)]);
    let mut gauge = Max17055::new(fake);

    gauge.set_empty_soc_hold(7.5).unwrap();
    assert_eq!(gauge.empty_soc_hold().unwrap(), 7.5);

    // Bits outside the empty-hold field are preserved.
    let fake = gauge.release();
    assert_eq!(fake.reg(Register::SocHold) & !regs::SOCHOLD_EMPTY_MASK, 0xABE0);
}

#[test]
fn bus_errors_propagate_unchanged() {
    let mut fake = FakeGauge::default();
    fake.fail = true;
    let mut gauge = Max17055::new(fake);
    let mut delay = NoDelay;

    assert_eq!(gauge.soc(), Err(Error::I2c(i2c::ErrorKind::Other)));
    assert_eq!(
        gauge.init(&mut delay, &test_config()),
        Err(Error::I2c(i2c::ErrorKind::Other))
    );
}
