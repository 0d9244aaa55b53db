use std::collections::HashMap;
use std::error::Error;
use std::path::Path;

use cdx_storage::{Component, ComponentTypes, ContinuousDelayConfig, ContinuousDelayWriter, Parameters};
use num_complex::Complex64;

pub const NOF_CIRS: u64 = 20;

/// 20 CIRs at 10 Hz on two links
///
/// sat0: unit LOS at 0 s and a 0.5 multipath scatterer (type 300) at 20 ns. sat1: a LOS of 2 at 0 s.
pub fn write_fixture(path: &Path) -> Result<(), Box<dyn Error>> {
    let config = ContinuousDelayConfig::new(Parameters {
        c0_m_s: 299_792_458.0,
        cir_rate_hz: 10.0,
        transmitter_frequency_hz: 1.57542e9,
    })
    .with_link("sat0", ComponentTypes::new().with(0, "LOS").with(300, "scatterer"))
    .with_link("sat1", ComponentTypes::new().with(0, "LOS"));

    let mut writer = ContinuousDelayWriter::create(path, config)?;
    for n in 0..NOF_CIRS {
        let cirs = HashMap::from([
            (
                "sat0".to_string(),
                vec![
                    Component::new(0, 0, 0.0, Complex64::new(1.0, 0.0)),
                    Component::new(300, n + 1, 20e-9, Complex64::new(0.0, 0.5)),
                ],
            ),
            (
                "sat1".to_string(),
                vec![Component::new(0, 0, 0.0, Complex64::new(2.0, 0.0))],
            ),
        ]);
        let refs = HashMap::from([("sat0".to_string(), 0.07), ("sat1".to_string(), 0.08)]);
        writer.append_cir(&cirs, &refs)?;
    }
    writer.close()?;
    Ok(())
}
