use std::collections::HashMap;
use std::error::Error;
use std::path::Path;

use cdx_storage::{
    CdxFile, CdxReader, Component, ComponentTypes, ContinuousDelayConfig, ContinuousDelayReader,
    ContinuousDelayWriter, DelayType, DiscreteDelayReader, Parameters, StorageError, Window,
};
use num_complex::Complex64;
use proptest::prelude::*;
use tempfile::tempdir;

fn parameters(cir_rate_hz: f64) -> Parameters {
    Parameters {
        c0_m_s: 299_792_458.0,
        cir_rate_hz,
        transmitter_frequency_hz: 1.51e9,
    }
}

fn los_scatterer() -> ComponentTypes {
    ComponentTypes::new().with(0, "LOS").with(1, "scatterer")
}

type LinkMaps = (HashMap<String, Vec<Component>>, HashMap<String, f64>);

fn single_link(link: &str, cir: Vec<Component>, reference_delay: f64) -> LinkMaps {
    (
        HashMap::from([(link.to_string(), cir)]),
        HashMap::from([(link.to_string(), reference_delay)]),
    )
}

/// 500 CIRs at 100 Hz, each a single unit LOS component at delay 0
fn write_scenario(path: &Path) -> Result<(), Box<dyn Error>> {
    let config = ContinuousDelayConfig::new(parameters(100.0)).with_link("sat0", los_scatterer());
    let mut writer = ContinuousDelayWriter::create(path, config)?;
    for n in 0..500u64 {
        let (cirs, refs) = single_link(
            "sat0",
            vec![Component::new(0, n, 0.0, Complex64::new(1.0, 0.0))],
            0.0,
        );
        writer.append_cir(&cirs, &refs)?;
    }
    writer.close()?;
    Ok(())
}

#[test]
fn end_to_end_scenario() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let path = tmp.path().join("scenario.cdx");
    write_scenario(&path)?;

    let reader = ContinuousDelayReader::open(&path)?;
    assert_eq!(reader.nof_cirs(), 500);
    assert_eq!(reader.nof_links(), 1);
    assert_eq!(reader.cir_rate_hz(), 100.0);
    assert_eq!(reader.length_s(), 5.0);

    let power = reader.compute_power("sat0", Window::new(0.0, 0.0))?;
    assert_eq!(power.len(), 500);
    assert!(power.values.iter().all(|&p| p == 1.0));

    let spread = reader.compute_multipath_spread("sat0", Window::full())?;
    assert!(spread.values.iter().all(|&s| s == 0.0));

    let count = reader.compute_nof_components("sat0", Window::full())?;
    assert!(count.values.iter().all(|&c| c == 1.0));
    Ok(())
}

#[test]
fn windowing_equivalence() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let path = tmp.path().join("window.cdx");
    write_scenario(&path)?;
    let reader = ContinuousDelayReader::open(&path)?;

    let to_end = reader.compute_power("sat0", Window::new(0.0, 0.0))?;
    let explicit = reader.compute_power("sat0", Window::new(0.0, reader.length_s()))?;
    assert_eq!(to_end, explicit);

    let tail = reader.compute_power("sat0", Window::from_start(1.0))?;
    assert_eq!(tail.len(), 400);
    assert_eq!(tail.times[0], 1.0);
    assert_eq!(tail.values[..], to_end.values[100..]);
    Ok(())
}

#[test]
fn range_boundary() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let path = tmp.path().join("range.cdx");
    write_scenario(&path)?;
    let reader = ContinuousDelayReader::open(&path)?;

    assert!(reader.compute_power("sat0", Window::new(0.0, 5.0)).is_ok());
    assert!(reader.compute_power("sat0", Window::new(4.0, 1.0)).is_ok());

    let one_beyond = 5.0 + 1.0 / 100.0;
    let err = reader
        .compute_power("sat0", Window::new(0.0, one_beyond))
        .unwrap_err();
    assert!(matches!(err, StorageError::Range { .. }));
    assert!(err.to_string().contains("5"));
    Ok(())
}

#[test]
fn registry_enforcement_keeps_count() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let path = tmp.path().join("registry.cdx");
    let config = ContinuousDelayConfig::new(parameters(10.0)).with_link("sat0", los_scatterer());
    let mut writer = ContinuousDelayWriter::create(&path, config)?;

    let (cirs, refs) = single_link("sat0", vec![Component::new(1, 0, 1e-9, Complex64::new(0.5, 0.0))], 0.1);
    writer.append_cir(&cirs, &refs)?;

    let (cirs, refs) = single_link(
        "sat0",
        vec![
            Component::new(0, 0, 0.0, Complex64::new(1.0, 0.0)),
            Component::new(42, 1, 0.0, Complex64::new(1.0, 0.0)),
        ],
        0.1,
    );
    let err = writer.append_cir(&cirs, &refs).unwrap_err();
    assert!(matches!(err, StorageError::Integrity { ref link, .. } if link == "sat0"));
    assert_eq!(writer.nof_cirs(), 1);
    writer.close()?;

    let reader = ContinuousDelayReader::open(&path)?;
    assert_eq!(reader.nof_cirs(), 1);
    assert_eq!(reader.get_cir("sat0", 0)?.types(), vec![1]);
    Ok(())
}

#[test]
fn multiple_links_and_unified_open() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let path = tmp.path().join("links.cdx");
    let config = ContinuousDelayConfig::new(parameters(10.0))
        .with_link("sat0", los_scatterer())
        .with_link("sat1", ComponentTypes::new().with(256, "ground"));
    let mut writer = ContinuousDelayWriter::create(&path, config)?;
    for n in 0..3u64 {
        let cirs = HashMap::from([
            ("sat0".to_string(), vec![Component::new(0, n, 0.0, Complex64::new(1.0, 0.0))]),
            ("sat1".to_string(), Vec::new()),
        ]);
        let refs = HashMap::from([("sat0".to_string(), 0.07), ("sat1".to_string(), 0.08 + n as f64)]);
        writer.append_cir(&cirs, &refs)?;
    }
    writer.close()?;
    // Second close has no effect.
    writer.close()?;

    let mut file = CdxFile::open(&path)?;
    assert_eq!(file.delay_type(), DelayType::ContinuousDelay);
    assert!(file.as_discrete().is_none());
    let reader = file.as_continuous().ok_or("expected continuous-delay file")?;
    assert_eq!(reader.link_names(), vec!["sat0".to_string(), "sat1".to_string()]);
    let expected: Vec<f64> = (0..3).map(|n| 0.08 + n as f64).collect();
    assert_eq!(reader.reference_delays("sat1")?, expected);

    // A CIR with zero components is not an error.
    let empty = reader.get_cir("sat1", 2)?;
    assert!(empty.is_empty());
    let spread = reader.compute_multipath_spread("sat1", Window::full())?;
    assert_eq!(spread.values, vec![0.0; 3]);
    assert_eq!(reader.min_max_amplitude("sat1")?, None);

    let split = reader.compute_los_and_multipath_components_powers("sat0", Window::full())?;
    assert_eq!(split.los, vec![1.0; 3]);
    assert_eq!(split.multipath, vec![0.0; 3]);

    file.reader_mut().close();
    file.reader_mut().close();
    assert!(file.reader().is_closed());
    Ok(())
}

#[test]
fn discrete_reader_rejects_continuous_file() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let path = tmp.path().join("mismatch.cdx");
    write_scenario(&path)?;

    let err = DiscreteDelayReader::open(&path).unwrap_err();
    assert!(matches!(
        err,
        StorageError::FormatMismatch {
            expected: DelayType::DiscreteDelay,
            found: DelayType::ContinuousDelay
        }
    ));
    Ok(())
}

#[test]
fn foreign_file_rejected() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let path = tmp.path().join("foreign.cdx");
    std::fs::write(&path, vec![0x89u8; 256])?;
    assert!(matches!(
        CdxFile::open(&path),
        Err(StorageError::InvalidMagic { .. })
    ));
    Ok(())
}

fn arb_component() -> impl Strategy<Value = Component> {
    (
        0u16..2,
        any::<u64>(),
        0.0f64..1e-6,
        -10.0f64..10.0,
        -10.0f64..10.0,
    )
        .prop_map(|(component_type, id, delay, re, im)| {
            Component::new(component_type, id, delay, Complex64::new(re, im))
        })
}

fn arb_cirs() -> impl Strategy<Value = Vec<(Vec<Component>, f64)>> {
    prop::collection::vec(
        (prop::collection::vec(arb_component(), 0..8), 0.0f64..0.2),
        1..20,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_get_cir_returns_what_was_appended(cirs in arb_cirs()) {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("prop.cdx");
        let config = ContinuousDelayConfig::new(parameters(50.0)).with_link("sat0", los_scatterer());
        let mut writer = ContinuousDelayWriter::create(&path, config).unwrap();
        for (components, reference_delay) in &cirs {
            let (c, r) = single_link("sat0", components.clone(), *reference_delay);
            writer.append_cir(&c, &r).unwrap();
        }
        writer.close().unwrap();

        let reader = ContinuousDelayReader::open(&path).unwrap();
        prop_assert_eq!(reader.nof_cirs(), cirs.len() as u64);
        for (n, (components, reference_delay)) in cirs.iter().enumerate() {
            let cir = reader.get_cir("sat0", n as u64).unwrap();
            prop_assert_eq!(&cir.components, components);
            prop_assert_eq!(cir.reference_delay, *reference_delay);
        }
    }

    #[test]
    fn prop_pdp_sums_to_one(
        cirs in arb_cirs(),
        lower_prob in 1e-9f64..1e-2,
        upper_prob in 1e-1f64..1e1,
    ) {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("pdp.cdx");
        let config = ContinuousDelayConfig::new(parameters(50.0)).with_link("sat0", los_scatterer());
        let mut writer = ContinuousDelayWriter::create(&path, config).unwrap();
        for (components, reference_delay) in &cirs {
            let (c, r) = single_link("sat0", components.clone(), *reference_delay);
            writer.append_cir(&c, &r).unwrap();
        }
        writer.close().unwrap();

        let reader = ContinuousDelayReader::open(&path).unwrap();
        let pdp = reader.compute_pdp("sat0", lower_prob, upper_prob).unwrap();
        prop_assert!((pdp.matrix.sum() - 1.0).abs() < 1e-9);
        prop_assert!(pdp.matrix.iter().all(|&p| p > 0.0));
        prop_assert_eq!(pdp.upper_prob, upper_prob);
    }
}
