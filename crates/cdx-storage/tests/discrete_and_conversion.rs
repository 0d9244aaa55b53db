use std::collections::HashMap;
use std::error::Error;
use std::path::Path;

use cdx_storage::{
    convert_continuous_to_discrete, convert_with_progress, CdxFile, CdxReader, Component,
    ComponentTypes, ContinuousDelayConfig, ContinuousDelayReader, ContinuousDelayWriter,
    ConversionOptions, DelayType, DiscreteDelayConfig, DiscreteDelayReader, DiscreteDelayWriter,
    DiscreteLinkConfig, Parameters, StorageError, Window,
};
use num_complex::Complex64;
use tempfile::tempdir;

fn parameters() -> Parameters {
    Parameters {
        c0_m_s: 3e8,
        cir_rate_hz: 10.0,
        transmitter_frequency_hz: 1.57542e9,
    }
}

/// Two components per CIR on a 1 GHz delay grid: LOS at 10 ns, echo at 13 ns
fn write_continuous(path: &Path) -> Result<(), Box<dyn Error>> {
    let config = ContinuousDelayConfig::new(parameters())
        .with_link("sat0", ComponentTypes::new().with(0, "LOS").with(300, "echo"));
    let mut writer = ContinuousDelayWriter::create(path, config)?;
    for n in 0..6u64 {
        let cirs = HashMap::from([(
            "sat0".to_string(),
            vec![
                Component::new(0, 1, 10e-9, Complex64::new(1.0, 0.0)),
                Component::new(300, 2, 13e-9, Complex64::new(0.0, 0.5)),
            ],
        )]);
        let refs = HashMap::from([("sat0".to_string(), 0.07)]);
        writer.append_cir(&cirs, &refs)?;
    }
    writer.close()?;
    Ok(())
}

#[test]
fn discrete_file_roundtrip() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let path = tmp.path().join("grid.cdx");
    let config = DiscreteDelayConfig {
        parameters: parameters(),
        delay_smpl_freq_hz: 1e9,
        links: vec![DiscreteLinkConfig {
            name: "sat0".into(),
            nof_delay_samples: 3,
            min_delay_s: 0.0,
        }],
    };
    let mut writer = DiscreteDelayWriter::create(&path, config)?;
    for t in 0..10 {
        let column = [
            Complex64::new(t as f64, 0.0),
            Complex64::new(0.0, 1.0),
            Complex64::new(-1.0, 0.0),
        ];
        writer.append_snapshot("sat0", &column, 1e-3)?;
    }
    writer.close()?;

    let file = CdxFile::open(&path)?;
    assert_eq!(file.delay_type(), DelayType::DiscreteDelay);
    let reader = file.as_discrete().ok_or("expected discrete-delay file")?;
    assert_eq!(reader.nof_cirs(), 10);
    assert_eq!(reader.delays("sat0")?.len(), 3);

    let grid = reader.get_cirs("sat0", Window::full())?;
    assert_eq!(grid.amplitudes.dim(), (3, 10));
    assert_eq!(grid.amplitudes[[0, 7]], Complex64::new(7.0, 0.0));
    assert_eq!(grid.times.len(), 10);
    assert_eq!(grid.reference_delays, vec![1e-3; 10]);

    // |t - 1 + i|^2
    let power = reader.compute_power("sat0", Window::full())?;
    assert_eq!(power.values[0], 2.0);
    assert_eq!(power.values[3], 5.0);

    assert!(matches!(
        reader.get_cirs("sat0", Window::new(0.5, 0.6)),
        Err(StorageError::Range { .. })
    ));

    let empty = reader.delay_doppler_spectrum("sat0", Window::from_start(1.0))?;
    assert!(empty.is_empty());
    Ok(())
}

#[test]
fn conversion_places_components_on_grid() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let input = tmp.path().join("continuous.cdx");
    let output = tmp.path().join("discrete.cdx");
    write_continuous(&input)?;

    let reader = ContinuousDelayReader::open(&input)?;
    let mut options = ConversionOptions::new(1e9);
    options.delay_before_min_s = 2e-9;
    options.delay_after_max_s = 2e-9;
    let summary = convert_continuous_to_discrete(&reader, &output, &options)?;

    assert_eq!(summary.nof_cirs, 6);
    let link = &summary.links[0];
    assert_eq!(link.name, "sat0");
    assert!((link.min_delay_s - 10e-9).abs() < 1e-18);
    assert!((link.max_delay_s - 13e-9).abs() < 1e-18);
    // (13 + 2) - (10 - 2) ns at 1 GHz
    assert_eq!(link.nof_coeffs, 7);

    let discrete = DiscreteDelayReader::open(&output)?;
    assert_eq!(discrete.nof_cirs(), 6);
    assert_eq!(discrete.cir_rate_hz(), 10.0);
    assert_eq!(discrete.delay_smpl_freq_hz(), 1e9);
    let reference_delays = discrete.reference_delays("sat0")?;
    assert!((reference_delays[0] - (0.07 + 2e-9)).abs() < 1e-15);

    let grid = discrete.get_cirs("sat0", Window::full())?;
    assert_eq!(grid.amplitudes.dim(), (7, 6));
    // LOS lands on bin 2 (10 ns - min + 2 ns before), echo on bin 5.
    assert!((grid.amplitudes[[2, 0]] - Complex64::new(1.0, 0.0)).norm() < 1e-9);
    assert!((grid.amplitudes[[5, 0]] - Complex64::new(0.0, 0.5)).norm() < 1e-9);
    assert!(grid.amplitudes[[0, 0]].norm() < 1e-9);
    Ok(())
}

#[test]
fn conversion_with_type_filter_and_filtering() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let input = tmp.path().join("continuous.cdx");
    let output = tmp.path().join("filtered.cdx");
    write_continuous(&input)?;

    let reader = ContinuousDelayReader::open(&input)?;
    let mut options = ConversionOptions::new(1e9);
    options.delay_before_min_s = 4e-9;
    options.delay_after_max_s = 4e-9;
    options.component_type = Some(300);
    options.enable_filtering = true;

    let mut seen = Vec::new();
    convert_with_progress(&reader, &output, &options, |link, done| {
        seen.push((link.to_string(), done));
    })?;
    assert_eq!(seen, vec![("sat0".to_string(), 1)]);

    let discrete = DiscreteDelayReader::open(&output)?;
    let grid = discrete.get_cirs("sat0", Window::full())?;
    let column: Vec<f64> = grid.amplitudes.column(0).iter().map(|a| a.norm()).collect();
    // Only the echo survives the type filter, so the strongest bin is the echo bin.
    let peak = column
        .iter()
        .enumerate()
        .fold((0, 0.0), |best, (k, &v)| if v > best.1 { (k, v) } else { best });
    assert_eq!(peak.0, 7);
    Ok(())
}

#[test]
fn conversion_rejects_zero_length_grid() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let input = tmp.path().join("single.cdx");
    let config = ContinuousDelayConfig::new(parameters())
        .with_link("sat0", ComponentTypes::new().with(0, "LOS"));
    let mut writer = ContinuousDelayWriter::create(&input, config)?;
    let cirs = HashMap::from([(
        "sat0".to_string(),
        vec![Component::new(0, 1, 5e-9, Complex64::new(1.0, 0.0))],
    )]);
    writer.append_cir(&cirs, &HashMap::from([("sat0".to_string(), 0.0)]))?;
    writer.close()?;

    let reader = ContinuousDelayReader::open(&input)?;
    let err = convert_continuous_to_discrete(
        &reader,
        tmp.path().join("out.cdx"),
        &ConversionOptions::new(1e9),
    )
    .unwrap_err();
    assert!(matches!(err, StorageError::Config { .. }));
    Ok(())
}
