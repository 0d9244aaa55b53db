mod common;

use assert_cmd::prelude::*;
use assert_cmd::Command;
use predicates::prelude::*;
use std::error::Error;
use tempfile::tempdir;

use common::{write_fixture, NOF_CIRS};

fn cdx() -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("cdx")?;
    cmd.env("CDX_CONFIG", "/dev/null");
    Ok(cmd)
}

#[test]
fn convert_then_analyse_discrete_file() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let input = tmp.path().join("continuous.cdx");
    let output = tmp.path().join("discrete.cdx");
    write_fixture(&input)?;

    let assert = cdx()?
        .args([
            "convert",
            input.to_str().unwrap(),
            output.to_str().unwrap(),
            "-s",
            "1e9",
            "-b",
            "2e-9",
            "-a",
            "2e-9",
            "-f",
            "csv",
        ])
        .assert()
        .success();
    let text = String::from_utf8(assert.get_output().stdout.clone())?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "link,nof_cirs,min_delay_s,max_delay_s,nof_coeffs");
    // sat0 spans 0..20 ns plus 2 ns on each side, sat1 only the margins.
    assert!(lines[1].starts_with("sat0,20,0,"));
    assert!(lines[1].ends_with(",24"));
    assert!(lines[2].ends_with(",4"));

    let assert = cdx()?
        .args(["info", output.to_str().unwrap()])
        .assert()
        .success();
    let info: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout)?;
    assert_eq!(info["delay_type"], "discrete-delay");
    assert_eq!(info["delay_smpl_freq_hz"], 1e9);
    assert_eq!(info["nof_cirs"], NOF_CIRS);
    assert_eq!(info["links"][0]["nof_delay_bins"], 24);

    let assert = cdx()?
        .args(["spectrum", output.to_str().unwrap(), "--link", "sat1"])
        .assert()
        .success();
    let spectrum: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout)?;
    let doppler = spectrum["doppler_axis"].as_array().ok_or("expected doppler axis")?;
    assert_eq!(doppler.len(), NOF_CIRS as usize);
    assert_eq!(doppler[10], 0.0);
    assert_eq!(spectrum["magnitude_db"].as_array().map(Vec::len), Some(4));

    cdx()?
        .args(["discrete-power", output.to_str().unwrap(), "--link", "sat0", "-f", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("link,time_s,power\n"));
    Ok(())
}

#[test]
fn convert_refuses_to_overwrite_input() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let input = tmp.path().join("continuous.cdx");
    write_fixture(&input)?;
    let path = input.to_str().unwrap();

    cdx()?
        .args(["convert", path, path, "-s", "1e9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("input and output file must differ"));
    Ok(())
}

#[test]
fn convert_without_delay_span_fails() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let input = tmp.path().join("continuous.cdx");
    let output = tmp.path().join("out.cdx");
    write_fixture(&input)?;

    // sat1 has a single delay, so without margins its grid would be empty.
    cdx()?
        .args(["convert", input.to_str().unwrap(), output.to_str().unwrap(), "-s", "1e9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
    Ok(())
}
