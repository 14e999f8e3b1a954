use assert_cmd::Command;
use predicates::prelude::*;

fn cli() -> Command {
    Command::cargo_bin("fractal-bench").unwrap()
}

#[test]
fn cpu_backends_print_report_and_save_png() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("image").join("mandel.png");

    cli()
        .args(["--width", "64", "--height", "48", "--max-iter", "100"])
        .args(["--backend", "serial"])
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Serial: "))
        .stdout(predicate::str::contains("GPU vs Serial: n/a"));

    let img = image::open(&output).unwrap();
    assert_eq!((img.width(), img.height()), (64, 48));
}

#[test]
fn julia_mode_accepts_negative_constant() {
    cli()
        .args(["--width", "32", "--height", "32", "--max-iter", "50"])
        .args(["--mode", "julia", "--c-real", "-0.8", "--c-imag", "0.156"])
        .args(["--backend", "parallel", "--threads", "2", "--row-chunk", "4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Julia"))
        .stdout(predicate::str::contains("Parallel: "));
}

#[test]
fn gpu_only_with_missing_kernel_fails() {
    cli()
        .args(["--width", "16", "--height", "16", "--max-iter", "10"])
        .args(["--backend", "gpu", "--kernel", "no/such/kernel.wgsl"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GPU indisponible"));
}

#[test]
fn zero_width_is_rejected() {
    cli()
        .args(["--width", "0", "--backend", "serial"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("dimensions invalides"));
}

#[test]
fn invalid_config_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("engine.json");
    std::fs::write(&config, r#"{ "row_chunk": 0 }"#).unwrap();

    cli()
        .args(["--width", "8", "--height", "8", "--backend", "serial"])
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("row_chunk"));
}
