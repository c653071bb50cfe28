use clap::{Arg, Command};
use std::env;
use std::process::{Command as ProcessCommand, Stdio};

#[derive(Debug)]
struct CheckResult {
    name: String,
    passed: bool,
    version: Option<String>,
    required: bool,
}

impl CheckResult {
    fn pass(name: String) -> Self {
        Self {
            name,
            passed: true,
            version: None,
            required: true,
        }
    }

    fn pass_with_version(name: String, version: String) -> Self {
        Self {
            name,
            passed: true,
            version: Some(version),
            required: true,
        }
    }

    fn fail(name: String) -> Self {
        Self {
            name,
            passed: false,
            version: None,
            required: true,
        }
    }

    fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Run `<tool> -version` and keep the first line of its banner.
fn check_tool(tool: &str) -> CheckResult {
    let name = format!("{} on PATH", tool);
    match ProcessCommand::new(tool)
        .arg("-version")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
    {
        Ok(output) if output.status.success() => {
            match String::from_utf8_lossy(&output.stdout).lines().next() {
                Some(line) if !line.trim().is_empty() => {
                    CheckResult::pass_with_version(name, line.trim().to_string())
                }
                _ => CheckResult::pass(name),
            }
        }
        _ => CheckResult::fail(name),
    }
}

/// Look for `encoder` in `ffmpeg -encoders`.
fn check_encoder(encoder: &str) -> CheckResult {
    let name = format!("ffmpeg encoder: {}", encoder);
    match ProcessCommand::new("ffmpeg")
        .args(["-hide_banner", "-encoders"])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
    {
        Ok(output)
            if output.status.success()
                && String::from_utf8_lossy(&output.stdout)
                    .split_whitespace()
                    .any(|word| word == encoder) =>
        {
            CheckResult::pass(name)
        }
        _ => CheckResult::fail(name),
    }
}

fn check_gpu() -> CheckResult {
    let name = "wgpu compute adapter".to_string();
    match vc_resample::gpu::probe_adapter() {
        Ok(adapter) => CheckResult::pass_with_version(name, adapter).optional(),
        Err(e) => {
            println!("[WARN] {} (GpuBilinear will run on the CPU)", e);
            CheckResult::fail(name).optional()
        }
    }
}

fn print_section(title: &str) {
    println!();
    println!("== {} ==", title);
}

fn print_result(result: &CheckResult) {
    match (&result.passed, &result.version, result.required) {
        (true, Some(version), _) => println!("[OK]   {} ({})", result.name, version),
        (true, None, _) => println!("[OK]   {}", result.name),
        (false, _, true) => println!("[FAIL] {}", result.name),
        (false, _, false) => println!("[SKIP] {} (optional)", result.name),
    }
}

fn main() {
    let matches = Command::new("check_deps")
        .about("Checks availability of ffmpeg/ffprobe, the libx264 encoder, and a GPU compute adapter")
        .arg(
            Arg::new("skip-gpu")
                .long("skip-gpu")
                .help("Skip the GPU adapter probe")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let skip_gpu = matches.get_flag("skip-gpu");

    let os = env::consts::OS;
    println!("Detected OS: {}", os);
    println!("GPU feature: {}", if cfg!(feature = "gpu") { "on" } else { "off" });

    let mut results = Vec::new();

    // Core tools
    print_section("Core tools");
    let ffmpeg = check_tool("ffmpeg");
    let ffmpeg_found = ffmpeg.passed;
    let mut core = vec![ffmpeg, check_tool("ffprobe")];
    if ffmpeg_found {
        core.push(check_encoder("libx264"));
        core.push(check_encoder("aac"));
    }
    for result in core {
        print_result(&result);
        results.push(result);
    }

    if !skip_gpu {
        print_section("GPU");
        let gpu = check_gpu();
        print_result(&gpu);
        results.push(gpu);
    }

    // Summary
    print_section("Summary");
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed && r.required).count();
    println!("Passed: {}, Failed: {}", passed, failed);

    if failed > 0 {
        println!();
        println!("Some required dependencies are missing.");
        println!("Hints:");
        println!("  Ubuntu/Debian: sudo apt-get install -y ffmpeg");
        println!("  macOS:         brew install ffmpeg");
        println!("  Windows:       winget install ffmpeg");
        std::process::exit(1);
    }
}
