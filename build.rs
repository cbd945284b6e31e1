use std::process::Command;

fn main() {
    let git_hash = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .unwrap_or_default();

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);

    // ffmpeg is needed to accept non-WAV uploads
    let ffmpeg_check = Command::new("ffmpeg")
        .arg("-version")
        .output();

    if ffmpeg_check.is_err() {
        println!("cargo:warning=ffmpeg not found in PATH, non-WAV uploads will fail to transcribe");
    }
}
