#![cfg(unix)]

use auto_reel::config::{Toolchain, VideoSettings};
use auto_reel::media::{Assembler, Ffmpeg};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

// Records its arguments, then writes a marker to the last one (the output).
const STUB_FFMPEG: &str = r#"#!/bin/sh
echo "$@" >> "$(dirname "$0")/ffmpeg.log"
for last in "$@"; do :; done
case "$*" in
  *-filter_complex*) [ -f "$(dirname "$0")/xfade_fails" ] && exit 1 ;;
esac
printf done > "$last"
"#;

const FAILING_FFPROBE: &str = "#!/bin/sh\nexit 1\n";

const WORKING_FFPROBE: &str = r#"#!/bin/sh
echo '{"format":{"duration":"2.0"}}'
"#;

fn write_script(path: &Path, body: &str) {
    std::fs::write(path, body).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

fn assembler(bin: &Path) -> Assembler {
    let tools = Toolchain {
        ffmpeg: bin.join("ffmpeg").display().to_string(),
        ffprobe: bin.join("ffprobe").display().to_string(),
        ..Toolchain::default()
    };
    Assembler::new(Ffmpeg::new(&tools), VideoSettings::default())
}

fn clips(dir: &Path) -> Vec<PathBuf> {
    ["a.mp4", "b.mp4"]
        .iter()
        .map(|name| {
            let clip = dir.join(name);
            std::fs::write(&clip, b"clip").unwrap();
            clip
        })
        .collect()
}

fn ffmpeg_calls(bin: &Path) -> Vec<String> {
    std::fs::read_to_string(bin.join("ffmpeg.log"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

// Both failure points live in one test so the stub scripts are never written
// while another test is spawning processes.
#[tokio::test]
async fn crossfade_failures_fall_back_to_simple_concat() {
    let bin = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    write_script(&bin.path().join("ffmpeg"), STUB_FFMPEG);
    let clips = clips(work.path());

    // Probing fails before any graph is built.
    write_script(&bin.path().join("ffprobe"), FAILING_FFPROBE);
    let out = work.path().join("probe_failed.mp4");
    assembler(bin.path())
        .concat_with_crossfade(&clips, &out, 0.5)
        .await
        .unwrap();
    assert!(out.exists());
    let calls = ffmpeg_calls(bin.path());
    assert_eq!(calls.len(), 1);
    assert!(calls[0].contains("-f concat"), "{}", calls[0]);

    // Probing works but the xfade encode fails.
    std::fs::remove_file(bin.path().join("ffmpeg.log")).unwrap();
    write_script(&bin.path().join("ffprobe"), WORKING_FFPROBE);
    std::fs::write(bin.path().join("xfade_fails"), b"").unwrap();
    let out = work.path().join("encode_failed.mp4");
    assembler(bin.path())
        .concat_with_crossfade(&clips, &out, 0.5)
        .await
        .unwrap();
    assert!(out.exists());
    let calls = ffmpeg_calls(bin.path());
    assert_eq!(calls.len(), 2);
    assert!(calls[0].contains("-filter_complex"));
    assert!(calls[1].contains("-f concat"));
}
