use auto_reel::scene::parse_story;
use auto_reel::timeline::{
    crossfade_offsets, per_clip_duration, raw_clip_duration, timeline_length, DurationBounds,
};

const EPS: f64 = 1e-9;

#[test]
fn unclamped_clips_fill_the_music_exactly() {
    for &(audio, count, overlap) in &[(150.0, 20, 0.5), (61.3, 7, 0.3), (12.0, 2, 1.0)] {
        let d = raw_clip_duration(audio, count, Some(overlap)).unwrap();
        let durations = vec![d; count];

        let total: f64 = durations.iter().sum();
        assert!((total - (audio + overlap * (count - 1) as f64)).abs() < EPS);

        let offsets = crossfade_offsets(&durations, overlap);
        let last = offsets.last().copied().unwrap() + durations[count - 1];
        assert!((last - audio).abs() < EPS, "{} vs {}", last, audio);
        assert!((timeline_length(&durations, overlap) - audio).abs() < EPS);
    }
}

#[test]
fn clamped_duration_stays_in_bounds() {
    let bounds = DurationBounds::new(3.0, 10.0);
    for &(audio, count) in &[(600.0, 3), (5.0, 40), (150.0, 20), (0.0, 1)] {
        let d = per_clip_duration(audio, count, Some(0.5), bounds).unwrap();
        assert!((3.0..=10.0).contains(&d), "{} images over {}s gave {}", count, audio, d);
    }
}

#[test]
fn every_well_formed_marker_becomes_a_scene() {
    let script = "Title: Bella's Garden\n\
        [SCENE: a butterfly on a rose]\nBella fluttered.\n\
        [SCENE: empty scene]\n\
        [SCENE: rain on petals]\nThe rain came down.\n\
        [SCENE: sunshine]\nThe sun came back!";
    let story = parse_story(script);
    assert_eq!(story.title, "Bella's Garden");
    let prompts: Vec<_> = story.scenes.iter().map(|s| s.image_prompt.as_str()).collect();
    assert_eq!(prompts, ["a butterfly on a rose", "rain on petals", "sunshine"]);
    let indices: Vec<_> = story.scenes.iter().map(|s| s.index).collect();
    assert_eq!(indices, [0, 1, 2]);
}
