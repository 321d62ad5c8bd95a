use jukebox::commands::music::audio_sources::is_url;
use jukebox::commands::music::utils::format_duration;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::time::Duration;

#[rstest]
#[case("https://www.youtube.com/watch?v=dQw4w9WgXcQ", true)]
#[case("http://youtu.be/dQw4w9WgXcQ", true)]
#[case("never gonna give you up", false)]
#[case("artist: song", false)]
#[case("ftp://example.com/song.mp3", false)]
fn recognizes_links(#[case] input: &str, #[case] expected: bool) {
    assert_eq!(is_url(input), expected);
}

#[rstest]
#[case(Duration::from_secs(0), "0:00")]
#[case(Duration::from_secs(65), "1:05")]
#[case(Duration::from_secs(3725), "1:02:05")]
fn formats_durations(#[case] duration: Duration, #[case] expected: &str) {
    assert_eq!(format_duration(duration), expected);
}
