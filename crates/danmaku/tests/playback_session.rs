use std::io::Write;
use std::time::Duration;

use danmaku::{
    DanmakuEngine, FeedConfig, KeyOutcome, MemorySurface, OverlayConfig, PlaybackKind,
    PlaybackSession, RemoteKey, RenderSurface, XmlFileSource,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

fn engine() -> DanmakuEngine {
    DanmakuEngine::with_config(
        MemorySurface::new(),
        1920,
        1080,
        OverlayConfig::default().with_seed(21),
    )
}

/// Drive a session at 60 fps until `until` has elapsed.
async fn run_frames(session: &mut PlaybackSession, start: Instant, until: Duration) {
    let frame = Duration::from_micros(16_667);
    while start.elapsed() < until {
        session.pump();
        session.on_frame(start.elapsed());
        tokio::time::sleep(frame).await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_video_session_plays_out_and_empties() {
    let parent = CancellationToken::new();
    let feed = FeedConfig {
        video_interval_ms: 100,
        ..FeedConfig::default()
    };
    let mut session = PlaybackSession::open(PlaybackKind::Video, engine(), None, &feed, &parent);
    let start = Instant::now();

    run_frames(&mut session, start, Duration::from_secs(3)).await;
    assert_eq!(session.engine().stats().admitted, 26);
    assert!(session.feed_finished());
    assert!(session.engine().surface().child_count() > 1);

    // All traversals are shorter than 15s after the last admission
    run_frames(&mut session, start, Duration::from_secs(20)).await;
    assert_eq!(session.engine().surface().child_count(), 0);
    assert_eq!(session.engine().stats().completed, 26);
}

#[tokio::test(start_paused = true)]
async fn test_live_session_with_xml_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("live.xml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(
        file,
        r#"<danmu><d p="1,1,u1,A">hello</d><d p="2,1,u2,B">world</d></danmu>"#
    )
    .unwrap();

    let parent = CancellationToken::new();
    let engine = engine().with_source(Box::new(XmlFileSource::new()));
    let mut session = PlaybackSession::open(
        PlaybackKind::Live,
        engine,
        path.to_str(),
        &FeedConfig::default(),
        &parent,
    );
    let start = Instant::now();

    run_frames(&mut session, start, Duration::from_secs(5)).await;
    let texts: Vec<_> = session
        .engine()
        .snapshot()
        .into_iter()
        .map(|e| e.text)
        .collect();
    assert!(texts.len() >= 3);
    assert!(texts.iter().all(|t| t == "hello" || t == "world"));
    assert!(session.viewer_count().is_some());

    assert_eq!(session.on_key(RemoteKey::MediaPause), KeyOutcome::Playback { playing: false });
    let admitted = session.engine().stats().admitted;
    run_frames(&mut session, start, Duration::from_secs(10)).await;
    assert_eq!(session.engine().stats().admitted, admitted);

    assert_eq!(session.on_key(RemoteKey::MediaStop), KeyOutcome::Exit);
    assert_eq!(session.engine().surface().child_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_parent_cancel_stops_feeding() {
    let parent = CancellationToken::new();
    let mut session = PlaybackSession::open(
        PlaybackKind::Live,
        engine(),
        None,
        &FeedConfig::default(),
        &parent,
    );
    let start = Instant::now();
    run_frames(&mut session, start, Duration::from_secs(2)).await;
    let admitted = session.engine().stats().admitted;
    assert!(admitted > 0);

    parent.cancel();
    run_frames(&mut session, start, Duration::from_secs(8)).await;
    assert_eq!(session.engine().stats().admitted, admitted);
}
