use std::time::Duration;

use axum::http::StatusCode;
use danmu_core::{DanmuStyle, PacingPolicy};
use danmu_ctl::{DeliveryError, HttpEndpoint, Sender};

use crate::*;

/// Fast pacing so runs finish in well under a second.
fn quick_pacing() -> PacingPolicy {
    PacingPolicy::new(0.01, 0.05)
}

#[tokio::test]
async fn run_posts_each_line_in_order_with_full_payload() {
    let overlay = MockOverlay::start().await.unwrap();
    let sender = Sender::new(
        HttpEndpoint::new(overlay.url.clone()),
        DanmuStyle::default(),
        quick_pacing(),
    );

    let before = danmu_core::payload::unix_now_secs();
    let sent = sender
        .run(&["你好世界!", "0123456789", "ok"])
        .await
        .unwrap();
    assert_eq!(sent, 3);

    let received = overlay.received();
    let texts: Vec<_> = received
        .iter()
        .map(|r| r.body["text"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(texts, ["你好世界!", "0123456789", "ok"]);

    let first = &received[0].body;
    assert_eq!(first.as_object().unwrap().len(), 12);
    assert_eq!(first["type"], "danmu");
    assert_eq!(first["color"], "#000000");
    assert_eq!(first["size"], 32);
    assert_eq!(first["strokeColor"], "#ffffff");
    assert_eq!(first["strokeWidth"], 2);
    assert_eq!(first["typingSpeed"], 100);
    assert_eq!(first["displayDuration"], 2000);
    assert_eq!(first["fadeDuration"], 1000);
    assert_eq!(first["shakeAmplitude"], 2);
    assert_eq!(first["randomTilt"], 10);

    let time = first["time"].as_f64().unwrap();
    assert!(time >= before && time < before + 5.0, "time {time} not near {before}");

    // gap after a line is at least that line's pacing delay
    let pacing = quick_pacing();
    for (i, pair) in received.windows(2).enumerate() {
        let gap = pair[1].at.duration_since(pair[0].at);
        let expected = pacing.delay_for(texts[i].as_str());
        assert!(gap >= expected, "gap {i}: {gap:?} < {expected:?}");
    }
}

#[tokio::test]
async fn status_and_body_are_passed_through() {
    let overlay = MockOverlay::with_reply(StatusCode::SERVICE_UNAVAILABLE, "overlay busy")
        .await
        .unwrap();
    let sender = Sender::new(
        HttpEndpoint::new(overlay.url.clone()),
        DanmuStyle::default(),
        quick_pacing(),
    );

    let result = sender.send_one("hello").await.unwrap();
    assert_eq!(result.status, 503);
    assert_eq!(result.body, "overlay busy");

    // a non-2xx answer is still a delivery, so the run carries on
    assert_eq!(sender.run(&["a", "b"]).await.unwrap(), 2);
    assert_eq!(overlay.received().len(), 3);
}

#[tokio::test]
async fn unreachable_endpoint_aborts_the_run() {
    let url = dead_endpoint().await.unwrap();
    let sender = Sender::new(HttpEndpoint::new(url.clone()), DanmuStyle::default(), quick_pacing());

    let start = std::time::Instant::now();
    let err = sender.run(&["first", "second"]).await.unwrap_err();

    assert!(matches!(&err, DeliveryError::Transport { url: u, .. } if *u == url));
    assert!(err.to_string().contains("is the overlay running?"));
    // failed on the first line, so no pacing delay was taken
    assert!(start.elapsed() < Duration::from_secs(5));
}
