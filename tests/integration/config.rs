use danmu_core::DanmuConfig;
use danmu_ctl::{HttpEndpoint, Sender};

use crate::*;

/// Config file values reach the wire: endpoint, style and script.
#[tokio::test]
async fn config_file_drives_the_sender() {
    let overlay = MockOverlay::start().await.unwrap();

    let path = std::env::temp_dir().join(format!("danmu-it-{}.toml", std::process::id()));
    std::fs::write(
        &path,
        format!(
            r##"
[sender]
endpoint = "{}"
per_char_delay_secs = 0.0
base_delay_secs = 0.01
messages = ["第一行", "second"]

[sender.style]
color = "#ff0000"
size = 48
"##,
            overlay.url
        ),
    )
    .unwrap();

    let config = DanmuConfig::load_from(&path);
    std::fs::remove_file(&path).ok();
    let config = config.unwrap();

    let sender = Sender::from_config(HttpEndpoint::new(config.sender.endpoint.clone()), &config.sender);
    assert_eq!(sender.run(&config.sender.messages).await.unwrap(), 2);

    let received = overlay.received();
    assert_eq!(received.len(), 2);
    assert_eq!(received[0].body["text"], "第一行");
    assert_eq!(received[0].body["color"], "#ff0000");
    assert_eq!(received[0].body["size"], 48);
    // unset style keys keep their defaults
    assert_eq!(received[0].body["strokeColor"], "#ffffff");
    assert_eq!(received[1].body["text"], "second");
}
