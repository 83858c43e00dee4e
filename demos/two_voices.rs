//! Two simulated participants talking across a virtual room.
//!
//! Run with: `cargo run --example two_voices`
//!
//! Alice hums at 440 Hz to Bob's left; Bob hums at 330 Hz to Alice's right.
//! The demo prints what each listener's mix looks like, frame by frame.

use std::time::Duration;

use spatial_mix::{
    AudioPacket, ChannelSink, MixerConfig, MockVoice, Pose, SpatialMix, StereoFrame,
};
use tokio::sync::mpsc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = MixerConfig::default();
    let samples_per_frame = config.samples_per_frame;

    let (packet_tx, packet_rx) = mpsc::channel::<AudioPacket>(256);
    let (frame_tx, mut frame_rx) = mpsc::channel::<StereoFrame>(256);

    let session = SpatialMix::builder()
        .config(config)
        .packet_source(packet_rx)
        .add_sink(ChannelSink::new(frame_tx))
        .on_event(|event| tracing::info!(?event, "mixer event"))
        .start()
        .await?;

    let mut alice =
        MockVoice::microphone("alice", 22050).with_pose(Pose::new([2.0, 0.0, 0.0], 0.0));
    let mut bob = MockVoice::microphone("bob", 22050).with_pose(Pose::new([-2.0, 0.0, 0.0], 0.0));

    alice.generate_sine(440.0, 100);
    bob.generate_sine(330.0, 100);

    for packet in alice.drain_packets(samples_per_frame) {
        packet_tx.send(packet).await?;
    }
    for packet in bob.drain_packets(samples_per_frame) {
        packet_tx.send(packet).await?;
    }

    // Watch the personalized mixes come back for a quarter second.
    let watch = tokio::time::timeout(Duration::from_millis(250), async {
        while let Some(frame) = frame_rx.recv().await {
            let (left, right) = frame.split_channels();
            let peak = |channel: &[i16]| channel.iter().map(|s| s.unsigned_abs()).max().unwrap_or(0);
            println!(
                "frame {:>3} for {:<6} peak L {:>6} R {:>6}",
                frame.frame_index,
                frame.listener.as_str(),
                peak(&left),
                peak(&right),
            );
        }
    });
    let _ = watch.await;

    let stats = session.stats();
    println!(
        "mixed {} frames from {} packets ({} overflows, {} starvations, {} slips)",
        stats.frames_mixed,
        stats.packets_ingested,
        stats.buffer_overflows,
        stats.starvations,
        stats.cadence_slips,
    );

    session.stop().await?;
    Ok(())
}
