// Runs the handoff on two threads with a short pacing interval and a peer
// timeout, then prints what each role reported.
use shm_handoff::Handoff::{ExecutionMode, HandoffBuilder};
use std::env;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let messages: u32 = match args.get(1) {
        Some(arg) => arg.parse()?,
        None => 10,
    };

    let initiator = HandoffBuilder::new()
        .with_mode(ExecutionMode::Threads)
        .anonymous_region()
        .with_messages(messages)
        .with_pacing(Duration::from_millis(10))
        .with_peer_timeout(Duration::from_secs(5))
        .build()?;

    let report = initiator.run()?;
    println!(
        "writer: {:?}, {} cycles, digest {}",
        report.writer.state,
        report.writer.cycles,
        report.writer.digest_hex()
    );
    println!(
        "reader: {:?}, {} cycles, digest {}",
        report.reader.state,
        report.reader.cycles,
        report.reader.digest_hex()
    );
    println!("transcripts match: {}", report.transcripts_match());
    Ok(())
}
