// Creates a shared slot, forks a writer and a reader that hand five messages
// back and forth through it, waits for both and removes the region.
//
// USAGE:
//   shared_sync            (RUST_LOG=debug for per-cycle detail)

use shm_handoff::Core::unlink_shared_memory;
use shm_handoff::Handoff::HandoffBuilder;
use std::io::Write;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stdout)
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();

    let initiator = match HandoffBuilder::new().build() {
        Ok(initiator) => initiator,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    // Ctrl+C while a role spins forever: remove the region before leaving
    if let Some(name) = initiator.config().region_name.clone() {
        let handler = ctrlc::set_handler(move || {
            if let Err(e) = unlink_shared_memory(&name) {
                log::warn!("initiator: {}", e);
            }
            log::info!("initiator: interrupted, removed shared memory {}", name);
            std::process::exit(130);
        });
        if let Err(e) = handler {
            log::warn!("initiator: could not install Ctrl+C handler: {}", e);
        }
    }

    match initiator.run() {
        Ok(_) => {
            log::info!("initiator: exiting");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("initiator: {}", e);
            ExitCode::FAILURE
        }
    }
}
