//! End-to-end demo: main + logger + two peer workers exchanging typed
//! messages through their mailboxes, with a timed cooperative shutdown.
//!
//! Run with: `cargo run --bin relay-demo`

use relay_core::{
    log_info, log_warn, Config, Core, CoreError, Message, MessageType, StartTable, Worker,
    WorkerContext,
};
use std::process;
use std::time::Duration;

/// Sends one DATA frame per tick to its peer.
struct Pitcher {
    target: &'static str,
    sent: u32,
}

impl Worker for Pitcher {
    fn body(&mut self, ctx: &WorkerContext) -> Result<(), CoreError> {
        while !ctx.shutdown_requested() {
            let payload = self.sent.to_be_bytes();
            let msg = Message::new(MessageType::Data, &payload)?;
            match ctx.push_message(self.target, &msg, Duration::from_millis(50)) {
                Ok(()) => {
                    self.sent += 1;
                    log_info!("sent frame {}", self.sent);
                }
                Err(err) if err.is_transient() => {
                    log_warn!("peer backpressure: {err}");
                }
                Err(err) => return Err(err),
            }
            std::thread::sleep(Duration::from_millis(25));
        }
        Ok(())
    }

    fn exit(&mut self) {
        log_info!("pitcher done after {} frames", self.sent);
    }
}

/// Drains its own mailbox and logs each received frame.
struct Catcher {
    received: u32,
}

impl Worker for Catcher {
    fn body(&mut self, ctx: &WorkerContext) -> Result<(), CoreError> {
        while !ctx.shutdown_requested() {
            match ctx.pop_message(Duration::from_millis(50)) {
                Ok(msg) => {
                    self.received += 1;
                    log_info!(
                        "frame {} ({:?}, {} bytes)",
                        self.received,
                        msg.kind(),
                        msg.content_size()
                    );
                }
                Err(err) if err.is_transient() => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn exit(&mut self) {
        log_info!("catcher done after {} frames", self.received);
    }
}

fn run() -> Result<(), CoreError> {
    let config = Config::from_pairs([
        ("logger.log_level", "debug"),
        ("logger.log_destination", "console"),
        ("logger.ansi_colours", "true"),
    ]);

    let table = StartTable::new()
        .thread("CATCHER", Catcher { received: 0 })
        .thread(
            "PITCHER",
            Pitcher {
                target: "CATCHER",
                sent: 0,
            },
        );

    let core = Core::launch(table, config)?;
    log_info!(
        "relay demo up: {} live threads, running for one second",
        core.registry().live_count()
    );

    std::thread::sleep(Duration::from_secs(1));

    core.signal_shutdown();
    core.wait_for_workers(Some(Duration::from_secs(5)))?;
    core.join()
}

fn main() {
    if let Err(err) = run() {
        eprintln!("relay-demo: core bring-up failed: {err}");
        process::exit(1);
    }
}
