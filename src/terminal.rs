//! Interactive terminal loop.
//!
//! Pumps two directions concurrently: operator input lines into the
//! session, session events onto the display. Neither direction blocks the
//! other — a silent operator never stalls incoming messages, and a chatty
//! robot never keeps the operator from typing. Exit is cooperative: `q`,
//! stdin EOF, Ctrl-C and a peripheral disconnect all funnel into the same
//! close path.

use std::io::Write as _;

use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::logutil::escape_log;
use crate::session::{Session, SessionEvent};

/// Operator command that ends the session.
const QUIT_COMMAND: &str = "q";

/// Run the duplex loop until operator exit or peer disconnect. Mid-session
/// send failures are reported per command and leave the loop running so the
/// operator can retry.
pub async fn run(session: Session) {
    let device_name = session.device_name().to_string();
    let (handle, mut events) = session.split();

    let interactive = atty::is(atty::Stream::Stdin);
    if interactive {
        println!(
            "Connected to '{}'. Type commands to send; '{}' quits.",
            device_name, QUIT_COMMAND
        );
    }

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    prompt(interactive);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(SessionEvent::Line(line)) => {
                    debug!("rx: {}", escape_log(&line));
                    println!("{}", line);
                    prompt(interactive);
                }
                Some(SessionEvent::PeerDisconnected) => {
                    println!("Peripheral disconnected; session over.");
                    break;
                }
                None => break,
            },
            line = input.next_line() => match line {
                Ok(Some(command)) => {
                    let trimmed = command.trim();
                    if trimmed.eq_ignore_ascii_case(QUIT_COMMAND) {
                        info!("operator requested exit");
                        break;
                    }
                    if trimmed.is_empty() {
                        prompt(interactive);
                        continue;
                    }
                    if let Err(e) = handle.send(&command).await {
                        eprintln!("send failed: {}", e);
                    }
                    prompt(interactive);
                }
                // EOF: piped input ran out.
                Ok(None) => break,
                Err(e) => {
                    warn!("stdin read error: {}", e);
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                println!();
                info!("interrupt received");
                break;
            }
        }
    }

    handle.close();
}

fn prompt(interactive: bool) {
    if interactive {
        print!("> ");
        let _ = std::io::stdout().flush();
    }
}
