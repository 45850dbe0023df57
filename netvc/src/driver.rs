//! The transport pump.
//!
//! One task per connection moves bytes between the [`Transport`] and the
//! connection core. It sleeps until the connection signals a change, the
//! transport becomes ready, or the earliest timer deadline passes.

use crate::event::UNKNOWN_ERRNO;
use crate::net_vconnection::NetVConnection;
use crate::transport::is_peer_closed;
use crate::vio::VioOp;
use std::sync::Arc;
use std::time::Instant;

/// Upper bound for a single read or write
pub const MAX_CHUNK: usize = 64 * 1024;

/// Runs until the connection is closed, then tears the transport down
pub async fn drive(vc: Arc<NetVConnection>) {
    let Some(transport) = vc.transport() else {
        log::trace!(target: "netvc", "Connection closed before its pump started");
        return;
    };

    let mut scratch = vec![0u8; MAX_CHUNK];

    loop {
        let plan = vc.io_plan(MAX_CHUNK);

        if let Some(reason) = plan.close {
            log::trace!(target: "netvc", "Pump exiting ({reason:?})");
            transport.close(reason);
            break;
        }

        if let Some(how) = plan.shutdown {
            if let Err(err) = transport.shutdown(how).await {
                log::warn!(target: "netvc", "Transport shutdown({how:?}) failed: {err:?}");
            }
        }

        if let Some((generation, data)) = plan.oob {
            let result = transport.send_oob(&data).await;
            vc.oob_finished(generation, result);
            continue;
        }

        let read_window = plan.read_window;
        let write_chunk = plan.write_chunk.unwrap_or_default();
        let deadline = plan.deadline;
        let sleep = tokio::time::sleep_until(tokio::time::Instant::from_std(
            deadline.unwrap_or_else(Instant::now),
        ));

        tokio::select! {
            biased;

            _ = vc.notified() => {}

            res = transport.read(&mut scratch[..read_window]), if read_window > 0 => {
                match res {
                    Ok(0) => {
                        if transport.reports_eos() {
                            vc.transport_eos(VioOp::Read);
                        }
                    }

                    Ok(n) => match vc.transport_read(&scratch[..n]) {
                        Ok(taken) if taken < n => {
                            log::warn!(target: "netvc", "Discarded {} bytes read for a replaced operation", n - taken);
                        }
                        Ok(_) => {}
                        Err(err) => {
                            log::trace!(target: "netvc", "Read of {n} bytes not accepted: {err:?}");
                        }
                    },

                    Err(err) => {
                        log::error!(target: "netvc", "Transport read failed: {err:?}");
                        vc.transport_error(VioOp::Read, err.raw_os_error().unwrap_or(UNKNOWN_ERRNO));
                    }
                }
            }

            res = transport.write(&write_chunk), if !write_chunk.is_empty() => {
                let res = match res {
                    Ok(n) if n > 0 => transport.flush().await.map(|_| n),
                    res => res,
                };

                match res {
                    Ok(0) => vc.transport_eos(VioOp::Write),
                    Ok(n) => {
                        if let Err(err) = vc.transport_wrote(n) {
                            log::trace!(target: "netvc", "Write of {n} bytes not recorded: {err:?}");
                        }
                    }
                    Err(err) if is_peer_closed(&err) => vc.transport_eos(VioOp::Write),
                    Err(err) => {
                        log::error!(target: "netvc", "Transport write failed: {err:?}");
                        vc.transport_error(VioOp::Write, err.raw_os_error().unwrap_or(UNKNOWN_ERRNO));
                    }
                }
            }

            _ = sleep, if deadline.is_some() => vc.on_timer_tick(),
        }
    }
}
