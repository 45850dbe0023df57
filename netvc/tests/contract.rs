#[cfg(test)]
pub mod tests {
    use async_trait::async_trait;
    use bytes::Bytes;
    use netvc::prelude::*;
    use netvc::transport::RawSocketHandle;
    use netvc_io::Mutex;
    use rstest::*;
    use std::net::SocketAddr;
    use std::sync::{Arc, Weak};
    use std::time::Duration;

    struct MockTransport;

    #[async_trait]
    impl Transport for MockTransport {
        fn kind(&self) -> TransportKind {
            TransportKind::Tcp
        }

        fn local_addr(&self) -> std::io::Result<SocketAddr> {
            Ok("127.0.0.1:40000".parse().unwrap())
        }

        fn peer_addr(&self) -> std::io::Result<SocketAddr> {
            Ok("10.0.0.2:80".parse().unwrap())
        }

        fn raw_socket(&self) -> Option<RawSocketHandle> {
            None
        }

        async fn read(&self, _buf: &mut [u8]) -> std::io::Result<usize> {
            std::future::pending().await
        }

        async fn write(&self, _buf: &[u8]) -> std::io::Result<usize> {
            std::future::pending().await
        }

        async fn shutdown(&self, _how: ShutdownHowTo) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct Recorder {
        name: &'static str,
        events: Vec<(VcEvent, u64)>,
        oob_events: Vec<VcEvent>,
        reply: EventResult,
        order: Option<Arc<Mutex<Vec<&'static str>>>>,
        depth: usize,
        rearm_in_callback: bool,
        rearm_results: Vec<bool>,
        feed_in_callback: Option<(Weak<NetVConnection>, Vec<u8>)>,
    }

    impl Continuation for Recorder {
        fn handle_event(&mut self, event: VcEvent, vio: &Vio) -> EventResult {
            self.depth += 1;
            assert_eq!(self.depth, 1, "sink entered re-entrantly");
            self.events.push((event, vio.ndone()));
            if let Some(order) = self.order.as_ref() {
                order.lock().push(self.name);
            }

            if self.rearm_in_callback {
                self.rearm_results.push(vio.reenable_re().is_ok());
            }

            if let Some((vc, data)) = self.feed_in_callback.take() {
                let vc = vc.upgrade().unwrap();
                // queued behind this callback, delivered after it returns
                assert_eq!(vc.transport_read(&data).unwrap(), data.len());
                assert_eq!(self.events.len(), 1);
            }

            self.depth -= 1;
            self.reply
        }

        fn handle_oob_event(&mut self, event: VcEvent, _action: &OobAction) -> EventResult {
            self.oob_events.push(event);
            EventResult::Continue
        }
    }

    fn recorder(name: &'static str) -> (Arc<Mutex<Recorder>>, Sink) {
        let shared = Arc::new(Mutex::new(Recorder {
            name,
            ..Default::default()
        }));
        let sink = Sink::from_shared(shared.clone());
        (shared, sink)
    }

    fn events(recorder: &Arc<Mutex<Recorder>>) -> Vec<VcEvent> {
        recorder.lock().events.iter().map(|(event, _)| *event).collect()
    }

    fn new_vc(clock: &ManualClock) -> Arc<NetVConnection> {
        let options = NetVcOptions::new()
            .with_protocol(IpProtocol::Tcp)
            .with_local_port(PortBinding::Any)
            .with_local_addr(AddrBinding::Any);
        NetVConnection::with_clock(Arc::new(MockTransport), options, Arc::new(clock.clone()))
    }

    #[rstest]
    fn read_forty_then_sixty() {
        netvc_logging::setup_log();
        let clock = ManualClock::new();
        let vc = new_vc(&clock);
        let (rec, sink) = recorder("read");
        let buf = IoBuffer::new();

        let vio = vc.do_io_read(sink, IoLen::Bytes(100), buf.clone()).unwrap();
        assert_eq!(vc.transport_read(&[1u8; 40]).unwrap(), 40);
        assert_eq!(rec.lock().events, vec![(VcEvent::ReadReady, 40)]);

        assert_eq!(vc.transport_read(&[2u8; 60]).unwrap(), 60);
        assert_eq!(
            rec.lock().events,
            vec![(VcEvent::ReadReady, 40), (VcEvent::ReadComplete, 100)]
        );
        assert_eq!(vio.ndone(), 100);
        assert!(vio.is_complete());
        assert_eq!(buf.read_avail(), 100);

        // the slot is free again and nothing more arrives for the old handle
        assert!(matches!(
            vc.transport_read(&[3u8; 10]),
            Err(VcError::NoOperation(VioOp::Read))
        ));
        assert_eq!(rec.lock().events.len(), 2);
        vc.do_io_close(CloseReason::Normal);
    }

    #[rstest]
    #[case(vec![100])]
    #[case(vec![1, 2, 3, 94])]
    #[case(vec![50, 80])]
    #[case(vec![99, 1, 7])]
    fn bounded_read_accounts_exactly(#[case] chunks: Vec<usize>) {
        netvc_logging::setup_log();
        let clock = ManualClock::new();
        let vc = new_vc(&clock);
        let (rec, sink) = recorder("read");
        let buf = IoBuffer::new();
        let vio = vc.do_io_read(sink, IoLen::Bytes(100), buf.clone()).unwrap();

        let mut taken = 0;
        for chunk in chunks {
            match vc.transport_read(&vec![0u8; chunk]) {
                Ok(n) => taken += n,
                Err(VcError::NoOperation(VioOp::Read)) => {}
                Err(err) => panic!("unexpected error: {err:?}"),
            }
        }

        assert_eq!(taken, 100);
        assert_eq!(vio.ndone(), 100);
        assert_eq!(buf.read_avail(), 100);
        let events = events(&rec);
        assert_eq!(events.last(), Some(&VcEvent::ReadComplete));
        assert_eq!(
            events
                .iter()
                .filter(|event| event.is_terminal())
                .count(),
            1
        );
        vc.do_io_close(CloseReason::Normal);
    }

    #[rstest]
    fn read_shutdown_silences_read_side() {
        netvc_logging::setup_log();
        let clock = ManualClock::new();
        let vc = new_vc(&clock);
        let (rec, sink) = recorder("read");
        let vio = vc
            .do_io_read(sink.clone(), IoLen::Unbounded, IoBuffer::new())
            .unwrap();
        vc.set_inactivity_timeout(Duration::from_secs(1));
        vc.set_active_timeout(Duration::from_secs(1));

        vc.do_io_shutdown(ShutdownHowTo::ReadOnly).unwrap();
        assert_eq!(vc.lifecycle(), Lifecycle::ReadShutdown);

        assert!(matches!(
            vc.transport_read(b"late"),
            Err(VcError::Shutdown(VioOp::Read))
        ));
        vc.transport_eos(VioOp::Read);
        clock.advance(Duration::from_secs(5));
        vc.on_timer_tick();

        assert!(rec.lock().events.is_empty());
        assert!(matches!(vio.reenable(), Err(VcError::StaleHandle)));
        assert!(matches!(
            vc.do_io_read(sink, IoLen::Unbounded, IoBuffer::new()),
            Err(VcError::Shutdown(VioOp::Read))
        ));
        vc.do_io_close(CloseReason::Normal);
    }

    #[rstest]
    fn shutdown_under_sink_lock_discards_inflight_event() {
        netvc_logging::setup_log();
        let clock = ManualClock::new();
        let vc = new_vc(&clock);
        let (rec, sink) = recorder("read");
        let buf = IoBuffer::new();
        let _vio = vc.do_io_read(sink, IoLen::Unbounded, buf.clone()).unwrap();

        let guard = rec.lock();
        let pump = {
            let vc = vc.clone();
            std::thread::spawn(move || vc.transport_read(b"buffered"))
        };

        std::thread::sleep(Duration::from_millis(50));
        vc.do_io_shutdown(ShutdownHowTo::ReadOnly).unwrap();
        drop(guard);

        // either the bytes were refused, or they were buffered but never announced
        let _ = pump.join().unwrap();
        assert!(rec.lock().events.is_empty());
        vc.do_io_close(CloseReason::Normal);
    }

    #[rstest]
    fn close_under_sink_lock_discards_inflight_event() {
        netvc_logging::setup_log();
        let clock = ManualClock::new();
        let vc = new_vc(&clock);
        let (rec, sink) = recorder("write");
        let data = IoBuffer::from(&b"payload"[..]);
        let _vio = vc
            .do_io_write(sink, IoLen::Bytes(7), data.reader(), false)
            .unwrap();

        let guard = rec.lock();
        let pump = {
            let vc = vc.clone();
            std::thread::spawn(move || vc.transport_wrote(7))
        };

        std::thread::sleep(Duration::from_millis(50));
        vc.do_io_close(CloseReason::Normal);
        drop(guard);

        let _ = pump.join().unwrap();
        assert!(rec.lock().events.is_empty());
    }

    #[rstest]
    fn timeouts_are_held_while_idle() {
        netvc_logging::setup_log();
        let clock = ManualClock::new();
        let vc = new_vc(&clock);
        let (rec, sink) = recorder("read");

        vc.set_active_timeout(Duration::from_secs(5));
        clock.advance(Duration::from_secs(10));
        vc.on_timer_tick();
        assert_eq!(vc.next_deadline(), None);
        assert!(rec.lock().events.is_empty());

        // the expired deadline stays armed and fires once I/O is outstanding
        let _vio = vc
            .do_io_read(sink, IoLen::Unbounded, IoBuffer::new())
            .unwrap();
        assert!(vc.next_deadline().is_some());
        vc.on_timer_tick();
        assert_eq!(events(&rec), vec![VcEvent::ActiveTimeout]);
        assert!(!vc.is_closed());
        vc.do_io_close(CloseReason::Normal);
    }

    #[rstest]
    #[case(true)]
    #[case(false)]
    fn cleared_timeout_never_fires(#[case] inactivity: bool) {
        netvc_logging::setup_log();
        let clock = ManualClock::new();
        let vc = new_vc(&clock);
        let (rec, sink) = recorder("read");
        let _vio = vc
            .do_io_read(sink, IoLen::Unbounded, IoBuffer::new())
            .unwrap();

        if inactivity {
            vc.set_inactivity_timeout(Duration::from_secs(1));
            vc.cancel_inactivity_timeout();
            assert_eq!(vc.get_inactivity_timeout(), None);
        } else {
            vc.set_active_timeout(Duration::from_secs(1));
            vc.cancel_active_timeout();
            assert_eq!(vc.get_active_timeout(), None);
        }

        clock.advance(Duration::from_secs(2));
        vc.on_timer_tick();
        assert!(rec.lock().events.is_empty());
        vc.do_io_close(CloseReason::Normal);
    }

    #[rstest]
    fn expired_timeout_does_not_recur() {
        netvc_logging::setup_log();
        let clock = ManualClock::new();
        let vc = new_vc(&clock);
        let (rec, sink) = recorder("read");
        let _vio = vc
            .do_io_read(sink, IoLen::Unbounded, IoBuffer::new())
            .unwrap();
        vc.set_active_timeout(Duration::from_secs(1));

        clock.advance(Duration::from_secs(1));
        vc.on_timer_tick();
        clock.advance(Duration::from_secs(10));
        vc.on_timer_tick();
        assert_eq!(events(&rec), vec![VcEvent::ActiveTimeout]);
        assert_eq!(vc.get_active_timeout(), Some(Duration::from_secs(1)));

        vc.set_active_timeout(Duration::from_secs(1));
        clock.advance(Duration::from_secs(1));
        vc.on_timer_tick();
        assert_eq!(
            events(&rec),
            vec![VcEvent::ActiveTimeout, VcEvent::ActiveTimeout]
        );
        vc.do_io_close(CloseReason::Normal);
    }

    #[rstest]
    fn progress_pushes_inactivity_out() {
        netvc_logging::setup_log();
        let clock = ManualClock::new();
        let vc = new_vc(&clock);
        let (rec, sink) = recorder("read");
        let _vio = vc
            .do_io_read(sink, IoLen::Unbounded, IoBuffer::new())
            .unwrap();
        vc.set_inactivity_timeout(Duration::from_secs(2));

        clock.advance(Duration::from_millis(1500));
        vc.transport_read(b"tick").unwrap();
        clock.advance(Duration::from_millis(1500));
        vc.on_timer_tick();
        assert_eq!(events(&rec), vec![VcEvent::ReadReady]);

        clock.advance(Duration::from_millis(500));
        vc.on_timer_tick();
        assert_eq!(
            events(&rec),
            vec![VcEvent::ReadReady, VcEvent::InactivityTimeout]
        );
        vc.do_io_close(CloseReason::Normal);
    }

    #[rstest]
    #[case(EventResult::Continue, vec!["read", "write"])]
    #[case(EventResult::Done, vec!["read"])]
    fn timeout_goes_to_read_sink_first(
        #[case] read_reply: EventResult,
        #[case] expected: Vec<&'static str>,
    ) {
        netvc_logging::setup_log();
        let clock = ManualClock::new();
        let vc = new_vc(&clock);
        let order = Arc::new(Mutex::new(Vec::new()));

        let (read_rec, read_sink) = recorder("read");
        let (write_rec, write_sink) = recorder("write");
        read_rec.lock().reply = read_reply;
        read_rec.lock().order = Some(order.clone());
        write_rec.lock().order = Some(order.clone());

        let _r = vc
            .do_io_read(read_sink, IoLen::Unbounded, IoBuffer::new())
            .unwrap();
        let data = IoBuffer::from(&b"pending"[..]);
        let _w = vc
            .do_io_write(write_sink, IoLen::Unbounded, data.reader(), false)
            .unwrap();

        vc.set_inactivity_timeout(Duration::from_secs(3));
        clock.advance(Duration::from_secs(3));
        vc.on_timer_tick();

        assert_eq!(*order.lock(), expected);
        assert_eq!(events(&read_rec), vec![VcEvent::InactivityTimeout]);
        vc.do_io_close(CloseReason::Normal);
    }

    #[rstest]
    fn shared_sink_is_notified_once() {
        netvc_logging::setup_log();
        let clock = ManualClock::new();
        let vc = new_vc(&clock);
        let (rec, sink) = recorder("both");
        let _r = vc
            .do_io_read(sink.clone(), IoLen::Unbounded, IoBuffer::new())
            .unwrap();
        let data = IoBuffer::from(&b"pending"[..]);
        let _w = vc
            .do_io_write(sink, IoLen::Unbounded, data.reader(), false)
            .unwrap();

        vc.set_active_timeout(Duration::from_secs(1));
        clock.advance(Duration::from_secs(1));
        vc.on_timer_tick();
        assert_eq!(events(&rec), vec![VcEvent::ActiveTimeout]);
        vc.do_io_close(CloseReason::Normal);
    }

    #[rstest]
    fn write_only_connection_gets_timeout() {
        netvc_logging::setup_log();
        let clock = ManualClock::new();
        let vc = new_vc(&clock);
        let (rec, sink) = recorder("write");
        let data = IoBuffer::from(&b"pending"[..]);
        let _w = vc
            .do_io_write(sink, IoLen::Unbounded, data.reader(), false)
            .unwrap();

        vc.set_inactivity_timeout(Duration::from_secs(1));
        clock.advance(Duration::from_secs(1));
        vc.on_timer_tick();
        assert_eq!(events(&rec), vec![VcEvent::InactivityTimeout]);
        vc.do_io_close(CloseReason::Normal);
    }

    #[rstest]
    fn double_close_is_a_noop() {
        netvc_logging::setup_log();
        let clock = ManualClock::new();
        let vc = new_vc(&clock);
        let (rec, sink) = recorder("read");
        let vio = vc
            .do_io_read(sink.clone(), IoLen::Unbounded, IoBuffer::new())
            .unwrap();

        vc.do_io_close(CloseReason::Normal);
        vc.do_io_close(CloseReason::from(104));
        assert_eq!(vc.lifecycle(), Lifecycle::Closed);
        assert!(vc.is_closed());

        let plan = vc.io_plan(1024);
        assert_eq!(plan.close, Some(CloseReason::Normal));
        assert!(matches!(
            vc.do_io_read(sink.clone(), IoLen::Unbounded, IoBuffer::new()),
            Err(VcError::Closed)
        ));
        assert!(matches!(
            vc.do_io_shutdown(ShutdownHowTo::Both),
            Err(VcError::Closed)
        ));
        assert!(matches!(vc.transport_read(b"x"), Err(VcError::Closed)));
        assert!(matches!(vio.reenable(), Err(VcError::Closed)));
        assert!(matches!(
            vc.send_oob(sink, Bytes::from_static(b"!")),
            Err(VcError::Closed)
        ));
        assert!(rec.lock().events.is_empty());
    }

    #[rstest]
    fn close_after_full_shutdown_is_still_required() {
        netvc_logging::setup_log();
        let clock = ManualClock::new();
        let vc = new_vc(&clock);
        vc.do_io_shutdown(ShutdownHowTo::ReadOnly).unwrap();
        vc.do_io_shutdown(ShutdownHowTo::WriteOnly).unwrap();
        assert_eq!(vc.lifecycle(), Lifecycle::BothShutdown);
        assert_eq!(vc.io_plan(16).shutdown, Some(ShutdownHowTo::Both));
        assert!(!vc.is_closed());
        vc.do_io_close(CloseReason::Normal);
        assert!(vc.is_closed());
    }

    #[rstest]
    fn write_peer_close_clears_slot() {
        netvc_logging::setup_log();
        let clock = ManualClock::new();
        let vc = new_vc(&clock);
        let (rec, sink) = recorder("write");
        let data = IoBuffer::from(&b"never sent"[..]);
        let vio = vc
            .do_io_write(sink, IoLen::Unbounded, data.reader(), false)
            .unwrap();

        let plan = vc.io_plan(1024);
        assert_eq!(plan.write_chunk.as_deref(), Some(&b"never sent"[..]));
        vc.transport_eos(VioOp::Write);

        assert_eq!(events(&rec), vec![VcEvent::Eos]);
        assert_eq!(vio.ndone(), 0);
        assert!(matches!(
            vc.transport_wrote(4),
            Err(VcError::NoOperation(VioOp::Write))
        ));

        // a different sink may now take the write side
        let (_other, other_sink) = recorder("other");
        assert!(vc
            .do_io_write(other_sink, IoLen::Unbounded, data.reader(), false)
            .is_ok());
        vc.do_io_close(CloseReason::Normal);
    }

    #[rstest]
    fn write_drains_and_releases_owned_reader() {
        netvc_logging::setup_log();
        let clock = ManualClock::new();
        let vc = new_vc(&clock);
        let (rec, sink) = recorder("write");
        let data = IoBuffer::from(&b"hello world!"[..]);
        let vio = vc
            .do_io_write(sink, IoLen::Bytes(11), data.reader(), true)
            .unwrap();

        let plan = vc.io_plan(1024);
        assert_eq!(plan.write_chunk.as_deref(), Some(&b"hello world"[..]));
        vc.transport_wrote(5).unwrap();
        assert_eq!(rec.lock().events, vec![(VcEvent::WriteReady, 5)]);

        let plan = vc.io_plan(1024);
        assert_eq!(plan.write_chunk.as_deref(), Some(&b" world"[..]));
        vc.transport_wrote(6).unwrap();
        assert_eq!(
            rec.lock().events,
            vec![(VcEvent::WriteReady, 5), (VcEvent::WriteComplete, 11)]
        );
        assert_eq!(vio.ndone(), 11);
        // the trailing byte went with the owned reader
        assert!(data.is_empty());
        assert!(vc.io_plan(1024).write_chunk.is_none());
        vc.do_io_close(CloseReason::Normal);
    }

    #[rstest]
    fn replaced_owned_write_releases_its_reader() {
        netvc_logging::setup_log();
        let clock = ManualClock::new();
        let vc = new_vc(&clock);
        let (_rec, sink) = recorder("write");
        let first = IoBuffer::from(&b"stale bytes"[..]);
        let _old = vc
            .do_io_write(sink.clone(), IoLen::Unbounded, first.reader(), true)
            .unwrap();

        let second = IoBuffer::from(&b"fresh"[..]);
        let _new = vc
            .do_io_write(sink.clone(), IoLen::Unbounded, second.reader(), true)
            .unwrap();
        assert!(first.is_empty());
        assert_eq!(
            vc.io_plan(1024).write_chunk.as_deref(),
            Some(&b"fresh"[..])
        );

        // re-issuing the same buffer keeps what is still unread
        let _again = vc
            .do_io_write(sink, IoLen::Unbounded, second.reader(), true)
            .unwrap();
        assert_eq!(second.read_avail(), 5);
        vc.do_io_close(CloseReason::Normal);
    }

    #[rstest]
    fn dry_writer_stalls_until_reenabled() {
        netvc_logging::setup_log();
        let clock = ManualClock::new();
        let vc = new_vc(&clock);
        let (rec, sink) = recorder("write");
        let data = IoBuffer::new();
        let vio = vc
            .do_io_write(sink, IoLen::Unbounded, data.reader(), false)
            .unwrap();

        assert!(vc.io_plan(1024).write_chunk.is_none());
        assert_eq!(events(&rec), vec![VcEvent::WriteReady]);
        assert!(vc.io_plan(1024).write_chunk.is_none());
        assert_eq!(events(&rec).len(), 1);

        data.append(b"more");
        assert!(vc.io_plan(1024).write_chunk.is_none());
        vio.reenable().unwrap();
        assert_eq!(vc.io_plan(1024).write_chunk.as_deref(), Some(&b"more"[..]));
        vc.do_io_close(CloseReason::Normal);
    }

    #[rstest]
    fn full_read_buffer_closes_window() {
        netvc_logging::setup_log();
        let clock = ManualClock::new();
        let vc = new_vc(&clock);
        let (_rec, sink) = recorder("read");
        let buf = IoBuffer::with_water_mark(8);
        let _vio = vc.do_io_read(sink, IoLen::Bytes(100), buf.clone()).unwrap();

        assert_eq!(vc.io_plan(1024).read_window, 8);
        vc.transport_read(&[0u8; 8]).unwrap();
        assert_eq!(vc.io_plan(1024).read_window, 0);
        buf.consume(6);
        assert_eq!(vc.io_plan(4).read_window, 4);
        vc.do_io_close(CloseReason::Normal);
    }

    #[rstest]
    fn oob_cancelled_before_send_is_silent() {
        netvc_logging::setup_log();
        let clock = ManualClock::new();
        let vc = new_vc(&clock);
        let (rec, sink) = recorder("oob");

        let action = vc
            .send_oob(sink.clone(), Bytes::from_static(b"urgent"))
            .unwrap();
        vc.cancel_oob();
        assert!(vc.io_plan(1024).oob.is_none());
        vc.oob_finished(action.generation(), Ok(()));
        assert!(rec.lock().oob_events.is_empty());

        let action = vc.send_oob(sink, Bytes::from_static(b"again")).unwrap();
        action.cancel();
        vc.oob_finished(action.generation(), Ok(()));
        assert!(rec.lock().oob_events.is_empty());
        vc.do_io_close(CloseReason::Normal);
    }

    #[rstest]
    #[case(Ok(()), VcEvent::OobComplete)]
    #[case(Err(std::io::ErrorKind::BrokenPipe.into()), VcEvent::Eos)]
    #[case(Err(std::io::Error::from_raw_os_error(22)), VcEvent::Error(22))]
    fn oob_outcome_is_reported_once(
        #[case] outcome: std::io::Result<()>,
        #[case] expected: VcEvent,
    ) {
        netvc_logging::setup_log();
        let clock = ManualClock::new();
        let vc = new_vc(&clock);
        let (rec, sink) = recorder("oob");

        let _action = vc
            .send_oob(sink.clone(), Bytes::from_static(b"!"))
            .unwrap();
        assert!(matches!(
            vc.send_oob(sink, Bytes::from_static(b"?")),
            Err(VcError::OobInProgress)
        ));

        let (generation, data) = vc.io_plan(1024).oob.unwrap();
        assert_eq!(&data[..], b"!");
        assert!(vc.io_plan(1024).oob.is_none());

        vc.oob_finished(generation, outcome);
        vc.oob_finished(generation, Ok(()));
        assert_eq!(rec.lock().oob_events, vec![expected]);
        vc.do_io_close(CloseReason::Normal);
    }

    #[rstest]
    fn reenable_rules() {
        netvc_logging::setup_log();
        let clock = ManualClock::new();
        let vc = new_vc(&clock);
        let (rec, sink) = recorder("read");
        rec.lock().rearm_in_callback = true;

        let vio = vc
            .do_io_read(sink, IoLen::Bytes(10), IoBuffer::new())
            .unwrap();
        assert!(vio.reenable().is_ok());
        assert!(matches!(vio.reenable_re(), Err(VcError::NotInCallback)));

        vc.transport_read(&[0u8; 4]).unwrap();
        vc.transport_read(&[0u8; 6]).unwrap();
        // accepted while the handle was active, refused once it completed
        assert_eq!(rec.lock().rearm_results, vec![true, false]);
        assert!(matches!(vio.reenable(), Err(VcError::StaleHandle)));
        vc.do_io_close(CloseReason::Normal);
    }

    #[rstest]
    fn reissue_rules() {
        netvc_logging::setup_log();
        let clock = ManualClock::new();
        let vc = new_vc(&clock);
        let (rec, sink) = recorder("read");
        let (_other, other_sink) = recorder("other");

        let first = vc
            .do_io_read(sink.clone(), IoLen::Bytes(10), IoBuffer::new())
            .unwrap();
        assert!(matches!(
            vc.do_io_read(other_sink, IoLen::Bytes(10), IoBuffer::new()),
            Err(VcError::OperationInProgress(VioOp::Read))
        ));

        let second = vc
            .do_io_read(sink.clone(), IoLen::Bytes(20), IoBuffer::new())
            .unwrap();
        assert_ne!(first, second);
        assert!(second.id() > first.id());
        assert!(matches!(first.reenable(), Err(VcError::StaleHandle)));

        vc.transport_read(&[0u8; 15]).unwrap();
        assert_eq!(rec.lock().events, vec![(VcEvent::ReadReady, 15)]);
        assert_eq!(first.ndone(), 0);

        // a zero-length read quiesces the side
        let quiet = vc
            .do_io_read(sink, IoLen::Bytes(0), IoBuffer::new())
            .unwrap();
        assert!(quiet.is_complete());
        assert!(matches!(
            vc.transport_read(b"x"),
            Err(VcError::NoOperation(VioOp::Read))
        ));
        vc.do_io_close(CloseReason::Normal);
    }

    #[rstest]
    fn events_raised_in_callback_wait_their_turn() {
        netvc_logging::setup_log();
        let clock = ManualClock::new();
        let vc = new_vc(&clock);
        let (rec, sink) = recorder("read");
        rec.lock().feed_in_callback = Some((Arc::downgrade(&vc), b"second".to_vec()));

        let _vio = vc
            .do_io_read(sink, IoLen::Unbounded, IoBuffer::new())
            .unwrap();
        vc.transport_read(b"first").unwrap();
        assert_eq!(
            rec.lock().events,
            vec![(VcEvent::ReadReady, 5), (VcEvent::ReadReady, 11)]
        );
        vc.do_io_close(CloseReason::Normal);
    }

    #[rstest]
    fn accessors_and_attributes() {
        netvc_logging::setup_log();
        let clock = ManualClock::new();
        let vc = new_vc(&clock);

        assert_eq!(vc.transport_kind(), TransportKind::Tcp);
        assert_eq!(vc.local_port(), Some(40000));
        assert_eq!(vc.remote_ip(), Some("10.0.0.2".parse().unwrap()));
        assert_eq!(vc.remote_port(), Some(80));
        assert!(vc.raw_socket().is_none());
        assert_eq!(vc.options().local_addr_binding.to_string(), "any");

        assert!(!vc.is_internal_request());
        vc.set_is_internal_request(true);
        assert!(vc.is_internal_request());
        vc.set_attributes(0b101);
        assert_eq!(vc.attributes(), 0b101);

        vc.do_io_close(CloseReason::Normal);
        // resolved addresses stay cached after close
        assert_eq!(vc.remote_port(), Some(80));
    }

    #[rstest]
    fn detailed_log_is_optional() {
        netvc_logging::setup_log();
        let clock = ManualClock::new();
        let vc = new_vc(&clock);
        vc.add_log_message("dropped");
        assert!(!vc.logging_enabled());
        assert_eq!(vc.logs_total_time(), Duration::ZERO);

        vc.logging_init();
        assert!(vc.logging_enabled());
        let (_rec, sink) = recorder("read");
        let _vio = vc
            .do_io_read(sink, IoLen::Unbounded, IoBuffer::new())
            .unwrap();
        vc.transport_read(b"abc").unwrap();
        vc.add_log_message("state machine note");
        vc.print_logs();
        vc.clear_logs();
        assert_eq!(vc.logs_total_time(), Duration::ZERO);
        vc.do_io_close(CloseReason::Normal);
    }
}
