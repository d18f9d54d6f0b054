use bridge_common::BridgeError;
use bridge_server::listener::{IngestConfig, IngestHandle, IngestListener};
use bridge_server::store::SnapshotStore;
use std::io::Write;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn start(workers: usize) -> (Arc<SnapshotStore>, IngestHandle) {
    let store = Arc::new(SnapshotStore::new());
    let config = IngestConfig {
        addr: "127.0.0.1:0".to_string(),
        workers,
        read_timeout: Duration::from_secs(5),
        ..IngestConfig::default()
    };
    let handle = IngestListener::bind(config)
        .expect("bind loopback")
        .spawn(Arc::clone(&store))
        .expect("spawn listener");
    (store, handle)
}

fn send(addr: SocketAddr, payload: &[u8]) {
    let mut stream = TcpStream::connect(addr).expect("connect");
    stream.write_all(payload).expect("write");
}

fn wait_until(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn ohlc_connection_updates_latest_snapshot() {
    let (store, handle) = start(2);

    send(
        handle.local_addr(),
        b"EURUSD:1 OHLC open=1.1000 high=1.1050 low=1.0950 close=1.1020\0END CONNECTION\0",
    );
    wait_until("ohlc record", || store.latest_ohlc().is_some());

    let latest = store.latest_ohlc().unwrap();
    assert_eq!(latest.symbol, "EURUSD");
    assert_eq!(latest.open, 1.1000);
    assert_eq!(latest.high, 1.1050);
    assert_eq!(latest.low, 1.0950);
    assert_eq!(latest.close, 1.1020);

    handle.shutdown().unwrap();
}

#[test]
fn trade_list_with_bad_line_stores_only_valid_trades() {
    let (store, handle) = start(2);

    send(
        handle.local_addr(),
        b"Open Trades\n\
          ticket=100 symbol=EURUSD volume=1.0 open_price=1.10 current_price=1.11\n\
          ticket=bad symbol=GBPUSD volume=x open_price=y current_price=z\n\0\
          END CONNECTION\0",
    );
    wait_until("trade record", || store.len_trades() > 0);
    handle.shutdown().unwrap();

    let trades = store.all_trades();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].ticket, 100);
}

#[test]
fn nulls_inside_a_trade_list_keep_every_trade() {
    let (store, handle) = start(2);

    send(
        handle.local_addr(),
        b"Open Trades\n\
          ticket=100\0 symbol=EURUSD volume=1.0\0 open_price=1.10 current_price=1.11\0\n\
          ticket=101 symbol=GBPUSD volume=2.0 open_price=1.20 current_price=1.21\n\
          END CONNECTION\0",
    );
    wait_until("both trades", || store.len_trades() == 2);
    handle.shutdown().unwrap();

    let trades = store.all_trades();
    assert_eq!(trades.len(), 2);
    assert_eq!((trades[0].ticket, trades[0].symbol.as_str()), (100, "EURUSD"));
    assert_eq!((trades[1].ticket, trades[1].symbol.as_str()), (101, "GBPUSD"));
}

#[test]
fn null_after_an_ohlc_value_keeps_the_record() {
    let (store, handle) = start(1);

    send(
        handle.local_addr(),
        b"EURUSD:1 OHLC open=1.1\0 high=1.2 low=1.0 close=1.15\0END CONNECTION\0",
    );
    wait_until("ohlc record", || store.latest_ohlc().is_some());
    handle.shutdown().unwrap();

    let latest = store.latest_ohlc().unwrap();
    assert_eq!(latest.symbol, "EURUSD");
    assert_eq!(latest.open, 1.1);
    assert_eq!(latest.close, 1.15);
}

#[test]
fn ohlc_and_trades_sent_on_one_connection_are_both_stored() {
    let (store, handle) = start(1);

    send(
        handle.local_addr(),
        b"USDJPY:1 OHLC open=150 high=151 low=149 close=150.5\0\
          Open Trades\nticket=7 symbol=USDJPY volume=0.1 open_price=150 current_price=150.5\n\0\
          END CONNECTION\0",
    );
    wait_until("both kinds", || store.len_ohlc() == 1 && store.len_trades() == 1);
    handle.shutdown().unwrap();

    assert_eq!(store.latest_ohlc().unwrap().close, 150.5);
    assert_eq!(store.all_trades()[0].ticket, 7);
}

#[test]
fn idle_listener_accepts_without_delay_and_stops_promptly() {
    let (store, handle) = start(1);
    thread::sleep(Duration::from_millis(200));

    let sent = Instant::now();
    send(handle.local_addr(), b"A:1 OHLC open=1 high=1 low=1 close=1\0END CONNECTION\0");
    wait_until("record after idle period", || store.len_ohlc() == 1);
    assert!(sent.elapsed() < Duration::from_secs(1));

    let stopping = Instant::now();
    handle.shutdown().unwrap();
    assert!(stopping.elapsed() < Duration::from_secs(2));
}

#[test]
fn message_split_over_several_writes_is_reassembled() {
    let (store, handle) = start(1);

    let mut stream = TcpStream::connect(handle.local_addr()).unwrap();
    stream.set_nodelay(true).unwrap();
    for piece in [
        &b"GBPUSD:M5 OHLC open=1.25"[..],
        b" high=1.26 low=1.24",
        b" close=1.255\0END CONN",
        b"ECTION\0",
    ] {
        stream.write_all(piece).unwrap();
        stream.flush().unwrap();
        thread::sleep(Duration::from_millis(20));
    }
    drop(stream);

    wait_until("reassembled record", || store.latest_ohlc().is_some());
    assert_eq!(store.latest_ohlc().unwrap().close, 1.255);
    handle.shutdown().unwrap();
}

#[test]
fn abrupt_close_contributes_nothing_and_listener_survives() {
    let (store, handle) = start(1);
    let addr = handle.local_addr();

    send(addr, b"EURUSD:1 OHLC open=9 high=9 low=9 close=9\0");
    send(addr, b"");
    send(addr, b"EURUSD:1 OHLC open=1 high=2 low=0.5 close=1.5\0END CONNECTION\0");

    wait_until("record after failures", || store.latest_ohlc().is_some());
    handle.shutdown().unwrap();

    assert_eq!(store.len_ohlc(), 1);
    assert_eq!(store.latest_ohlc().unwrap().close, 1.5);
}

#[test]
fn concurrent_connections_lose_nothing() {
    const CONNECTIONS: i64 = 64;
    let (store, handle) = start(8);
    let addr = handle.local_addr();

    let senders: Vec<_> = (0..CONNECTIONS)
        .map(|ticket| {
            thread::spawn(move || {
                let payload = format!(
                    "Open Trades\nticket={ticket} symbol=EURUSD volume=1 open_price=1.1 current_price=1.2\n\0END CONNECTION\0"
                );
                send(addr, payload.as_bytes());
            })
        })
        .collect();
    for sender in senders {
        sender.join().unwrap();
    }

    wait_until("all trades", || store.len_trades() == CONNECTIONS as usize);
    handle.shutdown().unwrap();

    let mut tickets: Vec<i64> = store.all_trades().iter().map(|t| t.ticket).collect();
    tickets.sort_unstable();
    assert_eq!(tickets, (0..CONNECTIONS).collect::<Vec<_>>());
}

#[test]
fn shutdown_keeps_parsed_records_and_stops_accepting() {
    let (store, handle) = start(2);
    let addr = handle.local_addr();

    send(addr, b"A:1 OHLC open=1 high=1 low=1 close=1\0END CONNECTION\0");
    wait_until("record before shutdown", || store.len_ohlc() == 1);
    handle.shutdown().unwrap();

    assert_eq!(store.len_ohlc(), 1);
    assert!(TcpStream::connect_timeout(&addr, Duration::from_millis(200)).is_err());
}

#[test]
fn bind_failure_is_surfaced() {
    let taken = TcpListener::bind("127.0.0.1:0").unwrap();
    let config = IngestConfig {
        addr: taken.local_addr().unwrap().to_string(),
        ..IngestConfig::default()
    };

    let err = IngestListener::bind(config).err().expect("bind must fail");
    assert!(matches!(err, BridgeError::Bind { .. }));
}
