//! End-to-end liveness behaviour against a simulated transport.
//!
//! The simulated transport owns each connection's deadline and closes the
//! connection from a watcher task once it elapses, mirroring what a socket
//! layer with read deadlines does. Tests run on paused tokio time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use liveness_core::{
    CloseCause, Connection, ConnectionId, ConnectionLifecycle, ConnectionRegistry,
    LivenessPolicy, LivenessScheduler, TransportError,
};

struct SimConnection {
    id: ConnectionId,
    deadline: Mutex<Instant>,
    closed: AtomicBool,
    acks_probes: AtomicBool,
    probes: AtomicUsize,
    wire: mpsc::UnboundedSender<()>,
}

impl Connection for SimConnection {
    fn id(&self) -> &ConnectionId {
        &self.id
    }

    fn send_probe(&self) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        let _ = self.probes.fetch_add(1, Ordering::SeqCst);
        self.wire.send(()).map_err(|_| TransportError::Closed)
    }

    fn arm_deadline(&self, window: Duration) {
        let next = Instant::now() + window;
        let mut current = self.deadline.lock();
        if next > *current {
            *current = next;
        }
    }
}

struct Peer {
    conn: Arc<SimConnection>,
    closed: JoinHandle<Instant>,
}

impl Peer {
    fn go_silent(&self) {
        self.conn.acks_probes.store(false, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.conn.closed.load(Ordering::SeqCst)
    }
}

/// Accept a simulated peer: open it through the lifecycle, answer probes on
/// its behalf while it is responsive, and enforce its deadline.
fn connect(lifecycle: &ConnectionLifecycle, id: &str, acks_probes: bool) -> Peer {
    let (wire_tx, mut wire_rx) = mpsc::unbounded_channel();
    let conn = Arc::new(SimConnection {
        id: id.into(),
        deadline: Mutex::new(Instant::now()),
        closed: AtomicBool::new(false),
        acks_probes: AtomicBool::new(acks_probes),
        probes: AtomicUsize::new(0),
        wire: wire_tx,
    });
    lifecycle.on_open(conn.clone());

    let peer_conn = conn.clone();
    let peer_lifecycle = lifecycle.clone();
    drop(tokio::spawn(async move {
        while wire_rx.recv().await.is_some() {
            if peer_conn.acks_probes.load(Ordering::SeqCst) {
                peer_lifecycle.on_probe_ack(peer_conn.as_ref());
            }
        }
    }));

    let watched = conn.clone();
    let watch_lifecycle = lifecycle.clone();
    let closed = tokio::spawn(async move {
        loop {
            let at = *watched.deadline.lock();
            time::sleep_until(at).await;
            if *watched.deadline.lock() <= Instant::now() {
                watched.closed.store(true, Ordering::SeqCst);
                let _ = watch_lifecycle.on_close(&watched.id, CloseCause::DeadlineExpired);
                return Instant::now();
            }
        }
    });

    Peer { conn, closed }
}

fn setup(
    probe_interval: u64,
    deadline: u64,
) -> (
    Arc<ConnectionRegistry>,
    ConnectionLifecycle,
    Arc<LivenessScheduler>,
) {
    let policy = LivenessPolicy::new(
        Duration::from_secs(probe_interval),
        Duration::from_secs(deadline),
    )
    .unwrap();
    let registry = Arc::new(ConnectionRegistry::new());
    let lifecycle = ConnectionLifecycle::new(registry.clone(), policy);
    let scheduler = Arc::new(LivenessScheduler::from_policy(registry.clone(), &policy));
    (registry, lifecycle, scheduler)
}

fn spawn_scheduler(scheduler: &Arc<LivenessScheduler>) -> JoinHandle<()> {
    let runner = scheduler.clone();
    tokio::spawn(async move {
        let _ = runner.run().await;
    })
}

#[tokio::test(start_paused = true)]
async fn acks_extend_deadline_until_peer_goes_silent() {
    // interval 2s, deadline 8s; acks at t=2,4,6 push the deadline to 14.
    let (registry, lifecycle, scheduler) = setup(2, 8);
    let t0 = Instant::now();
    let _sched = spawn_scheduler(&scheduler);
    let peer = connect(&lifecycle, "c1", true);

    time::sleep_until(t0 + Duration::from_millis(7000)).await;
    assert_eq!(peer.conn.probes.load(Ordering::SeqCst), 3);
    assert_eq!(*peer.conn.deadline.lock(), t0 + Duration::from_secs(14));
    peer.go_silent();

    time::sleep_until(t0 + Duration::from_millis(13_900)).await;
    assert!(registry.contains(&"c1".into()));
    assert!(!peer.is_closed());

    let closed_at = peer.closed.await.unwrap();
    assert_eq!(closed_at.duration_since(t0), Duration::from_secs(14));
    assert!(!registry.contains(&"c1".into()));

    let _ = scheduler.stop();
}

#[tokio::test(start_paused = true)]
async fn silent_peer_removed_within_deadline_of_open() {
    let (registry, lifecycle, scheduler) = setup(2, 8);
    let t0 = Instant::now();
    let _sched = spawn_scheduler(&scheduler);
    let peer = connect(&lifecycle, "mute", false);

    let closed_at = peer.closed.await.unwrap();
    let policy = lifecycle.policy();
    assert!(closed_at.duration_since(t0) >= policy.deadline());
    assert!(closed_at.duration_since(t0) <= policy.detection_bound());
    assert!(registry.is_empty());

    let _ = scheduler.stop();
}

#[tokio::test(start_paused = true)]
async fn acking_peer_is_never_evicted() {
    // Tight policy: one missed ack would be fatal.
    let (registry, lifecycle, scheduler) = setup(2, 3);
    let _sched = spawn_scheduler(&scheduler);
    let peer = connect(&lifecycle, "steady", true);

    time::sleep(Duration::from_secs(600)).await;

    assert!(!peer.is_closed());
    assert!(registry.contains(&"steady".into()));
    assert!(peer.conn.probes.load(Ordering::SeqCst) >= 299);

    let _ = scheduler.stop();
}

#[tokio::test(start_paused = true)]
async fn chatty_peer_that_ignores_probes_is_never_evicted() {
    let (registry, lifecycle, scheduler) = setup(2, 3);
    let _sched = spawn_scheduler(&scheduler);
    let peer = connect(&lifecycle, "chatty", false);

    let mut ticker = time::interval(Duration::from_secs(2));
    for _ in 0..300 {
        let _ = ticker.tick().await;
        lifecycle.on_activity(peer.conn.as_ref());
    }

    assert!(!peer.is_closed());
    assert!(registry.contains(&"chatty".into()));

    let _ = scheduler.stop();
}

#[tokio::test(start_paused = true)]
async fn only_dead_peers_are_removed() {
    let (registry, lifecycle, scheduler) = setup(2, 5);
    let _sched = spawn_scheduler(&scheduler);

    let alive: Vec<Peer> = (0..5)
        .map(|i| connect(&lifecycle, &format!("alive{i}"), true))
        .collect();
    let dead: Vec<Peer> = (0..5)
        .map(|i| connect(&lifecycle, &format!("dead{i}"), false))
        .collect();
    assert_eq!(registry.len(), 10);

    time::sleep(lifecycle.policy().detection_bound() + Duration::from_secs(1)).await;

    assert_eq!(registry.len(), 5);
    for p in &alive {
        assert!(registry.contains(&p.conn.id));
    }
    for p in &dead {
        assert!(p.is_closed());
        assert!(!registry.contains(&p.conn.id));
    }

    let _ = scheduler.stop();
}

#[tokio::test(start_paused = true)]
async fn probe_to_closed_connection_does_not_block_others() {
    let (_registry, lifecycle, scheduler) = setup(2, 8);
    let a = connect(&lifecycle, "a", true);
    let b = connect(&lifecycle, "b", true);
    let c = connect(&lifecycle, "c", true);
    // Closed by the transport but its close callback has not run yet.
    b.conn.closed.store(true, Ordering::SeqCst);

    let report = scheduler.sweep();
    assert_eq!(report.probed, 3);
    assert_eq!(report.failed, 1);
    assert_eq!(a.conn.probes.load(Ordering::SeqCst), 1);
    assert_eq!(c.conn.probes.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_opens_and_closes_keep_exact_membership() {
    let policy = LivenessPolicy::default();
    let registry = Arc::new(ConnectionRegistry::new());
    let lifecycle = ConnectionLifecycle::new(registry.clone(), policy);

    struct Quiet(ConnectionId);
    impl Connection for Quiet {
        fn id(&self) -> &ConnectionId {
            &self.0
        }
        fn send_probe(&self) -> Result<(), TransportError> {
            Ok(())
        }
        fn arm_deadline(&self, _window: Duration) {}
    }

    let mut opens = Vec::new();
    for i in 0..100 {
        let lc = lifecycle.clone();
        opens.push(tokio::spawn(async move {
            lc.on_open(Arc::new(Quiet(format!("c{i}").into())));
        }));
    }
    for h in opens {
        h.await.unwrap();
    }

    let scheduler = Arc::new(LivenessScheduler::from_policy(registry.clone(), &policy));
    let sweeper = {
        let s = scheduler.clone();
        tokio::spawn(async move {
            for _ in 0..50 {
                let _ = s.sweep();
                tokio::task::yield_now().await;
            }
        })
    };

    let mut closes = Vec::new();
    for i in (0..100).filter(|i| i % 2 == 0) {
        let lc = lifecycle.clone();
        closes.push(tokio::spawn(async move {
            lc.on_close(&format!("c{i}").into(), CloseCause::PeerClosed)
        }));
    }
    for h in closes {
        assert!(h.await.unwrap());
    }
    sweeper.await.unwrap();

    assert_eq!(registry.len(), 50);
    for i in 0..100 {
        assert_eq!(registry.contains(&format!("c{i}").into()), i % 2 == 1);
    }
}
